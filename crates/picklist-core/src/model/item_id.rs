// ── Core identity type ──
//
// Every item is keyed by an `ItemId`. Transport payloads carry ids as
// JSON numbers or strings; both are normalized here, once, so the rest
// of the engine never re-coerces.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

// ── ItemId ──────────────────────────────────────────────────────────

/// Canonical identifier for a catalog item.
///
/// Anything that parses as an `i64` (after trimming) is `Numeric`,
/// everything else is kept verbatim as `Text`. Ordering places all
/// numeric ids first, compared numerically, followed by text ids in
/// byte-lexicographic order.
///
/// A numeric and a text id never compare as strings, so text that starts
/// with digits still sorts after every number: `"10a"` comes after `5`.
/// Comparing mixed pairs as strings would not be transitive
/// (`5 < 10` numerically, `"10" < "10a"`, yet `"10a" < "5"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum ItemId {
    Numeric(i64),
    Text(String),
}

impl ItemId {
    /// Normalize a raw identifier string.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<i64>() {
            Ok(n) => Self::Numeric(n),
            Err(_) => Self::Text(raw.to_owned()),
        }
    }

    pub fn as_numeric(&self) -> Option<i64> {
        match self {
            Self::Numeric(n) => Some(*n),
            Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Numeric(_) => None,
        }
    }

    /// Substring match against the id's display form. Empty needles match.
    pub fn matches(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        match self {
            Self::Numeric(n) => n.to_string().contains(needle),
            Self::Text(s) => s.contains(needle),
        }
    }
}

impl Ord for ItemId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Numeric(a), Self::Numeric(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.as_bytes().cmp(b.as_bytes()),
            (Self::Numeric(_), Self::Text(_)) => Ordering::Less,
            (Self::Text(_), Self::Numeric(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for ItemId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl FromStr for ItemId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<i64> for ItemId {
    fn from(n: i64) -> Self {
        Self::Numeric(n)
    }
}

impl From<i32> for ItemId {
    fn from(n: i32) -> Self {
        Self::Numeric(i64::from(n))
    }
}

impl From<u32> for ItemId {
    fn from(n: u32) -> Self {
        Self::Numeric(i64::from(n))
    }
}

impl From<u64> for ItemId {
    fn from(n: u64) -> Self {
        i64::try_from(n).map_or_else(|_| Self::Text(n.to_string()), Self::Numeric)
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        match s.trim().parse::<i64>() {
            Ok(n) => Self::Numeric(n),
            Err(_) => Self::Text(s),
        }
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

/// Wire shape accepted on input: a JSON number or a JSON string.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawItemId {
    Int(i64),
    Str(String),
}

impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawItemId::deserialize(deserializer)? {
            RawItemId::Int(n) => Self::Numeric(n),
            RawItemId::Str(s) => Self::from(s),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn numeric_strings_normalize_to_numbers() {
        assert_eq!(ItemId::parse("42"), ItemId::Numeric(42));
        assert_eq!(ItemId::parse(" 7 "), ItemId::Numeric(7));
        assert_eq!(ItemId::parse("-3"), ItemId::Numeric(-3));
    }

    #[test]
    fn non_numeric_strings_stay_text() {
        assert_eq!(ItemId::parse("abc"), ItemId::Text("abc".into()));
        assert_eq!(ItemId::parse("12a"), ItemId::Text("12a".into()));
        assert_eq!(ItemId::parse(""), ItemId::Text(String::new()));
    }

    #[test]
    fn numbers_sort_numerically_before_text() {
        let mut ids = vec![
            ItemId::from("b"),
            ItemId::from(10),
            ItemId::from("a"),
            ItemId::from(9),
            ItemId::from("10x"),
        ];
        ids.sort();
        assert_eq!(
            ids,
            vec![
                ItemId::from(9),
                ItemId::from(10),
                ItemId::from("10x"),
                ItemId::from("a"),
                ItemId::from("b"),
            ]
        );
    }

    #[test]
    fn digit_leading_text_sorts_after_every_number() {
        let text = ItemId::from("10a");
        assert!(ItemId::from(5) < text);
        assert!(ItemId::from(1_000_000) < text);
        assert!(ItemId::from(-3) < text);

        let mut ids = vec![text.clone(), ItemId::from(10), ItemId::from(5)];
        ids.sort();
        assert_eq!(ids, vec![ItemId::from(5), ItemId::from(10), text]);
    }

    #[test]
    fn matches_substring_of_display_form() {
        assert!(ItemId::from(123).matches("23"));
        assert!(ItemId::from(230).matches("23"));
        assert!(!ItemId::from(3).matches("23"));
        assert!(ItemId::from("x23y").matches("23"));
        assert!(ItemId::from(5).matches(""));
    }

    #[test]
    fn deserializes_numbers_and_numeric_strings_alike() {
        let a: ItemId = serde_json::from_str("42").unwrap();
        let b: ItemId = serde_json::from_str("\"42\"").unwrap();
        let c: ItemId = serde_json::from_str("\"sku-9\"").unwrap();
        assert_eq!(a, b);
        assert_eq!(c, ItemId::Text("sku-9".into()));
    }

    #[test]
    fn serializes_untagged() {
        assert_eq!(serde_json::to_string(&ItemId::from(5)).unwrap(), "5");
        assert_eq!(serde_json::to_string(&ItemId::from("x")).unwrap(), "\"x\"");
    }
}
