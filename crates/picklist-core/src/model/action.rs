// ── Selection mutations ──
//
// Select / unselect / reorder requests as they sit in the action buffer.
// Payloads are normalized to `ItemId` on the way in; semantic checks
// (does the id exist, is it selected) wait until flush time.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

use super::ItemId;
use crate::error::CoreError;

/// Wire name of a mutation kind.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Select,
    Unselect,
    Reorder,
}

/// A validated selection mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Select(ItemId),
    Unselect(ItemId),
    /// Desired relative order for (a subset of) the selected ids.
    Reorder(Vec<ItemId>),
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Select(_) => ActionKind::Select,
            Self::Unselect(_) => ActionKind::Unselect,
            Self::Reorder(_) => ActionKind::Reorder,
        }
    }

    /// Parse a raw `{kind, payload}` request.
    ///
    /// `select` / `unselect` take a single number or string; `reorder`
    /// takes an array of them.
    pub fn from_request(kind: &str, payload: &Value) -> Result<Self, CoreError> {
        let parsed: ActionKind = kind.parse().map_err(|_| CoreError::InvalidCommand {
            kind: kind.to_owned(),
            reason: "unknown command kind".into(),
        })?;

        match parsed {
            ActionKind::Select | ActionKind::Unselect => {
                let id = id_from_value(payload).ok_or_else(|| CoreError::InvalidCommand {
                    kind: kind.to_owned(),
                    reason: format!("expected a number or string id, got {payload}"),
                })?;
                Ok(if parsed == ActionKind::Select {
                    Self::Select(id)
                } else {
                    Self::Unselect(id)
                })
            }
            ActionKind::Reorder => {
                let Value::Array(values) = payload else {
                    return Err(CoreError::InvalidCommand {
                        kind: kind.to_owned(),
                        reason: "reorder payload must be an array of ids".into(),
                    });
                };
                values
                    .iter()
                    .map(|v| {
                        id_from_value(v).ok_or_else(|| CoreError::InvalidCommand {
                            kind: kind.to_owned(),
                            reason: format!("reorder entry {v} is not an id"),
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Self::Reorder)
            }
        }
    }
}

/// An entry of the action buffer. Malformed requests are acknowledged
/// like any other and rejected when the flush reaches them.
#[derive(Debug, Clone)]
pub(crate) enum QueuedAction {
    Valid(Action),
    Malformed { kind: String, reason: String },
}

impl QueuedAction {
    pub(crate) fn from_request(kind: &str, payload: &Value) -> Self {
        match Action::from_request(kind, payload) {
            Ok(action) => Self::Valid(action),
            Err(CoreError::InvalidCommand { kind, reason }) => Self::Malformed { kind, reason },
            Err(other) => Self::Malformed {
                kind: kind.to_owned(),
                reason: other.to_string(),
            },
        }
    }
}

fn id_from_value(value: &Value) -> Option<ItemId> {
    match value {
        Value::Number(n) => Some(
            n.as_i64()
                .map_or_else(|| ItemId::from(n.to_string()), ItemId::Numeric),
        ),
        Value::String(s) => Some(ItemId::from(s.as_str())),
        _ => None,
    }
}
