use serde::{Deserialize, Serialize};

use super::ItemId;

/// A catalog entry. Ids are immutable and unique across the repository
/// and both pending buffers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
}

impl Item {
    pub fn new(id: ItemId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Item with the canonical generated name (`"Item {id}"`).
    pub fn named(id: ItemId) -> Self {
        let name = format!("Item {id}");
        Self { id, name }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_uses_display_form() {
        assert_eq!(Item::named(ItemId::from(7)).name, "Item 7");
        assert_eq!(Item::named(ItemId::from("sku")).name, "Item sku");
    }
}
