use serde::{Deserialize, Serialize};

use super::unit::Unit;

/// Rentable item type (a class of equipment, e.g. "USB-C charger"),
/// as served by `GET /items`. Individual physical instances are `Unit`s.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub name: String,
    pub total_quantity: i32,
    pub available_quantity: i32,
    pub count_wait_list: i32,
    pub deposit: i64,
    pub max_rental_days: i32,
    pub description: Option<String>,
    pub cover_key: Option<String>,
    pub is_active: bool,
}

/// Item detail from `GET /items/{id}`, including its units and photos
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDetail {
    #[serde(flatten)]
    pub item: Item,
    #[serde(default)]
    pub units: Vec<Unit>,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

impl Item {
    /// A unit can only be picked while the item is active and has stock
    pub fn is_rentable(&self) -> bool {
        self.is_active && self.available_quantity > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(active: bool, available: i32) -> Item {
        Item {
            id: "item-1".into(),
            name: "充電器".into(),
            total_quantity: 5,
            available_quantity: available,
            count_wait_list: 0,
            deposit: 10000,
            max_rental_days: 7,
            description: None,
            cover_key: None,
            is_active: active,
        }
    }

    #[test]
    fn test_is_rentable() {
        assert!(item(true, 1).is_rentable());
        assert!(!item(true, 0).is_rentable());
        assert!(!item(false, 3).is_rentable());
    }
}
