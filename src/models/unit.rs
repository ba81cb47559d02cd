use serde::{Deserialize, Serialize};

use super::rental::Rental;

/// Lifecycle status of a physical unit. Server-owned; the client only
/// reads it to decide whether the unit can be offered for selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitStatus {
    Available,
    Reserved,
    Rented,
    Repair,
    Lost,
    Disposed,
}

/// One physical, individually tracked instance of an Item
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: String,
    pub item_id: String,
    pub status: UnitStatus,
    pub asset_no: String,
    /// Present only while status is RENTED
    #[serde(default)]
    pub current_rental: Option<Rental>,
}

impl Unit {
    pub fn is_selectable(&self) -> bool {
        self.status == UnitStatus::Available
    }
}
