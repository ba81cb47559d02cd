use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RentalStatus {
    /// Time-boxed claim on a unit before rental confirmation
    Holding,
    Rented,
    ReturnRequested,
    Returned,
    Cancelled,
}

/// A rental or a hold (reservation) on one unit. Created by the hold/rent
/// action, closed by admin-side return approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rental {
    pub id: String,
    pub item_id: String,
    pub unit_id: String,
    pub user_id: String,
    pub status: RentalStatus,
    #[serde(default)]
    pub item_name: Option<String>,
    #[serde(default)]
    pub asset_no: Option<String>,
    #[serde(default)]
    pub rented_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
    /// None while the rental is active
    #[serde(default)]
    pub returned_at: Option<DateTime<Utc>>,
    /// Meaningful only while status is HOLDING
    #[serde(default)]
    pub reserve_expires_at: Option<DateTime<Utc>>,
}

impl Rental {
    /// A rental can enter the return flow while it is out and not yet returned
    pub fn is_returnable(&self) -> bool {
        self.returned_at.is_none()
            && matches!(self.status, RentalStatus::Rented | RentalStatus::ReturnRequested)
    }
}
