use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnRequestStatus {
    Pending,
    Approved,
    Rejected,
}

/// Return request created by a student on return submission; transitions
/// happen admin-side via approval. Damage assessment is computed by the
/// backend asynchronously, never on the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRequest {
    pub id: String,
    pub rental_id: String,
    pub user_id: String,
    pub status: ReturnRequestStatus,
    /// Set only after the evidence photo upload succeeded
    #[serde(default)]
    pub submitted_image_key: Option<String>,
    #[serde(default)]
    pub submitted_image_url: Option<String>,
    #[serde(default)]
    pub before_image_key: Option<String>,
    #[serde(default)]
    pub before_image_url: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub is_active: bool,
}

/// AI-derived damage assessment suggestion served to admins
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DamageSuggestion {
    pub summary: String,
    pub confidence: f64,
    #[serde(default)]
    pub estimated_fee: Option<i64>,
}
