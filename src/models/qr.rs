use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Scope of a QR token: SITE covers a whole installation, ORG a single
/// university/college/department boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QrTokenType {
    Site,
    Org,
}

/// Token + validity window issued by the backend for one QR display
/// session (`GET /admin/org-qr/meta`). The token is opaque to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrTokenMeta {
    pub token: String,
    #[serde(rename = "type")]
    pub token_type: QrTokenType,
    pub university_id: String,
    pub organization_id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Claim returned by `POST /api/qrs/resolve`. Discarded when the owning
/// flow ends; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrClaim {
    #[serde(rename = "type")]
    pub token_type: QrTokenType,
    pub university_id: String,
    pub organization_id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
