use serde::Serialize;

use crate::error::AppResult;
use crate::http_client::ApiClient;
use crate::models::{QrClaim, QrTokenMeta, QrTokenType};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResolveRequest<'a> {
    token: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OrgQrMetaQuery<'a> {
    university_id: &'a str,
    organization_id: &'a str,
    #[serde(rename = "type")]
    token_type: QrTokenType,
}

#[derive(Clone)]
pub struct QrApi {
    client: ApiClient,
}

impl QrApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Resolve a scanned token into its claim. Server-side validation;
    /// the client never parses the token itself.
    pub async fn resolve(&self, token: &str) -> AppResult<QrClaim> {
        self.client
            .post_json("/api/qrs/resolve", &ResolveRequest { token })
            .await
    }

    /// Current token + expiry for the admin-side QR display
    pub async fn org_qr_meta(
        &self,
        university_id: &str,
        organization_id: &str,
        token_type: QrTokenType,
    ) -> AppResult<QrTokenMeta> {
        self.client
            .get_json_with_query(
                "/admin/org-qr/meta",
                &OrgQrMetaQuery {
                    university_id,
                    organization_id,
                    token_type,
                },
            )
            .await
    }
}
