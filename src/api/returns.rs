use serde::Serialize;

use crate::error::AppResult;
use crate::http_client::ApiClient;
use crate::models::{DamageSuggestion, ReturnRequest, ReturnRequestStatus};

/// Return submission. `image_key` identifies the single previously
/// uploaded evidence photo; the backend derives the damage assessment
/// from it asynchronously.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnSubmission<'a> {
    pub rental_id: &'a str,
    pub user_id: &'a str,
    pub organization_id: &'a str,
    pub image_key: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AdminListQuery<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<ReturnRequestStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    organization_id: Option<&'a str>,
}

#[derive(Clone)]
pub struct ReturnsApi {
    client: ApiClient,
}

impl ReturnsApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn submit(&self, submission: &ReturnSubmission<'_>) -> AppResult<ReturnRequest> {
        self.client.post_json("/return-requests", submission).await
    }

    /// Admin-side list, filterable by status and organization
    pub async fn admin_list(
        &self,
        status: Option<ReturnRequestStatus>,
        organization_id: Option<&str>,
    ) -> AppResult<Vec<ReturnRequest>> {
        self.client
            .get_json_with_query(
                "/admin/return-requests",
                &AdminListQuery {
                    status,
                    organization_id,
                },
            )
            .await
    }

    pub async fn approve(&self, request_id: &str) -> AppResult<()> {
        self.client
            .post_unit(&format!("/admin/return-requests/{}/approve", request_id))
            .await
    }

    /// AI-derived damage suggestions for one return request
    pub async fn damage_suggestions(&self, request_id: &str) -> AppResult<Vec<DamageSuggestion>> {
        self.client
            .get_json(&format!("/admin/return-requests/{}/damage/suggestions", request_id))
            .await
    }
}
