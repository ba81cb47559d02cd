use serde::Serialize;

use crate::error::AppResult;
use crate::http_client::ApiClient;
use crate::models::{Item, ItemDetail};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ItemListQuery<'a> {
    organization_id: &'a str,
}

#[derive(Clone)]
pub struct ItemsApi {
    client: ApiClient,
}

impl ItemsApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Items rentable within the given organization scope
    pub async fn list(&self, organization_id: &str) -> AppResult<Vec<Item>> {
        self.client
            .get_json_with_query("/items", &ItemListQuery { organization_id })
            .await
    }

    /// Item detail including its units and photos
    pub async fn detail(&self, item_id: &str) -> AppResult<ItemDetail> {
        self.client.get_json(&format!("/items/{}", item_id)).await
    }

    /// Queue for an item that currently has no available unit
    pub async fn join_waitlist(&self, item_id: &str) -> AppResult<()> {
        self.client
            .post_unit(&format!("/waitlists/items/{}", item_id))
            .await
    }

    pub async fn cancel_waitlist(&self, item_id: &str) -> AppResult<()> {
        self.client
            .post_unit(&format!("/waitlists/items/{}/cancel", item_id))
            .await
    }
}
