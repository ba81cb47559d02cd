use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::http_client::ApiClient;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PresignRequest<'a> {
    image_type: &'a str,
    file_name: &'a str,
}

/// Presigned upload grant: the storage key the object will live under
/// and a time-limited URL accepting a direct PUT.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedUpload {
    pub key: String,
    pub url: String,
}

#[derive(Clone)]
pub struct ImagesApi {
    client: ApiClient,
}

impl ImagesApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Request a presigned upload URL keyed by a declared image type tag
    /// (e.g. "RETURN_EVIDENCE", "UNIT_PHOTO")
    pub async fn presign_upload(&self, image_type: &str, file_name: &str) -> AppResult<PresignedUpload> {
        self.client
            .post_json(
                "/images/presign/upload",
                &PresignRequest {
                    image_type,
                    file_name,
                },
            )
            .await
    }

    /// Upload file bytes directly to storage through the presigned URL
    pub async fn upload_direct(&self, url: &str, data: Bytes, content_type: &str) -> AppResult<()> {
        self.client.put_bytes_absolute(url, data, content_type).await
    }
}
