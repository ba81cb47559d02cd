use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{AppError, AppResult};

/// Error body shape returned by the backend API
#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Thin wrapper over reqwest scoped to the rental backend: base URL,
/// 10-second timeout, cookie jar (the backend assumes a cookie-carried
/// refresh token), JSON helpers and debug request/response logging.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.request_timeout_secs))
                .cookie_store(true)
                .build()
                .expect("Failed to create HTTP client"),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> AppResult<T> {
        let url = self.url(path);
        tracing::debug!("request: method=GET url={}", url);
        let response = self.client.get(&url).send().await.map_err(request_error)?;
        Self::decode(response).await
    }

    pub async fn get_json_with_query<Q, T>(&self, path: &str, query: &Q) -> AppResult<T>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        tracing::debug!("request: method=GET url={}", url);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(request_error)?;
        Self::decode(response).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> AppResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        tracing::debug!(
            "request: method=POST url={} body={}",
            url,
            serde_json::to_string(body).unwrap_or_default()
        );
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(request_error)?;
        Self::decode(response).await
    }

    /// POST with a JSON body where the response body is irrelevant
    pub async fn post_json_unit<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> AppResult<()> {
        let url = self.url(path);
        tracing::debug!(
            "request: method=POST url={} body={}",
            url,
            serde_json::to_string(body).unwrap_or_default()
        );
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(request_error)?;
        Self::check(response).await
    }

    /// POST with no body, response body irrelevant (waitlist join/cancel, approvals)
    pub async fn post_unit(&self, path: &str) -> AppResult<()> {
        let url = self.url(path);
        tracing::debug!("request: method=POST url={}", url);
        let response = self.client.post(&url).send().await.map_err(request_error)?;
        Self::check(response).await
    }

    /// Direct upload to an absolute presigned URL. The URL is not joined
    /// with the API base; file bytes never route through the backend.
    pub async fn put_bytes_absolute(
        &self,
        url: &str,
        data: bytes::Bytes,
        content_type: &str,
    ) -> AppResult<()> {
        tracing::debug!("request: method=PUT url={} size={}", url, data.len());
        let response = self
            .client
            .put(url)
            .header("Content-Type", content_type)
            .body(data)
            .send()
            .await
            .map_err(request_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Upload(format!("presigned PUT failed: status={}", status)));
        }
        tracing::debug!("response: url={} status={}", url, status);
        Ok(())
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> AppResult<T> {
        let status = response.status();
        let url = response.url().to_string();
        if !status.is_success() {
            return Err(Self::classify(status, response).await);
        }
        tracing::debug!("response: url={} status={}", url, status);
        response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to parse response body: {}", e)))
    }

    async fn check(response: Response) -> AppResult<()> {
        let status = response.status();
        let url = response.url().to_string();
        if !status.is_success() {
            return Err(Self::classify(status, response).await);
        }
        tracing::debug!("response: url={} status={}", url, status);
        Ok(())
    }

    async fn classify(status: StatusCode, response: Response) -> AppError {
        let message = match response.text().await {
            Ok(body) => serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or(body),
            Err(_) => String::new(),
        };
        tracing::debug!("response: status={} message={}", status, message);
        AppError::from_status(status, message)
    }
}

fn request_error(e: reqwest::Error) -> AppError {
    if e.is_timeout() {
        AppError::Timeout
    } else {
        AppError::Network(e.to_string())
    }
}
