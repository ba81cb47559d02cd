use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::http_client::ApiClient;
use crate::models::AuthUser;

static RE_STUDENT_NO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Za-z]{4,16}$").expect("valid regex"));

static RE_PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^0\d{1,4}-?\d{1,4}-?\d{3,4}$").expect("valid regex"));

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest<'a> {
    pub university_id: &'a str,
    pub student_no: &'a str,
    pub name: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest<'a> {
    pub university_id: &'a str,
    pub student_no: &'a str,
    pub name: &'a str,
    pub phone: &'a str,
}

#[derive(Clone)]
pub struct StudentsApi {
    client: ApiClient,
}

impl StudentsApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Check the student register before allowing signup
    pub async fn verify(&self, request: &VerifyRequest<'_>) -> AppResult<()> {
        if !RE_STUDENT_NO.is_match(request.student_no) {
            return Err(AppError::Validation("学籍番号の形式が正しくありません".to_string()));
        }
        self.client.post_json_unit("/students/verify", request).await
    }

    pub async fn signup(&self, request: &SignupRequest<'_>) -> AppResult<AuthUser> {
        if !RE_STUDENT_NO.is_match(request.student_no) {
            return Err(AppError::Validation("学籍番号の形式が正しくありません".to_string()));
        }
        if !RE_PHONE.is_match(request.phone) {
            return Err(AppError::Validation("電話番号の形式が正しくありません".to_string()));
        }
        self.client.post_json("/students/signup", request).await
    }
}
