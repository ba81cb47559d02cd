use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Token expired or invalid: {0}")]
    InvalidToken(String),

    #[error("No permission for this organization: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Classify an HTTP error status into the client error taxonomy.
    /// `message` is the backend-provided error body, possibly empty.
    pub fn from_status(status: StatusCode, message: String) -> Self {
        match status {
            StatusCode::BAD_REQUEST => AppError::BadRequest(message),
            StatusCode::UNAUTHORIZED => AppError::InvalidToken(message),
            StatusCode::FORBIDDEN => AppError::Forbidden(message),
            StatusCode::NOT_FOUND => AppError::NotFound(message),
            StatusCode::CONFLICT => AppError::Conflict(message),
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => AppError::Timeout,
            _ => AppError::Internal(format!("status={}, message={}", status, message)),
        }
    }

    /// User-facing text rendered inline by the owning flow.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Network(_) | AppError::Timeout => "処理中にエラーが発生しました。もう一度お試しください",
            AppError::BadRequest(_) => "トークンが見つからないか、形式が正しくありません",
            AppError::InvalidToken(_) => "トークンの有効期限が切れているか、無効です",
            AppError::Forbidden(_) => "この組織に対する権限がありません",
            AppError::NotFound(_) => "対象が見つかりません",
            AppError::Conflict(_) => "すでに貸出中か、予約できない状態です",
            AppError::Validation(_) | AppError::Upload(_) => "入力内容を確認してください",
            AppError::Internal(_) => "処理中にエラーが発生しました。もう一度お試しください",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_classification() {
        assert!(matches!(
            AppError::from_status(StatusCode::BAD_REQUEST, "missing token".into()),
            AppError::BadRequest(_)
        ));
        assert!(matches!(
            AppError::from_status(StatusCode::UNAUTHORIZED, "expired".into()),
            AppError::InvalidToken(_)
        ));
        assert!(matches!(
            AppError::from_status(StatusCode::FORBIDDEN, "wrong org".into()),
            AppError::Forbidden(_)
        ));
        assert!(matches!(
            AppError::from_status(StatusCode::NOT_FOUND, "no unit".into()),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            AppError::from_status(StatusCode::CONFLICT, "already rented".into()),
            AppError::Conflict(_)
        ));
        assert!(matches!(
            AppError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "boom".into()),
            AppError::Internal(_)
        ));
    }

    #[test]
    fn test_forbidden_message_distinct_from_invalid_token() {
        let forbidden = AppError::Forbidden("org mismatch".into());
        let invalid = AppError::InvalidToken("expired".into());
        assert_ne!(forbidden.user_message(), invalid.user_message());
    }
}
