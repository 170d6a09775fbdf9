use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub const UNKNOWN_ERROR: &str = "Unknown Error";

/// Everything a handler can fail with, rendered as a JSON envelope.
#[derive(Debug)]
pub enum AppError {
    /// Client mistake; the body carries only `message`.
    BadRequest(String),
    /// Body exceeded the configured upload limit; `message` only, status 413.
    PayloadTooLarge(String),
    /// Anything else. Logged with its full cause chain; the body carries
    /// `message` plus a one-line description of the cause.
    Failure {
        status: StatusCode,
        message: String,
        source: Option<anyhow::Error>,
    },
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest(message.into())
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        AppError::PayloadTooLarge(message.into())
    }

    pub fn failure<E>(message: impl Into<String>, err: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        AppError::Failure {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
            source: Some(err.into()),
        }
    }

    pub fn with_status(self, status: StatusCode) -> Self {
        match self {
            AppError::Failure { message, source, .. } => AppError::Failure { status, message, source },
            other => other,
        }
    }
}

/// The client-facing description of a cause: its top-level message, or
/// `"Unknown Error"` when there is nothing to say.
pub fn describe(err: Option<&anyhow::Error>) -> String {
    match err.map(|e| e.to_string()) {
        Some(text) if !text.trim().is_empty() => text,
        _ => UNKNOWN_ERROR.to_string(),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "message": message }))).into_response()
            }
            AppError::PayloadTooLarge(message) => {
                (StatusCode::PAYLOAD_TOO_LARGE, Json(json!({ "message": message }))).into_response()
            }
            AppError::Failure { status, message, source } => {
                match &source {
                    Some(err) => tracing::error!("[API Error] {}: {:?}", message, err),
                    None => tracing::error!("[API Error] {}", message),
                }

                let body = Json(json!({
                    "message": message,
                    "error": describe(source.as_ref()),
                }));

                (status, body).into_response()
            }
        }
    }
}

/// Attaches the route's failure message to any error on the way out.
pub trait ApiContext<T> {
    fn api_context(self, message: &str) -> Result<T, AppError>;
}

impl<T, E> ApiContext<T> for Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn api_context(self, message: &str) -> Result<T, AppError> {
        self.map_err(|e| AppError::failure(message, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_failure_envelope() {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let response = AppError::failure("Event Fetching Failed", err).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Event Fetching Failed");
        assert_eq!(body["error"], "disk on fire");
    }

    #[tokio::test]
    async fn test_custom_status_and_unknown_cause() {
        let response = AppError::Failure {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Something broke".into(),
            source: None,
        }
        .with_status(StatusCode::BAD_GATEWAY)
        .into_response();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert_eq!(body["error"], UNKNOWN_ERROR);
    }

    #[tokio::test]
    async fn test_bad_request_has_message_only() {
        let response = AppError::bad_request("Image is required").into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Image is required");
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn test_payload_too_large_has_message_only() {
        let response = AppError::payload_too_large("Upload is too large").into_response();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Upload is too large");
        assert!(body.get("error").is_none());
    }

    #[test]
    fn test_describe_blank_message() {
        let err = anyhow::anyhow!("   ");
        assert_eq!(describe(Some(&err)), UNKNOWN_ERROR);
        assert_eq!(describe(None), UNKNOWN_ERROR);
    }
}
