use crate::repo::RepoError;
use derive_more::{Display, Error};
use ntex::{http, web};
use serde_json::json;

/// Failures of the onboarding API, rendered as `{"success": false, "error": ...}`
#[derive(Debug, Display, Error, PartialEq, Eq)]
pub enum ApiError {
    #[display("{_0}")]
    Validation(#[error(not(source))] String),
    /// `caller_input` marks failures caused by what the caller sent, like a
    /// stale authorization code, as opposed to the platform misbehaving.
    #[display("{detail}")]
    Upstream { detail: String, caller_input: bool },
    #[display("{_0}")]
    NotFound(#[error(not(source))] String),
    #[display("{_0}")]
    Persistence(#[error(not(source))] String),
    #[display("Deadline exceeded while {_0}")]
    DeadlineExceeded(#[error(not(source))] String),
}

impl ApiError {
    pub fn invalid_body() -> Self {
        ApiError::Validation("Invalid request body".to_string())
    }

    /// Short label used for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation",
            ApiError::Upstream { .. } => "upstream",
            ApiError::NotFound(_) => "not_found",
            ApiError::Persistence(_) => "persistence",
            ApiError::DeadlineExceeded(_) => "deadline_exceeded",
        }
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(waba_id) => {
                ApiError::NotFound(format!("Business account not found: {waba_id}"))
            }
            RepoError::Storage(msg) => ApiError::Persistence(msg),
        }
    }
}

impl web::error::WebResponseError for ApiError {
    fn error_response(&self, _: &web::HttpRequest) -> web::HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), "{}", self);
        } else {
            tracing::warn!(kind = self.kind(), "{}", self);
        }

        web::HttpResponse::build(status).json(&json!({
            "success": false,
            "error": self.to_string(),
        }))
    }

    fn status_code(&self) -> http::StatusCode {
        match *self {
            ApiError::Validation(_) => http::StatusCode::BAD_REQUEST,
            ApiError::Upstream {
                caller_input: true, ..
            } => http::StatusCode::BAD_REQUEST,
            ApiError::Upstream { .. } => http::StatusCode::BAD_GATEWAY,
            ApiError::NotFound(_) => http::StatusCode::NOT_FOUND,
            ApiError::Persistence(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::DeadlineExceeded(_) => http::StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

#[derive(Debug, Display, Error, PartialEq, Eq)]
pub enum WebhookError {
    /// Handshake rejected, answered with an empty body
    Forbidden,
    MalformedPayload(#[error(not(source))] String),
}

impl web::error::WebResponseError for WebhookError {
    fn error_response(&self, _: &web::HttpRequest) -> web::HttpResponse {
        match self {
            WebhookError::Forbidden => {
                tracing::warn!("webhook verification rejected");
                web::HttpResponse::build(self.status_code()).finish()
            }
            WebhookError::MalformedPayload(msg) => {
                tracing::error!("failed to parse webhook payload: {}", msg);
                web::HttpResponse::build(self.status_code())
                    .content_type("text/plain; charset=utf-8")
                    .body("Invalid JSON")
            }
        }
    }

    fn status_code(&self) -> http::StatusCode {
        match *self {
            WebhookError::Forbidden => http::StatusCode::FORBIDDEN,
            WebhookError::MalformedPayload(_) => http::StatusCode::BAD_REQUEST,
        }
    }
}
