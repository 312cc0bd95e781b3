//! JSON error responses.
//!
//! Every failure leaves the gateway as
//! `{statusCode, timestamp, path, error, requestId}`. Backend details are
//! logged, never returned.

use std::convert::Infallible;

use axum::extract::{FromRequestParts, OriginalUri};
use axum::http::request::Parts;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use aymara_core::error::{BackendFailure, ConsultError};
use serde::Serialize;
use tracing::{error, warn};

/// Seconds suggested to clients after a capacity failure.
const RETRY_AFTER_SECS: u64 = 30;

/// Request id assigned by the request-id middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Where a request was addressed, for error bodies.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub path: String,
    pub request_id: String,
}

impl<S: Send + Sync> FromRequestParts<S> for RequestMeta {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Nested routers see a stripped URI; the original one has the prefix.
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map(|o| o.0.clone())
            .unwrap_or_else(|| parts.uri.clone());
        let path = uri
            .path_and_query()
            .map(|p| p.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string());

        let request_id = parts
            .extensions
            .get::<RequestId>()
            .map(|r| r.0.clone())
            .unwrap_or_else(|| "unknown".into());

        Ok(Self { path, request_id })
    }
}

/// An error on its way to becoming an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    meta: RequestMeta,
    retry_after: Option<u64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody<'a> {
    status_code: u16,
    timestamp: String,
    path: &'a str,
    error: &'a str,
    request_id: &'a str,
}

impl ApiError {
    pub fn new(meta: RequestMeta, status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            meta,
            retry_after: None,
        }
    }

    pub fn bad_request(meta: RequestMeta, message: impl Into<String>) -> Self {
        Self::new(meta, StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(meta: RequestMeta, message: impl Into<String>) -> Self {
        Self::new(meta, StatusCode::NOT_FOUND, message)
    }

    /// Map a consultation failure: rejected questions are 400, backend
    /// failures 503.
    pub fn consult(meta: RequestMeta, err: ConsultError) -> Self {
        match err {
            ConsultError::RejectedQuery { message } => Self::bad_request(meta, message),
            ConsultError::BackendUnavailable { cause, message } => Self {
                retry_after: (cause == BackendFailure::RateLimited).then_some(RETRY_AFTER_SECS),
                ..Self::new(meta, StatusCode::SERVICE_UNAVAILABLE, message)
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(
                request_id = %self.meta.request_id,
                path = %self.meta.path,
                status = self.status.as_u16(),
                error = %self.message,
                "Request failed"
            );
        } else {
            warn!(
                request_id = %self.meta.request_id,
                path = %self.meta.path,
                status = self.status.as_u16(),
                error = %self.message,
                "Request rejected"
            );
        }

        let body = ErrorBody {
            status_code: self.status.as_u16(),
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            path: &self.meta.path,
            error: &self.message,
            request_id: &self.meta.request_id,
        };

        let mut response = (self.status, Json(body)).into_response();
        if let Some(secs) = self.retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    fn meta() -> RequestMeta {
        RequestMeta {
            path: "/api/v1/aymara/consulta".into(),
            request_id: "req-1".into(),
        }
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn rejected_query_is_bad_request() {
        let response = ApiError::consult(meta(), ConsultError::rejected()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json["statusCode"], 400);
        assert_eq!(json["path"], "/api/v1/aymara/consulta");
        assert_eq!(json["requestId"], "req-1");
        assert_eq!(
            json["error"],
            "Esta consulta no forma parte de mi campo de conocimiento."
        );
        assert!(json["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn rate_limit_is_unavailable_with_retry_after() {
        let err = ConsultError::from_provider(&aymara_core::ProviderError::RateLimited {
            retry_after_secs: 1,
        });
        let response = ApiError::consult(meta(), err).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[header::RETRY_AFTER], "30");
    }

    #[tokio::test]
    async fn generic_failure_has_no_retry_after() {
        let err = ConsultError::from_provider(&aymara_core::ProviderError::Network("x".into()));
        let response = ApiError::consult(meta(), err).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(response.headers().get(header::RETRY_AFTER).is_none());
        let json = body_json(response).await;
        assert_eq!(json["statusCode"], 503);
    }
}
