//! HTTP API gateway for AYMARA.
//!
//! Exposes a health check and the v1 consultation/context API.
//!
//! Built on Axum. Layers applied to every route, outermost first:
//! - HTTP trace logging
//! - Request id (`X-Request-ID`) with start/finish logging
//! - CORS from configuration
//! - Request body size limit

pub mod api_v1;
pub mod error;

use std::sync::Arc;
use std::time::Instant;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    middleware::{self, Next},
    response::{Json, Response},
    routing::get,
};
use aymara_agent::Assistant;
use aymara_config::{AppConfig, GatewayConfig};
use aymara_context::{ContextStore, IdentityPolicy};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

pub use error::{ApiError, RequestId, RequestMeta};

/// Header carrying the request id.
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Build the full router: `/health` plus the v1 API under `/api/v1`.
pub fn build_router(api_state: api_v1::SharedApiState, gateway: &GatewayConfig) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .nest("/api/v1", api_v1::v1_router(api_state))
        .layer(DefaultBodyLimit::max(gateway.body_limit_bytes))
        .layer(cors_layer(&gateway.cors_origins))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// CORS restricted to the configured origins. No origins means no
/// cross-origin access.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-pregunta"),
            HeaderName::from_static("x-id-empleado"),
            REQUEST_ID_HEADER,
        ])
        .expose_headers([REQUEST_ID_HEADER])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// Start the gateway HTTP server.
///
/// Fails before binding when the model backend has no credential.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let provider = aymara_providers::build_from_config(&config)?;

    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let store = Arc::new(ContextStore::new(IdentityPolicy::from(&config.context)));
    let assistant = Arc::new(Assistant::from_config(&config, provider, store));
    info!(
        provider = %assistant.provider_name(),
        model = %assistant.settings().model,
        persona = %assistant.persona().source,
        "Assistant ready"
    );

    let api_state = Arc::new(api_v1::ApiV1State::new(assistant));
    let app = build_router(api_state, &config.gateway);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Assign a request id (reusing the caller's `X-Request-ID` when present),
/// echo it on the response, and log start and completion.
async fn request_id_middleware(mut req: axum::extract::Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let method = req.method().clone();
    let path = req.uri().path().to_string();
    req.extensions_mut().insert(RequestId(request_id.clone()));

    let started = Instant::now();
    info!(request_id = %request_id, method = %method, path = %path, "Request started");

    let mut response = next.run(req).await;

    info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        duration_ms = started.elapsed().as_millis() as u64,
        "Request completed"
    );

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use aymara_core::error::ProviderError;
    use aymara_core::message::Message;
    use aymara_core::provider::{Provider, ProviderRequest, ProviderResponse};

    struct EchoProvider;

    #[async_trait::async_trait]
    impl Provider for EchoProvider {
        fn name(&self) -> &str {
            "echo_mock"
        }

        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            let last = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(ProviderResponse {
                message: Message::assistant(last),
                usage: None,
                model: "mock-model".into(),
            })
        }
    }

    fn test_app(gateway: &GatewayConfig) -> Router {
        let config = AppConfig::default();
        let store = Arc::new(ContextStore::default());
        let assistant = Arc::new(Assistant::from_config(&config, Arc::new(EchoProvider), store));
        build_router(Arc::new(api_v1::ApiV1State::new(assistant)), gateway)
    }

    #[tokio::test]
    async fn health_endpoint() {
        let app = test_app(&GatewayConfig::default());

        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(&REQUEST_ID_HEADER));

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn caller_request_id_is_echoed() {
        let app = test_app(&GatewayConfig::default());
        let req = Request::builder()
            .uri("/health")
            .header("x-request-id", "abc-123")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.headers()[&REQUEST_ID_HEADER], "abc-123");
    }

    #[tokio::test]
    async fn error_body_has_full_path_and_request_id() {
        let app = test_app(&GatewayConfig::default());
        let req = Request::builder()
            .method("POST")
            .uri("/api/v1/aymara/consulta")
            .header("content-type", "application/json")
            .header("x-request-id", "req-9")
            .body(Body::from(r#"{"pregunta": "hi"}"#))
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["path"], "/api/v1/aymara/consulta");
        assert_eq!(json["requestId"], "req-9");
    }

    #[tokio::test]
    async fn answers_through_nested_api() {
        let app = test_app(&GatewayConfig::default());
        let req = Request::builder()
            .method("POST")
            .uri("/api/v1/aymara/consulta")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"pregunta": "¿Qué es una glosa?"}"#))
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["respuesta"], "¿Qué es una glosa?");
        assert!(json["meta"]["tokens"].is_null());
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let gateway = GatewayConfig {
            body_limit_bytes: 64,
            ..GatewayConfig::default()
        };
        let app = test_app(&gateway);
        let big = format!(r#"{{"vista": "{}"}}"#, "x".repeat(256));
        let req = Request::builder()
            .method("POST")
            .uri("/api/v1/aymara/contexto")
            .header("content-type", "application/json")
            .body(Body::from(big))
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn cors_allows_configured_origin() {
        let gateway = GatewayConfig {
            cors_origins: vec!["http://intranet.local".into()],
            ..GatewayConfig::default()
        };
        let app = test_app(&gateway);
        let req = Request::builder()
            .uri("/health")
            .header("origin", "http://intranet.local")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://intranet.local"
        );
    }

    #[tokio::test]
    async fn start_fails_without_api_key() {
        let err = start(AppConfig::default()).await.unwrap_err();
        assert!(err.to_string().contains("Missing credential"));
    }
}
