//! HTTP API v1: consultation and context endpoints.
//!
//! Endpoints (nested under `/api/v1`):
//!
//! - `GET    /aymara/consulta`       : Ask via query string
//! - `POST   /aymara/consulta`       : Ask via JSON body
//! - `POST   /aymara/contexto`       : Store context, optionally ask
//! - `GET    /aymara/contexto/{id}`  : Read stored context
//! - `DELETE /aymara/contexto/{id}`  : Remove stored context

use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{Path, Query as QueryParams, State},
    http::HeaderMap,
    response::Json,
    routing::{get, post},
};
use aymara_agent::{Answer, Assistant, Query};
use aymara_context::{ContextStore, RenderedContext, normalize};
use aymara_core::identity::Identity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{ApiError, RequestMeta};

/// Message when the question is missing or blank.
const EMPTY_QUESTION: &str = "La pregunta no puede estar vacía";

const MSG_CONTEXT_CREATED: &str = "Se ha creado el contexto correctamente";
const MSG_CONTEXT_AND_ANSWER: &str = "Contexto guardado y consulta procesada";
const MSG_ANSWER_ONLY: &str = "Consulta procesada";
const MSG_NOTHING_TO_DO: &str = "No se proporcionó contexto ni consulta para procesar";

/// Headers that may carry the question on `POST /aymara/contexto`.
const QUESTION_HEADERS: &[&str] = &["x-pregunta", "pregunta"];
/// Headers that may carry the identity on `POST /aymara/contexto`.
const IDENTITY_HEADERS: &[&str] = &["x-id-empleado", "id-empleado"];

// ── State ─────────────────────────────────────────────────────────────────

/// Shared state for the v1 API.
pub struct ApiV1State {
    pub assistant: Arc<Assistant>,
    pub store: Arc<ContextStore>,
}

impl ApiV1State {
    pub fn new(assistant: Arc<Assistant>) -> Self {
        let store = assistant.store().clone();
        Self { assistant, store }
    }
}

pub type SharedApiState = Arc<ApiV1State>;

// ── Router ────────────────────────────────────────────────────────────────

/// Build the v1 API router. Nest this under "/api/v1" in the main router.
pub fn v1_router(state: SharedApiState) -> Router {
    Router::new()
        .route(
            "/aymara/consulta",
            get(consulta_query_handler).post(consulta_body_handler),
        )
        .route("/aymara/contexto", post(contexto_handler))
        .route(
            "/aymara/contexto/{id}",
            get(get_contexto_handler).delete(delete_contexto_handler),
        )
        .with_state(state)
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultaParams {
    #[serde(default)]
    pub pregunta: Option<String>,
    #[serde(default)]
    pub id_empleado: Option<String>,
    #[serde(default)]
    pub contexto: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultaRequest {
    #[serde(default)]
    pub pregunta: Option<String>,
    /// Free text, escaped JSON, or a context object
    #[serde(default)]
    pub contexto: Option<Value>,
    #[serde(default)]
    pub id_empleado: Option<Value>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Meta {
    pub tokens: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConsultaResponse {
    pub respuesta: String,
    pub meta: Meta,
}

impl From<Answer> for ConsultaResponse {
    fn from(answer: Answer) -> Self {
        Self {
            respuesta: answer.text,
            meta: Meta {
                tokens: answer.tokens,
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextoResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub respuesta: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_empleado: Option<Identity>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredContextResponse {
    pub id_empleado: Identity,
    pub contexto: RenderedContext,
    pub stored_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn consulta_query_handler(
    State(state): State<SharedApiState>,
    meta: RequestMeta,
    params: Result<QueryParams<ConsultaParams>, QueryRejection>,
) -> Result<Json<ConsultaResponse>, ApiError> {
    let QueryParams(params) = params.map_err(|e| ApiError::bad_request(meta.clone(), e.body_text()))?;
    let question = required_question(params.pregunta, &meta)?;

    let context = params
        .contexto
        .map(|raw| normalize(Some(&Value::String(raw))).into_string());

    let query = Query {
        question,
        context,
        identity: params.id_empleado.as_deref().and_then(Identity::parse),
        metadata: None,
    };

    let answer = state
        .assistant
        .process(query)
        .await
        .map_err(|e| ApiError::consult(meta, e))?;
    Ok(Json(answer.into()))
}

async fn consulta_body_handler(
    State(state): State<SharedApiState>,
    meta: RequestMeta,
    body: Result<Json<ConsultaRequest>, JsonRejection>,
) -> Result<Json<ConsultaResponse>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::bad_request(meta.clone(), e.body_text()))?;
    let question = required_question(body.pregunta, &meta)?;

    if let Some(contexto) = &body.contexto {
        debug!(kind = value_kind(contexto), "Context supplied with question");
    }
    let context = body
        .contexto
        .as_ref()
        .map(|raw| normalize(Some(raw)).into_string());

    let query = Query {
        question,
        context,
        identity: body.id_empleado.as_ref().and_then(Identity::from_value),
        metadata: body.metadata,
    };

    let answer = state
        .assistant
        .process(query)
        .await
        .map_err(|e| ApiError::consult(meta, e))?;
    Ok(Json(answer.into()))
}

/// Store the body as context (or its `contextoMedico` member), then answer
/// the question from the `x-pregunta` header if there is one.
async fn contexto_handler(
    State(state): State<SharedApiState>,
    meta: RequestMeta,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ContextoResponse>, ApiError> {
    let body: Value = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::bad_request(meta.clone(), format!("Cuerpo JSON inválido: {e}")))?
    };

    let question = header_text(&headers, QUESTION_HEADERS);
    let explicit = body
        .get("idEmpleado")
        .and_then(Identity::from_value)
        .or_else(|| header_text(&headers, IDENTITY_HEADERS).and_then(|h| Identity::parse(&h)));

    let context = body
        .get("contextoMedico")
        .filter(|c| has_content(c))
        .unwrap_or(&body);

    let mut stored: Option<(Identity, RenderedContext)> = None;
    if has_content(context) {
        let identity = state.store.put(explicit.clone(), Some(context)).await;
        let text = state.store.get(&identity).await.unwrap_or_default();
        info!(identity = %identity, "Context received");
        stored = Some((identity, text));
    }

    let Some(question) = question else {
        let message = if stored.is_some() {
            MSG_CONTEXT_CREATED
        } else {
            MSG_NOTHING_TO_DO
        };
        return Ok(Json(ContextoResponse {
            message: message.into(),
            respuesta: None,
            meta: None,
            id_empleado: stored.map(|(identity, _)| identity),
        }));
    };

    let (identity, context_text) = match &stored {
        Some((identity, text)) if !text.is_empty() => {
            (Some(identity.clone()), Some(text.as_str().to_string()))
        }
        Some((identity, _)) => (Some(identity.clone()), None),
        None => (explicit, None),
    };

    let query = Query {
        question,
        context: context_text,
        identity: identity.clone(),
        metadata: None,
    };
    let answer = state
        .assistant
        .process(query)
        .await
        .map_err(|e| ApiError::consult(meta, e))?;

    let message = if stored.is_some() {
        MSG_CONTEXT_AND_ANSWER
    } else {
        MSG_ANSWER_ONLY
    };
    Ok(Json(ContextoResponse {
        message: message.into(),
        respuesta: Some(answer.text),
        meta: Some(Meta {
            tokens: answer.tokens,
        }),
        id_empleado: stored.map(|(identity, _)| identity),
    }))
}

async fn get_contexto_handler(
    State(state): State<SharedApiState>,
    meta: RequestMeta,
    Path(id): Path<String>,
) -> Result<Json<StoredContextResponse>, ApiError> {
    let identity = parse_identity(&id, &meta)?;
    match state.store.entry(&identity).await {
        Some(entry) => Ok(Json(StoredContextResponse {
            id_empleado: entry.identity,
            contexto: entry.text,
            stored_at: entry.stored_at,
        })),
        None => Err(ApiError::not_found(
            meta,
            format!("No hay contexto almacenado para el empleado {identity}"),
        )),
    }
}

async fn delete_contexto_handler(
    State(state): State<SharedApiState>,
    meta: RequestMeta,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let identity = parse_identity(&id, &meta)?;
    let deleted = state.store.delete(&identity).await;
    Ok(Json(DeleteResponse { deleted }))
}

// ── Helpers ───────────────────────────────────────────────────────────────

fn required_question(raw: Option<String>, meta: &RequestMeta) -> Result<String, ApiError> {
    match raw {
        Some(q) if !q.trim().is_empty() => Ok(q),
        _ => Err(ApiError::bad_request(meta.clone(), EMPTY_QUESTION)),
    }
}

fn parse_identity(raw: &str, meta: &RequestMeta) -> Result<Identity, ApiError> {
    Identity::parse(raw)
        .ok_or_else(|| ApiError::bad_request(meta.clone(), "Identificador de empleado inválido"))
}

/// First non-blank value among `names`. Header bytes are read as UTF-8 so
/// accented questions survive.
fn header_text(headers: &HeaderMap, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        let value = headers.get(*name)?;
        let text = std::str::from_utf8(value.as_bytes()).ok()?.trim();
        (!text.is_empty()).then(|| text.to_string())
    })
}

/// Whether a context value has anything to store.
fn has_content(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::String(s) => !s.trim().is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Object(_) => "object",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        _ => "scalar",
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
