use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use cabos_core::{JsonBody, ServiceError};

use crate::engine::LifecycleEngine;
use crate::labels::{LABEL_CONTENT_TYPE, LabelRenderer};
use crate::model::{
    CableBox, CloseBoxRequest, CloseOutcome, CreateBoxRequest, Created, OpenBoxRequest, Usage,
};

#[derive(Clone)]
struct BoxState {
    engine: Arc<LifecycleEngine>,
    labels: Arc<LabelRenderer>,
}

pub fn router(engine: Arc<LifecycleEngine>, labels: Arc<LabelRenderer>) -> Router {
    Router::new()
        .route("/caixas", get(list_boxes).post(create_box))
        .route("/caixas/buscar/{codigo}", get(lookup_box))
        .route("/caixas/{id}", get(get_box))
        .route("/caixas/{id}/abrir", post(open_box))
        .route("/caixas/{id}/fechar", post(close_box))
        .route("/caixas/{id}/usos", get(list_usages))
        .route("/caixas/{id}/qrcode", get(box_qrcode))
        .with_state(BoxState { engine, labels })
}

/// Path ids are parsed by hand so a malformed id answers with the JSON
/// error body rather than axum's plain-text rejection.
fn parse_id(raw: &str) -> Result<i64, ServiceError> {
    raw.trim()
        .parse()
        .map_err(|_| ServiceError::NotFound(format!("caixa '{raw}' não encontrada")))
}

// ---------------------------------------------------------------------------
// GET /caixas
// ---------------------------------------------------------------------------

async fn list_boxes(State(state): State<BoxState>) -> Result<Json<Vec<CableBox>>, ServiceError> {
    Ok(Json(state.engine.list()?))
}

// ---------------------------------------------------------------------------
// POST /caixas
// ---------------------------------------------------------------------------

async fn create_box(
    State(state): State<BoxState>,
    JsonBody(req): JsonBody<CreateBoxRequest>,
) -> Result<(StatusCode, Json<Created>), ServiceError> {
    let caixa = state.engine.create(req.tipo_cabo_id, req.quantidade_inicial)?;
    Ok((
        StatusCode::CREATED,
        Json(Created {
            id: caixa.id,
            numero: Some(caixa.numero),
            message: "Caixa criada com sucesso".into(),
        }),
    ))
}

// ---------------------------------------------------------------------------
// GET /caixas/buscar/:codigo
// ---------------------------------------------------------------------------

/// Scanned and typed codes are trimmed and uppercased; stored codes are
/// always uppercase.
async fn lookup_box(
    State(state): State<BoxState>,
    Path(codigo): Path<String>,
) -> Result<Json<CableBox>, ServiceError> {
    let codigo = codigo.trim().to_uppercase();
    Ok(Json(state.engine.lookup(&codigo)?))
}

// ---------------------------------------------------------------------------
// GET /caixas/:id
// ---------------------------------------------------------------------------

async fn get_box(
    State(state): State<BoxState>,
    Path(id): Path<String>,
) -> Result<Json<CableBox>, ServiceError> {
    Ok(Json(state.engine.get(parse_id(&id)?)?))
}

// ---------------------------------------------------------------------------
// POST /caixas/:id/abrir
// ---------------------------------------------------------------------------

async fn open_box(
    State(state): State<BoxState>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<OpenBoxRequest>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let caixa = state.engine.open(parse_id(&id)?, req)?;
    Ok(Json(serde_json::json!({
        "message": "Caixa aberta com sucesso",
        "caixa": caixa,
    })))
}

// ---------------------------------------------------------------------------
// POST /caixas/:id/fechar
// ---------------------------------------------------------------------------

async fn close_box(
    State(state): State<BoxState>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<CloseBoxRequest>,
) -> Result<Json<CloseOutcome>, ServiceError> {
    Ok(Json(state.engine.close(parse_id(&id)?, req)?))
}

// ---------------------------------------------------------------------------
// GET /caixas/:id/usos
// ---------------------------------------------------------------------------

async fn list_usages(
    State(state): State<BoxState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Usage>>, ServiceError> {
    Ok(Json(state.engine.usages(parse_id(&id)?)?))
}

// ---------------------------------------------------------------------------
// GET /caixas/:id/qrcode
// ---------------------------------------------------------------------------

async fn box_qrcode(
    State(state): State<BoxState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let caixa = state.engine.get(parse_id(&id)?)?;
    let image = state.labels.qrcode(&caixa.numero)?;
    Ok(([(header::CONTENT_TYPE, LABEL_CONTENT_TYPE)], image))
}
