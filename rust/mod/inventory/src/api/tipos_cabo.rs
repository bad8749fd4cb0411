use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use cabos_core::{JsonBody, ServiceError};

use crate::catalog::Catalog;
use crate::model::{CableType, CreateCableTypeRequest, Created};

type CatalogState = Arc<Catalog>;

pub fn router(catalog: Arc<Catalog>) -> Router {
    Router::new()
        .route("/tipos-cabo", get(list_cable_types).post(create_cable_type))
        .with_state(catalog)
}

/// GET /tipos-cabo: all cable types, by name.
async fn list_cable_types(
    State(catalog): State<CatalogState>,
) -> Result<Json<Vec<CableType>>, ServiceError> {
    Ok(Json(catalog.cable_types()?))
}

/// POST /tipos-cabo
async fn create_cable_type(
    State(catalog): State<CatalogState>,
    JsonBody(req): JsonBody<CreateCableTypeRequest>,
) -> Result<(StatusCode, Json<Created>), ServiceError> {
    let tipo = catalog.register_cable_type(req)?;
    Ok((
        StatusCode::CREATED,
        Json(Created {
            id: tipo.id,
            numero: None,
            message: "Tipo de cabo criado com sucesso".into(),
        }),
    ))
}
