use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use cabos_core::{JsonBody, ServiceError};

use crate::catalog::Catalog;
use crate::model::{CreateProjectRequest, Created, Project};

type CatalogState = Arc<Catalog>;

pub fn router(catalog: Arc<Catalog>) -> Router {
    Router::new()
        .route("/projetos", get(list_projects).post(create_project))
        .with_state(catalog)
}

/// GET /projetos: all projects, by name.
async fn list_projects(
    State(catalog): State<CatalogState>,
) -> Result<Json<Vec<Project>>, ServiceError> {
    Ok(Json(catalog.projects()?))
}

/// POST /projetos
async fn create_project(
    State(catalog): State<CatalogState>,
    JsonBody(req): JsonBody<CreateProjectRequest>,
) -> Result<(StatusCode, Json<Created>), ServiceError> {
    let projeto = catalog.register_project(req)?;
    Ok((
        StatusCode::CREATED,
        Json(Created {
            id: projeto.id,
            numero: None,
            message: "Projeto criado com sucesso".into(),
        }),
    ))
}
