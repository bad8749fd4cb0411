mod caixas;
mod projetos;
mod tipos_cabo;

use std::sync::Arc;

use axum::Router;

use crate::catalog::Catalog;
use crate::engine::LifecycleEngine;
use crate::labels::LabelRenderer;

/// Build the complete inventory router. Paths are relative to `/api`.
///
/// Routes:
/// - `GET    /tipos-cabo`               list cable types
/// - `POST   /tipos-cabo`               register cable type
/// - `GET    /projetos`                 list projects
/// - `POST   /projetos`                 register project
/// - `GET    /caixas`                   list boxes
/// - `POST   /caixas`                   create box
/// - `GET    /caixas/{id}`              get box
/// - `GET    /caixas/buscar/{codigo}`   lookup by code
/// - `POST   /caixas/{id}/abrir`        open box
/// - `POST   /caixas/{id}/fechar`       close box
/// - `GET    /caixas/{id}/usos`         usage history
/// - `GET    /caixas/{id}/qrcode`       QR label (SVG)
pub fn router(
    catalog: Arc<Catalog>,
    engine: Arc<LifecycleEngine>,
    labels: Arc<LabelRenderer>,
) -> Router {
    Router::new()
        .merge(tipos_cabo::router(Arc::clone(&catalog)))
        .merge(projetos::router(catalog))
        .merge(caixas::router(engine, labels))
}
