use std::sync::Arc;

use cabos_blob::BlobStore;
use cabos_core::ServiceError;
use qrcode::QrCode;
use qrcode::render::svg;
use tracing::debug;

/// Content type of the rendered labels.
pub const LABEL_CONTENT_TYPE: &str = "image/svg+xml";

/// Smallest edge of a rendered label, in pixels.
const MIN_DIMENSION: u32 = 240;

/// Renders box codes as QR images and caches them in the blob store.
///
/// The QR payload is the box `numero` verbatim: scanning a label yields the
/// code the lookup endpoint expects.
pub struct LabelRenderer {
    blobs: Arc<dyn BlobStore>,
}

impl LabelRenderer {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }

    /// Return the SVG label for `numero`, rendering it on first use.
    pub fn qrcode(&self, numero: &str) -> Result<Vec<u8>, ServiceError> {
        let key = blob_key(numero);
        if let Some(cached) = self
            .blobs
            .get(&key)
            .map_err(ServiceError::storage)?
        {
            return Ok(cached);
        }

        let image = render_svg(numero)?.into_bytes();
        self.blobs
            .put(&key, &image)
            .map_err(ServiceError::storage)?;
        debug!(numero, key = %key, "qr label rendered");
        Ok(image)
    }
}

fn blob_key(numero: &str) -> String {
    format!("qrcodes/{numero}.svg")
}

/// Encode `text` as a QR code rendered to an SVG document.
pub fn render_svg(text: &str) -> Result<String, ServiceError> {
    let code = QrCode::new(text.as_bytes())
        .map_err(|e| ServiceError::Internal(format!("qr encode '{text}': {e}")))?;
    Ok(code
        .render::<svg::Color>()
        .min_dimensions(MIN_DIMENSION, MIN_DIMENSION)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build())
}
