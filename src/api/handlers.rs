use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
    http::HeaderValue,
    response::{IntoResponse, Response},
};
use std::path::Path;
use std::time::Instant;

use crate::error::AppError;
use crate::upload::UploadStore;

use super::AppState;
use super::models::{ANALYSIS_SOURCE_HEADER, HealthResponse, IMAGE_FIELD};

pub async fn analyze_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    let start = Instant::now();

    let mut multipart = multipart.map_err(|e| {
        tracing::debug!("rejected non-multipart request: {}", e);
        AppError::NoImageProvided
    })?;
    let image = read_image(&state.uploads, &mut multipart).await?;

    let analysis = state.pipeline.analyze(&image).await;
    let origin = analysis.origin.as_str();

    tracing::info!(
        origin,
        bytes = image.len(),
        products = analysis.result.products.len(),
        processing_time_ms = start.elapsed().as_millis() as u64,
        "analyzed upload"
    );

    let mut response = Json(analysis.result).into_response();
    response
        .headers_mut()
        .insert(ANALYSIS_SOURCE_HEADER, HeaderValue::from_static(origin));
    Ok(response)
}

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Spools the `image` field to the scratch directory and reads it back.
/// The scratch file is gone once this returns, on every path.
async fn read_image(uploads: &UploadStore, multipart: &mut Multipart) -> Result<Vec<u8>, AppError> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidUpload(e.body_text()))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        if let Some(content_type) = field.content_type() {
            if !content_type.starts_with("image/") {
                return Err(AppError::UnsupportedMediaType(content_type.to_string()));
            }
        }

        let extension = field
            .file_name()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(str::to_string);

        let mut staged = uploads.create(extension.as_deref()).await?;
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AppError::InvalidUpload(e.body_text()))?
        {
            staged.write_chunk(&chunk).await?;
        }

        if staged.is_empty() {
            return Err(AppError::NoImageProvided);
        }
        return staged.into_bytes().await;
    }

    Err(AppError::NoImageProvided)
}
