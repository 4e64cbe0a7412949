use anyhow::Result;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::Config;
use crate::pipeline::Pipeline;
use crate::upload::UploadStore;

pub mod handlers;
pub mod models;

/// Room for multipart boundaries and headers on top of the image itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub uploads: UploadStore,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>, uploads: UploadStore) -> Self {
        Self { pipeline, uploads }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let pipeline = Pipeline::from_config(config)?;
        let uploads = UploadStore::new(&config.upload_dir, config.max_upload_bytes);
        Ok(Self::new(Arc::new(pipeline), uploads))
    }
}

pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let body_limit = state.uploads.max_bytes() + MULTIPART_OVERHEAD;

    Router::new()
        .route("/api/analyze", post(handlers::analyze_handler))
        .route("/api/health", get(handlers::health_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
