use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use reqwest::StatusCode as RemoteStatus;
use thiserror::Error;

use crate::api::models::ErrorResponse;

/// Failure talking to one of the external Google APIs.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("API credentials are not configured")]
    NotConfigured,

    /// Stored without its URL, which carries the API key.
    #[error("HTTP request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("Unexpected status {status}: {text}")]
    UnexpectedStatus { status: RemoteStatus, text: String },

    #[error("Remote service returned an error: {0}")]
    Remote(String),
}

impl From<reqwest::Error> for ServiceError {
    fn from(error: reqwest::Error) -> Self {
        ServiceError::Request(error.without_url())
    }
}

impl ServiceError {
    /// Timeouts, connection failures, throttling and server-side errors are worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            ServiceError::Request(e) => e.is_timeout() || e.is_connect(),
            ServiceError::UnexpectedStatus { status, .. } => {
                status.is_server_error() || *status == RemoteStatus::TOO_MANY_REQUESTS
            }
            ServiceError::NotConfigured | ServiceError::Remote(_) => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid color format: {0:?}")]
    InvalidColorFormat(String),

    #[error("Vision service unavailable: {0}")]
    VisionUnavailable(#[source] ServiceError),

    #[error("Search service unavailable: {0}")]
    SearchUnavailable(#[source] ServiceError),

    #[error("No image provided")]
    NoImageProvided,

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("Upload storage failed: {0}")]
    Upload(#[from] std::io::Error),
}

impl AppError {
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::VisionUnavailable(e) | AppError::SearchUnavailable(e) => e.is_transient(),
            _ => false,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NoImageProvided | AppError::InvalidUpload(_) => StatusCode::BAD_REQUEST,
            AppError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to end users.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::NoImageProvided => "Aucune image fournie",
            AppError::UnsupportedMediaType(_) => "Le fichier envoyé n'est pas une image",
            AppError::InvalidUpload(_) => "Le formulaire envoyé est invalide",
            _ => "Une erreur est survenue lors de l'analyse de l'image",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("request failed: {:#}", self);
        } else {
            tracing::info!("request rejected: {}", self);
        }
        let body = ErrorResponse {
            error: self.user_message().to_string(),
        };
        (status, Json(body)).into_response()
    }
}
