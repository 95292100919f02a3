//! Error types shared across the crate.
//!
//! Bad numeric data is never an error here: it degrades to zero at
//! the wire boundary.  What remains are configuration problems the
//! engine cannot paper over and rejections from the catalog, which
//! plays the role of the authoritative backend.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("salary structure {id} is not active")]
    InactiveStructure { id: u64 },

    #[error("salary structure references unknown component {id}")]
    UnknownComponent { id: u64 },

    #[error("no component with code '{code}' in this assignment")]
    UnknownComponentCode { code: String },

    #[error("percentage references form a cycle: {}", .chain.join(" -> "))]
    PercentageCycle { chain: Vec<String> },

    #[error("invalid pay period {month}/{year}")]
    InvalidPeriod { month: u32, year: i32 },
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("component code '{code}' is already in use")]
    DuplicateCode { code: String },

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u64 },

    #[error("duplicate {kind} id {id} in catalog seed")]
    DuplicateId { kind: &'static str, id: u64 },

    #[error("salary structure references unknown component {id}")]
    UnknownComponent { id: u64 },

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse catalog: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors surfaced by the HTTP layer.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Catalog(err) => catalog_status(err),
            ApiError::Engine(EngineError::InvalidPeriod { .. })
            | ApiError::Engine(EngineError::UnknownComponentCode { .. }) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Engine(EngineError::InactiveStructure { .. })
            | ApiError::Engine(EngineError::UnknownComponent { .. })
            | ApiError::Engine(EngineError::PercentageCycle { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
        }
    }
}

fn catalog_status(err: &CatalogError) -> StatusCode {
    match err {
        CatalogError::NotFound { .. } => StatusCode::NOT_FOUND,
        CatalogError::DuplicateCode { .. } => StatusCode::CONFLICT,
        CatalogError::DuplicateId { .. }
        | CatalogError::UnknownComponent { .. }
        | CatalogError::Invalid { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        CatalogError::Io(_) | CatalogError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
