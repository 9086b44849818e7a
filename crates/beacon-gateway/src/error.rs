use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use beacon_counter::PersistenceError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Request-scoped failures. None of these outlive the request that hit them.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to record event: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("failed to load template {name}: {source}")]
    Template {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

impl GatewayError {
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::Persistence(_) => "PERSISTENCE_ERROR",
            GatewayError::Template { .. } => "TEMPLATE_ERROR",
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        error!(code = self.code(), error = %self, "request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody {
                error: self.to_string(),
                code: self.code(),
            }),
        )
            .into_response()
    }
}
