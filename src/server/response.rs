//! Response envelope and error mapping for the HTTP surface

use crate::convert::ConversionError;
use crate::normalize::normalize;
use crate::store::StoreError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

pub const INTERNAL_ERROR: &str = "Internal server error";
pub const CONVERSION_FAILED: &str = "Currency conversion failed";

#[derive(Debug, Serialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Envelope {
    pub fn data(data: Value) -> Self {
        Envelope {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn done() -> Self {
        Envelope {
            success: true,
            data: None,
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Envelope {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

pub type ApiResult = Result<(StatusCode, Json<Envelope>), ApiError>;

/// Serializes `data`, normalizes it and wraps it in a success envelope.
pub fn respond<T: Serialize>(status: StatusCode, data: &T) -> ApiResult {
    let value = serde_json::to_value(data).map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok((status, Json(Envelope::data(normalize(value)))))
}

pub fn respond_done() -> ApiResult {
    Ok((StatusCode::OK, Json(Envelope::done())))
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    /// Status and client-safe message. Upstream and storage details stay in
    /// the logs.
    pub fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::Validation(message) => (StatusCode::BAD_REQUEST, message.clone()),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message.clone()),
            ApiError::Conversion(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, CONVERSION_FAILED.to_string())
            }
            ApiError::Store(StoreError::Duplicate(id)) => (
                StatusCode::CONFLICT,
                format!("Project {id} already exists"),
            ),
            ApiError::Store(_) | ApiError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        } else {
            debug!(error = %self, %status, "Request rejected");
        }
        (status, Json(Envelope::error(message))).into_response()
    }
}
