//! Error types shared by the query layer and the ETL.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[derive(Debug, Error)]
pub enum EtlError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),
    #[error("spreadsheet error: {0}")]
    Excel(#[from] calamine::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("unrecognized format: {0}")]
    Format(String),
    #[error("invalid identifier: {0}")]
    Identifier(String),
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("{0}")]
    NoData(String),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            ApiError::Database(_) => "Error consultando la base de datos".to_string(),
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(json!({ "error": message }))
    }
}
