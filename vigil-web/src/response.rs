//! Standard response envelope
//!
//! Success bodies are `{"data": ..., "meta": {...}?}`. List endpoints attach
//! pagination metadata; single resources usually skip `meta` entirely.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use vigil_api_types::{ListResponse, PaginationMeta};

/// Response envelope for successful requests
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

/// Metadata block attached to list responses
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationMeta>,
    pub timestamp: DateTime<Utc>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Bare envelope without metadata
    pub fn new(data: T) -> Self {
        Self { data, meta: None }
    }

    /// Envelope with pagination metadata
    pub fn with_pagination(data: T, pagination: PaginationMeta) -> Self {
        Self {
            data,
            meta: Some(ResponseMeta {
                pagination: Some(pagination),
                timestamp: Utc::now(),
            }),
        }
    }
}

impl<T: Serialize> From<ListResponse<T>> for ApiResponse<Vec<T>> {
    fn from(list: ListResponse<T>) -> Self {
        ApiResponse::with_pagination(list.items, list.meta)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// 200 with the bare envelope
pub fn ok<T: Serialize>(data: T) -> Response {
    ApiResponse::new(data).into_response()
}

/// 201 with the bare envelope
pub fn created<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, ApiResponse::new(data)).into_response()
}

/// 204 with an empty body
pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}
