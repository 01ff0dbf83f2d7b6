//! Pagination input and response metadata shared by list endpoints

use serde::{Deserialize, Serialize};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Pagination input accepted by list operations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct PaginationInput {
    /// 1-based page number
    pub page: Option<u32>,
    /// Page size
    pub limit: Option<u32>,
    /// Raw offset; takes precedence over `page` when set
    pub offset: Option<u32>,
}

impl PaginationInput {
    pub fn get_offset(&self) -> u32 {
        if let Some(offset) = self.offset {
            return offset;
        }
        let page = self.page.unwrap_or(1).max(1);
        let limit = self.limit.unwrap_or(50);
        (page - 1) * limit
    }

    pub fn get_limit(&self) -> u32 {
        self.limit.unwrap_or(50).clamp(1, 500)
    }
}

/// Pagination metadata attached to list responses
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
    pub has_previous: bool,
    pub has_next: bool,
    pub offset: u32,
}

impl PaginationMeta {
    /// Build metadata from an offset/limit window over `total` items
    pub fn from_window(offset: u32, limit: u32, total: u64) -> Self {
        let limit = limit.max(1);
        let page = offset / limit + 1;
        let total_pages = total.div_ceil(limit as u64) as u32;
        Self {
            page,
            limit,
            total,
            total_pages,
            has_previous: page > 1,
            has_next: (page as u64) * (limit as u64) < total,
            offset,
        }
    }
}

/// A page of items plus its pagination metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub meta: PaginationMeta,
}

impl<T> ListResponse<T> {
    /// Wrap a fully-materialized vector as a single-page response
    pub fn from_vec(items: Vec<T>) -> Self {
        let total = items.len() as u64;
        Self {
            items,
            meta: PaginationMeta::from_window(0, total.max(1) as u32, total),
        }
    }
}
