//! Batch import endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use flats_core::imports::{DEFAULT_HISTORY_PAGE_SIZE, DEFAULT_LATEST_LIMIT, MAX_LATEST_LIMIT};
use flats_types::{ImportHistoryDto, PageRequest, PagedResponse, RawImportOperation};
use serde::Deserialize;

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery};
use crate::state::AppState;

/// Query parameters for `GET /import/history`.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    /// Zero-based page index.
    pub page: Option<i64>,
    /// Page size (default 10).
    pub size: Option<i64>,
}

impl HistoryParams {
    fn page_request(&self, max_size: u32) -> Result<PageRequest, ApiError> {
        Ok(PageRequest::try_new(
            self.page.unwrap_or(0),
            self.size.unwrap_or(i64::from(DEFAULT_HISTORY_PAGE_SIZE)),
            max_size,
        )?)
    }
}

/// Query parameters for `GET /import/history/latest`.
#[derive(Debug, Default, Deserialize)]
pub struct LatestParams {
    /// Number of entries to return (default 5, at most 500).
    pub limit: Option<i64>,
}

impl LatestParams {
    fn limit(&self) -> Result<u32, ApiError> {
        let Some(raw) = self.limit else {
            return Ok(DEFAULT_LATEST_LIMIT);
        };
        u32::try_from(raw)
            .ok()
            .filter(|l| (1..=MAX_LATEST_LIMIT).contains(l))
            .ok_or_else(|| {
                ApiError::bad_request(format!("limit must be between 1 and {MAX_LATEST_LIMIT}"))
            })
    }
}

/// `POST /import`
///
/// The body is a JSON array of operations. Either every operation is
/// applied or none is.
pub async fn import_batch(
    State(state): State<Arc<AppState>>,
    ApiJson(operations): ApiJson<Vec<RawImportOperation>>,
) -> Result<impl IntoResponse, ApiError> {
    let history = state.services.imports.import(operations).await?;
    Ok((StatusCode::CREATED, Json(history)))
}

/// `GET /import/history?page=0&size=10`
pub async fn import_history(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<HistoryParams>,
) -> Result<Json<PagedResponse<ImportHistoryDto>>, ApiError> {
    let page = params.page_request(state.limits.max_page_size)?;
    Ok(Json(state.services.imports.history(page).await?))
}

/// `GET /import/history/latest?limit=5`
pub async fn latest_imports(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<LatestParams>,
) -> Result<Json<Vec<ImportHistoryDto>>, ApiError> {
    let limit = params.limit()?;
    Ok(Json(state.services.imports.latest(limit).await?))
}
