//! House endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use flats_types::{
    CreateHouseRequest, HouseDto, HouseId, HouseQuery, HouseSortField, PagedResponse,
    SortDirection,
};
use serde::Deserialize;

use super::{page_request, parse_or_default, search_term};
use crate::error::ApiError;
use crate::extract::{ApiPath, ApiQuery, ValidatedJson};
use crate::state::AppState;

/// Query parameters for `GET /houses`.
#[derive(Debug, Default, Deserialize)]
pub struct HouseListParams {
    /// Zero-based page index (default 0).
    pub page: Option<i64>,
    /// Page size (default 20).
    pub size: Option<i64>,
    /// Sort field (default `id`).
    pub sort: Option<String>,
    /// `asc` or `desc` (default `asc`).
    pub direction: Option<String>,
    /// Name substring, case-insensitive.
    pub name: Option<String>,
}

/// Query parameters for `GET /houses/search`.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    /// Substring to look for.
    pub name: String,
}

fn house_not_found(id: HouseId) -> ApiError {
    ApiError::NotFound(format!("House with id {id} not found"))
}

/// `GET /houses`
pub async fn list_houses(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<HouseListParams>,
) -> Result<Json<PagedResponse<HouseDto>>, ApiError> {
    let sort: HouseSortField = parse_or_default(params.sort.as_deref())?;
    let direction: SortDirection = parse_or_default(params.direction.as_deref())?;
    let query = HouseQuery {
        name_contains: HouseQuery::normalize_name(params.name.as_deref()),
        sort,
        direction,
        page: page_request(params.page, params.size, state.limits.max_page_size)?,
    };
    Ok(Json(state.services.houses.list(query).await?))
}

/// `GET /houses/{id}`
pub async fn get_house(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<HouseId>,
) -> Result<Json<HouseDto>, ApiError> {
    state
        .services
        .houses
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| house_not_found(id))
}

/// `POST /houses`
pub async fn create_house(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<CreateHouseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let house = state.services.houses.create(request).await?;
    Ok((StatusCode::CREATED, Json(house)))
}

/// `PUT /houses/{id}`
pub async fn update_house(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<HouseId>,
    ValidatedJson(request): ValidatedJson<CreateHouseRequest>,
) -> Result<Json<HouseDto>, ApiError> {
    state
        .services
        .houses
        .update(id, request)
        .await?
        .map(Json)
        .ok_or_else(|| house_not_found(id))
}

/// `DELETE /houses/{id}`
pub async fn delete_house(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<HouseId>,
) -> Result<StatusCode, ApiError> {
    if state.services.houses.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(house_not_found(id))
    }
}

/// `GET /houses/search?name=S`
pub async fn search_houses(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> Result<Json<Vec<HouseDto>>, ApiError> {
    let term = search_term("name", &params.name)?;
    Ok(Json(state.services.houses.search(&term).await?))
}
