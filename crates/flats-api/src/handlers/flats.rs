//! Flat endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use flats_types::{
    CreateFlatRequest, FlatDto, FlatFilter, FlatId, FlatQuery, FlatSortField, PagedResponse,
    SortDirection,
};
use serde::{Deserialize, Serialize};

use super::{page_request, parse_or_default, search_term};
use crate::error::ApiError;
use crate::extract::{ApiPath, ApiQuery, ValidatedJson};
use crate::state::AppState;

/// Query parameters for `GET /flats`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatListParams {
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
    /// Minimum price, inclusive.
    pub min_price: Option<i64>,
    /// Maximum price, inclusive.
    pub max_price: Option<i64>,
    /// Required balcony flag.
    pub has_balcony: Option<bool>,
    /// Minimum room count, inclusive.
    pub min_rooms: Option<i32>,
    /// Maximum room count, inclusive.
    pub max_rooms: Option<i32>,
}

impl FlatListParams {
    fn into_query(self, max_page_size: u32) -> Result<FlatQuery, ApiError> {
        let page = page_request(self.page, self.size, max_page_size)?;
        let sort: FlatSortField = parse_or_default(self.sort.as_deref())?;
        let direction: SortDirection = parse_or_default(self.direction.as_deref())?;
        let filter = FlatFilter {
            name: self.name,
            min_price: self.min_price,
            max_price: self.max_price,
            has_balcony: self.has_balcony,
            min_rooms: self.min_rooms,
            max_rooms: self.max_rooms,
        };
        Ok(FlatQuery {
            predicates: filter.predicates(),
            sort,
            direction,
            page,
        })
    }
}

/// Query parameters for `GET /flats/count-by-rooms`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountByRoomsParams {
    /// Count flats with strictly more rooms than this.
    pub min_rooms: i32,
}

/// Query parameters for `GET /flats/by-name`.
#[derive(Debug, Deserialize)]
pub struct ByNameParams {
    /// Substring to look for.
    pub substring: String,
}

/// Query parameters for `GET /flats/by-living-space`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ByLivingSpaceParams {
    /// Return flats with strictly less living space than this.
    pub max_space: i64,
}

/// Body of `GET /flats/count-by-rooms`.
#[derive(Debug, Serialize)]
pub struct CountResponse {
    /// Number of matching flats.
    pub count: u64,
}

fn flat_not_found(id: FlatId) -> ApiError {
    ApiError::NotFound(format!("Flat with id {id} not found"))
}

/// `GET /flats`
pub async fn list_flats(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<FlatListParams>,
) -> Result<Json<PagedResponse<FlatDto>>, ApiError> {
    let query = params.into_query(state.limits.max_page_size)?;
    Ok(Json(state.services.flats.list(query).await?))
}

/// `GET /flats/{id}`
pub async fn get_flat(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<FlatId>,
) -> Result<Json<FlatDto>, ApiError> {
    state
        .services
        .flats
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| flat_not_found(id))
}

/// `POST /flats`
pub async fn create_flat(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<CreateFlatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let flat = state.services.flats.create(request).await?;
    Ok((StatusCode::CREATED, Json(flat)))
}

/// `PUT /flats/{id}`
pub async fn update_flat(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<FlatId>,
    ValidatedJson(request): ValidatedJson<CreateFlatRequest>,
) -> Result<Json<FlatDto>, ApiError> {
    state
        .services
        .flats
        .update(id, request)
        .await?
        .map(Json)
        .ok_or_else(|| flat_not_found(id))
}

/// `DELETE /flats/{id}`
pub async fn delete_flat(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<FlatId>,
) -> Result<StatusCode, ApiError> {
    if state.services.flats.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(flat_not_found(id))
    }
}

/// `GET /flats/count-by-rooms?minRooms=N`
pub async fn count_by_rooms(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<CountByRoomsParams>,
) -> Result<Json<CountResponse>, ApiError> {
    if params.min_rooms < 0 {
        return Err(ApiError::bad_request(
            "minRooms must be greater than or equal to 0",
        ));
    }
    let count = state
        .services
        .flats
        .count_by_rooms_greater_than(params.min_rooms)
        .await?;
    Ok(Json(CountResponse { count }))
}

/// `GET /flats/by-name?substring=S`
pub async fn find_by_name(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<ByNameParams>,
) -> Result<Json<Vec<FlatDto>>, ApiError> {
    let term = search_term("substring", &params.substring)?;
    Ok(Json(state.services.flats.find_by_name_containing(&term).await?))
}

/// `GET /flats/by-living-space?maxSpace=N`
pub async fn find_by_living_space(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<ByLivingSpaceParams>,
) -> Result<Json<Vec<FlatDto>>, ApiError> {
    if params.max_space <= 0 {
        return Err(ApiError::bad_request("maxSpace must be greater than 0"));
    }
    let flats = state
        .services
        .flats
        .find_by_living_space_less_than(params.max_space)
        .await?;
    Ok(Json(flats))
}

/// `GET /flats/cheapest-with-balcony`
pub async fn cheapest_with_balcony(
    State(state): State<Arc<AppState>>,
) -> Result<Json<FlatDto>, ApiError> {
    state
        .services
        .flats
        .find_cheapest_with_balcony()
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(String::from("No flat with a balcony found")))
}

/// `GET /flats/sorted-by-metro-time`
pub async fn sorted_by_metro_time(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<FlatDto>>, ApiError> {
    Ok(Json(state.services.flats.find_all_sorted_by_metro_time().await?))
}
