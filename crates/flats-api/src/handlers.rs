//! REST endpoint handlers.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/flats` | Paged, filtered, sorted flat listing |
//! | `GET` | `/flats/{id}` | Single flat |
//! | `POST` | `/flats` | Create a flat |
//! | `PUT` | `/flats/{id}` | Replace a flat |
//! | `DELETE` | `/flats/{id}` | Delete a flat |
//! | `GET` | `/flats/count-by-rooms` | Count flats above a room count |
//! | `GET` | `/flats/by-name` | Flats whose name contains a substring |
//! | `GET` | `/flats/by-living-space` | Flats below a living space |
//! | `GET` | `/flats/cheapest-with-balcony` | Cheapest flat with a balcony |
//! | `GET` | `/flats/sorted-by-metro-time` | All flats, nearest metro first |
//! | `GET` | `/houses` | Paged house listing |
//! | `GET` | `/houses/{id}` | Single house |
//! | `POST` | `/houses` | Create a house |
//! | `PUT` | `/houses/{id}` | Replace a house |
//! | `DELETE` | `/houses/{id}` | Delete a house |
//! | `GET` | `/houses/search` | Houses whose name contains a substring |
//! | `POST` | `/import` | Atomic batch import |
//! | `GET` | `/import/history` | Paged import history, newest first |
//! | `GET` | `/import/history/latest` | Most recent imports |
//! | `GET` | `/health` | Liveness probe |

use std::str::FromStr;

use axum::http::{Method, Uri};
use flats_types::{DEFAULT_PAGE_SIZE, PageRequest, UnknownSort};

use crate::error::ApiError;

pub mod flats;
pub mod health;
pub mod houses;
pub mod imports;

/// Longest accepted search substring.
pub const MAX_SEARCH_LENGTH: usize = 100;

/// Validate optional `page`/`size` query parameters.
fn page_request(page: Option<i64>, size: Option<i64>, max_size: u32) -> Result<PageRequest, ApiError> {
    Ok(PageRequest::try_new(
        page.unwrap_or(0),
        size.unwrap_or(i64::from(DEFAULT_PAGE_SIZE)),
        max_size,
    )?)
}

/// Parse an optional sort field or direction, falling back to its default.
fn parse_or_default<T>(raw: Option<&str>) -> Result<T, ApiError>
where
    T: FromStr<Err = UnknownSort> + Default,
{
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map_or_else(|| Ok(T::default()), |value| value.parse().map_err(ApiError::from))
}

/// Validate a required search term: trimmed, non-blank, bounded length.
fn search_term(param: &str, raw: &str) -> Result<String, ApiError> {
    let term = raw.trim();
    if term.is_empty() {
        return Err(ApiError::bad_request(format!("{param} must not be blank")));
    }
    if term.chars().count() > MAX_SEARCH_LENGTH {
        return Err(ApiError::bad_request(format!(
            "{param} must be at most {MAX_SEARCH_LENGTH} characters"
        )));
    }
    Ok(term.to_owned())
}

/// Fallback for unmatched routes.
pub async fn not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::NotFound(format!("No route for {method} {}", uri.path()))
}
