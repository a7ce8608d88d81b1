//! Axum router construction.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS and request tracing middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::{Method, header};
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{self, flats, health, houses, imports};
use crate::state::AppState;
use crate::ws;

/// How long browsers may cache a preflight response.
const CORS_MAX_AGE: Duration = Duration::from_secs(3600);

/// Build the complete Axum router.
///
/// See [`handlers`] for the REST endpoints. `GET /notifications` upgrades
/// to the notification `WebSocket`. Unmatched routes answer 404 with the
/// uniform error body.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(CORS_MAX_AGE);

    Router::new()
        // Flats
        .route("/flats", get(flats::list_flats).post(flats::create_flat))
        .route("/flats/count-by-rooms", get(flats::count_by_rooms))
        .route("/flats/by-name", get(flats::find_by_name))
        .route("/flats/by-living-space", get(flats::find_by_living_space))
        .route("/flats/cheapest-with-balcony", get(flats::cheapest_with_balcony))
        .route("/flats/sorted-by-metro-time", get(flats::sorted_by_metro_time))
        .route(
            "/flats/{id}",
            get(flats::get_flat)
                .put(flats::update_flat)
                .delete(flats::delete_flat),
        )
        // Houses
        .route("/houses", get(houses::list_houses).post(houses::create_house))
        .route("/houses/search", get(houses::search_houses))
        .route(
            "/houses/{id}",
            get(houses::get_house)
                .put(houses::update_house)
                .delete(houses::delete_house),
        )
        // Import
        .route("/import", axum::routing::post(imports::import_batch))
        .route("/import/history", get(imports::import_history))
        .route("/import/history/latest", get(imports::latest_imports))
        // Health
        .route("/health", get(health::health))
        // WebSocket
        .route("/notifications", get(ws::notifications))
        .fallback(handlers::not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
