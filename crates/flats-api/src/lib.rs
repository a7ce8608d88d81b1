//! HTTP and `WebSocket` surface for the flats catalog.
//!
//! This crate provides an Axum server that exposes:
//!
//! - **REST endpoints** for flats, houses and batch import, with
//!   pagination, filtering and sorting on the listings
//! - **`WebSocket` endpoint** (`/notifications`) pushing a JSON message
//!   for every successful mutation
//! - **Health probe** (`/health`)
//!
//! All failures are answered with one JSON body shape, see [`ApiError`].
//!
//! [`ApiError`]: error::ApiError

pub mod error;
pub mod extract;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::{ApiLimits, AppState};
