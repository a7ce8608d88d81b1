//! Shared application state for the HTTP server.
//!
//! [`AppState`] is wrapped in [`Arc`](std::sync::Arc) and injected via
//! Axum's `State` extractor. It carries the services and the request
//! limits the handlers enforce.

use std::time::Duration;

use flats_core::Services;
use flats_types::DEFAULT_MAX_PAGE_SIZE;

/// Default bound on a single `WebSocket` frame send.
pub const DEFAULT_WS_SEND_TIMEOUT: Duration = Duration::from_secs(2);

/// Default outbound queue length per `WebSocket` connection.
pub const DEFAULT_WS_CHANNEL_CAPACITY: usize = 64;

/// Limits applied by the handlers.
#[derive(Debug, Clone, Copy)]
pub struct ApiLimits {
    /// Largest accepted page size.
    pub max_page_size: u32,
    /// Bound on a single `WebSocket` frame send.
    pub ws_send_timeout: Duration,
    /// Outbound queue length per `WebSocket` connection.
    pub ws_channel_capacity: usize,
}

impl Default for ApiLimits {
    fn default() -> Self {
        Self {
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            ws_send_timeout: DEFAULT_WS_SEND_TIMEOUT,
            ws_channel_capacity: DEFAULT_WS_CHANNEL_CAPACITY,
        }
    }
}

/// Shared state for the Axum application.
#[derive(Clone)]
pub struct AppState {
    /// Flat, house and import services plus the broadcaster.
    pub services: Services,
    /// Request limits.
    pub limits: ApiLimits,
}

impl AppState {
    /// Create the state with default limits.
    pub fn new(services: Services) -> Self {
        Self::with_limits(services, ApiLimits::default())
    }

    /// Create the state with explicit limits.
    pub const fn with_limits(services: Services, limits: ApiLimits) -> Self {
        Self { services, limits }
    }
}
