//! Service layer and notification broadcaster for the flats catalog.
//!
//! The services sit between the HTTP surface and the repositories. They
//! resolve references, map entities to DTOs, bound every store call with a
//! timeout, and announce successful mutations through the [`Broadcaster`].
//!
//! # Modules
//!
//! - [`broadcast`] -- Registry of live connections and notification fan-out
//! - [`flats`] -- [`FlatService`]: listing, CRUD, specialised flat queries
//! - [`houses`] -- [`HouseService`]: listing, CRUD, name search
//! - [`imports`] -- [`ImportService`]: atomic batch import and history
//! - [`error`] -- [`ServiceError`]
//!
//! [`Broadcaster`]: broadcast::Broadcaster
//! [`FlatService`]: flats::FlatService
//! [`HouseService`]: houses::HouseService
//! [`ImportService`]: imports::ImportService
//! [`ServiceError`]: error::ServiceError

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use flats_db::{Catalog, DbError};

pub mod broadcast;
pub mod error;
pub mod flats;
pub mod houses;
pub mod imports;

pub use broadcast::{Broadcaster, Connection};
pub use error::ServiceError;
pub use flats::FlatService;
pub use houses::HouseService;
pub use imports::ImportService;

/// Run a store call, failing with [`ServiceError::Timeout`] if it does not
/// finish within `limit`.
pub(crate) async fn bounded<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, DbError>>,
) -> Result<T, ServiceError> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(ServiceError::from),
        Err(_) => {
            tracing::error!(timeout_ms = limit.as_millis(), "Store call timed out");
            Err(ServiceError::Timeout(limit))
        }
    }
}

/// All services, sharing one broadcaster.
#[derive(Clone)]
pub struct Services {
    /// Flat operations.
    pub flats: FlatService,
    /// House operations.
    pub houses: HouseService,
    /// Import operations.
    pub imports: ImportService,
    /// Connection registry used by the notification endpoint.
    pub broadcaster: Arc<Broadcaster>,
}

impl Services {
    /// Wire the services over a catalog.
    pub fn new(catalog: &Catalog, store_timeout: Duration) -> Self {
        let broadcaster = Arc::new(Broadcaster::new());
        Self {
            flats: FlatService::new(
                Arc::clone(&catalog.flats),
                Arc::clone(&catalog.houses),
                Arc::clone(&broadcaster),
                store_timeout,
            ),
            houses: HouseService::new(
                Arc::clone(&catalog.houses),
                Arc::clone(&broadcaster),
                store_timeout,
            ),
            imports: ImportService::new(
                Arc::clone(&catalog.imports),
                Arc::clone(&broadcaster),
                store_timeout,
            ),
            broadcaster,
        }
    }
}
