//! Data layer for the flats catalog (`PostgreSQL` + in-memory).
//!
//! The services talk to the store only through the repository traits, so
//! the same code runs against `PostgreSQL` in production and against the
//! in-memory catalog in development and tests.
//!
//! # Architecture
//!
//! ```text
//! Service Layer
//!     |
//!     +-- Catalog (Arc<dyn ...Repository>)
//!         |-- PgFlatRepository / PgHouseRepository / PgImportRepository
//!         |       +-- filter (QueryBuilder compilation) --> PostgreSQL
//!         +-- MemoryCatalog (tokio RwLock)
//! ```
//!
//! # Modules
//!
//! - [`repository`] -- Repository traits shared by both stores
//! - [`filter`] -- Listing query compilation to parameterised SQL
//! - [`flat_store`] -- `PostgreSQL` flats and coordinates
//! - [`house_store`] -- `PostgreSQL` houses
//! - [`import_store`] -- `PostgreSQL` batch import and history
//! - [`memory`] -- In-process store implementing every trait
//! - [`postgres`] -- `PostgreSQL` settings and the catalog pool
//! - [`error`] -- Shared error types

use std::sync::Arc;

pub mod error;
pub mod filter;
pub mod flat_store;
pub mod house_store;
pub mod import_store;
pub mod memory;
pub mod postgres;
pub mod repository;

// Re-export primary types for convenience.
pub use error::DbError;
pub use flat_store::{FlatRow, PgFlatRepository};
pub use house_store::{HouseRow, PgHouseRepository};
pub use import_store::{ImportHistoryRow, PgImportRepository};
pub use memory::MemoryCatalog;
pub use postgres::{CatalogPool, DatabaseConfig};
pub use repository::{FlatRepository, HouseRepository, ImportRepository};

/// The repositories handed to the service layer.
#[derive(Clone)]
pub struct Catalog {
    /// Flat persistence.
    pub flats: Arc<dyn FlatRepository>,
    /// House persistence.
    pub houses: Arc<dyn HouseRepository>,
    /// Batch import and history.
    pub imports: Arc<dyn ImportRepository>,
}

impl Catalog {
    /// Repositories backed by an open `PostgreSQL` pool.
    pub fn postgres(pool: &CatalogPool) -> Self {
        let pool = pool.pool().clone();
        Self {
            flats: Arc::new(PgFlatRepository::new(pool.clone())),
            houses: Arc::new(PgHouseRepository::new(pool.clone())),
            imports: Arc::new(PgImportRepository::new(pool)),
        }
    }

    /// Repositories backed by one shared [`MemoryCatalog`].
    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryCatalog::new());
        Self {
            flats: Arc::clone(&store) as Arc<dyn FlatRepository>,
            houses: Arc::clone(&store) as Arc<dyn HouseRepository>,
            imports: store,
        }
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog").finish_non_exhaustive()
    }
}
