//! Repository traits implemented by every catalog store.
//!
//! The services only see these traits, so the `PostgreSQL` store and the
//! in-memory store are interchangeable. Id-keyed lookups report a missing
//! row as `None` / `false`, never as an error.

use async_trait::async_trait;
use flats_types::{
    Flat, FlatDraft, FlatId, FlatPredicate, FlatQuery, House, HouseDraft, HouseId, HouseQuery,
    ImportHistory, ImportOperation, ImportReport, PageRequest,
};

use crate::error::DbError;

/// Persistence operations on flats and their owned coordinates.
#[async_trait]
pub trait FlatRepository: Send + Sync {
    /// Flats of the requested page, filtered and ordered by `query`.
    async fn find_page(&self, query: &FlatQuery) -> Result<Vec<Flat>, DbError>;

    /// Number of flats matching every predicate; `&[]` counts all rows.
    async fn count(&self, predicates: &[FlatPredicate]) -> Result<u64, DbError>;

    /// Look up a flat by id.
    async fn find_by_id(&self, id: FlatId) -> Result<Option<Flat>, DbError>;

    /// Insert a flat and its coordinates, assigning ids and the creation date.
    /// A `house_id` that does not resolve at write time is stored as no link.
    async fn insert(&self, draft: FlatDraft) -> Result<Flat, DbError>;

    /// Replace every mutable field of an existing flat. The id, the
    /// coordinates id and the creation date are preserved. The house link
    /// is resolved as in [`Self::insert`].
    async fn update(&self, id: FlatId, draft: FlatDraft) -> Result<Option<Flat>, DbError>;

    /// Delete a flat and its coordinates. Returns whether the flat existed.
    async fn delete(&self, id: FlatId) -> Result<bool, DbError>;

    /// Flats whose name contains `substring`, case-insensitively.
    async fn find_by_name_containing(&self, substring: &str) -> Result<Vec<Flat>, DbError>;

    /// Number of flats with strictly more than `min_rooms` rooms.
    async fn count_rooms_greater_than(&self, min_rooms: i32) -> Result<u64, DbError>;

    /// Flats with strictly less than `max_space` living space.
    async fn find_living_space_less_than(&self, max_space: i64) -> Result<Vec<Flat>, DbError>;

    /// The cheapest flat that has a balcony, lowest id on ties.
    async fn find_cheapest_with_balcony(&self) -> Result<Option<Flat>, DbError>;

    /// All flats ordered by time to the metro, then id.
    async fn find_all_by_metro_time(&self) -> Result<Vec<Flat>, DbError>;
}

/// Persistence operations on houses.
#[async_trait]
pub trait HouseRepository: Send + Sync {
    /// Houses of the requested page, filtered and ordered by `query`.
    async fn find_page(&self, query: &HouseQuery) -> Result<Vec<House>, DbError>;

    /// Number of houses whose name contains the lower-cased needle; `None`
    /// counts all rows.
    async fn count(&self, name_contains: Option<&str>) -> Result<u64, DbError>;

    /// Look up a house by id.
    async fn find_by_id(&self, id: HouseId) -> Result<Option<House>, DbError>;

    /// Insert a house.
    async fn insert(&self, draft: HouseDraft) -> Result<House, DbError>;

    /// Replace every mutable field of an existing house.
    async fn update(&self, id: HouseId, draft: HouseDraft) -> Result<Option<House>, DbError>;

    /// Delete a house. Flats that referenced it lose their link. Returns
    /// whether the house existed.
    async fn delete(&self, id: HouseId) -> Result<bool, DbError>;

    /// Houses whose name contains `substring`, case-insensitively.
    async fn find_by_name_containing(&self, substring: &str) -> Result<Vec<House>, DbError>;
}

/// Batch import and its history.
#[async_trait]
pub trait ImportRepository: Send + Sync {
    /// Apply every operation and record a history entry, or apply nothing.
    ///
    /// A reference to a missing flat or house rejects the whole batch with
    /// [`DbError::Rejected`].
    async fn apply(&self, operations: Vec<ImportOperation>) -> Result<ImportReport, DbError>;

    /// One page of history entries, newest first.
    async fn history_page(&self, page: PageRequest) -> Result<Vec<ImportHistory>, DbError>;

    /// Number of recorded imports.
    async fn history_count(&self) -> Result<u64, DbError>;

    /// Up to `limit` most recent history entries, newest first.
    async fn latest(&self, limit: u32) -> Result<Vec<ImportHistory>, DbError>;
}
