//! Shared type definitions for the flats catalog backend.
//!
//! This crate is the single source of truth for the entities, transport
//! shapes and listing criteria used across the workspace. Transport types
//! flow downstream to `TypeScript` via `ts-rs` for the frontend.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe wrappers for store-assigned keys and session ids
//! - [`enums`] -- Furnish and view enumerations
//! - [`structs`] -- Core entities (flats, coordinates, houses, import history)
//! - [`dto`] -- Response DTOs and validated request bodies
//! - [`page`] -- Pagination request and response contract
//! - [`query`] -- Filter predicates, sort fields, listing queries
//! - [`notification`] -- WebSocket notification messages
//! - [`import`] -- Batch import operations

pub mod dto;
pub mod enums;
pub mod ids;
pub mod import;
pub mod notification;
pub mod page;
pub mod query;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use dto::{
    CoordinatesDto, CreateCoordinatesRequest, CreateFlatRequest, CreateHouseRequest, FlatDto,
    HouseDto, ImportHistoryDto, MAX_PRICE, MAX_ROOMS, MIN_Y, describe_validation_errors,
};
pub use enums::{Furnish, UnknownVariant, View};
pub use ids::{CoordinatesId, FlatId, HouseId, ImportId, SessionId};
pub use import::{
    FlatImport, ImportChange, ImportOperation, ImportReport, ImportedHouse, InvalidImportOperation,
    RawImportOperation,
};
pub use notification::{Notification, NotificationEvent};
pub use page::{DEFAULT_MAX_PAGE_SIZE, DEFAULT_PAGE_SIZE, PageError, PageRequest, PagedResponse};
pub use query::{
    FlatFilter, FlatPredicate, FlatQuery, FlatSortField, HouseQuery, HouseSortField,
    SortDirection, UnknownSort, house_name_contains,
};
pub use structs::{
    Coordinates, CoordinatesDraft, Flat, FlatDraft, House, HouseDraft, ImportHistory,
};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // Files are written to `bindings/` relative to the crate root.
        use ts_rs::TS;

        // IDs
        let _ = crate::ids::FlatId::export_all();
        let _ = crate::ids::CoordinatesId::export_all();
        let _ = crate::ids::HouseId::export_all();
        let _ = crate::ids::ImportId::export_all();

        // Enums
        let _ = crate::enums::Furnish::export_all();
        let _ = crate::enums::View::export_all();

        // DTOs
        let _ = crate::dto::CoordinatesDto::export_all();
        let _ = crate::dto::HouseDto::export_all();
        let _ = crate::dto::FlatDto::export_all();
        let _ = crate::dto::ImportHistoryDto::export_all();
        let _ = crate::dto::CreateCoordinatesRequest::export_all();
        let _ = crate::dto::CreateFlatRequest::export_all();
        let _ = crate::dto::CreateHouseRequest::export_all();

        // Paging
        let _ = crate::page::PagedResponse::<crate::dto::FlatDto>::export_all();
    }
}
