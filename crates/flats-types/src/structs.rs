//! Core entity structs for the flats catalog.
//!
//! These are the persisted shapes handed out by the repositories. The
//! transport shapes live in [`crate::dto`]; the `*Draft` structs here are
//! the identity-free input to an insert or a full replace-update.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{Furnish, View};
use crate::ids::{CoordinatesId, FlatId, HouseId, ImportId};

// ---------------------------------------------------------------------------
// Coordinates
// ---------------------------------------------------------------------------

/// Location of a flat. Owned by exactly one [`Flat`] and deleted with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Store-assigned identifier.
    pub id: CoordinatesId,
    /// X coordinate.
    pub x: i32,
    /// Y coordinate.
    pub y: i32,
}

/// Coordinates values without an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CoordinatesDraft {
    /// X coordinate.
    pub x: i32,
    /// Y coordinate.
    pub y: i32,
}

// ---------------------------------------------------------------------------
// House
// ---------------------------------------------------------------------------

/// A building that may group several flats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct House {
    /// Store-assigned identifier.
    pub id: HouseId,
    /// Optional display name.
    pub name: Option<String>,
    /// Year the house was built.
    pub year: i32,
    /// Number of flats on each floor.
    pub number_of_flats_on_floor: i32,
}

/// Mutable fields of a [`House`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HouseDraft {
    /// Optional display name.
    pub name: Option<String>,
    /// Year the house was built.
    pub year: i32,
    /// Number of flats on each floor.
    pub number_of_flats_on_floor: i32,
}

impl House {
    /// Build a house from its identity and a draft.
    pub fn from_draft(id: HouseId, draft: HouseDraft) -> Self {
        Self {
            id,
            name: draft.name,
            year: draft.year,
            number_of_flats_on_floor: draft.number_of_flats_on_floor,
        }
    }
}

// ---------------------------------------------------------------------------
// Flat
// ---------------------------------------------------------------------------

/// A catalog listing for an apartment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flat {
    /// Store-assigned identifier.
    pub id: FlatId,
    /// Listing name, never blank.
    pub name: String,
    /// Owned coordinates.
    pub coordinates: Coordinates,
    /// Set once at insert.
    pub creation_date: DateTime<Utc>,
    /// Total area.
    pub area: i64,
    /// Price, between 1 and [`crate::dto::MAX_PRICE`].
    pub price: i64,
    /// Tri-state balcony flag; `None` means unknown.
    pub balcony: Option<bool>,
    /// Minutes to the nearest metro station on foot.
    pub time_to_metro_on_foot: i64,
    /// Room count, between 1 and [`crate::dto::MAX_ROOMS`].
    pub number_of_rooms: i32,
    /// Living space.
    pub living_space: i64,
    /// Furnishing.
    pub furnish: Furnish,
    /// Window view.
    pub view: View,
    /// The house this flat belongs to, if any.
    pub house: Option<House>,
}

/// Everything a client controls on a [`Flat`]: the input to an insert or
/// a full replace-update.
///
/// The house is referenced by id only; the service layer resolves it
/// before the draft reaches a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatDraft {
    /// Listing name.
    pub name: String,
    /// Coordinates values.
    pub coordinates: CoordinatesDraft,
    /// Total area.
    pub area: i64,
    /// Price.
    pub price: i64,
    /// Tri-state balcony flag.
    pub balcony: Option<bool>,
    /// Minutes to the metro on foot.
    pub time_to_metro_on_foot: i64,
    /// Room count.
    pub number_of_rooms: i32,
    /// Living space.
    pub living_space: i64,
    /// Furnishing.
    pub furnish: Furnish,
    /// Window view.
    pub view: View,
    /// Linked house, already known to exist.
    pub house_id: Option<HouseId>,
}

// ---------------------------------------------------------------------------
// Import history
// ---------------------------------------------------------------------------

/// Record of one successful batch import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportHistory {
    /// Store-assigned identifier.
    pub id: ImportId,
    /// When the batch was committed.
    pub operation_time: DateTime<Utc>,
    /// Number of objects created, updated or deleted by the batch.
    pub objects_count: i32,
}
