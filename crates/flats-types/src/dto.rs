//! Transport shapes: response DTOs and validated request bodies.
//!
//! Field names are camelCase on the wire. Requests derive
//! [`validator::Validate`]; the API layer runs validation before any
//! request reaches the services.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use validator::{Validate, ValidationError};

use crate::enums::{Furnish, View};
use crate::ids::{CoordinatesId, FlatId, HouseId, ImportId};
use crate::structs::{
    Coordinates, CoordinatesDraft, Flat, FlatDraft, House, HouseDraft, ImportHistory,
};

/// Highest accepted flat price.
pub const MAX_PRICE: i64 = 581_208_244;

/// Highest accepted room count.
pub const MAX_ROOMS: i32 = 13;

/// Lowest accepted y coordinate.
pub const MIN_Y: i32 = -515;

// ---------------------------------------------------------------------------
// Response DTOs
// ---------------------------------------------------------------------------

/// Transport shape of [`Coordinates`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CoordinatesDto {
    /// Identifier.
    pub id: CoordinatesId,
    /// X coordinate.
    pub x: i32,
    /// Y coordinate.
    pub y: i32,
}

/// Transport shape of [`House`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct HouseDto {
    /// Identifier.
    pub id: HouseId,
    /// Optional display name.
    pub name: Option<String>,
    /// Year built.
    pub year: i32,
    /// Flats on each floor.
    pub number_of_flats_on_floor: i32,
}

/// Transport shape of [`Flat`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct FlatDto {
    /// Identifier.
    pub id: FlatId,
    /// Listing name.
    pub name: String,
    /// Owned coordinates.
    pub coordinates: CoordinatesDto,
    /// Insert timestamp.
    pub creation_date: DateTime<Utc>,
    /// Total area.
    #[ts(type = "number")]
    pub area: i64,
    /// Price.
    #[ts(type = "number")]
    pub price: i64,
    /// Tri-state balcony flag.
    pub balcony: Option<bool>,
    /// Minutes to the metro on foot.
    #[ts(type = "number")]
    pub time_to_metro_on_foot: i64,
    /// Room count.
    pub number_of_rooms: i32,
    /// Living space.
    #[ts(type = "number")]
    pub living_space: i64,
    /// Furnishing.
    pub furnish: Furnish,
    /// Window view.
    pub view: View,
    /// Linked house, if any.
    pub house: Option<HouseDto>,
}

/// Transport shape of [`ImportHistory`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct ImportHistoryDto {
    /// Identifier.
    pub id: ImportId,
    /// Commit time of the batch.
    pub operation_time: DateTime<Utc>,
    /// Objects affected by the batch.
    pub objects_count: i32,
}

impl From<&Coordinates> for CoordinatesDto {
    fn from(c: &Coordinates) -> Self {
        Self {
            id: c.id,
            x: c.x,
            y: c.y,
        }
    }
}

impl From<&House> for HouseDto {
    fn from(h: &House) -> Self {
        Self {
            id: h.id,
            name: h.name.clone(),
            year: h.year,
            number_of_flats_on_floor: h.number_of_flats_on_floor,
        }
    }
}

impl From<&Flat> for FlatDto {
    fn from(f: &Flat) -> Self {
        Self {
            id: f.id,
            name: f.name.clone(),
            coordinates: CoordinatesDto::from(&f.coordinates),
            creation_date: f.creation_date,
            area: f.area,
            price: f.price,
            balcony: f.balcony,
            time_to_metro_on_foot: f.time_to_metro_on_foot,
            number_of_rooms: f.number_of_rooms,
            living_space: f.living_space,
            furnish: f.furnish,
            view: f.view,
            house: f.house.as_ref().map(HouseDto::from),
        }
    }
}

impl From<&ImportHistory> for ImportHistoryDto {
    fn from(h: &ImportHistory) -> Self {
        Self {
            id: h.id,
            operation_time: h.operation_time,
            objects_count: h.objects_count,
        }
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Coordinates part of a [`CreateFlatRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CreateCoordinatesRequest {
    /// X coordinate, required.
    pub x: i32,
    /// Y coordinate, at least -515, 0 when omitted.
    #[serde(default)]
    #[validate(range(min = -515, message = "y must be at least -515"))]
    pub y: i32,
}

/// Body of `POST /flats` and `PUT /flats/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct CreateFlatRequest {
    /// Listing name, must not be blank.
    #[validate(custom(function = "not_blank", message = "name must not be blank"))]
    pub name: String,
    /// Coordinates.
    #[validate(nested)]
    pub coordinates: CreateCoordinatesRequest,
    /// Total area, greater than 0.
    #[validate(range(min = 1, message = "area must be greater than 0"))]
    #[ts(type = "number")]
    pub area: i64,
    /// Price, 1 to 581208244.
    #[validate(range(min = 1, max = 581_208_244, message = "price must be between 1 and 581208244"))]
    #[ts(type = "number")]
    pub price: i64,
    /// Tri-state balcony flag.
    #[serde(default)]
    #[ts(optional)]
    pub balcony: Option<bool>,
    /// Minutes to the metro on foot, greater than 0.
    #[validate(range(min = 1, message = "timeToMetroOnFoot must be greater than 0"))]
    #[ts(type = "number")]
    pub time_to_metro_on_foot: i64,
    /// Room count, 1 to 13.
    #[validate(range(min = 1, max = 13, message = "numberOfRooms must be between 1 and 13"))]
    pub number_of_rooms: i32,
    /// Living space, greater than 0.
    #[validate(range(min = 1, message = "livingSpace must be greater than 0"))]
    #[ts(type = "number")]
    pub living_space: i64,
    /// Furnishing.
    pub furnish: Furnish,
    /// Window view.
    pub view: View,
    /// House to link, if any.
    #[serde(default)]
    #[ts(optional)]
    pub house_id: Option<HouseId>,
}

impl CreateFlatRequest {
    /// Convert into a draft linked to `house_id`.
    ///
    /// The caller decides the link; the request's own `house_id` is only
    /// a reference that may not resolve.
    pub fn into_draft(self, house_id: Option<HouseId>) -> FlatDraft {
        FlatDraft {
            name: self.name,
            coordinates: CoordinatesDraft {
                x: self.coordinates.x,
                y: self.coordinates.y,
            },
            area: self.area,
            price: self.price,
            balcony: self.balcony,
            time_to_metro_on_foot: self.time_to_metro_on_foot,
            number_of_rooms: self.number_of_rooms,
            living_space: self.living_space,
            furnish: self.furnish,
            view: self.view,
            house_id,
        }
    }
}

/// Body of `POST /houses` and `PUT /houses/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct CreateHouseRequest {
    /// Optional display name.
    #[serde(default)]
    #[ts(optional)]
    pub name: Option<String>,
    /// Year built, greater than 0.
    #[validate(range(min = 1, message = "year must be greater than 0"))]
    pub year: i32,
    /// Flats on each floor, greater than 0.
    #[validate(range(min = 1, message = "numberOfFlatsOnFloor must be greater than 0"))]
    pub number_of_flats_on_floor: i32,
}

impl From<CreateHouseRequest> for HouseDraft {
    fn from(req: CreateHouseRequest) -> Self {
        Self {
            name: req.name,
            year: req.year,
            number_of_flats_on_floor: req.number_of_flats_on_floor,
        }
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Flatten [`validator::ValidationErrors`] into `field: message` lines,
/// sorted so responses are deterministic.
pub fn describe_validation_errors(errors: &validator::ValidationErrors) -> Vec<String> {
    let mut lines = Vec::new();
    collect_errors(errors, "", &mut lines);
    lines.sort();
    lines
}

fn collect_errors(errors: &validator::ValidationErrors, prefix: &str, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            validator::ValidationErrorsKind::Field(list) => {
                for err in list {
                    let message = err
                        .message
                        .clone()
                        .unwrap_or_else(|| Cow::Owned(err.code.to_string()));
                    out.push(format!("{path}: {message}"));
                }
            }
            validator::ValidationErrorsKind::Struct(inner) => {
                collect_errors(inner, &path, out);
            }
            validator::ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_errors(inner, &format!("{path}[{index}]"), out);
                }
            }
        }
    }
}
