//! Batch import operations.
//!
//! A batch is a JSON array of `{ "type", "operation"?, "data" }` objects.
//! [`ImportOperation::parse`] turns each raw entry into a typed, validated
//! operation; a missing `operation` is inferred from whether `data` carries
//! an `id`.
//!
//! A flat payload may name its house either by `houseId` or by a `house`
//! field holding an existing house id or a new house object. New houses
//! are created in the same transaction as the flat.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::dto::{CreateFlatRequest, CreateHouseRequest, FlatDto, HouseDto, describe_validation_errors};
use crate::ids::{FlatId, HouseId};
use crate::notification::NotificationEvent;
use crate::structs::{Flat, House, ImportHistory};

/// One entry of an import batch as sent by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawImportOperation {
    /// Entity type: `FLAT` or `HOUSE`, case-insensitive.
    #[serde(rename = "type")]
    pub entity: String,
    /// `CREATE`, `UPDATE` or `DELETE`, case-insensitive. Inferred when absent.
    #[serde(default)]
    pub operation: Option<String>,
    /// Entity payload; for `DELETE` only `id` is read.
    #[serde(default)]
    pub data: serde_json::Value,
}

/// An import entry could not be turned into an operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("operation {index}: {message}")]
pub struct InvalidImportOperation {
    /// Zero-based position in the batch.
    pub index: usize,
    /// Summary of the problem.
    pub message: String,
    /// Per-field validation failures, if any.
    pub details: Vec<String>,
}

/// The house a flat import links to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportedHouse {
    /// An existing house; the batch is rejected if it does not resolve.
    Existing(HouseId),
    /// A house to create and link.
    New(CreateHouseRequest),
}

/// Flat payload of an import operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatImport {
    /// Flat values. `house_id` is always `None`; the link is in `house`.
    pub request: CreateFlatRequest,
    /// House to link, if any.
    pub house: Option<ImportedHouse>,
}

/// A parsed and validated import operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOperation {
    /// Insert a flat.
    CreateFlat(FlatImport),
    /// Replace an existing flat.
    UpdateFlat {
        /// Target flat.
        id: FlatId,
        /// New values.
        flat: FlatImport,
    },
    /// Delete an existing flat.
    DeleteFlat(FlatId),
    /// Insert a house.
    CreateHouse(CreateHouseRequest),
    /// Replace an existing house.
    UpdateHouse {
        /// Target house.
        id: HouseId,
        /// New values.
        request: CreateHouseRequest,
    },
    /// Delete an existing house.
    DeleteHouse(HouseId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verb {
    Create,
    Update,
    Delete,
}

impl ImportOperation {
    /// Parse and validate the raw entry at position `index`.
    pub fn parse(index: usize, raw: RawImportOperation) -> Result<Self, InvalidImportOperation> {
        let fail = |message: String, details: Vec<String>| InvalidImportOperation {
            index,
            message,
            details,
        };

        let id = raw.data.get("id").and_then(serde_json::Value::as_i64);
        let verb = match raw.operation.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None if id.is_some() => Verb::Update,
            None => Verb::Create,
            Some(op) => match op.to_ascii_uppercase().as_str() {
                "CREATE" => Verb::Create,
                "UPDATE" => Verb::Update,
                "DELETE" => Verb::Delete,
                _ => return Err(fail(format!("unknown operation: {op}"), Vec::new())),
            },
        };
        let require_id = || id.ok_or_else(|| fail(String::from("data.id is required"), Vec::new()));

        match raw.entity.trim().to_ascii_uppercase().as_str() {
            "FLAT" => match verb {
                Verb::Create => Ok(Self::CreateFlat(decode_flat(raw.data, &fail)?)),
                Verb::Update => {
                    let id = FlatId(require_id()?);
                    Ok(Self::UpdateFlat {
                        id,
                        flat: decode_flat(raw.data, &fail)?,
                    })
                }
                Verb::Delete => Ok(Self::DeleteFlat(FlatId(require_id()?))),
            },
            "HOUSE" => match verb {
                Verb::Create => Ok(Self::CreateHouse(decode(raw.data, &fail)?)),
                Verb::Update => {
                    let id = HouseId(require_id()?);
                    Ok(Self::UpdateHouse {
                        id,
                        request: decode(raw.data, &fail)?,
                    })
                }
                Verb::Delete => Ok(Self::DeleteHouse(HouseId(require_id()?))),
            },
            other => Err(fail(format!("unknown object type: {other}"), Vec::new())),
        }
    }
}

fn decode<T, F>(data: serde_json::Value, fail: &F) -> Result<T, InvalidImportOperation>
where
    T: for<'de> Deserialize<'de> + Validate,
    F: Fn(String, Vec<String>) -> InvalidImportOperation,
{
    let value: T = serde_json::from_value(data)
        .map_err(|e| fail(format!("invalid data: {e}"), Vec::new()))?;
    value
        .validate()
        .map_err(|e| fail(String::from("validation failed"), describe_validation_errors(&e)))?;
    Ok(value)
}

fn decode_flat<F>(mut data: serde_json::Value, fail: &F) -> Result<FlatImport, InvalidImportOperation>
where
    F: Fn(String, Vec<String>) -> InvalidImportOperation,
{
    let nested = data
        .as_object_mut()
        .and_then(|fields| fields.remove("house"))
        .filter(|house| !house.is_null());
    let mut request: CreateFlatRequest = decode(data, fail)?;

    let house = match (nested, request.house_id.take()) {
        (Some(_), Some(_)) => {
            return Err(fail(
                String::from("house and houseId must not both be set"),
                Vec::new(),
            ));
        }
        (Some(serde_json::Value::Number(n)), None) => {
            let id = n
                .as_i64()
                .ok_or_else(|| fail(format!("invalid house id: {n}"), Vec::new()))?;
            Some(ImportedHouse::Existing(HouseId(id)))
        }
        (Some(object @ serde_json::Value::Object(_)), None) => {
            Some(ImportedHouse::New(decode(object, fail)?))
        }
        (Some(other), None) => {
            return Err(fail(
                format!("house must be an id or an object, got {other}"),
                Vec::new(),
            ));
        }
        (None, id) => id.map(ImportedHouse::Existing),
    };
    Ok(FlatImport { request, house })
}

/// One change applied by a committed import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportChange {
    /// A flat was inserted.
    FlatCreated(Flat),
    /// A flat was replaced.
    FlatUpdated(Flat),
    /// A flat was removed.
    FlatDeleted(FlatId),
    /// A house was inserted.
    HouseCreated(House),
    /// A house was replaced.
    HouseUpdated(House),
    /// A house was removed.
    HouseDeleted(HouseId),
}

impl ImportChange {
    /// Stored objects this change touched. A new flat also creates its
    /// coordinates row.
    pub const fn objects(&self) -> i32 {
        match self {
            Self::FlatCreated(_) => 2,
            _ => 1,
        }
    }

    /// Total objects touched by a batch of changes.
    pub fn total_objects(changes: &[Self]) -> i32 {
        changes
            .iter()
            .fold(0_i32, |total, change| total.saturating_add(change.objects()))
    }

    /// The notification announcing this change.
    pub fn notification_event(&self) -> NotificationEvent {
        match self {
            Self::FlatCreated(f) => NotificationEvent::FlatCreated(Box::new(FlatDto::from(f))),
            Self::FlatUpdated(f) => NotificationEvent::FlatUpdated(Box::new(FlatDto::from(f))),
            Self::FlatDeleted(id) => NotificationEvent::FlatDeleted { id: *id },
            Self::HouseCreated(h) => NotificationEvent::HouseCreated(HouseDto::from(h)),
            Self::HouseUpdated(h) => NotificationEvent::HouseUpdated(HouseDto::from(h)),
            Self::HouseDeleted(id) => NotificationEvent::HouseDeleted { id: *id },
        }
    }
}

/// Outcome of a committed import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    /// The recorded history entry.
    pub history: ImportHistory,
    /// Changes in batch order.
    pub changes: Vec<ImportChange>,
}
