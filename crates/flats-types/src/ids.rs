//! Type-safe identifier wrappers.
//!
//! Catalog rows are keyed by store-assigned `BIGSERIAL` values. Each entity
//! gets its own newtype so a [`HouseId`] can never be passed where a
//! [`FlatId`] is expected. Identifiers are never minted by the application;
//! the `From<i64>` conversion exists for decoding rows and path parameters.
//!
//! WebSocket sessions are the exception: they are not persisted, so
//! [`SessionId`] wraps a random UUID generated on connect.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around a store-assigned `i64` key.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[serde(transparent)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(#[ts(type = "number")] pub i64);

        impl $name {
            /// Return the inner key value.
            pub const fn into_inner(self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a flat.
    FlatId
}

define_id! {
    /// Unique identifier for a coordinates row owned by a flat.
    CoordinatesId
}

define_id! {
    /// Unique identifier for a house.
    HouseId
}

define_id! {
    /// Unique identifier for an import history entry.
    ImportId
}

/// Identifier of a live WebSocket session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Create a new random session identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for SessionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_bare_numbers() {
        let json = serde_json::to_string(&FlatId::from(42)).unwrap();
        assert_eq!(json, "42");

        let back: HouseId = serde_json::from_str("7").unwrap();
        assert_eq!(back, HouseId(7));
    }

    #[test]
    fn session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }
}
