//! Enumeration types for the flats catalog.
//!
//! Enum values travel as `SCREAMING_SNAKE_CASE` strings both over JSON and
//! in the `flats.furnish` / `flats.view` text columns, so every enum here
//! carries an [`as_str`](Furnish::as_str) / [`FromStr`] pair used by the
//! data layer.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A string did not name any variant of the target enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    /// Name of the enum being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

// ---------------------------------------------------------------------------
// Furnish
// ---------------------------------------------------------------------------

/// How a flat is furnished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum Furnish {
    /// Furnished by a designer.
    Designer,
    /// No furniture at all.
    None,
    /// Good quality furniture.
    Fine,
    /// Worn or broken furniture.
    Bad,
    /// A few pieces only.
    Little,
}

impl Furnish {
    /// All variants, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Designer,
        Self::None,
        Self::Fine,
        Self::Bad,
        Self::Little,
    ];

    /// Wire and database representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Designer => "DESIGNER",
            Self::None => "NONE",
            Self::Fine => "FINE",
            Self::Bad => "BAD",
            Self::Little => "LITTLE",
        }
    }
}

impl FromStr for Furnish {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "furnish",
                value: s.to_owned(),
            })
    }
}

// ---------------------------------------------------------------------------
// View
// ---------------------------------------------------------------------------

/// What can be seen from the flat's windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum View {
    /// Street-facing windows.
    Street,
    /// Courtyard-facing windows.
    Yard,
    /// Park-facing windows.
    Park,
    /// An unpleasant view.
    Bad,
    /// A pleasant view.
    Good,
}

impl View {
    /// All variants, in declaration order.
    pub const ALL: [Self; 5] = [Self::Street, Self::Yard, Self::Park, Self::Bad, Self::Good];

    /// Wire and database representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Street => "STREET",
            Self::Yard => "YARD",
            Self::Park => "PARK",
            Self::Bad => "BAD",
            Self::Good => "GOOD",
        }
    }
}

impl FromStr for View {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "view",
                value: s.to_owned(),
            })
    }
}
