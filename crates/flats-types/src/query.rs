//! Listing criteria: typed filter predicates, sort fields and directions.
//!
//! Criteria arrive as loose optional query parameters. [`FlatFilter`] turns
//! them into a list of [`FlatPredicate`]s that the data layer either
//! compiles to SQL or evaluates in memory. Sort fields are a closed set of
//! the entity's own columns, so no caller text ever reaches the SQL.

use std::cmp::Ordering;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::page::PageRequest;
use crate::structs::{Flat, House};

/// A sort field or direction string was not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownSort {
    /// What was being parsed (`sort field` or `sort direction`).
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Sort direction, ascending unless asked otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Smallest first.
    #[default]
    Asc,
    /// Largest first.
    Desc,
}

impl SortDirection {
    /// SQL keyword.
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    /// Apply the direction to an ascending comparison.
    pub const fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }
}

impl FromStr for SortDirection {
    type Err = UnknownSort;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(UnknownSort {
                kind: "sort direction",
                value: s.to_owned(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Flat predicates
// ---------------------------------------------------------------------------

/// One conjunctive condition over a flat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlatPredicate {
    /// Case-insensitive substring of the name. Stored lower-cased.
    NameContains(String),
    /// Inclusive price range; either bound may be open.
    PriceRange {
        /// Lower bound.
        min: Option<i64>,
        /// Upper bound.
        max: Option<i64>,
    },
    /// Balcony flag equals the value. Flats with an unknown balcony never match.
    BalconyEquals(bool),
    /// Inclusive room-count range; either bound may be open.
    RoomsRange {
        /// Lower bound.
        min: Option<i32>,
        /// Upper bound.
        max: Option<i32>,
    },
}

impl FlatPredicate {
    /// Evaluate against an in-memory flat.
    pub fn matches(&self, flat: &Flat) -> bool {
        match self {
            Self::NameContains(needle) => flat.name.to_lowercase().contains(needle.as_str()),
            Self::PriceRange { min, max } => in_range(flat.price, *min, *max),
            Self::BalconyEquals(value) => flat.balcony == Some(*value),
            Self::RoomsRange { min, max } => in_range(flat.number_of_rooms, *min, *max),
        }
    }
}

fn in_range<T: PartialOrd + Copy>(value: T, min: Option<T>, max: Option<T>) -> bool {
    min.is_none_or(|m| value >= m) && max.is_none_or(|m| value <= m)
}

/// Raw optional filter criteria for the flat listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatFilter {
    /// Name substring.
    pub name: Option<String>,
    /// Minimum price, inclusive.
    pub min_price: Option<i64>,
    /// Maximum price, inclusive.
    pub max_price: Option<i64>,
    /// Required balcony flag.
    pub has_balcony: Option<bool>,
    /// Minimum room count, inclusive.
    pub min_rooms: Option<i32>,
    /// Maximum room count, inclusive.
    pub max_rooms: Option<i32>,
}

impl FlatFilter {
    /// Predicates for the criteria that are present. A blank name is
    /// treated as absent.
    pub fn predicates(&self) -> Vec<FlatPredicate> {
        let mut out = Vec::new();
        if let Some(name) = self.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            out.push(FlatPredicate::NameContains(name.to_lowercase()));
        }
        if self.min_price.is_some() || self.max_price.is_some() {
            out.push(FlatPredicate::PriceRange {
                min: self.min_price,
                max: self.max_price,
            });
        }
        if let Some(value) = self.has_balcony {
            out.push(FlatPredicate::BalconyEquals(value));
        }
        if self.min_rooms.is_some() || self.max_rooms.is_some() {
            out.push(FlatPredicate::RoomsRange {
                min: self.min_rooms,
                max: self.max_rooms,
            });
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Flat sort
// ---------------------------------------------------------------------------

/// Column a flat listing can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlatSortField {
    /// Identifier.
    #[default]
    Id,
    /// Name.
    Name,
    /// Creation date.
    CreationDate,
    /// Area.
    Area,
    /// Price.
    Price,
    /// Minutes to the metro.
    TimeToMetroOnFoot,
    /// Room count.
    NumberOfRooms,
    /// Living space.
    LivingSpace,
    /// Furnish text.
    Furnish,
    /// View text.
    View,
}

impl FlatSortField {
    /// `ORDER BY` expression in the flat listing query. Text columns sort
    /// under the `C` collation, bytewise like [`Self::compare`].
    pub const fn column(self) -> &'static str {
        match self {
            Self::Id => "f.id",
            Self::Name => r#"f.name COLLATE "C""#,
            Self::CreationDate => "f.creation_date",
            Self::Area => "f.area",
            Self::Price => "f.price",
            Self::TimeToMetroOnFoot => "f.time_to_metro_on_foot",
            Self::NumberOfRooms => "f.number_of_rooms",
            Self::LivingSpace => "f.living_space",
            Self::Furnish => r#"f.furnish COLLATE "C""#,
            Self::View => r#"f.view COLLATE "C""#,
        }
    }

    /// Ascending comparison of two flats on this field.
    pub fn compare(self, a: &Flat, b: &Flat) -> Ordering {
        match self {
            Self::Id => a.id.cmp(&b.id),
            Self::Name => a.name.cmp(&b.name),
            Self::CreationDate => a.creation_date.cmp(&b.creation_date),
            Self::Area => a.area.cmp(&b.area),
            Self::Price => a.price.cmp(&b.price),
            Self::TimeToMetroOnFoot => a.time_to_metro_on_foot.cmp(&b.time_to_metro_on_foot),
            Self::NumberOfRooms => a.number_of_rooms.cmp(&b.number_of_rooms),
            Self::LivingSpace => a.living_space.cmp(&b.living_space),
            Self::Furnish => a.furnish.as_str().cmp(b.furnish.as_str()),
            Self::View => a.view.as_str().cmp(b.view.as_str()),
        }
    }
}

impl FromStr for FlatSortField {
    type Err = UnknownSort;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(Self::Id),
            "name" => Ok(Self::Name),
            "creationDate" | "creation_date" => Ok(Self::CreationDate),
            "area" => Ok(Self::Area),
            "price" => Ok(Self::Price),
            "timeToMetroOnFoot" | "time_to_metro_on_foot" => Ok(Self::TimeToMetroOnFoot),
            "numberOfRooms" | "number_of_rooms" => Ok(Self::NumberOfRooms),
            "livingSpace" | "living_space" => Ok(Self::LivingSpace),
            "furnish" => Ok(Self::Furnish),
            "view" => Ok(Self::View),
            _ => Err(UnknownSort {
                kind: "sort field",
                value: s.to_owned(),
            }),
        }
    }
}

/// A fully validated flat listing query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatQuery {
    /// Conjunctive predicates.
    pub predicates: Vec<FlatPredicate>,
    /// Sort column.
    pub sort: FlatSortField,
    /// Sort direction.
    pub direction: SortDirection,
    /// Requested page.
    pub page: PageRequest,
}

impl FlatQuery {
    /// Whether a flat passes every predicate.
    pub fn matches(&self, flat: &Flat) -> bool {
        self.predicates.iter().all(|p| p.matches(flat))
    }

    /// Listing order: the sort field in the requested direction, then id
    /// ascending.
    pub fn ordering(&self, a: &Flat, b: &Flat) -> Ordering {
        self.direction
            .apply(self.sort.compare(a, b))
            .then_with(|| a.id.cmp(&b.id))
    }
}

// ---------------------------------------------------------------------------
// Houses
// ---------------------------------------------------------------------------

/// Column a house listing can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HouseSortField {
    /// Identifier.
    #[default]
    Id,
    /// Name. Houses without a name sort first.
    Name,
    /// Year built.
    Year,
    /// Flats on each floor.
    NumberOfFlatsOnFloor,
}

impl HouseSortField {
    /// `ORDER BY` expression in the house listing query. Names sort under
    /// the `C` collation.
    pub const fn column(self) -> &'static str {
        match self {
            Self::Id => "h.id",
            Self::Name => r#"h.name COLLATE "C""#,
            Self::Year => "h.year",
            Self::NumberOfFlatsOnFloor => "h.number_of_flats_on_floor",
        }
    }

    /// Ascending comparison of two houses on this field.
    pub fn compare(self, a: &House, b: &House) -> Ordering {
        match self {
            Self::Id => a.id.cmp(&b.id),
            Self::Name => a.name.cmp(&b.name),
            Self::Year => a.year.cmp(&b.year),
            Self::NumberOfFlatsOnFloor => a.number_of_flats_on_floor.cmp(&b.number_of_flats_on_floor),
        }
    }
}

impl FromStr for HouseSortField {
    type Err = UnknownSort;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(Self::Id),
            "name" => Ok(Self::Name),
            "year" => Ok(Self::Year),
            "numberOfFlatsOnFloor" | "number_of_flats_on_floor" => Ok(Self::NumberOfFlatsOnFloor),
            _ => Err(UnknownSort {
                kind: "sort field",
                value: s.to_owned(),
            }),
        }
    }
}

/// A fully validated house listing query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HouseQuery {
    /// Lower-cased name substring, if any.
    pub name_contains: Option<String>,
    /// Sort column.
    pub sort: HouseSortField,
    /// Sort direction.
    pub direction: SortDirection,
    /// Requested page.
    pub page: PageRequest,
}

impl HouseQuery {
    /// Normalise a raw name filter: trimmed, lower-cased, blank dropped.
    pub fn normalize_name(raw: Option<&str>) -> Option<String> {
        raw.map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_lowercase)
    }

    /// Whether a house passes the name filter.
    pub fn matches(&self, house: &House) -> bool {
        house_name_contains(house, self.name_contains.as_deref())
    }

    /// Listing order: the sort field in the requested direction, then id
    /// ascending.
    pub fn ordering(&self, a: &House, b: &House) -> Ordering {
        self.direction
            .apply(self.sort.compare(a, b))
            .then_with(|| a.id.cmp(&b.id))
    }
}

/// Case-insensitive name match for houses; `needle` must already be
/// lower-cased. A missing needle matches everything, a missing name
/// matches nothing else.
pub fn house_name_contains(house: &House, needle: Option<&str>) -> bool {
    needle.is_none_or(|n| {
        house
            .name
            .as_deref()
            .is_some_and(|name| name.to_lowercase().contains(n))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::enums::{Furnish, View};
    use crate::ids::{CoordinatesId, FlatId};
    use crate::structs::Coordinates;

    fn flat(id: i64, price: i64, rooms: i32, balcony: Option<bool>) -> Flat {
        Flat {
            id: FlatId(id),
            name: format!("Flat {id}"),
            coordinates: Coordinates {
                id: CoordinatesId(id),
                x: 0,
                y: 0,
            },
            creation_date: Utc::now(),
            area: 40,
            price,
            balcony,
            time_to_metro_on_foot: 10,
            number_of_rooms: rooms,
            living_space: 30,
            furnish: Furnish::Fine,
            view: View::Yard,
            house: None,
        }
    }

    fn query(filter: &FlatFilter) -> FlatQuery {
        FlatQuery {
            predicates: filter.predicates(),
            ..FlatQuery::default()
        }
    }

    #[test]
    fn absent_criteria_produce_no_predicates() {
        assert!(FlatFilter::default().predicates().is_empty());
        let blank = FlatFilter {
            name: Some(String::from("  ")),
            ..FlatFilter::default()
        };
        assert!(blank.predicates().is_empty());
    }

    #[test]
    fn predicates_combine_conjunctively() {
        let target = flat(1, 100, 2, Some(true));

        let included = FlatFilter {
            min_price: Some(50),
            max_rooms: Some(3),
            ..FlatFilter::default()
        };
        assert!(query(&included).matches(&target));

        let excluded = FlatFilter {
            min_price: Some(150),
            max_rooms: Some(3),
            ..FlatFilter::default()
        };
        assert!(!query(&excluded).matches(&target));
    }

    #[test]
    fn name_match_is_case_insensitive() {
        let filter = FlatFilter {
            name: Some(String::from("FLAT 1")),
            ..FlatFilter::default()
        };
        assert!(query(&filter).matches(&flat(1, 10, 1, None)));
        assert!(!query(&filter).matches(&flat(2, 10, 1, None)));
    }

    #[test]
    fn unknown_balcony_never_matches() {
        let filter = FlatFilter {
            has_balcony: Some(false),
            ..FlatFilter::default()
        };
        assert!(!query(&filter).matches(&flat(1, 10, 1, None)));
        assert!(query(&filter).matches(&flat(1, 10, 1, Some(false))));
    }

    #[test]
    fn sort_fields_parse_both_spellings() {
        assert_eq!(
            "timeToMetroOnFoot".parse::<FlatSortField>().unwrap(),
            FlatSortField::TimeToMetroOnFoot
        );
        assert_eq!(
            "living_space".parse::<FlatSortField>().unwrap(),
            FlatSortField::LivingSpace
        );
        assert!("house.year".parse::<FlatSortField>().is_err());
        assert!("DROP TABLE".parse::<HouseSortField>().is_err());
    }

    #[test]
    fn direction_defaults_to_ascending() {
        assert_eq!(SortDirection::default(), SortDirection::Asc);
        assert_eq!("DESC".parse::<SortDirection>().unwrap(), SortDirection::Desc);
        assert!("sideways".parse::<SortDirection>().is_err());
    }

    #[test]
    fn ties_break_on_id() {
        let q = FlatQuery {
            sort: FlatSortField::Price,
            direction: SortDirection::Desc,
            ..FlatQuery::default()
        };
        let mut flats = vec![flat(3, 100, 1, None), flat(1, 100, 1, None), flat(2, 200, 1, None)];
        flats.sort_by(|a, b| q.ordering(a, b));
        let ids: Vec<i64> = flats.iter().map(|f| f.id.0).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }
}
