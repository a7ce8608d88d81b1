//! Compilation of listing queries into parameterised SQL.
//!
//! Predicates and paging values are always bound with
//! [`QueryBuilder::push_bind`]. The only text spliced into the statement is
//! the closed set of column names from the sort field enums.

use flats_types::{FlatPredicate, FlatQuery, HouseQuery};
use sqlx::{Postgres, QueryBuilder};

/// Column list and joins shared by every flat read.
pub const FLAT_SELECT: &str = r"SELECT f.id, f.name, f.creation_date, f.area, f.price, f.balcony,
       f.time_to_metro_on_foot, f.number_of_rooms, f.living_space, f.furnish, f.view,
       c.id AS coordinates_id, c.x, c.y,
       h.id AS house_id, h.name AS house_name, h.year AS house_year,
       h.number_of_flats_on_floor AS house_flats_on_floor
  FROM flats f
  JOIN coordinates c ON c.id = f.coordinates_id
  LEFT JOIN houses h ON h.id = f.house_id";

/// Column list shared by every house read.
pub const HOUSE_SELECT: &str =
    "SELECT h.id, h.name, h.year, h.number_of_flats_on_floor FROM houses h";

/// Wrap a lower-cased needle for `LIKE ... ESCAPE '\'`, escaping the
/// pattern metacharacters it contains.
pub fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len().saturating_add(2));
    pattern.push('%');
    for ch in needle.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// Append `WHERE`/`AND` clauses for each predicate.
pub fn push_flat_predicates(qb: &mut QueryBuilder<'_, Postgres>, predicates: &[FlatPredicate]) {
    let mut clauses = Clauses::default();
    for predicate in predicates {
        match predicate {
            FlatPredicate::NameContains(needle) => {
                clauses.next(qb);
                qb.push("LOWER(f.name) LIKE ")
                    .push_bind(like_pattern(needle))
                    .push(r" ESCAPE '\'");
            }
            FlatPredicate::PriceRange { min, max } => {
                if let Some(min) = min {
                    clauses.next(qb);
                    qb.push("f.price >= ").push_bind(*min);
                }
                if let Some(max) = max {
                    clauses.next(qb);
                    qb.push("f.price <= ").push_bind(*max);
                }
            }
            FlatPredicate::BalconyEquals(value) => {
                clauses.next(qb);
                qb.push("f.balcony = ").push_bind(*value);
            }
            FlatPredicate::RoomsRange { min, max } => {
                if let Some(min) = min {
                    clauses.next(qb);
                    qb.push("f.number_of_rooms >= ").push_bind(*min);
                }
                if let Some(max) = max {
                    clauses.next(qb);
                    qb.push("f.number_of_rooms <= ").push_bind(*max);
                }
            }
        }
    }
}

/// Full page query for a flat listing.
pub fn flat_page_query(query: &FlatQuery) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(FLAT_SELECT);
    push_flat_predicates(&mut qb, &query.predicates);
    qb.push(" ORDER BY ")
        .push(query.sort.column())
        .push(" ")
        .push(query.direction.as_sql())
        .push(", f.id ASC");
    push_limit_offset(&mut qb, query.page.size(), query.page.offset());
    qb
}

/// Row count for a flat listing under the same predicates.
pub fn flat_count_query(predicates: &[FlatPredicate]) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM flats f");
    push_flat_predicates(&mut qb, predicates);
    qb
}

/// Full page query for a house listing.
pub fn house_page_query(query: &HouseQuery) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(HOUSE_SELECT);
    push_house_name(&mut qb, query.name_contains.as_deref());
    qb.push(" ORDER BY ")
        .push(query.sort.column())
        .push(" ")
        .push(query.direction.as_sql());
    // Unnamed houses sort first in both stores.
    if query.sort == flats_types::HouseSortField::Name {
        qb.push(match query.direction {
            flats_types::SortDirection::Asc => " NULLS FIRST",
            flats_types::SortDirection::Desc => " NULLS LAST",
        });
    }
    qb.push(", h.id ASC");
    push_limit_offset(&mut qb, query.page.size(), query.page.offset());
    qb
}

/// Row count for a house listing.
pub fn house_count_query(name_contains: Option<&str>) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM houses h");
    push_house_name(&mut qb, name_contains);
    qb
}

fn push_house_name(qb: &mut QueryBuilder<'_, Postgres>, name_contains: Option<&str>) {
    if let Some(needle) = name_contains {
        qb.push(" WHERE LOWER(h.name) LIKE ")
            .push_bind(like_pattern(needle))
            .push(r" ESCAPE '\'");
    }
}

fn push_limit_offset(qb: &mut QueryBuilder<'_, Postgres>, size: u32, offset: u64) {
    qb.push(" LIMIT ")
        .push_bind(i64::from(size))
        .push(" OFFSET ")
        .push_bind(i64::try_from(offset).unwrap_or(i64::MAX));
}

/// Emits ` WHERE ` before the first clause and ` AND ` before the rest.
#[derive(Default)]
struct Clauses {
    started: bool,
}

impl Clauses {
    fn next(&mut self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(if self.started { " AND " } else { " WHERE " });
        self.started = true;
    }
}
