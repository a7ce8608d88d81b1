//! `PostgreSQL` flat repository.
//!
//! A flat row and its coordinates row are always written together inside
//! one transaction. The write helpers take a bare [`PgConnection`] so the
//! import store can run them inside its own batch transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flats_types::{
    Coordinates, CoordinatesId, Flat, FlatDraft, FlatId, FlatPredicate, FlatQuery, House,
    HouseId,
};
use sqlx::{PgConnection, PgPool};

use crate::error::DbError;
use crate::filter::{FLAT_SELECT, flat_count_query, flat_page_query, like_pattern};
use crate::repository::FlatRepository;

/// A row of the joined flat listing query.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FlatRow {
    /// Flat id.
    pub id: i64,
    /// Listing name.
    pub name: String,
    /// Insert timestamp.
    pub creation_date: DateTime<Utc>,
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
    /// Furnish text.
    pub furnish: String,
    /// View text.
    pub view: String,
    /// Coordinates id.
    pub coordinates_id: i64,
    /// X coordinate.
    pub x: i32,
    /// Y coordinate.
    pub y: i32,
    /// Linked house id, if any.
    pub house_id: Option<i64>,
    /// Linked house name.
    pub house_name: Option<String>,
    /// Linked house year.
    pub house_year: Option<i32>,
    /// Linked house flats per floor.
    pub house_flats_on_floor: Option<i32>,
}

impl TryFrom<FlatRow> for Flat {
    type Error = DbError;

    fn try_from(row: FlatRow) -> Result<Self, Self::Error> {
        let house = match (row.house_id, row.house_year, row.house_flats_on_floor) {
            (Some(id), Some(year), Some(per_floor)) => Some(House {
                id: HouseId(id),
                name: row.house_name,
                year,
                number_of_flats_on_floor: per_floor,
            }),
            (None, _, _) => None,
            (Some(id), _, _) => {
                return Err(DbError::Decode(format!("house {id} joined without its columns")));
            }
        };
        Ok(Self {
            id: FlatId(row.id),
            name: row.name,
            coordinates: Coordinates {
                id: CoordinatesId(row.coordinates_id),
                x: row.x,
                y: row.y,
            },
            creation_date: row.creation_date,
            area: row.area,
            price: row.price,
            balcony: row.balcony,
            time_to_metro_on_foot: row.time_to_metro_on_foot,
            number_of_rooms: row.number_of_rooms,
            living_space: row.living_space,
            furnish: row.furnish.parse()?,
            view: row.view.parse()?,
            house,
        })
    }
}

fn decode_all(rows: Vec<FlatRow>) -> Result<Vec<Flat>, DbError> {
    rows.into_iter().map(Flat::try_from).collect()
}

fn count_to_u64(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}

/// Load one flat with its coordinates and house.
pub(crate) async fn fetch_flat(conn: &mut PgConnection, id: FlatId) -> Result<Option<Flat>, DbError> {
    let sql = format!("{FLAT_SELECT} WHERE f.id = $1");
    let row = sqlx::query_as::<_, FlatRow>(&sql)
        .bind(id.into_inner())
        .fetch_optional(&mut *conn)
        .await?;
    row.map(Flat::try_from).transpose()
}

/// Insert the coordinates and flat rows, returning the new flat id.
///
/// The house link is resolved in the same statement: a house that no longer
/// exists leaves the flat unlinked, and a linked house cannot be deleted
/// before the transaction ends.
pub(crate) async fn insert_flat(conn: &mut PgConnection, draft: &FlatDraft) -> Result<FlatId, DbError> {
    let coordinates_id: i64 =
        sqlx::query_scalar("INSERT INTO coordinates (x, y) VALUES ($1, $2) RETURNING id")
            .bind(draft.coordinates.x)
            .bind(draft.coordinates.y)
            .fetch_one(&mut *conn)
            .await?;

    let id: i64 = sqlx::query_scalar(
        r"INSERT INTO flats (name, coordinates_id, creation_date, area, price, balcony,
                             time_to_metro_on_foot, number_of_rooms, living_space,
                             furnish, view, house_id)
          VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                  (SELECT id FROM houses WHERE id = $12 FOR KEY SHARE))
          RETURNING id",
    )
    .bind(&draft.name)
    .bind(coordinates_id)
    .bind(Utc::now())
    .bind(draft.area)
    .bind(draft.price)
    .bind(draft.balcony)
    .bind(draft.time_to_metro_on_foot)
    .bind(draft.number_of_rooms)
    .bind(draft.living_space)
    .bind(draft.furnish.as_str())
    .bind(draft.view.as_str())
    .bind(draft.house_id.map(HouseId::into_inner))
    .fetch_one(&mut *conn)
    .await?;

    Ok(FlatId(id))
}

/// Replace the mutable columns of a flat and its coordinates. Returns
/// whether the flat existed.
pub(crate) async fn update_flat(
    conn: &mut PgConnection,
    id: FlatId,
    draft: &FlatDraft,
) -> Result<bool, DbError> {
    let coordinates_id: Option<i64> = sqlx::query_scalar(
        r"UPDATE flats
             SET name = $2, area = $3, price = $4, balcony = $5, time_to_metro_on_foot = $6,
                 number_of_rooms = $7, living_space = $8, furnish = $9, view = $10,
                 house_id = (SELECT id FROM houses WHERE id = $11 FOR KEY SHARE)
           WHERE id = $1
       RETURNING coordinates_id",
    )
    .bind(id.into_inner())
    .bind(&draft.name)
    .bind(draft.area)
    .bind(draft.price)
    .bind(draft.balcony)
    .bind(draft.time_to_metro_on_foot)
    .bind(draft.number_of_rooms)
    .bind(draft.living_space)
    .bind(draft.furnish.as_str())
    .bind(draft.view.as_str())
    .bind(draft.house_id.map(HouseId::into_inner))
    .fetch_optional(&mut *conn)
    .await?;

    let Some(coordinates_id) = coordinates_id else {
        return Ok(false);
    };

    sqlx::query("UPDATE coordinates SET x = $2, y = $3 WHERE id = $1")
        .bind(coordinates_id)
        .bind(draft.coordinates.x)
        .bind(draft.coordinates.y)
        .execute(&mut *conn)
        .await?;

    Ok(true)
}

/// Delete a flat and its coordinates. Returns whether the flat existed.
pub(crate) async fn delete_flat(conn: &mut PgConnection, id: FlatId) -> Result<bool, DbError> {
    let coordinates_id: Option<i64> =
        sqlx::query_scalar("DELETE FROM flats WHERE id = $1 RETURNING coordinates_id")
            .bind(id.into_inner())
            .fetch_optional(&mut *conn)
            .await?;

    let Some(coordinates_id) = coordinates_id else {
        return Ok(false);
    };

    sqlx::query("DELETE FROM coordinates WHERE id = $1")
        .bind(coordinates_id)
        .execute(&mut *conn)
        .await?;

    Ok(true)
}

/// Flat repository over a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgFlatRepository {
    pool: PgPool,
}

impl PgFlatRepository {
    /// Create a repository bound to a connection pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FlatRepository for PgFlatRepository {
    async fn find_page(&self, query: &FlatQuery) -> Result<Vec<Flat>, DbError> {
        let mut qb = flat_page_query(query);
        let rows = qb.build_query_as::<FlatRow>().fetch_all(&self.pool).await?;
        decode_all(rows)
    }

    async fn count(&self, predicates: &[FlatPredicate]) -> Result<u64, DbError> {
        let mut qb = flat_count_query(predicates);
        let count: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count_to_u64(count))
    }

    async fn find_by_id(&self, id: FlatId) -> Result<Option<Flat>, DbError> {
        let mut conn = self.pool.acquire().await?;
        fetch_flat(&mut conn, id).await
    }

    async fn insert(&self, draft: FlatDraft) -> Result<Flat, DbError> {
        let mut tx = self.pool.begin().await?;
        let id = insert_flat(&mut tx, &draft).await?;
        let flat = fetch_flat(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::Decode(format!("flat {id} missing after insert")))?;
        tx.commit().await?;

        tracing::debug!(flat_id = %id, "Inserted flat");
        Ok(flat)
    }

    async fn update(&self, id: FlatId, draft: FlatDraft) -> Result<Option<Flat>, DbError> {
        let mut tx = self.pool.begin().await?;
        if !update_flat(&mut tx, id, &draft).await? {
            return Ok(None);
        }
        let flat = fetch_flat(&mut tx, id).await?;
        tx.commit().await?;
        Ok(flat)
    }

    async fn delete(&self, id: FlatId) -> Result<bool, DbError> {
        let mut tx = self.pool.begin().await?;
        let existed = delete_flat(&mut tx, id).await?;
        tx.commit().await?;
        Ok(existed)
    }

    async fn find_by_name_containing(&self, substring: &str) -> Result<Vec<Flat>, DbError> {
        let sql = format!(r"{FLAT_SELECT} WHERE LOWER(f.name) LIKE $1 ESCAPE '\' ORDER BY f.id");
        let rows = sqlx::query_as::<_, FlatRow>(&sql)
            .bind(like_pattern(&substring.to_lowercase()))
            .fetch_all(&self.pool)
            .await?;
        decode_all(rows)
    }

    async fn count_rooms_greater_than(&self, min_rooms: i32) -> Result<u64, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM flats WHERE number_of_rooms > $1")
            .bind(min_rooms)
            .fetch_one(&self.pool)
            .await?;
        Ok(count_to_u64(count))
    }

    async fn find_living_space_less_than(&self, max_space: i64) -> Result<Vec<Flat>, DbError> {
        let sql = format!("{FLAT_SELECT} WHERE f.living_space < $1 ORDER BY f.id");
        let rows = sqlx::query_as::<_, FlatRow>(&sql)
            .bind(max_space)
            .fetch_all(&self.pool)
            .await?;
        decode_all(rows)
    }

    async fn find_cheapest_with_balcony(&self) -> Result<Option<Flat>, DbError> {
        let sql = format!("{FLAT_SELECT} WHERE f.balcony = TRUE ORDER BY f.price ASC, f.id ASC LIMIT 1");
        let row = sqlx::query_as::<_, FlatRow>(&sql)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Flat::try_from).transpose()
    }

    async fn find_all_by_metro_time(&self) -> Result<Vec<Flat>, DbError> {
        let sql = format!("{FLAT_SELECT} ORDER BY f.time_to_metro_on_foot ASC, f.id ASC");
        let rows = sqlx::query_as::<_, FlatRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        decode_all(rows)
    }
}
