//! `PostgreSQL` house repository.

use async_trait::async_trait;
use flats_types::{House, HouseDraft, HouseId, HouseQuery};
use sqlx::{PgConnection, PgPool};

use crate::error::DbError;
use crate::filter::{HOUSE_SELECT, house_count_query, house_page_query, like_pattern};
use crate::repository::HouseRepository;

/// A row from the `houses` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HouseRow {
    /// House id.
    pub id: i64,
    /// Optional display name.
    pub name: Option<String>,
    /// Year built.
    pub year: i32,
    /// Flats on each floor.
    pub number_of_flats_on_floor: i32,
}

impl From<HouseRow> for House {
    fn from(row: HouseRow) -> Self {
        Self {
            id: HouseId(row.id),
            name: row.name,
            year: row.year,
            number_of_flats_on_floor: row.number_of_flats_on_floor,
        }
    }
}

/// Whether a house with this id exists.
/// Whether the house exists. It stays locked against deletion until the
/// transaction ends.
pub(crate) async fn house_exists(conn: &mut PgConnection, id: HouseId) -> Result<bool, DbError> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM houses WHERE id = $1 FOR KEY SHARE)")
        .bind(id.into_inner())
        .fetch_one(&mut *conn)
        .await?;
    Ok(exists)
}

pub(crate) async fn insert_house(conn: &mut PgConnection, draft: &HouseDraft) -> Result<House, DbError> {
    let row = sqlx::query_as::<_, HouseRow>(
        r"INSERT INTO houses (name, year, number_of_flats_on_floor)
          VALUES ($1, $2, $3)
          RETURNING id, name, year, number_of_flats_on_floor",
    )
    .bind(draft.name.as_deref())
    .bind(draft.year)
    .bind(draft.number_of_flats_on_floor)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row.into())
}

pub(crate) async fn update_house(
    conn: &mut PgConnection,
    id: HouseId,
    draft: &HouseDraft,
) -> Result<Option<House>, DbError> {
    let row = sqlx::query_as::<_, HouseRow>(
        r"UPDATE houses SET name = $2, year = $3, number_of_flats_on_floor = $4
           WHERE id = $1
       RETURNING id, name, year, number_of_flats_on_floor",
    )
    .bind(id.into_inner())
    .bind(draft.name.as_deref())
    .bind(draft.year)
    .bind(draft.number_of_flats_on_floor)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row.map(House::from))
}

/// Delete a house; the foreign key nulls out `flats.house_id`.
pub(crate) async fn delete_house(conn: &mut PgConnection, id: HouseId) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM houses WHERE id = $1")
        .bind(id.into_inner())
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// House repository over a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgHouseRepository {
    pool: PgPool,
}

impl PgHouseRepository {
    /// Create a repository bound to a connection pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HouseRepository for PgHouseRepository {
    async fn find_page(&self, query: &HouseQuery) -> Result<Vec<House>, DbError> {
        let mut qb = house_page_query(query);
        let rows = qb.build_query_as::<HouseRow>().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(House::from).collect())
    }

    async fn count(&self, name_contains: Option<&str>) -> Result<u64, DbError> {
        let mut qb = house_count_query(name_contains);
        let count: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn find_by_id(&self, id: HouseId) -> Result<Option<House>, DbError> {
        let sql = format!("{HOUSE_SELECT} WHERE h.id = $1");
        let row = sqlx::query_as::<_, HouseRow>(&sql)
            .bind(id.into_inner())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(House::from))
    }

    async fn insert(&self, draft: HouseDraft) -> Result<House, DbError> {
        let mut conn = self.pool.acquire().await?;
        let house = insert_house(&mut conn, &draft).await?;
        tracing::debug!(house_id = %house.id, "Inserted house");
        Ok(house)
    }

    async fn update(&self, id: HouseId, draft: HouseDraft) -> Result<Option<House>, DbError> {
        let mut conn = self.pool.acquire().await?;
        update_house(&mut conn, id, &draft).await
    }

    async fn delete(&self, id: HouseId) -> Result<bool, DbError> {
        let mut conn = self.pool.acquire().await?;
        delete_house(&mut conn, id).await
    }

    async fn find_by_name_containing(&self, substring: &str) -> Result<Vec<House>, DbError> {
        let sql = format!(r"{HOUSE_SELECT} WHERE LOWER(h.name) LIKE $1 ESCAPE '\' ORDER BY h.id");
        let rows = sqlx::query_as::<_, HouseRow>(&sql)
            .bind(like_pattern(&substring.to_lowercase()))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(House::from).collect())
    }
}
