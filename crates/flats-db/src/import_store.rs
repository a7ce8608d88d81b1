//! `PostgreSQL` batch import and import history.
//!
//! The whole batch runs in one transaction. Any rejected operation or store
//! failure drops the transaction, which rolls back every earlier write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flats_types::{
    HouseId, ImportChange, ImportHistory, ImportId, ImportOperation, ImportReport, ImportedHouse,
    InvalidImportOperation, PageRequest,
};
use sqlx::{PgConnection, PgPool};

use crate::error::DbError;
use crate::flat_store::{delete_flat, fetch_flat, insert_flat, update_flat};
use crate::house_store::{delete_house, house_exists, insert_house, update_house};
use crate::repository::ImportRepository;

/// A row from the `import_history` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ImportHistoryRow {
    /// Entry id.
    pub id: i64,
    /// Commit time of the batch.
    pub operation_time: DateTime<Utc>,
    /// Objects affected by the batch.
    pub objects_count: i32,
}

impl From<ImportHistoryRow> for ImportHistory {
    fn from(row: ImportHistoryRow) -> Self {
        Self {
            id: ImportId(row.id),
            operation_time: row.operation_time,
            objects_count: row.objects_count,
        }
    }
}

/// Refusal of the operation at `index`.
pub(crate) fn reject(index: usize, message: String) -> DbError {
    DbError::Rejected(InvalidImportOperation {
        index,
        message,
        details: Vec::new(),
    })
}

/// Import repository over a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgImportRepository {
    pool: PgPool,
}

impl PgImportRepository {
    /// Create a repository bound to a connection pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Resolve or create the house a flat import links to. A created house is
/// recorded in `changes` ahead of the flat.
async fn linked_house(
    conn: &mut PgConnection,
    index: usize,
    house: Option<ImportedHouse>,
    changes: &mut Vec<ImportChange>,
) -> Result<Option<HouseId>, DbError> {
    match house {
        None => Ok(None),
        Some(ImportedHouse::Existing(id)) => {
            if !house_exists(conn, id).await? {
                return Err(reject(index, format!("house {id} does not exist")));
            }
            Ok(Some(id))
        }
        Some(ImportedHouse::New(request)) => {
            let house = insert_house(conn, &request.into()).await?;
            let id = house.id;
            changes.push(ImportChange::HouseCreated(house));
            Ok(Some(id))
        }
    }
}

async fn apply_one(
    conn: &mut PgConnection,
    index: usize,
    operation: ImportOperation,
    changes: &mut Vec<ImportChange>,
) -> Result<(), DbError> {
    let change = match operation {
        ImportOperation::CreateFlat(flat) => {
            let house_id = linked_house(conn, index, flat.house, changes).await?;
            let id = insert_flat(conn, &flat.request.into_draft(house_id)).await?;
            let flat = fetch_flat(conn, id)
                .await?
                .ok_or_else(|| DbError::Decode(format!("flat {id} missing after insert")))?;
            ImportChange::FlatCreated(flat)
        }
        ImportOperation::UpdateFlat { id, flat } => {
            let house_id = linked_house(conn, index, flat.house, changes).await?;
            if !update_flat(conn, id, &flat.request.into_draft(house_id)).await? {
                return Err(reject(index, format!("flat {id} does not exist")));
            }
            let flat = fetch_flat(conn, id)
                .await?
                .ok_or_else(|| DbError::Decode(format!("flat {id} missing after update")))?;
            ImportChange::FlatUpdated(flat)
        }
        ImportOperation::DeleteFlat(id) => {
            if !delete_flat(conn, id).await? {
                return Err(reject(index, format!("flat {id} does not exist")));
            }
            ImportChange::FlatDeleted(id)
        }
        ImportOperation::CreateHouse(request) => {
            ImportChange::HouseCreated(insert_house(conn, &request.into()).await?)
        }
        ImportOperation::UpdateHouse { id, request } => update_house(conn, id, &request.into())
            .await?
            .map(ImportChange::HouseUpdated)
            .ok_or_else(|| reject(index, format!("house {id} does not exist")))?,
        ImportOperation::DeleteHouse(id) => {
            if !delete_house(conn, id).await? {
                return Err(reject(index, format!("house {id} does not exist")));
            }
            ImportChange::HouseDeleted(id)
        }
    };
    changes.push(change);
    Ok(())
}

#[async_trait]
impl ImportRepository for PgImportRepository {
    async fn apply(&self, operations: Vec<ImportOperation>) -> Result<ImportReport, DbError> {
        let mut tx = self.pool.begin().await?;

        let mut changes = Vec::with_capacity(operations.len());
        for (index, operation) in operations.into_iter().enumerate() {
            apply_one(&mut tx, index, operation, &mut changes).await?;
        }

        let objects_count = ImportChange::total_objects(&changes);
        let row = sqlx::query_as::<_, ImportHistoryRow>(
            r"INSERT INTO import_history (operation_time, objects_count)
              VALUES ($1, $2)
              RETURNING id, operation_time, objects_count",
        )
        .bind(Utc::now())
        .bind(objects_count)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let history = ImportHistory::from(row);
        tracing::info!(import_id = %history.id, objects = objects_count, "Import committed");
        Ok(ImportReport { history, changes })
    }

    async fn history_page(&self, page: PageRequest) -> Result<Vec<ImportHistory>, DbError> {
        let rows = sqlx::query_as::<_, ImportHistoryRow>(
            r"SELECT id, operation_time, objects_count
                FROM import_history
               ORDER BY operation_time DESC, id DESC
               LIMIT $1 OFFSET $2",
        )
        .bind(i64::from(page.size()))
        .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ImportHistory::from).collect())
    }

    async fn history_count(&self) -> Result<u64, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM import_history")
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn latest(&self, limit: u32) -> Result<Vec<ImportHistory>, DbError> {
        let rows = sqlx::query_as::<_, ImportHistoryRow>(
            r"SELECT id, operation_time, objects_count
                FROM import_history
               ORDER BY operation_time DESC, id DESC
               LIMIT $1",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ImportHistory::from).collect())
    }
}
