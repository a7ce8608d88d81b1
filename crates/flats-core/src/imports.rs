//! Batch import service.
//!
//! Every raw operation is parsed and validated before anything reaches the
//! store; the store then applies the batch atomically. Each applied change
//! is announced, followed by one `IMPORT_COMPLETED` notification.

use std::sync::Arc;
use std::time::Duration;

use flats_db::ImportRepository;
use flats_types::{
    ImportHistoryDto, ImportOperation, Notification, NotificationEvent, PageRequest,
    PagedResponse, RawImportOperation,
};
use tracing::info;

use crate::bounded;
use crate::broadcast::Broadcaster;
use crate::error::ServiceError;

/// Page size of the history listing when none is given.
pub const DEFAULT_HISTORY_PAGE_SIZE: u32 = 10;

/// Number of recent entries returned when no limit is given.
pub const DEFAULT_LATEST_LIMIT: u32 = 5;

/// Largest number of recent entries returned.
pub const MAX_LATEST_LIMIT: u32 = 500;

/// Batch import and import history.
#[derive(Clone)]
pub struct ImportService {
    imports: Arc<dyn ImportRepository>,
    broadcaster: Arc<Broadcaster>,
    store_timeout: Duration,
}

impl ImportService {
    /// Create a service over the given repository.
    pub fn new(
        imports: Arc<dyn ImportRepository>,
        broadcaster: Arc<Broadcaster>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            imports,
            broadcaster,
            store_timeout,
        }
    }

    /// Validate and apply a batch. Nothing is written unless every
    /// operation succeeds.
    pub async fn import(
        &self,
        raw: Vec<RawImportOperation>,
    ) -> Result<ImportHistoryDto, ServiceError> {
        if raw.is_empty() {
            return Err(ServiceError::invalid("import batch is empty"));
        }

        let operations = raw
            .into_iter()
            .enumerate()
            .map(|(index, op)| ImportOperation::parse(index, op))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ServiceError::Invalid {
                message: e.to_string(),
                details: e.details,
            })?;

        let count = operations.len();
        let report = bounded(self.store_timeout, self.imports.apply(operations)).await?;
        info!(import_id = %report.history.id, operations = count, "Import applied");

        for change in &report.changes {
            self.broadcaster
                .broadcast(&Notification::now(change.notification_event()))
                .await;
        }
        let dto = ImportHistoryDto::from(&report.history);
        self.broadcaster
            .broadcast(&Notification::now(NotificationEvent::ImportCompleted(dto.clone())))
            .await;
        Ok(dto)
    }

    /// One page of the import history, newest first.
    pub async fn history(
        &self,
        page: PageRequest,
    ) -> Result<PagedResponse<ImportHistoryDto>, ServiceError> {
        let entries = bounded(self.store_timeout, self.imports.history_page(page)).await?;
        let total = bounded(self.store_timeout, self.imports.history_count()).await?;
        let content = entries.iter().map(ImportHistoryDto::from).collect();
        Ok(PagedResponse::of(content, page, total))
    }

    /// Up to `limit` most recent entries, newest first.
    pub async fn latest(&self, limit: u32) -> Result<Vec<ImportHistoryDto>, ServiceError> {
        let limit = limit.clamp(1, MAX_LATEST_LIMIT);
        let entries = bounded(self.store_timeout, self.imports.latest(limit)).await?;
        Ok(entries.iter().map(ImportHistoryDto::from).collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use flats_db::Catalog;
    use flats_types::SessionId;
    use serde_json::json;

    use super::*;
    use crate::broadcast::Connection;

    fn raw(value: serde_json::Value) -> RawImportOperation {
        serde_json::from_value(value).unwrap()
    }

    fn house_op() -> RawImportOperation {
        raw(json!({
            "type": "HOUSE",
            "data": { "name": "Imported", "year": 1970, "numberOfFlatsOnFloor": 5 }
        }))
    }

    fn service() -> (ImportService, Catalog, Arc<Broadcaster>) {
        let catalog = Catalog::in_memory();
        let broadcaster = Arc::new(Broadcaster::new());
        let service = ImportService::new(
            Arc::clone(&catalog.imports),
            Arc::clone(&broadcaster),
            Duration::from_secs(1),
        );
        (service, catalog, broadcaster)
    }

    #[tokio::test]
    async fn empty_batch_rejected() {
        let (service, _, _) = service();
        assert!(matches!(
            service.import(Vec::new()).await,
            Err(ServiceError::Invalid { .. })
        ));
    }

    #[tokio::test]
    async fn invalid_operation_names_its_index() {
        let (service, catalog, _) = service();
        let bad = raw(json!({ "type": "HOUSE", "data": { "year": 0, "numberOfFlatsOnFloor": 1 } }));
        let err = service.import(vec![house_op(), bad]).await.unwrap_err();
        match err {
            ServiceError::Invalid { message, details } => {
                assert!(message.starts_with("operation 1"));
                assert_eq!(details.len(), 1);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(catalog.houses.count(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn dangling_reference_rejects_batch() {
        let (service, catalog, _) = service();
        let delete = raw(json!({ "type": "FLAT", "operation": "DELETE", "data": { "id": 77 } }));
        let err = service.import(vec![house_op(), delete]).await.unwrap_err();
        assert!(matches!(err, ServiceError::Invalid { .. }));
        assert_eq!(catalog.houses.count(None).await.unwrap(), 0);
        assert!(service.latest(DEFAULT_LATEST_LIMIT).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn success_announces_each_change_then_completion() {
        let (service, _, broadcaster) = service();
        let (conn, mut rx) = Connection::channel(8);
        broadcaster.register(SessionId::new(), conn).await;

        let history = service.import(vec![house_op(), house_op()]).await.unwrap();
        assert_eq!(history.objects_count, 2);

        let mut kinds = Vec::new();
        while let Ok(text) = rx.try_recv() {
            let json: serde_json::Value = serde_json::from_str(&text).unwrap();
            kinds.push(json["type"].as_str().unwrap().to_owned());
        }
        assert_eq!(kinds, vec!["HOUSE_CREATED", "HOUSE_CREATED", "IMPORT_COMPLETED"]);

        let page = PageRequest::try_new(0, i64::from(DEFAULT_HISTORY_PAGE_SIZE), 100).unwrap();
        let entries = service.history(page).await.unwrap();
        assert_eq!(entries.total_elements, 1);
        assert_eq!(entries.content.len(), 1);
        let latest = service.latest(DEFAULT_LATEST_LIMIT).await.unwrap();
        assert_eq!(latest.first().unwrap().id, history.id);
    }
}
