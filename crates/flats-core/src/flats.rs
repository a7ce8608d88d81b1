//! Flat service: listing, CRUD, and the specialised flat queries.
//!
//! Mutations persist first and notify second. Nothing is broadcast when
//! the target row does not exist.

use std::sync::Arc;
use std::time::Duration;

use flats_db::{FlatRepository, HouseRepository};
use flats_types::{
    CreateFlatRequest, Flat, FlatDto, FlatId, FlatQuery, HouseId, Notification, NotificationEvent,
    PagedResponse,
};
use tracing::{info, warn};

use crate::broadcast::Broadcaster;
use crate::error::ServiceError;
use crate::bounded;

/// Operations on flats.
#[derive(Clone)]
pub struct FlatService {
    flats: Arc<dyn FlatRepository>,
    houses: Arc<dyn HouseRepository>,
    broadcaster: Arc<Broadcaster>,
    store_timeout: Duration,
}

impl FlatService {
    /// Create a service over the given repositories.
    pub fn new(
        flats: Arc<dyn FlatRepository>,
        houses: Arc<dyn HouseRepository>,
        broadcaster: Arc<Broadcaster>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            flats,
            houses,
            broadcaster,
            store_timeout,
        }
    }

    /// One page of flats with the count of rows matching the same predicates.
    pub async fn list(&self, query: FlatQuery) -> Result<PagedResponse<FlatDto>, ServiceError> {
        let flats = bounded(self.store_timeout, self.flats.find_page(&query)).await?;
        let total = bounded(self.store_timeout, self.flats.count(&query.predicates)).await?;
        let content = flats.iter().map(FlatDto::from).collect();
        Ok(PagedResponse::of(content, query.page, total))
    }

    /// Look up a flat.
    pub async fn get(&self, id: FlatId) -> Result<Option<FlatDto>, ServiceError> {
        let flat = bounded(self.store_timeout, self.flats.find_by_id(id)).await?;
        Ok(flat.as_ref().map(FlatDto::from))
    }

    /// Persist a new flat and announce it.
    pub async fn create(&self, request: CreateFlatRequest) -> Result<FlatDto, ServiceError> {
        let house_id = self.resolve_house(request.house_id).await?;
        let flat = bounded(self.store_timeout, self.flats.insert(request.into_draft(house_id))).await?;
        warn_if_unlinked(house_id, &flat);
        let dto = FlatDto::from(&flat);

        info!(flat_id = %flat.id, "Flat created");
        self.notify(NotificationEvent::FlatCreated(Box::new(dto.clone()))).await;
        Ok(dto)
    }

    /// Replace an existing flat and announce it. `None` when it does not exist.
    pub async fn update(
        &self,
        id: FlatId,
        request: CreateFlatRequest,
    ) -> Result<Option<FlatDto>, ServiceError> {
        let house_id = self.resolve_house(request.house_id).await?;
        let updated = bounded(
            self.store_timeout,
            self.flats.update(id, request.into_draft(house_id)),
        )
        .await?;
        let Some(flat) = updated else {
            return Ok(None);
        };
        warn_if_unlinked(house_id, &flat);
        let dto = FlatDto::from(&flat);

        info!(flat_id = %id, "Flat updated");
        self.notify(NotificationEvent::FlatUpdated(Box::new(dto.clone()))).await;
        Ok(Some(dto))
    }

    /// Delete a flat and announce it. Returns whether it existed.
    pub async fn delete(&self, id: FlatId) -> Result<bool, ServiceError> {
        let existed = bounded(self.store_timeout, self.flats.delete(id)).await?;
        if existed {
            info!(flat_id = %id, "Flat deleted");
            self.notify(NotificationEvent::FlatDeleted { id }).await;
        }
        Ok(existed)
    }

    /// Number of flats with strictly more than `min_rooms` rooms.
    pub async fn count_by_rooms_greater_than(&self, min_rooms: i32) -> Result<u64, ServiceError> {
        bounded(self.store_timeout, self.flats.count_rooms_greater_than(min_rooms)).await
    }

    /// Flats whose name contains `substring`, case-insensitively.
    pub async fn find_by_name_containing(&self, substring: &str) -> Result<Vec<FlatDto>, ServiceError> {
        let flats = bounded(self.store_timeout, self.flats.find_by_name_containing(substring)).await?;
        Ok(flats.iter().map(FlatDto::from).collect())
    }

    /// Flats with strictly less than `max_space` living space.
    pub async fn find_by_living_space_less_than(
        &self,
        max_space: i64,
    ) -> Result<Vec<FlatDto>, ServiceError> {
        let flats = bounded(self.store_timeout, self.flats.find_living_space_less_than(max_space)).await?;
        Ok(flats.iter().map(FlatDto::from).collect())
    }

    /// The cheapest flat with a balcony.
    pub async fn find_cheapest_with_balcony(&self) -> Result<Option<FlatDto>, ServiceError> {
        let flat = bounded(self.store_timeout, self.flats.find_cheapest_with_balcony()).await?;
        Ok(flat.as_ref().map(FlatDto::from))
    }

    /// All flats, nearest to the metro first.
    pub async fn find_all_sorted_by_metro_time(&self) -> Result<Vec<FlatDto>, ServiceError> {
        let flats = bounded(self.store_timeout, self.flats.find_all_by_metro_time()).await?;
        Ok(flats.iter().map(FlatDto::from).collect())
    }

    /// Resolve a requested house link. An unknown house is dropped with a
    /// warning and the flat is saved without one.
    async fn resolve_house(&self, requested: Option<HouseId>) -> Result<Option<HouseId>, ServiceError> {
        let Some(id) = requested else {
            return Ok(None);
        };
        let house = bounded(self.store_timeout, self.houses.find_by_id(id)).await?;
        if house.is_none() {
            warn!(house_id = %id, "Requested house does not exist, saving flat without a house");
        }
        Ok(house.map(|h| h.id))
    }

    async fn notify(&self, event: NotificationEvent) {
        self.broadcaster.broadcast(&Notification::now(event)).await;
    }
}

/// The house was resolved but deleted before the flat was written.
fn warn_if_unlinked(requested: Option<HouseId>, flat: &Flat) {
    if let (Some(house_id), None) = (requested, &flat.house) {
        warn!(%house_id, flat_id = %flat.id, "House deleted concurrently, flat saved without a house");
    }
}
