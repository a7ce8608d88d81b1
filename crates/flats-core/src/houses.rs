//! House service.

use std::sync::Arc;
use std::time::Duration;

use flats_db::HouseRepository;
use flats_types::{
    CreateHouseRequest, HouseDto, HouseId, HouseQuery, Notification, NotificationEvent,
    PagedResponse,
};
use tracing::info;

use crate::bounded;
use crate::broadcast::Broadcaster;
use crate::error::ServiceError;

/// Operations on houses.
#[derive(Clone)]
pub struct HouseService {
    houses: Arc<dyn HouseRepository>,
    broadcaster: Arc<Broadcaster>,
    store_timeout: Duration,
}

impl HouseService {
    /// Create a service over the given repository.
    pub fn new(
        houses: Arc<dyn HouseRepository>,
        broadcaster: Arc<Broadcaster>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            houses,
            broadcaster,
            store_timeout,
        }
    }

    /// One page of houses with the count of rows matching the name filter.
    pub async fn list(&self, query: HouseQuery) -> Result<PagedResponse<HouseDto>, ServiceError> {
        let houses = bounded(self.store_timeout, self.houses.find_page(&query)).await?;
        let total = bounded(
            self.store_timeout,
            self.houses.count(query.name_contains.as_deref()),
        )
        .await?;
        let content = houses.iter().map(HouseDto::from).collect();
        Ok(PagedResponse::of(content, query.page, total))
    }

    /// Look up a house.
    pub async fn get(&self, id: HouseId) -> Result<Option<HouseDto>, ServiceError> {
        let house = bounded(self.store_timeout, self.houses.find_by_id(id)).await?;
        Ok(house.as_ref().map(HouseDto::from))
    }

    /// Persist a new house and announce it.
    pub async fn create(&self, request: CreateHouseRequest) -> Result<HouseDto, ServiceError> {
        let house = bounded(self.store_timeout, self.houses.insert(request.into())).await?;
        let dto = HouseDto::from(&house);
        info!(house_id = %house.id, "House created");
        self.notify(NotificationEvent::HouseCreated(dto.clone())).await;
        Ok(dto)
    }

    /// Replace an existing house and announce it.
    pub async fn update(
        &self,
        id: HouseId,
        request: CreateHouseRequest,
    ) -> Result<Option<HouseDto>, ServiceError> {
        let updated = bounded(self.store_timeout, self.houses.update(id, request.into())).await?;
        let Some(house) = updated else {
            return Ok(None);
        };
        let dto = HouseDto::from(&house);
        info!(house_id = %id, "House updated");
        self.notify(NotificationEvent::HouseUpdated(dto.clone())).await;
        Ok(Some(dto))
    }

    /// Delete a house; linked flats keep existing without it.
    pub async fn delete(&self, id: HouseId) -> Result<bool, ServiceError> {
        let existed = bounded(self.store_timeout, self.houses.delete(id)).await?;
        if existed {
            info!(house_id = %id, "House deleted");
            self.notify(NotificationEvent::HouseDeleted { id }).await;
        }
        Ok(existed)
    }

    /// Houses whose name contains `name`, case-insensitively.
    pub async fn search(&self, name: &str) -> Result<Vec<HouseDto>, ServiceError> {
        let houses = bounded(self.store_timeout, self.houses.find_by_name_containing(name)).await?;
        Ok(houses.iter().map(HouseDto::from).collect())
    }

    async fn notify(&self, event: NotificationEvent) {
        self.broadcaster.broadcast(&Notification::now(event)).await;
    }
}
