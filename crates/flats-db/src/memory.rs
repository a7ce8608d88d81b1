//! In-process catalog store.
//!
//! Implements every repository trait over a single `tokio::sync::RwLock`
//! with the same semantics as the `PostgreSQL` store: store-assigned ids,
//! predicates evaluated with [`FlatPredicate::matches`], id tie-breaks,
//! house deletion nulling flat links, and all-or-nothing imports. Used for
//! development runs and the test suites.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use flats_types::{
    Coordinates, CoordinatesId, Flat, FlatDraft, FlatId, FlatPredicate, FlatQuery, House,
    HouseDraft, HouseId, HouseQuery, ImportChange, ImportHistory, ImportId, ImportOperation,
    ImportReport, ImportedHouse, PageRequest, house_name_contains,
};
use tokio::sync::RwLock;

use crate::error::DbError;
use crate::import_store::reject;
use crate::repository::{FlatRepository, HouseRepository, ImportRepository};

/// A flat as held in memory: the house is kept as a reference so house
/// updates and deletions show through on the next read.
#[derive(Debug, Clone)]
struct StoredFlat {
    flat: Flat,
    house_id: Option<HouseId>,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    flats: BTreeMap<FlatId, StoredFlat>,
    houses: BTreeMap<HouseId, House>,
    history: Vec<ImportHistory>,
    last_flat_id: i64,
    last_coordinates_id: i64,
    last_house_id: i64,
    last_import_id: i64,
}

fn next_id(last: &mut i64) -> i64 {
    *last = last.saturating_add(1);
    *last
}

impl MemoryState {
    fn materialize(&self, stored: &StoredFlat) -> Flat {
        let mut flat = stored.flat.clone();
        flat.house = stored.house_id.and_then(|id| self.houses.get(&id).cloned());
        flat
    }

    fn flats_where(&self, keep: impl Fn(&Flat) -> bool) -> Vec<Flat> {
        self.flats
            .values()
            .map(|s| self.materialize(s))
            .filter(|f| keep(f))
            .collect()
    }

    fn insert_flat(&mut self, draft: FlatDraft) -> Flat {
        let id = FlatId(next_id(&mut self.last_flat_id));
        let coordinates = Coordinates {
            id: CoordinatesId(next_id(&mut self.last_coordinates_id)),
            x: draft.coordinates.x,
            y: draft.coordinates.y,
        };
        let house_id = self.existing_house(draft.house_id);
        let flat = Flat {
            id,
            name: draft.name,
            coordinates,
            creation_date: Utc::now(),
            area: draft.area,
            price: draft.price,
            balcony: draft.balcony,
            time_to_metro_on_foot: draft.time_to_metro_on_foot,
            number_of_rooms: draft.number_of_rooms,
            living_space: draft.living_space,
            furnish: draft.furnish,
            view: draft.view,
            house: None,
        };
        let stored = StoredFlat { flat, house_id };
        let out = self.materialize(&stored);
        self.flats.insert(id, stored);
        out
    }

    fn existing_house(&self, house_id: Option<HouseId>) -> Option<HouseId> {
        house_id.filter(|id| self.houses.contains_key(id))
    }

    fn update_flat(&mut self, id: FlatId, draft: FlatDraft) -> Option<Flat> {
        let house_id = self.existing_house(draft.house_id);
        let stored = self.flats.get_mut(&id)?;
        let flat = &mut stored.flat;
        flat.name = draft.name;
        flat.coordinates.x = draft.coordinates.x;
        flat.coordinates.y = draft.coordinates.y;
        flat.area = draft.area;
        flat.price = draft.price;
        flat.balcony = draft.balcony;
        flat.time_to_metro_on_foot = draft.time_to_metro_on_foot;
        flat.number_of_rooms = draft.number_of_rooms;
        flat.living_space = draft.living_space;
        flat.furnish = draft.furnish;
        flat.view = draft.view;
        stored.house_id = house_id;
        let stored = stored.clone();
        Some(self.materialize(&stored))
    }

    fn insert_house(&mut self, draft: HouseDraft) -> House {
        let house = House::from_draft(HouseId(next_id(&mut self.last_house_id)), draft);
        self.houses.insert(house.id, house.clone());
        house
    }

    fn update_house(&mut self, id: HouseId, draft: HouseDraft) -> Option<House> {
        let house = self.houses.get_mut(&id)?;
        *house = House::from_draft(id, draft);
        Some(house.clone())
    }

    fn delete_house(&mut self, id: HouseId) -> bool {
        if self.houses.remove(&id).is_none() {
            return false;
        }
        for stored in self.flats.values_mut() {
            if stored.house_id == Some(id) {
                stored.house_id = None;
            }
        }
        true
    }

    fn linked_house(
        &mut self,
        index: usize,
        house: Option<ImportedHouse>,
        changes: &mut Vec<ImportChange>,
    ) -> Result<Option<HouseId>, DbError> {
        match house {
            None => Ok(None),
            Some(ImportedHouse::Existing(id)) if !self.houses.contains_key(&id) => {
                Err(reject(index, format!("house {id} does not exist")))
            }
            Some(ImportedHouse::Existing(id)) => Ok(Some(id)),
            Some(ImportedHouse::New(request)) => {
                let house = self.insert_house(request.into());
                let id = house.id;
                changes.push(ImportChange::HouseCreated(house));
                Ok(Some(id))
            }
        }
    }

    fn apply_one(
        &mut self,
        index: usize,
        operation: ImportOperation,
        changes: &mut Vec<ImportChange>,
    ) -> Result<(), DbError> {
        let change = match operation {
            ImportOperation::CreateFlat(flat) => {
                let house_id = self.linked_house(index, flat.house, changes)?;
                ImportChange::FlatCreated(self.insert_flat(flat.request.into_draft(house_id)))
            }
            ImportOperation::UpdateFlat { id, flat } => {
                let house_id = self.linked_house(index, flat.house, changes)?;
                self.update_flat(id, flat.request.into_draft(house_id))
                    .map(ImportChange::FlatUpdated)
                    .ok_or_else(|| reject(index, format!("flat {id} does not exist")))?
            }
            ImportOperation::DeleteFlat(id) => self
                .flats
                .remove(&id)
                .map(|_| ImportChange::FlatDeleted(id))
                .ok_or_else(|| reject(index, format!("flat {id} does not exist")))?,
            ImportOperation::CreateHouse(request) => {
                ImportChange::HouseCreated(self.insert_house(request.into()))
            }
            ImportOperation::UpdateHouse { id, request } => self
                .update_house(id, request.into())
                .map(ImportChange::HouseUpdated)
                .ok_or_else(|| reject(index, format!("house {id} does not exist")))?,
            ImportOperation::DeleteHouse(id) => {
                if !self.delete_house(id) {
                    return Err(reject(index, format!("house {id} does not exist")));
                }
                ImportChange::HouseDeleted(id)
            }
        };
        changes.push(change);
        Ok(())
    }
}

fn page_of<T>(items: Vec<T>, offset: u64, size: u32) -> Vec<T> {
    let skip = usize::try_from(offset).unwrap_or(usize::MAX);
    let take = usize::try_from(size).unwrap_or(usize::MAX);
    items.into_iter().skip(skip).take(take).collect()
}

fn len_u64(len: usize) -> u64 {
    u64::try_from(len).unwrap_or(u64::MAX)
}

/// In-memory catalog implementing all repository traits.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    state: RwLock<MemoryState>,
}

impl MemoryCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FlatRepository for MemoryCatalog {
    async fn find_page(&self, query: &FlatQuery) -> Result<Vec<Flat>, DbError> {
        let state = self.state.read().await;
        let mut flats = state.flats_where(|f| query.matches(f));
        flats.sort_by(|a, b| query.ordering(a, b));
        Ok(page_of(flats, query.page.offset(), query.page.size()))
    }

    async fn count(&self, predicates: &[FlatPredicate]) -> Result<u64, DbError> {
        let state = self.state.read().await;
        let count = state
            .flats
            .values()
            .filter(|s| predicates.iter().all(|p| p.matches(&s.flat)))
            .count();
        Ok(len_u64(count))
    }

    async fn find_by_id(&self, id: FlatId) -> Result<Option<Flat>, DbError> {
        let state = self.state.read().await;
        Ok(state.flats.get(&id).map(|s| state.materialize(s)))
    }

    async fn insert(&self, draft: FlatDraft) -> Result<Flat, DbError> {
        Ok(self.state.write().await.insert_flat(draft))
    }

    async fn update(&self, id: FlatId, draft: FlatDraft) -> Result<Option<Flat>, DbError> {
        Ok(self.state.write().await.update_flat(id, draft))
    }

    async fn delete(&self, id: FlatId) -> Result<bool, DbError> {
        Ok(self.state.write().await.flats.remove(&id).is_some())
    }

    async fn find_by_name_containing(&self, substring: &str) -> Result<Vec<Flat>, DbError> {
        let needle = FlatPredicate::NameContains(substring.to_lowercase());
        Ok(self.state.read().await.flats_where(|f| needle.matches(f)))
    }

    async fn count_rooms_greater_than(&self, min_rooms: i32) -> Result<u64, DbError> {
        let state = self.state.read().await;
        let count = state
            .flats
            .values()
            .filter(|s| s.flat.number_of_rooms > min_rooms)
            .count();
        Ok(len_u64(count))
    }

    async fn find_living_space_less_than(&self, max_space: i64) -> Result<Vec<Flat>, DbError> {
        Ok(self
            .state
            .read()
            .await
            .flats_where(|f| f.living_space < max_space))
    }

    async fn find_cheapest_with_balcony(&self) -> Result<Option<Flat>, DbError> {
        let state = self.state.read().await;
        Ok(state
            .flats_where(|f| f.balcony == Some(true))
            .into_iter()
            .min_by_key(|f| (f.price, f.id)))
    }

    async fn find_all_by_metro_time(&self) -> Result<Vec<Flat>, DbError> {
        let mut flats = self.state.read().await.flats_where(|_| true);
        flats.sort_by_key(|f| (f.time_to_metro_on_foot, f.id));
        Ok(flats)
    }
}

#[async_trait]
impl HouseRepository for MemoryCatalog {
    async fn find_page(&self, query: &HouseQuery) -> Result<Vec<House>, DbError> {
        let state = self.state.read().await;
        let mut houses: Vec<House> = state
            .houses
            .values()
            .filter(|h| query.matches(h))
            .cloned()
            .collect();
        houses.sort_by(|a, b| query.ordering(a, b));
        Ok(page_of(houses, query.page.offset(), query.page.size()))
    }

    async fn count(&self, name_contains: Option<&str>) -> Result<u64, DbError> {
        let state = self.state.read().await;
        let count = state
            .houses
            .values()
            .filter(|h| house_name_contains(h, name_contains))
            .count();
        Ok(len_u64(count))
    }

    async fn find_by_id(&self, id: HouseId) -> Result<Option<House>, DbError> {
        Ok(self.state.read().await.houses.get(&id).cloned())
    }

    async fn insert(&self, draft: HouseDraft) -> Result<House, DbError> {
        Ok(self.state.write().await.insert_house(draft))
    }

    async fn update(&self, id: HouseId, draft: HouseDraft) -> Result<Option<House>, DbError> {
        Ok(self.state.write().await.update_house(id, draft))
    }

    async fn delete(&self, id: HouseId) -> Result<bool, DbError> {
        Ok(self.state.write().await.delete_house(id))
    }

    async fn find_by_name_containing(&self, substring: &str) -> Result<Vec<House>, DbError> {
        let needle = substring.to_lowercase();
        let state = self.state.read().await;
        Ok(state
            .houses
            .values()
            .filter(|h| house_name_contains(h, Some(&needle)))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ImportRepository for MemoryCatalog {
    async fn apply(&self, operations: Vec<ImportOperation>) -> Result<ImportReport, DbError> {
        let mut state = self.state.write().await;

        // Work on a copy; the live state is only replaced once every
        // operation has succeeded.
        let mut next = state.clone();
        let mut changes = Vec::with_capacity(operations.len());
        for (index, operation) in operations.into_iter().enumerate() {
            next.apply_one(index, operation, &mut changes)?;
        }

        let history = ImportHistory {
            id: ImportId(next_id(&mut next.last_import_id)),
            operation_time: Utc::now(),
            objects_count: ImportChange::total_objects(&changes),
        };
        next.history.push(history.clone());
        *state = next;

        tracing::info!(import_id = %history.id, objects = history.objects_count, "Import committed");
        Ok(ImportReport { history, changes })
    }

    async fn history_page(&self, page: PageRequest) -> Result<Vec<ImportHistory>, DbError> {
        let state = self.state.read().await;
        let newest_first: Vec<ImportHistory> = state.history.iter().rev().cloned().collect();
        Ok(page_of(newest_first, page.offset(), page.size()))
    }

    async fn history_count(&self) -> Result<u64, DbError> {
        Ok(len_u64(self.state.read().await.history.len()))
    }

    async fn latest(&self, limit: u32) -> Result<Vec<ImportHistory>, DbError> {
        let state = self.state.read().await;
        let take = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(state.history.iter().rev().take(take).cloned().collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use flats_types::{
        CoordinatesDraft, CreateCoordinatesRequest, CreateFlatRequest, CreateHouseRequest,
        FlatFilter, FlatImport, FlatSortField, Furnish, SortDirection, View,
    };

    use super::*;

    fn draft(name: &str, price: i64, rooms: i32, balcony: Option<bool>) -> FlatDraft {
        FlatDraft {
            name: name.to_owned(),
            coordinates: CoordinatesDraft { x: 1, y: 2 },
            area: 50,
            price,
            balcony,
            time_to_metro_on_foot: 10,
            number_of_rooms: rooms,
            living_space: 30,
            furnish: Furnish::Fine,
            view: View::Street,
            house_id: None,
        }
    }

    fn house_draft(name: &str) -> HouseDraft {
        HouseDraft {
            name: Some(name.to_owned()),
            year: 2000,
            number_of_flats_on_floor: 4,
        }
    }

    #[tokio::test]
    async fn insert_assigns_distinct_ids() {
        let store = MemoryCatalog::new();
        let a = FlatRepository::insert(&store, draft("a", 10, 1, None)).await.unwrap();
        let b = FlatRepository::insert(&store, draft("b", 10, 1, None)).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_ne!(a.coordinates.id, b.coordinates.id);
    }

    #[tokio::test]
    async fn update_preserves_identity_and_creation_date() {
        let store = MemoryCatalog::new();
        let created = FlatRepository::insert(&store, draft("a", 10, 1, None)).await.unwrap();
        let updated = FlatRepository::update(&store, created.id, draft("b", 20, 2, Some(true)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.coordinates.id, created.coordinates.id);
        assert_eq!(updated.creation_date, created.creation_date);
        assert_eq!(updated.name, "b");
        assert!(
            FlatRepository::update(&store, FlatId(99), draft("c", 1, 1, None))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn filtered_page_and_count_agree() {
        let store = MemoryCatalog::new();
        for price in [100, 200, 300, 400, 500] {
            FlatRepository::insert(&store, draft("x", price, 2, None)).await.unwrap();
        }
        let filter = FlatFilter {
            min_price: Some(200),
            ..FlatFilter::default()
        };
        let query = FlatQuery {
            predicates: filter.predicates(),
            sort: FlatSortField::Price,
            direction: SortDirection::Desc,
            page: PageRequest::try_new(1, 2, 100).unwrap(),
        };
        let page = FlatRepository::find_page(&store, &query).await.unwrap();
        let prices: Vec<i64> = page.iter().map(|f| f.price).collect();
        assert_eq!(prices, vec![300, 200]);
        assert_eq!(FlatRepository::count(&store, &query.predicates).await.unwrap(), 4);
        assert_eq!(FlatRepository::count(&store, &[]).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn cheapest_with_balcony() {
        let store = MemoryCatalog::new();
        assert!(store.find_cheapest_with_balcony().await.unwrap().is_none());

        FlatRepository::insert(&store, draft("a", 300, 1, Some(true))).await.unwrap();
        let cheapest = FlatRepository::insert(&store, draft("b", 200, 1, Some(true))).await.unwrap();
        FlatRepository::insert(&store, draft("c", 250, 1, Some(false))).await.unwrap();

        let found = store.find_cheapest_with_balcony().await.unwrap().unwrap();
        assert_eq!(found.id, cheapest.id);
    }

    #[tokio::test]
    async fn strict_comparisons() {
        let store = MemoryCatalog::new();
        FlatRepository::insert(&store, draft("a", 1, 2, None)).await.unwrap();
        FlatRepository::insert(&store, draft("b", 1, 3, None)).await.unwrap();
        assert_eq!(store.count_rooms_greater_than(2).await.unwrap(), 1);
        assert!(store.find_living_space_less_than(30).await.unwrap().is_empty());
        assert_eq!(store.find_living_space_less_than(31).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn missing_house_is_not_linked() {
        let store = MemoryCatalog::new();
        let mut d = draft("a", 1, 1, None);
        d.house_id = Some(HouseId(1));
        let flat = FlatRepository::insert(&store, d.clone()).await.unwrap();
        assert!(flat.house.is_none());

        // A house created later under the same id does not adopt the flat.
        let house = HouseRepository::insert(&store, house_draft("Late")).await.unwrap();
        assert_eq!(house.id, HouseId(1));
        let flat = FlatRepository::find_by_id(&store, flat.id).await.unwrap().unwrap();
        assert!(flat.house.is_none());

        let updated = FlatRepository::update(&store, flat.id, d).await.unwrap().unwrap();
        assert_eq!(updated.house.map(|h| h.id), Some(house.id));
    }

    #[tokio::test]
    async fn deleting_a_house_unlinks_flats() {
        let store = MemoryCatalog::new();
        let house = HouseRepository::insert(&store, house_draft("Tower")).await.unwrap();
        let mut d = draft("a", 1, 1, None);
        d.house_id = Some(house.id);
        let flat = FlatRepository::insert(&store, d).await.unwrap();
        assert_eq!(flat.house.as_ref().map(|h| h.id), Some(house.id));

        assert!(HouseRepository::delete(&store, house.id).await.unwrap());
        let flat = FlatRepository::find_by_id(&store, flat.id).await.unwrap().unwrap();
        assert!(flat.house.is_none());
        assert!(!HouseRepository::delete(&store, house.id).await.unwrap());
    }

    fn flat_import(house: Option<ImportedHouse>) -> FlatImport {
        FlatImport {
            request: flat_request(),
            house,
        }
    }

    fn flat_request() -> CreateFlatRequest {
        CreateFlatRequest {
            name: String::from("Imported"),
            coordinates: CreateCoordinatesRequest { x: 0, y: 0 },
            area: 10,
            price: 10,
            balcony: None,
            time_to_metro_on_foot: 1,
            number_of_rooms: 1,
            living_space: 5,
            furnish: Furnish::None,
            view: View::Yard,
            house_id: None,
        }
    }

    #[tokio::test]
    async fn import_is_all_or_nothing() {
        let store = MemoryCatalog::new();
        let err = store
            .apply(vec![
                ImportOperation::CreateFlat(flat_import(None)),
                ImportOperation::CreateFlat(flat_import(Some(ImportedHouse::Existing(HouseId(42))))),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rejected(ref r) if r.index == 1));
        assert_eq!(FlatRepository::count(&store, &[]).await.unwrap(), 0);
        assert!(store.latest(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn import_records_history() {
        let store = MemoryCatalog::new();
        let report = store
            .apply(vec![
                ImportOperation::CreateHouse(CreateHouseRequest {
                    name: None,
                    year: 1999,
                    number_of_flats_on_floor: 2,
                }),
                ImportOperation::CreateFlat(flat_import(Some(ImportedHouse::Existing(HouseId(1))))),
            ])
            .await
            .unwrap();
        assert_eq!(report.history.objects_count, 3);
        assert_eq!(report.changes.len(), 2);

        store
            .apply(vec![ImportOperation::DeleteFlat(FlatId(1))])
            .await
            .unwrap();
        let page = store
            .history_page(PageRequest::try_new(0, 10, 100).unwrap())
            .await
            .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page.first().unwrap().objects_count, 1);
        assert_eq!(store.history_count().await.unwrap(), 2);

        let second_page = store
            .history_page(PageRequest::try_new(1, 1, 100).unwrap())
            .await
            .unwrap();
        assert_eq!(second_page.first().unwrap().id, ImportId(1));

        let latest = store.latest(1).await.unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest.first().unwrap().id, ImportId(2));
    }

    #[tokio::test]
    async fn import_creates_nested_house() {
        let store = MemoryCatalog::new();
        let nested = CreateHouseRequest {
            name: Some(String::from("Nested")),
            year: 1999,
            number_of_flats_on_floor: 3,
        };
        let report = store
            .apply(vec![ImportOperation::CreateFlat(flat_import(Some(ImportedHouse::New(nested))))])
            .await
            .unwrap();
        assert_eq!(report.history.objects_count, 3);
        assert!(matches!(
            report.changes.as_slice(),
            [ImportChange::HouseCreated(_), ImportChange::FlatCreated(_)]
        ));

        let flat = FlatRepository::find_by_id(&store, FlatId(1)).await.unwrap().unwrap();
        let house = flat.house.unwrap();
        assert_eq!(house.name.as_deref(), Some("Nested"));
        assert_eq!(HouseRepository::count(&store, None).await.unwrap(), 1);
    }
}
