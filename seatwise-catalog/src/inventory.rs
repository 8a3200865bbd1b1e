use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use seatwise_core::inventory::lock_order;
use seatwise_core::{
    Airline, CatalogRepository, ClassType, Flight, FlightSchedule, InventoryKey,
    InventoryRepository, ReservationOutcome, Route, ScheduleRepository, ScheduledFlight,
    SeatClassConfig, SeatInventory, SeatRequest, StoreError, StoreResult,
};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::validation::check_schedule_insert;

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

type RowSlot = Arc<Mutex<SeatInventory>>;

#[derive(Default)]
struct CatalogTables {
    airlines: Vec<Airline>,
    routes: Vec<Route>,
    flights: Vec<Flight>,
    schedules: Vec<FlightSchedule>,
    seat_classes: Vec<SeatClassConfig>,
}

/// In-process store with one mutex per inventory row.
///
/// Catalog tables sit behind a single `RwLock` (read-mostly). The row map
/// lock is only held to look up or insert row slots, never while waiting on
/// a row.
pub struct InMemoryStore {
    catalog: RwLock<CatalogTables>,
    rows: Mutex<HashMap<InventoryKey, RowSlot>>,
    lock_timeout: Duration,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            catalog: RwLock::new(CatalogTables::default()),
            rows: Mutex::new(HashMap::new()),
            lock_timeout,
        }
    }

    pub async fn row_count(&self) -> usize {
        self.rows.lock().await.len()
    }

    async fn snapshot(slot: &RowSlot) -> SeatInventory {
        *slot.lock().await
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScheduleRepository for InMemoryStore {
    async fn find_routes(&self, source: &str, destination: &str) -> StoreResult<Vec<Route>> {
        let catalog = self.catalog.read().await;
        Ok(catalog
            .routes
            .iter()
            .filter(|route| route.serves(source, destination))
            .cloned()
            .collect())
    }

    async fn scheduled_flights(&self, route_ids: &[Uuid]) -> StoreResult<Vec<ScheduledFlight>> {
        let catalog = self.catalog.read().await;
        let mut joined = Vec::new();

        for schedule in &catalog.schedules {
            let Some(flight) = catalog.flights.iter().find(|f| f.id == schedule.flight_id) else {
                continue;
            };
            if !route_ids.contains(&flight.route_id) {
                continue;
            }
            let Some(route) = catalog.routes.iter().find(|r| r.id == flight.route_id) else {
                continue;
            };
            let Some(airline) = catalog.airlines.iter().find(|a| a.id == route.airline_id) else {
                continue;
            };

            joined.push(ScheduledFlight {
                airline: airline.clone(),
                route: route.clone(),
                flight: flight.clone(),
                schedule: schedule.clone(),
                seat_classes: catalog
                    .seat_classes
                    .iter()
                    .filter(|seat| seat.schedule_id == schedule.id)
                    .cloned()
                    .collect(),
            });
        }

        Ok(joined)
    }

    async fn find_flight(&self, flight_number: &str) -> StoreResult<Option<Flight>> {
        let catalog = self.catalog.read().await;
        Ok(catalog
            .flights
            .iter()
            .find(|flight| flight.flight_number == flight_number)
            .cloned())
    }

    async fn find_schedule(&self, schedule_id: Uuid) -> StoreResult<Option<FlightSchedule>> {
        let catalog = self.catalog.read().await;
        Ok(catalog.schedules.iter().find(|s| s.id == schedule_id).cloned())
    }

    async fn schedules_for_flight(&self, flight_id: Uuid) -> StoreResult<Vec<FlightSchedule>> {
        let catalog = self.catalog.read().await;
        let mut schedules: Vec<FlightSchedule> = catalog
            .schedules
            .iter()
            .filter(|s| s.flight_id == flight_id)
            .cloned()
            .collect();
        schedules.sort_by_key(|s| s.departure_time);
        Ok(schedules)
    }

    async fn seat_classes(&self, schedule_id: Uuid) -> StoreResult<Vec<SeatClassConfig>> {
        let catalog = self.catalog.read().await;
        Ok(catalog
            .seat_classes
            .iter()
            .filter(|seat| seat.schedule_id == schedule_id)
            .cloned()
            .collect())
    }

    async fn list_cities(&self) -> StoreResult<Vec<String>> {
        let catalog = self.catalog.read().await;
        let cities: BTreeSet<String> = catalog
            .routes
            .iter()
            .flat_map(|route| [route.source.trim().to_string(), route.destination.trim().to_string()])
            .collect();
        Ok(cities.into_iter().collect())
    }
}

#[async_trait]
impl InventoryRepository for InMemoryStore {
    async fn inventory_rows(
        &self,
        schedule_ids: &[Uuid],
        flight_date: NaiveDate,
        class_type: ClassType,
    ) -> StoreResult<Vec<SeatInventory>> {
        let slots: Vec<RowSlot> = {
            let rows = self.rows.lock().await;
            schedule_ids
                .iter()
                .filter_map(|id| rows.get(&InventoryKey::new(*id, flight_date, class_type)).cloned())
                .collect()
        };

        let mut snapshot = Vec::with_capacity(slots.len());
        for slot in &slots {
            snapshot.push(Self::snapshot(slot).await);
        }
        Ok(snapshot)
    }

    async fn inventory_row(&self, key: &InventoryKey) -> StoreResult<Option<SeatInventory>> {
        let slot = self.rows.lock().await.get(key).cloned();
        match slot {
            Some(slot) => Ok(Some(Self::snapshot(&slot).await)),
            None => Ok(None),
        }
    }

    async fn reserve(&self, requests: &[SeatRequest]) -> StoreResult<ReservationOutcome> {
        let ordered = lock_order(requests);

        // 1. Resolve row slots; first-touch rows are inserted under the map lock
        //    so two concurrent first touches share one slot.
        let slots: Vec<RowSlot> = {
            let mut rows = self.rows.lock().await;

            if let Some(missing) = ordered
                .iter()
                .find(|request| request.seed_capacity.is_none() && !rows.contains_key(&request.key))
            {
                return Ok(ReservationOutcome::MissingRow(missing.key));
            }

            ordered
                .iter()
                .map(|request| {
                    rows.entry(request.key)
                        .or_insert_with(|| {
                            let capacity = request.seed_capacity.unwrap_or_default();
                            Arc::new(Mutex::new(SeatInventory::fresh(request.key, capacity)))
                        })
                        .clone()
                })
                .collect()
        };

        // 2. Lock every row in key order
        let mut guards = Vec::with_capacity(slots.len());
        for slot in slots {
            let guard = tokio::time::timeout(self.lock_timeout, slot.lock_owned())
                .await
                .map_err(|_| StoreError::LockTimeout)?;
            guards.push(guard);
        }

        // 3. Check all rows before writing any
        for (request, guard) in ordered.iter().zip(&guards) {
            if (guard.available_seats as i64) < request.seats as i64 {
                return Ok(ReservationOutcome::Insufficient {
                    key: request.key,
                    requested: request.seats,
                    available: guard.available_seats,
                });
            }
        }

        // 4. Apply
        let mut committed = Vec::with_capacity(guards.len());
        for (request, guard) in ordered.iter().zip(guards.iter_mut()) {
            guard.available_seats -= request.seats as i32;
            committed.push(**guard);
        }

        Ok(ReservationOutcome::Committed(committed))
    }

    async fn seed_inventory(&self, rows: &[SeatInventory]) -> StoreResult<usize> {
        if let Some(bad) = rows.iter().find(|row| row.available_seats < 0) {
            return Err(StoreError::Constraint(format!(
                "available seats cannot be negative for schedule {}",
                bad.key.schedule_id
            )));
        }

        let mut slots = self.rows.lock().await;
        let mut created = 0;
        for row in rows {
            if !slots.contains_key(&row.key) {
                slots.insert(row.key, Arc::new(Mutex::new(*row)));
                created += 1;
            }
        }
        Ok(created)
    }
}

#[async_trait]
impl CatalogRepository for InMemoryStore {
    async fn insert_airline(&self, airline: &Airline) -> StoreResult<()> {
        let mut catalog = self.catalog.write().await;
        if catalog.airlines.iter().any(|a| a.name == airline.name) {
            return Err(StoreError::Conflict(format!("airline '{}' already exists", airline.name)));
        }
        catalog.airlines.push(airline.clone());
        Ok(())
    }

    async fn insert_route(&self, route: &Route) -> StoreResult<()> {
        let mut catalog = self.catalog.write().await;
        if !catalog.airlines.iter().any(|a| a.id == route.airline_id) {
            return Err(StoreError::Constraint(format!("unknown airline {}", route.airline_id)));
        }
        if catalog
            .routes
            .iter()
            .any(|r| r.airline_id == route.airline_id && r.serves(&route.source, &route.destination))
        {
            return Err(StoreError::Conflict(
                "airline already has a route between this source and destination".to_string(),
            ));
        }
        catalog.routes.push(route.clone());
        Ok(())
    }

    async fn insert_flight(&self, flight: &Flight) -> StoreResult<()> {
        let mut catalog = self.catalog.write().await;
        if !catalog.routes.iter().any(|r| r.id == flight.route_id) {
            return Err(StoreError::Constraint(format!("unknown route {}", flight.route_id)));
        }
        if catalog.flights.iter().any(|f| f.flight_number == flight.flight_number) {
            return Err(StoreError::Conflict(format!("flight {} already exists", flight.flight_number)));
        }
        catalog.flights.push(flight.clone());
        Ok(())
    }

    async fn insert_schedule(&self, schedule: &FlightSchedule) -> StoreResult<()> {
        let mut catalog = self.catalog.write().await;
        if !catalog.flights.iter().any(|f| f.id == schedule.flight_id) {
            return Err(StoreError::Constraint(format!("unknown flight {}", schedule.flight_id)));
        }
        if catalog.schedules.iter().any(|s| s.id == schedule.id) {
            return Err(StoreError::Conflict(format!("schedule {} already exists", schedule.id)));
        }
        let siblings: Vec<FlightSchedule> =
            catalog.schedules.iter().filter(|s| s.flight_id == schedule.flight_id).cloned().collect();
        check_schedule_insert(schedule, &siblings)?;
        catalog.schedules.push(schedule.clone());
        Ok(())
    }

    async fn insert_seat_class(&self, seat_class: &SeatClassConfig) -> StoreResult<()> {
        if seat_class.total_seats <= 0 || seat_class.base_price < 0 {
            return Err(StoreError::Constraint(
                "total seats must be positive and base price non-negative".to_string(),
            ));
        }

        let mut catalog = self.catalog.write().await;
        if !catalog.schedules.iter().any(|s| s.id == seat_class.schedule_id) {
            return Err(StoreError::Constraint(format!("unknown schedule {}", seat_class.schedule_id)));
        }
        if catalog
            .seat_classes
            .iter()
            .any(|s| s.schedule_id == seat_class.schedule_id && s.class_type == seat_class.class_type)
        {
            return Err(StoreError::Conflict(format!(
                "{} already configured for schedule {}",
                seat_class.class_type, seat_class.schedule_id
            )));
        }
        catalog.seat_classes.push(seat_class.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(schedule: u128, class_type: ClassType) -> InventoryKey {
        InventoryKey::new(
            Uuid::from_u128(schedule),
            NaiveDate::from_ymd_opt(2025, 7, 15).unwrap(),
            class_type,
        )
    }

    fn request(key: InventoryKey, seats: u32) -> SeatRequest {
        SeatRequest { key, seats, seed_capacity: None }
    }

    async fn seeded(rows: &[(InventoryKey, i32)]) -> InMemoryStore {
        let store = InMemoryStore::new();
        let rows: Vec<SeatInventory> = rows
            .iter()
            .map(|(key, available)| SeatInventory { key: *key, available_seats: *available })
            .collect();
        store.seed_inventory(&rows).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_reserve_decrements_row() {
        let economy = key(1, ClassType::Economy);
        let store = seeded(&[(economy, 10)]).await;

        let outcome = store.reserve(&[request(economy, 10)]).await.unwrap();
        assert_eq!(
            outcome,
            ReservationOutcome::Committed(vec![SeatInventory { key: economy, available_seats: 0 }])
        );

        let outcome = store.reserve(&[request(economy, 1)]).await.unwrap();
        assert!(matches!(outcome, ReservationOutcome::Insufficient { available: 0, requested: 1, .. }));
    }

    #[tokio::test]
    async fn test_failed_leg_leaves_every_row_untouched() {
        let outbound = key(1, ClassType::Economy);
        let inbound = key(2, ClassType::Economy);
        let store = seeded(&[(outbound, 10), (inbound, 0)]).await;

        let outcome = store
            .reserve(&[request(outbound, 2), request(inbound, 2)])
            .await
            .unwrap();
        assert!(matches!(outcome, ReservationOutcome::Insufficient { key, .. } if key == inbound));
        assert_eq!(store.inventory_row(&outbound).await.unwrap().unwrap().available_seats, 10);
    }

    #[tokio::test]
    async fn test_missing_row_without_seed_capacity() {
        let known = key(1, ClassType::Economy);
        let unknown = key(9, ClassType::Economy);
        let store = seeded(&[(known, 5)]).await;

        let outcome = store.reserve(&[request(known, 1), request(unknown, 1)]).await.unwrap();
        assert_eq!(outcome, ReservationOutcome::MissingRow(unknown));
        assert_eq!(store.inventory_row(&known).await.unwrap().unwrap().available_seats, 5);
        assert_eq!(store.row_count().await, 1);
    }

    #[tokio::test]
    async fn test_first_touch_materializes_at_capacity() {
        let store = InMemoryStore::new();
        let first = key(3, ClassType::FirstClass);

        let outcome = store
            .reserve(&[SeatRequest { key: first, seats: 2, seed_capacity: Some(12) }])
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ReservationOutcome::Committed(vec![SeatInventory { key: first, available_seats: 10 }])
        );

        // A second first-touch request must not reseed the row
        store
            .reserve(&[SeatRequest { key: first, seats: 1, seed_capacity: Some(12) }])
            .await
            .unwrap();
        assert_eq!(store.inventory_row(&first).await.unwrap().unwrap().available_seats, 9);
    }

    #[tokio::test]
    async fn test_same_row_twice_is_one_combined_request() {
        let economy = key(1, ClassType::Economy);
        let store = seeded(&[(economy, 3)]).await;

        let outcome = store.reserve(&[request(economy, 2), request(economy, 2)]).await.unwrap();
        assert!(matches!(outcome, ReservationOutcome::Insufficient { requested: 4, available: 3, .. }));

        let outcome = store.reserve(&[request(economy, 1), request(economy, 2)]).await.unwrap();
        assert!(matches!(outcome, ReservationOutcome::Committed(rows) if rows[0].available_seats == 0));
    }

    #[tokio::test]
    async fn test_lock_timeout_is_a_storage_error() {
        let economy = key(1, ClassType::Economy);
        let store = InMemoryStore::with_lock_timeout(Duration::from_millis(20));
        store
            .seed_inventory(&[SeatInventory { key: economy, available_seats: 5 }])
            .await
            .unwrap();

        let slot = store.rows.lock().await.get(&economy).cloned().unwrap();
        let _held = slot.lock().await;

        let result = store.reserve(&[request(economy, 1)]).await;
        assert!(matches!(result, Err(StoreError::LockTimeout)));
    }

    #[tokio::test]
    async fn test_seed_keeps_existing_rows() {
        let economy = key(1, ClassType::Economy);
        let store = seeded(&[(economy, 4)]).await;

        let created = store
            .seed_inventory(&[
                SeatInventory { key: economy, available_seats: 50 },
                SeatInventory { key: key(1, ClassType::FirstClass), available_seats: 8 },
            ])
            .await
            .unwrap();

        assert_eq!(created, 1);
        assert_eq!(store.inventory_row(&economy).await.unwrap().unwrap().available_seats, 4);
        assert!(store
            .seed_inventory(&[SeatInventory { key: economy, available_seats: -1 }])
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_route_uniqueness_is_per_operator() {
        let store = InMemoryStore::new();
        let indigo = Airline { id: Uuid::new_v4(), name: "IndiGo".into() };
        let vistara = Airline { id: Uuid::new_v4(), name: "Vistara".into() };
        store.insert_airline(&indigo).await.unwrap();
        store.insert_airline(&vistara).await.unwrap();

        let route = |airline: &Airline, source: &str| Route {
            id: Uuid::new_v4(),
            airline_id: airline.id,
            source: source.into(),
            destination: "Mumbai".into(),
        };

        store.insert_route(&route(&indigo, "Delhi")).await.unwrap();
        store.insert_route(&route(&vistara, "Delhi")).await.unwrap();
        let duplicate = store.insert_route(&route(&indigo, "delhi")).await;
        assert!(matches!(duplicate, Err(StoreError::Conflict(_))));

        assert_eq!(store.find_routes("DELHI", "mumbai").await.unwrap().len(), 2);
        assert_eq!(store.list_cities().await.unwrap(), vec!["Delhi".to_string(), "Mumbai".to_string()]);
    }
}
