use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::inventory::{InventoryKey, ReservationOutcome, SeatInventory, SeatRequest};
use crate::model::{Airline, ClassType, Flight, FlightSchedule, Route, ScheduledFlight, SeatClassConfig};

/// Failures of the storage layer itself, as opposed to business outcomes.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Timed out waiting for inventory lock")]
    LockTimeout,
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Constraint violated: {0}")]
    Constraint(String),
    #[error("Corrupt record: {0}")]
    Decode(String),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Read-only access to routes, flights and schedules.
#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    /// Routes whose endpoints match case-insensitively, across all operators.
    async fn find_routes(&self, source: &str, destination: &str) -> StoreResult<Vec<Route>>;

    /// Every schedule flown on the given routes, joined with its flight,
    /// route, airline and seat classes.
    async fn scheduled_flights(&self, route_ids: &[Uuid]) -> StoreResult<Vec<ScheduledFlight>>;

    async fn find_flight(&self, flight_number: &str) -> StoreResult<Option<Flight>>;

    async fn find_schedule(&self, schedule_id: Uuid) -> StoreResult<Option<FlightSchedule>>;

    async fn schedules_for_flight(&self, flight_id: Uuid) -> StoreResult<Vec<FlightSchedule>>;

    async fn seat_classes(&self, schedule_id: Uuid) -> StoreResult<Vec<SeatClassConfig>>;

    /// Distinct route endpoints, sorted.
    async fn list_cities(&self) -> StoreResult<Vec<String>>;
}

/// The per-date seat counters. `reserve` is the only mutation path.
#[async_trait]
pub trait InventoryRepository: Send + Sync {
    /// Snapshot read, no locks taken.
    async fn inventory_rows(
        &self,
        schedule_ids: &[Uuid],
        flight_date: NaiveDate,
        class_type: ClassType,
    ) -> StoreResult<Vec<SeatInventory>>;

    async fn inventory_row(&self, key: &InventoryKey) -> StoreResult<Option<SeatInventory>>;

    /// Decrements every requested row in a single transaction, or none of them.
    /// Rows are locked exclusively in `InventoryKey` order.
    async fn reserve(&self, requests: &[SeatRequest]) -> StoreResult<ReservationOutcome>;

    /// Inserts rows that do not exist yet; returns how many were created.
    async fn seed_inventory(&self, rows: &[SeatInventory]) -> StoreResult<usize>;
}

/// Writes used by the operator-facing catalog registry.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn insert_airline(&self, airline: &Airline) -> StoreResult<()>;

    /// Fails with `Conflict` when the operator already flies this city pair.
    async fn insert_route(&self, route: &Route) -> StoreResult<()>;

    async fn insert_flight(&self, flight: &Flight) -> StoreResult<()>;

    async fn insert_schedule(&self, schedule: &FlightSchedule) -> StoreResult<()>;

    async fn insert_seat_class(&self, seat_class: &SeatClassConfig) -> StoreResult<()>;
}
