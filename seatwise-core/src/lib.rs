pub mod clock;
pub mod inventory;
pub mod model;
pub mod repository;
pub mod search;

pub use clock::{Clock, FixedClock, SystemClock};
pub use inventory::{InventoryKey, Materialization, ReservationOutcome, SeatInventory, SeatRequest};
pub use model::{
    Airline, ClassType, Flight, FlightSchedule, OperatingDays, Recurrence, Route, ScheduledFlight,
    SeatClassConfig,
};
pub use repository::{
    CatalogRepository, InventoryRepository, ScheduleRepository, StoreError, StoreResult,
};
pub use search::{FlightOffer, SearchQuery, SearchResult};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type CoreResult<T> = Result<T, CoreError>;
