pub mod inventory;
pub mod pricing;
pub mod registry;
pub mod schedule;
pub mod validation;

pub use inventory::InMemoryStore;
pub use pricing::{PriceQuote, PricingEngine};
pub use registry::{CatalogRegistry, NewSchedule};
pub use schedule::ScheduleResolver;
pub use validation::CatalogError;
