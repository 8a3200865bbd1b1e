pub mod models;
pub mod time_format;

pub use models::events::SeatsBookedEvent;
