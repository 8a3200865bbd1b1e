pub mod app_config;
pub mod catalog_repo;
pub mod database;
pub mod events;
pub mod inventory_repo;
pub mod redis_repo;

pub use app_config::Config;
pub use catalog_repo::PostgresStore;
pub use database::DbClient;
pub use events::BookingEvents;
pub use redis_repo::RedisClient;
