use std::sync::Arc;

use seatwise_core::{Clock, InventoryRepository, Materialization, ScheduleRepository};
use seatwise_offer::SearchEngine;
use seatwise_order::BookingEngine;
use seatwise_store::{BookingEvents, RedisClient};

#[derive(Clone)]
pub struct RateLimiter {
    pub redis: Arc<RedisClient>,
    pub requests_per_minute: i64,
}

#[derive(Clone)]
pub struct AppState {
    pub search: Arc<SearchEngine>,
    pub booking: Arc<BookingEngine>,
    pub schedules: Arc<dyn ScheduleRepository>,
    pub clock: Arc<dyn Clock>,
    pub events: BookingEvents,
    pub rate_limiter: Option<RateLimiter>,
}

impl AppState {
    pub fn new(
        schedules: Arc<dyn ScheduleRepository>,
        inventory: Arc<dyn InventoryRepository>,
        clock: Arc<dyn Clock>,
        materialization: Materialization,
    ) -> Self {
        Self {
            search: Arc::new(SearchEngine::new(
                schedules.clone(),
                inventory.clone(),
                clock.clone(),
                materialization,
            )),
            booking: Arc::new(BookingEngine::new(schedules.clone(), inventory, materialization)),
            schedules,
            clock,
            events: BookingEvents::default(),
            rate_limiter: None,
        }
    }

    pub fn with_rate_limiter(mut self, redis: RedisClient, requests_per_minute: i64) -> Self {
        self.rate_limiter = Some(RateLimiter { redis: Arc::new(redis), requests_per_minute });
        self
    }
}
