use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use seatwise_core::{
    Airline, CatalogRepository, ClassType, Flight, FlightSchedule, InventoryKey,
    InventoryRepository, Recurrence, Route, ScheduleRepository, SeatClassConfig, SeatInventory,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::schedule::operates_on;
use crate::validation::{validate_route, validate_schedule, validate_seat_class, CatalogError};

/// Longest range `seed_inventory` accepts in one call.
const MAX_SEED_DAYS: i64 = 366;

#[derive(Debug, Clone, Deserialize)]
pub struct NewSchedule {
    pub flight_id: Uuid,
    pub departure_time: NaiveTime,
    pub arrival_time: NaiveTime,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub recurrence: Recurrence,
}

/// Operator-facing writes to routes, flights, schedules and seat classes.
#[derive(Clone)]
pub struct CatalogRegistry {
    catalog: Arc<dyn CatalogRepository>,
    schedules: Arc<dyn ScheduleRepository>,
    inventory: Arc<dyn InventoryRepository>,
}

impl CatalogRegistry {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        schedules: Arc<dyn ScheduleRepository>,
        inventory: Arc<dyn InventoryRepository>,
    ) -> Self {
        Self { catalog, schedules, inventory }
    }

    /// Registry over a single store that implements every repository.
    pub fn over<S>(store: Arc<S>) -> Self
    where
        S: CatalogRepository + ScheduleRepository + InventoryRepository + 'static,
    {
        Self::new(store.clone(), store.clone(), store)
    }

    pub async fn register_airline(&self, name: &str) -> Result<Airline, CatalogError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CatalogError::Invalid("airline: name is required".into()));
        }

        let airline = Airline { id: Uuid::new_v4(), name: name.to_string() };
        self.catalog.insert_airline(&airline).await?;
        info!("Registered airline {} ({})", airline.name, airline.id);
        Ok(airline)
    }

    pub async fn register_route(
        &self,
        airline_id: Uuid,
        source: &str,
        destination: &str,
    ) -> Result<Route, CatalogError> {
        let route = Route {
            id: Uuid::new_v4(),
            airline_id,
            source: source.trim().to_string(),
            destination: destination.trim().to_string(),
        };
        validate_route(&route)?;

        self.catalog.insert_route(&route).await?;
        info!("Registered route {} -> {} for airline {}", route.source, route.destination, airline_id);
        Ok(route)
    }

    pub async fn register_flight(&self, route_id: Uuid, flight_number: &str) -> Result<Flight, CatalogError> {
        let flight_number = flight_number.trim();
        if flight_number.is_empty() {
            return Err(CatalogError::Invalid("flight: flight number is required".into()));
        }

        let flight = Flight { id: Uuid::new_v4(), route_id, flight_number: flight_number.to_string() };
        self.catalog.insert_flight(&flight).await?;
        info!("Registered flight {}", flight.flight_number);
        Ok(flight)
    }

    /// The overlap check here reports which schedule clashes. Stores repeat
    /// it under their own lock on insert, so a concurrent registration that
    /// slips past this snapshot still fails with `StoreError::Conflict`.
    pub async fn register_schedule(&self, new: NewSchedule) -> Result<FlightSchedule, CatalogError> {
        let schedule = FlightSchedule {
            id: Uuid::new_v4(),
            flight_id: new.flight_id,
            departure_time: new.departure_time,
            arrival_time: new.arrival_time,
            start_date: new.start_date,
            end_date: match new.recurrence {
                Recurrence::OneTime => None,
                Recurrence::Weekly(_) => new.end_date,
            },
            recurrence: new.recurrence,
        };

        let existing = self.schedules.schedules_for_flight(new.flight_id).await?;
        validate_schedule(&schedule, &existing)?;

        self.catalog.insert_schedule(&schedule).await?;
        info!(
            "Registered schedule {} for flight {} departing {}",
            schedule.id, schedule.flight_id, schedule.departure_time
        );
        Ok(schedule)
    }

    pub async fn register_seat_class(
        &self,
        schedule_id: Uuid,
        class_type: ClassType,
        total_seats: i32,
        base_price: i32,
    ) -> Result<SeatClassConfig, CatalogError> {
        let seat_class = SeatClassConfig {
            id: Uuid::new_v4(),
            schedule_id,
            class_type,
            total_seats,
            base_price,
        };

        let existing = self.schedules.seat_classes(schedule_id).await?;
        validate_seat_class(&seat_class, &existing)?;

        self.catalog.insert_seat_class(&seat_class).await?;
        info!("Registered {} for schedule {}: {} seats", class_type, schedule_id, total_seats);
        Ok(seat_class)
    }

    /// Creates full inventory rows for every operating date in `[from, to]`
    /// and every configured class. Rows that already exist keep their counts.
    pub async fn seed_inventory(
        &self,
        schedule_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<usize, CatalogError> {
        if from > to {
            return Err(CatalogError::Invalid("seed range: start is after end".into()));
        }
        if (to - from).num_days() >= MAX_SEED_DAYS {
            return Err(CatalogError::Invalid(format!(
                "seed range: at most {} days per call",
                MAX_SEED_DAYS
            )));
        }

        let schedule = self
            .schedules
            .find_schedule(schedule_id)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("schedule {}", schedule_id)))?;
        let seat_classes = self.schedules.seat_classes(schedule_id).await?;

        let rows: Vec<SeatInventory> = from
            .iter_days()
            .take_while(|date| *date <= to)
            .filter(|date| operates_on(&schedule, *date))
            .flat_map(|date| {
                seat_classes.iter().map(move |seat| {
                    SeatInventory::fresh(InventoryKey::new(schedule_id, date, seat.class_type), seat.total_seats)
                })
            })
            .collect();

        let created = self.inventory.seed_inventory(&rows).await?;
        info!("Seeded {} inventory rows for schedule {} ({} .. {})", created, schedule_id, from, to);
        Ok(created)
    }

    /// Sets one row to an explicit count, creating it when absent.
    /// Existing rows are left alone, like `seed_inventory`.
    pub async fn seed_row(&self, key: InventoryKey, available_seats: i32) -> Result<bool, CatalogError> {
        let seat_class = self
            .schedules
            .seat_classes(key.schedule_id)
            .await?
            .into_iter()
            .find(|seat| seat.class_type == key.class_type)
            .ok_or_else(|| {
                CatalogError::NotFound(format!("{} on schedule {}", key.class_type, key.schedule_id))
            })?;

        if !(0..=seat_class.total_seats).contains(&available_seats) {
            return Err(CatalogError::Invalid(format!(
                "inventory: available seats must be within 0..={}",
                seat_class.total_seats
            )));
        }

        let created = self
            .inventory
            .seed_inventory(&[SeatInventory { key, available_seats }])
            .await?;
        Ok(created == 1)
    }
}
