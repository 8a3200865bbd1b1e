use std::collections::HashMap;
use std::sync::Arc;

use seatwise_catalog::{PricingEngine, ScheduleResolver};
use seatwise_core::{
    ClassType, Clock, FlightOffer, InventoryKey, InventoryRepository, Materialization,
    ScheduleRepository, ScheduledFlight, SearchQuery, SearchResult, SeatInventory, StoreResult,
};
use tracing::debug;
use uuid::Uuid;

/// Read-only flight search: route -> schedules -> inventory -> priced offers.
pub struct SearchEngine {
    schedules: Arc<dyn ScheduleRepository>,
    inventory: Arc<dyn InventoryRepository>,
    resolver: ScheduleResolver,
    pricing: PricingEngine,
    clock: Arc<dyn Clock>,
    materialization: Materialization,
}

impl SearchEngine {
    pub fn new(
        schedules: Arc<dyn ScheduleRepository>,
        inventory: Arc<dyn InventoryRepository>,
        clock: Arc<dyn Clock>,
        materialization: Materialization,
    ) -> Self {
        Self {
            resolver: ScheduleResolver::new(schedules.clone()),
            schedules,
            inventory,
            pricing: PricingEngine::new(),
            clock,
            materialization,
        }
    }

    pub async fn search(&self, query: &SearchQuery) -> StoreResult<SearchResult> {
        let routes = self.schedules.find_routes(&query.source, &query.destination).await?;
        if routes.is_empty() {
            debug!("No route {} -> {}", query.source, query.destination);
            return Ok(SearchResult::route_not_served());
        }

        let mut result = SearchResult { found_route: true, ..SearchResult::default() };

        let Some(class_type) = ClassType::parse(&query.class_type) else {
            debug!("Unknown class '{}'", query.class_type);
            return Ok(result);
        };

        let date = query.departure_date;
        let now = self.clock.now();

        let candidates: Vec<ScheduledFlight> = self
            .resolver
            .resolve(&routes, date)
            .await?
            .into_iter()
            .filter(|flight| flight.seat_class(class_type).is_some())
            .collect();
        result.found_class_type = !candidates.is_empty();

        let upcoming: Vec<&ScheduledFlight> = candidates
            .iter()
            .filter(|flight| {
                let departed = flight.schedule.departure_on(date) <= now;
                if departed {
                    debug!("Skipping {}: already departed", flight.flight.flight_number);
                }
                !departed
            })
            .collect();
        if upcoming.is_empty() {
            return Ok(result);
        }

        let schedule_ids: Vec<Uuid> = upcoming.iter().map(|flight| flight.schedule.id).collect();
        let rows: HashMap<Uuid, SeatInventory> = self
            .inventory
            .inventory_rows(&schedule_ids, date, class_type)
            .await?
            .into_iter()
            .map(|row| (row.key.schedule_id, row))
            .collect();

        for flight in upcoming {
            let Some(seat_class) = flight.seat_class(class_type) else {
                continue;
            };

            // Under first-touch, a row nobody booked yet is simply full capacity.
            let row = match rows.get(&flight.schedule.id) {
                Some(row) => *row,
                None => match self.materialization {
                    Materialization::OnFirstTouch => SeatInventory::fresh(
                        InventoryKey::new(flight.schedule.id, date, class_type),
                        seat_class.total_seats,
                    ),
                    Materialization::Seeded => {
                        debug!("No inventory for {} on {}", flight.flight.flight_number, date);
                        continue;
                    }
                },
            };
            result.found_date = true;

            if (row.available_seats as i64) < query.travellers_count as i64 {
                debug!(
                    "{} has {} seats, {} requested",
                    flight.flight.flight_number, row.available_seats, query.travellers_count
                );
                continue;
            }
            result.seats_available = true;

            let departure = flight.schedule.departure_on(date);
            let Some(quote) = self.pricing.quote(
                seat_class.base_price,
                seat_class.total_seats,
                row.available_seats,
                departure,
                now,
            ) else {
                debug!("Could not price {}", flight.flight.flight_number);
                continue;
            };

            let arrival = flight.schedule.arrival_on(date);
            let day_difference = (arrival.date() - date).num_days();

            result.flights.push(FlightOffer {
                flight_number: flight.flight.flight_number.clone(),
                airline_name: flight.airline.name.clone(),
                source: flight.route.source.clone(),
                destination: flight.route.destination.clone(),
                departure_date: date,
                departure_time: flight.schedule.departure_time,
                arrival_date: arrival.date(),
                arrival_time: arrival.time(),
                arrival_date_difference: (day_difference > 0).then(|| format!("+{}", day_difference)),
                seats: row.available_seats,
                price: quote.final_price,
                base_price: seat_class.base_price,
                travellers_count: query.travellers_count,
                class_type,
            });
        }

        Ok(result)
    }
}
