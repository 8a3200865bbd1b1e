use std::sync::Arc;

use seatwise_catalog::schedule::departing_at;
use seatwise_core::{
    ClassType, InventoryKey, InventoryRepository, Materialization, ReservationOutcome,
    ScheduleRepository, SeatRequest, StoreResult,
};
use tracing::{debug, info, warn};

use crate::models::{
    BookingOutcome, BookingRequest, LegRequest, NotFoundReason, RoundTripRequest, SeatReservation,
};

/// A leg that resolved all the way down to its inventory key.
struct ResolvedLeg {
    flight_number: String,
    request: SeatRequest,
}

/// Seat decrements for single and round-trip bookings.
///
/// Every attempt resolves flight, schedule and seat class first, then hands
/// all legs to a single `reserve` call so the store commits them together.
pub struct BookingEngine {
    schedules: Arc<dyn ScheduleRepository>,
    inventory: Arc<dyn InventoryRepository>,
    materialization: Materialization,
}

impl BookingEngine {
    pub fn new(
        schedules: Arc<dyn ScheduleRepository>,
        inventory: Arc<dyn InventoryRepository>,
        materialization: Materialization,
    ) -> Self {
        Self { schedules, inventory, materialization }
    }

    pub async fn book_seats(&self, request: &BookingRequest) -> BookingOutcome {
        self.book(&[&request.leg], request.class_type, request.travellers_count).await
    }

    /// Books both legs or neither.
    pub async fn book_round_trip(&self, request: &RoundTripRequest) -> BookingOutcome {
        self.book(
            &[&request.outbound, &request.inbound],
            request.class_type,
            request.travellers_count,
        )
        .await
    }

    async fn book(&self, legs: &[&LegRequest], class_type: ClassType, travellers_count: u32) -> BookingOutcome {
        if travellers_count == 0 {
            return BookingOutcome::Rejected("Travellers count must be at least 1".to_string());
        }

        let mut resolved = Vec::with_capacity(legs.len());
        for leg in legs {
            match self.resolve_leg(leg, class_type, travellers_count).await {
                Ok(Ok(leg)) => resolved.push(leg),
                Ok(Err(reason)) => {
                    debug!("Booking {} failed: {}", leg.flight_number, reason);
                    return BookingOutcome::NotFound { flight_number: leg.flight_number.clone(), reason };
                }
                Err(e) => {
                    warn!("Storage failure resolving {}: {}", leg.flight_number, e);
                    return BookingOutcome::StorageFailure(e.to_string());
                }
            }
        }

        let requests: Vec<SeatRequest> = resolved.iter().map(|leg| leg.request).collect();
        let outcome = match self.inventory.reserve(&requests).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Storage failure reserving seats: {}", e);
                return BookingOutcome::StorageFailure(e.to_string());
            }
        };

        match outcome {
            ReservationOutcome::Committed(rows) => {
                let reservations: Vec<SeatReservation> = resolved
                    .iter()
                    .map(|leg| {
                        let key = leg.request.key;
                        let seats_remaining = rows
                            .iter()
                            .find(|row| row.key == key)
                            .map(|row| row.available_seats)
                            .unwrap_or_default();
                        SeatReservation {
                            flight_number: leg.flight_number.clone(),
                            schedule_id: key.schedule_id,
                            flight_date: key.flight_date,
                            class_type: key.class_type,
                            seats_booked: leg.request.seats,
                            seats_remaining,
                        }
                    })
                    .collect();

                for reservation in &reservations {
                    info!(
                        "Booked {} x {} on {} {} ({} left)",
                        reservation.seats_booked,
                        reservation.class_type,
                        reservation.flight_number,
                        reservation.flight_date,
                        reservation.seats_remaining
                    );
                }
                BookingOutcome::Confirmed(reservations)
            }
            ReservationOutcome::Insufficient { key, requested, available } => BookingOutcome::Insufficient {
                flight_number: flight_number_for(&resolved, &key),
                requested,
                available,
            },
            ReservationOutcome::MissingRow(key) => BookingOutcome::NotFound {
                flight_number: flight_number_for(&resolved, &key),
                reason: NotFoundReason::Inventory,
            },
        }
    }

    /// Flight -> schedule -> seat class. The inner `Err` is a business miss,
    /// the outer one a storage failure.
    async fn resolve_leg(
        &self,
        leg: &LegRequest,
        class_type: ClassType,
        travellers_count: u32,
    ) -> StoreResult<Result<ResolvedLeg, NotFoundReason>> {
        let Some(flight) = self.schedules.find_flight(leg.flight_number.trim()).await? else {
            return Ok(Err(NotFoundReason::Flight));
        };

        let schedules = self.schedules.schedules_for_flight(flight.id).await?;
        let Some(schedule) = departing_at(&schedules, leg.departure) else {
            return Ok(Err(NotFoundReason::Schedule));
        };

        let seat_classes = self.schedules.seat_classes(schedule.id).await?;
        let Some(seat_class) = seat_classes.iter().find(|seat| seat.class_type == class_type) else {
            return Ok(Err(NotFoundReason::SeatClass));
        };

        Ok(Ok(ResolvedLeg {
            flight_number: flight.flight_number,
            request: SeatRequest {
                key: InventoryKey::new(schedule.id, leg.departure.date(), class_type),
                seats: travellers_count,
                seed_capacity: self.materialization.seed_capacity(seat_class.total_seats),
            },
        }))
    }
}

fn flight_number_for(legs: &[ResolvedLeg], key: &InventoryKey) -> String {
    legs.iter()
        .find(|leg| leg.request.key == *key)
        .map(|leg| leg.flight_number.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
    use seatwise_catalog::{CatalogRegistry, InMemoryStore, NewSchedule};
    use seatwise_core::{OperatingDays, Recurrence, SeatInventory, StoreError};
    use uuid::Uuid;

    fn outbound_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 15).unwrap()
    }

    fn return_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 20).unwrap()
    }

    fn at(date: NaiveDate, hour: u32, minute: u32) -> NaiveDateTime {
        date.and_hms_opt(hour, minute, 0).unwrap()
    }

    struct Fixture {
        store: Arc<InMemoryStore>,
        outbound: Uuid,
        inbound: Uuid,
    }

    /// AI-101 Delhi -> Mumbai at 10:00 and AI-102 back at 18:00, daily,
    /// 10 economy seats each.
    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let registry = CatalogRegistry::over(store.clone());
        let airline = registry.register_airline("Air India").await.unwrap();

        let mut ids = Vec::new();
        for (number, source, destination, hour) in
            [("AI-101", "Delhi", "Mumbai", 10), ("AI-102", "Mumbai", "Delhi", 18)]
        {
            let route = registry.register_route(airline.id, source, destination).await.unwrap();
            let flight = registry.register_flight(route.id, number).await.unwrap();
            let schedule = registry
                .register_schedule(NewSchedule {
                    flight_id: flight.id,
                    departure_time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
                    arrival_time: NaiveTime::from_hms_opt(hour + 2, 0, 0).unwrap(),
                    start_date: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
                    end_date: None,
                    recurrence: Recurrence::Weekly(OperatingDays::EVERY_DAY),
                })
                .await
                .unwrap();
            registry
                .register_seat_class(schedule.id, ClassType::Economy, 10, 4_000)
                .await
                .unwrap();
            ids.push(schedule.id);
        }

        Fixture { store, outbound: ids[0], inbound: ids[1] }
    }

    fn engine(store: &Arc<InMemoryStore>, materialization: Materialization) -> BookingEngine {
        BookingEngine::new(store.clone(), store.clone(), materialization)
    }

    fn single(flight_number: &str, departure: NaiveDateTime, travellers: u32) -> BookingRequest {
        BookingRequest {
            leg: LegRequest { flight_number: flight_number.into(), departure },
            class_type: ClassType::Economy,
            travellers_count: travellers,
        }
    }

    fn round_trip(travellers: u32) -> RoundTripRequest {
        RoundTripRequest {
            outbound: LegRequest { flight_number: "AI-101".into(), departure: at(outbound_date(), 10, 0) },
            inbound: LegRequest { flight_number: "AI-102".into(), departure: at(return_date(), 18, 0) },
            class_type: ClassType::Economy,
            travellers_count: travellers,
        }
    }

    async fn available(store: &InMemoryStore, schedule_id: Uuid, date: NaiveDate) -> Option<i32> {
        store
            .inventory_row(&InventoryKey::new(schedule_id, date, ClassType::Economy))
            .await
            .unwrap()
            .map(|row| row.available_seats)
    }

    #[tokio::test]
    async fn test_exact_seat_count_then_sold_out() {
        let fixture = fixture().await;
        let engine = engine(&fixture.store, Materialization::OnFirstTouch);
        let departure = at(outbound_date(), 10, 0);

        let outcome = engine.book_seats(&single("AI-101", departure, 10)).await;
        assert!(outcome.is_confirmed());
        assert_eq!(outcome.reservations()[0].seats_remaining, 0);
        assert_eq!(available(&fixture.store, fixture.outbound, outbound_date()).await, Some(0));

        let outcome = engine.book_seats(&single("AI-101", departure, 1)).await;
        assert_eq!(
            outcome,
            BookingOutcome::Insufficient { flight_number: "AI-101".into(), requested: 1, available: 0 }
        );
    }

    #[tokio::test]
    async fn test_round_trip_failure_rolls_back_outbound() {
        let fixture = fixture().await;
        let registry = CatalogRegistry::over(fixture.store.clone());
        registry
            .seed_row(InventoryKey::new(fixture.inbound, return_date(), ClassType::Economy), 0)
            .await
            .unwrap();
        let engine = engine(&fixture.store, Materialization::OnFirstTouch);

        let outcome = engine.book_round_trip(&round_trip(2)).await;
        assert!(!outcome.is_confirmed());
        assert!(matches!(outcome, BookingOutcome::Insufficient { ref flight_number, .. } if flight_number == "AI-102"));

        // First touch may have materialized the outbound row, but never decremented it
        let outbound = available(&fixture.store, fixture.outbound, outbound_date()).await;
        assert!(outbound.is_none() || outbound == Some(10));
    }

    #[tokio::test]
    async fn test_round_trip_confirms_both_legs() {
        let fixture = fixture().await;
        let engine = engine(&fixture.store, Materialization::OnFirstTouch);

        let outcome = engine.book_round_trip(&round_trip(3)).await;
        let reservations = outcome.reservations();
        assert_eq!(reservations.len(), 2);
        assert_eq!(reservations[0].flight_number, "AI-101");
        assert_eq!(reservations[1].flight_number, "AI-102");
        assert_eq!(available(&fixture.store, fixture.outbound, outbound_date()).await, Some(7));
        assert_eq!(available(&fixture.store, fixture.inbound, return_date()).await, Some(7));
    }

    #[tokio::test]
    async fn test_lookup_failures() {
        let fixture = fixture().await;
        let engine = engine(&fixture.store, Materialization::OnFirstTouch);

        let outcome = engine.book_seats(&single("XX-999", at(outbound_date(), 10, 0), 1)).await;
        assert!(matches!(outcome, BookingOutcome::NotFound { reason: NotFoundReason::Flight, .. }));

        // Off by one minute
        let outcome = engine.book_seats(&single("AI-101", at(outbound_date(), 10, 1), 1)).await;
        assert!(matches!(outcome, BookingOutcome::NotFound { reason: NotFoundReason::Schedule, .. }));

        let mut first_class = single("AI-101", at(outbound_date(), 10, 0), 1);
        first_class.class_type = ClassType::FirstClass;
        let outcome = engine.book_seats(&first_class).await;
        assert!(matches!(outcome, BookingOutcome::NotFound { reason: NotFoundReason::SeatClass, .. }));

        assert_eq!(fixture.store.row_count().await, 0);
    }

    #[tokio::test]
    async fn test_seeded_mode_needs_a_row() {
        let fixture = fixture().await;
        let engine = engine(&fixture.store, Materialization::Seeded);
        let departure = at(outbound_date(), 10, 0);

        let outcome = engine.book_seats(&single("AI-101", departure, 1)).await;
        assert!(matches!(outcome, BookingOutcome::NotFound { reason: NotFoundReason::Inventory, .. }));

        let registry = CatalogRegistry::over(fixture.store.clone());
        registry.seed_inventory(fixture.outbound, outbound_date(), outbound_date()).await.unwrap();
        assert!(engine.book_seats(&single("AI-101", departure, 1)).await.is_confirmed());
    }

    #[tokio::test]
    async fn test_zero_travellers_is_rejected() {
        let fixture = fixture().await;
        let engine = engine(&fixture.store, Materialization::OnFirstTouch);

        let outcome = engine.book_seats(&single("AI-101", at(outbound_date(), 10, 0), 0)).await;
        assert!(matches!(outcome, BookingOutcome::Rejected(_)));
        assert_eq!(fixture.store.row_count().await, 0);
    }

    #[tokio::test]
    async fn test_same_leg_twice_with_huge_count_is_insufficient() {
        let fixture = fixture().await;
        let engine = engine(&fixture.store, Materialization::OnFirstTouch);
        let leg = LegRequest { flight_number: "AI-101".into(), departure: at(outbound_date(), 10, 0) };

        let outcome = engine
            .book_round_trip(&RoundTripRequest {
                outbound: leg.clone(),
                inbound: leg,
                class_type: ClassType::Economy,
                travellers_count: u32::MAX / 2 + 1,
            })
            .await;

        assert_eq!(
            outcome,
            BookingOutcome::Insufficient { flight_number: "AI-101".into(), requested: u32::MAX, available: 10 }
        );
        assert_eq!(available(&fixture.store, fixture.outbound, outbound_date()).await, Some(10));
    }

    struct UnavailableInventory;

    #[async_trait]
    impl InventoryRepository for UnavailableInventory {
        async fn inventory_rows(&self, _: &[Uuid], _: NaiveDate, _: ClassType) -> StoreResult<Vec<SeatInventory>> {
            Err(StoreError::Unavailable("connection refused".into()))
        }

        async fn inventory_row(&self, _: &InventoryKey) -> StoreResult<Option<SeatInventory>> {
            Err(StoreError::Unavailable("connection refused".into()))
        }

        async fn reserve(&self, _: &[SeatRequest]) -> StoreResult<ReservationOutcome> {
            Err(StoreError::LockTimeout)
        }

        async fn seed_inventory(&self, _: &[SeatInventory]) -> StoreResult<usize> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn test_storage_failure_is_its_own_outcome() {
        let fixture = fixture().await;
        let engine = BookingEngine::new(
            fixture.store.clone(),
            Arc::new(UnavailableInventory),
            Materialization::OnFirstTouch,
        );

        let outcome = engine.book_seats(&single("AI-101", at(outbound_date(), 10, 0), 1)).await;
        assert!(matches!(outcome, BookingOutcome::StorageFailure(_)));
        assert!(!outcome.is_business_failure());
    }
}
