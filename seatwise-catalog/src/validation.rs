use chrono::{NaiveDate, Timelike};
use seatwise_core::{FlightSchedule, Recurrence, Route, SeatClassConfig, StoreError};
use uuid::Uuid;

const SECONDS_PER_DAY: i64 = 86_400;

/// Catalog-level failures raised while registering configuration.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Invalid {0}")]
    Invalid(String),

    #[error("Flight schedule overlaps with existing schedule {0} for this flight")]
    Overlap(Uuid),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub fn validate_route(route: &Route) -> Result<(), CatalogError> {
    if route.source.trim().is_empty() || route.destination.trim().is_empty() {
        return Err(CatalogError::Invalid("route: source and destination are required".into()));
    }
    Ok(())
}

/// Checks a new schedule on its own and against the flight's existing ones.
pub fn validate_schedule(candidate: &FlightSchedule, existing: &[FlightSchedule]) -> Result<(), CatalogError> {
    if candidate.departure_time == candidate.arrival_time {
        return Err(CatalogError::Invalid("schedule: arrival must differ from departure".into()));
    }
    if let Some(end) = candidate.end_date {
        if end < candidate.start_date {
            return Err(CatalogError::Invalid("schedule: end date is before start date".into()));
        }
    }
    if let Recurrence::Weekly(days) = candidate.recurrence {
        if days.is_empty() {
            return Err(CatalogError::Invalid("schedule: recurring schedule needs at least one week-day".into()));
        }
    }

    for other in existing.iter().filter(|other| other.id != candidate.id) {
        if windows_overlap(candidate, other) && spans_overlap(candidate, other) {
            return Err(CatalogError::Overlap(other.id));
        }
    }

    Ok(())
}

/// Overlap check a store repeats while it holds the flight's write lock, so
/// two concurrent registrations cannot both pass against the same snapshot.
pub fn check_schedule_insert(candidate: &FlightSchedule, siblings: &[FlightSchedule]) -> Result<(), StoreError> {
    validate_schedule(candidate, siblings).map_err(|err| StoreError::Conflict(err.to_string()))
}

pub fn validate_seat_class(candidate: &SeatClassConfig, existing: &[SeatClassConfig]) -> Result<(), CatalogError> {
    if candidate.total_seats <= 0 {
        return Err(CatalogError::Invalid("seat class: total seats must be positive".into()));
    }
    if candidate.base_price < 0 {
        return Err(CatalogError::Invalid("seat class: base price cannot be negative".into()));
    }
    if existing.iter().any(|seat| seat.class_type == candidate.class_type && seat.id != candidate.id) {
        return Err(CatalogError::Invalid(format!(
            "seat class: {} already configured for this schedule",
            candidate.class_type
        )));
    }
    Ok(())
}

fn windows_overlap(a: &FlightSchedule, b: &FlightSchedule) -> bool {
    let a_end = a.last_date().unwrap_or(NaiveDate::MAX);
    let b_end = b.last_date().unwrap_or(NaiveDate::MAX);
    a.start_date <= b_end && b.start_date <= a_end
}

/// `[departure, arrival)` in seconds from the departure day's midnight.
fn span(schedule: &FlightSchedule) -> (i64, i64) {
    let departure = schedule.departure_time.num_seconds_from_midnight() as i64;
    let arrival = schedule.arrival_time.num_seconds_from_midnight() as i64
        + schedule.arrival_day_offset() * SECONDS_PER_DAY;
    (departure, arrival)
}

fn spans_overlap(a: &FlightSchedule, b: &FlightSchedule) -> bool {
    let (a_dep, a_arr) = span(a);
    let (b_dep, b_arr) = span(b);

    let same_day = a.operating_days().intersects(b.operating_days()) && a_dep < b_arr && b_dep < a_arr;

    // An overnight leg still occupies the aircraft after midnight.
    let a_spills = a.is_overnight()
        && a.operating_days().next_day().intersects(b.operating_days())
        && b_dep < a_arr - SECONDS_PER_DAY;
    let b_spills = b.is_overnight()
        && b.operating_days().next_day().intersects(a.operating_days())
        && a_dep < b_arr - SECONDS_PER_DAY;

    same_day || a_spills || b_spills
}
