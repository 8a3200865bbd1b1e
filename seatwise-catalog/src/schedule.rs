use std::sync::Arc;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use seatwise_core::{
    FlightSchedule, Recurrence, Route, ScheduleRepository, ScheduledFlight, StoreResult,
};
use uuid::Uuid;

/// Whether a schedule has a departure on `date`. Time of day is ignored.
pub fn operates_on(schedule: &FlightSchedule, date: NaiveDate) -> bool {
    match schedule.recurrence {
        Recurrence::OneTime => schedule.start_date == date,
        Recurrence::Weekly(days) => {
            schedule.start_date <= date
                && schedule.end_date.map_or(true, |end| date <= end)
                && days.contains(date.weekday())
        }
    }
}

/// The schedule departing at exactly `departure` (to the second), if any.
pub fn departing_at(schedules: &[FlightSchedule], departure: NaiveDateTime) -> Option<&FlightSchedule> {
    let wanted = departure.time().num_seconds_from_midnight();
    schedules.iter().find(|schedule| {
        schedule.departure_time.num_seconds_from_midnight() == wanted
            && operates_on(schedule, departure.date())
    })
}

/// Finds the schedules flying a set of routes on a calendar date.
#[derive(Clone)]
pub struct ScheduleResolver {
    schedules: Arc<dyn ScheduleRepository>,
}

impl ScheduleResolver {
    pub fn new(schedules: Arc<dyn ScheduleRepository>) -> Self {
        Self { schedules }
    }

    /// Active schedules on `date`, ordered by departure time then flight
    /// number. Unknown routes or idle dates give an empty list.
    pub async fn resolve(&self, routes: &[Route], date: NaiveDate) -> StoreResult<Vec<ScheduledFlight>> {
        if routes.is_empty() {
            return Ok(Vec::new());
        }

        let route_ids: Vec<Uuid> = routes.iter().map(|route| route.id).collect();
        let mut flights: Vec<ScheduledFlight> = self
            .schedules
            .scheduled_flights(&route_ids)
            .await?
            .into_iter()
            .filter(|flight| operates_on(&flight.schedule, date))
            .collect();

        flights.sort_by(|a, b| {
            a.schedule
                .departure_time
                .cmp(&b.schedule.departure_time)
                .then_with(|| a.flight.flight_number.cmp(&b.flight.flight_number))
        });

        Ok(flights)
    }
}
