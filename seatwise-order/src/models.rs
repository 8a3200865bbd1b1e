use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use seatwise_core::ClassType;
use seatwise_shared::SeatsBookedEvent;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One leg: a flight number and its local departure date and time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegRequest {
    pub flight_number: String,
    pub departure: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub leg: LegRequest,
    pub class_type: ClassType,
    pub travellers_count: u32,
}

/// Both legs share class and traveller count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundTripRequest {
    pub outbound: LegRequest,
    pub inbound: LegRequest,
    pub class_type: ClassType,
    pub travellers_count: u32,
}

/// Which lookup failed before any seat was touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotFoundReason {
    Flight,
    Schedule,
    SeatClass,
    Inventory,
}

impl fmt::Display for NotFoundReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            NotFoundReason::Flight => "Flight not found",
            NotFoundReason::Schedule => "No schedule departs at the requested time",
            NotFoundReason::SeatClass => "Class type not offered on this flight",
            NotFoundReason::Inventory => "Flight is not open for booking on this date",
        };
        f.write_str(text)
    }
}

/// A committed decrement on one leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatReservation {
    pub flight_number: String,
    pub schedule_id: Uuid,
    pub flight_date: NaiveDate,
    pub class_type: ClassType,
    pub seats_booked: u32,
    pub seats_remaining: i32,
}

impl SeatReservation {
    pub fn to_event(&self, booked_at: i64) -> SeatsBookedEvent {
        SeatsBookedEvent {
            flight_number: self.flight_number.clone(),
            schedule_id: self.schedule_id,
            flight_date: self.flight_date,
            class_type: self.class_type.to_string(),
            seats_booked: self.seats_booked,
            seats_remaining: self.seats_remaining,
            booked_at,
        }
    }
}

/// Result of a booking attempt. Everything except `Confirmed` left the
/// inventory untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingOutcome {
    /// One reservation per leg, in request order.
    Confirmed(Vec<SeatReservation>),
    Insufficient {
        flight_number: String,
        requested: u32,
        available: i32,
    },
    NotFound {
        flight_number: String,
        reason: NotFoundReason,
    },
    Rejected(String),
    StorageFailure(String),
}

impl BookingOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, BookingOutcome::Confirmed(_))
    }

    /// Business failures as opposed to infrastructure ones.
    pub fn is_business_failure(&self) -> bool {
        matches!(
            self,
            BookingOutcome::Insufficient { .. } | BookingOutcome::NotFound { .. } | BookingOutcome::Rejected(_)
        )
    }

    pub fn reservations(&self) -> &[SeatReservation] {
        match self {
            BookingOutcome::Confirmed(reservations) => reservations,
            _ => &[],
        }
    }
}

impl fmt::Display for BookingOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingOutcome::Confirmed(_) => f.write_str("Booking confirmed"),
            BookingOutcome::Insufficient { flight_number, requested, available } => write!(
                f,
                "Not enough seats on {}: {} requested, {} available",
                flight_number, requested, available
            ),
            BookingOutcome::NotFound { flight_number, reason } => write!(f, "{}: {}", reason, flight_number),
            BookingOutcome::Rejected(reason) => f.write_str(reason),
            BookingOutcome::StorageFailure(_) => f.write_str("Booking could not be completed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_classification() {
        let confirmed = BookingOutcome::Confirmed(vec![]);
        assert!(confirmed.is_confirmed());
        assert!(!confirmed.is_business_failure());

        let short = BookingOutcome::Insufficient { flight_number: "AI-101".into(), requested: 3, available: 1 };
        assert!(!short.is_confirmed());
        assert!(short.is_business_failure());
        assert!(short.reservations().is_empty());

        let failure = BookingOutcome::StorageFailure("pool timed out".into());
        assert!(!failure.is_business_failure());
        // Internal detail stays out of the user-facing message
        assert_eq!(failure.to_string(), "Booking could not be completed");
    }

    #[test]
    fn test_reservation_event() {
        let reservation = SeatReservation {
            flight_number: "AI-101".into(),
            schedule_id: Uuid::nil(),
            flight_date: NaiveDate::from_ymd_opt(2025, 7, 15).unwrap(),
            class_type: ClassType::SecondClass,
            seats_booked: 2,
            seats_remaining: 18,
        };
        let event = reservation.to_event(1_752_537_600);
        assert_eq!(event.class_type, "Second Class");
        assert_eq!(event.seats_remaining, 18);
    }
}
