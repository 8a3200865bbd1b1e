pub mod booking;
pub mod models;

pub use booking::BookingEngine;
pub use models::{
    BookingOutcome, BookingRequest, LegRequest, NotFoundReason, RoundTripRequest, SeatReservation,
};
