use axum::{body::Bytes, extract::State, routing::post, Json, Router};
use seatwise_order::{BookingOutcome, BookingRequest, LegRequest, RoundTripRequest};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::error::AppError;
use crate::params;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/flights/book", post(confirm_booking))
        .route("/api/v1/flights/book/round-trip", post(confirm_round_trip_booking))
}

/// The object under `key`, or `None` when the body is not JSON or the key
/// is missing, null or empty.
fn envelope(body: &[u8], key: &str) -> Option<Value> {
    let parsed: Value = serde_json::from_slice(body).ok()?;
    match parsed.get(key) {
        Some(Value::Object(fields)) if !fields.is_empty() => Some(Value::Object(fields.clone())),
        _ => None,
    }
}

fn trimmed<'a>(object: &'a Value, field: &str) -> Option<&'a str> {
    params::json_str(object, field).map(str::trim).filter(|v| !v.is_empty())
}

fn publish(state: &AppState, outcome: &BookingOutcome) {
    let booked_at = chrono::Utc::now().timestamp();
    for reservation in outcome.reservations() {
        state.events.publish(reservation.to_event(booked_at));
    }
}

async fn confirm_booking(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>, AppError> {
    let Some(flight) = envelope(&body, "flight") else {
        return Err(AppError::ValidationError("Flight data is required".into()));
    };

    let flight_number = trimmed(&flight, "flight_number");
    let departure_date = trimmed(&flight, "departure_date");
    let class_type = params::class_or_default(params::json_str(&flight, "class_type"));
    let travellers_count = params::travellers_count(flight.get("travellers_count"));

    let (Some(flight_number), Some(departure_date)) = (flight_number, departure_date) else {
        return Err(AppError::UnprocessableEntity("Flight data is required".into()));
    };
    if !params::travellers_in_range(travellers_count) {
        return Err(AppError::UnprocessableEntity("Travelers count should be between 1 and 9".into()));
    }
    let Some(departure) = params::parse_datetime(departure_date) else {
        return Err(AppError::ValidationError("Invalid departure date format".into()));
    };

    let request = BookingRequest {
        leg: LegRequest { flight_number: flight_number.to_string(), departure },
        class_type,
        travellers_count: travellers_count as u32,
    };

    let outcome = state.booking.book_seats(&request).await;
    match outcome {
        BookingOutcome::Confirmed(ref reservations) => {
            publish(&state, &outcome);
            Ok(Json(json!({ "message": "Booking confirmed", "reservations": reservations })))
        }
        BookingOutcome::StorageFailure(_) => {
            Err(AppError::InternalServerError("Failed to book. Please try again later".into()))
        }
        other => {
            info!("Booking {} not confirmed: {}", request.leg.flight_number, other);
            Err(AppError::ConflictError(
                "Booking failed. Please try again or select a different flight".into(),
            ))
        }
    }
}

async fn confirm_round_trip_booking(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>, AppError> {
    let Some(data) = envelope(&body, "data") else {
        return Err(AppError::ValidationError("Flight data is required".into()));
    };

    let departure_flight_number = trimmed(&data, "departure_flight_number");
    let departure_date = trimmed(&data, "departure_date");
    let return_flight_number = trimmed(&data, "return_flight_number");
    let return_date = trimmed(&data, "return_date");
    let class_type = params::class_or_default(params::json_str(&data, "class_type"));
    let travellers_count = params::travellers_count(data.get("travellers_count"));

    let (Some(departure_flight_number), Some(departure_date), Some(return_flight_number), Some(return_date)) =
        (departure_flight_number, departure_date, return_flight_number, return_date)
    else {
        return Err(AppError::UnprocessableEntity("All fields are required".into()));
    };
    if !params::travellers_in_range(travellers_count) {
        return Err(AppError::UnprocessableEntity("Travelers count should be between 1 and 9".into()));
    }
    let (Some(departure), Some(inbound_departure)) =
        (params::parse_datetime(departure_date), params::parse_datetime(return_date))
    else {
        return Err(AppError::ValidationError(
            "Invalid date format for departure or return date".into(),
        ));
    };

    let request = RoundTripRequest {
        outbound: LegRequest { flight_number: departure_flight_number.to_string(), departure },
        inbound: LegRequest { flight_number: return_flight_number.to_string(), departure: inbound_departure },
        class_type,
        travellers_count: travellers_count as u32,
    };

    let outcome = state.booking.book_round_trip(&request).await;
    match outcome {
        BookingOutcome::Confirmed(ref reservations) => {
            publish(&state, &outcome);
            Ok(Json(json!({ "message": "Round-trip booking confirmed", "reservations": reservations })))
        }
        BookingOutcome::StorageFailure(ref reason) => {
            warn!("Round trip {} / {} hit storage failure: {}", departure_flight_number, return_flight_number, reason);
            Err(AppError::InternalServerError(
                "Failed to book round-trip. Please try again later".into(),
            ))
        }
        other => {
            info!("Round trip {} / {} not confirmed: {}", departure_flight_number, return_flight_number, other);
            Err(AppError::ConflictError("Booking failed. Try again or choose different flights.".into()))
        }
    }
}
