use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use seatwise_core::SearchQuery;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::error::AppError;
use crate::params;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/v1/flights/search", get(search_flights))
}

/// Raw query string; everything is validated by hand so the messages match
/// what clients already expect.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub source: Option<String>,
    pub destination: Option<String>,
    pub departure_date: Option<String>,
    pub travellers_count: Option<String>,
    pub class_type: Option<String>,
}

async fn search_flights(
    State(state): State<AppState>,
    Query(raw): Query<SearchParams>,
) -> Result<Json<Value>, AppError> {
    let source = raw.source.as_deref().map(str::trim).unwrap_or_default();
    let destination = raw.destination.as_deref().map(str::trim).unwrap_or_default();
    let class_type = params::class_or_default(raw.class_type.as_deref());
    let travellers_count = params::travellers_from_query(raw.travellers_count.as_deref());

    if source.is_empty() || destination.is_empty() {
        return Err(AppError::ValidationError("Source and destination are required".into()));
    }
    if source.to_lowercase() == destination.to_lowercase() {
        return Err(AppError::ValidationError("Source and destination cannot be the same".into()));
    }
    if !params::travellers_in_range(travellers_count) {
        return Err(AppError::UnprocessableEntity("Travellers count must be between 1 to 9".into()));
    }
    let departure_date = if params::is_blank(raw.departure_date.as_deref()) {
        state.clock.today()
    } else {
        raw.departure_date
            .as_deref()
            .and_then(params::parse_date)
            .ok_or_else(|| AppError::ValidationError("Invalid departure date format".into()))?
    };

    let query = SearchQuery {
        source: source.to_string(),
        destination: destination.to_string(),
        departure_date,
        travellers_count: travellers_count as u32,
        class_type: class_type.to_string(),
    };

    let result = state.search.search(&query).await.map_err(|e| {
        warn!("Search {} -> {} failed: {}", query.source, query.destination, e);
        AppError::InternalServerError("Something went wrong while searching flights. Please try again.".into())
    })?;

    let class_name = class_type.as_str().to_lowercase();
    if !result.found_route {
        return Err(AppError::NotFoundError(
            "Flights are not operating between given source and destination".into(),
        ));
    }
    if !result.found_class_type {
        return Err(AppError::ConflictError(format!(
            "Flights with {} are not available between the selected source and destination on selected date",
            class_name
        )));
    }
    if !result.found_date {
        return Err(AppError::ConflictError("No flights available on the selected date".into()));
    }
    if !result.seats_available {
        return Err(AppError::ConflictError(format!(
            "No seats available for {} class on selected date",
            class_name
        )));
    }

    info!(
        "Search {} -> {} on {}: {} flights",
        query.source,
        query.destination,
        departure_date,
        result.flights.len()
    );
    Ok(Json(json!({ "flights": result.flights })))
}
