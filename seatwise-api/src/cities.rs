use axum::{extract::State, routing::get, Json, Router};
use tracing::warn;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/v1/cities", get(list_cities))
}

async fn list_cities(State(state): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    let cities = state.schedules.list_cities().await.map_err(|e| {
        warn!("Listing cities failed: {}", e);
        AppError::InternalServerError("Failed to load cities".into())
    })?;
    Ok(Json(cities))
}
