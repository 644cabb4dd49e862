use axum::{extract::State, routing::get, Json, Router};
use tracing::instrument;

use super::Equipment;
use crate::{error::ApiError, state::AppState};

pub fn equipment_routes() -> Router<AppState> {
    Router::new().route("/equipment", get(list_equipment))
}

#[instrument(skip(state))]
pub async fn list_equipment(State(state): State<AppState>) -> Result<Json<Vec<Equipment>>, ApiError> {
    let items = state.equipment.find_all_ordered_by_name().await?;
    Ok(Json(items))
}
