use serde::{Deserialize, Serialize};

/// Body of `POST /reservations`. Fields are optional so a missing one is a 400, not a 422.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationRequest {
    pub equipment_id: Option<i64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateReservationResponse {
    pub id: i64,
    pub message: String,
}
