mod dto;
pub mod handlers;
pub mod interval;
#[cfg(test)]
pub(crate) mod memory;
pub mod model;
mod repo;
pub mod services;
mod store;

use crate::state::AppState;
use axum::Router;

pub use repo::PgReservationStore;
pub use services::BookingService;
pub use store::{ReservationStore, StoreError};

pub fn router() -> Router<AppState> {
    handlers::reservation_routes()
}
