pub mod handlers;
mod repo;

use async_trait::async_trait;
use axum::Router;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub use repo::PgEquipmentCatalog;

use crate::reservations::StoreError;
use crate::state::AppState;

/// Bookable item from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Equipment {
    pub id: i64,
    pub name: String,
    pub reference: String,
}

/// Read-only view of the equipment catalog used by the booking core.
#[async_trait]
pub trait EquipmentCatalog: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Equipment>, StoreError>;
    async fn find_all_ordered_by_name(&self) -> Result<Vec<Equipment>, StoreError>;
}

pub fn router() -> Router<AppState> {
    handlers::equipment_routes()
}
