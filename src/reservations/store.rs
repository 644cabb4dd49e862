use async_trait::async_trait;
use thiserror::Error;

use super::interval::Interval;
use super::model::{Reservation, ReservationView, SavedReservation};

#[derive(Debug, Error)]
pub enum StoreError {
    /// Another reservation on the same equipment overlaps the one being saved.
    #[error("reservation overlaps an existing one")]
    Conflict,
    #[error("equipment {0} does not exist")]
    EquipmentMissing(i64),
    #[error("database error: {0}")]
    Backend(#[from] sqlx::Error),
}

/// SQLSTATE raised by the `reservations_no_overlap` exclusion constraint.
pub(crate) const EXCLUSION_VIOLATION: &str = "23P01";
pub(crate) const FOREIGN_KEY_VIOLATION: &str = "23503";

#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// True when any reservation of `equipment_id` intersects `interval`.
    async fn has_overlap(&self, equipment_id: i64, interval: &Interval)
        -> Result<bool, StoreError>;

    /// Persists `reservation` and returns it with its id.
    ///
    /// Implementations re-check overlap atomically with the insert, so two racing saves
    /// for intersecting intervals on one equipment cannot both succeed. The loser gets
    /// [`StoreError::Conflict`].
    async fn save(&self, reservation: Reservation) -> Result<SavedReservation, StoreError>;

    /// Reservations owned by `requester`, ordered by start ascending.
    async fn find_by_requester(&self, requester: &str)
        -> Result<Vec<ReservationView>, StoreError>;

    async fn delete_by_id_and_requester(&self, id: i64, requester: &str)
        -> Result<bool, StoreError>;
}
