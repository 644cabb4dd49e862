use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument, warn};

use super::interval::{parse_timestamp, Interval, InvalidRange};
use super::model::{Reservation, ReservationView};
use super::store::{ReservationStore, StoreError};
use crate::equipment::EquipmentCatalog;
use crate::error::ApiError;

pub const CREATED_MESSAGE: &str = "Reservation created successfully.";

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("{0}")]
    InvalidInput(String),
    #[error(transparent)]
    InvalidRange(#[from] InvalidRange),
    #[error("Equipment not found.")]
    NotFound,
    #[error("Equipment is already reserved for this period.")]
    Conflict,
    #[error("reservation storage failed: {0}")]
    Store(#[source] StoreError),
}

impl From<StoreError> for BookingError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict => BookingError::Conflict,
            StoreError::EquipmentMissing(_) => BookingError::NotFound,
            other => BookingError::Store(other),
        }
    }
}

impl From<BookingError> for ApiError {
    fn from(e: BookingError) -> Self {
        match e {
            // Unknown equipment is a client input problem, not a missing route.
            BookingError::InvalidInput(_) | BookingError::InvalidRange(_) | BookingError::NotFound => {
                ApiError::BadRequest(e.to_string())
            }
            BookingError::Conflict => ApiError::Conflict(e.to_string()),
            BookingError::Store(inner) => ApiError::from(inner),
        }
    }
}

/// Booking request. `requester` comes from the authenticated token, never from the body.
#[derive(Debug, Clone)]
pub struct CreateReservation {
    pub equipment_id: i64,
    pub requester: String,
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedReservation {
    pub id: i64,
    pub message: String,
}

#[derive(Clone)]
pub struct BookingService {
    catalog: Arc<dyn EquipmentCatalog>,
    store: Arc<dyn ReservationStore>,
}

impl BookingService {
    pub fn new(catalog: Arc<dyn EquipmentCatalog>, store: Arc<dyn ReservationStore>) -> Self {
        Self { catalog, store }
    }

    #[instrument(skip(self, input), fields(equipment_id = input.equipment_id))]
    pub async fn create(&self, input: CreateReservation) -> Result<CreatedReservation, BookingError> {
        let equipment = self
            .catalog
            .find_by_id(input.equipment_id)
            .await?
            .ok_or(BookingError::NotFound)?;

        let start = parse_date(&input.start_date)?;
        let end = parse_date(&input.end_date)?;
        // Range is validated before any conflict query.
        let interval = Interval::new(start, end)?;

        if self.store.has_overlap(equipment.id, &interval).await? {
            warn!(equipment_id = equipment.id, "booking rejected: overlap");
            return Err(BookingError::Conflict);
        }

        let reservation = Reservation::create(equipment.id, &input.requester, interval)?;
        let saved = self.store.save(reservation).await.map_err(|e| {
            if matches!(e, StoreError::Conflict) {
                warn!(equipment_id = equipment.id, "booking lost race at commit");
            }
            BookingError::from(e)
        })?;

        info!(reservation_id = saved.id, equipment_id = equipment.id, "reservation created");
        Ok(CreatedReservation {
            id: saved.id,
            message: CREATED_MESSAGE.to_string(),
        })
    }

    #[instrument(skip(self))]
    pub async fn list(&self, requester: &str) -> Result<Vec<ReservationView>, BookingError> {
        Ok(self.store.find_by_requester(requester.trim()).await?)
    }

    /// Returns `false` when no reservation with that id belongs to `requester`.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64, requester: &str) -> Result<bool, BookingError> {
        let removed = self
            .store
            .delete_by_id_and_requester(id, requester.trim())
            .await?;
        if removed {
            info!(reservation_id = id, "reservation deleted");
        }
        Ok(removed)
    }
}

fn parse_date(value: &str) -> Result<time::OffsetDateTime, BookingError> {
    parse_timestamp(value)
        .ok_or_else(|| BookingError::InvalidInput(format!("Invalid date format: {}", value)))
}
