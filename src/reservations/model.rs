use serde::Serialize;

use super::interval::{Interval, InvalidRange};
use crate::equipment::Equipment;

/// A reservation that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    equipment_id: i64,
    requester: String,
    interval: Interval,
}

impl Reservation {
    pub fn create(
        equipment_id: i64,
        requester: &str,
        interval: Interval,
    ) -> Result<Self, InvalidRange> {
        // Interval is valid by construction; re-checked so the entity never holds an invalid one.
        let interval = Interval::new(interval.start(), interval.end())?;
        Ok(Self {
            equipment_id,
            requester: requester.trim().to_string(),
            interval,
        })
    }

    pub fn equipment_id(&self) -> i64 {
        self.equipment_id
    }

    pub fn requester(&self) -> &str {
        &self.requester
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }
}

/// A reservation after the store has assigned its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedReservation {
    pub id: i64,
    pub reservation: Reservation,
}

/// Listing row: reservation joined with its equipment snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationView {
    pub id: i64,
    pub requester_identity: String,
    #[serde(with = "time::serde::rfc3339")]
    pub start_date: time::OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_date: time::OffsetDateTime,
    pub equipment: Equipment,
}
