//! In-process catalog and reservation store for tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::interval::Interval;
use super::model::{Reservation, ReservationView, SavedReservation};
use super::store::{ReservationStore, StoreError};
use crate::equipment::{Equipment, EquipmentCatalog};

#[derive(Default)]
struct Inner {
    next_id: i64,
    rows: BTreeMap<i64, Reservation>,
}

#[derive(Default)]
pub struct MemoryStore {
    equipment: Vec<Equipment>,
    inner: Mutex<Inner>,
    overlap_queries: AtomicUsize,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn with_equipment(equipment: Vec<Equipment>) -> Self {
        Self {
            equipment,
            ..Default::default()
        }
    }

    pub fn overlap_queries(&self) -> usize {
        self.overlap_queries.load(Ordering::SeqCst)
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.rows.len()
    }

    fn conflicts(inner: &Inner, equipment_id: i64, interval: &Interval) -> bool {
        inner
            .rows
            .values()
            .filter(|r| r.equipment_id() == equipment_id)
            .any(|r| r.interval().overlaps(interval))
    }
}

#[async_trait]
impl EquipmentCatalog for MemoryStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Equipment>, StoreError> {
        Ok(self.equipment.iter().find(|e| e.id == id).cloned())
    }

    async fn find_all_ordered_by_name(&self) -> Result<Vec<Equipment>, StoreError> {
        let mut all = self.equipment.clone();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }
}

#[async_trait]
impl ReservationStore for MemoryStore {
    async fn has_overlap(
        &self,
        equipment_id: i64,
        interval: &Interval,
    ) -> Result<bool, StoreError> {
        self.overlap_queries.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.lock().await;
        Ok(Self::conflicts(&inner, equipment_id, interval))
    }

    async fn save(&self, reservation: Reservation) -> Result<SavedReservation, StoreError> {
        if !self.equipment.iter().any(|e| e.id == reservation.equipment_id()) {
            return Err(StoreError::EquipmentMissing(reservation.equipment_id()));
        }
        let mut inner = self.inner.lock().await;
        if Self::conflicts(&inner, reservation.equipment_id(), &reservation.interval()) {
            return Err(StoreError::Conflict);
        }
        inner.next_id += 1;
        let id = inner.next_id;
        inner.rows.insert(id, reservation.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(SavedReservation { id, reservation })
    }

    async fn find_by_requester(
        &self,
        requester: &str,
    ) -> Result<Vec<ReservationView>, StoreError> {
        let inner = self.inner.lock().await;
        let mut out: Vec<ReservationView> = inner
            .rows
            .iter()
            .filter(|(_, r)| r.requester() == requester)
            .filter_map(|(id, r)| {
                let equipment = self.equipment.iter().find(|e| e.id == r.equipment_id())?;
                Some(ReservationView {
                    id: *id,
                    requester_identity: r.requester().to_string(),
                    start_date: r.interval().start(),
                    end_date: r.interval().end(),
                    equipment: equipment.clone(),
                })
            })
            .collect();
        out.sort_by_key(|v| (v.start_date, v.id));
        Ok(out)
    }

    async fn delete_by_id_and_requester(
        &self,
        id: i64,
        requester: &str,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        let owned = inner
            .rows
            .get(&id)
            .is_some_and(|r| r.requester() == requester);
        if owned {
            inner.rows.remove(&id);
        }
        Ok(owned)
    }
}
