use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use tracing::{debug, warn};

use super::interval::Interval;
use super::model::{Reservation, ReservationView, SavedReservation};
use super::store::{ReservationStore, StoreError, EXCLUSION_VIOLATION, FOREIGN_KEY_VIOLATION};
use crate::equipment::Equipment;

/// Postgres-backed reservation store.
#[derive(Clone)]
pub struct PgReservationStore {
    db: PgPool,
}

impl PgReservationStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[derive(Debug, FromRow)]
struct ReservationRow {
    id: i64,
    user_email: String,
    start_date: OffsetDateTime,
    end_date: OffsetDateTime,
    equipment_id: i64,
    equipment_name: String,
    equipment_reference: String,
}

impl From<ReservationRow> for ReservationView {
    fn from(r: ReservationRow) -> Self {
        Self {
            id: r.id,
            requester_identity: r.user_email,
            start_date: r.start_date,
            end_date: r.end_date,
            equipment: Equipment {
                id: r.equipment_id,
                name: r.equipment_name,
                reference: r.equipment_reference,
            },
        }
    }
}

const OVERLAP_SQL: &str = r#"
    SELECT EXISTS (
        SELECT 1
          FROM reservations
         WHERE equipment_id = $1
           AND start_date < $3
           AND end_date > $2
    )
"#;

/// Maps constraint violations raised by the insert to business outcomes.
fn classify(e: sqlx::Error, equipment_id: i64) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e {
        match db_err.code().as_deref() {
            Some(EXCLUSION_VIOLATION) => return StoreError::Conflict,
            Some(FOREIGN_KEY_VIOLATION) => return StoreError::EquipmentMissing(equipment_id),
            _ => {}
        }
    }
    StoreError::Backend(e)
}

async fn overlap_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    equipment_id: i64,
    interval: &Interval,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(OVERLAP_SQL)
        .bind(equipment_id)
        .bind(interval.start())
        .bind(interval.end())
        .fetch_one(&mut **tx)
        .await
}

#[async_trait]
impl ReservationStore for PgReservationStore {
    async fn has_overlap(
        &self,
        equipment_id: i64,
        interval: &Interval,
    ) -> Result<bool, StoreError> {
        let found = sqlx::query_scalar::<_, bool>(OVERLAP_SQL)
            .bind(equipment_id)
            .bind(interval.start())
            .bind(interval.end())
            .fetch_one(&self.db)
            .await?;
        Ok(found)
    }

    async fn save(&self, reservation: Reservation) -> Result<SavedReservation, StoreError> {
        let equipment_id = reservation.equipment_id();
        let interval = reservation.interval();
        let mut tx = self.db.begin().await?;

        // Serializes concurrent bookings of the same equipment until commit.
        let locked = sqlx::query_scalar::<_, i64>(
            r#"SELECT id FROM equipment WHERE id = $1 FOR UPDATE"#,
        )
        .bind(equipment_id)
        .fetch_optional(&mut *tx)
        .await?;
        if locked.is_none() {
            return Err(StoreError::EquipmentMissing(equipment_id));
        }

        if overlap_in_tx(&mut tx, equipment_id, &interval).await? {
            warn!(equipment_id, "overlap detected under equipment lock");
            return Err(StoreError::Conflict);
        }

        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO reservations (equipment_id, user_email, start_date, end_date)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(equipment_id)
        .bind(reservation.requester())
        .bind(interval.start())
        .bind(interval.end())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| classify(e, equipment_id))?;

        tx.commit().await.map_err(|e| classify(e, equipment_id))?;
        debug!(reservation_id = id, equipment_id, "reservation stored");

        Ok(SavedReservation { id, reservation })
    }

    async fn find_by_requester(
        &self,
        requester: &str,
    ) -> Result<Vec<ReservationView>, StoreError> {
        let rows = sqlx::query_as::<_, ReservationRow>(
            r#"
            SELECT r.id, r.user_email, r.start_date, r.end_date,
                   e.id AS equipment_id, e.name AS equipment_name,
                   e.reference AS equipment_reference
              FROM reservations r
              JOIN equipment e ON e.id = r.equipment_id
             WHERE r.user_email = $1
             ORDER BY r.start_date ASC, r.id ASC
            "#,
        )
        .bind(requester)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(ReservationView::from).collect())
    }

    async fn delete_by_id_and_requester(
        &self,
        id: i64,
        requester: &str,
    ) -> Result<bool, StoreError> {
        let res = sqlx::query(r#"DELETE FROM reservations WHERE id = $1 AND user_email = $2"#)
            .bind(id)
            .bind(requester)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
