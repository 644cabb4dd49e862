use async_trait::async_trait;
use sqlx::PgPool;

use super::{Equipment, EquipmentCatalog};
use crate::reservations::StoreError;

#[derive(Clone)]
pub struct PgEquipmentCatalog {
    db: PgPool,
}

impl PgEquipmentCatalog {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EquipmentCatalog for PgEquipmentCatalog {
    async fn find_by_id(&self, id: i64) -> Result<Option<Equipment>, StoreError> {
        let row = sqlx::query_as::<_, Equipment>(
            r#"SELECT id, name, reference FROM equipment WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn find_all_ordered_by_name(&self) -> Result<Vec<Equipment>, StoreError> {
        let rows = sqlx::query_as::<_, Equipment>(
            r#"
            SELECT id, name, reference
              FROM equipment
             ORDER BY name ASC, id ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}
