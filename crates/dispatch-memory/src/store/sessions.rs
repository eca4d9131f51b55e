//! Durable wizard drafts (`wizard_sessions`).

use super::{store_err, Store};
use dispatch_core::error::DispatchError;

impl Store {
    pub async fn get_wizard_session(&self, actor_id: &str) -> Result<Option<String>, DispatchError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT data FROM wizard_sessions WHERE actor_id = ?")
                .bind(actor_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(store_err("get wizard session failed"))?;
        Ok(row.map(|(data,)| data))
    }

    pub async fn put_wizard_session(&self, actor_id: &str, data: &str) -> Result<(), DispatchError> {
        sqlx::query(
            "INSERT INTO wizard_sessions (actor_id, data, updated_at) \
             VALUES (?, ?, datetime('now')) \
             ON CONFLICT(actor_id) DO UPDATE SET \
                 data = excluded.data, updated_at = excluded.updated_at",
        )
        .bind(actor_id)
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(store_err("put wizard session failed"))?;
        Ok(())
    }

    pub async fn delete_wizard_session(&self, actor_id: &str) -> Result<(), DispatchError> {
        sqlx::query("DELETE FROM wizard_sessions WHERE actor_id = ?")
            .bind(actor_id)
            .execute(&self.pool)
            .await
            .map_err(store_err("delete wizard session failed"))?;
        Ok(())
    }
}
