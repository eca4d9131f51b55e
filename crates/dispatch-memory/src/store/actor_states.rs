//! Durable dialogue state per actor.

use super::{store_err, Store};
use dispatch_core::error::DispatchError;

/// A row of `actor_states`. An actor without a row is idle.
#[derive(Debug, Clone, PartialEq)]
pub struct ActorStateRecord {
    pub state_name: String,
    pub payload: Option<String>,
    pub updated_at: String,
}

impl Store {
    /// Current state for an actor, or `None` when idle.
    pub async fn get_actor_state(
        &self,
        actor_id: &str,
    ) -> Result<Option<ActorStateRecord>, DispatchError> {
        let row: Option<(String, Option<String>, String)> = sqlx::query_as(
            "SELECT state_name, state_payload, updated_at FROM actor_states WHERE actor_id = ?",
        )
        .bind(actor_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err("get actor state failed"))?;

        Ok(row
            .filter(|(name, _, _)| !name.is_empty())
            .map(|(state_name, payload, updated_at)| ActorStateRecord {
                state_name,
                payload,
                updated_at,
            }))
    }

    /// Upsert the actor's state. An empty name is the same as clearing it.
    pub async fn set_actor_state(
        &self,
        actor_id: &str,
        state_name: &str,
        payload: Option<&str>,
    ) -> Result<(), DispatchError> {
        if state_name.is_empty() {
            return self.clear_actor_state(actor_id).await;
        }
        sqlx::query(
            "INSERT INTO actor_states (actor_id, state_name, state_payload, updated_at) \
             VALUES (?, ?, ?, datetime('now')) \
             ON CONFLICT(actor_id) DO UPDATE SET \
                 state_name = excluded.state_name, \
                 state_payload = excluded.state_payload, \
                 updated_at = excluded.updated_at",
        )
        .bind(actor_id)
        .bind(state_name)
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(store_err("set actor state failed"))?;
        Ok(())
    }

    /// Return the actor to idle.
    pub async fn clear_actor_state(&self, actor_id: &str) -> Result<(), DispatchError> {
        sqlx::query("DELETE FROM actor_states WHERE actor_id = ?")
            .bind(actor_id)
            .execute(&self.pool)
            .await
            .map_err(store_err("clear actor state failed"))?;
        Ok(())
    }
}
