//! Workers and dispatcher grants.

use super::{store_err, Store};
use dispatch_core::config::WorkerEntry;
use dispatch_core::error::DispatchError;
use tracing::info;

/// A worker on the roster.
#[derive(Debug, Clone, PartialEq)]
pub struct Worker {
    pub name: String,
    pub chat_id: i64,
}

impl Worker {
    /// The worker's actor id on the messaging channel.
    pub fn actor_id(&self) -> String {
        self.chat_id.to_string()
    }
}

impl Store {
    /// Add a worker. Name and chat id must both be unused.
    pub async fn add_worker(&self, name: &str, chat_id: i64) -> Result<Worker, DispatchError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DispatchError::Validation(
                "Worker name must not be empty.".into(),
            ));
        }
        if self.find_worker(name).await?.is_some() {
            return Err(DispatchError::Validation(format!(
                "A worker named {name} already exists."
            )));
        }
        if self.worker_by_chat_id(chat_id).await?.is_some() {
            return Err(DispatchError::Validation(format!(
                "Chat id {chat_id} already belongs to another worker."
            )));
        }

        sqlx::query("INSERT INTO workers (name, chat_id) VALUES (?, ?)")
            .bind(name)
            .bind(chat_id)
            .execute(&self.pool)
            .await
            .map_err(store_err("add worker failed"))?;
        info!("worker {name} added ({chat_id})");
        Ok(Worker {
            name: name.to_string(),
            chat_id,
        })
    }

    /// Insert configured workers that are not on the roster yet.
    pub async fn seed_workers(&self, workers: &[WorkerEntry]) -> Result<usize, DispatchError> {
        let mut added = 0;
        for worker in workers {
            let result =
                sqlx::query("INSERT OR IGNORE INTO workers (name, chat_id) VALUES (?, ?)")
                    .bind(worker.name.trim())
                    .bind(worker.chat_id)
                    .execute(&self.pool)
                    .await
                    .map_err(store_err("seed worker failed"))?;
            added += result.rows_affected() as usize;
        }
        Ok(added)
    }

    pub async fn list_workers(&self) -> Result<Vec<Worker>, DispatchError> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT name, chat_id FROM workers ORDER BY name")
                .fetch_all(&self.pool)
                .await
                .map_err(store_err("list workers failed"))?;
        Ok(rows
            .into_iter()
            .map(|(name, chat_id)| Worker { name, chat_id })
            .collect())
    }

    /// Exact-name lookup.
    pub async fn find_worker(&self, name: &str) -> Result<Option<Worker>, DispatchError> {
        let row: Option<(String, i64)> =
            sqlx::query_as("SELECT name, chat_id FROM workers WHERE name = ?")
                .bind(name.trim())
                .fetch_optional(&self.pool)
                .await
                .map_err(store_err("find worker failed"))?;
        Ok(row.map(|(name, chat_id)| Worker { name, chat_id }))
    }

    /// The worker behind an actor id, if the actor is one.
    pub async fn worker_for_actor(&self, actor_id: &str) -> Result<Option<Worker>, DispatchError> {
        match actor_id.parse::<i64>() {
            Ok(chat_id) => self.worker_by_chat_id(chat_id).await,
            Err(_) => Ok(None),
        }
    }

    async fn worker_by_chat_id(&self, chat_id: i64) -> Result<Option<Worker>, DispatchError> {
        let row: Option<(String, i64)> =
            sqlx::query_as("SELECT name, chat_id FROM workers WHERE chat_id = ?")
                .bind(chat_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(store_err("find worker failed"))?;
        Ok(row.map(|(name, chat_id)| Worker { name, chat_id }))
    }

    /// Grant the dispatcher role at runtime.
    pub async fn grant_dispatcher(&self, actor_id: &str) -> Result<(), DispatchError> {
        sqlx::query("INSERT OR IGNORE INTO dispatchers (actor_id) VALUES (?)")
            .bind(actor_id)
            .execute(&self.pool)
            .await
            .map_err(store_err("grant dispatcher failed"))?;
        info!("dispatcher role granted to {actor_id}");
        Ok(())
    }

    /// Whether the role was granted at runtime. Configured dispatchers are
    /// checked by the caller.
    pub async fn is_granted_dispatcher(&self, actor_id: &str) -> Result<bool, DispatchError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT actor_id FROM dispatchers WHERE actor_id = ?")
                .bind(actor_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(store_err("check dispatcher failed"))?;
        Ok(row.is_some())
    }
}
