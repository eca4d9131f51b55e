//! Task persistence and the status machine writes.
//!
//! Every status change is a guarded `UPDATE ... WHERE status = <expected>`
//! issued as the first statement of its transaction. The write lock is taken
//! up front, so concurrent writers wait on the busy timeout instead of
//! failing a read-to-write upgrade, and a duplicate request observes the new
//! status and fails with `InvalidTransition` instead of applying twice.

use super::{store_err, Store};
use dispatch_core::debt::DebtId;
use dispatch_core::error::DispatchError;
use dispatch_core::settlement::{SettlementMethod, SettlementOutcome};
use dispatch_core::task::{
    CompletionReport, GeoPoint, NewTask, Task, TaskFilter, TaskId, TaskLocation, TaskStatus,
};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};
use std::str::FromStr;
use tracing::info;

const TASK_COLUMNS: &str = "id, description, latitude, longitude, address, payment_amount, \
     assigned_to, assigned_by, status, created_at, started_at, completed_at, \
     completion_report, completion_media, received_amount, settlement_method";

/// Aggregate numbers for `/stats` and `dispatch status`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskStatistics {
    pub pending: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub total_received: Decimal,
    pub unpaid_debts: i64,
    pub unpaid_debt_total: Decimal,
}

/// Result of a successful completion.
#[derive(Debug, Clone)]
pub struct Completion {
    pub task: Task,
    /// Debt spawned by a debt settlement.
    pub debt_id: Option<DebtId>,
}

impl Store {
    /// Create a `pending` task.
    pub async fn create_task(&self, task: &NewTask) -> Result<Task, DispatchError> {
        task.validate()?;

        let location = task.location.as_ref().filter(|l| !l.is_empty());
        let point = location.and_then(|l| l.point);
        let result = sqlx::query(
            "INSERT INTO tasks \
             (description, latitude, longitude, address, payment_amount, assigned_to, assigned_by) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(task.description.trim())
        .bind(point.map(|p| p.latitude))
        .bind(point.map(|p| p.longitude))
        .bind(location.and_then(|l| l.address.as_deref()))
        .bind(task.payment_amount.map(|a| a.to_string()))
        .bind(&task.assigned_to)
        .bind(&task.assigned_by)
        .execute(&self.pool)
        .await
        .map_err(store_err("create task failed"))?;

        let id = result.last_insert_rowid();
        info!("task #{id} created for {}", task.assigned_to);
        self.get_task(id).await?.ok_or(DispatchError::TaskNotFound(id))
    }

    pub async fn get_task(&self, task_id: TaskId) -> Result<Option<Task>, DispatchError> {
        let row = sqlx::query(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?"))
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err("get task failed"))?;
        row.as_ref().map(task_from_row).transpose()
    }

    /// Tasks matching the filter, oldest first.
    pub async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, DispatchError> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {TASK_COLUMNS} FROM tasks WHERE 1 = 1"));
        if let Some(name) = &filter.assigned_to {
            qb.push(" AND assigned_to = ").push_bind(name.clone());
        }
        if !filter.statuses.is_empty() {
            qb.push(" AND status IN (");
            let mut list = qb.separated(", ");
            for status in &filter.statuses {
                list.push_bind(status.as_str());
            }
            list.push_unseparated(")");
        }
        if let Some(since) = filter.completed_since {
            qb.push(" AND completed_at >= ")
                .push_bind(since.format("%Y-%m-%d %H:%M:%S").to_string());
        }
        if filter.paid_only {
            qb.push(" AND CAST(received_amount AS REAL) > 0");
        }
        qb.push(" ORDER BY id");

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(store_err("list tasks failed"))?;
        rows.iter().map(task_from_row).collect()
    }

    /// `pending → in_progress`, performed by the assigned worker.
    pub async fn start_task(&self, task_id: TaskId, worker: &str) -> Result<Task, DispatchError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(store_err("begin transaction failed"))?;

        let updated = sqlx::query(
            "UPDATE tasks SET status = 'in_progress', started_at = datetime('now') \
             WHERE id = ? AND assigned_to = ? AND status = 'pending'",
        )
        .bind(task_id)
        .bind(worker)
        .execute(&mut *tx)
        .await
        .map_err(store_err("start task failed"))?;

        if updated.rows_affected() == 0 {
            let err = rejected_transition(&mut tx, task_id, worker, TaskStatus::InProgress).await;
            return Err(err);
        }

        let task = fetch_task(&mut tx, task_id).await?;
        tx.commit()
            .await
            .map_err(store_err("commit start task failed"))?;
        info!("task #{task_id} started by {worker}");
        Ok(task)
    }

    /// `in_progress → completed`, writing the report, the settlement and the
    /// debt it spawns (if any) in one transaction.
    pub async fn complete_task(
        &self,
        task_id: TaskId,
        worker: &str,
        report: &CompletionReport,
        outcome: &SettlementOutcome,
    ) -> Result<Completion, DispatchError> {
        if report.report.trim().is_empty() {
            return Err(DispatchError::Validation(
                "The completion report must not be empty.".into(),
            ));
        }
        if outcome.received_amount.is_sign_negative() {
            return Err(DispatchError::Validation(
                "The received amount cannot be negative.".into(),
            ));
        }
        if let Some(debt) = &outcome.debt {
            debt.validate()?;
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(store_err("begin transaction failed"))?;

        let updated = sqlx::query(
            "UPDATE tasks SET status = 'completed', completed_at = datetime('now'), \
                 completion_report = ?, completion_media = ?, \
                 received_amount = ?, settlement_method = ? \
             WHERE id = ? AND assigned_to = ? AND status = 'in_progress'",
        )
        .bind(report.report.trim())
        .bind(report.media.as_deref())
        .bind(outcome.received_amount.to_string())
        .bind(outcome.method.as_str())
        .bind(task_id)
        .bind(worker)
        .execute(&mut *tx)
        .await
        .map_err(store_err("complete task failed"))?;

        if updated.rows_affected() == 0 {
            let err = rejected_transition(&mut tx, task_id, worker, TaskStatus::Completed).await;
            return Err(err);
        }

        let debt_id = match &outcome.debt {
            Some(debt) => Some(Self::insert_debt(&mut tx, debt).await?),
            None => None,
        };

        let task = fetch_task(&mut tx, task_id).await?;
        tx.commit()
            .await
            .map_err(store_err("commit complete task failed"))?;
        info!(
            "task #{task_id} completed by {worker}, settled by {}",
            outcome.method
        );
        Ok(Completion { task, debt_id })
    }

    pub async fn task_statistics(&self) -> Result<TaskStatistics, DispatchError> {
        let mut stats = TaskStatistics::default();

        let counts: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM tasks GROUP BY status")
                .fetch_all(&self.pool)
                .await
                .map_err(store_err("task counts failed"))?;
        for (status, count) in counts {
            match TaskStatus::parse(&status) {
                Some(TaskStatus::Pending) => stats.pending = count,
                Some(TaskStatus::InProgress) => stats.in_progress = count,
                Some(TaskStatus::Completed) => stats.completed = count,
                None => {}
            }
        }

        // Amounts are TEXT decimals; sum them exactly here rather than in SQL.
        let received: Vec<(String,)> =
            sqlx::query_as("SELECT received_amount FROM tasks WHERE status = 'completed'")
                .fetch_all(&self.pool)
                .await
                .map_err(store_err("received totals failed"))?;
        for (amount,) in received {
            stats.total_received += parse_decimal(&amount)?;
        }

        let unpaid: Vec<(String,)> =
            sqlx::query_as("SELECT amount FROM debts WHERE status = 'unpaid'")
                .fetch_all(&self.pool)
                .await
                .map_err(store_err("debt totals failed"))?;
        stats.unpaid_debts = unpaid.len() as i64;
        for (amount,) in unpaid {
            stats.unpaid_debt_total += parse_decimal(&amount)?;
        }

        Ok(stats)
    }
}

/// Read the task back inside the transaction that changed it.
async fn fetch_task(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    task_id: TaskId,
) -> Result<Task, DispatchError> {
    let row = sqlx::query(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?"))
        .bind(task_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(store_err("read task failed"))?;
    match row {
        Some(row) => task_from_row(&row),
        None => Err(DispatchError::TaskNotFound(task_id)),
    }
}

/// Explain why a guarded status update matched no row.
///
/// Runs inside the writing transaction, so the row cannot change between the
/// failed update and this read.
async fn rejected_transition(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    task_id: TaskId,
    worker: &str,
    to: TaskStatus,
) -> DispatchError {
    let row: Option<(String, String)> =
        match sqlx::query_as("SELECT status, assigned_to FROM tasks WHERE id = ?")
            .bind(task_id)
            .fetch_optional(&mut **tx)
            .await
        {
            Ok(row) => row,
            Err(e) => return store_err("read task status failed")(e),
        };
    let Some((status, assigned_to)) = row else {
        return DispatchError::TaskNotFound(task_id);
    };
    if assigned_to != worker {
        return DispatchError::NotPermitted(format!(
            "task #{task_id} is assigned to someone else"
        ));
    }
    match TaskStatus::parse(&status) {
        Some(from) => match from.check_transition(task_id, to) {
            Err(e) => e,
            // Unreachable while the update guard matches check_transition.
            Ok(()) => DispatchError::InvalidTransition { task_id, from, to },
        },
        None => DispatchError::Store(format!("task #{task_id} has status '{status}'")),
    }
}

pub(super) fn parse_decimal(text: &str) -> Result<Decimal, DispatchError> {
    Decimal::from_str(text)
        .map_err(|e| DispatchError::Store(format!("bad decimal '{text}' in store: {e}")))
}

fn task_from_row(row: &SqliteRow) -> Result<Task, DispatchError> {
    let get = |e: sqlx::Error| DispatchError::Store(format!("decode task failed: {e}"));

    let id: i64 = row.try_get("id").map_err(get)?;
    let latitude: Option<f64> = row.try_get("latitude").map_err(get)?;
    let longitude: Option<f64> = row.try_get("longitude").map_err(get)?;
    let address: Option<String> = row.try_get("address").map_err(get)?;
    let point = match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => Some(GeoPoint {
            latitude,
            longitude,
        }),
        _ => None,
    };
    let location = TaskLocation { point, address };

    let status: String = row.try_get("status").map_err(get)?;
    let status = TaskStatus::parse(&status)
        .ok_or_else(|| DispatchError::Store(format!("task #{id} has status '{status}'")))?;

    let payment_amount: Option<String> = row.try_get("payment_amount").map_err(get)?;
    let received_amount: String = row.try_get("received_amount").map_err(get)?;
    let settlement_method: Option<String> = row.try_get("settlement_method").map_err(get)?;

    Ok(Task {
        id,
        description: row.try_get("description").map_err(get)?,
        location: (!location.is_empty()).then_some(location),
        payment_amount: payment_amount.as_deref().map(parse_decimal).transpose()?,
        assigned_to: row.try_get("assigned_to").map_err(get)?,
        assigned_by: row.try_get("assigned_by").map_err(get)?,
        status,
        created_at: row.try_get("created_at").map_err(get)?,
        started_at: row.try_get("started_at").map_err(get)?,
        completed_at: row.try_get("completed_at").map_err(get)?,
        completion_report: row.try_get("completion_report").map_err(get)?,
        completion_media: row.try_get("completion_media").map_err(get)?,
        received_amount: parse_decimal(&received_amount)?,
        settlement_method: settlement_method.as_deref().and_then(SettlementMethod::parse),
    })
}
