//! Debt records.

use super::tasks::parse_decimal;
use super::{store_err, Store};
use dispatch_core::debt::{DebtFilter, DebtId, DebtRecord, DebtStatus, NewDebt};
use dispatch_core::error::DispatchError;
use sqlx::{QueryBuilder, Sqlite};
use tracing::info;

type DebtRow = (
    i64,
    String,
    Option<String>,
    Option<i64>,
    String,
    String,
    String,
    String,
    String,
    Option<String>,
);

const DEBT_COLUMNS: &str = "id, debtor_name, debtor_contact, task_id, amount, reason, \
     due_date, status, created_at, paid_at";

impl Store {
    /// Record a debt that is not tied to a task completion.
    pub async fn create_debt(&self, debt: &NewDebt) -> Result<DebtRecord, DispatchError> {
        debt.validate()?;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(store_err("begin transaction failed"))?;
        let id = Self::insert_debt(&mut tx, debt).await?;
        tx.commit().await.map_err(store_err("commit debt failed"))?;

        self.get_debt(id).await?.ok_or(DispatchError::DebtNotFound(id))
    }

    pub(super) async fn insert_debt(
        tx: &mut sqlx::Transaction<'_, Sqlite>,
        debt: &NewDebt,
    ) -> Result<DebtId, DispatchError> {
        let result = sqlx::query(
            "INSERT INTO debts (debtor_name, debtor_contact, task_id, amount, reason, due_date) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(debt.debtor_name.trim())
        .bind(debt.debtor_contact.as_deref())
        .bind(debt.task_id)
        .bind(debt.amount.to_string())
        .bind(debt.reason.trim())
        .bind(debt.due_date.format("%Y-%m-%d").to_string())
        .execute(&mut **tx)
        .await
        .map_err(store_err("create debt failed"))?;

        let id = result.last_insert_rowid();
        info!(
            "debt #{id} recorded: {} owes {} (due {})",
            debt.debtor_name, debt.amount, debt.due_date
        );
        Ok(id)
    }

    pub async fn get_debt(&self, debt_id: DebtId) -> Result<Option<DebtRecord>, DispatchError> {
        let row: Option<DebtRow> =
            sqlx::query_as(&format!("SELECT {DEBT_COLUMNS} FROM debts WHERE id = ?"))
                .bind(debt_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(store_err("get debt failed"))?;
        row.map(debt_from_row).transpose()
    }

    /// The debt spawned by a task settled on credit, if any.
    pub async fn debt_for_task(&self, task_id: i64) -> Result<Option<DebtRecord>, DispatchError> {
        let row: Option<DebtRow> =
            sqlx::query_as(&format!("SELECT {DEBT_COLUMNS} FROM debts WHERE task_id = ?"))
                .bind(task_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(store_err("get task debt failed"))?;
        row.map(debt_from_row).transpose()
    }

    /// `unpaid → paid`. Marking a paid debt again is rejected.
    pub async fn mark_debt_paid(&self, debt_id: DebtId) -> Result<DebtRecord, DispatchError> {
        let updated = sqlx::query(
            "UPDATE debts SET status = 'paid', paid_at = datetime('now') \
             WHERE id = ? AND status = 'unpaid'",
        )
        .bind(debt_id)
        .execute(&self.pool)
        .await
        .map_err(store_err("mark debt paid failed"))?;

        let debt = self
            .get_debt(debt_id)
            .await?
            .ok_or(DispatchError::DebtNotFound(debt_id))?;
        if updated.rows_affected() == 0 {
            return Err(DispatchError::Validation(format!(
                "Debt #{debt_id} is already paid."
            )));
        }
        info!("debt #{debt_id} marked paid");
        Ok(debt)
    }

    /// Debts matching the filter, earliest due first.
    pub async fn list_debts(&self, filter: &DebtFilter) -> Result<Vec<DebtRecord>, DispatchError> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {DEBT_COLUMNS} FROM debts WHERE 1 = 1"));
        if let Some(name) = &filter.debtor_name {
            qb.push(" AND debtor_name = ").push_bind(name.clone());
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        qb.push(" ORDER BY due_date, id");

        let rows: Vec<DebtRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(store_err("list debts failed"))?;
        rows.into_iter().map(debt_from_row).collect()
    }
}

fn debt_from_row(row: DebtRow) -> Result<DebtRecord, DispatchError> {
    let (
        id,
        debtor_name,
        debtor_contact,
        task_id,
        amount,
        reason,
        due_date,
        status,
        created_at,
        paid_at,
    ) = row;
    let status = DebtStatus::parse(&status)
        .ok_or_else(|| DispatchError::Store(format!("debt #{id} has status '{status}'")))?;
    Ok(DebtRecord {
        id,
        debtor_name,
        debtor_contact,
        task_id,
        amount: parse_decimal(&amount)?,
        reason,
        due_date,
        status,
        created_at,
        paid_at,
    })
}
