use super::*;
use dispatch_core::config::StoreConfig;
use dispatch_core::error::DispatchError;
use chrono::NaiveDate;
use dispatch_core::config::WorkerEntry;
use dispatch_core::debt::{DebtFilter, DebtStatus, NewDebt};
use dispatch_core::settlement::{DebtTerms, Settlement, SettlementMethod, Settler};
use dispatch_core::task::{
    CompletionReport, GeoPoint, NewTask, TaskFilter, TaskLocation, TaskStatus,
};
use rust_decimal::Decimal;

async fn test_store() -> Store {
    Store::in_memory().await.unwrap()
}

fn new_task(worker: &str) -> NewTask {
    NewTask {
        description: "Replace the kitchen tap".into(),
        location: Some(TaskLocation {
            point: Some(GeoPoint {
                latitude: 41.31,
                longitude: 69.28,
            }),
            address: Some("Main street 5".into()),
        }),
        payment_amount: Some(Decimal::new(120_000, 0)),
        assigned_to: worker.into(),
        assigned_by: "1001".into(),
    }
}

fn report() -> CompletionReport {
    CompletionReport {
        report: "Tap replaced, tested for leaks".into(),
        media: Some("photo:AgAD1".into()),
    }
}

fn alice() -> Settler<'static> {
    Settler {
        name: "Alice",
        contact: Some("111"),
    }
}

fn due() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
}

async fn started_task(store: &Store) -> i64 {
    let task = store.create_task(&new_task("Alice")).await.unwrap();
    store.start_task(task.id, "Alice").await.unwrap();
    task.id
}

// --- actor states ---

#[tokio::test]
async fn test_actor_state_defaults_to_idle() {
    let store = test_store().await;
    assert!(store.get_actor_state("42").await.unwrap().is_none());
}

#[tokio::test]
async fn test_actor_state_upsert_and_clear() {
    let store = test_store().await;
    store
        .set_actor_state("42", "assign_task_description", None)
        .await
        .unwrap();
    store
        .set_actor_state("42", "complete_task_report", Some(r#"{"task_id":3}"#))
        .await
        .unwrap();

    let state = store.get_actor_state("42").await.unwrap().unwrap();
    assert_eq!(state.state_name, "complete_task_report");
    assert_eq!(state.payload.as_deref(), Some(r#"{"task_id":3}"#));

    let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM actor_states WHERE actor_id = '42'")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(rows, 1);

    store.clear_actor_state("42").await.unwrap();
    assert!(store.get_actor_state("42").await.unwrap().is_none());
}

#[tokio::test]
async fn test_empty_state_name_means_idle() {
    let store = test_store().await;
    store
        .set_actor_state("42", "admin_login", None)
        .await
        .unwrap();
    store.set_actor_state("42", "", None).await.unwrap();
    assert!(store.get_actor_state("42").await.unwrap().is_none());
}

#[tokio::test]
async fn test_actor_state_survives_reopen() {
    let dir = std::env::temp_dir().join(format!("dispatch-store-{}", std::process::id()));
    let db_path = dir.join("reopen.db");
    let _ = std::fs::remove_file(&db_path);
    let config = StoreConfig {
        db_path: db_path.to_string_lossy().into_owned(),
    };

    {
        let store = Store::new(&config).await.unwrap();
        store
            .set_actor_state("7", "manual_debt_amount", None)
            .await
            .unwrap();
        store.pool().close().await;
    }

    let store = Store::new(&config).await.unwrap();
    let state = store.get_actor_state("7").await.unwrap().unwrap();
    assert_eq!(state.state_name, "manual_debt_amount");
    store.pool().close().await;
    let _ = std::fs::remove_dir_all(&dir);
}

// --- tasks ---

#[tokio::test]
async fn test_create_task_is_pending() {
    let store = test_store().await;
    let task = store.create_task(&new_task("Alice")).await.unwrap();
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(task.assigned_to, "Alice");
    assert_eq!(task.assigned_by, "1001");
    assert_eq!(task.payment_amount, Some(Decimal::new(120_000, 0)));
    assert_eq!(task.received_amount, Decimal::ZERO);
    assert!(task.started_at.is_none());
    assert!(task.completed_at.is_none());
    assert!(task.settlement_method.is_none());
    let location = task.location.unwrap();
    assert_eq!(location.address.as_deref(), Some("Main street 5"));
    assert_eq!(location.point.unwrap().latitude, 41.31);
}

#[tokio::test]
async fn test_create_task_without_optional_fields() {
    let store = test_store().await;
    let task = store
        .create_task(&NewTask {
            location: None,
            payment_amount: None,
            ..new_task("Bob")
        })
        .await
        .unwrap();
    assert!(task.location.is_none());
    assert!(task.payment_amount.is_none());
}

#[tokio::test]
async fn test_create_task_rejects_empty_description() {
    let store = test_store().await;
    let result = store
        .create_task(&NewTask {
            description: " ".into(),
            ..new_task("Alice")
        })
        .await;
    assert!(matches!(result, Err(DispatchError::Validation(_))));
    assert!(store.list_tasks(&TaskFilter::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_start_task_sets_started_at_once() {
    let store = test_store().await;
    let task = store.create_task(&new_task("Alice")).await.unwrap();

    let started = store.start_task(task.id, "Alice").await.unwrap();
    assert_eq!(started.status, TaskStatus::InProgress);
    assert!(started.started_at.is_some());

    let again = store.start_task(task.id, "Alice").await;
    assert!(matches!(
        again,
        Err(DispatchError::InvalidTransition {
            from: TaskStatus::InProgress,
            to: TaskStatus::InProgress,
            ..
        })
    ));
    let reread = store.get_task(task.id).await.unwrap().unwrap();
    assert_eq!(reread.started_at, started.started_at);
}

#[tokio::test]
async fn test_only_assignee_may_start_or_complete() {
    let store = test_store().await;
    let task = store.create_task(&new_task("Alice")).await.unwrap();
    assert!(matches!(
        store.start_task(task.id, "Bob").await,
        Err(DispatchError::NotPermitted(_))
    ));

    store.start_task(task.id, "Alice").await.unwrap();
    let outcome = Settlement::Cash {
        amount: Decimal::ONE,
    }
    .resolve(task.id, alice())
    .unwrap();
    assert!(matches!(
        store.complete_task(task.id, "Bob", &report(), &outcome).await,
        Err(DispatchError::NotPermitted(_))
    ));
}

#[tokio::test]
async fn test_rejected_transition_reports_current_status() {
    let store = test_store().await;
    let id = started_task(&store).await;
    let outcome = Settlement::Cash {
        amount: Decimal::ONE,
    }
    .resolve(id, alice())
    .unwrap();
    store
        .complete_task(id, "Alice", &report(), &outcome)
        .await
        .unwrap();

    assert!(matches!(
        store.start_task(id, "Alice").await,
        Err(DispatchError::InvalidTransition {
            from: TaskStatus::Completed,
            to: TaskStatus::InProgress,
            ..
        })
    ));
    assert!(matches!(
        store.complete_task(id, "Alice", &report(), &outcome).await,
        Err(DispatchError::InvalidTransition {
            from: TaskStatus::Completed,
            to: TaskStatus::Completed,
            ..
        })
    ));
    assert!(matches!(
        store.complete_task(id, "Bob", &report(), &outcome).await,
        Err(DispatchError::NotPermitted(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_transitions_on_disk() {
    const WORKERS: usize = 24;
    let dir = std::env::temp_dir().join(format!("dispatch-concurrent-{}", std::process::id()));
    let db_path = dir.join("concurrent.db");
    let _ = std::fs::remove_file(&db_path);
    let store = Store::new(&StoreConfig {
        db_path: db_path.to_string_lossy().into_owned(),
    })
    .await
    .unwrap();

    let mut ids = Vec::new();
    for i in 0..WORKERS {
        let task = store.create_task(&new_task(&format!("w{i}"))).await.unwrap();
        ids.push(task.id);
    }

    let starts: Vec<_> = ids
        .iter()
        .enumerate()
        .map(|(i, &id)| {
            let store = store.clone();
            tokio::spawn(async move { store.start_task(id, &format!("w{i}")).await })
        })
        .collect();
    for handle in starts {
        handle.await.unwrap().unwrap();
    }

    let completions: Vec<_> = ids
        .iter()
        .enumerate()
        .map(|(i, &id)| {
            let store = store.clone();
            let worker = format!("w{i}");
            let settlement = if i % 2 == 0 {
                Settlement::Cash {
                    amount: Decimal::new(100, 0),
                }
            } else {
                Settlement::Debt(DebtTerms {
                    debtor_name: None,
                    debtor_contact: None,
                    amount: Decimal::new(100, 0),
                    reason: "later".into(),
                    due_date: due(),
                })
            };
            let outcome = settlement
                .resolve(
                    id,
                    Settler {
                        name: &worker,
                        contact: None,
                    },
                )
                .unwrap();
            tokio::spawn(async move {
                store.complete_task(id, &worker, &report(), &outcome).await
            })
        })
        .collect();
    for handle in completions {
        handle.await.unwrap().unwrap();
    }

    let stats = store.task_statistics().await.unwrap();
    assert_eq!(stats.completed, WORKERS as i64);
    assert_eq!(stats.unpaid_debts, (WORKERS / 2) as i64);
    store.pool().close().await;
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_unknown_task() {
    let store = test_store().await;
    assert!(store.get_task(99).await.unwrap().is_none());
    assert!(matches!(
        store.start_task(99, "Alice").await,
        Err(DispatchError::TaskNotFound(99))
    ));
}

#[tokio::test]
async fn test_complete_requires_in_progress() {
    let store = test_store().await;
    let task = store.create_task(&new_task("Alice")).await.unwrap();
    let outcome = Settlement::Card {
        amount: Decimal::new(5, 0),
    }
    .resolve(task.id, alice())
    .unwrap();

    let result = store.complete_task(task.id, "Alice", &report(), &outcome).await;
    assert!(matches!(
        result,
        Err(DispatchError::InvalidTransition {
            from: TaskStatus::Pending,
            to: TaskStatus::Completed,
            ..
        })
    ));
    let reread = store.get_task(task.id).await.unwrap().unwrap();
    assert_eq!(reread.status, TaskStatus::Pending);
    assert!(reread.completion_report.is_none());
}

#[tokio::test]
async fn test_complete_with_cash() {
    let store = test_store().await;
    let id = started_task(&store).await;
    let outcome = Settlement::Cash {
        amount: Decimal::new(120_000, 0),
    }
    .resolve(id, alice())
    .unwrap();

    let done = store
        .complete_task(id, "Alice", &report(), &outcome)
        .await
        .unwrap();
    assert!(done.debt_id.is_none());
    assert_eq!(done.task.status, TaskStatus::Completed);
    assert_eq!(done.task.received_amount, Decimal::new(120_000, 0));
    assert_eq!(done.task.settlement_method, Some(SettlementMethod::Cash));
    assert_eq!(
        done.task.completion_report.as_deref(),
        Some("Tap replaced, tested for leaks")
    );
    assert_eq!(done.task.completion_media.as_deref(), Some("photo:AgAD1"));
    assert!(done.task.completed_at.is_some());
    assert!(store.debt_for_task(id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_complete_with_debt_creates_one_debt() {
    let store = test_store().await;
    let id = started_task(&store).await;
    let outcome = Settlement::Debt(DebtTerms {
        debtor_name: Some("Bob".into()),
        debtor_contact: None,
        amount: Decimal::new(50_000, 0),
        reason: "customer pays next week".into(),
        due_date: due(),
    })
    .resolve(id, alice())
    .unwrap();

    let done = store
        .complete_task(id, "Alice", &report(), &outcome)
        .await
        .unwrap();
    assert_eq!(done.task.status, TaskStatus::Completed);
    assert_eq!(done.task.received_amount, Decimal::ZERO);
    assert_eq!(done.task.settlement_method, Some(SettlementMethod::Debt));

    let debt = store.debt_for_task(id).await.unwrap().unwrap();
    assert_eq!(Some(debt.id), done.debt_id);
    assert_eq!(debt.debtor_name, "Bob");
    assert_eq!(debt.amount, Decimal::new(50_000, 0));
    assert_eq!(debt.due_date, "2025-01-15");
    assert_eq!(debt.status, DebtStatus::Unpaid);

    let all = store.list_debts(&DebtFilter::default()).await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn test_second_completion_changes_nothing() {
    let store = test_store().await;
    let id = started_task(&store).await;
    let outcome = Settlement::Debt(DebtTerms {
        debtor_name: None,
        debtor_contact: None,
        amount: Decimal::new(700, 0),
        reason: "advance".into(),
        due_date: due(),
    })
    .resolve(id, alice())
    .unwrap();

    let first = store
        .complete_task(id, "Alice", &report(), &outcome)
        .await
        .unwrap();

    for _ in 0..2 {
        let replay = store.complete_task(id, "Alice", &report(), &outcome).await;
        assert!(matches!(
            replay,
            Err(DispatchError::InvalidTransition {
                from: TaskStatus::Completed,
                ..
            })
        ));
    }

    let after = store.get_task(id).await.unwrap().unwrap();
    assert_eq!(after.completed_at, first.task.completed_at);
    assert_eq!(store.list_debts(&DebtFilter::default()).await.unwrap().len(), 1);
    // Debtor defaulted to the worker.
    assert_eq!(
        store.debt_for_task(id).await.unwrap().unwrap().debtor_name,
        "Alice"
    );
}

#[tokio::test]
async fn test_failed_debt_insert_rolls_back_completion() {
    let store = test_store().await;
    let id = started_task(&store).await;
    // Occupy the task's debt slot so the insert inside the transaction fails.
    sqlx::query(
        "INSERT INTO debts (debtor_name, task_id, amount, reason, due_date) \
         VALUES ('X', ?, '1', 'r', '2025-01-01')",
    )
    .bind(id)
    .execute(store.pool())
    .await
    .unwrap();

    let outcome = Settlement::Debt(DebtTerms {
        debtor_name: Some("Bob".into()),
        debtor_contact: None,
        amount: Decimal::new(10, 0),
        reason: "later".into(),
        due_date: due(),
    })
    .resolve(id, alice())
    .unwrap();
    let result = store.complete_task(id, "Alice", &report(), &outcome).await;
    assert!(matches!(result, Err(DispatchError::Store(_))));

    let task = store.get_task(id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::InProgress);
    assert!(task.completion_report.is_none());
    assert!(task.settlement_method.is_none());
}

#[tokio::test]
async fn test_list_tasks_filters() {
    let store = test_store().await;
    store.create_task(&new_task("Alice")).await.unwrap();
    let second = store.create_task(&new_task("Alice")).await.unwrap();
    store.create_task(&new_task("Bob")).await.unwrap();
    store.start_task(second.id, "Alice").await.unwrap();

    let alice_all = store.list_tasks(&TaskFilter::for_worker("Alice")).await.unwrap();
    assert_eq!(alice_all.len(), 2);
    assert!(alice_all[0].id < alice_all[1].id);

    let alice_started = store
        .list_tasks(&TaskFilter::for_worker("Alice").with_statuses(&[TaskStatus::InProgress]))
        .await
        .unwrap();
    assert_eq!(alice_started.len(), 1);
    assert_eq!(alice_started[0].id, second.id);

    assert_eq!(store.list_tasks(&TaskFilter::open()).await.unwrap().len(), 3);
    assert!(store
        .list_tasks(&TaskFilter::default().with_statuses(&[TaskStatus::Completed]))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_list_completed_history() {
    let store = test_store().await;
    let old = started_task(&store).await;
    let recent = started_task(&store).await;
    let unpaid = started_task(&store).await;
    for (id, settlement) in [
        (
            old,
            Settlement::Cash {
                amount: Decimal::new(40, 0),
            },
        ),
        (
            recent,
            Settlement::Card {
                amount: Decimal::new(60, 0),
            },
        ),
        (
            unpaid,
            Settlement::Debt(DebtTerms {
                debtor_name: None,
                debtor_contact: None,
                amount: Decimal::new(10, 0),
                reason: "later".into(),
                due_date: due(),
            }),
        ),
    ] {
        let outcome = settlement.resolve(id, alice()).unwrap();
        store
            .complete_task(id, "Alice", &report(), &outcome)
            .await
            .unwrap();
    }
    sqlx::query("UPDATE tasks SET completed_at = '2000-01-01 00:00:00' WHERE id = ?")
        .bind(old)
        .execute(store.pool())
        .await
        .unwrap();
    // Still open, never part of the history.
    store.create_task(&new_task("Alice")).await.unwrap();

    let ids = |tasks: Vec<dispatch_core::task::Task>| {
        tasks.iter().map(|t| t.id).collect::<Vec<_>>()
    };

    let all = store
        .list_tasks(&TaskFilter::completed(Some("Alice")))
        .await
        .unwrap();
    assert_eq!(ids(all), vec![old, recent, unpaid]);

    let week_ago = chrono::Utc::now().naive_utc() - chrono::Duration::days(7);
    let week = store
        .list_tasks(&TaskFilter::completed(Some("Alice")).completed_since(week_ago))
        .await
        .unwrap();
    assert_eq!(ids(week), vec![recent, unpaid]);

    let paid = store
        .list_tasks(&TaskFilter::completed(None).paid_only())
        .await
        .unwrap();
    assert_eq!(ids(paid), vec![old, recent]);

    assert!(store
        .list_tasks(&TaskFilter::completed(Some("Bob")))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_statistics() {
    let store = test_store().await;
    store.create_task(&new_task("Alice")).await.unwrap();
    let id = started_task(&store).await;
    let outcome = Settlement::Card {
        amount: Decimal::new(1050, 2),
    }
    .resolve(id, alice())
    .unwrap();
    store
        .complete_task(id, "Alice", &report(), &outcome)
        .await
        .unwrap();
    let id = started_task(&store).await;
    let cash = Settlement::Cash {
        amount: Decimal::new(5, 1),
    }
    .resolve(id, alice())
    .unwrap();
    store.complete_task(id, "Alice", &report(), &cash).await.unwrap();
    started_task(&store).await;

    store
        .create_debt(&NewDebt {
            debtor_name: "Bob".into(),
            debtor_contact: None,
            task_id: None,
            amount: Decimal::new(300, 0),
            reason: "tools".into(),
            due_date: due(),
        })
        .await
        .unwrap();

    let stats = store.task_statistics().await.unwrap();
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.in_progress, 1);
    assert_eq!(stats.completed, 2);
    assert_eq!(stats.total_received, Decimal::new(11, 0));
    assert_eq!(stats.unpaid_debts, 1);
    assert_eq!(stats.unpaid_debt_total, Decimal::new(300, 0));
}

// --- debts ---

#[tokio::test]
async fn test_manual_debt_and_mark_paid() {
    let store = test_store().await;
    let debt = store
        .create_debt(&NewDebt {
            debtor_name: "Carol".into(),
            debtor_contact: Some("+998901234567".into()),
            task_id: None,
            amount: Decimal::new(25_000, 0),
            reason: "borrowed drill".into(),
            due_date: due(),
        })
        .await
        .unwrap();
    assert_eq!(debt.status, DebtStatus::Unpaid);
    assert!(debt.task_id.is_none());
    assert!(debt.paid_at.is_none());

    let paid = store.mark_debt_paid(debt.id).await.unwrap();
    assert_eq!(paid.status, DebtStatus::Paid);
    assert!(paid.paid_at.is_some());

    assert!(matches!(
        store.mark_debt_paid(debt.id).await,
        Err(DispatchError::Validation(_))
    ));
    assert!(matches!(
        store.mark_debt_paid(999).await,
        Err(DispatchError::DebtNotFound(999))
    ));
}

#[tokio::test]
async fn test_create_debt_validates() {
    let store = test_store().await;
    let result = store
        .create_debt(&NewDebt {
            debtor_name: "Carol".into(),
            debtor_contact: None,
            task_id: None,
            amount: Decimal::ZERO,
            reason: "nothing".into(),
            due_date: due(),
        })
        .await;
    assert!(matches!(result, Err(DispatchError::Validation(_))));
}

#[tokio::test]
async fn test_list_debts_filters() {
    let store = test_store().await;
    for (name, day) in [("Bob", 20), ("Alice", 10), ("Bob", 5)] {
        store
            .create_debt(&NewDebt {
                debtor_name: name.into(),
                debtor_contact: None,
                task_id: None,
                amount: Decimal::new(100, 0),
                reason: "r".into(),
                due_date: NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
            })
            .await
            .unwrap();
    }
    let bob = store.list_debts(&DebtFilter::unpaid_for("Bob")).await.unwrap();
    assert_eq!(bob.len(), 2);
    assert_eq!(bob[0].due_date, "2025-03-05");

    store.mark_debt_paid(bob[0].id).await.unwrap();
    assert_eq!(store.list_debts(&DebtFilter::unpaid()).await.unwrap().len(), 2);
    assert_eq!(store.list_debts(&DebtFilter::default()).await.unwrap().len(), 3);
}

// --- roster ---

#[tokio::test]
async fn test_roster() {
    let store = test_store().await;
    let added = store
        .seed_workers(&[
            WorkerEntry {
                name: "Alice".into(),
                chat_id: 111,
            },
            WorkerEntry {
                name: "Bob".into(),
                chat_id: 222,
            },
        ])
        .await
        .unwrap();
    assert_eq!(added, 2);
    // Seeding is idempotent.
    let again = store
        .seed_workers(&[WorkerEntry {
            name: "Alice".into(),
            chat_id: 111,
        }])
        .await
        .unwrap();
    assert_eq!(again, 0);

    let carol = store.add_worker(" Carol ", 333).await.unwrap();
    assert_eq!(carol.name, "Carol");
    assert!(matches!(
        store.add_worker("Carol", 444).await,
        Err(DispatchError::Validation(_))
    ));
    assert!(matches!(
        store.add_worker("Dave", 111).await,
        Err(DispatchError::Validation(_))
    ));

    let names: Vec<String> = store
        .list_workers()
        .await
        .unwrap()
        .into_iter()
        .map(|w| w.name)
        .collect();
    assert_eq!(names, vec!["Alice", "Bob", "Carol"]);

    assert_eq!(
        store.worker_for_actor("222").await.unwrap().unwrap().name,
        "Bob"
    );
    assert!(store.worker_for_actor("999").await.unwrap().is_none());
    assert!(store.worker_for_actor("not-a-number").await.unwrap().is_none());
    assert!(store.find_worker("alice").await.unwrap().is_none());
}

#[tokio::test]
async fn test_dispatcher_grants() {
    let store = test_store().await;
    assert!(!store.is_granted_dispatcher("1001").await.unwrap());
    store.grant_dispatcher("1001").await.unwrap();
    store.grant_dispatcher("1001").await.unwrap();
    assert!(store.is_granted_dispatcher("1001").await.unwrap());
}

#[tokio::test]
async fn test_migrations_are_idempotent() {
    let store = test_store().await;
    Store::run_migrations(store.pool()).await.unwrap();
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM _migrations")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(count, 2);
}
