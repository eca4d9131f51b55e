use super::*;
use async_trait::async_trait;
use dispatch_core::debt::NewDebt;
use dispatch_core::settlement::{Settlement, Settler};
use dispatch_core::task::{CompletionReport, NewTask, TaskStatus};
use dispatch_memory::store::Worker;
use rust_decimal::Decimal;
use std::sync::Mutex;

// --- parsing ---

#[test]
fn test_parse_known_commands() {
    assert_eq!(Command::parse("/start"), Some(Command::Start));
    assert_eq!(Command::parse("/help"), Some(Command::Help));
    assert_eq!(Command::parse("/getid"), Some(Command::GetId));
    assert_eq!(Command::parse("/id"), Some(Command::GetId));
    assert_eq!(Command::parse("/tasks"), Some(Command::Tasks));
    assert_eq!(Command::parse("/assign"), Some(Command::Assign));
    assert_eq!(Command::parse("/addworker"), Some(Command::AddWorker));
    assert_eq!(Command::parse("/adddebt"), Some(Command::AddDebt));
    assert_eq!(Command::parse("/debts"), Some(Command::Debts));
    assert_eq!(Command::parse("/stats"), Some(Command::Stats));
    assert_eq!(Command::parse("/login"), Some(Command::Login));
}

#[test]
fn test_parse_id_arguments() {
    assert_eq!(Command::parse("/begin 12"), Some(Command::Begin(Some(12))));
    assert_eq!(Command::parse("/begin #12"), Some(Command::Begin(Some(12))));
    assert_eq!(Command::parse("/begin"), Some(Command::Begin(None)));
    assert_eq!(Command::parse("/begin twelve"), Some(Command::Begin(None)));
    assert_eq!(Command::parse("/finish 3"), Some(Command::Finish(Some(3))));
    assert_eq!(Command::parse("/complete 3"), Some(Command::Finish(Some(3))));
    assert_eq!(Command::parse("/paid 7"), Some(Command::Paid(Some(7))));
}

#[test]
fn test_parse_history_arguments() {
    let history = |period, worker: Option<&str>| Command::History {
        period,
        worker: worker.map(str::to_string),
    };
    assert_eq!(
        Command::parse("/history"),
        Some(history(HistoryPeriod::All, None))
    );
    assert_eq!(
        Command::parse("/history week"),
        Some(history(HistoryPeriod::Week, None))
    );
    assert_eq!(
        Command::parse("/history Alice Smith PAID"),
        Some(history(HistoryPeriod::Paid, Some("Alice Smith")))
    );
    assert_eq!(
        Command::parse("/history month Bob"),
        Some(history(HistoryPeriod::Month, Some("Bob")))
    );
}

#[test]
fn test_parse_botname_and_case() {
    assert_eq!(Command::parse("/Help@dispatch_bot"), Some(Command::Help));
    assert_eq!(
        Command::parse("/begin@dispatch_bot 4"),
        Some(Command::Begin(Some(4)))
    );
}

#[test]
fn test_parse_rejects_non_commands() {
    assert_eq!(Command::parse("hello"), None);
    assert_eq!(Command::parse("/unknown"), None);
    assert_eq!(Command::parse(""), None);
    assert_eq!(Command::parse("start"), None);
}

// --- handlers ---

#[derive(Default)]
struct Recorder {
    sent: Mutex<Vec<Notification>>,
}

#[async_trait]
impl Notifier for Recorder {
    async fn notify(&self, notification: &Notification) -> Result<(), DispatchError> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

fn alice() -> Worker {
    Worker {
        name: "Alice".into(),
        chat_id: 101,
    }
}

async fn store_with_task() -> (Store, TaskId) {
    let store = Store::in_memory().await.unwrap();
    store.add_worker("Alice", 101).await.unwrap();
    let task = store
        .create_task(&NewTask {
            description: "Fix the sink".into(),
            location: None,
            payment_amount: None,
            assigned_to: "Alice".into(),
            assigned_by: "900".into(),
        })
        .await
        .unwrap();
    (store, task.id)
}

#[tokio::test]
async fn test_begin_starts_task_and_notifies_dispatcher() {
    let (store, task_id) = store_with_task().await;
    let recorder = Recorder::default();
    let role = Role::Worker(alice());
    let ctx = CommandContext {
        store: &store,
        notifier: &recorder,
        actor_id: "101",
        role: &role,
    };

    let reply = handle(Command::Begin(Some(task_id)), &ctx).await.unwrap();
    assert!(reply.starts_with(&format!("Task #{task_id} started.")));
    let task = store.get_task(task_id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::InProgress);

    let sent = recorder.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].actor_id, "900");
    assert!(sent[0].content.starts_with("Alice started task"));
}

#[tokio::test]
async fn test_begin_twice_is_rejected() {
    let (store, task_id) = store_with_task().await;
    let recorder = Recorder::default();
    let role = Role::Worker(alice());
    let ctx = CommandContext {
        store: &store,
        notifier: &recorder,
        actor_id: "101",
        role: &role,
    };

    handle(Command::Begin(Some(task_id)), &ctx).await.unwrap();
    let err = handle(Command::Begin(Some(task_id)), &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_begin_requires_worker_and_id() {
    let (store, _) = store_with_task().await;
    let recorder = Recorder::default();

    let guest = Role::Guest;
    let ctx = CommandContext {
        store: &store,
        notifier: &recorder,
        actor_id: "555",
        role: &guest,
    };
    let err = handle(Command::Begin(Some(1)), &ctx).await.unwrap_err();
    assert!(matches!(err, DispatchError::NotPermitted(_)));

    let worker = Role::Worker(alice());
    let ctx = CommandContext {
        role: &worker,
        actor_id: "101",
        ..ctx
    };
    let reply = handle(Command::Begin(None), &ctx).await.unwrap();
    assert_eq!(reply, "Usage: /begin <task id>");
}

#[tokio::test]
async fn test_task_listing_by_role() {
    let (store, task_id) = store_with_task().await;
    let recorder = Recorder::default();

    let dispatcher = Role::Dispatcher;
    let ctx = CommandContext {
        store: &store,
        notifier: &recorder,
        actor_id: "900",
        role: &dispatcher,
    };
    let reply = handle(Command::Tasks, &ctx).await.unwrap();
    assert!(reply.starts_with("Open tasks (1):"));
    assert!(reply.contains(&format!("#{task_id} [pending] Fix the sink")));

    let bob = Role::Worker(Worker {
        name: "Bob".into(),
        chat_id: 102,
    });
    let ctx = CommandContext {
        role: &bob,
        actor_id: "102",
        ..ctx
    };
    assert_eq!(handle(Command::Tasks, &ctx).await.unwrap(), "No open tasks.");
}

/// Start and settle the task in cash.
async fn complete(store: &Store, task_id: TaskId, amount: i64) {
    store.start_task(task_id, "Alice").await.unwrap();
    let outcome = Settlement::Cash {
        amount: Decimal::new(amount, 0),
    }
    .resolve(
        task_id,
        Settler {
            name: "Alice",
            contact: Some("101"),
        },
    )
    .unwrap();
    store
        .complete_task(
            task_id,
            "Alice",
            &CompletionReport {
                report: "Sink fixed".into(),
                media: None,
            },
            &outcome,
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_history_lists_completed_tasks_with_total() {
    let (store, task_id) = store_with_task().await;
    let recorder = Recorder::default();
    let role = Role::Worker(alice());
    let ctx = CommandContext {
        store: &store,
        notifier: &recorder,
        actor_id: "101",
        role: &role,
    };
    let all = || Command::History {
        period: HistoryPeriod::All,
        worker: None,
    };

    assert_eq!(
        handle(all(), &ctx).await.unwrap(),
        "No completed tasks for Alice (all time)."
    );

    complete(&store, task_id, 1500).await;
    let reply = handle(
        Command::History {
            period: HistoryPeriod::Week,
            worker: None,
        },
        &ctx,
    )
    .await
    .unwrap();
    assert!(reply.starts_with("Completed tasks for Alice (last 7 days): 1\nTotal received: 1500"));
    assert!(reply.contains(&format!("#{task_id} Fix the sink")));
    assert!(reply.contains("Report: Sink fixed"));
}

#[tokio::test]
async fn test_history_for_dispatcher_by_worker() {
    let (store, task_id) = store_with_task().await;
    store.add_worker("Bob", 102).await.unwrap();
    complete(&store, task_id, 700).await;
    let recorder = Recorder::default();
    let dispatcher = Role::Dispatcher;
    let ctx = CommandContext {
        store: &store,
        notifier: &recorder,
        actor_id: "900",
        role: &dispatcher,
    };
    let for_worker = |name: Option<&str>| Command::History {
        period: HistoryPeriod::Paid,
        worker: name.map(str::to_string),
    };

    let everyone = handle(for_worker(None), &ctx).await.unwrap();
    assert!(everyone.starts_with("Completed tasks for all workers (paid only): 1"));

    let bob = handle(for_worker(Some("Bob")), &ctx).await.unwrap();
    assert_eq!(bob, "No completed tasks for Bob (paid only).");

    let err = handle(for_worker(Some("Zed")), &ctx).await.unwrap_err();
    assert!(matches!(err, DispatchError::Validation(_)));

    let guest = Role::Guest;
    let ctx = CommandContext {
        role: &guest,
        actor_id: "555",
        ..ctx
    };
    let err = handle(for_worker(None), &ctx).await.unwrap_err();
    assert!(matches!(err, DispatchError::NotPermitted(_)));
}

#[tokio::test]
async fn test_paid_marks_debt_and_notifies_worker() {
    let (store, _) = store_with_task().await;
    let debt = store
        .create_debt(&NewDebt {
            debtor_name: "Alice".into(),
            debtor_contact: Some("101".into()),
            task_id: None,
            amount: Decimal::new(2500, 0),
            reason: "Tools".into(),
            due_date: chrono::NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
        })
        .await
        .unwrap();
    let recorder = Recorder::default();
    let dispatcher = Role::Dispatcher;
    let ctx = CommandContext {
        store: &store,
        notifier: &recorder,
        actor_id: "900",
        role: &dispatcher,
    };

    let listing = handle(Command::Debts, &ctx).await.unwrap();
    assert!(listing.starts_with("Unpaid debts (1), total 2500:"));

    let reply = handle(Command::Paid(Some(debt.id)), &ctx).await.unwrap();
    assert_eq!(
        reply,
        format!("Debt #{} (Alice, 2500) marked as paid.", debt.id)
    );
    assert_eq!(handle(Command::Debts, &ctx).await.unwrap(), "No unpaid debts.");

    let sent = recorder.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].actor_id, "101");

    drop(sent);
    let err = handle(Command::Paid(Some(debt.id)), &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::Validation(_)));
}

#[tokio::test]
async fn test_stats_are_dispatcher_only() {
    let (store, _) = store_with_task().await;
    let recorder = Recorder::default();
    let role = Role::Worker(alice());
    let ctx = CommandContext {
        store: &store,
        notifier: &recorder,
        actor_id: "101",
        role: &role,
    };
    assert!(matches!(
        handle(Command::Stats, &ctx).await,
        Err(DispatchError::NotPermitted(_))
    ));

    let dispatcher = Role::Dispatcher;
    let ctx = CommandContext {
        role: &dispatcher,
        ..ctx
    };
    let reply = handle(Command::Stats, &ctx).await.unwrap();
    assert!(reply.starts_with("Tasks: 1 pending, 0 in progress, 0 completed"));
}

#[test]
fn test_getid_and_help() {
    assert_eq!(status::handle_getid("42"), "Your chat id: 42");
    assert!(status::handle_help(&Role::Guest).contains("/login"));
    assert!(status::handle_help(&Role::Dispatcher).contains("/assign"));
    assert!(status::handle_help(&Role::Worker(alice())).contains("/finish"));
}
