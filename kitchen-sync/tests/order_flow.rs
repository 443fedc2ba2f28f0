use kitchen_sync::orders::{
    CartKey, CartOutcome, CartPhase, MutationMode, Operator, OrderError, OrderStatus, OrderStore,
    PaymentInput, SubmitContext, TicketKind, TransitionContext, ValidationError,
};
use kitchen_sync::utils::time::now_millis;
use kitchen_sync::{Config, EngineState, MemoryBackend};
use shared::models::{MenuItem, VariantGroup, VariantOption};
use shared::order::VariantSelection;
use std::time::Duration;

const TENANT: &str = "t-1";

fn menu() -> Vec<MenuItem> {
    vec![
        MenuItem::new("m-naan", "Garlic Naan", 80.0),
        MenuItem::new("m-wings", "Chicken Wings", 250.0),
        MenuItem::new("m-coke", "Coca Cola", 60.0),
        MenuItem::new("m-lassi", "Mango Lassi", 60.0).with_variant_group(VariantGroup {
            id: "g-size".into(),
            name: "Size".into(),
            required: true,
            options: vec![
                VariantOption {
                    name: "Regular".into(),
                    price_modifier: 0.0,
                },
                VariantOption {
                    name: "Large".into(),
                    price_modifier: 20.0,
                },
            ],
        }),
    ]
}

fn config(tax_rate_percent: f64) -> Config {
    let mut config = Config::with_overrides("./data", tax_rate_percent);
    config.stale_order_max_age_secs = 24 * 60 * 60;
    config.reaper_interval_secs = 300;
    config.suppression_ttl_secs = 0;
    config.remote_reap = true;
    config.notification_on_first_push = false;
    config
}

fn engine(tax_rate_percent: f64) -> (EngineState, MemoryBackend) {
    let backend = MemoryBackend::new();
    backend.catalog.set_menu(TENANT, menu());
    let state = EngineState::initialize_in_memory(&config(tax_rate_percent), backend.collaborators())
        .unwrap();
    (state, backend)
}

fn item(id: &str) -> MenuItem {
    menu().into_iter().find(|m| m.id == id).unwrap()
}

fn guarded() -> MutationMode {
    MutationMode::Guarded(CartPhase::NewOrder)
}

fn waiter() -> Operator {
    Operator::new("staff-1", "Asha")
}

fn ctx() -> TransitionContext {
    TransitionContext::new(waiter(), now_millis())
}

#[tokio::test]
async fn test_same_item_merges_into_one_line() {
    let (state, _) = engine(8.5);
    let table = CartKey::new(TENANT, "T1");

    state.carts.add_line(&table, &item("m-naan"), 1, vec![], guarded()).unwrap();
    let lines = state
        .carts
        .add_line(&table, &item("m-naan"), 1, vec![], guarded())
        .unwrap()
        .into_lines()
        .unwrap();

    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity, 2);
    assert_eq!(lines[0].total, 160.0);
}

#[tokio::test]
async fn test_subtotal_is_sum_of_line_totals() {
    let (state, _) = engine(8.5);
    let table = CartKey::new(TENANT, "T1");
    let large = VariantSelection {
        group_id: "g-size".into(),
        group_name: "Size".into(),
        option_name: "Large".into(),
        price_modifier: 20.0,
    };

    state.carts.add_line(&table, &item("m-naan"), 2, vec![], guarded()).unwrap();
    state.carts.add_line(&table, &item("m-coke"), 3, vec![], guarded()).unwrap();
    state
        .carts
        .add_line(&table, &item("m-lassi"), 1, vec![large], guarded())
        .unwrap();

    let lines = state.carts.list(&table);
    let sum: f64 = lines.iter().map(|l| l.total).sum();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[2].total, 80.0);
    assert_eq!(state.carts.subtotal(&table), 420.0);
    assert_eq!(state.carts.subtotal(&table), sum);
}

#[tokio::test]
async fn test_required_variant_and_locked_cart() {
    let (state, _) = engine(8.5);
    let table = CartKey::new(TENANT, "T1");

    let outcome = state
        .carts
        .add_line(&table, &item("m-lassi"), 1, vec![], guarded())
        .unwrap();
    assert!(matches!(outcome, CartOutcome::SelectionRequired { .. }));

    let outcome = state
        .carts
        .add_line(&table, &item("m-naan"), 1, vec![], MutationMode::Guarded(CartPhase::Locked))
        .unwrap();
    assert!(!outcome.is_applied());
    assert!(state.carts.is_empty(&table));
}

#[tokio::test]
async fn test_empty_submit_leaves_cart_unchanged() {
    let (state, backend) = engine(8.5);
    let table = CartKey::new(TENANT, "T1");
    let other = CartKey::new(TENANT, "T2");
    state.carts.add_line(&other, &item("m-naan"), 1, vec![], guarded()).unwrap();

    let err = state
        .submission
        .submit(&table, SubmitContext::staff(waiter()))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::Validation(ValidationError::CartEmpty)));
    assert!(state.carts.is_empty(&table));
    assert_eq!(state.carts.list(&other).len(), 1);
    assert!(backend.store.table_orders(TENANT, "T1").is_empty());
}

#[tokio::test]
async fn test_naan_order_totals() {
    let (state, backend) = engine(8.5);
    let table = CartKey::new(TENANT, "T4");
    state.carts.add_line(&table, &item("m-naan"), 2, vec![], guarded()).unwrap();

    let order = state
        .submission
        .submit(&table, SubmitContext::staff(waiter()))
        .await
        .unwrap();

    assert_eq!(order.subtotal, 160.0);
    assert_eq!(order.tax, 13.6);
    assert_eq!(order.total, 173.6);
    assert_eq!(order.status, OrderStatus::Placed);
    assert!(state.carts.is_empty(&table));

    for _ in 0..20 {
        if backend.printer.count(TicketKind::Kitchen) == 1 {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(backend.printer.count(TicketKind::Kitchen), 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_submits_single_flight() {
    let (state, backend) = engine(8.5);
    let table = CartKey::new(TENANT, "T4");
    state.carts.add_line(&table, &item("m-naan"), 2, vec![], guarded()).unwrap();
    backend.store.set_create_delay(Some(Duration::from_millis(100)));

    let (a, b) = tokio::join!(
        state.submission.submit(&table, SubmitContext::staff(waiter())),
        state.submission.submit(&table, SubmitContext::staff(waiter()))
    );

    let conflicts = [&a, &b]
        .iter()
        .filter(|r| matches!(r, Err(OrderError::ConcurrencyConflict { .. })))
        .count();
    assert_eq!(conflicts, 1);
    assert!(a.is_ok() || b.is_ok());
    assert_eq!(backend.store.active_orders(TENANT).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_preparing_requires_confirmed() {
    let (state, _) = engine(8.5);
    let table = CartKey::new(TENANT, "T4");
    state.carts.add_line(&table, &item("m-naan"), 1, vec![], guarded()).unwrap();
    let order = state
        .submission
        .submit(&table, SubmitContext::staff(waiter()))
        .await
        .unwrap();

    let err = state
        .lifecycle
        .transition(&order.id, OrderStatus::Preparing, &ctx())
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::InvalidTransition { .. }));

    state
        .lifecycle
        .transition(&order.id, OrderStatus::Confirmed, &ctx())
        .await
        .unwrap();
    let preparing = state
        .lifecycle
        .transition(&order.id, OrderStatus::Preparing, &ctx())
        .await
        .unwrap();
    assert_eq!(preparing.status, OrderStatus::Preparing);
}

#[tokio::test]
async fn test_full_lifecycle_cash_payment() {
    let (state, backend) = engine(8.5);
    let table = CartKey::new(TENANT, "T4");
    state.carts.add_line(&table, &item("m-naan"), 2, vec![], guarded()).unwrap();
    let order = state
        .submission
        .submit(&table, SubmitContext::staff(waiter()))
        .await
        .unwrap();

    for target in [
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
    ] {
        state.lifecycle.transition(&order.id, target, &ctx()).await.unwrap();
    }
    let done = state
        .lifecycle
        .transition(
            &order.id,
            OrderStatus::Completed,
            &ctx().with_payment(PaymentInput::new("cash", 200.0)),
        )
        .await
        .unwrap();

    assert!(done.status.is_terminal());
    let payment = done.payment.as_ref().unwrap();
    assert_eq!(payment.final_total, 173.6);
    assert_eq!(payment.change, 26.4);
    assert_eq!(done.history.len(), 4);

    let err = state
        .lifecycle
        .transition(&order.id, OrderStatus::Preparing, &ctx())
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::InvalidTransition { .. }));
    assert_eq!(
        backend.store.order(&order.id).map(|o| o.status),
        Some(OrderStatus::Completed)
    );
}

#[tokio::test]
async fn test_cancel_from_preparing() {
    let (state, _) = engine(8.5);
    let table = CartKey::new(TENANT, "T4");
    state.carts.add_line(&table, &item("m-coke"), 1, vec![], guarded()).unwrap();
    let order = state
        .submission
        .submit(&table, SubmitContext::staff(waiter()))
        .await
        .unwrap();

    state
        .lifecycle
        .transition(&order.id, OrderStatus::Confirmed, &ctx())
        .await
        .unwrap();
    state
        .lifecycle
        .transition(&order.id, OrderStatus::Preparing, &ctx())
        .await
        .unwrap();
    let cancelled = state
        .lifecycle
        .transition(
            &order.id,
            OrderStatus::Cancelled,
            &ctx().with_reason("guest left"),
        )
        .await
        .unwrap();
    assert_eq!(cancelled.cancel_reason.as_deref(), Some("guest left"));
    assert!(cancelled.payment.is_none());
}

#[tokio::test]
async fn test_voice_two_wings() {
    let (state, _) = engine(0.0);
    let table = CartKey::new(TENANT, "P1");

    let added = state
        .automation
        .force_add_item(&table, "2 wings", None)
        .await
        .unwrap();
    assert_eq!(added.item.name, "Chicken Wings");
    assert_eq!(added.quantity, 2);

    let order = state
        .automation
        .force_submit(&table, SubmitContext::default())
        .await
        .unwrap();
    assert_eq!(order.total, 500.0);
    assert_eq!(order.lines[0].name, "Chicken Wings");
    assert_eq!(order.lines[0].quantity, 2);
}

#[tokio::test]
async fn test_amendment_links_to_occupied_table() {
    let (state, backend) = engine(8.5);
    let table = CartKey::new(TENANT, "T4");

    state.carts.add_line(&table, &item("m-naan"), 1, vec![], guarded()).unwrap();
    let first = state
        .submission
        .submit(&table, SubmitContext::staff(waiter()))
        .await
        .unwrap();

    state
        .carts
        .add_line(&table, &item("m-coke"), 1, vec![], MutationMode::Guarded(CartPhase::AddingMore))
        .unwrap();
    let second = state
        .submission
        .submit(&table, SubmitContext::staff(waiter()).amendment())
        .await
        .unwrap();

    assert!(second.is_amendment);
    assert_eq!(second.sequence_number, first.sequence_number + 1);
    assert_eq!(
        backend.store.table_orders(TENANT, "T4"),
        vec![first.id, second.id]
    );
}

#[tokio::test]
async fn test_cart_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(8.5);
    config.work_dir = dir.path().to_string_lossy().into_owned();
    let table = CartKey::new(TENANT, "T9");

    {
        let backend = MemoryBackend::new();
        let state = EngineState::initialize(&config, backend.collaborators()).unwrap();
        state.carts.add_line(&table, &item("m-naan"), 3, vec![], guarded()).unwrap();
    }

    let backend = MemoryBackend::new();
    let state = EngineState::initialize(&config, backend.collaborators()).unwrap();
    assert!(state.carts.is_empty(&table));
    let restored = state.carts.restore(&table).unwrap();
    assert_eq!(restored.len(), 1);
    assert_eq!(restored[0].quantity, 3);
    assert_eq!(state.carts.list(&table), restored);
    assert_eq!(state.carts.drafts(TENANT).unwrap().len(), 1);
}
