use kitchen_sync::orders::{
    CartKey, CartPhase, ConnectionState, KitchenView, MutationMode, Notification, Operator, Order,
    OrderOrigin, OrderStatus, SubmitContext,
};
use kitchen_sync::utils::time::now_millis;
use kitchen_sync::{Config, EngineState, MemoryBackend};
use shared::models::MenuItem;
use std::sync::Arc;
use std::time::Duration;

const TENANT: &str = "t-1";
const HOUR: i64 = 3_600_000;

fn engine() -> (EngineState, MemoryBackend) {
    let mut config = Config::with_overrides("./data", 8.5);
    config.stale_order_max_age_secs = 24 * 60 * 60;
    config.reaper_interval_secs = 300;
    config.suppression_ttl_secs = 0;
    config.remote_reap = true;
    config.notification_on_first_push = false;

    let backend = MemoryBackend::new();
    backend
        .catalog
        .set_menu(TENANT, vec![MenuItem::new("m-naan", "Garlic Naan", 80.0)]);
    let state = EngineState::initialize_in_memory(&config, backend.collaborators()).unwrap();
    (state, backend)
}

fn noop() -> Arc<dyn Fn(&KitchenView) + Send + Sync> {
    Arc::new(|_: &KitchenView| {})
}

async fn place(state: &EngineState, table: &str) -> Order {
    let key = CartKey::new(TENANT, table);
    state
        .carts
        .add_line(
            &key,
            &MenuItem::new("m-naan", "Garlic Naan", 80.0),
            1,
            vec![],
            MutationMode::Guarded(CartPhase::NewOrder),
        )
        .unwrap();
    state
        .submission
        .submit(&key, SubmitContext::staff(Operator::new("staff-1", "Asha")))
        .await
        .unwrap()
}

fn aged_order(id: &str, age_millis: i64) -> Order {
    let created_at = now_millis() - age_millis;
    Order {
        id: id.into(),
        tenant_id: TENANT.into(),
        sequence_number: 99,
        table_id: Some("T9".into()),
        origin: OrderOrigin::Staff,
        status: OrderStatus::Placed,
        lines: vec![],
        subtotal: 0.0,
        tax: 0.0,
        discount: 0.0,
        total: 0.0,
        payment: None,
        notes: None,
        cancel_reason: None,
        is_amendment: false,
        history: vec![],
        created_at,
        updated_at: created_at,
    }
}

/// Poll until `check` holds; the in-memory backend settles within a few yields
async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}

#[tokio::test]
async fn test_suppressed_order_never_reappears() {
    let (state, backend) = engine();
    let dismissed = place(&state, "T1").await;

    let sub = state.stream.subscribe(TENANT, noop()).await.unwrap();
    let mut views = sub.views();
    views.wait_for(|v| v.contains(&dismissed.id)).await.unwrap();

    // keep the order active remotely so later pushes still carry it
    backend.store.set_fail_status_updates(true);
    state
        .reconciler()
        .suppress(&dismissed.id, Operator::new("staff-1", "Asha"))
        .await
        .unwrap();
    assert!(!state.reconciler().view().contains(&dismissed.id));
    backend.store.set_fail_status_updates(false);

    let other = place(&state, "T2").await;
    let view = views
        .wait_for(|v| v.contains(&other.id))
        .await
        .unwrap()
        .clone();
    assert!(!view.contains(&dismissed.id));
    assert_eq!(view.suppressed_count, 1);
    assert_eq!(
        backend.store.order(&dismissed.id).map(|o| o.status),
        Some(OrderStatus::Placed)
    );

    // explicit undo brings it back from the current fresh list
    assert!(state.reconciler().unsuppress(&dismissed.id));
    assert!(state.reconciler().view().contains(&dismissed.id));
}

#[tokio::test]
async fn test_dismissal_completes_remotely() {
    let (state, backend) = engine();
    let order = place(&state, "T1").await;

    let sub = state.stream.subscribe(TENANT, noop()).await.unwrap();
    let mut views = sub.views();
    views.wait_for(|v| v.contains(&order.id)).await.unwrap();

    state
        .reconciler()
        .suppress(&order.id, Operator::new("staff-1", "Asha"))
        .await
        .unwrap();

    let stored = backend.store.order(&order.id).unwrap();
    assert_eq!(stored.status, OrderStatus::Completed);
    assert!(stored.payment.is_none());
    assert_eq!(
        stored.history.last().and_then(|h| h.note.as_deref()),
        Some("dismissed from kitchen view")
    );
    views
        .wait_for(|v| v.visible.is_empty() && v.suppressed_count == 1)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_stale_order_excluded_on_first_push() {
    let (state, backend) = engine();
    backend.store.insert_order(aged_order("o-stale", 25 * HOUR));
    let fresh = place(&state, "T1").await;

    let sub = state.stream.subscribe(TENANT, noop()).await.unwrap();
    let view = sub
        .views()
        .wait_for(|v| v.push_count >= 1)
        .await
        .unwrap()
        .clone();
    assert!(view.contains(&fresh.id));
    assert!(!view.contains("o-stale"));
    assert_eq!(view.stats.total_active, 1);

    assert!(
        eventually(|| backend
            .store
            .order("o-stale")
            .is_some_and(|o| o.status == OrderStatus::Completed))
        .await
    );
    let reaped = backend.store.order("o-stale").unwrap();
    let note = reaped.history[0].note.clone().unwrap_or_default();
    assert!(note.starts_with("auto-completed stale order"), "{note}");
    assert_eq!(backend.notifier.new_order_alerts(), 0);
}

#[tokio::test]
async fn test_order_just_under_threshold_stays_visible() {
    let (state, backend) = engine();
    backend.store.insert_order(aged_order("o-old", 23 * HOUR));

    let sub = state.stream.subscribe(TENANT, noop()).await.unwrap();
    let view = sub
        .views()
        .wait_for(|v| v.push_count >= 1)
        .await
        .unwrap()
        .clone();
    assert!(view.contains("o-old"));
    assert!(view.stats.oldest_order_age_ms.is_some_and(|age| age >= 23 * HOUR));
}

#[tokio::test]
async fn test_new_orders_alert_after_baseline() {
    let (state, backend) = engine();
    place(&state, "T1").await;

    let sub = state.stream.subscribe(TENANT, noop()).await.unwrap();
    let mut views = sub.views();
    views.wait_for(|v| v.visible.len() == 1).await.unwrap();
    assert_eq!(backend.notifier.new_order_alerts(), 0);

    let second = place(&state, "T2").await;
    views.wait_for(|v| v.visible.len() == 2).await.unwrap();

    let alerts: Vec<Notification> = backend
        .notifier
        .notifications()
        .into_iter()
        .filter(|n| matches!(n, Notification::NewOrders { .. }))
        .collect();
    assert_eq!(
        alerts,
        vec![Notification::NewOrders {
            tenant_id: TENANT.into(),
            delta: 1,
            order_ids: vec![second.id],
        }]
    );
}

#[tokio::test]
async fn test_completed_orders_leave_the_view() {
    let (state, _) = engine();
    let order = place(&state, "T1").await;

    let sub = state.stream.subscribe(TENANT, noop()).await.unwrap();
    let mut views = sub.views();
    views.wait_for(|v| v.contains(&order.id)).await.unwrap();

    let waiter = Operator::new("staff-1", "Asha");
    let ctx = kitchen_sync::orders::TransitionContext::new(waiter, now_millis())
        .with_reason("kitchen closed");
    state
        .lifecycle
        .transition(&order.id, OrderStatus::Cancelled, &ctx)
        .await
        .unwrap();
    views.wait_for(|v| !v.contains(&order.id)).await.unwrap();
}

#[tokio::test]
async fn test_disconnect_keeps_data_and_resubscribe_recovers() {
    let (state, backend) = engine();
    let order = place(&state, "T1").await;

    let sub = state.stream.subscribe(TENANT, noop()).await.unwrap();
    let mut connection = sub.connection();
    sub.views().wait_for(|v| v.contains(&order.id)).await.unwrap();

    backend.store.disconnect(TENANT, "network lost");
    connection
        .wait_for(|c| *c == ConnectionState::Disconnected)
        .await
        .unwrap();
    assert!(state.reconciler().view().contains(&order.id));

    let resub = state.stream.subscribe(TENANT, noop()).await.unwrap();
    let view = resub
        .views()
        .wait_for(|v| v.connection == ConnectionState::Connected && v.push_count >= 1)
        .await
        .unwrap()
        .clone();
    assert!(view.contains(&order.id));
    assert!(!sub.is_active());
    resub.shutdown().await;
}
