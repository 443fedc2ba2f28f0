use std::sync::Arc;

use anyhow::Context;
use kitchen_sync::orders::{
    CartKey, CartPhase, KitchenView, MutationMode, Operator, OrderStatus, PaymentInput,
    SubmitContext, TransitionContext,
};
use kitchen_sync::utils::time::now_millis;
use kitchen_sync::{EngineState, MemoryBackend, setup_environment};
use shared::models::MenuItem;

const TENANT: &str = "demo-restaurant";

fn demo_menu() -> Vec<MenuItem> {
    vec![
        MenuItem::new("m-naan", "Garlic Naan", 80.0),
        MenuItem::new("m-wings", "Chicken Wings", 250.0),
        MenuItem::new("m-paneer", "Paneer Tikka", 280.0),
        MenuItem::new("m-coke", "Coca Cola", 60.0),
    ]
}

fn print_view(view: &KitchenView) {
    println!(
        "[{:?}] push #{} | {} visible | {} suppressed",
        view.connection,
        view.push_count,
        view.stats.total_active,
        view.suppressed_count
    );
    for order in &view.visible {
        println!(
            "  #{:<3} {:<5} {:<10} {:>8.2}  {} item(s)",
            order.sequence_number,
            order.table_id.as_deref().unwrap_or("-"),
            order.status,
            order.total,
            order.item_count()
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 设置环境 (dotenv, 日志) 并加载配置
    let config = setup_environment();
    tracing::info!("Kitchen sync demo starting...");

    // 2. 内存协作者 + 会话状态
    let backend = MemoryBackend::new();
    backend.catalog.set_menu(TENANT, demo_menu());
    let state = EngineState::initialize(&config, backend.collaborators())
        .context("failed to initialize engine state")?;

    // 3. 订阅后厨视图
    let subscription = state
        .stream
        .subscribe(TENANT, Arc::new(print_view))
        .await
        .context("failed to subscribe to active orders")?;
    let mut views = subscription.views();

    // 4. 服务员点单: 2 x Garlic Naan
    let waiter = Operator::new("staff-1", "Asha");
    let table = CartKey::new(TENANT, "T4");
    let menu = demo_menu();
    state
        .carts
        .add_line(&table, &menu[0], 2, vec![], MutationMode::Guarded(CartPhase::NewOrder))?;
    let order = state
        .submission
        .submit(&table, SubmitContext::staff(waiter.clone()))
        .await?;
    println!(
        "Placed order #{}: subtotal {:.2}, tax {:.2}, total {:.2}",
        order.sequence_number, order.subtotal, order.tax, order.total
    );

    // 5. 语音指令: "2 wings" 加到另一桌并下单
    let patio = CartKey::new(TENANT, "P1");
    match state.automation.force_add_item(&patio, "2 wings", None).await {
        Ok(added) => println!("Voice added {} x {}", added.quantity, added.item.name),
        Err(e) => println!("{}", e.manual_fallback),
    }
    if let Err(e) = state.automation.force_submit(&patio, SubmitContext::default()).await {
        println!("{}", e.manual_fallback);
    }

    // 6. 等待两单都出现在视图中
    views
        .wait_for(|v| v.stats.total_active >= 2)
        .await
        .context("view channel closed")?;

    // 7. 走完生命周期
    for target in [
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
    ] {
        let ctx = TransitionContext::new(waiter.clone(), now_millis());
        state.lifecycle.transition(&order.id, target, &ctx).await?;
    }
    let ctx = TransitionContext::new(waiter.clone(), now_millis())
        .with_payment(PaymentInput::new("cash", 200.0));
    let paid = state
        .lifecycle
        .transition(&order.id, OrderStatus::Completed, &ctx)
        .await?;
    if let Some(payment) = &paid.payment {
        println!("Paid {:.2} cash, change {:.2}", payment.amount_received, payment.change);
    }

    views
        .wait_for(|v| !v.contains(&order.id))
        .await
        .context("view channel closed")?;

    // 8. 关闭订阅
    subscription.shutdown().await;
    println!(
        "Tickets printed: {}, notifications: {}",
        backend.printer.printed().len(),
        backend.notifier.notifications().len()
    );
    Ok(())
}
