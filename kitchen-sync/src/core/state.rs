use std::sync::Arc;

use crate::core::error::Result;
use crate::core::Config;
use crate::orders::cart::storage::CartStorage;
use crate::orders::traits::{
    ActiveOrderTransport, CouponService, MenuCatalog, Notifier, OrderStore, TicketPrinter,
};
use crate::orders::{
    ActiveOrderStream, AutomationChannel, CartStore, OrderLifecycle, Reconciler,
    StaleOrderReaper, SubmissionPipeline,
};

/// External collaborators a session is wired against
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn OrderStore>,
    pub transport: Arc<dyn ActiveOrderTransport>,
    pub printer: Arc<dyn TicketPrinter>,
    pub notifier: Arc<dyn Notifier>,
    pub catalog: Arc<dyn MenuCatalog>,
    pub coupons: Option<Arc<dyn CouponService>>,
}

/// 会话状态 - 持有所有组件的共享引用
///
/// | 字段 | 说明 |
/// |------|------|
/// | config | 配置项 (不可变) |
/// | carts | 每桌购物车 (redb 持久化) |
/// | submission | 下单流水线 (单桌单飞) |
/// | lifecycle | 订单状态流转 |
/// | stream | 活动订单订阅 + 对账 + 超时清理 |
/// | automation | 语音/自动化指令通道 |
#[derive(Clone)]
pub struct EngineState {
    pub config: Config,
    pub carts: Arc<CartStore>,
    pub submission: Arc<SubmissionPipeline>,
    pub lifecycle: Arc<OrderLifecycle>,
    pub stream: Arc<ActiveOrderStream>,
    pub automation: Arc<AutomationChannel>,
}

impl EngineState {
    /// 初始化会话状态
    ///
    /// 创建工作目录并打开购物车数据库，然后按依赖顺序组装各组件。
    pub fn initialize(config: &Config, collaborators: Collaborators) -> Result<Self> {
        std::fs::create_dir_all(&config.work_dir)?;
        let storage = CartStorage::open(config.cart_db_path())?;
        Ok(Self::assemble(config, storage, collaborators))
    }

    /// 使用内存购物车存储初始化 (测试、临时会话)
    pub fn initialize_in_memory(config: &Config, collaborators: Collaborators) -> Result<Self> {
        let storage = CartStorage::open_in_memory()?;
        Ok(Self::assemble(config, storage, collaborators))
    }

    fn assemble(config: &Config, storage: CartStorage, c: Collaborators) -> Self {
        let carts = Arc::new(CartStore::new(storage));

        let mut submission = SubmissionPipeline::new(
            carts.clone(),
            c.store.clone(),
            c.printer.clone(),
            config.tax_rate_percent,
        );
        if let Some(coupons) = c.coupons {
            submission = submission.with_coupons(coupons);
        }
        let submission = Arc::new(submission);

        let lifecycle = Arc::new(OrderLifecycle::new(
            c.store.clone(),
            c.printer.clone(),
            c.notifier.clone(),
        ));

        let reconciler = Arc::new(Reconciler::new(lifecycle.clone(), config.suppression_ttl()));
        let reaper = Arc::new(StaleOrderReaper::new(
            lifecycle.clone(),
            config.stale_after(),
            config.remote_reap,
        ));
        let stream = Arc::new(
            ActiveOrderStream::new(
                c.transport,
                reconciler,
                reaper,
                c.notifier.clone(),
                config.reaper_interval(),
            )
            .with_first_push_notification(config.notification_on_first_push),
        );

        let automation = Arc::new(AutomationChannel::new(
            carts.clone(),
            submission.clone(),
            lifecycle.clone(),
            c.catalog,
            c.notifier,
        ));

        tracing::info!(
            work_dir = %config.work_dir,
            tax_rate = config.tax_rate_percent,
            stale_after_secs = config.stale_order_max_age_secs,
            remote_reap = config.remote_reap,
            "Engine state initialized"
        );

        Self {
            config: config.clone(),
            carts,
            submission,
            lifecycle,
            stream,
            automation,
        }
    }

    pub fn reconciler(&self) -> &Arc<Reconciler> {
        self.stream.reconciler()
    }
}
