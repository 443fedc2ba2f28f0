//! 服务层 - 内存协作者
//!
//! # 服务列表
//!
//! - [`MemoryOrderStore`] - 订单存储 + 活动订单推送 (atomic sequence, history append)
//! - [`MemoryCatalog`] - 菜单目录
//! - [`RecordingTicketPrinter`] - 记录打印的小票
//! - [`RecordingNotifier`] - 记录操作员通知
//! - [`StaticCoupons`] - 固定优惠券表
//! - [`MemoryBackend`] - 以上全部的组合, 可直接生成 `Collaborators`

pub mod catalog;
pub mod coupons;
pub mod memory_store;
pub mod notifier;
pub mod printer;

pub use catalog::MemoryCatalog;
pub use coupons::{StaticCoupon, StaticCoupons};
pub use memory_store::MemoryOrderStore;
pub use notifier::RecordingNotifier;
pub use printer::RecordingTicketPrinter;

use crate::core::Collaborators;
use crate::orders::traits::CouponService;
use std::sync::Arc;

/// A full in-memory collaborator set; typed handles stay available for inspection
#[derive(Clone, Default)]
pub struct MemoryBackend {
    pub store: Arc<MemoryOrderStore>,
    pub catalog: Arc<MemoryCatalog>,
    pub printer: Arc<RecordingTicketPrinter>,
    pub notifier: Arc<RecordingNotifier>,
    pub coupons: Arc<StaticCoupons>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            store: self.store.clone(),
            transport: self.store.clone(),
            printer: self.printer.clone(),
            notifier: self.notifier.clone(),
            catalog: self.catalog.clone(),
            coupons: Some(self.coupons.clone() as Arc<dyn CouponService>),
        }
    }
}
