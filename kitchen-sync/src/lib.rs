//! Kitchen Sync - 订单生命周期与后厨实时同步引擎
//!
//! # 架构概述
//!
//! - **购物车** (`orders::cart`): 每桌草稿, 阶段守卫, redb 持久化
//! - **状态机** (`orders::state_machine`): placed → confirmed → preparing → ready → completed
//! - **下单流水线** (`orders::submission`): 购物车 → 订单, 单桌单飞
//! - **订阅与对账** (`orders::stream`, `orders::reconcile`, `orders::reaper`): 后厨视图
//! - **自动化通道** (`orders::automation`): 语音指令, 校验 + 纠正
//!
//! # 模块结构
//!
//! ```text
//! kitchen-sync/src/
//! ├── core/          # 配置、会话状态、错误
//! ├── orders/        # 订单引擎
//! ├── services/      # 内存协作者 (存储、推送、打印、通知、优惠券)
//! └── utils/         # 日志、时间
//! ```

pub mod core;
pub mod orders;
pub mod services;
pub mod utils;

// Re-export 公共类型
pub use core::{Collaborators, Config, EngineError, EngineState};
pub use orders::{OrderError, OrderResult};
pub use services::MemoryBackend;

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// 设置运行环境: 加载 .env, 初始化日志
pub fn setup_environment() -> Config {
    // .env is optional
    dotenv::dotenv().ok();
    let config = Config::from_env();
    init_logger_with_file(Some(&config.log_level), config.log_dir.as_deref());
    config
}
