//! 核心模块 - 引擎配置、状态和错误定义
//!
//! # 模块结构
//!
//! - [`Config`] - 引擎配置
//! - [`EngineState`] - 会话状态 (持有所有组件)
//! - [`EngineError`] - 启动错误

pub mod config;
pub mod error;
pub mod state;

pub use config::Config;
pub use error::{EngineError, Result};
pub use state::{Collaborators, EngineState};
