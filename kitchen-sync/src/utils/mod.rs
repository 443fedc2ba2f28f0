//! 工具模块 - 日志与时间等通用工具

pub mod logger;
pub mod time;
