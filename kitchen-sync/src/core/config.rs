use std::time::Duration;

/// 引擎配置 - 每个客户端会话的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./data | 工作目录 (购物车持久化数据库) |
/// | TAX_RATE_PERCENT | 8.5 | 下单税率 (百分比) |
/// | STALE_ORDER_MAX_AGE_SECS | 86400 | 超时订单阈值 |
/// | REAPER_INTERVAL_SECS | 300 | 超时订单清理周期 |
/// | SUPPRESSION_TTL_SECS | 43200 | 本地隐藏订单的有效期 (0 = 会话内永久) |
/// | REMOTE_REAP | true | 清理时是否同时写回 completed |
/// | NOTIFICATION_ON_FIRST_PUSH | false | 订阅后首次推送是否提醒新订单 |
/// | ENVIRONMENT | development | 运行环境 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_DIR | (unset) | 滚动日志目录 |
///
/// # 示例
///
/// ```ignore
/// TAX_RATE_PERCENT=5 STALE_ORDER_MAX_AGE_SECS=43200 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储购物车数据库、日志等文件
    pub work_dir: String,
    /// 税率 (百分比, 8.5 = 8.5%)
    pub tax_rate_percent: f64,
    /// Orders at least this old are force-completed instead of displayed
    pub stale_order_max_age_secs: u64,
    /// Background reaper tick
    pub reaper_interval_secs: u64,
    /// Suppressed ids expire after this long; 0 keeps them for the whole session
    pub suppression_ttl_secs: u64,
    /// Whether the reaper also persists `completed` for stale orders
    pub remote_reap: bool,
    /// Alert on the first push after subscribing (off: the first push is a baseline)
    pub notification_on_first_push: bool,
    /// 运行环境: development | staging | production
    pub environment: String,
    pub log_level: String,
    pub log_dir: Option<String>,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置或无法解析，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into()),
            tax_rate_percent: env_parse("TAX_RATE_PERCENT", 8.5),
            stale_order_max_age_secs: env_parse("STALE_ORDER_MAX_AGE_SECS", 24 * 60 * 60),
            reaper_interval_secs: env_parse("REAPER_INTERVAL_SECS", 300),
            suppression_ttl_secs: env_parse("SUPPRESSION_TTL_SECS", 12 * 60 * 60),
            remote_reap: env_parse("REMOTE_REAP", true),
            notification_on_first_push: env_parse("NOTIFICATION_ON_FIRST_PUSH", false),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok(),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, tax_rate_percent: f64) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.tax_rate_percent = tax_rate_percent;
        config
    }

    /// Path of the durable cart slot database
    pub fn cart_db_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.work_dir).join("carts.redb")
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_order_max_age_secs)
    }

    pub fn reaper_interval(&self) -> Duration {
        Duration::from_secs(self.reaper_interval_secs.max(1))
    }

    /// None means suppression lasts until the session ends
    pub fn suppression_ttl(&self) -> Option<Duration> {
        (self.suppression_ttl_secs > 0).then(|| Duration::from_secs(self.suppression_ttl_secs))
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
