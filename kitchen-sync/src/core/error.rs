use crate::orders::cart::storage::CartStorageError;
use thiserror::Error;

/// 引擎启动错误
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("工作目录不可用: {0}")]
    WorkDir(#[from] std::io::Error),

    #[error("购物车存储初始化失败: {0}")]
    Storage(#[from] CartStorageError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
