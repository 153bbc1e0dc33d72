//! 核心错误类型
//!
//! 决策循环本身从不向上抛错：这里的错误只在持久化边界产生，
//! 由调用方记录日志后继续（内存中的状态在本轮剩余时间内为准，下一次写入即隐式重试）。

use std::path::PathBuf;

use thiserror::Error;

/// 持久化层可能出现的错误
#[derive(Error, Debug)]
pub enum MindError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON in {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type MindResult<T> = Result<T, MindError>;
