//! JSON 文档持久化
//!
//! 所有状态文件（情感状态、记忆、工具计数、上一次提案、上一次指令、知识包）共用同一个
//! 读写辅助：文件不存在返回 None，格式损坏返回 Malformed，由调用方决定是否回退为空结构。

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::core::{MindError, MindResult};

/// 解析 ISO-8601 时间：优先 RFC 3339，其次无时区的本地时间（如 `2024-05-01T10:00:00.123456`）
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Local>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
}

/// 单文件 JSON 存储：load 返回 Option（不存在时为 None），save 时自动创建父目录
#[derive(Debug, Clone)]
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load<T: DeserializeOwned>(&self) -> MindResult<Option<T>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&self.path).map_err(|source| MindError::Read {
            path: self.path.clone(),
            source,
        })?;
        let value = serde_json::from_str(&data).map_err(|source| MindError::Malformed {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(value))
    }

    /// 读取失败或格式损坏时记录警告并返回默认值（构造阶段绝不失败）
    pub fn load_or_default<T: DeserializeOwned + Default>(&self) -> T {
        match self.load() {
            Ok(Some(value)) => value,
            Ok(None) => {
                tracing::debug!(
                    path = %self.path.display(),
                    "state file not found, using defaults"
                );
                T::default()
            }
            Err(e) => {
                tracing::warn!("{}; reinitializing", e);
                T::default()
            }
        }
    }

    pub fn save<T: Serialize>(&self, value: &T) -> MindResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| MindError::Write {
                    path: self.path.clone(),
                    source,
                })?;
            }
        }
        let data = serde_json::to_string_pretty(value)?;
        std::fs::write(&self.path, data).map_err(|source| MindError::Write {
            path: self.path.clone(),
            source,
        })
    }

    /// 保存失败只记录错误，不打断调用方
    pub fn save_logged<T: Serialize>(&self, value: &T) {
        if let Err(e) = self.save(value) {
            tracing::error!("{}", e);
        }
    }
}
