//! 记忆层：每日活动日志、反思、工具结果计数，以及通用的 JSON 文件持久化

pub mod persistence;
pub mod store;

pub use persistence::{parse_timestamp, JsonFile};
pub use store::{
    DailyLogRecord, MemoryDocument, MemoryStore, ReflectionRecord, ReflectionSettings,
    ToolCounters, DEGRADED_REFLECTION,
};
