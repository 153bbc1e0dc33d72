//! 情节记忆：每日活动日志、反思记录、工具结果计数
//!
//! 两个 JSON 文件：
//! - 记忆文件 `{daily_logs: [...], reflections: [...]}`
//! - 工具计数 `{tool_usage: {...}, tool_success: {...}}`
//!
//! 加载时文件缺失或损坏一律视为空结构；写入失败只记日志，内存状态为准。
//! 内部用 RwLock 保护，TaskEngine 与编排器可共享同一个 `Arc<MemoryStore>`。

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use chrono::{Duration, Local};
use serde::{Deserialize, Serialize};

use crate::llm::{CompletionRequest, LlmClient};
use crate::memory::{parse_timestamp, JsonFile};

/// 无补全能力时的反思结果（不写入 reflections）
pub const DEGRADED_REFLECTION: &str = "Basic reflection: No LLM available to analyze performance.";

const REFLECTION_SYSTEM_PROMPT: &str =
    "You are an AI reflecting on your past performance. Provide concise insights.";

/// 一轮循环的活动记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyLogRecord {
    pub date: String,
    pub activities: Vec<String>,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReflectionRecord {
    pub timestamp: String,
    pub reflection: String,
}

/// 记忆文件内容；也作为只读快照交给展示层
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryDocument {
    #[serde(default)]
    pub daily_logs: Vec<DailyLogRecord>,
    #[serde(default)]
    pub reflections: Vec<ReflectionRecord>,
}

/// 工具结果计数：每个 key 的 usage 与 success，success ≤ usage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCounters {
    #[serde(default)]
    pub tool_usage: BTreeMap<String, u64>,
    #[serde(default)]
    pub tool_success: BTreeMap<String, u64>,
}

impl ToolCounters {
    pub fn usage(&self, key: &str) -> u64 {
        self.tool_usage.get(key).copied().unwrap_or(0)
    }

    pub fn success(&self, key: &str) -> u64 {
        self.tool_success.get(key).copied().unwrap_or(0)
    }

    fn record(&mut self, key: &str, success: bool) {
        let usage = self.tool_usage.entry(key.to_string()).or_insert(0);
        *usage += 1;
        let usage = *usage;
        let hits = self.tool_success.entry(key.to_string()).or_insert(0);
        if success {
            *hits += 1;
        }
        // 外部文件可能被手改过，保持 success ≤ usage
        if *hits > usage {
            *hits = usage;
        }
    }
}

/// 反思请求参数（来自 [llm] 段）
#[derive(Debug, Clone)]
pub struct ReflectionSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ReflectionSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.5,
            max_tokens: 300,
        }
    }
}

pub struct MemoryStore {
    memory: RwLock<MemoryDocument>,
    counters: RwLock<ToolCounters>,
    memory_file: JsonFile,
    counters_file: JsonFile,
    llm: Option<Arc<dyn LlmClient>>,
    reflection: ReflectionSettings,
}

impl MemoryStore {
    pub fn load(
        memory_path: impl AsRef<Path>,
        counters_path: impl AsRef<Path>,
        llm: Option<Arc<dyn LlmClient>>,
        reflection: ReflectionSettings,
    ) -> Self {
        let memory_file = JsonFile::new(memory_path);
        let counters_file = JsonFile::new(counters_path);
        let memory: MemoryDocument = memory_file.load_or_default();
        let counters: ToolCounters = counters_file.load_or_default();
        tracing::info!(
            daily_logs = memory.daily_logs.len(),
            reflections = memory.reflections.len(),
            tools = counters.tool_usage.len(),
            "Memory loaded"
        );
        Self {
            memory: RwLock::new(memory),
            counters: RwLock::new(counters),
            memory_file,
            counters_file,
            llm,
            reflection,
        }
    }

    /// 即时日志（不落盘），用于任务尝试摘要等细粒度记录
    pub fn add_log_entry(&self, entry: &str) {
        tracing::info!(target: "worker_mind::memory", "Log: {}", entry);
    }

    /// 追加一条每日活动记录（整轮循环的活动序列）
    pub fn append_daily_log(&self, activities: Vec<String>) {
        let now = Local::now();
        let record = DailyLogRecord {
            date: now.format("%Y-%m-%d").to_string(),
            activities,
            timestamp: now.to_rfc3339(),
        };
        let date = record.date.clone();
        let mut memory = self.memory.write().unwrap_or_else(|e| e.into_inner());
        memory.daily_logs.push(record);
        self.memory_file.save_logged(&*memory);
        tracing::info!(date = %date, "Daily activities logged");
    }

    /// 最近 window_days 天内的活动记录（按时间先后）；时间戳无法解析的记录跳过
    pub fn recent_activities(&self, window_days: i64) -> Vec<DailyLogRecord> {
        let cutoff = Local::now() - Duration::days(window_days);
        let memory = self.memory.read().unwrap_or_else(|e| e.into_inner());
        memory
            .daily_logs
            .iter()
            .filter(|log| parse_timestamp(&log.timestamp).is_some_and(|t| t >= cutoff))
            .cloned()
            .collect()
    }

    pub fn record_tool_outcome(&self, tool_key: &str, success: bool) {
        let mut counters = self.counters.write().unwrap_or_else(|e| e.into_inner());
        counters.record(tool_key, success);
        self.counters_file.save_logged(&*counters);
        tracing::debug!(tool = tool_key, success, "Tool outcome recorded");
    }

    pub fn append_reflection(&self, text: &str) {
        let record = ReflectionRecord {
            timestamp: Local::now().to_rfc3339(),
            reflection: text.to_string(),
        };
        let mut memory = self.memory.write().unwrap_or_else(|e| e.into_inner());
        memory.reflections.push(record);
        self.memory_file.save_logged(&*memory);
    }

    /// 调用补全能力做反思；成功时写入 reflections，失败或未配置时返回说明文本且不写入
    pub async fn reflect(&self, prompt: &str) -> String {
        let Some(llm) = &self.llm else {
            tracing::warn!("LLM client not available for reflection");
            return DEGRADED_REFLECTION.to_string();
        };

        let request = CompletionRequest::new(REFLECTION_SYSTEM_PROMPT, prompt)
            .model(&self.reflection.model)
            .temperature(self.reflection.temperature)
            .max_tokens(self.reflection.max_tokens);

        match llm.complete(&request).await {
            Ok(text) => {
                self.append_reflection(&text);
                tracing::info!("Reflection saved");
                text
            }
            Err(e) => {
                tracing::error!("Reflection failed: {}", e);
                format!("Error during reflection: {}", e)
            }
        }
    }

    pub fn tool_counters(&self) -> ToolCounters {
        self.counters.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn full_dump(&self) -> MemoryDocument {
        self.memory.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
