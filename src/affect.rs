//! 情感状态：joy / obedience 两个 [0,1] 水平
//!
//! - `adjust`：目标成败的强化（只改 joy）
//! - `decay_and_couple`：随时间线性衰减，并按阈值互相耦合
//! - 每次变更后钳制到 [0,1] 并持久化；构造时加载一次
//!
//! 本组件从不失败：持久化错误只记日志。

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::config::AffectConfig;
use crate::memory::{parse_timestamp, JsonFile};

/// 当前水平快照（供规划 / 反思 prompt 与 UI 读取）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffectLevels {
    pub joy_level: f64,
    pub obedience_level: f64,
}

/// 持久化文档：`{joy_level, obedience_level, last_update_time}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffectDocument {
    pub joy_level: f64,
    pub obedience_level: f64,
    #[serde(default)]
    pub last_update_time: Option<String>,
}

pub struct AffectState {
    joy: f64,
    obedience: f64,
    /// 上一次 decay_and_couple 的时间；None 表示从未衰减过（首轮 elapsed 视为 0）
    last_update: Option<DateTime<Local>>,
    config: AffectConfig,
    file: Option<JsonFile>,
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        return 0.0;
    }
    v.clamp(0.0, 1.0)
}

impl AffectState {
    /// 从状态文件加载；文件缺失或损坏时使用配置中的初始值
    pub fn load(path: impl AsRef<std::path::Path>, config: AffectConfig) -> Self {
        let file = JsonFile::new(path);
        let mut state = Self::in_memory(config);
        match file.load::<AffectDocument>() {
            Ok(Some(doc)) => {
                state.joy = clamp_unit(doc.joy_level);
                state.obedience = clamp_unit(doc.obedience_level);
                state.last_update = doc.last_update_time.as_deref().and_then(parse_timestamp);
                tracing::info!(
                    joy = state.joy,
                    obedience = state.obedience,
                    "Loaded affect state"
                );
            }
            Ok(None) => tracing::info!("No affect state file found, using initial levels"),
            Err(e) => tracing::warn!("{}; using initial levels", e),
        }
        state.file = Some(file);
        state
    }

    /// 不落盘的实例（测试与离线模拟用）
    pub fn in_memory(config: AffectConfig) -> Self {
        Self {
            joy: clamp_unit(config.initial_joy),
            obedience: clamp_unit(config.initial_obedience),
            last_update: None,
            config,
            file: None,
        }
    }

    pub fn joy(&self) -> f64 {
        self.joy
    }

    pub fn obedience(&self) -> f64 {
        self.obedience
    }

    pub fn last_update(&self) -> Option<DateTime<Local>> {
        self.last_update
    }

    pub fn config(&self) -> &AffectConfig {
        &self.config
    }

    pub fn levels(&self) -> AffectLevels {
        AffectLevels {
            joy_level: self.joy,
            obedience_level: self.obedience,
        }
    }

    pub fn to_document(&self) -> AffectDocument {
        AffectDocument {
            joy_level: self.joy,
            obedience_level: self.obedience,
            // 尚未衰减过时写入当前时间，文件中的时间戳始终为字符串
            last_update_time: Some(self.last_update.unwrap_or_else(Local::now).to_rfc3339()),
        }
    }

    /// 目标成败强化：joy += delta
    pub fn adjust(&mut self, delta: f64) {
        self.joy = clamp_unit(self.joy + delta);
        tracing::debug!(delta, joy = self.joy, "Joy adjusted");
        self.persist();
    }

    pub fn adjust_obedience(&mut self, delta: f64) {
        self.obedience = clamp_unit(self.obedience + delta);
        tracing::debug!(delta, obedience = self.obedience, "Obedience adjusted");
        self.persist();
    }

    /// 按 elapsed 秒数衰减并耦合，最后钳制、更新时间戳并持久化
    ///
    /// 耦合条件按顺序判断，每一步看到的是前一步之后的值。
    pub fn decay_and_couple(&mut self, elapsed_secs: f64) {
        let t = elapsed_secs.max(0.0);
        let cfg = &self.config;

        self.joy -= cfg.joy_decay_rate * t;
        self.obedience -= cfg.obedience_decay_rate * t;

        if self.joy > cfg.high_threshold {
            self.obedience += cfg.coupling_rate_high * t;
        } else if self.joy < cfg.low_threshold {
            self.obedience -= cfg.coupling_rate_low * t;
        }
        if self.obedience > cfg.high_threshold {
            self.joy += cfg.coupling_rate_obedience * t;
        }

        self.joy = clamp_unit(self.joy);
        self.obedience = clamp_unit(self.obedience);
        self.last_update = Some(Local::now());
        self.persist();
    }

    /// 以「当前时间 - 上次持久化的更新时间」为 elapsed 调用 decay_and_couple
    pub fn update_levels(&mut self) -> AffectLevels {
        let now = Local::now();
        let elapsed = self
            .last_update
            .map(|last| (now - last).num_milliseconds() as f64 / 1000.0)
            .unwrap_or(0.0);
        self.decay_and_couple(elapsed);
        tracing::info!(
            elapsed_secs = elapsed,
            joy = self.joy,
            obedience = self.obedience,
            "Affect levels updated"
        );
        self.levels()
    }

    fn persist(&self) {
        if let Some(file) = &self.file {
            file.save_logged(&self.to_document());
        }
    }
}
