//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `WORKER_MIND__*` 覆盖（双下划线表示嵌套，如
//! `WORKER_MIND__AFFECT__JOY_DECAY_RATE=0.001`）。所有段都有默认值，缺省即可运行。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub affect: AffectConfig,
    pub tools: ToolsSection,
    pub knowledge: KnowledgeSection,
    pub logging: LoggingSection,
}

/// [app] 段：状态目录与循环间隔
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: Option<String>,
    /// 情感状态、记忆、工具计数、提案与指令文件所在目录
    pub state_dir: PathBuf,
    /// 两次循环之间的等待秒数（由 runner 使用，核心循环不关心节奏）
    pub cycle_interval_secs: u64,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            state_dir: PathBuf::from("data").join("agent_state"),
            cycle_interval_secs: 5,
        }
    }
}

impl AppSection {
    pub fn affect_state_file(&self) -> PathBuf {
        self.state_dir.join("worker_mind_state.json")
    }

    pub fn memory_file(&self) -> PathBuf {
        self.state_dir.join("worker_mind_memory.json")
    }

    pub fn tool_performance_file(&self) -> PathBuf {
        self.state_dir.join("tool_performance_data.json")
    }

    pub fn last_proposal_file(&self) -> PathBuf {
        self.state_dir.join("last_proposal.json")
    }

    pub fn last_orders_file(&self) -> PathBuf {
        self.state_dir.join("last_orders.json")
    }
}

/// [llm] 段：后端选择、各角色模型、温度与 token 上限
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：openai / deepseek / mock；无 API Key 时不创建客户端（降级模式）
    pub provider: String,
    pub base_url: Option<String>,
    pub planning_model: String,
    pub task_model: String,
    pub reflection_model: String,
    pub temperature: f32,
    pub reflection_temperature: f32,
    pub max_tokens_planning: u32,
    pub max_tokens_task_decision: u32,
    pub max_tokens_kb_suggestion: u32,
    pub max_tokens_reflection: u32,
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            base_url: None,
            planning_model: "gpt-4o".to_string(),
            task_model: "gpt-4o-mini".to_string(),
            reflection_model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            reflection_temperature: 0.5,
            max_tokens_planning: 1000,
            max_tokens_task_decision: 200,
            max_tokens_kb_suggestion: 50,
            max_tokens_reflection: 300,
            request_timeout_secs: 60,
        }
    }
}

/// [affect] 段：衰减速率、耦合阈值与速率、目标成败的强化幅度
///
/// 速率单位均为「每秒」。
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AffectConfig {
    pub initial_joy: f64,
    pub initial_obedience: f64,
    pub joy_decay_rate: f64,
    pub obedience_decay_rate: f64,
    pub high_threshold: f64,
    pub low_threshold: f64,
    /// joy 高于 high_threshold 时 obedience 的增长速率
    pub coupling_rate_high: f64,
    /// joy 低于 low_threshold 时 obedience 的下降速率
    pub coupling_rate_low: f64,
    /// obedience 高于 high_threshold 时 joy 的增长速率
    pub coupling_rate_obedience: f64,
    pub joy_boost_on_success: f64,
    pub joy_penalty_on_failure: f64,
}

impl Default for AffectConfig {
    fn default() -> Self {
        Self {
            initial_joy: 0.5,
            initial_obedience: 0.5,
            joy_decay_rate: 0.0001,
            obedience_decay_rate: 0.00005,
            high_threshold: 0.7,
            low_threshold: 0.3,
            coupling_rate_high: 0.001,
            coupling_rate_low: 0.001,
            coupling_rate_obedience: 0.0005,
            joy_boost_on_success: 0.1,
            joy_penalty_on_failure: -0.05,
        }
    }
}

/// [tools] 段：工具超时与 search_web 设置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒）
    pub tool_timeout_secs: u64,
    pub search: SearchSection,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            tool_timeout_secs: 30,
            search: SearchSection::default(),
        }
    }
}

/// [tools.search] 段：搜索端点与查询参数名、超时、最大字符数、域名白名单
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchSection {
    pub endpoint: String,
    pub query_param: String,
    pub timeout_secs: u64,
    pub max_result_chars: usize,
    pub allowed_domains: Vec<String>,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            endpoint: "https://html.duckduckgo.com/html/".to_string(),
            query_param: "q".to_string(),
            timeout_secs: 15,
            max_result_chars: 8000,
            allowed_domains: vec![
                "html.duckduckgo.com".into(),
                "en.wikipedia.org".into(),
                "docs.rs".into(),
            ],
        }
    }
}

/// [knowledge] 段：知识包文件
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KnowledgeSection {
    pub pack_file: PathBuf,
}

impl Default for KnowledgeSection {
    fn default() -> Self {
        Self {
            pack_file: PathBuf::from("data")
                .join("knowledge_packs")
                .join("aac_theory_pack.json"),
        }
    }
}

/// [logging] 段：可选的日志文件（同时输出到控制台）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LoggingSection {
    pub file: Option<PathBuf>,
}

/// 从 config 目录加载配置，环境变量 WORKER_MIND__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 WORKER_MIND__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("WORKER_MIND")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
