//! worker-mind：单个自治 Agent 的可重复决策循环
//!
//! 模块划分：
//! - **affect**: joy / obedience 情感模型（衰减、耦合、强化）
//! - **agent**: Planner 与 TaskEngine，以及 LLM 回复解析
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: WorkerMind 编排器、循环状态、调度 runner、优雅关闭
//! - **knowledge**: 本地知识包（概念与规则）关键词查询
//! - **llm**: 文本补全抽象与实现（OpenAI 兼容 / DeepSeek / Mock）
//! - **memory**: 每日活动日志、反思、工具结果计数与 JSON 持久化
//! - **observability**: tracing 初始化
//! - **tools**: 工具箱（echo、search_web、知识库工具）与执行器

pub mod affect;
pub mod agent;
pub mod config;
pub mod core;
pub mod knowledge;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod tools;

pub use crate::core::{spawn_runner, Command, WorkerMind};
