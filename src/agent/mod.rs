//! 中层决策组件：Planner（提出计划与目标）与 TaskEngine（执行单个目标）

pub mod decision;
pub mod planner;
pub mod task_engine;

pub use decision::{parse_decision, parse_kb_suggestion, Decision, KbSuggestion};
pub use planner::{Planner, PlannerSettings};
pub use task_engine::{TaskEngine, TaskEngineSettings};
