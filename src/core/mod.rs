//! 核心编排层：错误类型、循环状态、WorkerMind 编排器、调度 runner 与优雅关闭

pub mod error;
pub mod orchestrator;
pub mod runner;
pub mod shutdown;
pub mod state;

pub use error::{MindError, MindResult};
pub use orchestrator::{WorkerMind, IDLE_PLAN};
pub use runner::{spawn_runner, Command, RunnerHandle};
pub use shutdown::{ShutdownManager, ShutdownReason};
pub use state::{CycleTrace, Goal, GoalStatus, OrdersDocument, ProposalDocument};
