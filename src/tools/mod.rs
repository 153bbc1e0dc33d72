//! 工具层：Tool trait、注册表、带超时与审计的执行器，以及内置工具

pub mod echo;
pub mod executor;
pub mod knowledge;
pub mod registry;
pub mod schema;
pub mod search;

use std::sync::Arc;

pub use echo::EchoTool;
pub use executor::ToolExecutor;
pub use knowledge::{AddConceptTool, AddRuleTool, KnowledgeQueryTool};
pub use registry::{ArgKind, ArgSpec, Tool, ToolError, ToolRegistry};
pub use schema::action_decision_schema_json;
pub use search::SearchWebTool;

use crate::config::ToolsSection;
use crate::knowledge::KnowledgeBase;

/// 注册全部内置工具：echo、search_web 与三个知识库工具
pub fn default_registry(cfg: &ToolsSection, kb: Arc<KnowledgeBase>) -> ToolRegistry {
    let mut tools = ToolRegistry::new();
    tools.register(EchoTool);
    tools.register(SearchWebTool::new(&cfg.search));
    tools.register(KnowledgeQueryTool::new(kb.clone()));
    tools.register(AddConceptTool::new(kb.clone()));
    tools.register(AddRuleTool::new(kb));
    tools
}
