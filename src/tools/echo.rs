//! Echo 工具：回显文本（离线演示与测试用）

use async_trait::async_trait;
use serde_json::Value;

use crate::tools::{ArgKind, ArgSpec, Tool};

pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echo text back verbatim. Useful to report a status or a final answer."
    }

    fn args_schema(&self) -> Vec<ArgSpec> {
        vec![ArgSpec::required("text", ArgKind::String, "Text to echo")]
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        args.get("text")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| "text must be a string".to_string())
    }
}
