//! 工具执行器
//!
//! 持有 ToolRegistry 与全局超时，execute(tool_name, args) 先解析与校验参数，再在超时内执行，
//! 失败统一转为 ToolError（NotFound / MissingArgument / InvalidArguments / Execution / Timeout）；
//! 每次调用输出结构化审计日志（JSON）。

use std::time::{Duration, Instant};

use tokio::time::timeout;

use crate::tools::{Tool, ToolError, ToolRegistry};

/// 工具执行器：对每次调用施加超时，并将结果映射为 ToolError
pub struct ToolExecutor {
    registry: ToolRegistry,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(registry: ToolRegistry, timeout_secs: u64) -> Self {
        Self {
            registry,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub async fn execute(
        &self,
        tool_name: &str,
        args: serde_json::Value,
    ) -> Result<String, ToolError> {
        let start = Instant::now();
        let args_preview = args_preview(&args);

        let result = match self.registry.resolve(tool_name, &args) {
            Ok(tool) => match timeout(self.timeout, tool.execute(args)).await {
                Ok(Ok(content)) => Ok(content),
                Ok(Err(reason)) => Err(ToolError::Execution {
                    tool: tool_name.to_string(),
                    reason,
                }),
                Err(_) => Err(ToolError::Timeout(tool_name.to_string())),
            },
            Err(e) => Err(e),
        };

        let outcome = match &result {
            Ok(_) => "ok",
            Err(ToolError::NotFound(_)) => "not_found",
            Err(ToolError::MissingArgument { .. }) | Err(ToolError::InvalidArguments { .. }) => {
                "bad_args"
            }
            Err(ToolError::Execution { .. }) => "error",
            Err(ToolError::Timeout(_)) => "timeout",
        };
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": tool_name,
            "ok": result.is_ok(),
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": args_preview,
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        result
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.registry.tool_names()
    }

    pub fn tool_descriptions(&self) -> Vec<(String, String)> {
        self.registry.tool_descriptions()
    }

    pub fn schema_json(&self) -> String {
        self.registry.to_schema_json()
    }
}

fn args_preview(args: &serde_json::Value) -> String {
    let s = args.to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::EchoTool;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct SlowTool;

    #[async_trait]
    impl Tool for SlowTool {
        fn name(&self) -> &str {
            "slow"
        }

        fn description(&self) -> &str {
            "Sleeps for a while"
        }

        async fn execute(&self, _args: Value) -> Result<String, String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("late".into())
        }
    }

    struct BrokenTool;

    #[async_trait]
    impl Tool for BrokenTool {
        fn name(&self) -> &str {
            "broken"
        }

        fn description(&self) -> &str {
            "Always fails"
        }

        async fn execute(&self, _args: Value) -> Result<String, String> {
            Err("disk on fire".into())
        }
    }

    fn executor(timeout_secs: u64) -> ToolExecutor {
        let mut tools = ToolRegistry::new();
        tools.register(EchoTool);
        tools.register(SlowTool);
        tools.register(BrokenTool);
        ToolExecutor::new(tools, timeout_secs)
    }

    #[tokio::test]
    async fn test_execute_ok() {
        let out = executor(5).execute("echo", json!({"text": "hi"})).await;
        assert_eq!(out, Ok("hi".to_string()));
    }

    #[tokio::test]
    async fn test_execute_runtime_error() {
        let err = executor(5).execute("broken", json!({})).await.unwrap_err();
        assert!(err.to_string().contains("disk on fire"));
    }

    #[tokio::test]
    async fn test_execute_timeout() {
        let err = executor(1).execute("slow", json!({})).await.unwrap_err();
        assert_eq!(err, ToolError::Timeout("slow".into()));
    }

    #[tokio::test]
    async fn test_execute_unknown() {
        let err = executor(5).execute("nope", json!({})).await.unwrap_err();
        assert_eq!(err, ToolError::NotFound("nope".into()));
    }
}
