//! 工具注册表
//!
//! 所有工具实现 Tool trait（name / description / args_schema / execute），由 ToolRegistry 按名注册与查找，
//! ToolExecutor 在调用时校验参数、加超时并统一转 ToolError。

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// 工具调用失败的三类原因（外加超时）；调用方一律转成 `(false, message)`
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("Tool '{0}' not found")]
    NotFound(String),

    #[error("Missing required argument '{arg}' for tool '{tool}'")]
    MissingArgument { tool: String, arg: String },

    #[error("Invalid arguments for tool '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("An error occurred during tool '{tool}' execution: {reason}")]
    Execution { tool: String, reason: String },

    #[error("Tool '{0}' timed out")]
    Timeout(String),
}

/// 参数类型（JSON 层面）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl ArgKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArgKind::String => "string",
            ArgKind::Number => "number",
            ArgKind::Boolean => "boolean",
            ArgKind::Array => "array",
            ArgKind::Object => "object",
        }
    }

    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ArgKind::String => value.is_string(),
            ArgKind::Number => value.is_number(),
            ArgKind::Boolean => value.is_boolean(),
            ArgKind::Array => value.is_array(),
            ArgKind::Object => value.is_object(),
        }
    }
}

/// 单个参数的 schema：名称、类型、是否必填、说明
#[derive(Debug, Clone, PartialEq)]
pub struct ArgSpec {
    pub name: &'static str,
    pub kind: ArgKind,
    pub required: bool,
    pub description: &'static str,
}

impl ArgSpec {
    pub fn required(name: &'static str, kind: ArgKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            description,
        }
    }

    pub fn optional(name: &'static str, kind: ArgKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: false,
            description,
        }
    }
}

/// 工具 trait：名称、描述（供 LLM 理解）、参数 schema、异步执行（args 为 JSON 对象）
#[async_trait]
pub trait Tool: Send + Sync {
    /// 工具名称（决策 JSON 中的 "tool_name"）
    fn name(&self) -> &str;

    /// 工具描述（供 LLM 理解功能）
    fn description(&self) -> &str;

    /// 参数 schema；默认无参数
    fn args_schema(&self) -> Vec<ArgSpec> {
        Vec::new()
    }

    /// 执行工具；Err 为工具自身逻辑失败
    async fn execute(&self, args: Value) -> Result<String, String>;

    /// 参数 JSON Schema（拼进决策 prompt）
    fn parameters_schema(&self) -> Value {
        let specs = self.args_schema();
        let properties: serde_json::Map<String, Value> = specs
            .iter()
            .map(|spec| {
                (
                    spec.name.to_string(),
                    serde_json::json!({
                        "type": spec.kind.as_str(),
                        "description": spec.description,
                    }),
                )
            })
            .collect();
        let required: Vec<&str> = specs.iter().filter(|s| s.required).map(|s| s.name).collect();
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// 工具注册表：按名称有序存储 Arc<dyn Tool>，prompt 中的工具列表顺序稳定
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// 返回 (name, description) 列表，用于生成 prompt 中的 Available tools 段落
    pub fn tool_descriptions(&self) -> Vec<(String, String)> {
        self.tools
            .iter()
            .map(|(name, tool)| (name.clone(), tool.description().to_string()))
            .collect()
    }

    /// 解析工具名并校验参数：未注册 → NotFound；缺必填 → MissingArgument；类型不符 → InvalidArguments
    pub fn resolve(&self, name: &str, args: &Value) -> Result<Arc<dyn Tool>, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        let empty = serde_json::Map::new();
        let map = match args {
            Value::Object(map) => map,
            Value::Null => &empty,
            other => {
                return Err(ToolError::InvalidArguments {
                    tool: name.to_string(),
                    reason: format!("expected an object, got {}", other),
                })
            }
        };

        for spec in tool.args_schema() {
            match map.get(spec.name) {
                None | Some(Value::Null) if spec.required => {
                    return Err(ToolError::MissingArgument {
                        tool: name.to_string(),
                        arg: spec.name.to_string(),
                    })
                }
                Some(value) if !value.is_null() && !spec.kind.matches(value) => {
                    return Err(ToolError::InvalidArguments {
                        tool: name.to_string(),
                        reason: format!("'{}' must be a {}", spec.name, spec.kind.as_str()),
                    })
                }
                _ => {}
            }
        }
        Ok(tool)
    }

    /// 动态生成工具 schema JSON（名称、描述、参数）
    pub fn to_schema_json(&self) -> String {
        let tools: Vec<Value> = self
            .tools
            .iter()
            .map(|(name, tool)| {
                serde_json::json!({
                    "name": name,
                    "description": tool.description(),
                    "parameters": tool.parameters_schema()
                })
            })
            .collect();
        serde_json::to_string_pretty(&tools).unwrap_or_else(|_| "[]".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::EchoTool;

    fn registry() -> ToolRegistry {
        let mut tools = ToolRegistry::new();
        tools.register(EchoTool);
        tools
    }

    #[test]
    fn test_resolve_unknown_tool() {
        let err = registry().resolve("teleport", &serde_json::json!({})).err();
        assert_eq!(err, Some(ToolError::NotFound("teleport".into())));
    }

    #[test]
    fn test_resolve_missing_argument() {
        let err = registry().resolve("echo", &serde_json::json!({})).err();
        assert!(matches!(err, Some(ToolError::MissingArgument { arg, .. }) if arg == "text"));
    }

    #[test]
    fn test_resolve_wrong_type() {
        let err = registry().resolve("echo", &serde_json::json!({"text": 5})).err();
        assert!(matches!(err, Some(ToolError::InvalidArguments { .. })));
    }

    #[test]
    fn test_resolve_non_object_args() {
        let err = registry().resolve("echo", &serde_json::json!(["hi"])).err();
        assert!(matches!(err, Some(ToolError::InvalidArguments { .. })));
    }

    #[test]
    fn test_schema_lists_required_args() {
        let schema: Value = serde_json::from_str(&registry().to_schema_json()).unwrap();
        assert_eq!(schema[0]["name"], "echo");
        assert_eq!(schema[0]["parameters"]["required"][0], "text");
    }
}
