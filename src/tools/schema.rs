//! 决策 JSON Schema 生成（schemars）
//!
//! 将两种合法决策格式（直接回答 / 工具调用）的 Schema 注入决策 prompt，减少 LLM 输出格式错误。

use std::collections::HashMap;

use schemars::{schema_for, JsonSchema};

/// 直接回答：无需工具即可完成目标
#[allow(dead_code)]
#[derive(JsonSchema)]
struct DirectResponseFormat {
    /// 固定为 "true"
    direct_response: String,
    /// 回答内容
    response_content: String,
}

/// 工具调用：tool_name 为已注册工具名，tool_args 为参数对象
#[allow(dead_code)]
#[derive(JsonSchema)]
struct ToolCallFormat {
    tool_name: String,
    tool_args: HashMap<String, serde_json::Value>,
}

/// 二选一
#[allow(dead_code)]
#[derive(JsonSchema)]
#[serde(untagged)]
enum ActionDecisionFormat {
    Direct(DirectResponseFormat),
    Tool(ToolCallFormat),
}

/// 返回行动决策的 JSON Schema 字符串，可拼入 system prompt
pub fn action_decision_schema_json() -> String {
    let schema = schema_for!(ActionDecisionFormat);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_mentions_both_shapes() {
        let schema = action_decision_schema_json();
        assert!(schema.contains("response_content"));
        assert!(schema.contains("tool_args"));
    }
}
