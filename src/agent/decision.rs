//! LLM 回复解析：知识库建议语法与行动决策
//!
//! 两个纯函数，不做 I/O：
//! - parse_kb_suggestion：`Query KB for <x>` / `N/A`
//! - parse_decision：直接回答 `{"direct_response": true, "response_content": ...}`
//!   或工具调用 `{"tool_name": ..., "tool_args": {...}}`，兼容 camelCase 键与 ```json 围栏

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

/// 直接回答缺少内容时的占位文本
pub const NO_CONTENT_PROVIDED: &str = "No specific content provided.";

/// 知识库建议
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KbSuggestion {
    NotApplicable,
    /// 已小写化的查询词
    Query(String),
}

fn kb_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)query\s+kb\s+for\s*:?\s*(.*)$").expect("Invalid KB suggestion pattern")
    })
}

/// 解析知识库建议回复；无法识别的一律视为不适用
pub fn parse_kb_suggestion(reply: &str) -> KbSuggestion {
    let trimmed = reply.trim();
    let lowered = trimmed.to_lowercase();
    if matches!(lowered.trim_end_matches('.'), "" | "n/a" | "na" | "none") {
        return KbSuggestion::NotApplicable;
    }

    let Some(caps) = kb_marker().captures(trimmed) else {
        return KbSuggestion::NotApplicable;
    };
    let unquoted: String = caps
        .get(1)
        .map(|m| m.as_str())
        .unwrap_or("")
        .chars()
        .filter(|c| !matches!(c, '"' | '\'' | '`'))
        .collect();
    let query = unquoted.trim().trim_end_matches('.').trim().to_lowercase();

    if query.is_empty() {
        KbSuggestion::NotApplicable
    } else {
        KbSuggestion::Query(query)
    }
}

/// 一次行动决策的解析结果
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    DirectResponse { content: String },
    ToolCall { name: String, args: Value },
    /// 合法 JSON 对象，但既不是直接回答也不是工具调用
    Malformed(String),
    /// 无法解析为 JSON 对象
    Unparseable(String),
}

/// 从回复中截取 JSON 文本：优先 ```json 围栏，其次首个 `{` 到最后一个 `}`
pub fn extract_json(output: &str) -> &str {
    let trimmed = output.trim();
    if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        return rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim());
    }
    if let Some(start) = trimmed.find("```") {
        let rest = &trimmed[start + 3..];
        if let Some(end) = rest.find("```") {
            return rest[..end].trim();
        }
    }
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

fn field<'a>(obj: &'a Map<String, Value>, snake: &str, camel: &str) -> Option<&'a Value> {
    obj.get(snake).or_else(|| obj.get(camel))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// 解析行动决策；回复只解码一次
pub fn parse_decision(reply: &str) -> Decision {
    let json_str = extract_json(reply);
    let obj = match serde_json::from_str::<Value>(json_str) {
        Ok(Value::Object(obj)) => obj,
        _ => return Decision::Unparseable(reply.to_string()),
    };

    if field(&obj, "direct_response", "directResponse").is_some_and(is_truthy) {
        let content = field(&obj, "response_content", "responseContent")
            .and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .unwrap_or_else(|| NO_CONTENT_PROVIDED.to_string());
        return Decision::DirectResponse { content };
    }

    let name = field(&obj, "tool_name", "toolName")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty());
    match name {
        Some(name) => Decision::ToolCall {
            name: name.to_string(),
            args: field(&obj, "tool_args", "toolArgs")
                .cloned()
                .unwrap_or_else(|| Value::Object(Map::new())),
        },
        None => Decision::Malformed(reply.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kb_not_applicable() {
        for reply in ["N/A", "  n/a  ", "NA", "none", "", "I think we should look at it"] {
            assert_eq!(parse_kb_suggestion(reply), KbSuggestion::NotApplicable, "{reply:?}");
        }
    }

    #[test]
    fn test_kb_query() {
        assert_eq!(
            parse_kb_suggestion("Query KB for Obedience."),
            KbSuggestion::Query("obedience".into())
        );
        assert_eq!(
            parse_kb_suggestion("query kb for: \"Affect Coupling\""),
            KbSuggestion::Query("affect coupling".into())
        );
        assert_eq!(
            parse_kb_suggestion("Query KB for 'joy.'"),
            KbSuggestion::Query("joy".into())
        );
        assert_eq!(
            parse_kb_suggestion("Query KB for concepts related to 'reinforcement learning'."),
            KbSuggestion::Query("concepts related to reinforcement learning".into())
        );
        assert_eq!(parse_kb_suggestion("Query KB for   "), KbSuggestion::NotApplicable);
        assert_eq!(parse_kb_suggestion("Query KB for '.'"), KbSuggestion::NotApplicable);
    }

    #[test]
    fn test_direct_response_variants() {
        let expected = Decision::DirectResponse { content: "done".into() };
        assert_eq!(
            parse_decision(r#"{"direct_response": "true", "response_content": "done"}"#),
            expected
        );
        assert_eq!(
            parse_decision(r#"{"directResponse": true, "responseContent": "done"}"#),
            expected
        );
        assert_eq!(
            parse_decision(r#"{"direct_response": true}"#),
            Decision::DirectResponse { content: NO_CONTENT_PROVIDED.into() }
        );
    }

    #[test]
    fn test_tool_call_in_fence() {
        let reply = "Sure:\n```json\n{\"tool_name\": \"echo\", \"tool_args\": {\"text\": \"hi\"}}\n```";
        assert_eq!(
            parse_decision(reply),
            Decision::ToolCall { name: "echo".into(), args: json!({"text": "hi"}) }
        );
    }

    #[test]
    fn test_tool_call_without_args() {
        assert_eq!(
            parse_decision(r#"{"toolName": "echo"}"#),
            Decision::ToolCall { name: "echo".into(), args: json!({}) }
        );
    }

    #[test]
    fn test_malformed_and_unparseable() {
        assert!(matches!(parse_decision(r#"{"thought": "hmm"}"#), Decision::Malformed(_)));
        assert!(matches!(
            parse_decision(r#"{"direct_response": "false", "tool_name": ""}"#),
            Decision::Malformed(_)
        ));
        assert!(matches!(parse_decision("not json at all"), Decision::Unparseable(_)));
        assert!(matches!(parse_decision("[1, 2]"), Decision::Unparseable(_)));
    }
}
