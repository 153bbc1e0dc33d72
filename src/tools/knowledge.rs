//! 知识库工具：让决策步骤可以查询、扩充本地知识包

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::knowledge::KnowledgeBase;
use crate::tools::{ArgKind, ArgSpec, Tool};

fn str_arg<'a>(args: &'a Value, name: &str) -> Option<&'a str> {
    args.get(name)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn new_id(prefix: &str) -> String {
    format!("{}_{}", prefix, uuid::Uuid::new_v4().simple())
}

pub struct KnowledgeQueryTool {
    kb: Arc<KnowledgeBase>,
}

impl KnowledgeQueryTool {
    pub fn new(kb: Arc<KnowledgeBase>) -> Self {
        Self { kb }
    }
}

#[async_trait]
impl Tool for KnowledgeQueryTool {
    fn name(&self) -> &str {
        "query_knowledge_base"
    }

    fn description(&self) -> &str {
        "Keyword lookup in the local knowledge pack (concepts and rules)."
    }

    fn args_schema(&self) -> Vec<ArgSpec> {
        vec![ArgSpec::required("query", ArgKind::String, "Keyword or phrase")]
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let query = str_arg(&args, "query").ok_or("Empty query")?;
        Ok(self.kb.query(query))
    }
}

pub struct AddConceptTool {
    kb: Arc<KnowledgeBase>,
}

impl AddConceptTool {
    pub fn new(kb: Arc<KnowledgeBase>) -> Self {
        Self { kb }
    }
}

#[async_trait]
impl Tool for AddConceptTool {
    fn name(&self) -> &str {
        "add_knowledge_concept"
    }

    fn description(&self) -> &str {
        "Add a concept to the local knowledge pack."
    }

    fn args_schema(&self) -> Vec<ArgSpec> {
        vec![
            ArgSpec::required("name", ArgKind::String, "Concept name"),
            ArgSpec::required("description", ArgKind::String, "Concept description"),
            ArgSpec::optional("id", ArgKind::String, "Concept id (generated when omitted)"),
        ]
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let name = str_arg(&args, "name").ok_or("Empty concept name")?;
        let description = str_arg(&args, "description").unwrap_or_default();
        let id = str_arg(&args, "id")
            .map(str::to_string)
            .unwrap_or_else(|| new_id("concept"));
        self.kb.add_concept(&id, name, description);
        Ok(format!("Concept '{}' added with id {}", name, id))
    }
}

pub struct AddRuleTool {
    kb: Arc<KnowledgeBase>,
}

impl AddRuleTool {
    pub fn new(kb: Arc<KnowledgeBase>) -> Self {
        Self { kb }
    }
}

#[async_trait]
impl Tool for AddRuleTool {
    fn name(&self) -> &str {
        "add_knowledge_rule"
    }

    fn description(&self) -> &str {
        "Add a rule to the local knowledge pack, optionally linked to concept ids."
    }

    fn args_schema(&self) -> Vec<ArgSpec> {
        vec![
            ArgSpec::required("rule", ArgKind::String, "Rule text"),
            ArgSpec::optional("concept_ids", ArgKind::Array, "Linked concept ids"),
            ArgSpec::optional("id", ArgKind::String, "Rule id (generated when omitted)"),
        ]
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let rule = str_arg(&args, "rule").ok_or("Empty rule text")?;
        let concept_ids = args
            .get("concept_ids")
            .and_then(|v| v.as_array())
            .map(|ids| {
                ids.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        let id = str_arg(&args, "id")
            .map(str::to_string)
            .unwrap_or_else(|| new_id("rule"));
        self.kb.add_rule(&id, concept_ids, rule);
        Ok(format!("Rule added with id {}", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::KnowledgePack;
    use serde_json::json;

    #[tokio::test]
    async fn test_add_then_query() {
        let kb = Arc::new(KnowledgeBase::in_memory(KnowledgePack::default()));
        AddConceptTool::new(kb.clone())
            .execute(json!({"id": "c1", "name": "Obedience", "description": "Following orders"}))
            .await
            .unwrap();
        AddRuleTool::new(kb.clone())
            .execute(json!({"rule": "Manual orders preempt planning", "concept_ids": ["c1"]}))
            .await
            .unwrap();

        let out = KnowledgeQueryTool::new(kb.clone())
            .execute(json!({"query": "orders"}))
            .await
            .unwrap();
        assert!(out.contains("Concept: Obedience - Following orders"));
        assert!(out.contains("Rule: Manual orders preempt planning"));
        assert_eq!(kb.content().rules[0].concept_ids, vec!["c1"]);
        assert!(kb.content().rules[0].id.starts_with("rule_"));
    }
}
