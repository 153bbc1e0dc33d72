//! 本地知识库（知识包）：概念与规则，关键词过滤查询
//!
//! 持久化格式 `{pack_name, version, concepts: [{id, name, description}], rules: [{id, concept_ids, rule}]}`。
//! 只做大小写不敏感的子串匹配，不做语义检索。每次变更后立即落盘。

use std::path::Path;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::memory::JsonFile;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    #[serde(default)]
    pub concept_ids: Vec<String>,
    pub rule: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgePack {
    pub pack_name: String,
    pub version: String,
    #[serde(default)]
    pub concepts: Vec<Concept>,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl Default for KnowledgePack {
    fn default() -> Self {
        Self {
            pack_name: "Default KB".to_string(),
            version: "0.0".to_string(),
            concepts: Vec::new(),
            rules: Vec::new(),
        }
    }
}

pub struct KnowledgeBase {
    pack: RwLock<KnowledgePack>,
    file: Option<JsonFile>,
}

impl KnowledgeBase {
    pub fn load(path: impl AsRef<Path>) -> Self {
        let file = JsonFile::new(path);
        let pack: KnowledgePack = file.load_or_default();
        tracing::info!(
            pack = %pack.pack_name,
            concepts = pack.concepts.len(),
            rules = pack.rules.len(),
            "Knowledge pack loaded"
        );
        Self {
            pack: RwLock::new(pack),
            file: Some(file),
        }
    }

    pub fn in_memory(pack: KnowledgePack) -> Self {
        Self {
            pack: RwLock::new(pack),
            file: None,
        }
    }

    /// 关键词查询：概念按 name / description 匹配，规则按 rule 文本匹配
    pub fn query(&self, query: &str) -> String {
        let needle = query.to_lowercase();
        let pack = self.pack.read().unwrap_or_else(|e| e.into_inner());

        let mut results: Vec<String> = pack
            .concepts
            .iter()
            .filter(|c| {
                c.name.to_lowercase().contains(&needle)
                    || c.description.to_lowercase().contains(&needle)
            })
            .map(|c| format!("Concept: {} - {}", c.name, c.description))
            .collect();
        results.extend(
            pack.rules
                .iter()
                .filter(|r| r.rule.to_lowercase().contains(&needle))
                .map(|r| format!("Rule: {}", r.rule)),
        );

        if results.is_empty() {
            format!("No direct information found in KB for '{}'.", query)
        } else {
            format!("Found in KB:\n{}", results.join("\n"))
        }
    }

    pub fn add_concept(&self, id: &str, name: &str, description: &str) {
        let mut pack = self.pack.write().unwrap_or_else(|e| e.into_inner());
        pack.concepts.push(Concept {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
        });
        self.persist(&pack);
        tracing::info!(concept = name, "Concept added to KB");
    }

    pub fn add_rule(&self, id: &str, concept_ids: Vec<String>, rule_text: &str) {
        let mut pack = self.pack.write().unwrap_or_else(|e| e.into_inner());
        pack.rules.push(Rule {
            id: id.to_string(),
            concept_ids,
            rule: rule_text.to_string(),
        });
        self.persist(&pack);
        tracing::info!(rule = id, "Rule added to KB");
    }

    /// 用新知识包整体替换当前内容
    pub fn load_pack(&self, new_pack: KnowledgePack) {
        let mut pack = self.pack.write().unwrap_or_else(|e| e.into_inner());
        tracing::info!(
            pack = %new_pack.pack_name,
            version = %new_pack.version,
            "Loading knowledge pack"
        );
        *pack = new_pack;
        self.persist(&pack);
    }

    pub fn content(&self) -> KnowledgePack {
        self.pack.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn persist(&self, pack: &KnowledgePack) {
        if let Some(file) = &self.file {
            file.save_logged(pack);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> KnowledgeBase {
        let kb = KnowledgeBase::in_memory(KnowledgePack::default());
        kb.add_concept("c1", "Reinforcement Learning", "Learning from reward signals");
        kb.add_concept("c2", "Planning", "Choosing actions ahead of time");
        kb.add_rule("r1", vec!["c1".into()], "Reward successful goals with joy");
        kb
    }

    #[test]
    fn test_query_matches_concepts_and_rules() {
        let kb = sample();
        let result = kb.query("REWARD");
        assert!(result.starts_with("Found in KB:"));
        assert!(result.contains("Concept: Reinforcement Learning - Learning from reward signals"));
        assert!(result.contains("Rule: Reward successful goals with joy"));
        assert!(!result.contains("Planning"));
    }

    #[test]
    fn test_query_no_matches() {
        let kb = sample();
        assert_eq!(
            kb.query("quantum"),
            "No direct information found in KB for 'quantum'."
        );
    }

    #[test]
    fn test_mutations_persist() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("packs/aac.json");
        let kb = KnowledgeBase::load(&path);
        assert_eq!(kb.content().pack_name, "Default KB");
        kb.add_concept("c1", "Joy", "Positive affect");
        kb.add_rule("r1", vec!["c1".into()], "Joy decays over time");

        let reloaded = KnowledgeBase::load(&path);
        assert_eq!(reloaded.content(), kb.content());
        assert_eq!(reloaded.content().rules[0].concept_ids, vec!["c1"]);
    }

    #[test]
    fn test_load_pack_replaces_content() {
        let kb = sample();
        kb.load_pack(KnowledgePack {
            pack_name: "AAC Theory".into(),
            version: "1.2".into(),
            concepts: vec![],
            rules: vec![],
        });
        let content = kb.content();
        assert_eq!(content.pack_name, "AAC Theory");
        assert!(content.concepts.is_empty());
    }
}
