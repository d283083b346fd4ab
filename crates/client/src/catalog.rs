//! Agent and tool catalogs published by the backend.
//!
//! Both catalogs are read-only listings.  Records keep any fields the
//! backend adds beyond the documented ones so they can be shown in full.

use serde::{Deserialize, Serialize};

/// One entry of `GET /agents`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub config: serde_json::Map<String, serde_json::Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Agent {
    /// Case-insensitive match of `term` against name, description, or type.
    pub fn matches(&self, term: &str) -> bool {
        matches_any(term, [&self.name, &self.description, &self.kind])
    }
}

/// One entry of `GET /tools`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub config: serde_json::Map<String, serde_json::Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Tool {
    /// Case-insensitive match of `term` against name, description, or category.
    pub fn matches(&self, term: &str) -> bool {
        matches_any(term, [&self.name, &self.description, &self.category])
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AgentMessageRequest<'a> {
    pub message: &'a str,
}

fn matches_any<const N: usize>(term: &str, fields: [&String; N]) -> bool {
    let term = term.trim().to_lowercase();
    term.is_empty()
        || fields
            .iter()
            .any(|field| field.to_lowercase().contains(&term))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn agent_keeps_unknown_fields() {
        let agent: Agent = serde_json::from_value(json!({
            "id": "a1",
            "name": "Planner",
            "description": "Breaks work down",
            "type": "llm",
            "config": { "model": "large" },
            "owner": "ops",
        }))
        .unwrap();

        assert_eq!(agent.kind, "llm");
        assert_eq!(agent.config["model"], "large");
        assert_eq!(agent.extra["owner"], "ops");

        let back = serde_json::to_value(&agent).unwrap();
        assert_eq!(back["type"], "llm");
        assert_eq!(back["owner"], "ops");
    }

    #[test]
    fn missing_descriptive_fields_default_to_empty() {
        let tool: Tool = serde_json::from_value(json!({ "id": "t1" })).unwrap();
        assert_eq!(tool.name, "");
        assert_eq!(tool.category, "");
        assert!(tool.config.is_empty());
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let tool = Tool {
            id: "t1".into(),
            name: "Web Search".into(),
            description: "Looks things up".into(),
            category: "Retrieval".into(),
            ..Default::default()
        };
        assert!(tool.matches("search"));
        assert!(tool.matches("THINGS"));
        assert!(tool.matches("retr"));
        assert!(tool.matches("  "));
        assert!(!tool.matches("calculator"));

        let agent = Agent {
            id: "a1".into(),
            kind: "Router".into(),
            ..Default::default()
        };
        assert!(agent.matches("router"));
        assert!(!agent.matches("planner"));
    }
}
