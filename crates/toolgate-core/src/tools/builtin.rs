//! Tools implemented by the orchestrator itself

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::types::ToolDescriptor;

#[derive(Debug, Error)]
pub enum BuiltinError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
}

/// A tool that runs in process and is always present in the catalog
#[async_trait]
pub trait BuiltinTool: Send + Sync {
    /// Catalog entry; the name is used verbatim
    fn descriptor(&self) -> ToolDescriptor;

    /// Run the tool, returning the text handed back to the model
    async fn call(&self, arguments: Value) -> Result<String, BuiltinError>;

    /// Drop any state kept between calls
    fn reset(&self) {}
}

/// Built-ins registered by default
pub fn default_builtins() -> Vec<Arc<dyn BuiltinTool>> {
    vec![Arc::new(SequentialThinking::new())]
}

/// One step of a reasoning chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThoughtStep {
    pub thought: String,
    pub next_thought_needed: bool,
    pub thought_number: u32,
    pub total_thoughts: u32,
    #[serde(default)]
    pub is_revision: Option<bool>,
    #[serde(default)]
    pub revises_thought: Option<u32>,
    #[serde(default)]
    pub branch_from_thought: Option<u32>,
    #[serde(default)]
    pub branch_id: Option<String>,
    #[serde(default)]
    pub needs_more_thoughts: Option<bool>,
}

/// Thoughts kept per chain and per branch; older ones are dropped first
pub const MAX_HISTORY: usize = 1000;

/// Distinct branch ids kept; later new ids are not recorded
pub const MAX_BRANCHES: usize = 64;

#[derive(Debug, Default)]
struct ThinkingState {
    history: VecDeque<ThoughtStep>,
    branches: BTreeMap<String, VecDeque<ThoughtStep>>,
}

fn push_bounded(steps: &mut VecDeque<ThoughtStep>, step: ThoughtStep) {
    if steps.len() == MAX_HISTORY {
        steps.pop_front();
    }
    steps.push_back(step);
}

/// `sequential_thinking`: lets a model lay out, revise and branch a chain of thoughts
#[derive(Debug, Default)]
pub struct SequentialThinking {
    state: Mutex<ThinkingState>,
}

impl SequentialThinking {
    pub const NAME: &'static str = "sequential_thinking";

    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded thoughts
    pub fn history_len(&self) -> usize {
        self.state.lock().history.len()
    }

    pub fn branch_count(&self) -> usize {
        self.state.lock().branches.len()
    }

    fn parse(arguments: Value) -> Result<ThoughtStep, BuiltinError> {
        let mut step: ThoughtStep =
            serde_json::from_value(arguments).map_err(|e| BuiltinError::InvalidArguments(e.to_string()))?;

        if step.thought.trim().is_empty() {
            return Err(BuiltinError::InvalidArguments("thought must not be empty".to_string()));
        }
        if step.thought_number == 0 || step.total_thoughts == 0 {
            return Err(BuiltinError::InvalidArguments(
                "thoughtNumber and totalThoughts start at 1".to_string(),
            ));
        }
        if step.thought_number > step.total_thoughts {
            step.total_thoughts = step.thought_number;
        }
        Ok(step)
    }
}

#[async_trait]
impl BuiltinTool for SequentialThinking {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            Self::NAME,
            "Dynamic, reflective problem solving through a sequence of thoughts. \
             Each call records one thought; thoughts can revise earlier ones or branch \
             into alternatives, and the total can grow as understanding deepens.",
        )
        .with_schema(json!({
            "type": "object",
            "properties": {
                "thought": { "type": "string", "description": "The current thinking step" },
                "nextThoughtNeeded": { "type": "boolean", "description": "Whether another thought step is needed" },
                "thoughtNumber": { "type": "integer", "minimum": 1, "description": "Current thought number" },
                "totalThoughts": { "type": "integer", "minimum": 1, "description": "Estimated total thoughts needed" },
                "isRevision": { "type": "boolean", "description": "Whether this revises previous thinking" },
                "revisesThought": { "type": "integer", "minimum": 1, "description": "Which thought is being reconsidered" },
                "branchFromThought": { "type": "integer", "minimum": 1, "description": "Branching point thought number" },
                "branchId": { "type": "string", "description": "Branch identifier" },
                "needsMoreThoughts": { "type": "boolean", "description": "If more thoughts are needed" }
            },
            "required": ["thought", "nextThoughtNeeded", "thoughtNumber", "totalThoughts"]
        }))
    }

    async fn call(&self, arguments: Value) -> Result<String, BuiltinError> {
        let step = Self::parse(arguments)?;

        let mut state = self.state.lock();
        if let (Some(_), Some(branch_id)) = (step.branch_from_thought, step.branch_id.as_ref()) {
            let known = state.branches.contains_key(branch_id);
            if known || state.branches.len() < MAX_BRANCHES {
                push_bounded(state.branches.entry(branch_id.clone()).or_default(), step.clone());
            }
        }
        push_bounded(&mut state.history, step.clone());

        let summary = json!({
            "thoughtNumber": step.thought_number,
            "totalThoughts": step.total_thoughts,
            "nextThoughtNeeded": step.next_thought_needed,
            "branches": state.branches.keys().collect::<Vec<_>>(),
            "thoughtHistoryLength": state.history.len(),
        });
        Ok(summary.to_string())
    }

    fn reset(&self) {
        *self.state.lock() = ThinkingState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(number: u32, total: u32) -> Value {
        json!({
            "thought": format!("thought {}", number),
            "nextThoughtNeeded": true,
            "thoughtNumber": number,
            "totalThoughts": total,
        })
    }

    #[tokio::test]
    async fn test_records_history() {
        let tool = SequentialThinking::new();
        tool.call(step(1, 3)).await.unwrap();
        let out: Value = serde_json::from_str(&tool.call(step(2, 3)).await.unwrap()).unwrap();

        assert_eq!(out["thoughtNumber"], 2);
        assert_eq!(out["totalThoughts"], 3);
        assert_eq!(out["nextThoughtNeeded"], true);
        assert_eq!(out["thoughtHistoryLength"], 2);
        assert_eq!(out["branches"], json!([]));
        assert_eq!(tool.history_len(), 2);
    }

    #[tokio::test]
    async fn test_total_grows_to_thought_number() {
        let tool = SequentialThinking::new();
        let out: Value = serde_json::from_str(&tool.call(step(5, 3)).await.unwrap()).unwrap();
        assert_eq!(out["totalThoughts"], 5);
    }

    #[tokio::test]
    async fn test_branches() {
        let tool = SequentialThinking::new();
        tool.call(step(1, 2)).await.unwrap();

        let mut branch = step(2, 2);
        branch["branchFromThought"] = json!(1);
        branch["branchId"] = json!("alt");
        let out: Value = serde_json::from_str(&tool.call(branch).await.unwrap()).unwrap();
        assert_eq!(out["branches"], json!(["alt"]));

        // branchId without a branch point does not open a branch
        let mut loose = step(3, 3);
        loose["branchId"] = json!("ignored");
        let out: Value = serde_json::from_str(&tool.call(loose).await.unwrap()).unwrap();
        assert_eq!(out["branches"], json!(["alt"]));
    }

    #[tokio::test]
    async fn test_invalid_arguments() {
        let tool = SequentialThinking::new();
        assert!(tool.call(json!({"thought": "x"})).await.is_err());
        assert!(tool.call(json!("not an object")).await.is_err());

        assert!(matches!(tool.call(step(0, 1)).await, Err(BuiltinError::InvalidArguments(_))));

        let mut blank = step(1, 1);
        blank["thought"] = json!("  ");
        assert!(tool.call(blank).await.is_err());
        assert_eq!(tool.history_len(), 0);
    }

    #[tokio::test]
    async fn test_history_is_bounded_and_resettable() {
        let tool = SequentialThinking::new();
        for n in 1..=(MAX_HISTORY as u32 + 5) {
            tool.call(step(n, n)).await.unwrap();
        }
        assert_eq!(tool.history_len(), MAX_HISTORY);
        assert_eq!(tool.state.lock().history.front().map(|s| s.thought_number), Some(6));

        for i in 0..(MAX_BRANCHES + 3) {
            let mut branch = step(2, 2);
            branch["branchFromThought"] = json!(1);
            branch["branchId"] = json!(format!("b{}", i));
            tool.call(branch).await.unwrap();
        }
        assert_eq!(tool.branch_count(), MAX_BRANCHES);

        tool.reset();
        assert_eq!(tool.history_len(), 0);
        assert_eq!(tool.branch_count(), 0);
        let out: Value = serde_json::from_str(&tool.call(step(1, 1)).await.unwrap()).unwrap();
        assert_eq!(out["thoughtHistoryLength"], 1);
    }

    #[test]
    fn test_descriptor() {
        let descriptor = SequentialThinking::new().descriptor();
        assert_eq!(descriptor.name, "sequential_thinking");
        assert_eq!(descriptor.input_schema["required"].as_array().map(Vec::len), Some(4));
    }
}
