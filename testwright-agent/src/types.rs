use serde::{Deserialize, Serialize};

/// One UI interaction of a test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestStep {
    /// Human-readable action, e.g. `Click 'Add to cart'`.
    pub action_text: String,
    /// The selector the agent used, when it reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
}

impl TestStep {
    pub fn new(action_text: impl Into<String>, selector: Option<String>) -> Self {
        Self { action_text: action_text.into(), selector }
    }

    /// A plain informational step with no selector.
    pub fn note(text: impl Into<String>) -> Self {
        Self::new(text, None)
    }
}

/// A titled, ordered list of UI interaction steps.
///
/// Immutable after creation; steps are never reordered, since later steps assume
/// the DOM state left by earlier ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: String,
    pub title: String,
    pub steps: Vec<TestStep>,
}

impl TestCase {
    pub fn new(id: impl Into<String>, title: impl Into<String>, steps: Vec<TestStep>) -> Self {
        Self { id: id.into(), title: title.into(), steps }
    }

    /// Synthetic diagnostic case emitted when a pipeline stage fails.
    pub fn error(title: impl Into<String>, notes: Vec<String>) -> Self {
        Self {
            id: "ERR".to_string(),
            title: title.into(),
            steps: notes.into_iter().map(TestStep::note).collect(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.id == "ERR"
    }
}
