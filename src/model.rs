use serde::Serialize;

/// An item produced by a provider, before it is scored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub id: String,                  // Unique across providers (e.g. "stdin:42")
    pub label: String,               // Text that is matched and displayed
    pub description: Option<String>,
    pub provider: String,            // Group the result is listed under
}

impl Candidate {
    pub fn new(id: impl Into<String>, label: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: None,
            provider: provider.into(),
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }
}

/// Printed form of one ranked result.
#[derive(Debug, Clone, Serialize)]
pub struct ResultRecord {
    pub id: String,
    pub provider: String,
    pub priority: i32,
    pub score: i64,
    pub label: String,
    pub highlighted: String,
    pub matched_indices: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
