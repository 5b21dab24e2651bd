//! Most-recent-first log of submitted prompts.

use tracing::warn;

/// Prompts kept in the log.
pub const MAX_ENTRIES: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecentPromptLog {
    entries: Vec<String>,
}

impl RecentPromptLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move `prompt` to the front, dropping any earlier copy and anything past
    /// [`MAX_ENTRIES`].
    pub fn record(&mut self, prompt: &str) {
        self.entries.retain(|p| p != prompt);
        self.entries.insert(0, prompt.to_string());
        self.entries.truncate(MAX_ENTRIES);
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Load a saved log. Corrupt input is logged and yields an empty log.
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str::<Vec<String>>(json) {
            Ok(mut entries) => {
                entries.truncate(MAX_ENTRIES);
                Self { entries }
            }
            Err(e) => {
                warn!("Failed to parse prompt history, starting empty: {}", e);
                Self::default()
            }
        }
    }

    pub fn to_json(&self) -> String {
        // A Vec<String> always serializes
        serde_json::to_string(&self.entries).unwrap_or_else(|_| "[]".to_string())
    }
}
