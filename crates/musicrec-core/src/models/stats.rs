use serde::{Deserialize, Serialize};

/// Dashboard counters from `GET /stats`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    #[serde(rename = "totalSongs", default)]
    pub total_songs: u64,
    #[serde(rename = "totalLiked", default)]
    pub total_liked: u64,
    #[serde(rename = "totalFeedback", default)]
    pub total_feedback: u64,
    #[serde(rename = "feedbackLiked", default)]
    pub feedback_liked: u64,
    #[serde(rename = "feedbackSkipped", default)]
    pub feedback_skipped: Option<u64>,
}

/// Result of `POST /expand`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpandResult {
    #[serde(rename = "expandedAdded", default)]
    pub expanded_added: u64,
    #[serde(rename = "likedImported", default)]
    pub liked_imported: Option<u64>,
    #[serde(rename = "totalRows", default)]
    pub total_rows: u64,
    #[serde(default)]
    pub message: Option<String>,
}

impl ExpandResult {
    pub fn summary(&self) -> String {
        format!(
            "Added {} tracks! Total: {}",
            self.expanded_added, self.total_rows
        )
    }
}
