use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotebookPage {
    pub id: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NotebookPage {
    pub fn new(id: String, title: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title,
            content: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn matches(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        self.title.to_lowercase().contains(&needle)
            || self.content.to_lowercase().contains(&needle)
    }
}

/// Pages matching `query` (all pages for a blank query), most recently
/// updated first.
pub fn search_pages<'a>(pages: &'a [NotebookPage], query: &str) -> Vec<&'a NotebookPage> {
    let mut found: Vec<&NotebookPage> = if query.trim().is_empty() {
        pages.iter().collect()
    } else {
        pages.iter().filter(|page| page.matches(query)).collect()
    };
    found.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    found
}
