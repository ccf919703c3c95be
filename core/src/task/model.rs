//! Task model definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Task identifier (creation time in milliseconds, or the remote id for imported tasks)
pub type TaskId = i64;

/// A single to-do entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub details: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_completed: bool,
}

impl Task {
    /// Create a new open task with the given title
    ///
    /// The id is derived from the creation timestamp in milliseconds.
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: now.timestamp_millis(),
            title: title.into(),
            details: String::new(),
            created_at: now,
            is_completed: false,
        }
    }

    /// Set the details
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }

    /// Set the id
    pub fn with_id(mut self, id: TaskId) -> Self {
        self.id = id;
        self
    }

    /// Set the creation time
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Set the completion flag
    pub fn with_completed(mut self, is_completed: bool) -> Self {
        self.is_completed = is_completed;
        self
    }

    /// True when the title is empty after trimming whitespace.
    ///
    /// Such tasks are never returned by read paths and are purged on startup.
    pub fn has_blank_title(&self) -> bool {
        self.title.trim().is_empty()
    }

    /// Case- and diacritic-insensitive substring match against title or details.
    ///
    /// `needle` must already be passed through [`fold_for_search`].
    pub fn matches(&self, needle: &str) -> bool {
        fold_for_search(&self.title).contains(needle)
            || fold_for_search(&self.details).contains(needle)
    }
}

/// Lowercase and strip combining marks so "Café" and "cafe" compare equal
pub fn fold_for_search(text: &str) -> String {
    text.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

/// Sort newest first and drop blank-title tasks
pub(crate) fn visible(mut tasks: Vec<Task>) -> Vec<Task> {
    tasks.retain(|t| !t.has_blank_title());
    tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    tasks
}
