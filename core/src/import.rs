//! One-shot import of remote todos into an empty store
//!
//! The remote endpoint returns `{ "todos": [{ "id", "todo", "completed" }] }`.
//! Imported tasks get a synthetic creation time of `now - id hours` so they
//! keep a stable, distinct order even though they have no real creation time.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tracing::{debug, info, warn};

use crate::task::{Task, TaskStore};
use crate::{Error, Result};

/// Endpoint used when no import URL is configured
pub const DEFAULT_IMPORT_URL: &str = "https://dummyjson.com/todos";

/// A todo as served by the remote endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteTodo {
    pub id: i64,
    pub todo: String,
    pub completed: bool,
}

#[derive(Debug, Deserialize)]
struct RemoteTodoList {
    todos: Vec<RemoteTodo>,
}

/// Source of remote todos
#[async_trait]
pub trait TodoSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<RemoteTodo>>;
}

/// Fetches todos over HTTP with reqwest
pub struct HttpTodoSource {
    client: reqwest::Client,
    url: String,
}

impl HttpTodoSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    /// Build a source whose requests give up after `timeout`
    pub fn with_timeout(url: impl Into<String>, timeout: StdDuration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TodoSource for HttpTodoSource {
    async fn fetch(&self) -> Result<Vec<RemoteTodo>> {
        debug!("Fetching todos from {}", self.url);
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("GET {} failed: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Transport(format!(
                "GET {} returned {}",
                self.url, status
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Transport(format!("Failed to read body: {}", e)))?;

        let list: RemoteTodoList =
            serde_json::from_slice(&body).map_err(|e| Error::Decode(e.to_string()))?;
        Ok(list.todos)
    }
}

/// Serves a fixed list of todos and counts how often it was asked
#[derive(Debug, Default)]
pub struct StaticTodoSource {
    todos: Vec<RemoteTodo>,
    fetches: AtomicUsize,
}

impl StaticTodoSource {
    pub fn new(todos: Vec<RemoteTodo>) -> Self {
        Self {
            todos,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TodoSource for StaticTodoSource {
    async fn fetch(&self) -> Result<Vec<RemoteTodo>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.todos.clone())
    }
}

/// Result of an import attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// The store already held tasks; nothing was fetched
    Skipped,
    /// Tasks were fetched and written
    Completed { imported: usize },
    /// Fetch, decode or write failed
    Failed { reason: String },
}

/// Turn remote todos into tasks, dropping blank ones and repeated ids
///
/// The first todo with a given id wins. Each task's creation time is `now`
/// minus `id` hours. Ids too large to represent that offset fall back to the
/// earliest representable time.
pub fn tasks_from_remote(todos: Vec<RemoteTodo>, now: DateTime<Utc>) -> Vec<Task> {
    let mut seen = HashSet::new();
    todos
        .into_iter()
        .filter_map(|todo| {
            let title = todo.todo.trim();
            if title.is_empty() {
                debug!("Skipping blank remote todo {}", todo.id);
                return None;
            }
            if !seen.insert(todo.id) {
                debug!("Skipping duplicate remote todo {}", todo.id);
                return None;
            }
            let created_at = Duration::try_hours(todo.id)
                .and_then(|offset| now.checked_sub_signed(offset))
                .unwrap_or(DateTime::<Utc>::MIN_UTC);
            Some(
                Task::new(title)
                    .with_id(todo.id)
                    .with_created_at(created_at)
                    .with_completed(todo.completed),
            )
        })
        .collect()
}

/// Populates an empty store from a [`TodoSource`]
#[derive(Clone)]
pub struct ImportService {
    store: TaskStore,
    source: Arc<dyn TodoSource>,
}

impl ImportService {
    pub fn new(store: TaskStore, source: Arc<dyn TodoSource>) -> Self {
        Self { store, source }
    }

    /// Import remote todos if the store is empty
    ///
    /// The gate check, fetch and batch write run as a single job on the store
    /// queue, so nothing else touches the store in between. Failures are
    /// reported in the outcome and never returned as errors.
    pub async fn import_if_empty(&self) -> ImportOutcome {
        let source = Arc::clone(&self.source);
        let result = self
            .store
            .run(move |repo| async move {
                let count = match repo.count().await {
                    Ok(count) => count,
                    Err(e) => {
                        warn!("Failed to count tasks before import: {}", e);
                        0
                    }
                };
                if count > 0 {
                    return Ok::<_, Error>(None);
                }

                let todos = source.fetch().await?;
                let tasks = tasks_from_remote(todos, Utc::now());
                let imported = repo.create_many(tasks).await?;
                Ok::<_, Error>(Some(imported))
            })
            .await;

        let outcome = match result {
            Ok(Ok(None)) => ImportOutcome::Skipped,
            Ok(Ok(Some(imported))) => ImportOutcome::Completed { imported },
            Ok(Err(e)) | Err(e) => ImportOutcome::Failed {
                reason: e.to_string(),
            },
        };

        match &outcome {
            ImportOutcome::Skipped => debug!("Store not empty, import skipped"),
            ImportOutcome::Completed { imported } => info!("Imported {} remote tasks", imported),
            ImportOutcome::Failed { reason } => warn!("Remote import failed: {}", reason),
        }
        outcome
    }
}
