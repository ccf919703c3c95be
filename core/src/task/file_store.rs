//! File-based task storage implementation
//!
//! Stores tasks as JSON in a file on disk.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::debug;

use super::model::{fold_for_search, Task, TaskId};
use super::repository::TaskRepository;
use crate::{Error, Result};

/// File-based task store using JSON
pub struct FileTaskStore {
    /// Path to the JSON file
    path: PathBuf,
    /// In-memory cache of tasks
    cache: RwLock<HashMap<TaskId, Task>>,
}

impl FileTaskStore {
    /// Create a new FileTaskStore
    ///
    /// If the file doesn't exist, it will be created on first write.
    pub async fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let cache = if path.exists() {
            let content = tokio::fs::read_to_string(&path).await?;
            let tasks: Vec<Task> = serde_json::from_str(&content)?;
            tasks.into_iter().map(|t| (t.id, t)).collect()
        } else {
            HashMap::new()
        };

        debug!("Opened task file {:?} with {} tasks", path, cache.len());

        Ok(Self {
            path,
            cache: RwLock::new(cache),
        })
    }

    /// Persist the given snapshot to disk
    ///
    /// Writes to a sibling temp file and renames it over the target so a
    /// crash mid-write never leaves a truncated file behind.
    async fn persist(&self, cache: &HashMap<TaskId, Task>) -> Result<()> {
        let mut tasks: Vec<&Task> = cache.values().collect();
        tasks.sort_by_key(|t| t.id);
        let content =
            serde_json::to_string_pretty(&tasks).map_err(|e| Error::Persistence(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Persistence(format!("{}: {}", parent.display(), e)))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| Error::Persistence(format!("{}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| Error::Persistence(format!("{}: {}", self.path.display(), e)))?;
        Ok(())
    }
}

#[async_trait]
impl TaskRepository for FileTaskStore {
    async fn create(&self, task: Task) -> Result<Task> {
        let mut cache = self.cache.write().await;
        if cache.contains_key(&task.id) {
            return Err(Error::InvalidInput(format!(
                "Task with ID {} already exists",
                task.id
            )));
        }
        cache.insert(task.id, task.clone());
        if let Err(e) = self.persist(&cache).await {
            cache.remove(&task.id);
            return Err(e);
        }
        Ok(task)
    }

    async fn create_many(&self, tasks: Vec<Task>) -> Result<usize> {
        let mut cache = self.cache.write().await;
        let mut added = 0;
        for task in tasks {
            if cache.insert(task.id, task).is_none() {
                added += 1;
            }
        }
        // Staged tasks stay cached on failure; a later write may still persist them.
        self.persist(&cache).await?;
        Ok(added)
    }

    async fn get(&self, id: TaskId) -> Result<Option<Task>> {
        let cache = self.cache.read().await;
        Ok(cache.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Task>> {
        let cache = self.cache.read().await;
        let mut tasks: Vec<Task> = cache.values().cloned().collect();
        // Sort by created_at descending (newest first)
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tasks)
    }

    async fn update(&self, task: Task) -> Result<Task> {
        let mut cache = self.cache.write().await;
        let previous = match cache.insert(task.id, task.clone()) {
            Some(previous) => previous,
            None => {
                cache.remove(&task.id);
                return Err(Error::TaskNotFound(task.id));
            }
        };
        if let Err(e) = self.persist(&cache).await {
            cache.insert(previous.id, previous);
            return Err(e);
        }
        Ok(task)
    }

    async fn delete(&self, id: TaskId) -> Result<bool> {
        let mut cache = self.cache.write().await;
        let Some(removed) = cache.remove(&id) else {
            return Ok(false);
        };
        if let Err(e) = self.persist(&cache).await {
            cache.insert(id, removed);
            return Err(e);
        }
        Ok(true)
    }

    async fn search(&self, query: &str) -> Result<Vec<Task>> {
        let needle = fold_for_search(query);
        let cache = self.cache.read().await;
        let mut tasks: Vec<Task> = cache
            .values()
            .filter(|t| t.matches(&needle))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tasks)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.cache.read().await.len())
    }

    async fn purge_blank_titles(&self) -> Result<usize> {
        let mut cache = self.cache.write().await;
        let blank: Vec<TaskId> = cache
            .values()
            .filter(|t| t.has_blank_title())
            .map(|t| t.id)
            .collect();
        if blank.is_empty() {
            return Ok(0);
        }

        let removed: Vec<Task> = blank.iter().filter_map(|id| cache.remove(id)).collect();
        if let Err(e) = self.persist(&cache).await {
            cache.extend(removed.into_iter().map(|t| (t.id, t)));
            return Err(e);
        }
        Ok(removed.len())
    }
}
