//! Task repository trait
//!
//! Defines the interface for raw task storage operations. Callers should go
//! through [`TaskStore`](super::TaskStore), which serializes access and
//! applies the visibility rules.

use async_trait::async_trait;

use super::model::{Task, TaskId};
use crate::Result;

/// Repository interface for task CRUD operations
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Create a new task
    async fn create(&self, task: Task) -> Result<Task>;

    /// Stage and persist a batch of tasks in one write
    ///
    /// Returns the number of new records; a repeated id replaces the earlier one.
    async fn create_many(&self, tasks: Vec<Task>) -> Result<usize>;

    /// Get a task by ID
    async fn get(&self, id: TaskId) -> Result<Option<Task>>;

    /// Get all tasks, newest first, including blank-title ones
    async fn list(&self) -> Result<Vec<Task>>;

    /// Replace an existing task
    async fn update(&self, task: Task) -> Result<Task>;

    /// Delete a task by ID
    async fn delete(&self, id: TaskId) -> Result<bool>;

    /// Find tasks whose title or details contain `query`, ignoring case and diacritics
    async fn search(&self, query: &str) -> Result<Vec<Task>>;

    /// Total number of stored tasks
    async fn count(&self) -> Result<usize>;

    /// Delete every task with a blank title, returning how many were removed
    async fn purge_blank_titles(&self) -> Result<usize>;
}
