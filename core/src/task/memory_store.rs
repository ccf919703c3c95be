//! In-memory task storage
//!
//! Used as a test double; writes can be made to fail on demand.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::model::{fold_for_search, Task, TaskId};
use super::repository::TaskRepository;
use crate::{Error, Result};

#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<TaskId, Task>>,
    fail_writes: AtomicBool,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing tasks, bypassing validation
    pub fn with_tasks(tasks: impl IntoIterator<Item = Task>) -> Self {
        Self {
            tasks: RwLock::new(tasks.into_iter().map(|t| (t.id, t)).collect()),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make every subsequent write fail with [`Error::Persistence`]
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Persistence("simulated write failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskStore {
    async fn create(&self, task: Task) -> Result<Task> {
        self.check_writable()?;
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(&task.id) {
            return Err(Error::InvalidInput(format!(
                "Task with ID {} already exists",
                task.id
            )));
        }
        tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn create_many(&self, batch: Vec<Task>) -> Result<usize> {
        self.check_writable()?;
        let mut tasks = self.tasks.write().await;
        Ok(batch
            .into_iter()
            .filter(|t| tasks.insert(t.id, t.clone()).is_none())
            .count())
    }

    async fn get(&self, id: TaskId) -> Result<Option<Task>> {
        Ok(self.tasks.read().await.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Task>> {
        let mut tasks: Vec<Task> = self.tasks.read().await.values().cloned().collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tasks)
    }

    async fn update(&self, task: Task) -> Result<Task> {
        self.check_writable()?;
        let mut tasks = self.tasks.write().await;
        match tasks.get_mut(&task.id) {
            Some(slot) => {
                *slot = task.clone();
                Ok(task)
            }
            None => Err(Error::TaskNotFound(task.id)),
        }
    }

    async fn delete(&self, id: TaskId) -> Result<bool> {
        self.check_writable()?;
        Ok(self.tasks.write().await.remove(&id).is_some())
    }

    async fn search(&self, query: &str) -> Result<Vec<Task>> {
        let needle = fold_for_search(query);
        let mut tasks: Vec<Task> = self
            .tasks
            .read()
            .await
            .values()
            .filter(|t| t.matches(&needle))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tasks)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.tasks.read().await.len())
    }

    async fn purge_blank_titles(&self) -> Result<usize> {
        self.check_writable()?;
        let mut tasks = self.tasks.write().await;
        let before = tasks.len();
        tasks.retain(|_, t| !t.has_blank_title());
        Ok(before - tasks.len())
    }
}
