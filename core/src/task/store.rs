//! Serialized access to a task repository
//!
//! Every operation is submitted as a job to one background worker which runs
//! jobs strictly in submission order. This gives a single writer and a total
//! order over all reads and writes issued through the same [`TaskStore`].

use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use super::model::{visible, Task, TaskId};
use super::repository::TaskRepository;
use crate::{Error, Result};

type Job = Box<dyn FnOnce(Arc<dyn TaskRepository>) -> BoxFuture<'static, ()> + Send>;

/// Handle to the serial task queue
///
/// Cloning the handle shares the same queue and repository.
#[derive(Clone)]
pub struct TaskStore {
    jobs: mpsc::UnboundedSender<Job>,
}

impl TaskStore {
    /// Spawn the queue worker for `repository`
    ///
    /// Must be called from within a tokio runtime. The worker exits once every
    /// handle has been dropped.
    pub fn new(repository: Arc<dyn TaskRepository>) -> Self {
        let (jobs, mut rx) = mpsc::unbounded_channel::<Job>();

        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                job(Arc::clone(&repository)).await;
            }
            debug!("Task queue closed");
        });

        Self { jobs }
    }

    /// Run `f` on the queue and wait for its output
    pub async fn run<T, F, Fut>(&self, f: F) -> Result<T>
    where
        F: FnOnce(Arc<dyn TaskRepository>) -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move |repo| {
            async move {
                let _ = reply_tx.send(f(repo).await);
            }
            .boxed()
        });

        self.jobs.send(job).map_err(|_| Error::QueueClosed)?;
        reply_rx.await.map_err(|_| Error::QueueClosed)
    }

    /// All visible tasks, newest first. Read failures yield an empty list.
    pub async fn list(&self) -> Vec<Task> {
        match self.run(|repo| async move { repo.list().await }).await {
            Ok(Ok(tasks)) => visible(tasks),
            Ok(Err(e)) | Err(e) => {
                warn!("Failed to list tasks: {}", e);
                Vec::new()
            }
        }
    }

    /// Visible tasks matching `query` in title or details, ignoring case
    pub async fn search(&self, query: &str) -> Vec<Task> {
        let query = query.to_string();
        match self.run(move |repo| async move { repo.search(&query).await }).await {
            Ok(Ok(tasks)) => visible(tasks),
            Ok(Err(e)) | Err(e) => {
                warn!("Failed to search tasks: {}", e);
                Vec::new()
            }
        }
    }

    /// Total stored tasks including blank-title ones, 0 on read failure
    pub async fn count(&self) -> usize {
        match self.run(|repo| async move { repo.count().await }).await {
            Ok(Ok(count)) => count,
            Ok(Err(e)) | Err(e) => {
                warn!("Failed to count tasks: {}", e);
                0
            }
        }
    }

    pub async fn get(&self, id: TaskId) -> Result<Option<Task>> {
        self.run(move |repo| async move { repo.get(id).await }).await?
    }

    /// Create a task, assigning its id and creation time
    pub async fn add(&self, title: impl Into<String>, details: impl Into<String>) -> Result<Task> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(Error::InvalidInput("Title cannot be empty".into()));
        }
        let task = Task::new(title).with_details(details);

        self.run(move |repo| async move {
            let mut task = task;
            // Two adds in the same millisecond must not share an id
            while repo.get(task.id).await?.is_some() {
                task.id += 1;
            }
            let created = repo.create(task).await?;
            debug!("Created task {}", created.id);
            Ok::<_, Error>(created)
        })
        .await?
    }

    /// Overwrite the mutable fields of an existing task
    pub async fn update(
        &self,
        id: TaskId,
        title: impl Into<String>,
        details: impl Into<String>,
        is_completed: bool,
    ) -> Result<Task> {
        let title = title.into();
        let details = details.into();
        if title.trim().is_empty() {
            return Err(Error::InvalidInput("Title cannot be empty".into()));
        }

        self.run(move |repo| async move {
            let mut task = repo.get(id).await?.ok_or(Error::TaskNotFound(id))?;
            task.title = title;
            task.details = details;
            task.is_completed = is_completed;
            let updated = repo.update(task).await?;
            debug!("Updated task {}", id);
            Ok::<_, Error>(updated)
        })
        .await?
    }

    pub async fn delete(&self, id: TaskId) -> Result<()> {
        self.run(move |repo| async move {
            if repo.delete(id).await? {
                debug!("Deleted task {}", id);
                Ok::<_, Error>(())
            } else {
                Err(Error::TaskNotFound(id))
            }
        })
        .await?
    }

    /// Remove every task whose title is blank after trimming
    pub async fn purge_blank_titles(&self) -> Result<usize> {
        self.run(|repo| async move { repo.purge_blank_titles().await })
            .await?
    }
}
