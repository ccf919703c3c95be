//! Task service facade
//!
//! The only entry point presentation adapters use. Every operation ends by
//! pushing the adapter's new view of state through [`ServiceEvent`]s; there
//! are no incremental updates.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::import::{ImportOutcome, ImportService, TodoSource};
use crate::task::{Task, TaskId, TaskRepository, TaskStore};
use crate::{Error, Result};

const EVENT_CAPACITY: usize = 64;

/// Startup progress of a [`TaskService`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    Uninitialized,
    Purging,
    ImportCheck,
    Ready,
}

/// Pushed to presentation adapters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceEvent {
    /// The ordered task list the adapter should now show
    StateChanged(Vec<Task>),
    /// A human-readable failure message
    Error(String),
}

pub struct TaskService {
    store: TaskStore,
    importer: Option<ImportService>,
    state: RwLock<ServiceState>,
    snapshot: RwLock<Vec<Task>>,
    events: broadcast::Sender<ServiceEvent>,
    /// Held for the whole of each operation so pushed events follow call order
    op_lock: Mutex<()>,
}

impl TaskService {
    pub fn new(store: TaskStore, importer: Option<ImportService>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            importer,
            state: RwLock::new(ServiceState::Uninitialized),
            snapshot: RwLock::new(Vec::new()),
            events,
            op_lock: Mutex::new(()),
        }
    }

    /// Build the store queue for `repository` and share it with the importer
    ///
    /// Passing no source disables the startup import.
    pub fn with_repository(
        repository: Arc<dyn TaskRepository>,
        source: Option<Arc<dyn TodoSource>>,
    ) -> Self {
        let store = TaskStore::new(repository);
        let importer = source.map(|source| ImportService::new(store.clone(), source));
        Self::new(store, importer)
    }

    /// Subscribe to state and error pushes
    pub fn subscribe(&self) -> broadcast::Receiver<ServiceEvent> {
        self.events.subscribe()
    }

    pub async fn state(&self) -> ServiceState {
        *self.state.read().await
    }

    /// The task list most recently pushed to adapters
    pub async fn tasks(&self) -> Vec<Task> {
        self.snapshot.read().await.clone()
    }

    /// Purge blank tasks, import if the store is empty, then push the list
    ///
    /// Can only run once per service.
    pub async fn start(&self) -> Result<ImportOutcome> {
        let _op = self.op_lock.lock().await;
        {
            let mut state = self.state.write().await;
            if *state != ServiceState::Uninitialized {
                return Err(Error::AlreadyStarted);
            }
            *state = ServiceState::Purging;
        }

        match self.store.purge_blank_titles().await {
            Ok(0) => debug!("No blank tasks to purge"),
            Ok(removed) => info!("Purged {} blank tasks", removed),
            Err(e) => warn!("Failed to purge blank tasks: {}", e),
        }

        self.set_state(ServiceState::ImportCheck).await;
        let outcome = match &self.importer {
            Some(importer) => importer.import_if_empty().await,
            None => {
                debug!("Remote import disabled");
                ImportOutcome::Skipped
            }
        };

        self.set_state(ServiceState::Ready).await;
        info!("Task service ready");
        self.refresh_locked().await;
        Ok(outcome)
    }

    pub async fn add(&self, title: impl Into<String>, details: impl Into<String>) -> Result<Task> {
        let _op = self.op_lock.lock().await;
        self.ensure_ready().await?;
        let result = self.store.add(title, details).await;
        self.finish_mutation("add task", result).await
    }

    pub async fn update(
        &self,
        id: TaskId,
        title: impl Into<String>,
        details: impl Into<String>,
        is_completed: bool,
    ) -> Result<Task> {
        let _op = self.op_lock.lock().await;
        self.ensure_ready().await?;
        let result = self.store.update(id, title, details, is_completed).await;
        self.finish_mutation("update task", result).await
    }

    pub async fn delete(&self, id: TaskId) -> Result<()> {
        let _op = self.op_lock.lock().await;
        self.ensure_ready().await?;
        let result = self.store.delete(id).await;
        self.finish_mutation("delete task", result).await
    }

    /// Push the tasks matching `query`; an empty query pushes the full list
    pub async fn search(&self, query: &str) -> Result<Vec<Task>> {
        let _op = self.op_lock.lock().await;
        self.ensure_ready().await?;
        if query.is_empty() {
            return Ok(self.refresh_locked().await);
        }
        let tasks = self.store.search(query).await;
        self.publish(tasks.clone()).await;
        Ok(tasks)
    }

    /// Reload the full list and push it
    pub async fn refresh(&self) -> Result<Vec<Task>> {
        let _op = self.op_lock.lock().await;
        self.ensure_ready().await?;
        Ok(self.refresh_locked().await)
    }

    async fn refresh_locked(&self) -> Vec<Task> {
        let tasks = self.store.list().await;
        self.publish(tasks.clone()).await;
        tasks
    }

    async fn finish_mutation<T>(&self, action: &str, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            warn!("Failed to {}: {}", action, e);
            self.emit(ServiceEvent::Error(format!("Failed to {}: {}", action, e)));
        }
        // Failed mutations still refresh so the adapter never shows stale state
        self.refresh_locked().await;
        result
    }

    async fn ensure_ready(&self) -> Result<()> {
        if *self.state.read().await == ServiceState::Ready {
            return Ok(());
        }
        let err = Error::NotReady;
        self.emit(ServiceEvent::Error(err.to_string()));
        Err(err)
    }

    async fn set_state(&self, next: ServiceState) {
        debug!("Task service state -> {:?}", next);
        *self.state.write().await = next;
    }

    async fn publish(&self, tasks: Vec<Task>) {
        *self.snapshot.write().await = tasks.clone();
        self.emit(ServiceEvent::StateChanged(tasks));
    }

    fn emit(&self, event: ServiceEvent) {
        // No subscribers is fine; adapters may attach later and read `tasks()`
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::{RemoteTodo, StaticTodoSource};
    use crate::task::InMemoryTaskStore;
    use tokio::sync::broadcast::error::TryRecvError;

    fn remote(id: i64, text: &str) -> RemoteTodo {
        RemoteTodo {
            id,
            todo: text.to_string(),
            completed: false,
        }
    }

    fn service_with(
        seed: Vec<Task>,
        todos: Vec<RemoteTodo>,
    ) -> (TaskService, Arc<InMemoryTaskStore>, Arc<StaticTodoSource>) {
        let repo = Arc::new(InMemoryTaskStore::with_tasks(seed));
        let source = Arc::new(StaticTodoSource::new(todos));
        let service =
            TaskService::with_repository(repo.clone(), Some(source.clone() as Arc<dyn TodoSource>));
        (service, repo, source)
    }

    async fn ready_service() -> (TaskService, Arc<InMemoryTaskStore>) {
        let (service, repo, _source) = service_with(Vec::new(), Vec::new());
        service.start().await.unwrap();
        (service, repo)
    }

    fn titles(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.title.as_str()).collect()
    }

    #[tokio::test]
    async fn test_start_purges_before_import() {
        // Only blank tasks: once purged the store is empty, so the import must run
        let (service, _repo, source) = service_with(
            vec![Task::new("").with_id(100), Task::new("  ").with_id(101)],
            vec![remote(1, "Imported")],
        );
        let mut rx = service.subscribe();

        let outcome = service.start().await.unwrap();

        assert_eq!(outcome, ImportOutcome::Completed { imported: 1 });
        assert_eq!(source.fetch_count(), 1);
        assert_eq!(service.state().await, ServiceState::Ready);
        match rx.try_recv().unwrap() {
            ServiceEvent::StateChanged(tasks) => assert_eq!(titles(&tasks), vec!["Imported"]),
            other => panic!("Expected StateChanged, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_start_skips_import_when_store_has_tasks() {
        let seed = vec![Task::new("Existing").with_id(5).with_details("kept")];
        let (service, repo, source) = service_with(seed.clone(), vec![remote(1, "Imported")]);

        let outcome = service.start().await.unwrap();

        assert_eq!(outcome, ImportOutcome::Skipped);
        assert_eq!(source.fetch_count(), 0);
        assert_eq!(repo.list().await.unwrap(), seed);
        assert_eq!(service.tasks().await, seed);
    }

    #[tokio::test]
    async fn test_start_without_importer() {
        let repo = Arc::new(InMemoryTaskStore::new());
        let service = TaskService::with_repository(repo, None);

        assert_eq!(service.start().await.unwrap(), ImportOutcome::Skipped);
        assert!(service.tasks().await.is_empty());
    }

    #[tokio::test]
    async fn test_start_twice_fails() {
        let (service, _repo) = ready_service().await;
        assert!(matches!(service.start().await, Err(Error::AlreadyStarted)));
    }

    #[tokio::test]
    async fn test_operations_rejected_before_start() {
        let (service, repo, _source) = service_with(Vec::new(), Vec::new());
        let mut rx = service.subscribe();

        assert_eq!(service.state().await, ServiceState::Uninitialized);
        assert!(matches!(service.add("Early", "").await, Err(Error::NotReady)));
        assert!(matches!(service.search("x").await, Err(Error::NotReady)));
        assert_eq!(repo.count().await.unwrap(), 0);
        assert!(matches!(rx.try_recv().unwrap(), ServiceEvent::Error(_)));
    }

    #[tokio::test]
    async fn test_add_pushes_refreshed_list() {
        let (service, _repo) = ready_service().await;
        let mut rx = service.subscribe();

        let task = service.add("PresenterTest", "PresenterDetails").await.unwrap();

        match rx.try_recv().unwrap() {
            ServiceEvent::StateChanged(tasks) => {
                assert_eq!(tasks.len(), 1);
                assert_eq!(tasks[0].id, task.id);
                assert_eq!(tasks[0].details, "PresenterDetails");
            }
            other => panic!("Expected StateChanged, got: {:?}", other),
        }
        assert_eq!(service.tasks().await.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_add_pushes_error_then_refresh() {
        let (service, repo) = ready_service().await;
        repo.set_fail_writes(true);
        let mut rx = service.subscribe();

        assert!(matches!(
            service.add("Doomed", "").await,
            Err(Error::Persistence(_))
        ));

        match rx.try_recv().unwrap() {
            ServiceEvent::Error(message) => assert!(message.contains("add task")),
            other => panic!("Expected Error, got: {:?}", other),
        }
        assert!(matches!(
            rx.try_recv().unwrap(),
            ServiceEvent::StateChanged(tasks) if tasks.is_empty()
        ));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (service, _repo) = ready_service().await;

        let task = service.add("Old", "").await.unwrap();
        let updated = service.update(task.id, "New", "more", true).await.unwrap();
        assert_eq!(updated.created_at, task.created_at);
        assert_eq!(service.tasks().await, vec![updated]);

        service.delete(task.id).await.unwrap();
        assert!(service.tasks().await.is_empty());
        assert!(matches!(
            service.delete(task.id).await,
            Err(Error::TaskNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_search_pushes_matches() {
        let (service, _repo) = ready_service().await;
        service.add("FindMe", "").await.unwrap();
        service.add("Other", "").await.unwrap();
        let mut rx = service.subscribe();

        let found = service.search("findme").await.unwrap();

        assert_eq!(titles(&found), vec!["FindMe"]);
        assert!(matches!(
            rx.try_recv().unwrap(),
            ServiceEvent::StateChanged(tasks) if tasks.len() == 1
        ));
        assert_eq!(service.tasks().await, found);
    }

    #[tokio::test]
    async fn test_empty_search_lists_everything() {
        let (service, _repo) = ready_service().await;
        service.add("One", "").await.unwrap();
        service.add("Two", "").await.unwrap();
        service.search("One").await.unwrap();

        let all = service.search("").await.unwrap();

        assert_eq!(all.len(), 2);
        assert_eq!(service.tasks().await.len(), 2);
    }

    #[tokio::test]
    async fn test_events_follow_call_order() {
        let (service, _repo) = ready_service().await;
        let mut rx = service.subscribe();

        service.add("A", "").await.unwrap();
        service.add("B", "").await.unwrap();

        let mut sizes = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(ServiceEvent::StateChanged(tasks)) => sizes.push(tasks.len()),
                Ok(other) => panic!("Unexpected event: {:?}", other),
                Err(TryRecvError::Empty) => break,
                Err(e) => panic!("Receive failed: {:?}", e),
            }
        }
        assert_eq!(sizes, vec![1, 2]);
    }
}
