//! Application state

use std::path::PathBuf;
use std::sync::Arc;

use todo_core::import::{HttpTodoSource, TodoSource};
use todo_core::service::TaskService;
use todo_core::task::FileTaskStore;

use crate::config::Config;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    service: Arc<TaskService>,
    data_dir: PathBuf,
}

impl AppState {
    /// Open the task file and wire the service for `config`
    pub async fn new(config: &Config) -> todo_core::Result<Self> {
        let task_store = FileTaskStore::new(config.tasks_path()).await?;

        let source: Option<Arc<dyn TodoSource>> = if config.import_enabled {
            Some(Arc::new(HttpTodoSource::with_timeout(
                config.import_url.clone(),
                config.import_timeout,
            )?))
        } else {
            None
        };

        let service = TaskService::with_repository(Arc::new(task_store), source);
        Ok(Self::with_service(Arc::new(service), config.data_dir.clone()))
    }

    pub fn with_service(service: Arc<TaskService>, data_dir: PathBuf) -> Self {
        Self {
            inner: Arc::new(AppStateInner { service, data_dir }),
        }
    }

    pub fn service(&self) -> &TaskService {
        &self.inner.service
    }

    pub fn service_arc(&self) -> Arc<TaskService> {
        Arc::clone(&self.inner.service)
    }

    pub fn data_dir(&self) -> &PathBuf {
        &self.inner.data_dir
    }
}
