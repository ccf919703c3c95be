//! Task module
//!
//! This module contains task-related types, storage backends and the
//! serialized store handle.

mod file_store;
mod memory_store;
mod model;
mod repository;
mod store;

pub use file_store::FileTaskStore;
pub use memory_store::InMemoryTaskStore;
pub use model::*;
pub use repository::TaskRepository;
pub use store::TaskStore;
