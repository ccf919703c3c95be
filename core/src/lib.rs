//! Core library for the to-do service
//!
//! This crate contains the task data-access layer:
//! - Task storage behind a serial work queue
//! - One-shot import from a remote todo list
//! - The task service facade used by presentation adapters

pub mod error;
pub mod import;
pub mod service;
pub mod task;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
