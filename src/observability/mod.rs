//! Observability utilities.
//!
//! Diagnostics go through `tracing`; this module adds a markdown audit file
//! of every command an [`Executor`](crate::executor::Executor) runs.
//!
//! # Example
//!
//! ```no_run
//! use regkit::executor::{Executor, TokioSpawner};
//! use regkit::observability::CommandLog;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let log = CommandLog::new(Some(Path::new("logs/regkit.md")), Some("DEBUG")).unwrap();
//! let executor = Executor::new(Arc::new(TokioSpawner::new())).with_command_log(Arc::new(log));
//! ```

pub mod logger;

pub use logger::CommandLog;
