//! # Composition Root
//!
//! Wires the registry, per-project lifecycle store, file-state store,
//! embedded vector/graph stores, and memory guard into a single `Core`
//! handle whose methods (`index`, `incremental_update`, `delete`,
//! `status`) are the only public surface. Replaces a dynamic
//! dependency-injection container with explicit construction in one
//! place; nothing here is resolved through a service locator.
//!
//! ```text
//! Core::open(config, embedder)
//!     ├─ ProjectRegistry   (path <-> projectId)
//!     ├─ ProjectStore      (lifecycle: pending/indexing/completed/error)
//!     ├─ JsonVectorStore   (shared across projects, one collection each)
//!     ├─ JsonGraphStore    (shared across projects, one space each)
//!     ├─ MemoryGuard       (shared sampler)
//!     ├─ per call: FileStateStore + Coordinator (one job at a time per project)
//!     └─ per project: a `codeindex-watcher` filesystem watch, started on
//!        first successful index and resumed on `open` for every
//!        already-registered project, triggering `incremental_update`
//!        on change
//! ```

mod config;
mod core;
mod error;
mod project;
mod watch;

pub use config::CoreConfig;
pub use core::{Core, StatusReport};
pub use error::{CoreError, ErrorKind, Result};
pub use project::{ProjectRecord, ProjectStatus, ProjectStore};
