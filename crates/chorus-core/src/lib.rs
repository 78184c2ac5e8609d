//! chorus-core library.
//!
//! The activity core of chorus: an entity store (users, workspaces,
//! datasets, workfiles, data instances), an append-only event log with a
//! closed event taxonomy validated at emission, a permission layer of pure
//! per-call predicates, and a feed assembler that produces per-viewer,
//! access-filtered activity pages.
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` enums at module seams; `anyhow::Result`
//!   with `.context(...)` for storage plumbing.
//! - **Logging**: `tracing` macros (`info!`, `warn!`, `debug!`).
//! - **Viewer identity**: every permission predicate and feed query takes
//!   the viewer explicitly. There is no ambient current-user state.

pub mod access;
pub mod config;
pub mod error;
pub mod event;
pub mod feed;
pub mod model;
pub mod store;
