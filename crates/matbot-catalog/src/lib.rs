//! matbot catalog - task materials and their durable store
//!
//! Maps each of the fixed tasks (1..=19) to an ordered list of media
//! references and keeps that mapping on disk:
//! - [`TaskId`], [`MediaKind`], [`MediaReference`] value types
//! - [`Catalog`] in-memory mapping with display ordering
//! - [`CatalogStore`] write-through persistence with atomic file replacement
//!
//! # Example
//!
//! ```rust,ignore
//! use matbot_catalog::{CatalogStore, MediaReference, TaskId};
//!
//! let store = CatalogStore::open("materials.json");
//! let task = TaskId::new(5)?;
//! store.append(task, MediaReference::document("BQACAgIAAxk"))?;
//! assert_eq!(store.get(task).len(), 1);
//! ```

#![warn(unreachable_pub)]

pub mod catalog;
pub mod error;
pub mod store;
pub mod types;

pub use catalog::{Catalog, SkippedEntry};
pub use error::{CatalogError, ValidationError};
pub use store::{CatalogStore, LoadReport, LoadSource};
pub use types::{MediaKind, MediaReference, TaskId};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
