//! Cached project hierarchy with watermark-based change detection.
//!
//! The [`hierarchy`] module materializes a flat, unordered set of project
//! records into a path-annotated tree and keeps it cached until the remote
//! source reports a newer modification. The [`monitor`] module answers
//! "has anything changed or appeared since time T?" for a caller-chosen set
//! of projects. Both talk to the outside world only through the
//! [`repository::Repository`] trait.

pub mod ext;
pub mod hierarchy;
pub mod monitor;
pub mod repository;
pub mod watermark;

#[cfg(test)]
mod testing;

pub use hierarchy::{
    BuiltHierarchy, HierarchyBuildError, HierarchyBuilder, HierarchyCache, HierarchyCacheError,
    HierarchyConfig, Project, ProjectIndex, ProjectView,
};
pub use monitor::{ChangeMonitor, ChangeMonitorError, MonitorConfig, MonitoredSet};
pub use repository::{
    AssetId, EntityKind, Field, Filter, InMemoryRepository, Query, RawRecord, Repository,
    RepositoryError, Sort, SortOrder,
};
pub use watermark::Watermark;
