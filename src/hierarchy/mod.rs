//! Materialized project tree and its freshness-checked cache.

mod builder;
mod cache;
mod project;

pub use builder::{BuiltHierarchy, HierarchyBuildError, HierarchyBuilder, HierarchyConfig};
pub use cache::{HierarchyCache, HierarchyCacheError};
pub use project::{Project, ProjectIndex, ProjectView};
