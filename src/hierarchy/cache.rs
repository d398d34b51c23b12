use std::sync::Arc;

use parking_lot::Mutex;
use snafu::prelude::*;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::hierarchy::{HierarchyBuildError, HierarchyBuilder, HierarchyConfig, ProjectIndex};
use crate::repository::{EntityKind, Field, Query, Repository, RepositoryError, Sort};
use crate::watermark::Watermark;

#[derive(Debug, Default)]
struct CacheState {
    index: Option<Arc<ProjectIndex>>,
    watermark: Watermark,
}

/// Keeps the last materialized hierarchy and rebuilds it only when the
/// repository reports a project modified after the cached watermark.
///
/// Every operation holds the internal lock for its full fetch, build and
/// commit, so concurrent callers on one instance are serialized and never
/// observe a half-updated cache.
pub struct HierarchyCache<R> {
    repository: Arc<R>,
    builder: HierarchyBuilder,
    state: Mutex<CacheState>,
}

impl<R: Repository> HierarchyCache<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self::with_config(repository, HierarchyConfig::default())
    }

    pub fn with_config(repository: Arc<R>, config: HierarchyConfig) -> Self {
        Self {
            repository,
            builder: HierarchyBuilder::new(config),
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Asks the repository whether any project changed after the watermark.
    /// A cache that has never been built is always dirty.
    pub fn is_dirty(&self) -> Result<bool, HierarchyCacheError> {
        let state = self.state.lock();
        self.is_dirty_locked(&state)
    }

    /// Returns the cached index, rebuilding it first if the cache is dirty.
    pub fn get_index(&self) -> Result<Arc<ProjectIndex>, HierarchyCacheError> {
        let mut state = self.state.lock();
        if !self.is_dirty_locked(&state)? {
            if let Some(index) = &state.index {
                debug!("Hierarchy cache is clean, serving cached index");
                return Ok(Arc::clone(index));
            }
        }
        self.rebuild_locked(&mut state)
    }

    /// Rebuilds unconditionally.
    pub fn reload(&self) -> Result<Arc<ProjectIndex>, HierarchyCacheError> {
        let mut state = self.state.lock();
        self.rebuild_locked(&mut state)
    }

    /// Latest project modification seen by a successful build.
    pub fn watermark(&self) -> Option<OffsetDateTime> {
        self.state.lock().watermark.get()
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    fn is_dirty_locked(&self, state: &CacheState) -> Result<bool, HierarchyCacheError> {
        let Some(filter) = state.watermark.lower_bound(Field::ChangeDate) else {
            debug!("Hierarchy cache has no watermark yet, treating as dirty");
            return Ok(true);
        };

        let query = Query::new(EntityKind::Scope)
            .select(Field::Id)
            .filter(filter);
        let changed = self.repository.fetch_records(&query).context(FetchSnafu)?;
        debug!("{} project(s) changed since the last build", changed.len());
        Ok(!changed.is_empty())
    }

    fn rebuild_locked(&self, state: &mut CacheState) -> Result<Arc<ProjectIndex>, HierarchyCacheError> {
        let query = Query::new(EntityKind::Scope)
            .select(Field::Name)
            .select(Field::Parent)
            .select(Field::ChangeDate)
            .sort(Sort::ascending(Field::Parent));
        let records = self.repository.fetch_records(&query).context(FetchSnafu)?;

        let built = match self.builder.build(records) {
            Ok(built) => built,
            Err(error) => {
                warn!("Hierarchy build failed, keeping the previous index: {}", error);
                return Err(error).context(BuildSnafu);
            }
        };

        let index = Arc::new(built.index);
        if let Some(latest_change) = built.latest_change {
            state.watermark.observe(latest_change);
        }
        state.index = Some(Arc::clone(&index));
        info!(
            "Rebuilt hierarchy with {} project(s), watermark {:?}",
            index.len(),
            state.watermark.get()
        );
        Ok(index)
    }
}

#[derive(Debug, Snafu)]
pub enum HierarchyCacheError {
    #[snafu(display("Failed to query the repository for projects"))]
    FetchError { source: RepositoryError },
    #[snafu(display("Failed to build the project hierarchy"))]
    BuildError { source: HierarchyBuildError },
}
