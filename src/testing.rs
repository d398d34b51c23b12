//! Repository double shared by the unit tests.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use time::OffsetDateTime;

use crate::repository::{
    AssetId, EntityKind, InMemoryRepository, Query, RawRecord, Repository, RepositoryError,
};

/// In-memory repository that remembers every query it served and can be
/// switched into a failing mode.
#[derive(Debug, Default)]
pub(crate) struct RecordingRepository {
    inner: InMemoryRepository,
    queries: Mutex<Vec<Query>>,
    failing: AtomicBool,
}

impl RecordingRepository {
    pub(crate) fn insert(&self, kind: EntityKind, record: RawRecord) {
        self.inner.insert(kind, record);
    }

    pub(crate) fn insert_project(
        &self,
        id: &str,
        name: &str,
        parent: Option<&str>,
        modified_at: OffsetDateTime,
    ) {
        self.insert(
            EntityKind::Scope,
            RawRecord::project(id, name, parent.map(AssetId::from), modified_at),
        );
    }

    pub(crate) fn insert_defect(
        &self,
        id: &str,
        scope: &str,
        modified_at: OffsetDateTime,
        created_at: OffsetDateTime,
    ) {
        self.insert(
            EntityKind::Defect,
            RawRecord::item(id, scope, modified_at, created_at),
        );
    }

    /// Applies `change` and stamps the record as modified at `modified_at`.
    pub(crate) fn update_project(
        &self,
        id: &AssetId,
        modified_at: OffsetDateTime,
        change: impl FnOnce(&mut RawRecord),
    ) {
        let found = self.inner.update(EntityKind::Scope, id, |row| {
            change(row);
            row.modified_at = modified_at;
        });
        assert!(found, "no project '{}' to update", id);
    }

    pub(crate) fn touch_defect(&self, id: &AssetId, modified_at: OffsetDateTime) {
        let found = self.inner.update(EntityKind::Defect, id, |row| {
            row.modified_at = modified_at;
        });
        assert!(found, "no defect '{}' to touch", id);
    }

    pub(crate) fn remove(&self, kind: EntityKind, id: &AssetId) -> Option<RawRecord> {
        self.inner.remove(kind, id)
    }

    pub(crate) fn queries(&self) -> Vec<Query> {
        self.queries.lock().clone()
    }

    pub(crate) fn clear_queries(&self) {
        self.queries.lock().clear();
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl Repository for RecordingRepository {
    fn fetch_records(&self, query: &Query) -> Result<Vec<RawRecord>, RepositoryError> {
        self.queries.lock().push(query.clone());
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepositoryError::FetchError {
                kind: query.kind,
                message: "connection reset".to_string(),
            });
        }
        self.inner.fetch_records(query)
    }
}
