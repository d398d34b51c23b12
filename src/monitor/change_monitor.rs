use std::sync::Arc;

use derive_more::Display;
use parking_lot::Mutex;
use snafu::prelude::*;
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::hierarchy::ProjectView;
use crate::monitor::MonitoredSet;
use crate::repository::{
    AssetId, EntityKind, Field, Filter, Query, RawRecord, Repository, RepositoryError,
};
use crate::watermark::Watermark;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Kind of item whose changes and creations are tracked.
    pub item_kind: EntityKind,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            item_kind: EntityKind::Defect,
        }
    }
}

/// The two independent time axes a monitor tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
enum Axis {
    #[display("change")]
    Change,
    #[display("creation")]
    Creation,
}

impl Axis {
    fn field(self) -> Field {
        match self {
            Axis::Change => Field::ChangeDate,
            Axis::Creation => Field::CreateDate,
        }
    }

    fn timestamp(self, record: &RawRecord) -> Option<OffsetDateTime> {
        match self {
            Axis::Change => Some(record.modified_at),
            Axis::Creation => record.created_at,
        }
    }
}

#[derive(Debug, Default)]
struct MonitorState {
    monitored: MonitoredSet,
    most_recent_change: Watermark,
    most_recent_creation: Watermark,
}

impl MonitorState {
    fn watermark(&mut self, axis: Axis) -> &mut Watermark {
        match axis {
            Axis::Change => &mut self.most_recent_change,
            Axis::Creation => &mut self.most_recent_creation,
        }
    }
}

/// Tracks the latest change and creation times of items belonging to a
/// monitored set of projects.
///
/// The `get_most_recent_*` calls advance their own watermark and only ask the
/// repository for items newer than it. The `has_*_since` calls are stateless
/// point queries against a caller-supplied time.
pub struct ChangeMonitor<R> {
    repository: Arc<R>,
    config: MonitorConfig,
    state: Mutex<MonitorState>,
}

impl<R: Repository> ChangeMonitor<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self::with_config(repository, MonitorConfig::default())
    }

    pub fn with_config(repository: Arc<R>, config: MonitorConfig) -> Self {
        Self {
            repository,
            config,
            state: Mutex::new(MonitorState::default()),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn monitor(&self, id: AssetId) -> bool {
        self.state.lock().monitored.insert(id)
    }

    pub fn monitor_view(&self, view: ProjectView<'_>, include_descendants: bool) -> usize {
        self.state
            .lock()
            .monitored
            .insert_view(view, include_descendants)
    }

    pub fn unmonitor(&self, id: &AssetId) -> bool {
        self.state.lock().monitored.remove(id)
    }

    pub fn clear_monitored(&self) {
        self.state.lock().monitored.clear();
    }

    pub fn monitored(&self) -> MonitoredSet {
        self.state.lock().monitored.clone()
    }

    pub fn change_watermark(&self) -> Option<OffsetDateTime> {
        self.state.lock().most_recent_change.get()
    }

    pub fn creation_watermark(&self) -> Option<OffsetDateTime> {
        self.state.lock().most_recent_creation.get()
    }

    pub fn get_most_recent_change_time(&self) -> Result<Option<OffsetDateTime>, ChangeMonitorError> {
        self.most_recent(Axis::Change)
    }

    pub fn get_most_recent_creation_time(&self) -> Result<Option<OffsetDateTime>, ChangeMonitorError> {
        self.most_recent(Axis::Creation)
    }

    /// `true` if `since` is `None`, otherwise whether any monitored item was
    /// modified after `since`.
    pub fn has_changed_since(&self, since: Option<OffsetDateTime>) -> Result<bool, ChangeMonitorError> {
        self.has_any_since(Axis::Change, since)
    }

    /// `true` if `since` is `None`, otherwise whether any monitored item was
    /// created after `since`.
    pub fn has_new_since(&self, since: Option<OffsetDateTime>) -> Result<bool, ChangeMonitorError> {
        self.has_any_since(Axis::Creation, since)
    }

    fn most_recent(&self, axis: Axis) -> Result<Option<OffsetDateTime>, ChangeMonitorError> {
        let mut state = self.state.lock();
        let current = *state.watermark(axis);

        let Some(scope) = state.monitored.scope_filter() else {
            debug!("Nothing monitored, {} watermark stays at {:?}", axis, current.get());
            return Ok(current.get());
        };
        let filter = match current.lower_bound(axis.field()) {
            Some(newer) => newer.and(scope),
            None => scope,
        };
        let query = Query::new(self.config.item_kind)
            .select(axis.field())
            .filter(filter);

        let records = self
            .repository
            .fetch_records(&query)
            .context(FetchSnafu { kind: self.config.item_kind })?;

        // Fold into a copy so a bad row leaves the committed watermark untouched.
        let mut next = current;
        for record in &records {
            let timestamp = axis.timestamp(record).context(MissingTimestampSnafu {
                id: record.id.clone(),
                field: axis.field(),
            })?;
            next.observe(timestamp);
        }

        if next != current {
            info!(
                "Most recent {} advanced from {:?} to {:?}",
                axis,
                current.get(),
                next.get()
            );
        }
        *state.watermark(axis) = next;
        Ok(next.get())
    }

    fn has_any_since(
        &self,
        axis: Axis,
        since: Option<OffsetDateTime>,
    ) -> Result<bool, ChangeMonitorError> {
        let Some(since) = since else {
            return Ok(true);
        };
        // Held for the whole query so calls on one monitor stay serialized.
        let state = self.state.lock();
        let Some(scope) = state.monitored.scope_filter() else {
            return Ok(false);
        };

        let query = Query::new(self.config.item_kind)
            .select(Field::Id)
            .filter(Filter::greater(axis.field(), since).and(scope));
        let records = self
            .repository
            .fetch_records(&query)
            .context(FetchSnafu { kind: self.config.item_kind })?;
        debug!("{} item(s) with a {} after {:?}", records.len(), axis, since);
        Ok(!records.is_empty())
    }
}

#[derive(Debug, Snafu)]
pub enum ChangeMonitorError {
    #[snafu(display("Failed to query the repository for {} records", kind))]
    FetchError {
        kind: EntityKind,
        source: RepositoryError,
    },
    #[snafu(display("Record '{}' has no {} value", id, field))]
    MissingTimestamp { id: AssetId, field: Field },
}
