use hashlink::LinkedHashSet;

use crate::hierarchy::ProjectView;
use crate::repository::{AssetId, Field, Filter};

/// Caller-maintained set of projects a [`ChangeMonitor`](super::ChangeMonitor)
/// is scoped to. Never derived from the hierarchy automatically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitoredSet {
    ids: LinkedHashSet<AssetId>,
}

impl MonitoredSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the project was already monitored. An existing
    /// entry keeps its position.
    pub fn insert(&mut self, id: AssetId) -> bool {
        if self.ids.contains(&id) {
            return false;
        }
        self.ids.insert(id)
    }

    /// Adds a project, or the project and everything below it.
    pub fn insert_view(&mut self, view: ProjectView<'_>, include_descendants: bool) -> usize {
        view.scope(include_descendants)
            .into_iter()
            .filter(|project| self.insert(project.id().clone()))
            .count()
    }

    pub fn remove(&mut self, id: &AssetId) -> bool {
        self.ids.remove(id)
    }

    pub fn contains(&self, id: &AssetId) -> bool {
        self.ids.contains(id)
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AssetId> {
        self.ids.iter()
    }

    /// `Scope` membership filter, or `None` when nothing is monitored.
    pub fn scope_filter(&self) -> Option<Filter> {
        if self.ids.is_empty() {
            None
        } else {
            Some(Filter::equal(Field::Scope, self.ids.iter().cloned()))
        }
    }
}

impl FromIterator<AssetId> for MonitoredSet {
    fn from_iter<I: IntoIterator<Item = AssetId>>(ids: I) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }
}
