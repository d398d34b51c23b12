use std::fmt;
use std::ops::Deref;
use std::slice;

use hashlink::LinkedHashMap;
use time::OffsetDateTime;

use crate::repository::{AssetId, Field, Filter};

/// A materialized project node.
///
/// `path_name` is fixed at build time; later renames or moves at the source
/// only show up after the next rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub(crate) id: AssetId,
    pub(crate) name: String,
    pub(crate) parent_id: Option<AssetId>,
    pub(crate) path_name: String,
    pub(crate) modified_at: OffsetDateTime,
    pub(crate) children: Vec<AssetId>,
}

impl Project {
    pub fn id(&self) -> &AssetId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent_id(&self) -> Option<&AssetId> {
        self.parent_id.as_ref()
    }

    pub fn path_name(&self) -> &str {
        &self.path_name
    }

    pub fn modified_at(&self) -> OffsetDateTime {
        self.modified_at
    }

    /// Ids of the direct children, in the order they were attached.
    pub fn child_ids(&self) -> &[AssetId] {
        &self.children
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// One generation of the materialized hierarchy, keyed by project id.
///
/// Built wholesale by [`HierarchyBuilder`](super::HierarchyBuilder) and never
/// patched afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectIndex {
    pub(crate) projects: LinkedHashMap<AssetId, Project>,
    pub(crate) roots: Vec<AssetId>,
}

impl ProjectIndex {
    pub fn get(&self, id: &AssetId) -> Option<ProjectView<'_>> {
        self.projects.get(id).map(|project| ProjectView {
            index: self,
            project,
        })
    }

    pub fn contains(&self, id: &AssetId) -> bool {
        self.projects.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    /// Every project in the order it was placed into the tree.
    pub fn iter(&self) -> impl Iterator<Item = ProjectView<'_>> {
        self.projects.values().map(move |project| ProjectView {
            index: self,
            project,
        })
    }

    pub fn roots(&self) -> impl Iterator<Item = ProjectView<'_>> {
        self.roots.iter().filter_map(move |id| self.get(id))
    }

    pub fn find_by_path(&self, path_name: &str) -> Option<ProjectView<'_>> {
        self.iter().find(|view| view.path_name == path_name)
    }
}

/// A project together with the index it lives in, so that tree navigation
/// does not need the index passed around separately.
#[derive(Clone, Copy)]
pub struct ProjectView<'a> {
    index: &'a ProjectIndex,
    project: &'a Project,
}

impl<'a> ProjectView<'a> {
    pub fn project(&self) -> &'a Project {
        self.project
    }

    pub fn parent(&self) -> Option<ProjectView<'a>> {
        self.project
            .parent_id
            .as_ref()
            .and_then(|parent_id| self.index.get(parent_id))
    }

    pub fn children(self) -> impl Iterator<Item = ProjectView<'a>> {
        let index = self.index;
        self.project
            .children
            .iter()
            .filter_map(move |child_id| index.get(child_id))
    }

    /// Parent first, root last.
    pub fn ancestors(&self) -> Vec<ProjectView<'a>> {
        let mut ancestors = Vec::new();
        let mut current = self.parent();
        while let Some(view) = current {
            ancestors.push(view);
            current = view.parent();
        }
        ancestors
    }

    pub fn depth(&self) -> usize {
        self.ancestors().len()
    }

    /// Just this project, as a one-element view.
    pub fn just_me(&self) -> &'a [Project] {
        slice::from_ref(self.project)
    }

    /// This project followed by all of its descendants, depth first, children
    /// in attachment order.
    pub fn self_and_descendants(&self) -> Vec<&'a Project> {
        let index = self.index;
        let mut collected = Vec::new();
        let mut pending = vec![self.project];
        while let Some(project) = pending.pop() {
            collected.push(project);
            pending.extend(
                project
                    .children
                    .iter()
                    .rev()
                    .filter_map(|child_id| index.projects.get(child_id)),
            );
        }
        collected
    }

    pub fn scope(&self, include_descendants: bool) -> Vec<&'a Project> {
        if include_descendants {
            self.self_and_descendants()
        } else {
            self.just_me().iter().collect()
        }
    }

    /// Restricts an item query to the projects in [`scope`](Self::scope).
    pub fn scope_filter(&self, include_descendants: bool) -> Filter {
        Filter::equal(
            Field::Scope,
            self.scope(include_descendants)
                .into_iter()
                .map(|project| project.id.clone()),
        )
    }
}

impl<'a> Deref for ProjectView<'a> {
    type Target = Project;

    fn deref(&self) -> &Self::Target {
        self.project
    }
}

impl fmt::Debug for ProjectView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectView")
            .field("id", &self.project.id)
            .field("path_name", &self.project.path_name)
            .finish()
    }
}

impl PartialEq for ProjectView<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.project == other.project
    }
}
