use std::collections::{HashSet, VecDeque};

use hashlink::LinkedHashMap;
use snafu::prelude::*;
use time::OffsetDateTime;
use tracing::debug;

use crate::hierarchy::{Project, ProjectIndex};
use crate::repository::{AssetId, RawRecord};
use crate::watermark::Watermark;

const DEFAULT_PATH_SEPARATOR: &str = "\\";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyConfig {
    /// Placed between a parent's path and a child's name.
    pub path_separator: String,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            path_separator: DEFAULT_PATH_SEPARATOR.to_string(),
        }
    }
}

/// Output of a successful build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltHierarchy {
    pub index: ProjectIndex,
    /// Latest `modified_at` across every record, roots included.
    pub latest_change: Option<OffsetDateTime>,
}

/// Turns a flat, arbitrarily ordered list of project records into a tree.
///
/// Records whose parent has not been placed yet are pushed to the back of a
/// work queue and retried later. If the queue completes a whole rotation
/// without placing anything, the remaining records can never resolve (their
/// parent is missing or they form a cycle) and the build fails.
///
/// Sibling order follows the order in which records were placed, which is not
/// necessarily their input order.
#[derive(Debug, Clone, Default)]
pub struct HierarchyBuilder {
    config: HierarchyConfig,
}

impl HierarchyBuilder {
    pub fn new(config: HierarchyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HierarchyConfig {
        &self.config
    }

    pub fn build(
        &self,
        records: impl IntoIterator<Item = RawRecord>,
    ) -> Result<BuiltHierarchy, HierarchyBuildError> {
        let mut queue: VecDeque<RawRecord> = records.into_iter().collect();
        Self::ensure_unique_ids(&queue)?;
        debug!("Building hierarchy from {} record(s)", queue.len());

        let mut projects: LinkedHashMap<AssetId, Project> = LinkedHashMap::new();
        let mut roots = Vec::new();
        let mut latest_change = Watermark::new();
        let mut deferred_in_a_row = 0usize;

        while let Some(record) = queue.pop_front() {
            if let Some(parent_id) = &record.parent_id {
                if !projects.contains_key(parent_id) {
                    debug!(
                        "Deferring '{}' until parent '{}' is placed",
                        record.id, parent_id
                    );
                    queue.push_back(record);
                    deferred_in_a_row += 1;
                    // Every queued record has been retried since the last placement.
                    if deferred_in_a_row >= queue.len() {
                        let mut unresolved: Vec<AssetId> =
                            queue.into_iter().map(|record| record.id).collect();
                        unresolved.sort();
                        return UnresolvableHierarchySnafu { unresolved }.fail();
                    }
                    continue;
                }
            }
            deferred_in_a_row = 0;

            let RawRecord {
                id,
                name,
                parent_id,
                modified_at,
                ..
            } = record;
            let name = name.context(MissingNameSnafu { id: id.clone() })?;

            let path_name = match &parent_id {
                Some(parent_id) => {
                    let parent = projects
                        .get_mut(parent_id)
                        .context(UnresolvableHierarchySnafu {
                            unresolved: vec![id.clone()],
                        })?;
                    parent.children.push(id.clone());
                    format!("{}{}{}", parent.path_name, self.config.path_separator, name)
                }
                None => {
                    roots.push(id.clone());
                    name.clone()
                }
            };

            latest_change.observe(modified_at);
            projects.insert(
                id.clone(),
                Project {
                    id,
                    name,
                    parent_id,
                    path_name,
                    modified_at,
                    children: Vec::new(),
                },
            );
        }

        debug!(
            "Placed {} project(s) under {} root(s)",
            projects.len(),
            roots.len()
        );
        Ok(BuiltHierarchy {
            index: ProjectIndex { projects, roots },
            latest_change: latest_change.get(),
        })
    }

    fn ensure_unique_ids(records: &VecDeque<RawRecord>) -> Result<(), HierarchyBuildError> {
        let mut seen = HashSet::with_capacity(records.len());
        for record in records {
            ensure!(
                seen.insert(&record.id),
                DuplicateProjectSnafu {
                    id: record.id.clone()
                }
            );
        }
        Ok(())
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum HierarchyBuildError {
    #[snafu(display(
        "Parents of {} project(s) never resolved (missing parent or cycle): {:?}",
        unresolved.len(),
        unresolved
    ))]
    UnresolvableHierarchy { unresolved: Vec<AssetId> },
    #[snafu(display("Project '{}' appears more than once", id))]
    DuplicateProject { id: AssetId },
    #[snafu(display("Project '{}' has no name", id))]
    MissingName { id: AssetId },
}
