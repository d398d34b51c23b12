use std::sync::Arc;

use scopewatch::{
    AssetId, ChangeMonitor, ChangeMonitorError, HierarchyCache, HierarchyCacheError,
    InMemoryRepository, ProjectIndex, RepositoryError,
};
use snafu::Snafu;
use snafu::prelude::*;
use tracing::{debug, info};

use crate::application::RuntimeConfig;
use crate::application::data::{MonitorSummary, Report, ReportedProject};

pub struct Application;

impl Application {
    pub async fn run(app_config: impl Into<RuntimeConfig>) -> Result<(), ApplicationError> {
        let app_config: RuntimeConfig = app_config.into();
        let report = Self::inspect(&app_config).await?;
        print!("{}", report);
        Ok(())
    }

    pub async fn inspect(app_config: &RuntimeConfig) -> Result<Report, ApplicationError> {
        let repository = InMemoryRepository::read(&app_config.snapshot)
            .await
            .context(SnapshotSnafu)?;
        let repository = Arc::new(repository);

        let cache = HierarchyCache::with_config(Arc::clone(&repository), app_config.hierarchy.clone());
        let index = cache.get_index().context(HierarchySnafu)?;
        info!("Loaded {} project(s) from the snapshot", index.len());

        let projects = index
            .roots()
            .flat_map(|root| root.self_and_descendants())
            .map(|project| ReportedProject {
                path_name: project.path_name().to_string(),
                is_root: project.is_root(),
            })
            .collect();

        let monitor = if app_config.monitored.is_empty() {
            None
        } else {
            Some(Self::summarize(repository, &index, app_config)?)
        };

        Ok(Report { projects, monitor })
    }

    fn summarize(
        repository: Arc<InMemoryRepository>,
        index: &ProjectIndex,
        app_config: &RuntimeConfig,
    ) -> Result<MonitorSummary, ApplicationError> {
        let monitor = ChangeMonitor::new(repository);
        for id in &app_config.monitored {
            let view = index
                .get(id)
                .context(UnknownProjectSnafu { id: id.clone() })?;
            let added = monitor.monitor_view(view, app_config.include_descendants);
            debug!("Monitoring '{}' added {} project(s)", view.path_name(), added);
        }

        Ok(MonitorSummary {
            monitored: monitor.monitored().len(),
            most_recent_change: monitor
                .get_most_recent_change_time()
                .context(MonitorSnafu)?,
            most_recent_creation: monitor
                .get_most_recent_creation_time()
                .context(MonitorSnafu)?,
        })
    }
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(display("Critical failure encountered while loading the snapshot"))]
    SnapshotError { source: RepositoryError },
    #[snafu(display("Critical failure encountered while building the hierarchy"))]
    HierarchyError { source: HierarchyCacheError },
    #[snafu(display("Project '{}' is not part of the hierarchy", id))]
    UnknownProject { id: AssetId },
    #[snafu(display("Critical failure encountered while querying monitored items"))]
    MonitorError { source: ChangeMonitorError },
}
