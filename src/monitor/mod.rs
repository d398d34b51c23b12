mod change_monitor;
mod monitored_set;

pub use change_monitor::{ChangeMonitor, ChangeMonitorError, MonitorConfig};
pub use monitored_set::MonitoredSet;
