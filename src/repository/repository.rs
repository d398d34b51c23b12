use snafu::Snafu;

use crate::repository::{EntityKind, Query, RawRecord};

/// The remote source of truth for projects and monitored items.
///
/// Implementations own transport, authentication and timeouts. A failed
/// fetch must be reported as an error, never as an empty result.
pub trait Repository {
    fn fetch_records(&self, query: &Query) -> Result<Vec<RawRecord>, RepositoryError>;
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum RepositoryError {
    #[snafu(display("Failed to fetch {} records: {}", kind, message))]
    FetchError { kind: EntityKind, message: String },
    #[snafu(display("Failed to read the snapshot file: {}", file_path))]
    SnapshotReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("Snapshot file {} is not valid UTF-8", file_path))]
    SnapshotEncodingError {
        file_path: String,
        source: std::string::FromUtf8Error,
    },
    #[snafu(display("Failed to parse the snapshot file"))]
    SnapshotParseError { source: saphyr::ScanError },
    #[snafu(display("Malformed snapshot: {}", reason))]
    MalformedSnapshot { reason: String },
}
