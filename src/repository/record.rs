use derive_more::{AsRef, Display, From};
use time::OffsetDateTime;

/// Opaque asset token as handed out by the remote source, e.g. `Scope:1042`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, AsRef)]
#[as_ref(str)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AssetId {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

/// A single row returned by a [`Repository`](super::Repository) fetch.
///
/// Project rows populate `name` and `parent_id`; monitored item rows populate
/// `scope_id` and `created_at`. Fields outside the query's selection may be
/// left empty by the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub id: AssetId,
    pub name: Option<String>,
    pub parent_id: Option<AssetId>,
    pub scope_id: Option<AssetId>,
    pub modified_at: OffsetDateTime,
    pub created_at: Option<OffsetDateTime>,
}

impl RawRecord {
    pub fn project(
        id: impl Into<AssetId>,
        name: impl Into<String>,
        parent_id: Option<AssetId>,
        modified_at: OffsetDateTime,
    ) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            parent_id,
            scope_id: None,
            modified_at,
            created_at: None,
        }
    }

    pub fn item(
        id: impl Into<AssetId>,
        scope_id: impl Into<AssetId>,
        modified_at: OffsetDateTime,
        created_at: OffsetDateTime,
    ) -> Self {
        Self {
            id: id.into(),
            name: None,
            parent_id: None,
            scope_id: Some(scope_id.into()),
            modified_at,
            created_at: Some(created_at),
        }
    }
}
