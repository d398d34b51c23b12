use std::borrow::Cow;
use std::path::Path;

use compio::fs;
use hashlink::LinkedHashMap;
use parking_lot::RwLock;
use saphyr::{LoadableYamlNode, Scalar, Yaml};
use snafu::prelude::*;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::debug;

use crate::repository::repository::{
    MalformedSnapshotSnafu, SnapshotEncodingSnafu, SnapshotParseSnafu, SnapshotReadSnafu,
};
use crate::repository::{
    AssetId, EntityKind, Field, Query, RawRecord, Repository, RepositoryError,
};

/// Repository over records held in memory, grouped per entity kind.
///
/// Evaluates filters, sorting and selection the same way a remote source
/// would, so it doubles as an offline stand-in loaded from a YAML snapshot.
/// Mutations are visible to every subsequent fetch.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    records: RwLock<LinkedHashMap<EntityKind, Vec<RawRecord>>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a YAML snapshot from disk.
    pub async fn read(path: &Path) -> Result<Self, RepositoryError> {
        debug!("Reading snapshot file: {}", path.display());
        let bytes = fs::read(path).await.context(SnapshotReadSnafu {
            file_path: path.display().to_string(),
        })?;
        let contents = String::from_utf8(bytes).context(SnapshotEncodingSnafu {
            file_path: path.display().to_string(),
        })?;
        contents.as_str().try_into()
    }

    pub fn insert(&self, kind: EntityKind, record: RawRecord) {
        self.records.write().entry(kind).or_insert_with(Vec::new).push(record);
    }

    /// Applies `change` to the record with the given id. Returns `false` when
    /// no such record exists.
    pub fn update(&self, kind: EntityKind, id: &AssetId, change: impl FnOnce(&mut RawRecord)) -> bool {
        let mut records = self.records.write();
        match records
            .get_mut(&kind)
            .and_then(|rows| rows.iter_mut().find(|row| &row.id == id))
        {
            Some(record) => {
                change(record);
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, kind: EntityKind, id: &AssetId) -> Option<RawRecord> {
        let mut records = self.records.write();
        let rows = records.get_mut(&kind)?;
        let position = rows.iter().position(|row| &row.id == id)?;
        Some(rows.remove(position))
    }

    pub fn len(&self, kind: EntityKind) -> usize {
        self.records.read().get(&kind).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().values().all(Vec::is_empty)
    }

    fn project(query: &Query, record: &RawRecord) -> RawRecord {
        RawRecord {
            id: record.id.clone(),
            name: record.name.clone().filter(|_| query.is_selected(Field::Name)),
            parent_id: record
                .parent_id
                .clone()
                .filter(|_| query.is_selected(Field::Parent)),
            scope_id: record
                .scope_id
                .clone()
                .filter(|_| query.is_selected(Field::Scope)),
            modified_at: record.modified_at,
            created_at: record.created_at.filter(|_| query.is_selected(Field::CreateDate)),
        }
    }

    fn parse_kind(
        kind: EntityKind,
        entries: &Yaml,
    ) -> Result<Vec<RawRecord>, RepositoryError> {
        let entries = entries.as_sequence().context(MalformedSnapshotSnafu {
            reason: format!("'{}' should be a list of records", kind),
        })?;

        entries
            .iter()
            .map(|entry| {
                let fields = entry.as_mapping().context(MalformedSnapshotSnafu {
                    reason: format!("every '{}' entry should be a map", kind),
                })?;
                Self::parse_record(kind, fields)
            })
            .collect()
    }

    fn parse_record(
        kind: EntityKind,
        fields: &LinkedHashMap<Yaml, Yaml>,
    ) -> Result<RawRecord, RepositoryError> {
        let id = Self::optional_str(fields, "id")?.context(MalformedSnapshotSnafu {
            reason: format!("a '{}' entry is missing its id", kind),
        })?;
        let modified_at = Self::optional_timestamp(fields, "changed")?.context(
            MalformedSnapshotSnafu {
                reason: format!("'{}' is missing its 'changed' timestamp", id),
            },
        )?;

        Ok(RawRecord {
            id: AssetId::from(id),
            name: Self::optional_str(fields, "name")?.map(str::to_string),
            parent_id: Self::optional_str(fields, "parent")?.map(AssetId::from),
            scope_id: Self::optional_str(fields, "scope")?.map(AssetId::from),
            modified_at,
            created_at: Self::optional_timestamp(fields, "created")?,
        })
    }

    fn optional_str<'a>(
        fields: &'a LinkedHashMap<Yaml, Yaml>,
        key: &'static str,
    ) -> Result<Option<&'a str>, RepositoryError> {
        match fields.get(&Yaml::Value(Scalar::String(Cow::Borrowed(key)))) {
            None | Some(Yaml::Value(Scalar::Null)) => Ok(None),
            Some(value) => value.as_str().map(Some).context(MalformedSnapshotSnafu {
                reason: format!("'{}' should be a string", key),
            }),
        }
    }

    fn optional_timestamp(
        fields: &LinkedHashMap<Yaml, Yaml>,
        key: &'static str,
    ) -> Result<Option<OffsetDateTime>, RepositoryError> {
        Self::optional_str(fields, key)?
            .map(|text| {
                OffsetDateTime::parse(text, &Rfc3339).map_err(|e| {
                    RepositoryError::MalformedSnapshot {
                        reason: format!("'{}' is not an RFC 3339 timestamp: {}", text, e),
                    }
                })
            })
            .transpose()
    }
}

impl Repository for InMemoryRepository {
    fn fetch_records(&self, query: &Query) -> Result<Vec<RawRecord>, RepositoryError> {
        let records = self.records.read();
        let mut matched = records
            .get(&query.kind)
            .map(|rows| {
                rows.iter()
                    .filter(|row| query.filter.as_ref().is_none_or(|filter| filter.matches(row)))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        // Sort before projecting so unselected attributes can still order the rows.
        if let Some(sort) = &query.sort {
            matched.sort_by(|left, right| sort.compare(left, right));
        }

        debug!("{} matched {} record(s)", query, matched.len());
        Ok(matched
            .into_iter()
            .map(|row| Self::project(query, row))
            .collect())
    }
}

impl TryFrom<&str> for InMemoryRepository {
    type Error = RepositoryError;

    fn try_from(contents: &str) -> Result<Self, Self::Error> {
        let documents = Yaml::load_from_str(contents).context(SnapshotParseSnafu)?;
        let repository = Self::new();

        // An empty document is an empty snapshot.
        let Some(top_level) = documents.first() else {
            return Ok(repository);
        };

        let top_level = top_level.as_mapping().context(MalformedSnapshotSnafu {
            reason: "top level of a snapshot should be a map",
        })?;

        for (key, entries) in top_level.iter() {
            let kind = key
                .as_str()
                .and_then(EntityKind::from_name)
                .context(MalformedSnapshotSnafu {
                    reason: format!("unknown entity kind {:?}", key),
                })?;
            for record in Self::parse_kind(kind, entries)? {
                repository.insert(kind, record);
            }
        }

        Ok(repository)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;
    use time::macros::datetime;

    use super::*;
    use crate::repository::{Filter, Sort};

    const SNAPSHOT: &str = r#"
Scope:
  - id: "Scope:1"
    name: "Mid"
    parent: "Scope:0"
    changed: 2024-01-02T00:00:00Z
  - id: "Scope:0"
    name: "Root"
    parent: null
    changed: 2024-01-01T00:00:00Z
Defect:
  - id: "Defect:10"
    scope: "Scope:1"
    changed: 2024-02-01T10:00:00Z
    created: 2024-01-20T09:00:00Z
"#;

    fn repository() -> InMemoryRepository {
        SNAPSHOT.try_into().expect("snapshot should parse")
    }

    #[test]
    fn parses_every_entity_kind() {
        let repository = repository();
        assert_eq!(repository.len(EntityKind::Scope), 2);
        assert_eq!(repository.len(EntityKind::Defect), 1);
        assert_eq!(repository.len(EntityKind::Story), 0);
    }

    #[test]
    fn null_parent_marks_a_root() {
        let rows = repository()
            .fetch_records(&Query::new(EntityKind::Scope))
            .unwrap();
        let root = rows.iter().find(|row| row.id.as_str() == "Scope:0").unwrap();
        assert_eq!(root.parent_id, None);
        assert_eq!(root.name.as_deref(), Some("Root"));
    }

    #[test]
    fn sorts_by_parent_ascending() {
        let rows = repository()
            .fetch_records(&Query::new(EntityKind::Scope).sort(Sort::ascending(Field::Parent)))
            .unwrap();
        let ids: Vec<_> = rows.iter().map(|row| row.id.as_str()).collect();
        assert_eq!(ids, vec!["Scope:0", "Scope:1"]);
    }

    #[test]
    fn selection_drops_unselected_attributes() {
        let rows = repository()
            .fetch_records(&Query::new(EntityKind::Defect).select(Field::ChangeDate))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].scope_id, None);
        assert_eq!(rows[0].created_at, None);
        assert_eq!(rows[0].modified_at, datetime!(2024-02-01 10:00 UTC));
    }

    #[test]
    fn filters_are_applied() {
        let query = Query::new(EntityKind::Scope).filter(Filter::greater(
            Field::ChangeDate,
            datetime!(2024-01-01 12:00 UTC),
        ));
        let rows = repository().fetch_records(&query).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id.as_str(), "Scope:1");
    }

    #[test]
    fn mutations_are_visible_to_later_fetches() {
        let repository = repository();
        let id = AssetId::from("Scope:1");
        assert!(repository.update(EntityKind::Scope, &id, |row| {
            row.name = Some("Renamed".to_string());
        }));
        assert!(!repository.update(EntityKind::Scope, &"Scope:404".into(), |_| {}));

        let rows = repository.fetch_records(&Query::new(EntityKind::Scope)).unwrap();
        assert!(rows.iter().any(|row| row.name.as_deref() == Some("Renamed")));

        assert!(repository.remove(EntityKind::Scope, &id).is_some());
        assert_eq!(repository.len(EntityKind::Scope), 1);
    }

    #[test]
    fn inserts_append_to_the_kind() {
        let repository = InMemoryRepository::new();
        let stamp = datetime!(2024-03-01 0:00 UTC);
        repository.insert(EntityKind::Story, RawRecord::item("Story:1", "Scope:0", stamp, stamp));
        repository.insert(EntityKind::Story, RawRecord::item("Story:2", "Scope:0", stamp, stamp));

        let rows = repository.fetch_records(&Query::new(EntityKind::Story)).unwrap();
        let ids: Vec<_> = rows.iter().map(|row| row.id.as_str()).collect();
        assert_eq!(ids, vec!["Story:1", "Story:2"]);
        assert_eq!(repository.len(EntityKind::Defect), 0);
    }

    #[test]
    fn empty_snapshot_is_an_empty_repository() {
        let repository: InMemoryRepository = "".try_into().unwrap();
        assert!(repository.is_empty());
    }

    #[test]
    fn rejects_unknown_entity_kind() {
        let result: Result<InMemoryRepository, _> = "Epic: []".try_into();
        assert!(matches!(
            result,
            Err(RepositoryError::MalformedSnapshot { .. })
        ));
    }

    #[test]
    fn rejects_invalid_yaml() {
        let result: Result<InMemoryRepository, _> = "invalid: yaml: content: [unclosed".try_into();
        assert!(matches!(
            result,
            Err(RepositoryError::SnapshotParseError { .. })
        ));
    }

    #[test]
    fn rejects_bad_timestamps() {
        let snapshot = "Scope:\n  - id: \"Scope:0\"\n    name: Root\n    changed: yesterday\n";
        let result: Result<InMemoryRepository, _> = snapshot.try_into();
        assert!(matches!(
            result,
            Err(RepositoryError::MalformedSnapshot { .. })
        ));
    }

    #[test]
    fn rejects_records_without_id() {
        let snapshot = "Scope:\n  - name: Root\n    changed: 2024-01-01T00:00:00Z\n";
        let result: Result<InMemoryRepository, _> = snapshot.try_into();
        assert!(matches!(
            result,
            Err(RepositoryError::MalformedSnapshot { .. })
        ));
    }

    #[compio::test]
    async fn reads_snapshot_from_disk() {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        write!(file, "{}", SNAPSHOT).expect("Failed to write snapshot");

        let repository = InMemoryRepository::read(file.path()).await.unwrap();
        assert_eq!(repository.len(EntityKind::Scope), 2);
    }

    #[compio::test]
    async fn missing_snapshot_is_a_read_error() {
        let result = InMemoryRepository::read(Path::new("nonexistent-snapshot.yaml")).await;
        assert!(matches!(
            result,
            Err(RepositoryError::SnapshotReadError { .. })
        ));
    }

    #[compio::test]
    async fn non_utf8_snapshot_is_an_encoding_error() {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(&[b'S', b'c', 0xff, 0xfe]).expect("Failed to write snapshot");

        let result = InMemoryRepository::read(file.path()).await;
        assert!(matches!(
            result,
            Err(RepositoryError::SnapshotEncodingError { .. })
        ));
    }
}
