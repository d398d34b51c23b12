use std::cmp::Ordering;
use std::fmt;

use derive_more::Display;
use time::OffsetDateTime;

use crate::ext::TimestampExt;
use crate::repository::{AssetId, RawRecord};

/// Asset types the repository can be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum EntityKind {
    /// Projects, the nodes of the hierarchy.
    #[display("Scope")]
    Scope,
    #[display("Defect")]
    Defect,
    #[display("Story")]
    Story,
}

impl EntityKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Scope" => Some(Self::Scope),
            "Defect" => Some(Self::Defect),
            "Story" => Some(Self::Story),
            _ => None,
        }
    }
}

/// Attributes a query can filter, sort or select on.
///
/// Displayed with the attribute names used by the remote source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Field {
    #[display("ID")]
    Id,
    #[display("Name")]
    Name,
    #[display("Parent.ID")]
    Parent,
    #[display("ChangeDateUTC")]
    ChangeDate,
    #[display("CreateDate")]
    CreateDate,
    #[display("Scope")]
    Scope,
}

impl Field {
    fn compare(&self, left: &RawRecord, right: &RawRecord) -> Ordering {
        match self {
            Field::Id => left.id.cmp(&right.id),
            Field::Name => left.name.cmp(&right.name),
            Field::Parent => left.parent_id.cmp(&right.parent_id),
            Field::ChangeDate => left.modified_at.cmp(&right.modified_at),
            Field::CreateDate => left.created_at.cmp(&right.created_at),
            Field::Scope => left.scope_id.cmp(&right.scope_id),
        }
    }

    fn timestamp(&self, record: &RawRecord) -> Option<OffsetDateTime> {
        match self {
            Field::ChangeDate => Some(record.modified_at),
            Field::CreateDate => record.created_at,
            _ => None,
        }
    }

    fn identifier<'a>(&self, record: &'a RawRecord) -> Option<&'a str> {
        match self {
            Field::Id => Some(record.id.as_str()),
            Field::Name => record.name.as_deref(),
            Field::Parent => record.parent_id.as_ref().map(AssetId::as_str),
            Field::Scope => record.scope_id.as_ref().map(AssetId::as_str),
            Field::ChangeDate | Field::CreateDate => None,
        }
    }
}

/// Boolean predicate tree evaluated by the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Timestamp attribute strictly after `value`.
    Greater { field: Field, value: OffsetDateTime },
    /// Attribute equal to any of `values`. An empty list matches nothing.
    Equal { field: Field, values: Vec<AssetId> },
    And(Box<Filter>, Box<Filter>),
}

impl Filter {
    /// `value` is kept at millisecond precision, as it is rendered.
    pub fn greater(field: Field, value: OffsetDateTime) -> Self {
        Filter::Greater {
            field,
            value: value.truncate_to_millis(),
        }
    }

    pub fn equal(field: Field, values: impl IntoIterator<Item = AssetId>) -> Self {
        Filter::Equal {
            field,
            values: values.into_iter().collect(),
        }
    }

    pub fn and(self, other: Filter) -> Self {
        Filter::And(Box::new(self), Box::new(other))
    }

    pub fn matches(&self, record: &RawRecord) -> bool {
        match self {
            Filter::Greater { field, value } => field
                .timestamp(record)
                .is_some_and(|timestamp| timestamp.truncate_to_millis() > *value),
            Filter::Equal { field, values } => field
                .identifier(record)
                .is_some_and(|candidate| values.iter().any(|value| value.as_str() == candidate)),
            Filter::And(left, right) => left.matches(record) && right.matches(record),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Greater { field, value } => {
                write!(f, "{}>'{}'", field, value.to_query_literal())
            }
            Filter::Equal { field, values } => {
                write!(f, "{}=", field)?;
                for (position, value) in values.iter().enumerate() {
                    if position > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "'{}'", value)?;
                }
                Ok(())
            }
            Filter::And(left, right) => write!(f, "({});({})", left, right),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub field: Field,
    pub order: SortOrder,
}

impl Sort {
    pub fn ascending(field: Field) -> Self {
        Self {
            field,
            order: SortOrder::Ascending,
        }
    }

    pub fn descending(field: Field) -> Self {
        Self {
            field,
            order: SortOrder::Descending,
        }
    }

    pub fn compare(&self, left: &RawRecord, right: &RawRecord) -> Ordering {
        let ordering = self.field.compare(left, right);
        match self.order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    }
}

/// A parameterized fetch against one entity kind.
///
/// `selection` restricts which attributes the repository needs to populate;
/// an empty selection means "whatever the repository returns by default".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub kind: EntityKind,
    pub filter: Option<Filter>,
    pub sort: Option<Sort>,
    pub selection: Vec<Field>,
}

impl Query {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            filter: None,
            sort: None,
            selection: Vec::new(),
        }
    }

    pub fn select(mut self, field: Field) -> Self {
        if !self.selection.contains(&field) {
            self.selection.push(field);
        }
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn is_selected(&self, field: Field) -> bool {
        self.selection.is_empty() || self.selection.contains(&field)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        let mut separator = '?';
        if !self.selection.is_empty() {
            write!(f, "{}sel=", separator)?;
            for (position, field) in self.selection.iter().enumerate() {
                if position > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{}", field)?;
            }
            separator = '&';
        }
        if let Some(filter) = &self.filter {
            write!(f, "{}where={}", separator, filter)?;
            separator = '&';
        }
        if let Some(sort) = &self.sort {
            let sign = match sort.order {
                SortOrder::Ascending => "",
                SortOrder::Descending => "-",
            };
            write!(f, "{}sort={}{}", separator, sign, sort.field)?;
        }
        Ok(())
    }
}
