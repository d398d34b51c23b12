//! Monotone "latest timestamp seen so far" marker.

use time::OffsetDateTime;

use crate::ext::TimestampExt;
use crate::repository::{Field, Filter};

/// The latest modification or creation time observed so far.
///
/// An unset watermark means nothing has been observed yet, and every
/// freshness question asked against it must be answered with "changed".
/// Once set it never moves backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Watermark(Option<OffsetDateTime>);

impl Watermark {
    pub fn new() -> Self {
        Self(None)
    }

    pub fn at(timestamp: OffsetDateTime) -> Self {
        Self(Some(timestamp.truncate_to_millis()))
    }

    pub fn get(&self) -> Option<OffsetDateTime> {
        self.0
    }

    pub fn is_unset(&self) -> bool {
        self.0.is_none()
    }

    /// Raises the watermark to `timestamp` if it is newer. Returns whether it moved.
    /// Stored at millisecond precision so the rendered lower bound excludes
    /// the record that set it.
    pub fn observe(&mut self, timestamp: OffsetDateTime) -> bool {
        let timestamp = timestamp.truncate_to_millis();
        match self.0 {
            Some(current) if current >= timestamp => false,
            _ => {
                self.0 = Some(timestamp);
                true
            }
        }
    }

    /// Raises the watermark to whatever `other` has seen.
    pub fn merge(&mut self, other: Watermark) -> bool {
        other.0.is_some_and(|timestamp| self.observe(timestamp))
    }

    /// `field > watermark`, or `None` while unset (no lower bound).
    pub fn lower_bound(&self, field: Field) -> Option<Filter> {
        self.0.map(|timestamp| Filter::greater(field, timestamp))
    }
}

impl From<Option<OffsetDateTime>> for Watermark {
    fn from(timestamp: Option<OffsetDateTime>) -> Self {
        Self(timestamp.map(|timestamp| timestamp.truncate_to_millis()))
    }
}

impl FromIterator<OffsetDateTime> for Watermark {
    fn from_iter<I: IntoIterator<Item = OffsetDateTime>>(timestamps: I) -> Self {
        let mut watermark = Self::new();
        for timestamp in timestamps {
            watermark.observe(timestamp);
        }
        watermark
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::repository::RawRecord;

    #[test]
    fn starts_unset() {
        let watermark = Watermark::new();
        assert!(watermark.is_unset());
        assert_eq!(watermark.lower_bound(Field::ChangeDate), None);
    }

    #[test]
    fn never_moves_backwards() {
        let mut watermark = Watermark::at(datetime!(2024-05-01 0:00 UTC));
        assert!(!watermark.observe(datetime!(2024-04-01 0:00 UTC)));
        assert!(!watermark.observe(datetime!(2024-05-01 0:00 UTC)));
        assert!(watermark.observe(datetime!(2024-06-01 0:00 UTC)));
        assert_eq!(watermark.get(), Some(datetime!(2024-06-01 0:00 UTC)));
    }

    #[test]
    fn merge_ignores_unset_and_older() {
        let mut watermark = Watermark::at(datetime!(2024-05-01 0:00 UTC));
        assert!(!watermark.merge(Watermark::new()));
        assert!(!watermark.merge(Watermark::at(datetime!(2023-01-01 0:00 UTC))));
        assert_eq!(watermark.get(), Some(datetime!(2024-05-01 0:00 UTC)));
    }

    #[test]
    fn collects_the_maximum() {
        let watermark: Watermark = [
            datetime!(2024-02-01 0:00 UTC),
            datetime!(2024-03-01 0:00 UTC),
            datetime!(2024-01-01 0:00 UTC),
        ]
        .into_iter()
        .collect();
        assert_eq!(watermark.get(), Some(datetime!(2024-03-01 0:00 UTC)));
    }

    #[test]
    fn lower_bound_is_a_strict_greater_filter() {
        let watermark = Watermark::at(datetime!(2024-05-01 0:00 UTC));
        assert_eq!(
            watermark.lower_bound(Field::CreateDate),
            Some(Filter::greater(Field::CreateDate, datetime!(2024-05-01 0:00 UTC)))
        );
    }

    #[test]
    fn sub_millisecond_changes_do_not_reopen_the_window() {
        let mut watermark = Watermark::new();
        assert!(watermark.observe(datetime!(2024-05-01 0:00:00.0005 UTC)));
        assert_eq!(watermark.get(), Some(datetime!(2024-05-01 0:00 UTC)));
        assert!(!watermark.observe(datetime!(2024-05-01 0:00:00.0009 UTC)));

        let filter = watermark.lower_bound(Field::ChangeDate).unwrap();
        assert_eq!(filter.to_string(), "ChangeDateUTC>'2024-05-01T00:00:00.000'");
        let record = RawRecord::item(
            "Defect:1",
            "Scope:1",
            datetime!(2024-05-01 0:00:00.0005 UTC),
            datetime!(2024-05-01 0:00:00.0005 UTC),
        );
        assert!(!filter.matches(&record));
    }
}
