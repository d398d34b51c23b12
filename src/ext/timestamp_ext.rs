use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

/// Millisecond precision, always rendered in UTC.
const QUERY_LITERAL_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]");

pub trait TimestampExt {
    /// Renders the timestamp the way the remote source expects it inside a filter term.
    fn to_query_literal(&self) -> String;

    /// Drops everything below the millisecond, the finest precision the
    /// remote source stores or compares.
    fn truncate_to_millis(&self) -> Self;
}

impl TimestampExt for OffsetDateTime {
    fn to_query_literal(&self) -> String {
        self.to_offset(UtcOffset::UTC)
            .format(QUERY_LITERAL_FORMAT)
            .unwrap_or_else(|_| self.unix_timestamp().to_string())
    }

    fn truncate_to_millis(&self) -> Self {
        let nanosecond = self.nanosecond() / 1_000_000 * 1_000_000;
        self.replace_nanosecond(nanosecond).unwrap_or(*self)
    }
}
