mod timestamp_ext;

pub use timestamp_ext::TimestampExt;
