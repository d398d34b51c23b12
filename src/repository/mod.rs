mod in_memory;
mod query;
mod record;
mod repository;

pub use in_memory::InMemoryRepository;
pub use query::{EntityKind, Field, Filter, Query, Sort, SortOrder};
pub use record::{AssetId, RawRecord};
pub use repository::{Repository, RepositoryError};
