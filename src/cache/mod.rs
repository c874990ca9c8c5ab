//! In-memory query cache shared by every view.
//!
//! - Entries are keyed by a structured [`QueryKey`] (resource + parameters)
//! - At most one fetch per key is in flight; later callers attach to it
//! - Prefix invalidation marks entries stale so active consumers refetch
//! - Optimistic writes hand back a [`RollbackToken`] for undoing them

mod entry;
mod key;
mod layer;

pub use entry::{EntrySnapshot, FetchStatus, RollbackToken};
pub use key::{KeyPart, QueryKey};
pub use layer::QueryCache;
