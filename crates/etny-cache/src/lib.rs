//! Persistent, crash-safe caches for `etny-node`.
//!
//! Three flavors share one contract: bounded capacity, total-file
//! rewrite on every mutation (write-temp, fsync, rename), and
//! missing/corrupt files degrading to an empty store rather than an
//! error. See `SPEC_FULL.md` §4.1.

mod append_list;
mod atomic_file;
mod error;
mod kv;
mod set;
mod timestamped;

pub use append_list::AppendListCache;
pub use error::CacheError;
pub use kv::KvCache;
pub use set::SetCache;
pub use timestamped::{Timestamp, TimestampedSetCache};
