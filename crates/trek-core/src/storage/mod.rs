//! Local persistence: key-value blob stores and the entity cache on top.

mod kv;
mod local_cache;

pub use kv::{KeyValueStore, LibSqlKeyValueStore, MemoryKeyValueStore};
pub use local_cache::LocalCache;
