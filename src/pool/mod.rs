//! Generic cache pool primitives
//!
//! A [`ResourcePool`] maps keys to [`ResourceEntry`] values: shared,
//! lazily constructed resources, each guarded by its own exclusive lock
//! and readiness signal. The pool bounds its size with LRU eviction and
//! guarantees a single construction per key under concurrent access.

pub mod cache;
pub mod entry;

pub use cache::ResourcePool;
pub use entry::{LoadState, ResourceEntry, ResourceGuard};
