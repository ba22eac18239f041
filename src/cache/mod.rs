//! Cache module for provider responses
//!
//! This module provides an in-memory, size-bounded response cache keyed by
//! normalized city name. Freshness is decided per read: the same entry can be
//! too old for a normal read yet still be served as a stale fallback when the
//! provider is unavailable.

mod manager;

pub use manager::{normalize_key, CacheStats, CachedData, ResponseCache};
