//! A reactive cache for asynchronous query results.
//!
//! `quench` tracks one entry per string key through the lifecycle
//! pending → resolved/failed → stale → evicted. It deduplicates
//! concurrent fetches onto a single shared [`FetchFuture`], fans change
//! notifications out to per-key subscribers synchronously with every
//! mutation, and reclaims an entry a configurable retention window after
//! its last subscriber detaches.
//!
//! The cache stores fetch *results*; it never performs a fetch, retries
//! one, or decides when one should happen. Those policies belong to the
//! binding layer driving it.
//!
//! # Features
//! - **Fetch dedup**: at most one in-flight fetch per key; every
//!   interested party awaits the same handle, from async tasks or
//!   blocking threads.
//! - **Stale-while-error**: a failed refetch never destroys the last
//!   good value.
//! - **Reference-counted eviction**: retention timers arm only while a
//!   key has no subscriber, and re-attachment cancels them.
//! - **Explicit instances**: a cache is an ordinary cloneable value;
//!   nothing lives in module-level state, so tests and multi-tenant
//!   embeddings can run any number of isolated caches.
//! - **Observability**: counters for reads, fetch outcomes, and
//!   evictions, plus an optional cache-wide eviction listener.
//! - **Hydration**: an injection path for pre-resolved entries, with
//!   serializable snapshot types behind the `serde` feature.

// Public modules that form the API
pub mod builder;
pub mod error;
pub mod listener;
pub mod metrics;
pub mod runtime;

// Internal, crate-only modules
mod entry;
mod fetch;
mod handles;
mod iter;
mod shared;
mod store;
mod subscription;
mod task;
mod time;

#[cfg(feature = "serde")]
pub mod hydration;

// Re-export the primary user-facing types for convenience
pub use builder::CacheBuilder;
pub use entry::{QueryEntry, QueryResult, Retention};
pub use error::BuildError;
pub use fetch::{FetchFuture, FetchResult};
pub use handles::QueryCache;
pub use iter::Keys;
pub use listener::{EvictionListener, EvictionReason};
pub use metrics::MetricsSnapshot;
pub use runtime::TaskSpawner;
pub use subscription::Subscription;
