//! Read-through caching for remote lookups.
//!
//! A [`ReadThroughCache`] sits in front of a [`Loader`] and answers keyed reads
//! from memory when it can, going to the loader otherwise.
//!
//! # Features
//!
//! - **Tagged results** - [`Lookup`] separates a value, a confirmed absence and a failure
//! - **Negative caching** - confirmed absences are cached like values; failures never are
//! - **TTL + LRU** - entries expire after a fixed lifetime and the key count is bounded
//! - **Coalesced loads** - concurrent misses on one key share a single remote call
//! - **Batched loads** - `get_all` de-duplicates misses and chunks them per loader limit
//!
//! # Examples
//!
//! ```no_run
//! use pacer_cache::*;
//! use async_trait::async_trait;
//! use std::time::Duration;
//!
//! struct Users;
//!
//! #[async_trait]
//! impl Loader<u64, String> for Users {
//!     type Error = String;
//!
//!     async fn load(&self, id: &u64) -> Lookup<String, String> {
//!         if *id == 0 {
//!             Lookup::NotFound
//!         } else {
//!             Lookup::Found(format!("user-{id}"))
//!         }
//!     }
//! }
//!
//! # async fn example() -> Result<(), CacheError> {
//! let config = CacheConfig::new().with_ttl(Duration::from_secs(30)).with_max_size(10_000);
//! let cache = ReadThroughCache::new(Users, config)?;
//!
//! let names = cache.get_all(&[1, 2, 0, 1]).await;
//! assert_eq!(names[2], Lookup::NotFound);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod loader;
pub mod lookup;
pub mod read_through;
pub mod stats;
mod store;

pub use config::{CacheConfig, DEFAULT_MAX_SIZE, DEFAULT_TTL};
pub use error::{CacheError, CacheResult};
pub use loader::{DEFAULT_MAX_BATCH_SIZE, Loader};
pub use lookup::Lookup;
pub use read_through::ReadThroughCache;
pub use stats::CacheStats;
