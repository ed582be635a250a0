mod cache;
mod celestrak;
mod directory;
mod error;
mod provider;
pub mod tle;
mod types;

pub use cache::{CachePolicy, ElementCache, DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_STALE, DEFAULT_TTL};
pub use celestrak::{CelestrakProvider, DEFAULT_URL};
pub use directory::DirectoryProvider;
pub use error::ElementError;
pub use provider::{ElementProvider, ElementSource};
pub use types::{CachedElements, Freshness, OrbitalElementSet, RawElements};
