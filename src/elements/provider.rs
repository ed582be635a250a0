use std::future::Future;

use super::celestrak::CelestrakProvider;
use super::directory::DirectoryProvider;
use super::error::ElementError;
use super::types::RawElements;

/// Source of raw element text keyed by catalog number.
///
/// Implementations should not retry; the cache decides what a failure means.
pub trait ElementProvider: Send + Sync {
    fn fetch(
        &self,
        catalog_id: u32,
    ) -> impl Future<Output = Result<RawElements, ElementError>> + Send;
}

/// The providers selectable from configuration.
pub enum ElementSource {
    Celestrak(CelestrakProvider),
    Directory(DirectoryProvider),
}

impl ElementProvider for ElementSource {
    async fn fetch(&self, catalog_id: u32) -> Result<RawElements, ElementError> {
        match self {
            ElementSource::Celestrak(p) => p.fetch(catalog_id).await,
            ElementSource::Directory(p) => p.fetch(catalog_id).await,
        }
    }
}
