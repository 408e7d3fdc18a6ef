// # Document Fetcher Trait
//
// Defines the interface for retrieving raw source documents.
//
// Extractors never talk to the network themselves: they are handed a
// fetcher and see only the text it returns. The binary wires in an
// HTTP implementation; tests wire in canned documents.

use async_trait::async_trait;

use crate::error::Result;

/// Trait for retrieving a raw source document by URL.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Fetch the document at `url` and return its body as text.
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: The document body
    /// - `Err(Error::Fetch)`: Transport failure or non-success status
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Canned in-memory fetcher, for tests and offline runs.
///
/// Returns the same document regardless of the URL asked for.
#[derive(Debug, Clone)]
pub struct StaticFetcher(pub String);

#[async_trait]
impl DocumentFetcher for StaticFetcher {
    async fn fetch(&self, _url: &str) -> Result<String> {
        Ok(self.0.clone())
    }
}
