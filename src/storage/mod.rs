/// Content-addressable storage abstraction.
///
/// A storage client takes bytes and returns the content identifier (CID)
/// the network derived for them. CIDs are opaque here; nothing in this
/// crate inspects their structure.
pub mod ipfs;

use async_trait::async_trait;

use crate::error::Result;

/// Trait for content-addressable storage backends.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Human-readable name of this backend (e.g., "IPFS").
    fn name(&self) -> &str;

    /// Upload data, returning the CID the network assigned to it.
    async fn upload(&self, data: &[u8]) -> Result<String>;
}
