/// Ledger client abstraction for the CID registry contract.
///
/// The registry is an append-only contract: `store(cid)` records a CID
/// against the sender and emits a `CIDStored` event. History is read back
/// by replaying those events; records are never updated or deleted.
pub mod ethereum;

use alloy::primitives::Address;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One anchored CID, reconstructed from a `CIDStored` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorRecord {
    /// Account that stored the CID.
    pub owner: Address,
    /// The content identifier, treated as an opaque string.
    pub cid: String,
    /// Block height the event was emitted at.
    pub block_height: u64,
    /// Position of the log within its block.
    pub log_index: u64,
    /// Hash of the transaction that emitted the event.
    pub tx_hash: String,
}

/// Receipt returned once a `store` transaction is mined.
///
/// Fields are kept as the node returned them; nothing here is interpreted
/// beyond existence-checking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub transaction_hash: String,
    #[serde(default)]
    pub block_number: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Trait for ledger backends hosting the registry contract.
///
/// One instance wraps one connection/signer pair. Implementations are not
/// required to tolerate concurrent `submit_store` calls; callers serialize
/// writes externally.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Current tip height of the chain.
    async fn current_height(&self) -> Result<u64>;

    /// `CIDStored` events emitted for `owner` within `[from, to]` inclusive,
    /// in the ascending (block height, log index) order the node returns.
    ///
    /// The span `to - from` must stay within the provider's query limit;
    /// callers page wider ranges through repeated calls.
    async fn anchor_events(&self, owner: Address, from: u64, to: u64)
        -> Result<Vec<AnchorRecord>>;

    /// Estimate the gas cost of `store(cid)` from the signer's account.
    async fn estimate_store_gas(&self, cid: &str) -> Result<u64>;

    /// Submit `store(cid)` with the given gas ceiling and wait until mined.
    async fn submit_store(&self, cid: &str, gas_limit: u64) -> Result<TxReceipt>;
}
