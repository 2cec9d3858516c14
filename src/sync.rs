/// Windowed history synchronization.
///
/// Ledger read APIs cap the block span served per query, so a full-history
/// scan is decomposed into a sequence of bounded windows walked in
/// ascending block order. The caller-visible contract stays "one call
/// returns the whole history":
///
/// ```text
/// inception ──[w0]──[w1]──[w2]── ... ──[wn]── latest
/// ```
///
/// Windows are inclusive `[from, from + window_size - 1]`, clamped to the
/// tip, and abut exactly; no height is queried twice and none is skipped.
use alloy::primitives::Address;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::ledger::{AnchorRecord, LedgerClient};

/// Replays `CIDStored` events for an account across the full eligible
/// block span.
pub struct RangeSynchronizer<L> {
    ledger: L,
    /// First height at which the registry could have emitted events.
    inception_height: u64,
    /// Maximum heights covered per query, bounded by the provider limit.
    window_size: u64,
}

impl<L: LedgerClient> RangeSynchronizer<L> {
    pub fn new(ledger: L, inception_height: u64, window_size: u64) -> Self {
        Self {
            ledger,
            inception_height,
            window_size: window_size.max(1),
        }
    }

    /// All CIDs anchored by `account`, in the ascending
    /// (block height, log index) order the ledger returned them.
    ///
    /// The tip height is fetched once up front; the sync is a snapshot,
    /// not a live-following operation. Any window failure aborts the whole
    /// call with no partial result. Retries are a caller concern — the
    /// call is read-only and safe to repeat.
    pub async fn list_for_account(&self, account: &str) -> Result<Vec<AnchorRecord>> {
        let owner: Address = account
            .trim()
            .parse()
            .map_err(|_| Error::InvalidAccount(account.to_string()))?;

        let latest = self.ledger.current_height().await?;
        debug!(
            account = %owner,
            inception = self.inception_height,
            latest,
            "Starting history sync"
        );

        let mut records = Vec::new();
        let mut from = self.inception_height;

        while from <= latest {
            let to = latest.min(from.saturating_add(self.window_size - 1));
            let batch = self.ledger.anchor_events(owner, from, to).await?;

            debug!(from, to, events = batch.len(), "Window queried");
            records.extend(batch);

            from = match to.checked_add(1) {
                Some(next) => next,
                None => break,
            };
        }

        info!(account = %owner, records = records.len(), "History sync complete");
        Ok(records)
    }
}
