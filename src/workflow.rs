/// Upload-then-anchor workflow.
///
/// Composes two independently-failing external systems into one logical
/// "publish" action:
///
/// 1. Upload bytes to content-addressable storage, obtaining a CID.
/// 2. Estimate gas for the registry's `store(cid)` call and submit it.
///
/// There is no shared transaction boundary between the two, so this is a
/// two-step saga with no compensation: if the anchor step fails after a
/// successful upload, the content stays in the storage network with no
/// ledger record. The workflow does not roll back (content-addressable
/// networks offer no delete), does not retry, and does not persist the
/// CID — it surfaces it in the error so callers can retry the anchor
/// step without re-uploading.
use std::path::PathBuf;
use std::pin::Pin;

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::info;

use crate::error::{Error, Result};
use crate::ledger::{LedgerClient, TxReceipt};
use crate::storage::StorageClient;

/// A boxed async reader for streaming inputs.
pub type BoxAsyncRead = Pin<Box<dyn AsyncRead + Send>>;

/// Byte source for an upload, chosen explicitly by the caller.
pub enum InputSource {
    /// Read the file at this path.
    Path(PathBuf),
    /// Use these bytes as-is.
    Bytes(Vec<u8>),
    /// Drain this reader to completion.
    Stream(BoxAsyncRead),
}

impl From<PathBuf> for InputSource {
    fn from(path: PathBuf) -> Self {
        InputSource::Path(path)
    }
}

impl From<Vec<u8>> for InputSource {
    fn from(bytes: Vec<u8>) -> Self {
        InputSource::Bytes(bytes)
    }
}

/// Orchestrates upload-then-anchor against injected collaborators.
///
/// Not safe for concurrent `upload` calls over one ledger signer; callers
/// serialize writes externally.
pub struct AnchorWorkflow<S, L> {
    storage: S,
    ledger: L,
}

impl<S: StorageClient, L: LedgerClient> AnchorWorkflow<S, L> {
    pub fn new(storage: S, ledger: L) -> Self {
        Self { storage, ledger }
    }

    /// Upload the given bytes and anchor the resulting CID on the ledger.
    ///
    /// Fails with [`Error::Input`] if the byte source cannot be resolved,
    /// [`Error::Storage`] if the upload fails (no ledger call is made),
    /// and [`Error::Anchor`] — carrying the CID — if gas estimation,
    /// submission, or confirmation fails after a successful upload.
    pub async fn upload(&self, input: InputSource) -> Result<TxReceipt> {
        let data = resolve_input(input).await?;

        let cid = self.storage.upload(&data).await?;
        info!(
            storage = self.storage.name(),
            cid = %cid,
            bytes = data.len(),
            "Content uploaded, anchoring CID"
        );

        let gas = self
            .ledger
            .estimate_store_gas(&cid)
            .await
            .map_err(|e| anchor_error(&cid, e))?;

        let receipt = self
            .ledger
            .submit_store(&cid, gas)
            .await
            .map_err(|e| anchor_error(&cid, e))?;

        info!(cid = %cid, tx_hash = %receipt.transaction_hash, "CID anchored");
        Ok(receipt)
    }
}

fn anchor_error(cid: &str, source: Error) -> Error {
    Error::Anchor {
        cid: cid.to_string(),
        reason: source.to_string(),
    }
}

async fn resolve_input(input: InputSource) -> Result<Vec<u8>> {
    match input {
        InputSource::Bytes(bytes) => Ok(bytes),
        InputSource::Path(path) => tokio::fs::read(&path)
            .await
            .map_err(|e| Error::Input(format!("cannot read {}: {e}", path.display()))),
        InputSource::Stream(mut reader) => {
            let mut buf = Vec::new();
            reader
                .read_to_end(&mut buf)
                .await
                .map_err(|e| Error::Input(format!("stream read failed: {e}")))?;
            Ok(buf)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::AnchorRecord;
    use alloy::primitives::Address;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct MockStorage {
        /// CID to return; `None` makes the upload fail.
        cid: Option<String>,
        uploads: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl MockStorage {
        fn returning(cid: &str) -> Self {
            Self {
                cid: Some(cid.to_string()),
                uploads: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn failing() -> Self {
            Self {
                cid: None,
                uploads: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl StorageClient for MockStorage {
        fn name(&self) -> &str {
            "mock"
        }

        async fn upload(&self, data: &[u8]) -> Result<String> {
            self.uploads.lock().unwrap().push(data.to_vec());
            self.cid
                .clone()
                .ok_or_else(|| Error::Storage("node rejected upload".into()))
        }
    }

    #[derive(Default)]
    struct MockLedger {
        fail_estimate: bool,
        fail_submit: bool,
        calls: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl LedgerClient for MockLedger {
        async fn current_height(&self) -> Result<u64> {
            Err(Error::Rpc("not used in workflow tests".into()))
        }

        async fn anchor_events(
            &self,
            _owner: Address,
            _from: u64,
            _to: u64,
        ) -> Result<Vec<AnchorRecord>> {
            Err(Error::Rpc("not used in workflow tests".into()))
        }

        async fn estimate_store_gas(&self, cid: &str) -> Result<u64> {
            self.calls.lock().unwrap().push(format!("estimate:{cid}"));
            if self.fail_estimate {
                return Err(Error::Rpc("execution reverted".into()));
            }
            Ok(53_000)
        }

        async fn submit_store(&self, cid: &str, gas_limit: u64) -> Result<TxReceipt> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("submit:{cid}:{gas_limit}"));
            if self.fail_submit {
                return Err(Error::Rpc("connection reset".into()));
            }
            Ok(TxReceipt {
                transaction_hash: "0xfeed".to_string(),
                block_number: Some("0x10".to_string()),
                status: Some("0x1".to_string()),
            })
        }
    }

    #[tokio::test]
    async fn uploads_then_anchors_with_estimated_gas() {
        let storage = MockStorage::returning("bafy123");
        let uploads = storage.uploads.clone();
        let ledger = MockLedger::default();
        let calls = ledger.calls.clone();

        let workflow = AnchorWorkflow::new(storage, ledger);
        let receipt = workflow
            .upload(InputSource::Bytes(b"hello".to_vec()))
            .await
            .unwrap();

        assert_eq!(receipt.transaction_hash, "0xfeed");
        assert_eq!(uploads.lock().unwrap().as_slice(), &[b"hello".to_vec()]);
        assert_eq!(
            calls.lock().unwrap().as_slice(),
            &["estimate:bafy123".to_string(), "submit:bafy123:53000".to_string()]
        );
    }

    #[tokio::test]
    async fn storage_failure_prevents_any_ledger_call() {
        let ledger = MockLedger::default();
        let calls = ledger.calls.clone();
        let workflow = AnchorWorkflow::new(MockStorage::failing(), ledger);

        let err = workflow
            .upload(InputSource::Bytes(b"hello".to_vec()))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Storage(_)));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_submit_surfaces_orphaned_cid() {
        let ledger = MockLedger {
            fail_submit: true,
            ..MockLedger::default()
        };
        let workflow = AnchorWorkflow::new(MockStorage::returning("bafy123"), ledger);

        let err = workflow
            .upload(InputSource::Bytes(b"hello".to_vec()))
            .await
            .unwrap_err();

        assert_eq!(err.orphaned_cid(), Some("bafy123"));
    }

    #[tokio::test]
    async fn failed_estimate_also_carries_cid() {
        let ledger = MockLedger {
            fail_estimate: true,
            ..MockLedger::default()
        };
        let calls = ledger.calls.clone();
        let workflow = AnchorWorkflow::new(MockStorage::returning("bafyQm"), ledger);

        let err = workflow
            .upload(InputSource::Bytes(vec![0u8; 4]))
            .await
            .unwrap_err();

        assert_eq!(err.orphaned_cid(), Some("bafyQm"));
        // Estimation failed, so nothing was submitted.
        assert_eq!(calls.lock().unwrap().as_slice(), &["estimate:bafyQm".to_string()]);
    }

    #[tokio::test]
    async fn unreadable_path_fails_before_upload() {
        let storage = MockStorage::returning("bafy123");
        let uploads = storage.uploads.clone();
        let workflow = AnchorWorkflow::new(storage, MockLedger::default());

        let err = workflow
            .upload(InputSource::Path(PathBuf::from("/no/such/file")))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Input(_)));
        assert!(uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn stream_input_is_drained_and_uploaded() {
        let storage = MockStorage::returning("bafy123");
        let uploads = storage.uploads.clone();
        let workflow = AnchorWorkflow::new(storage, MockLedger::default());

        let stream: BoxAsyncRead = Box::pin(std::io::Cursor::new(b"streamed".to_vec()));
        workflow.upload(InputSource::Stream(stream)).await.unwrap();

        assert_eq!(uploads.lock().unwrap().as_slice(), &[b"streamed".to_vec()]);
    }
}
