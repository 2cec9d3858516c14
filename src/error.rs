use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No usable byte source: {0}")]
    Input(String),

    #[error("Storage upload failed: {0}")]
    Storage(String),

    #[error("Anchoring CID {cid} failed: {reason}")]
    Anchor { cid: String, reason: String },

    #[error("Event query over blocks {from}..={to} failed: {reason}")]
    LedgerQuery { from: u64, to: u64, reason: String },

    #[error("Invalid account address: {0}")]
    InvalidAccount(String),

    #[error("Ledger RPC error: {0}")]
    Rpc(String),
}

impl Error {
    /// The CID carried by an `Anchor` error, if any.
    ///
    /// Content uploaded before a failed anchor step is not rolled back;
    /// callers use this to retry the anchor without re-uploading.
    pub fn orphaned_cid(&self) -> Option<&str> {
        match self {
            Error::Anchor { cid, .. } => Some(cid),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
