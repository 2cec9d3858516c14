pub mod error;
pub mod ledger;
pub mod storage;
pub mod sync;
pub mod workflow;
