/// Ethereum registry client.
///
/// Talks to the registry contract over raw JSON-RPC for maximum node
/// compatibility; transactions are built and signed locally with alloy.
/// The contract exposes one method and one event:
///
///   function store(string cid)
///   event CIDStored(address indexed owner, string cid)
///
/// `store` records the sender/CID pair; history is read back via
/// `eth_getLogs` over bounded block windows.
use std::time::Duration;

use alloy::consensus::SignableTransaction;
use alloy::primitives::{Address, Bytes, LogData, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use alloy::sol;
use alloy::sol_types::{SolCall, SolEvent};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{AnchorRecord, LedgerClient, TxReceipt};
use crate::error::{Error, Result};

sol! {
    /// Emitted once per successful `store` call.
    event CIDStored(address indexed owner, string cid);

    /// Records `cid` against the caller's account.
    function store(string cid);
}

/// First height at which the registry could have emitted events
/// (its deployment block on Sepolia).
pub const DEFAULT_INCEPTION_HEIGHT: u64 = 4_546_394;

/// Maximum block span public RPC providers serve per `eth_getLogs` call.
pub const DEFAULT_LOG_WINDOW: u64 = 50_000;

pub const SEPOLIA_CHAIN_ID: u64 = 11_155_111;

pub const DEFAULT_RPC_URL: &str = "https://ethereum-sepolia.publicnode.com/";

/// Configuration for the Ethereum registry client.
#[derive(Debug, Clone)]
pub struct EthereumConfig {
    /// Ethereum JSON-RPC endpoint.
    pub rpc_url: String,
    /// Chain ID (11155111 for Sepolia).
    pub chain_id: u64,
    /// Address of the deployed registry contract.
    pub contract: Address,
    /// Private key (hex, without 0x prefix) for signing `store` transactions.
    /// Not needed for read-only history queries.
    pub private_key_hex: Option<String>,
    /// Interval between receipt polls while waiting for a transaction
    /// to be mined.
    pub receipt_poll_interval: Duration,
}

impl EthereumConfig {
    pub fn new(rpc_url: impl Into<String>, chain_id: u64, contract: Address) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            chain_id,
            contract,
            private_key_hex: None,
            receipt_poll_interval: Duration::from_secs(7),
        }
    }

    pub fn with_private_key(mut self, private_key_hex: impl Into<String>) -> Self {
        self.private_key_hex = Some(private_key_hex.into());
        self
    }
}

/// Ethereum-backed [`LedgerClient`] implementation.
pub struct EthereumRegistry {
    config: EthereumConfig,
    signer: Option<PrivateKeySigner>,
    client: Client,
}

/// Simplified JSON-RPC response.
#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    message: String,
}

/// One `eth_getLogs` entry, fields as hex strings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcLog {
    topics: Vec<String>,
    data: String,
    block_number: String,
    log_index: String,
    transaction_hash: String,
}

fn parse_hex_u64(s: &str) -> std::result::Result<u64, String> {
    u64::from_str_radix(s.trim_start_matches("0x"), 16)
        .map_err(|e| format!("invalid hex quantity {s:?}: {e}"))
}

fn parse_hex_u128(s: &str) -> std::result::Result<u128, String> {
    u128::from_str_radix(s.trim_start_matches("0x"), 16)
        .map_err(|e| format!("invalid hex quantity {s:?}: {e}"))
}

/// ABI-encoded calldata for `store(cid)`.
fn store_calldata(cid: &str) -> Vec<u8> {
    storeCall {
        cid: cid.to_string(),
    }
    .abi_encode()
}

/// Decode one raw log into an [`AnchorRecord`].
fn decode_anchor_log(log: &RpcLog) -> std::result::Result<AnchorRecord, String> {
    let topics = log
        .topics
        .iter()
        .map(|t| t.parse::<B256>().map_err(|e| format!("bad topic {t:?}: {e}")))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let data = hex::decode(log.data.trim_start_matches("0x"))
        .map_err(|e| format!("bad log data: {e}"))?;

    let event = CIDStored::decode_log_data(&LogData::new_unchecked(topics, data.into()), true)
        .map_err(|e| format!("log does not decode as CIDStored: {e}"))?;

    Ok(AnchorRecord {
        owner: event.owner,
        cid: event.cid,
        block_height: parse_hex_u64(&log.block_number)?,
        log_index: parse_hex_u64(&log.log_index)?,
        tx_hash: log.transaction_hash.clone(),
    })
}

impl EthereumRegistry {
    pub fn new(config: EthereumConfig) -> Result<Self> {
        let signer = match &config.private_key_hex {
            Some(key) => Some(
                key.parse::<PrivateKeySigner>()
                    .map_err(|e| Error::Rpc(format!("invalid private key: {e}")))?,
            ),
            None => None,
        };

        Ok(Self {
            config,
            signer,
            client: Client::new(),
        })
    }

    fn signer(&self) -> Result<&PrivateKeySigner> {
        self.signer
            .as_ref()
            .ok_or_else(|| Error::Rpc("no private key configured for signing".into()))
    }

    /// Send a JSON-RPC request; a `null` result maps to `None`.
    async fn rpc_call_opt<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<Option<T>> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let resp: JsonRpcResponse<T> = self
            .client
            .post(&self.config.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Rpc(format!("{method} request failed: {e}")))?
            .json()
            .await
            .map_err(|e| Error::Rpc(format!("{method} response parse error: {e}")))?;

        if let Some(err) = resp.error {
            return Err(Error::Rpc(format!("{method}: {}", err.message)));
        }

        Ok(resp.result)
    }

    /// Send a JSON-RPC request whose result must be present.
    async fn rpc_call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T> {
        self.rpc_call_opt(method, params)
            .await?
            .ok_or_else(|| Error::Rpc(format!("{method}: empty response")))
    }

    /// Build, sign, and broadcast a `store(cid)` transaction.
    /// Returns the transaction hash.
    async fn send_store_tx(&self, cid: &str, gas_limit: u64) -> Result<String> {
        let signer = self.signer()?;
        let from = signer.address();

        let nonce_hex: String = self
            .rpc_call(
                "eth_getTransactionCount",
                serde_json::json!([format!("{from:?}"), "pending"]),
            )
            .await?;
        let nonce = parse_hex_u64(&nonce_hex).map_err(Error::Rpc)?;

        let gas_price_hex: String = self.rpc_call("eth_gasPrice", serde_json::json!([])).await?;
        let gas_price = parse_hex_u128(&gas_price_hex).map_err(Error::Rpc)?;

        let tx = alloy::consensus::TxLegacy {
            chain_id: Some(self.config.chain_id),
            nonce,
            gas_price,
            gas_limit,
            to: alloy::primitives::TxKind::Call(self.config.contract),
            value: U256::ZERO,
            input: Bytes::from(store_calldata(cid)),
        };

        let sig_hash = tx.signature_hash();
        let sig = signer
            .sign_hash(&sig_hash)
            .await
            .map_err(|e| Error::Rpc(format!("signing failed: {e}")))?;

        let signed = alloy::consensus::TxEnvelope::Legacy(tx.into_signed(sig));

        let mut raw_tx = Vec::new();
        alloy::eips::eip2718::Encodable2718::encode_2718(&signed, &mut raw_tx);
        let raw_hex = format!("0x{}", hex::encode(&raw_tx));

        let tx_hash: String = self
            .rpc_call("eth_sendRawTransaction", serde_json::json!([raw_hex]))
            .await?;

        Ok(tx_hash)
    }
}

#[async_trait]
impl LedgerClient for EthereumRegistry {
    async fn current_height(&self) -> Result<u64> {
        let height_hex: String = self
            .rpc_call("eth_blockNumber", serde_json::json!([]))
            .await?;
        parse_hex_u64(&height_hex).map_err(Error::Rpc)
    }

    async fn anchor_events(
        &self,
        owner: Address,
        from: u64,
        to: u64,
    ) -> Result<Vec<AnchorRecord>> {
        let query_err = |reason: String| Error::LedgerQuery { from, to, reason };

        let filter = serde_json::json!({
            "address": format!("{:?}", self.config.contract),
            "fromBlock": format!("0x{from:x}"),
            "toBlock": format!("0x{to:x}"),
            "topics": [
                format!("0x{}", hex::encode(CIDStored::SIGNATURE_HASH)),
                format!("0x{}", hex::encode(owner.into_word())),
            ],
        });

        let logs: Vec<RpcLog> = self
            .rpc_call("eth_getLogs", serde_json::json!([filter]))
            .await
            .map_err(|e| query_err(e.to_string()))?;

        debug!(from, to, logs = logs.len(), "Fetched log window");

        logs.iter()
            .map(|log| decode_anchor_log(log).map_err(query_err))
            .collect()
    }

    async fn estimate_store_gas(&self, cid: &str) -> Result<u64> {
        let from = self.signer()?.address();

        let call = serde_json::json!({
            "from": format!("{from:?}"),
            "to": format!("{:?}", self.config.contract),
            "data": format!("0x{}", hex::encode(store_calldata(cid))),
        });

        let gas_hex: String = self
            .rpc_call("eth_estimateGas", serde_json::json!([call]))
            .await?;
        parse_hex_u64(&gas_hex).map_err(Error::Rpc)
    }

    async fn submit_store(&self, cid: &str, gas_limit: u64) -> Result<TxReceipt> {
        let tx_hash = self.send_store_tx(cid, gas_limit).await?;
        debug!(tx_hash = %tx_hash, "Store transaction broadcast, awaiting receipt");

        // The node returns null until the transaction is mined. Callers
        // impose their own deadline around this call.
        loop {
            let receipt: Option<TxReceipt> = self
                .rpc_call_opt(
                    "eth_getTransactionReceipt",
                    serde_json::json!([&tx_hash]),
                )
                .await?;

            if let Some(receipt) = receipt {
                return Ok(receipt);
            }

            tokio::time::sleep(self.config.receipt_poll_interval).await;
        }
    }
}
