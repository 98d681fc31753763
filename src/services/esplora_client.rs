//! Esplora-style chain API client for Liquid networks.
//!
//! Speaks the REST surface exposed by a local Nigiri regtest (Chopsticks)
//! and by public Liquid Esplora instances: faucet funding, address UTXO
//! lookup, raw transaction fetch, and broadcast. The covenant core never
//! touches the network; this client exists for integration harnesses and
//! the CLI.

use std::{env, str::FromStr};

use elements::encode;
use elements::{Transaction, Txid};
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use tokio::time::sleep;

use crate::config::{env as config_env, network};
use crate::error::{CovenantError, CovenantResult};

/// An unspent output as reported by the address index
#[derive(Debug, Clone, Deserialize)]
pub struct Utxo {
    pub txid: String,
    pub vout: u32,
    /// Explicit satoshi value, absent for confidential outputs
    #[serde(default)]
    pub value: Option<u64>,
    /// Hex asset id, absent for confidential outputs
    #[serde(default)]
    pub asset: Option<String>,
    pub status: UtxoStatus,
}

/// Confirmation status of an unspent output
#[derive(Debug, Clone, Deserialize)]
pub struct UtxoStatus {
    pub confirmed: bool,
    #[serde(default)]
    pub block_height: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct FaucetResponse {
    #[serde(rename = "txId")]
    tx_id: String,
}

/// Client for a Liquid Esplora/Chopsticks HTTP API
#[derive(Debug, Clone)]
pub struct EsploraClient {
    client: Client,
    api_base: String,
}

impl EsploraClient {
    /// Create a client against the endpoint from the environment, falling
    /// back to the local Nigiri regtest default
    pub fn new() -> CovenantResult<Self> {
        dotenv::dotenv().ok();

        let api_base = env::var(config_env::ESPLORA_URL)
            .unwrap_or_else(|_| network::ESPLORA_API_BASE.to_string());
        Self::with_base_url(api_base)
    }

    /// Create a client against an explicit API base URL
    pub fn with_base_url(api_base: impl Into<String>) -> CovenantResult<Self> {
        let client = Client::builder()
            .timeout(network::REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CovenantError::operation("client_creation", e.to_string()))?;

        Ok(Self {
            client,
            api_base: api_base.into(),
        })
    }

    /// Ask the regtest faucet to fund an address, then poll the address
    /// index until the coin appears
    pub async fn faucet(&self, address: &str) -> CovenantResult<Utxo> {
        let url = format!("{}/faucet", self.api_base);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "address": address }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(CovenantError::operation(
                "faucet",
                format!("HTTP {}", response.status()),
            ));
        }
        let funding: FaucetResponse = response.json().await?;
        debug!("faucet sent {} to {}", funding.tx_id, address);

        for _ in 0..network::FAUCET_POLL_ATTEMPTS {
            sleep(network::FAUCET_POLL_INTERVAL).await;
            let utxos = self.address_utxos(address).await?;
            if let Some(utxo) = utxos.into_iter().find(|utxo| utxo.txid == funding.tx_id) {
                return Ok(utxo);
            }
        }

        Err(CovenantError::operation(
            "faucet",
            format!("coin {} never appeared in the address index", funding.tx_id),
        ))
    }

    /// List unspent outputs of an address
    pub async fn address_utxos(&self, address: &str) -> CovenantResult<Vec<Utxo>> {
        let url = format!("{}/address/{}/utxo", self.api_base, address);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(CovenantError::operation(
                "address_utxos",
                format!("HTTP {}", response.status()),
            ));
        }
        Ok(response.json().await?)
    }

    /// Fetch a raw transaction as hex
    pub async fn tx_hex(&self, txid: &Txid) -> CovenantResult<String> {
        let url = format!("{}/tx/{}/hex", self.api_base, txid);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(CovenantError::operation(
                "tx_hex",
                format!("HTTP {}", response.status()),
            ));
        }
        Ok(response.text().await?)
    }

    /// Fetch and decode a transaction
    pub async fn tx(&self, txid: &Txid) -> CovenantResult<Transaction> {
        let tx_hex = self.tx_hex(txid).await?;
        let bytes = hex::decode(tx_hex.trim())?;
        Ok(encode::deserialize(&bytes)?)
    }

    /// Broadcast a transaction and return its txid
    pub async fn broadcast(&self, tx: &Transaction) -> CovenantResult<Txid> {
        let tx_hex = encode::serialize_hex(tx);
        let url = format!("{}/broadcast?tx={}", self.api_base, tx_hex);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CovenantError::operation(
                "broadcast",
                format!("HTTP {}: {}", status, body),
            ));
        }
        let body = response.text().await?;
        Txid::from_str(body.trim())
            .map_err(|e| CovenantError::operation("broadcast", format!("bad txid: {}", e)))
    }
}
