//! Tron full-node HTTP client
//!
//! Implements [`TronRpc`] over the node's `/wallet/*` HTTP API using hex-encoded addresses
//! (`visible: false`). Every request is bounded by the client's transport timeout.

use crate::address::TronAddress;
use crate::protocol::{Transaction, TriggerSmartContract};
use crate::revert::decode_revert_data;
use crate::rpc::{decode_hex_text, BroadcastReturn, TransactionInfo, TronRpc};
use anyhow::{Context, Result};
use async_trait::async_trait;
use prost::Message;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Header TronGrid uses for API keys.
pub const API_KEY_HEADER: &str = "TRON-PRO-API-KEY";

/// Client for a Tron full node's HTTP API.
pub struct TronHttpClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl TronHttpClient {
    /// Creates a new client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Full-node HTTP endpoint (e.g. `https://api.trongrid.io`)
    /// * `timeout` - Per-request transport timeout
    /// * `api_key` - Optional TronGrid API key
    pub fn new(base_url: &str, timeout: Duration, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.post(&url).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.header(API_KEY_HEADER, api_key);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", url))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("HTTP {} from {}: {}", status, url, text);
        }
        let value: Value = response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", url))?;

        if let Some(error) = value.get("Error").and_then(|e| e.as_str()) {
            anyhow::bail!("Tron node error from {}: {}", url, error);
        }
        Ok(value)
    }

    fn trigger_body(call: &TriggerSmartContract) -> Value {
        json!({
            "owner_address": hex::encode(&call.owner_address),
            "contract_address": hex::encode(&call.contract_address),
            "data": hex::encode(&call.data),
            "call_value": call.call_value,
            "visible": false,
        })
    }
}

/// Reads the `{ result: { result, code, message } }` envelope of trigger responses.
fn check_trigger_result(response: &Value, what: &str) -> Result<()> {
    let result = response.get("result");
    let ok = result
        .and_then(|r| r.get("result"))
        .and_then(|r| r.as_bool())
        .unwrap_or(false);
    if ok {
        return Ok(());
    }
    let code = result
        .and_then(|r| r.get("code"))
        .and_then(|c| c.as_str())
        .unwrap_or("UNKNOWN");
    let message = result
        .and_then(|r| r.get("message"))
        .and_then(|m| m.as_str())
        .map(decode_hex_text)
        .unwrap_or_default();
    anyhow::bail!("Tron {} failed: {} {}", what, code, message)
}

#[async_trait]
impl TronRpc for TronHttpClient {
    async fn trigger_contract(
        &self,
        call: &TriggerSmartContract,
        fee_limit: i64,
    ) -> Result<Transaction> {
        let mut body = Self::trigger_body(call);
        body["fee_limit"] = json!(fee_limit);

        let response = self.post("/wallet/triggersmartcontract", body).await?;
        check_trigger_result(&response, "triggersmartcontract")?;

        let raw_data_hex = response
            .get("transaction")
            .and_then(|tx| tx.get("raw_data_hex"))
            .and_then(|raw| raw.as_str())
            .context("triggersmartcontract response has no transaction.raw_data_hex")?;
        let tx = Transaction::from_raw_data_hex(raw_data_hex)?;
        debug!(
            "Built unsigned Tron transaction ({} bytes of raw data)",
            raw_data_hex.len() / 2
        );
        Ok(tx)
    }

    async fn trigger_constant_contract(&self, call: &TriggerSmartContract) -> Result<Vec<u8>> {
        let response = self
            .post("/wallet/triggerconstantcontract", Self::trigger_body(call))
            .await?;
        check_trigger_result(&response, "triggerconstantcontract")?;

        let data = response
            .get("constant_result")
            .and_then(|r| r.as_array())
            .and_then(|r| r.first())
            .and_then(|r| r.as_str())
            .map(hex::decode)
            .transpose()
            .context("Invalid hex in constant_result")?
            .unwrap_or_default();

        let reverted = response
            .get("transaction")
            .and_then(|tx| tx.get("ret"))
            .and_then(|ret| ret.as_array())
            .and_then(|ret| ret.first())
            .and_then(|ret| ret.get("ret"))
            .and_then(|ret| ret.as_str())
            == Some("FAILED");
        if reverted {
            let reason = decode_revert_data(&data)
                .unwrap_or_else(|| format!("0x{}", hex::encode(&data)));
            anyhow::bail!(
                "Constant call to {} reverted: {}",
                hex::encode(&call.contract_address),
                reason
            );
        }
        Ok(data)
    }

    async fn broadcast_transaction(&self, tx: &Transaction) -> Result<BroadcastReturn> {
        let body = json!({ "transaction": hex::encode(tx.encode_to_vec()) });
        let response = self.post("/wallet/broadcasthex", body).await?;

        let result = response
            .get("result")
            .and_then(|r| r.as_bool())
            .unwrap_or(false);
        let message = response
            .get("message")
            .and_then(|m| m.as_str())
            .map(decode_hex_text)
            .unwrap_or_default();
        let message = match response.get("code").and_then(|c| c.as_str()) {
            Some(code) if !result && message.is_empty() => code.to_string(),
            _ => message,
        };
        Ok(BroadcastReturn { result, message })
    }

    async fn get_transaction_info_by_id(&self, txid: &str) -> Result<Option<TransactionInfo>> {
        let response = self
            .post("/wallet/gettransactioninfobyid", json!({ "value": txid }))
            .await?;

        let is_empty = response.as_object().map(|o| o.is_empty()).unwrap_or(true);
        if is_empty {
            return Ok(None);
        }
        let info: TransactionInfo = serde_json::from_value(response)
            .context("Failed to parse transaction info")?;
        Ok(Some(info))
    }

    async fn is_contract_deployed(&self, address: &TronAddress) -> Result<bool> {
        let response = self
            .post(
                "/wallet/getcontract",
                json!({ "value": address.to_hex(), "visible": false }),
            )
            .await?;
        Ok(response.get("contract_address").is_some() || response.get("bytecode").is_some())
    }
}
