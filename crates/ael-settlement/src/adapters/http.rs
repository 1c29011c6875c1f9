use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ResolveError, SettlementError};
use crate::traits::{EscrowClient, IdentityResolver};
use crate::types::{channel_id_bytes32, normalize_address};

#[derive(Serialize)]
struct SettleBody<'a> {
    channel_id: String,
    agents: &'a [String],
    balances: &'a [u64],
}

#[derive(Serialize)]
struct FundBody {
    channel_id: String,
    usdc_amount: u64,
}

#[derive(Deserialize)]
struct TxResponse {
    tx_hash: String,
}

/// Escrow client talking to an operator relay that signs and submits the
/// contract calls. Every request is bounded by the client timeout.
pub struct HttpEscrowClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpEscrowClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SettlementError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<String, SettlementError> {
        let url = format!("{}/{}", self.base_url, path);
        let resp = self.client.post(&url).json(body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(SettlementError::Escrow(format!("{path} returned {status}: {text}")));
        }
        let parsed: TxResponse = resp.json().await?;
        tracing::debug!(path, tx_hash = %parsed.tx_hash, "escrow call accepted");
        Ok(parsed.tx_hash)
    }
}

#[async_trait]
impl EscrowClient for HttpEscrowClient {
    async fn settle(
        &self,
        channel_id: &str,
        addresses: &[String],
        balances: &[u64],
    ) -> Result<String, SettlementError> {
        let body = SettleBody {
            channel_id: channel_id_bytes32(channel_id),
            agents: addresses,
            balances,
        };
        self.post("settle", &body).await
    }

    async fn deposit(&self, channel_id: &str, usdc_base_units: u64) -> Result<String, SettlementError> {
        let body = FundBody {
            channel_id: channel_id_bytes32(channel_id),
            usdc_amount: usdc_base_units,
        };
        self.post("deposit", &body).await
    }

    async fn topup(&self, channel_id: &str, usdc_base_units: u64) -> Result<String, SettlementError> {
        let body = FundBody {
            channel_id: channel_id_bytes32(channel_id),
            usdc_amount: usdc_base_units,
        };
        self.post("topup", &body).await
    }

    fn client_id(&self) -> &str {
        "escrow-http"
    }
}

#[derive(Deserialize)]
struct AgentRecord {
    #[serde(default)]
    evm_address: Option<String>,
}

/// Resolver backed by an agent registry's `GET /agents/{id}` endpoint.
pub struct HttpResolver {
    client: reqwest::Client,
    base_url: String,
}

impl HttpResolver {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SettlementError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl IdentityResolver for HttpResolver {
    async fn resolve(&self, agent_id: &str) -> Result<String, ResolveError> {
        let url = format!("{}/agents/{}", self.base_url, agent_id);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ResolveError::Unavailable(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ResolveError::NotFound(agent_id.to_string()));
        }
        if !resp.status().is_success() {
            return Err(ResolveError::Unavailable(format!(
                "registry returned {}",
                resp.status()
            )));
        }

        let record: AgentRecord = resp
            .json()
            .await
            .map_err(|e| ResolveError::Unavailable(e.to_string()))?;
        let raw = record
            .evm_address
            .filter(|a| !a.trim().is_empty())
            .ok_or_else(|| ResolveError::NotFound(agent_id.to_string()))?;
        normalize_address(&raw).ok_or(ResolveError::InvalidAddress {
            agent_id: agent_id.to_string(),
            address: raw,
        })
    }
}
