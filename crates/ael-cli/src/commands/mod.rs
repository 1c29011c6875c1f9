pub mod balances;
pub mod close;
pub mod create;
pub mod events;
pub mod send;
pub mod status;
pub mod topup;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:9001";

/// Header carrying a payment proof on paid routes.
const PAYMENT_HEADER: &str = "X-Payment";

#[derive(Deserialize, Debug)]
struct ErrorResponse {
    error: String,
    #[serde(default)]
    x402: Option<PaymentTerms>,
}

#[derive(Deserialize, Debug)]
struct PaymentTerms {
    network: String,
    token: String,
    recipient: String,
}

/// Thin JSON client for the node's `/api/v1` routes.
pub struct NodeClient {
    http: reqwest::Client,
    base: String,
}

impl NodeClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: format!("{}/api/v1", endpoint.trim_end_matches('/')),
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> anyhow::Result<T> {
        let resp = self.http.get(self.url(path)).send().await.map_err(node_unreachable)?;
        decode(resp).await
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        payment: Option<&str>,
    ) -> anyhow::Result<T> {
        let mut req = self.http.post(self.url(path)).json(body);
        if let Some(proof) = payment {
            req = req.header(PAYMENT_HEADER, proof);
        }
        let resp = req.send().await.map_err(node_unreachable)?;
        decode(resp).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }
}

fn node_unreachable(err: reqwest::Error) -> anyhow::Error {
    anyhow::anyhow!("could not reach node: {err}\nIs the node running? Start it with: ael-node")
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> anyhow::Result<T> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json().await?);
    }
    match resp.json::<ErrorResponse>().await {
        Ok(ErrorResponse {
            error,
            x402: Some(terms),
        }) => anyhow::bail!(
            "{error} (HTTP {status})\n  pay {} on {} to {} and pass the proof with --payment",
            terms.token,
            terms.network,
            terms.recipient
        ),
        Ok(err) => anyhow::bail!("{} (HTTP {status})", err.error),
        Err(_) => anyhow::bail!("request failed (HTTP {status})"),
    }
}
