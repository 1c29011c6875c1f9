use std::time::Duration;

use async_trait::async_trait;

use crate::error::PaymentError;
use crate::types::{VerifyRequest, VerifyResponse};

/// External payment facilitator.
///
/// Implementations return the facilitator's verdict as-is; only failures to
/// obtain a verdict are errors, and those are always `Transient`.
#[async_trait]
pub trait Facilitator: Send + Sync {
    async fn verify(&self, proof: &str, expected_recipient: &str)
        -> Result<VerifyResponse, PaymentError>;
}

/// Facilitator reached over HTTP at `POST {base_url}/verify`.
pub struct HttpFacilitator {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFacilitator {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PaymentError::Config(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Facilitator for HttpFacilitator {
    async fn verify(
        &self,
        proof: &str,
        expected_recipient: &str,
    ) -> Result<VerifyResponse, PaymentError> {
        let body = VerifyRequest {
            payment_proof: proof.to_string(),
            recipient: expected_recipient.to_string(),
        };
        let resp = self
            .client
            .post(format!("{}/verify", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| PaymentError::Transient(format!("call facilitator: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PaymentError::Transient(format!(
                "facilitator returned {status}"
            )));
        }

        resp.json::<VerifyResponse>()
            .await
            .map_err(|e| PaymentError::Transient(format!("parse facilitator response: {e}")))
    }
}
