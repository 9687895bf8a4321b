//! REST key-value backend (Upstash / Vercel KV wire format).

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use gradeboard_core::error::StoreError;
use gradeboard_core::traits::LedgerStore;

const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Key the dashboard has always used for the shared ledger.
pub const DEFAULT_KEY: &str = "bns_eval_data_v2";

/// Stores the ledger under one key of a REST key-value service.
///
/// `GET {url}/get/{key}` answers `{"result": <string|null>}`; the string is
/// handed back as-is and decoded by the ledger's document shim.
pub struct RestKvStore {
    base_url: String,
    token: String,
    key: String,
    client: reqwest::Client,
}

impl RestKvStore {
    pub fn new(base_url: &str, token: &str, key: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            key: key.to_string(),
            client,
        })
    }

    fn url(&self, command: &str) -> String {
        format!("{}/{command}/{}", self.base_url, self.key)
    }
}

#[derive(Deserialize)]
struct KvResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

fn transport_error(e: reqwest::Error) -> StoreError {
    if e.is_timeout() {
        StoreError::Timeout(DEFAULT_TIMEOUT_SECS)
    } else {
        StoreError::Unavailable(e.to_string())
    }
}

async fn read_response(response: reqwest::Response) -> Result<KvResponse, StoreError> {
    let status = response.status().as_u16();
    if status >= 400 {
        let body = response.text().await.unwrap_or_default();
        return Err(StoreError::Http {
            status,
            message: body,
        });
    }

    let body: KvResponse = response
        .json()
        .await
        .map_err(|e| StoreError::Malformed(format!("failed to parse response: {e}")))?;
    if let Some(message) = body.error {
        return Err(StoreError::Http { status, message });
    }
    Ok(body)
}

#[async_trait]
impl LedgerStore for RestKvStore {
    fn name(&self) -> &str {
        "rest_kv"
    }

    #[instrument(skip(self), fields(key = %self.key))]
    async fn get(&self) -> anyhow::Result<Option<Value>> {
        let response = self
            .client
            .get(self.url("get"))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(transport_error)?;

        let body = read_response(response).await?;
        Ok(body.result.filter(|v| !v.is_null()))
    }

    #[instrument(skip(self, document), fields(key = %self.key))]
    async fn set(&self, document: &Value) -> anyhow::Result<()> {
        let response = self
            .client
            .post(self.url("set"))
            .bearer_auth(&self.token)
            .header("content-type", "application/json")
            .body(document.to_string())
            .send()
            .await
            .map_err(transport_error)?;

        read_response(response).await?;
        Ok(())
    }
}
