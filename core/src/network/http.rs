//! [`NetworkProvider`] over the public MultiversX REST API.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::provider::{NetworkProvider, ProviderError};
use super::types::{
    AccountOnNetwork, ApiErrorBody, SendTransactionResponse, TransactionOnNetwork,
};
use crate::config::{Network, DEFAULT_HTTP_TIMEOUT};
use crate::crypto::address::Address;
use crate::transaction::SignedTransaction;

/// REST client for `https://{devnet-,testnet-,}api.multiversx.com`.
#[derive(Debug, Clone)]
pub struct ApiNetworkProvider {
    client: Client,
    base_url: String,
}

impl ApiNetworkProvider {
    /// Client for an arbitrary API base URL (no trailing slash needed).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("warp-core/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Uses a preconfigured `reqwest` client (proxies, TLS roots, timeouts).
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Client for a public network's API with the default timeout.
    pub fn for_network(network: Network) -> Result<Self, ProviderError> {
        Self::new(network.api_url(), DEFAULT_HTTP_TIMEOUT)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn read_json<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ProviderError> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| ProviderError::Decode(e.to_string()))
    }

    async fn read_error(response: reqwest::Response) -> ApiErrorBody {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        serde_json::from_str::<ApiErrorBody>(&text).unwrap_or_else(|_| ApiErrorBody {
            message: text,
            error: status.canonical_reason().unwrap_or_default().to_string(),
            status_code: Some(status.as_u16()),
        })
    }
}

fn transport(e: reqwest::Error) -> ProviderError {
    ProviderError::Transport(e.to_string())
}

#[async_trait]
impl NetworkProvider for ApiNetworkProvider {
    async fn get_account(&self, address: &Address) -> Result<AccountOnNetwork, ProviderError> {
        let url = format!("{}/accounts/{}", self.base_url, address.to_bech32());
        tracing::debug!(%url, "fetching account");

        let response = self.client.get(&url).send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            let body = Self::read_error(response).await;
            return Err(ProviderError::Http {
                status: status.as_u16(),
                message: body.message,
            });
        }
        Self::read_json(response).await
    }

    async fn send_transaction(&self, tx: &SignedTransaction) -> Result<String, ProviderError> {
        let url = format!("{}/transactions", self.base_url);
        tracing::debug!(%url, nonce = tx.nonce(), "submitting transaction");

        let response = self
            .client
            .post(&url)
            .json(&tx.to_wire())
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();

        if status.is_client_error() {
            let body = Self::read_error(response).await;
            let reason = if body.message.is_empty() {
                body.error
            } else {
                body.message
            };
            return Err(ProviderError::Rejected { reason });
        }
        if !status.is_success() {
            let body = Self::read_error(response).await;
            return Err(ProviderError::Http {
                status: status.as_u16(),
                message: body.message,
            });
        }

        let sent: SendTransactionResponse = Self::read_json(response).await?;
        Ok(sent.tx_hash)
    }

    async fn get_transaction(&self, hash: &str) -> Result<TransactionOnNetwork, ProviderError> {
        let url = format!("{}/transactions/{}?withResults=true", self.base_url, hash);

        let response = self.client.get(&url).send().await.map_err(transport)?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(hash.to_string()));
        }
        if !status.is_success() {
            let body = Self::read_error(response).await;
            return Err(ProviderError::Http {
                status: status.as_u16(),
                message: body.message,
            });
        }
        Self::read_json(response).await
    }
}
