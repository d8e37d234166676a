//! REST implementation of the provider port.
//!
//! Wraps the provider's instance-management HTTP API using [`reqwest`].
//! Authentication is a bearer token issued per environment; request signing
//! is handled by the provider gateway, not here.

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::provider::{
    CloneReceipt, CloneRequest, InstanceDescription, RdsProvider, ValidationReport,
};

/// HTTP client for the cloud provider's management API.
pub struct HttpRdsProvider {
    client: reqwest::Client,
    base_url: String,
    api_token: String,
}

impl HttpRdsProvider {
    /// Create a new client for the given API endpoint.
    ///
    /// * `base_url`  - e.g. `https://rds.api.example.com`, no trailing slash.
    /// * `api_token` - bearer token for the management API.
    pub fn new(base_url: String, api_token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_token,
        }
    }

    /// Create a client reusing an existing [`reqwest::Client`] (connection
    /// pooling across provider regions).
    pub fn with_client(client: reqwest::Client, base_url: String, api_token: String) -> Self {
        Self {
            client,
            base_url,
            api_token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Ensure the response has a success status code. Returns the response
    /// unchanged on success, or a [`ProviderError::Api`] containing the
    /// status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ProviderError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ProviderError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl RdsProvider for HttpRdsProvider {
    async fn get_instance(
        &self,
        instance_id: &str,
    ) -> Result<Option<InstanceDescription>, ProviderError> {
        let response = self
            .client
            .get(self.url(&format!("/api/instances/{instance_id}")))
            .bearer_auth(&self.api_token)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(Self::parse_response(response).await?))
    }

    async fn clone_instance(
        &self,
        request: &CloneRequest,
    ) -> Result<CloneReceipt, ProviderError> {
        let response = self
            .client
            .post(self.url(&format!(
                "/api/instances/{}/clone",
                request.source_instance_id
            )))
            .bearer_auth(&self.api_token)
            .json(request)
            .send()
            .await?;

        let receipt: CloneReceipt = Self::parse_response(response).await?;
        tracing::info!(
            source = %request.source_instance_id,
            target = %receipt.target_instance_id,
            "Provider accepted clone request",
        );
        Ok(receipt)
    }

    async fn validate_data(
        &self,
        instance_id: &str,
        rules: &serde_json::Value,
    ) -> Result<ValidationReport, ProviderError> {
        let body = serde_json::json!({ "rules": rules });

        let response = self
            .client
            .post(self.url(&format!("/api/instances/{instance_id}/validate")))
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    async fn delete_instance(&self, instance_id: &str) -> Result<(), ProviderError> {
        let response = self
            .client
            .delete(self.url(&format!("/api/instances/{instance_id}")))
            .bearer_auth(&self.api_token)
            .send()
            .await?;

        Self::ensure_success(response).await?;
        Ok(())
    }
}
