//! Remote Advisor
//!
//! HTTP client for the remote advisory endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::{debug, info};

use super::Advisor;
use crate::error::ServiceError;
use crate::models::{AdvisoryRequest, AdvisoryResponse};

/// Upper bound on a single remote call
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

// == Remote Advisor ==
/// Posts each request as JSON to the advisory endpoint and parses the
/// response body as an [`AdvisoryResponse`].
#[derive(Debug, Clone)]
pub struct RemoteAdvisor {
    client: Client,
    endpoint: String,
}

impl RemoteAdvisor {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Advisor for RemoteAdvisor {
    async fn prepare(&self) -> Result<(), ServiceError> {
        let url = Url::parse(&self.endpoint).map_err(|e| {
            ServiceError::Advisor(format!("Invalid advisor URL '{}': {}", self.endpoint, e))
        })?;
        info!(endpoint = %url, "Remote advisor configured");
        Ok(())
    }

    async fn compute(&self, request: &AdvisoryRequest) -> Result<AdvisoryResponse, ServiceError> {
        debug!(endpoint = %self.endpoint, "Calling remote advisor");

        let response = self
            .client
            .post(&self.endpoint)
            .timeout(REQUEST_TIMEOUT)
            .json(request)
            .send()
            .await
            .map_err(|e| ServiceError::Advisor(format!("Request failed: {}", e)))?;

        let response = response
            .error_for_status()
            .map_err(|e| ServiceError::Advisor(format!("Advisor returned an error: {}", e)))?;

        response
            .json::<AdvisoryResponse>()
            .await
            .map_err(|e| ServiceError::Advisor(format!("Malformed advisor response: {}", e)))
    }
}
