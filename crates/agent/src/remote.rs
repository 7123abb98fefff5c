use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use caseworth_core::config::ValuationServiceConfig;
use caseworth_core::domain::valuation::{CaseValuation, CaseValuationInput};
use caseworth_core::errors::RemoteServiceError;
use caseworth_core::valuation::{
    RemoteValuationRequest, RemoteValuationResponse, RemoteValuationService,
};

pub const CALCULATE_PATH: &str = "/api/calculate-settlement";

/// `reqwest` client for the remote AI valuation service. One POST per
/// valuation request, no retries; callers fall back to the local formula on
/// any error.
pub struct HttpValuationClient {
    client: Client,
    endpoint: String,
    api_key: Option<SecretString>,
    timeout: Duration,
}

impl HttpValuationClient {
    pub fn new(
        base_url: &str,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, RemoteServiceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| RemoteServiceError::Transport(error.to_string()))?;
        let endpoint = format!("{}{CALCULATE_PATH}", base_url.trim_end_matches('/'));

        Ok(Self { client, endpoint, api_key, timeout })
    }

    /// Returns `Ok(None)` when the remote path is switched off.
    pub fn from_config(
        config: &ValuationServiceConfig,
    ) -> Result<Option<Self>, RemoteServiceError> {
        if !config.enabled {
            return Ok(None);
        }
        let base_url = config.base_url.as_deref().ok_or(RemoteServiceError::Disabled)?;
        Self::new(base_url, config.api_key.clone(), config.timeout()).map(Some)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RemoteValuationService for HttpValuationClient {
    async fn evaluate(
        &self,
        request: &RemoteValuationRequest,
    ) -> Result<RemoteValuationResponse, RemoteServiceError> {
        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key.expose_secret());
        }

        let response = builder.send().await.map_err(|error| {
            if error.is_timeout() {
                RemoteServiceError::Timeout(self.timeout)
            } else {
                RemoteServiceError::Transport(error.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteServiceError::Status(status.as_u16()));
        }

        let payload: RemoteValuationResponse = response.json().await.map_err(|error| {
            if error.is_timeout() {
                RemoteServiceError::Timeout(self.timeout)
            } else {
                RemoteServiceError::InvalidPayload(format!(
                    "failed to decode valuation response: {error}"
                ))
            }
        })?;

        if !payload.success {
            return Err(RemoteServiceError::Rejected(
                payload.error.unwrap_or_else(|| "service reported success=false".to_string()),
            ));
        }

        debug!(
            event_name = "valuation.remote.response",
            endpoint = %self.endpoint,
            "remote valuation response received"
        );
        Ok(payload)
    }
}

/// One remote valuation bounded by `timeout`, mapped onto the submitted input.
pub async fn evaluate_within(
    service: &dyn RemoteValuationService,
    input: &CaseValuationInput,
    timeout: Duration,
) -> Result<CaseValuation, RemoteServiceError> {
    let request = RemoteValuationRequest::from_input(input);
    match tokio::time::timeout(timeout, service.evaluate(&request)).await {
        Ok(response) => response?.into_valuation(input),
        Err(_) => Err(RemoteServiceError::Timeout(timeout)),
    }
}
