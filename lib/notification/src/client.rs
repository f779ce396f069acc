//! Remote notification API.
//!
//! The backend exposes three JSON-over-POST endpoints under
//! `{base_url}/workflow/`. Every response is wrapped in an envelope carrying
//! an optional status code and the result payload.

use crate::error::NotificationError;
use crate::subscriber::SubscriberInformation;
use async_trait::async_trait;
use loanshark_core::WorkflowKey;
use rootcause::Report;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::{debug, instrument};

const ADD_ENDPOINT: &str = "addSubscriberInformation";
const GET_ENDPOINT: &str = "getSubscriberInformationByKey";
const UPDATE_ENDPOINT: &str = "updateSubscriberInformation";

/// Response envelope of the notification backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    /// Backend status code; zero means success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    /// Response payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonValue>,
}

impl ApiResponse {
    /// Creates a successful response with no payload.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            code: Some(0),
            result: None,
        }
    }

    /// Returns true if the backend reported success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Access to subscriber notification records.
#[async_trait]
pub trait NotificationApi: Send + Sync {
    /// Creates the record of a newly saved workflow.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached or rejects the request.
    async fn add_subscriber_information(
        &self,
        record: &SubscriberInformation,
    ) -> Result<ApiResponse, Report<NotificationError>>;

    /// Fetches the record of a workflow, if one exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached or returns a
    /// malformed record.
    async fn get_subscriber_information_by_key(
        &self,
        key: &WorkflowKey,
    ) -> Result<Option<SubscriberInformation>, Report<NotificationError>>;

    /// Replaces the record of a workflow.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached or rejects the request.
    async fn update_subscriber_information(
        &self,
        record: &SubscriberInformation,
    ) -> Result<ApiResponse, Report<NotificationError>>;
}

/// Notification backend configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationApiConfig {
    /// Base URL of the backend.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for NotificationApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// [`NotificationApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpNotificationClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpNotificationClient {
    /// Creates a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &NotificationApiConfig) -> Result<Self, Report<NotificationError>> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NotificationError::ClientBuild {
                reason: e.to_string(),
            })?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/workflow/{endpoint}", self.base_url)
    }

    async fn post(
        &self,
        endpoint: &str,
        body: &SubscriberInformation,
    ) -> Result<ApiResponse, Report<NotificationError>> {
        let response = self
            .http
            .post(self.endpoint_url(endpoint))
            .json(body)
            .send()
            .await
            .map_err(|e| NotificationError::RequestFailed {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;

        check_status(endpoint, response.status())?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| NotificationError::InvalidResponse {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;
        let envelope = decode_envelope(endpoint, &bytes)?;
        debug!(endpoint, code = ?envelope.code, "notification backend responded");
        Ok(envelope)
    }
}

#[async_trait]
impl NotificationApi for HttpNotificationClient {
    #[instrument(skip(self, record), fields(workflow_key = %record.key))]
    async fn add_subscriber_information(
        &self,
        record: &SubscriberInformation,
    ) -> Result<ApiResponse, Report<NotificationError>> {
        self.post(ADD_ENDPOINT, record).await
    }

    #[instrument(skip(self), fields(workflow_key = %key))]
    async fn get_subscriber_information_by_key(
        &self,
        key: &WorkflowKey,
    ) -> Result<Option<SubscriberInformation>, Report<NotificationError>> {
        let query = SubscriberInformation::empty(key.clone());
        let envelope = self.post(GET_ENDPOINT, &query).await?;
        decode_record(envelope.result)
    }

    #[instrument(skip(self, record), fields(workflow_key = %record.key))]
    async fn update_subscriber_information(
        &self,
        record: &SubscriberInformation,
    ) -> Result<ApiResponse, Report<NotificationError>> {
        self.post(UPDATE_ENDPOINT, record).await
    }
}

/// Accepts only `200 OK` responses.
fn check_status(endpoint: &str, status: reqwest::StatusCode) -> Result<(), Report<NotificationError>> {
    if status == reqwest::StatusCode::OK {
        return Ok(());
    }
    Err(NotificationError::UnexpectedStatus {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
    }
    .into())
}

fn decode_envelope(endpoint: &str, body: &[u8]) -> Result<ApiResponse, Report<NotificationError>> {
    serde_json::from_slice(body).map_err(|e| {
        NotificationError::InvalidResponse {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

/// Decodes the record in a lookup result.
///
/// The backend answers a lookup for an unknown key with no result, `null`,
/// or an empty list.
fn decode_record(
    result: Option<JsonValue>,
) -> Result<Option<SubscriberInformation>, Report<NotificationError>> {
    match result {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::Array(items)) if items.is_empty() => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| {
                NotificationError::InvalidResponse {
                    endpoint: GET_ENDPOINT.to_string(),
                    reason: e.to_string(),
                }
                .into()
            }),
    }
}
