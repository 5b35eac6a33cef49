//! Client for the remote report service.
//!
//! Lookups only inform the caller; nothing here touches the block list.

mod types;

pub use types::{CallReport, LookupError, NumberReport, ReportReceipt, ReportedCall};

use crate::config::IntelligenceConfig;
use crate::number::PhoneNumber;
use crate::stats::SyncStats;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;
use types::{ErrorBody, ReportResponse};
use url::Url;

#[async_trait::async_trait]
pub trait NumberIntelligence: Send + Sync {
    async fn lookup(&self, number: &str) -> Result<NumberReport, LookupError>;

    /// Like `lookup`, but an unknown number is a zero-risk report.
    async fn assess(&self, number: &str) -> Result<NumberReport, LookupError> {
        match self.lookup(number).await {
            Err(LookupError::NotFound(number)) => Ok(NumberReport::unknown(number, unix_now())),
            other => other,
        }
    }

    /// `assess` keyed by the digit form the block list stores.
    async fn assess_number(&self, number: PhoneNumber) -> Result<NumberReport, LookupError> {
        self.assess(&number.to_string()).await
    }
}

pub struct NumberIntelligenceClient {
    base_url: Url,
    client: Client,
    stats: Arc<SyncStats>,
}

impl NumberIntelligenceClient {
    pub fn new(config: &IntelligenceConfig, stats: Arc<SyncStats>) -> Result<Self, LookupError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| LookupError::InvalidEndpoint(format!("{}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(LookupError::InvalidEndpoint(config.base_url.clone()));
        }

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            base_url,
            client,
            stats,
        })
    }

    /// Submits a user's call report (`POST /reportCall`).
    pub async fn report_call(&self, report: &CallReport) -> Result<ReportReceipt, LookupError> {
        let url = self.endpoint(&["reportCall"])?;
        debug!("Submitting call report for {} to {}", report.number, url);

        let resp = self.client.post(url).json(report).send().await?;
        let status = resp.status();
        if status.is_client_error() {
            let body = resp.bytes().await?;
            let message = decode::<ErrorBody>(&body)
                .map(|e| e.message)
                .unwrap_or_else(|_| String::from_utf8_lossy(&body).into_owned());
            return Err(LookupError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        let resp = resp.error_for_status()?;
        decode(&resp.bytes().await?)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, LookupError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| LookupError::InvalidEndpoint(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait::async_trait]
impl NumberIntelligence for NumberIntelligenceClient {
    async fn lookup(&self, number: &str) -> Result<NumberReport, LookupError> {
        self.stats.inc_lookups();
        let url = self.endpoint(&["report", number])?;
        debug!("Looking up {} at {}", number, url);

        let resp = self.client.get(url).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            self.stats.inc_lookups_not_found();
            return Err(LookupError::NotFound(number.to_string()));
        }
        let resp = resp.error_for_status()?;

        let body: ReportResponse = decode(&resp.bytes().await?)?;
        body.into_report(unix_now())
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, LookupError> {
    serde_json::from_slice(body).map_err(|e| LookupError::Decode(e.to_string()))
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
