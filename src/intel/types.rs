use serde::{Deserialize, Serialize};

/// Remote reputation data for one number. Informs the blocking decision and is
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NumberReport {
    pub phone_number: String,
    pub risk_score: u8,
    pub times_reported: u32,
    /// Unix seconds at which the report was fetched.
    pub timestamp: u64,
}

impl NumberReport {
    /// Zero-risk report used when the service has no record of a number.
    pub fn unknown(phone_number: impl Into<String>, timestamp: u64) -> Self {
        Self {
            phone_number: phone_number.into(),
            risk_score: 0,
            times_reported: 0,
            timestamp,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("invalid intelligence endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("network error talking to intelligence service: {0}")]
    Network(#[from] reqwest::Error),

    #[error("could not decode intelligence response: {0}")]
    Decode(String),

    #[error("no reports for number {0}")]
    NotFound(String),

    #[error("intelligence service rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Body of `GET /report/{number}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ReportResponse {
    pub number: String,
    pub risk_score: i64,
    pub no_of_times_reported: i64,
}

impl ReportResponse {
    pub(crate) fn into_report(self, timestamp: u64) -> Result<NumberReport, LookupError> {
        let risk_score = u8::try_from(self.risk_score)
            .ok()
            .filter(|score| *score <= 100)
            .ok_or_else(|| {
                LookupError::Decode(format!("risk_score out of range: {}", self.risk_score))
            })?;
        let times_reported = u32::try_from(self.no_of_times_reported).map_err(|_| {
            LookupError::Decode(format!(
                "no_of_times_reported out of range: {}",
                self.no_of_times_reported
            ))
        })?;

        Ok(NumberReport {
            phone_number: self.number,
            risk_score,
            times_reported,
            timestamp,
        })
    }
}

/// Body of `POST /reportCall`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallReport {
    pub username: String,
    pub number: String,
    pub reason: String,
    pub date: String,
}

/// The service echoes the stored report without the username.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReportedCall {
    pub number: String,
    pub reason: String,
    pub date: String,
}

/// `{ "message": ... }` body the service sends with 4xx replies.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReportReceipt {
    pub message: String,
    pub report: ReportedCall,
}
