//! SIMRS wire/boundary support for the booking core.
//!
//! This crate provides **wire models** and **translation helpers** for the hospital information
//! system (SIMRS) REST API, plus the HTTP client that talks to it:
//! - patient search responses (by medical-record number or national ID)
//! - department (poli) and payment-method reference catalogues
//! - booking submission requests and confirmations
//!
//! Every response body is parsed through a strict wire struct first and then translated into a
//! domain type. Malformed payloads fail with [`SimrsError::Translation`] naming the JSON path that
//! did not match, instead of leaking partially-filled values into the wizard.

pub mod booking;
pub mod catalog;
pub mod client;
pub mod patient;

// Re-export facades
pub use booking::Booking;
pub use catalog::Catalog;
pub use patient::PatientSearch;

// Re-export public domain-level types
pub use booking::{
    BookingConfirmation, BookingRequest, InsurancePayload, NewPatientPayload, PatientPayload,
    ReturningPatientPayload,
};
pub use catalog::{PaymentMethod, Poli};
pub use client::{HttpSimrsClient, SimrsApi, REQUEST_ID_HEADER};
pub use patient::{Gender, PatientRecord, PatientSearchOutcome};

use serde::de::DeserializeOwned;

/// Errors returned by the `simrs` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum SimrsError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("SIMRS responded with HTTP {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Status {
        status: u16,
        message: Option<String>,
    },

    #[error("translation error: {0}")]
    Translation(String),
}

impl SimrsError {
    /// HTTP status code, when the failure came from a non-success response.
    pub fn status(&self) -> Option<u16> {
        match self {
            SimrsError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Type alias for Results that can fail with a [`SimrsError`].
pub type SimrsResult<T> = Result<T, SimrsError>;

/// Parse a JSON body into a wire struct, reporting the failing path on mismatch.
///
/// `what` names the payload in the error message (for example `"patient search"`).
pub(crate) fn parse_wire<T: DeserializeOwned>(body: &str, what: &str) -> SimrsResult<T> {
    let mut deserializer = serde_json::Deserializer::from_str(body);

    match serde_path_to_error::deserialize::<_, T>(&mut deserializer) {
        Ok(parsed) => Ok(parsed),
        Err(err) => {
            let path = err.path().to_string();
            let source = err.into_inner();
            let path = if path.is_empty() || path == "." {
                "<root>"
            } else {
                path.as_str()
            };
            Err(SimrsError::Translation(format!(
                "{what} schema mismatch at {path}: {source}"
            )))
        }
    }
}

/// Normalise an optional SIMRS text column.
///
/// SIMRS fills unknown columns with `""` or `"-"`; both become `None`.
pub(crate) fn clean_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && v != "-")
}
