use crate::step::{Step, StepEvent};
use crate::validation::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("patient not found: {message}")]
    LookupNotFound { message: String },
    #[error("patient lookup failed: {message}")]
    LookupFailed { message: String },

    #[error("booking rejected (HTTP {status}): {message}")]
    SubmissionRejected { status: u16, message: String },
    #[error("booking rate limited: {message}")]
    SubmissionRateLimited { message: String },
    #[error("booking failed: {message}")]
    SubmissionFailed { message: String },

    #[error("cannot {event} from step {from}")]
    InvalidTransition { from: Step, event: StepEvent },
    #[error("booking wizard is closed")]
    Closed,

    #[error("failed to read draft: {0}")]
    DraftRead(std::io::Error),
    #[error("failed to write draft: {0}")]
    DraftWrite(std::io::Error),
    #[error("failed to remove draft: {0}")]
    DraftRemove(std::io::Error),
    #[error("failed to serialize draft: {0}")]
    DraftSerialization(serde_json::Error),
    #[error("failed to deserialize draft: {0}")]
    DraftDeserialization(serde_json::Error),
}

impl BookingError {
    /// True for failures that came back from SIMRS rather than from local checks.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            BookingError::LookupNotFound { .. }
                | BookingError::LookupFailed { .. }
                | BookingError::SubmissionRejected { .. }
                | BookingError::SubmissionRateLimited { .. }
                | BookingError::SubmissionFailed { .. }
        )
    }
}

pub type BookingResult<T> = std::result::Result<T, BookingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_failures_are_told_apart_from_local_ones() {
        let rate_limited = BookingError::SubmissionRateLimited {
            message: "Terlalu banyak permintaan".into(),
        };
        let not_found = BookingError::LookupNotFound {
            message: "Pasien tidak ditemukan".into(),
        };
        assert!(rate_limited.is_remote());
        assert!(not_found.is_remote());

        assert!(!BookingError::Closed.is_remote());
        assert!(!BookingError::InvalidInput("rm kosong".into()).is_remote());
    }
}
