//! Patient lookup against the SIMRS registry.
//!
//! A lookup is split in two so the caller never holds the resolver across an `.await`:
//! [`PatientResolver::begin`] hands out a [`LookupTicket`], the caller fetches with
//! [`PatientResolver::fetch`], and [`PatientResolver::complete`] applies the result.
//!
//! Every `begin` and every [`PatientResolver::invalidate`] bumps a sequence number. A result
//! whose ticket is not the latest is discarded, so a slow response for an old identifier never
//! overwrites a newer (or cleared) search state.

use crate::constants::{MIN_LOOKUP_IDENTIFIER_LEN, NIK_LOOKUP_MIN_LEN};
use crate::validation::ValidationIssue;
use booking_types::mask_identifier;
use simrs::{PatientRecord, PatientSearchOutcome, SimrsApi, SimrsResult};

/// Which registry endpoint an identifier is looked up with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LookupStrategy {
    MedicalRecord,
    NationalId,
}

impl LookupStrategy {
    /// Identifiers of at least 15 characters are national IDs; anything shorter is an RM.
    pub fn for_identifier(identifier: &str) -> Self {
        if identifier.trim().chars().count() >= NIK_LOOKUP_MIN_LEN {
            LookupStrategy::NationalId
        } else {
            LookupStrategy::MedicalRecord
        }
    }
}

/// Proof that a lookup was started. Only the most recent ticket may complete.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LookupTicket {
    seq: u64,
    identifier: String,
    strategy: LookupStrategy,
}

impl LookupTicket {
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn strategy(&self) -> LookupStrategy {
        self.strategy
    }
}

/// The current search result as the patient-data and confirmation steps see it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum LookupState {
    #[default]
    Idle,
    Loading {
        identifier: String,
    },
    Found {
        identifier: String,
        patient: PatientRecord,
    },
    NotFound {
        identifier: String,
        server_message: Option<String>,
    },
    Failed {
        identifier: String,
        detail: String,
    },
}

impl LookupState {
    pub fn is_loading(&self) -> bool {
        matches!(self, LookupState::Loading { .. })
    }

    /// The found patient, if the last completed lookup was for `identifier` and succeeded.
    pub fn found_for(&self, identifier: &str) -> Option<&PatientRecord> {
        match self {
            LookupState::Found {
                identifier: looked_up,
                patient,
            } if looked_up == identifier.trim() => Some(patient),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct PatientResolver {
    seq: u64,
    state: LookupState,
}

impl PatientResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &LookupState {
        &self.state
    }

    /// Start a lookup for `identifier`, superseding any lookup still in flight.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationIssue::LookupIdentifierTooShort`] when the trimmed identifier has
    /// fewer than three characters. The search state is left untouched in that case.
    pub fn begin(&mut self, identifier: &str) -> Result<LookupTicket, ValidationIssue> {
        let identifier = identifier.trim();
        if identifier.chars().count() < MIN_LOOKUP_IDENTIFIER_LEN {
            return Err(ValidationIssue::LookupIdentifierTooShort {
                min: MIN_LOOKUP_IDENTIFIER_LEN,
            });
        }

        self.seq += 1;
        let ticket = LookupTicket {
            seq: self.seq,
            identifier: identifier.to_string(),
            strategy: LookupStrategy::for_identifier(identifier),
        };
        self.state = LookupState::Loading {
            identifier: ticket.identifier.clone(),
        };

        tracing::debug!(
            "patient lookup #{} started for {} ({:?})",
            ticket.seq,
            mask_identifier(identifier),
            ticket.strategy
        );
        Ok(ticket)
    }

    /// Apply a lookup result. Returns `false` (and changes nothing) for a stale ticket.
    pub fn complete(
        &mut self,
        ticket: &LookupTicket,
        result: SimrsResult<PatientSearchOutcome>,
    ) -> bool {
        if ticket.seq != self.seq {
            tracing::warn!(
                "discarding stale patient lookup #{} for {} (current #{})",
                ticket.seq,
                mask_identifier(&ticket.identifier),
                self.seq
            );
            return false;
        }

        let identifier = ticket.identifier.clone();
        self.state = match result {
            Ok(PatientSearchOutcome::Found(patient)) => {
                tracing::info!("patient found for {}", mask_identifier(&identifier));
                LookupState::Found {
                    identifier,
                    patient,
                }
            }
            Ok(PatientSearchOutcome::NotFound { message }) => {
                tracing::info!("no patient for {}", mask_identifier(&identifier));
                LookupState::NotFound {
                    identifier,
                    server_message: message,
                }
            }
            Err(err) => {
                tracing::warn!(
                    "patient lookup for {} failed: {}",
                    mask_identifier(&identifier),
                    err
                );
                LookupState::Failed {
                    identifier,
                    detail: err.to_string(),
                }
            }
        };
        true
    }

    /// Clear the search state and orphan any lookup in flight.
    pub fn invalidate(&mut self) {
        self.seq += 1;
        self.state = LookupState::Idle;
    }

    /// Call the registry endpoint chosen for the ticket.
    pub async fn fetch<A: SimrsApi>(
        api: &A,
        ticket: &LookupTicket,
    ) -> SimrsResult<PatientSearchOutcome> {
        match ticket.strategy {
            LookupStrategy::MedicalRecord => api.search_patient_by_mr(&ticket.identifier).await,
            LookupStrategy::NationalId => api.search_patient_by_nik(&ticket.identifier).await,
        }
    }
}
