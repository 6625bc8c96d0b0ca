//! # Booking Core
//!
//! Core logic for the SIMRS appointment, MCU and laboratory booking wizard.
//!
//! This crate holds the booking session and everything it needs:
//! - the in-progress draft and manual-edit tracking ([`draft`])
//! - the linear step machine ([`step`]) and per-step validation ([`validation`])
//! - patient lookup with stale-response discarding ([`resolver`])
//! - best-effort draft persistence behind a key-value store ([`persistence`])
//! - request building and outcome classification ([`submission`])
//! - the [`BookingWizard`] that ties them together ([`wizard`])
//!
//! **No transport concerns**: HTTP and wire formats belong in the `simrs` crate. Configuration
//! is resolved by the host at startup and passed in as a [`BookingConfig`].

pub mod config;
pub mod constants;
pub mod context;
pub mod draft;
pub mod error;
pub mod messages;
pub mod persistence;
pub mod resolver;
pub mod step;
pub mod submission;
pub mod validation;
pub mod wizard;

#[cfg(test)]
mod test_support;

pub use config::BookingConfig;
pub use context::{
    eligible_polis_for, AuthenticatedPatient, ServiceKind, SessionContext, WizardContext,
};
pub use draft::{BookingDraft, Consents, DraftEdit, DraftField, FormState, PatientType};
pub use error::{BookingError, BookingResult};
pub use messages::{Locale, Message, Notification, NotificationLevel};
pub use persistence::{DraftPersistence, DraftStore, FileDraftStore, MemoryDraftStore};
pub use resolver::{LookupState, LookupStrategy, LookupTicket, PatientResolver};
pub use step::{Step, StepEvent};
pub use submission::{SubmissionClient, SubmissionFailure};
pub use validation::{ValidationError, ValidationIssue};
pub use wizard::BookingWizard;
