//! Turning a validated draft into a SIMRS booking request, and classifying the outcome.

use crate::context::WizardContext;
use crate::draft::{BookingDraft, PatientType};
use crate::messages::{Locale, Message};
use crate::step::Step;
use crate::validation::{
    is_insurance_payment, validate_for_submission, ValidationError, ValidationIssue,
};
use crate::{BookingError, BookingResult};
use booking_types::{mask_identifier, Nik, PhoneNumber};
use simrs::{
    BookingConfirmation, BookingRequest, InsurancePayload, NewPatientPayload, PatientPayload,
    PatientRecord, ReturningPatientPayload, SimrsApi, SimrsError,
};

/// How a failed submission should be reported.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmissionFailure {
    /// HTTP 429.
    RateLimited,
    /// A 4xx carrying a server message, shown verbatim.
    Rejected { status: u16, message: String },
    /// Anything else.
    Failed { detail: String },
}

impl SubmissionFailure {
    pub fn message(&self, locale: Locale) -> String {
        match self {
            SubmissionFailure::RateLimited => Message::SubmissionRateLimited.render(locale),
            SubmissionFailure::Rejected { message, .. } => {
                Message::SubmissionRejected { server: message }.render(locale)
            }
            SubmissionFailure::Failed { .. } => Message::SubmissionFailed.render(locale),
        }
    }

    pub fn into_error(self, locale: Locale) -> BookingError {
        let message = self.message(locale);
        match self {
            SubmissionFailure::RateLimited => BookingError::SubmissionRateLimited { message },
            SubmissionFailure::Rejected { status, .. } => {
                BookingError::SubmissionRejected { status, message }
            }
            SubmissionFailure::Failed { .. } => BookingError::SubmissionFailed { message },
        }
    }
}

/// Builds and sends booking requests.
pub struct SubmissionClient;

impl SubmissionClient {
    /// Build the request body for `draft`.
    ///
    /// RETURNING patients are sent by the medical-record number of `verified_patient`, which
    /// must be the record found for the draft's identifier. NEW patients send the full
    /// demographic set. Insurance fields are attached only for insurance payments.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] if the draft does not pass every step's checks, or
    /// a RETURNING draft has no verified patient.
    pub fn build_request(
        draft: &BookingDraft,
        context: &WizardContext,
        verified_patient: Option<&PatientRecord>,
        insurance_keywords: &[String],
    ) -> BookingResult<BookingRequest> {
        validate_for_submission(draft, context, insurance_keywords)?;

        let invalid = |step: Step, issue: ValidationIssue| {
            BookingError::Validation(ValidationError::new(step, issue))
        };

        let poli = draft
            .poli
            .as_ref()
            .ok_or_else(|| invalid(Step::PoliSelection, ValidationIssue::PoliRequired))?;
        let appointment_date = draft
            .schedule_date
            .ok_or_else(|| invalid(Step::Schedule, ValidationIssue::DateRequired))?;
        let payment = draft
            .payment
            .as_ref()
            .ok_or_else(|| invalid(Step::PatientData, ValidationIssue::PaymentRequired))?;

        let patient = match draft.patient_type {
            PatientType::Returning => {
                let record = verified_patient.ok_or_else(|| {
                    invalid(Step::PatientData, ValidationIssue::PatientNotVerified)
                })?;
                PatientPayload::Returning(ReturningPatientPayload {
                    mr_number: record.mr_number.to_string(),
                })
            }
            PatientType::New => PatientPayload::New(Self::new_patient_payload(draft)?),
        };

        let insurance = is_insurance_payment(Some(payment), insurance_keywords).then(|| {
            InsurancePayload {
                insurance_number: draft.insurance_number.trim().to_string(),
                insurance_class: draft.insurance_class.trim().to_string(),
                referral_number: optional_text(&draft.referral_number),
            }
        });

        Ok(BookingRequest {
            service_type: context.service.as_str().to_string(),
            provider_id: context.provider_id.clone(),
            poli_code: poli.code.clone(),
            appointment_date,
            appointment_time: draft.time_slot.trim().to_string(),
            patient,
            payment_method: payment.code.clone(),
            complaint: draft.complaint.trim().to_string(),
            insurance,
        })
    }

    fn new_patient_payload(draft: &BookingDraft) -> BookingResult<NewPatientPayload> {
        let invalid = |issue: ValidationIssue| {
            BookingError::Validation(ValidationError::new(Step::PatientData, issue))
        };

        let nik = Nik::parse(&draft.nik).map_err(|_| {
            invalid(ValidationIssue::NikLength {
                actual: draft.nik.trim().chars().count(),
            })
        })?;
        let phone =
            PhoneNumber::parse(&draft.phone).map_err(|_| invalid(ValidationIssue::PhoneInvalid))?;
        let birth_date = draft
            .birth_date
            .ok_or_else(|| invalid(ValidationIssue::BirthDateRequired))?;
        let gender = draft
            .gender
            .ok_or_else(|| invalid(ValidationIssue::GenderRequired))?;

        Ok(NewPatientPayload {
            nik: nik.to_string(),
            name: draft.full_name.trim().to_string(),
            birth_date,
            gender,
            religion: draft.religion.trim().to_string(),
            phone: phone.to_string(),
            email: optional_text(&draft.email),
            address: optional_text(&draft.address),
            responsible_name: draft.responsible_name.trim().to_string(),
            responsible_relationship: draft.responsible_relationship.trim().to_string(),
        })
    }

    /// Send `request`. No retry is attempted.
    pub async fn submit<A: SimrsApi>(
        api: &A,
        request: &BookingRequest,
        request_id: &str,
    ) -> Result<BookingConfirmation, SubmissionFailure> {
        let who = match &request.patient {
            PatientPayload::Returning(p) => format!("RM {}", mask_identifier(&p.mr_number)),
            PatientPayload::New(p) => format!("new patient NIK {}", mask_identifier(&p.nik)),
        };
        tracing::info!(
            "submitting {} booking at poli {} for {} (request {})",
            request.service_type,
            request.poli_code,
            who,
            request_id
        );

        match api.create_appointment(request, request_id).await {
            Ok(confirmation) => {
                tracing::info!(
                    "booking {} created (request {})",
                    confirmation.booking_code,
                    request_id
                );
                Ok(confirmation)
            }
            Err(err) => {
                let failure = Self::classify(&err);
                match &failure {
                    SubmissionFailure::Failed { .. } => {
                        tracing::error!("booking request {} failed: {}", request_id, err)
                    }
                    _ => tracing::warn!("booking request {} refused: {}", request_id, err),
                }
                Err(failure)
            }
        }
    }

    /// Map a SIMRS error onto the three user-facing failure kinds.
    pub fn classify(err: &SimrsError) -> SubmissionFailure {
        match err {
            SimrsError::Status { status: 429, .. } => SubmissionFailure::RateLimited,
            SimrsError::Status {
                status,
                message: Some(message),
            } if (400..500).contains(status) && !message.trim().is_empty() => {
                SubmissionFailure::Rejected {
                    status: *status,
                    message: message.trim().to_string(),
                }
            }
            other => SubmissionFailure::Failed {
                detail: other.to_string(),
            },
        }
    }
}

fn optional_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
