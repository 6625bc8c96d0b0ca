//! Per-step validation of the booking draft.
//!
//! Every check is local and synchronous: nothing here touches the network. The wizard calls
//! [`validate_step`] before advancing and [`validate_for_submission`] before submitting.
//!
//! | Step | Required |
//! |---|---|
//! | poli-selection | department chosen (and eligible, when an eligible list is known) |
//! | schedule | date and time slot |
//! | patient-data, RETURNING | medical-record number |
//! | patient-data, NEW | 16-digit NIK, name, phone (≥10 digits), birth date, gender, religion, responsible party |
//! | patient-data, both | complaint (≥10 chars trimmed), payment method |
//! | confirmation | all consents; insurance number and class for insurance payments |

use crate::constants::MIN_COMPLAINT_LEN;
use crate::context::WizardContext;
use crate::draft::{BookingDraft, DraftField, PatientType};
use crate::messages::{Locale, Message};
use crate::step::Step;
use booking_types::{Nik, PhoneNumber, TextError};
use simrs::PaymentMethod;
use std::fmt;

/// What is wrong with the draft.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationIssue {
    PoliRequired,
    PoliNotEligible,
    DateRequired,
    TimeSlotRequired,
    MrNumberRequired,
    LookupIdentifierTooShort { min: usize },
    PatientNotVerified,
    NikLength { actual: usize },
    NikNotNumeric,
    FullNameRequired,
    PhoneTooShort { actual: usize },
    PhoneInvalid,
    BirthDateRequired,
    GenderRequired,
    ReligionRequired,
    ResponsibleNameRequired,
    ResponsibleRelationshipRequired,
    ComplaintTooShort { actual: usize, min: usize },
    PaymentRequired,
    ConsentsRequired,
    InsuranceNumberRequired,
    InsuranceClassRequired,
}

impl ValidationIssue {
    /// The field the issue should be shown against.
    pub fn field(&self) -> DraftField {
        match self {
            ValidationIssue::PoliRequired | ValidationIssue::PoliNotEligible => DraftField::Poli,
            ValidationIssue::DateRequired => DraftField::ScheduleDate,
            ValidationIssue::TimeSlotRequired => DraftField::TimeSlot,
            ValidationIssue::MrNumberRequired
            | ValidationIssue::LookupIdentifierTooShort { .. }
            | ValidationIssue::PatientNotVerified => DraftField::MrNumber,
            ValidationIssue::NikLength { .. } | ValidationIssue::NikNotNumeric => DraftField::Nik,
            ValidationIssue::FullNameRequired => DraftField::FullName,
            ValidationIssue::PhoneTooShort { .. } | ValidationIssue::PhoneInvalid => {
                DraftField::Phone
            }
            ValidationIssue::BirthDateRequired => DraftField::BirthDate,
            ValidationIssue::GenderRequired => DraftField::Gender,
            ValidationIssue::ReligionRequired => DraftField::Religion,
            ValidationIssue::ResponsibleNameRequired => DraftField::ResponsibleName,
            ValidationIssue::ResponsibleRelationshipRequired => DraftField::ResponsibleRelationship,
            ValidationIssue::ComplaintTooShort { .. } => DraftField::Complaint,
            ValidationIssue::PaymentRequired => DraftField::Payment,
            ValidationIssue::ConsentsRequired => DraftField::ConsentTerms,
            ValidationIssue::InsuranceNumberRequired => DraftField::InsuranceNumber,
            ValidationIssue::InsuranceClassRequired => DraftField::InsuranceClass,
        }
    }
}

/// A failed check, tied to the step that raised it.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub struct ValidationError {
    pub step: Step,
    pub issue: ValidationIssue,
}

impl ValidationError {
    pub fn new(step: Step, issue: ValidationIssue) -> Self {
        Self { step, issue }
    }

    pub fn field(&self) -> DraftField {
        self.issue.field()
    }

    /// User-facing text in the given locale.
    pub fn message(&self, locale: Locale) -> String {
        Message::Validation(&self.issue).render(locale)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.step, self.message(Locale::En))
    }
}

/// True when `payment`'s label contains any insurance keyword (case-insensitive).
pub fn is_insurance_payment(payment: Option<&PaymentMethod>, keywords: &[String]) -> bool {
    let Some(payment) = payment else {
        return false;
    };
    let label = payment.label.to_uppercase();
    keywords
        .iter()
        .map(|k| k.trim().to_uppercase())
        .any(|k| !k.is_empty() && label.contains(&k))
}

/// Length of the complaint as the user sees it counted (trimmed, in characters).
pub fn complaint_len(complaint: &str) -> usize {
    complaint.trim().chars().count()
}

/// True when the submit action may be enabled.
pub fn can_submit(draft: &BookingDraft, insurance_keywords: &[String]) -> bool {
    validate_confirmation(draft, insurance_keywords).is_ok()
}

/// Check the fields owned by `step`.
///
/// # Errors
///
/// Returns the first [`ValidationError`] found, in table order.
pub fn validate_step(
    step: Step,
    draft: &BookingDraft,
    context: &WizardContext,
    insurance_keywords: &[String],
) -> Result<(), ValidationError> {
    let result = match step {
        Step::PoliSelection => validate_poli(draft, context),
        Step::Schedule => validate_schedule(draft),
        Step::PatientData => validate_patient_data(draft),
        Step::Confirmation => validate_confirmation(draft, insurance_keywords),
        Step::Success => Ok(()),
    };
    result.map_err(|issue| ValidationError::new(step, issue))
}

/// Check every step from poli-selection through confirmation.
pub fn validate_for_submission(
    draft: &BookingDraft,
    context: &WizardContext,
    insurance_keywords: &[String],
) -> Result<(), ValidationError> {
    [
        Step::PoliSelection,
        Step::Schedule,
        Step::PatientData,
        Step::Confirmation,
    ]
    .into_iter()
    .try_for_each(|step| validate_step(step, draft, context, insurance_keywords))
}

fn validate_poli(draft: &BookingDraft, context: &WizardContext) -> Result<(), ValidationIssue> {
    let Some(poli) = &draft.poli else {
        return Err(ValidationIssue::PoliRequired);
    };
    if !context.eligible_polis.is_empty()
        && !context.eligible_polis.iter().any(|p| p.code == poli.code)
    {
        return Err(ValidationIssue::PoliNotEligible);
    }
    Ok(())
}

fn validate_schedule(draft: &BookingDraft) -> Result<(), ValidationIssue> {
    if draft.schedule_date.is_none() {
        return Err(ValidationIssue::DateRequired);
    }
    if draft.time_slot.trim().is_empty() {
        return Err(ValidationIssue::TimeSlotRequired);
    }
    Ok(())
}

fn validate_patient_data(draft: &BookingDraft) -> Result<(), ValidationIssue> {
    match draft.patient_type {
        PatientType::Returning => {
            if draft.mr_number.trim().is_empty() {
                return Err(ValidationIssue::MrNumberRequired);
            }
        }
        PatientType::New => validate_new_patient(draft)?,
    }

    let actual = complaint_len(&draft.complaint);
    if actual < MIN_COMPLAINT_LEN {
        return Err(ValidationIssue::ComplaintTooShort {
            actual,
            min: MIN_COMPLAINT_LEN,
        });
    }

    if draft.payment.is_none() {
        return Err(ValidationIssue::PaymentRequired);
    }
    Ok(())
}

fn validate_new_patient(draft: &BookingDraft) -> Result<(), ValidationIssue> {
    match Nik::parse(&draft.nik) {
        Ok(_) => {}
        Err(TextError::NikNotNumeric) => return Err(ValidationIssue::NikNotNumeric),
        Err(_) => {
            return Err(ValidationIssue::NikLength {
                actual: draft.nik.trim().chars().count(),
            })
        }
    }

    if draft.full_name.trim().is_empty() {
        return Err(ValidationIssue::FullNameRequired);
    }

    match PhoneNumber::parse(&draft.phone) {
        Ok(_) => {}
        Err(TextError::PhoneInvalidCharacters) => return Err(ValidationIssue::PhoneInvalid),
        Err(_) => {
            return Err(ValidationIssue::PhoneTooShort {
                actual: PhoneNumber::count_digits(&draft.phone),
            })
        }
    }

    if draft.birth_date.is_none() {
        return Err(ValidationIssue::BirthDateRequired);
    }
    if draft.gender.is_none() {
        return Err(ValidationIssue::GenderRequired);
    }
    if draft.religion.trim().is_empty() {
        return Err(ValidationIssue::ReligionRequired);
    }
    if draft.responsible_name.trim().is_empty() {
        return Err(ValidationIssue::ResponsibleNameRequired);
    }
    if draft.responsible_relationship.trim().is_empty() {
        return Err(ValidationIssue::ResponsibleRelationshipRequired);
    }
    Ok(())
}

fn validate_confirmation(
    draft: &BookingDraft,
    insurance_keywords: &[String],
) -> Result<(), ValidationIssue> {
    if !draft.consents.all() {
        return Err(ValidationIssue::ConsentsRequired);
    }
    if is_insurance_payment(draft.payment.as_ref(), insurance_keywords) {
        if draft.insurance_number.trim().is_empty() {
            return Err(ValidationIssue::InsuranceNumberRequired);
        }
        if draft.insurance_class.trim().is_empty() {
            return Err(ValidationIssue::InsuranceClassRequired);
        }
    }
    Ok(())
}
