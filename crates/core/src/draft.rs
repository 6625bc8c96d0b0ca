//! The in-progress booking draft and the form state wrapped around it.
//!
//! All user changes go through [`FormState::apply`] with a [`DraftEdit`], which records the
//! field as manually edited. Auto-fill from a found patient ([`FormState::autofill`]) only
//! writes identity fields the user has not touched, so a later lookup never clobbers typed
//! input.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use simrs::{Gender, PatientRecord, PaymentMethod, Poli};
use std::collections::HashSet;

/// Which set of identity fields is mandatory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatientType {
    #[default]
    New,
    Returning,
}

/// The three acknowledgements required before submission. Never persisted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Consents {
    pub terms: bool,
    pub privacy: bool,
    pub fee: bool,
}

impl Consents {
    pub fn all(&self) -> bool {
        self.terms && self.privacy && self.fee
    }
}

/// The booking draft as the user fills it in.
///
/// Text fields are kept as entered (empty string when unset); typed validation happens per
/// step in [`crate::validation`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookingDraft {
    pub poli: Option<Poli>,
    pub schedule_date: Option<NaiveDate>,
    pub time_slot: String,

    pub patient_type: PatientType,
    /// RETURNING: the lookup identifier (medical-record number, or a NIK).
    pub mr_number: String,

    pub nik: String,
    pub full_name: String,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub religion: String,
    pub phone: String,
    pub email: String,
    pub address: String,

    pub payment: Option<PaymentMethod>,
    pub insurance_number: String,
    pub insurance_class: String,
    pub referral_number: String,

    pub complaint: String,

    pub responsible_name: String,
    pub responsible_relationship: String,

    pub consents: Consents,
}

impl BookingDraft {
    /// A copy safe to persist: consent flags are zeroed.
    pub fn without_consents(&self) -> Self {
        Self {
            consents: Consents::default(),
            ..self.clone()
        }
    }

    /// The draft expressed as one edit per field, for entering a whole draft as user input.
    pub fn into_edits(self) -> Vec<DraftEdit> {
        vec![
            DraftEdit::Poli(self.poli),
            DraftEdit::ScheduleDate(self.schedule_date),
            DraftEdit::TimeSlot(self.time_slot),
            DraftEdit::PatientType(self.patient_type),
            DraftEdit::MrNumber(self.mr_number),
            DraftEdit::Nik(self.nik),
            DraftEdit::FullName(self.full_name),
            DraftEdit::BirthDate(self.birth_date),
            DraftEdit::Gender(self.gender),
            DraftEdit::Religion(self.religion),
            DraftEdit::Phone(self.phone),
            DraftEdit::Email(self.email),
            DraftEdit::Address(self.address),
            DraftEdit::Payment(self.payment),
            DraftEdit::InsuranceNumber(self.insurance_number),
            DraftEdit::InsuranceClass(self.insurance_class),
            DraftEdit::ReferralNumber(self.referral_number),
            DraftEdit::Complaint(self.complaint),
            DraftEdit::ResponsibleName(self.responsible_name),
            DraftEdit::ResponsibleRelationship(self.responsible_relationship),
            DraftEdit::ConsentTerms(self.consents.terms),
            DraftEdit::ConsentPrivacy(self.consents.privacy),
            DraftEdit::ConsentFee(self.consents.fee),
        ]
    }
}

/// Every editable field of a [`BookingDraft`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DraftField {
    Poli,
    ScheduleDate,
    TimeSlot,
    PatientType,
    MrNumber,
    Nik,
    FullName,
    BirthDate,
    Gender,
    Religion,
    Phone,
    Email,
    Address,
    Payment,
    InsuranceNumber,
    InsuranceClass,
    ReferralNumber,
    Complaint,
    ResponsibleName,
    ResponsibleRelationship,
    ConsentTerms,
    ConsentPrivacy,
    ConsentFee,
}

impl DraftField {
    pub fn is_consent(self) -> bool {
        matches!(
            self,
            DraftField::ConsentTerms | DraftField::ConsentPrivacy | DraftField::ConsentFee
        )
    }
}

/// A single user change to the draft.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DraftEdit {
    Poli(Option<Poli>),
    ScheduleDate(Option<NaiveDate>),
    TimeSlot(String),
    PatientType(PatientType),
    MrNumber(String),
    Nik(String),
    FullName(String),
    BirthDate(Option<NaiveDate>),
    Gender(Option<Gender>),
    Religion(String),
    Phone(String),
    Email(String),
    Address(String),
    Payment(Option<PaymentMethod>),
    InsuranceNumber(String),
    InsuranceClass(String),
    ReferralNumber(String),
    Complaint(String),
    ResponsibleName(String),
    ResponsibleRelationship(String),
    ConsentTerms(bool),
    ConsentPrivacy(bool),
    ConsentFee(bool),
}

impl DraftEdit {
    /// True when the edit empties its field. Patient type is never blank.
    pub fn is_blank(&self) -> bool {
        match self {
            DraftEdit::Poli(v) => v.is_none(),
            DraftEdit::ScheduleDate(v) | DraftEdit::BirthDate(v) => v.is_none(),
            DraftEdit::Gender(v) => v.is_none(),
            DraftEdit::Payment(v) => v.is_none(),
            DraftEdit::PatientType(_) => false,
            DraftEdit::ConsentTerms(v) | DraftEdit::ConsentPrivacy(v) | DraftEdit::ConsentFee(v) => {
                !v
            }
            DraftEdit::TimeSlot(v)
            | DraftEdit::MrNumber(v)
            | DraftEdit::Nik(v)
            | DraftEdit::FullName(v)
            | DraftEdit::Religion(v)
            | DraftEdit::Phone(v)
            | DraftEdit::Email(v)
            | DraftEdit::Address(v)
            | DraftEdit::InsuranceNumber(v)
            | DraftEdit::InsuranceClass(v)
            | DraftEdit::ReferralNumber(v)
            | DraftEdit::Complaint(v)
            | DraftEdit::ResponsibleName(v)
            | DraftEdit::ResponsibleRelationship(v) => v.trim().is_empty(),
        }
    }

    pub fn field(&self) -> DraftField {
        match self {
            DraftEdit::Poli(_) => DraftField::Poli,
            DraftEdit::ScheduleDate(_) => DraftField::ScheduleDate,
            DraftEdit::TimeSlot(_) => DraftField::TimeSlot,
            DraftEdit::PatientType(_) => DraftField::PatientType,
            DraftEdit::MrNumber(_) => DraftField::MrNumber,
            DraftEdit::Nik(_) => DraftField::Nik,
            DraftEdit::FullName(_) => DraftField::FullName,
            DraftEdit::BirthDate(_) => DraftField::BirthDate,
            DraftEdit::Gender(_) => DraftField::Gender,
            DraftEdit::Religion(_) => DraftField::Religion,
            DraftEdit::Phone(_) => DraftField::Phone,
            DraftEdit::Email(_) => DraftField::Email,
            DraftEdit::Address(_) => DraftField::Address,
            DraftEdit::Payment(_) => DraftField::Payment,
            DraftEdit::InsuranceNumber(_) => DraftField::InsuranceNumber,
            DraftEdit::InsuranceClass(_) => DraftField::InsuranceClass,
            DraftEdit::ReferralNumber(_) => DraftField::ReferralNumber,
            DraftEdit::Complaint(_) => DraftField::Complaint,
            DraftEdit::ResponsibleName(_) => DraftField::ResponsibleName,
            DraftEdit::ResponsibleRelationship(_) => DraftField::ResponsibleRelationship,
            DraftEdit::ConsentTerms(_) => DraftField::ConsentTerms,
            DraftEdit::ConsentPrivacy(_) => DraftField::ConsentPrivacy,
            DraftEdit::ConsentFee(_) => DraftField::ConsentFee,
        }
    }
}

/// The draft plus per-session bookkeeping of who wrote each field.
#[derive(Clone, Debug, Default)]
pub struct FormState {
    draft: BookingDraft,
    edited: HashSet<DraftField>,
    autofilled: HashSet<DraftField>,
}

impl FormState {
    pub fn new(draft: BookingDraft) -> Self {
        Self {
            draft,
            edited: HashSet::new(),
            autofilled: HashSet::new(),
        }
    }

    pub fn draft(&self) -> &BookingDraft {
        &self.draft
    }

    pub fn is_edited(&self, field: DraftField) -> bool {
        self.edited.contains(&field)
    }

    /// Replace the draft wholesale and forget edit history.
    pub fn reset(&mut self, draft: BookingDraft) {
        *self = Self::new(draft);
    }

    /// Apply a user edit. Returns the field that changed.
    ///
    /// Only non-empty values count as manual edits; an empty value leaves the field open to
    /// auto-fill.
    pub fn apply(&mut self, edit: DraftEdit) -> DraftField {
        let field = edit.field();
        let blank = edit.is_blank();
        let d = &mut self.draft;

        match edit {
            DraftEdit::Poli(v) => d.poli = v,
            DraftEdit::ScheduleDate(v) => d.schedule_date = v,
            DraftEdit::TimeSlot(v) => d.time_slot = v,
            DraftEdit::PatientType(v) => d.patient_type = v,
            DraftEdit::MrNumber(v) => d.mr_number = v,
            DraftEdit::Nik(v) => d.nik = v,
            DraftEdit::FullName(v) => d.full_name = v,
            DraftEdit::BirthDate(v) => d.birth_date = v,
            DraftEdit::Gender(v) => d.gender = v,
            DraftEdit::Religion(v) => d.religion = v,
            DraftEdit::Phone(v) => d.phone = v,
            DraftEdit::Email(v) => d.email = v,
            DraftEdit::Address(v) => d.address = v,
            DraftEdit::Payment(v) => d.payment = v,
            DraftEdit::InsuranceNumber(v) => d.insurance_number = v,
            DraftEdit::InsuranceClass(v) => d.insurance_class = v,
            DraftEdit::ReferralNumber(v) => d.referral_number = v,
            DraftEdit::Complaint(v) => d.complaint = v,
            DraftEdit::ResponsibleName(v) => d.responsible_name = v,
            DraftEdit::ResponsibleRelationship(v) => d.responsible_relationship = v,
            DraftEdit::ConsentTerms(v) => d.consents.terms = v,
            DraftEdit::ConsentPrivacy(v) => d.consents.privacy = v,
            DraftEdit::ConsentFee(v) => d.consents.fee = v,
        }

        // Clearing a field hands it back to auto-fill.
        if blank {
            self.edited.remove(&field);
        } else {
            self.edited.insert(field);
        }
        self.autofilled.remove(&field);
        field
    }

    /// Fill identity fields from a registry record.
    ///
    /// A field is written when the user has not edited it this session and it is either empty
    /// or holds a value from an earlier auto-fill. Returns the fields that were written.
    pub fn autofill(&mut self, patient: &PatientRecord) -> Vec<DraftField> {
        let mut filled = Vec::new();

        self.fill_text(DraftField::FullName, Some(&patient.full_name), &mut filled);
        self.fill_text(DraftField::Nik, patient.nik.as_deref(), &mut filled);
        self.fill_text(DraftField::Phone, patient.phone.as_deref(), &mut filled);
        self.fill_text(DraftField::Email, patient.email.as_deref(), &mut filled);
        self.fill_text(DraftField::Address, patient.address.as_deref(), &mut filled);
        self.fill_text(DraftField::Religion, patient.religion.as_deref(), &mut filled);
        self.fill_text(
            DraftField::InsuranceNumber,
            patient.insurance_number.as_deref(),
            &mut filled,
        );

        if let Some(birth_date) = patient.birth_date {
            if self.may_fill(DraftField::BirthDate, self.draft.birth_date.is_none()) {
                self.draft.birth_date = Some(birth_date);
                self.autofilled.insert(DraftField::BirthDate);
                filled.push(DraftField::BirthDate);
            }
        }
        if let Some(gender) = patient.gender {
            if self.may_fill(DraftField::Gender, self.draft.gender.is_none()) {
                self.draft.gender = Some(gender);
                self.autofilled.insert(DraftField::Gender);
                filled.push(DraftField::Gender);
            }
        }

        filled
    }

    fn may_fill(&self, field: DraftField, is_empty: bool) -> bool {
        !self.edited.contains(&field) && (is_empty || self.autofilled.contains(&field))
    }

    fn fill_text(&mut self, field: DraftField, value: Option<&str>, filled: &mut Vec<DraftField>) {
        let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return;
        };

        let is_empty = self.text_mut(field).map_or(false, |t| t.trim().is_empty());
        if !self.may_fill(field, is_empty) {
            return;
        }

        if let Some(slot) = self.text_mut(field) {
            *slot = value.to_string();
            self.autofilled.insert(field);
            filled.push(field);
        }
    }

    fn text_mut(&mut self, field: DraftField) -> Option<&mut String> {
        let d = &mut self.draft;
        match field {
            DraftField::TimeSlot => Some(&mut d.time_slot),
            DraftField::MrNumber => Some(&mut d.mr_number),
            DraftField::Nik => Some(&mut d.nik),
            DraftField::FullName => Some(&mut d.full_name),
            DraftField::Religion => Some(&mut d.religion),
            DraftField::Phone => Some(&mut d.phone),
            DraftField::Email => Some(&mut d.email),
            DraftField::Address => Some(&mut d.address),
            DraftField::InsuranceNumber => Some(&mut d.insurance_number),
            DraftField::InsuranceClass => Some(&mut d.insurance_class),
            DraftField::ReferralNumber => Some(&mut d.referral_number),
            DraftField::Complaint => Some(&mut d.complaint),
            DraftField::ResponsibleName => Some(&mut d.responsible_name),
            DraftField::ResponsibleRelationship => Some(&mut d.responsible_relationship),
            _ => None,
        }
    }
}
