//! Shared test fixtures: a scripted SIMRS fake and ready-made drafts.

use crate::constants::DEFAULT_INSURANCE_KEYWORDS;
use crate::draft::{BookingDraft, PatientType};
use booking_types::MedicalRecordNumber;
use chrono::NaiveDate;
use simrs::{
    BookingConfirmation, BookingRequest, Gender, PatientRecord, PatientSearchOutcome,
    PaymentMethod, Poli, SimrsApi, SimrsError, SimrsResult,
};
use std::collections::VecDeque;
use std::sync::Mutex;

/// A scripted response.
pub(crate) enum Scripted<T> {
    Ok(T),
    Status(u16, Option<String>),
    Translation(String),
}

impl<T> Scripted<T> {
    fn into_result(self) -> SimrsResult<T> {
        match self {
            Scripted::Ok(value) => Ok(value),
            Scripted::Status(status, message) => Err(SimrsError::Status { status, message }),
            Scripted::Translation(detail) => Err(SimrsError::Translation(detail)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ApiCall {
    SearchByMr(String),
    SearchByNik(String),
    CreateAppointment { request_id: String },
    ListPolis,
    ListPaymentMethods,
}

/// In-memory [`SimrsApi`]. An empty search queue answers "not found"; an empty booking queue
/// answers HTTP 500.
#[derive(Default)]
pub(crate) struct FakeSimrs {
    searches: Mutex<VecDeque<Scripted<PatientSearchOutcome>>>,
    bookings: Mutex<VecDeque<Scripted<BookingConfirmation>>>,
    calls: Mutex<Vec<ApiCall>>,
    requests: Mutex<Vec<BookingRequest>>,
}

impl FakeSimrs {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_search(&self, response: Scripted<PatientSearchOutcome>) {
        self.searches.lock().expect("searches lock").push_back(response);
    }

    pub(crate) fn push_booking(&self, response: Scripted<BookingConfirmation>) {
        self.bookings.lock().expect("bookings lock").push_back(response);
    }

    pub(crate) fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub(crate) fn requests(&self) -> Vec<BookingRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    fn record(&self, call: ApiCall) {
        self.calls.lock().expect("calls lock").push(call);
    }

    fn next_search(&self) -> SimrsResult<PatientSearchOutcome> {
        self.searches
            .lock()
            .expect("searches lock")
            .pop_front()
            .map_or(
                Ok(PatientSearchOutcome::NotFound { message: None }),
                Scripted::into_result,
            )
    }
}

impl SimrsApi for FakeSimrs {
    async fn search_patient_by_mr(&self, mr_number: &str) -> SimrsResult<PatientSearchOutcome> {
        self.record(ApiCall::SearchByMr(mr_number.to_string()));
        self.next_search()
    }

    async fn search_patient_by_nik(&self, nik: &str) -> SimrsResult<PatientSearchOutcome> {
        self.record(ApiCall::SearchByNik(nik.to_string()));
        self.next_search()
    }

    async fn create_appointment(
        &self,
        request: &BookingRequest,
        request_id: &str,
    ) -> SimrsResult<BookingConfirmation> {
        self.record(ApiCall::CreateAppointment {
            request_id: request_id.to_string(),
        });
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());
        self.bookings
            .lock()
            .expect("bookings lock")
            .pop_front()
            .map_or(
                Err(SimrsError::Status {
                    status: 500,
                    message: None,
                }),
                Scripted::into_result,
            )
    }

    async fn list_polis(&self) -> SimrsResult<Vec<Poli>> {
        self.record(ApiCall::ListPolis);
        Ok(vec![poli("INT", "Penyakit Dalam"), poli("ANA", "Anak")])
    }

    async fn list_payment_methods(&self) -> SimrsResult<Vec<PaymentMethod>> {
        self.record(ApiCall::ListPaymentMethods);
        Ok(vec![
            payment("UMU", "UMUM/TUNAI"),
            payment("BPJ", "BPJS KESEHATAN"),
        ])
    }
}

pub(crate) fn default_keywords() -> Vec<String> {
    DEFAULT_INSURANCE_KEYWORDS
        .iter()
        .map(|k| (*k).to_string())
        .collect()
}

pub(crate) fn poli(code: &str, name: &str) -> Poli {
    Poli {
        code: code.into(),
        name: name.into(),
    }
}

pub(crate) fn payment(code: &str, label: &str) -> PaymentMethod {
    PaymentMethod {
        code: code.into(),
        label: label.into(),
    }
}

pub(crate) fn patient_record(mr_number: &str) -> PatientRecord {
    PatientRecord {
        mr_number: MedicalRecordNumber::parse(mr_number).expect("valid rm"),
        nik: Some("3171234567890123".into()),
        full_name: "SITI AMINAH".into(),
        gender: Some(Gender::Female),
        birth_date: NaiveDate::from_ymd_opt(1988, 4, 12),
        phone: Some("081234567890".into()),
        address: Some("JL. MAWAR NO. 5, JAKARTA".into()),
        email: None,
        insurance_number: None,
        religion: Some("ISLAM".into()),
    }
}

/// A RETURNING draft that passes every step except confirmation (no consents) and has no
/// identity fields filled in yet.
pub(crate) fn returning_draft() -> BookingDraft {
    BookingDraft {
        poli: Some(poli("INT", "Penyakit Dalam")),
        schedule_date: NaiveDate::from_ymd_opt(2026, 11, 2),
        time_slot: "08:00-09:00".into(),
        patient_type: PatientType::Returning,
        mr_number: "000123".into(),
        complaint: "Demam tiga hari".into(),
        payment: Some(payment("UMU", "UMUM/TUNAI")),
        ..BookingDraft::default()
    }
}

/// A NEW-patient draft that passes every step except confirmation (no consents).
pub(crate) fn new_patient_draft() -> BookingDraft {
    BookingDraft {
        poli: Some(poli("INT", "Penyakit Dalam")),
        schedule_date: NaiveDate::from_ymd_opt(2026, 11, 2),
        time_slot: "08:00-09:00".into(),
        patient_type: PatientType::New,
        nik: "3171234567890123".into(),
        full_name: "Siti Aminah".into(),
        birth_date: NaiveDate::from_ymd_opt(1988, 4, 12),
        gender: Some(Gender::Female),
        religion: "Islam".into(),
        phone: "0812-3456-7890".into(),
        complaint: "Batuk dan pilek seminggu".into(),
        payment: Some(payment("UMU", "UMUM/TUNAI")),
        responsible_name: "Ahmad Fauzi".into(),
        responsible_relationship: "Suami".into(),
        ..BookingDraft::default()
    }
}
