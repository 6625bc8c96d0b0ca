//! Booking submission wire models (`POST /appointments`).
//!
//! The request body is camelCase JSON, internally tagged by `patientType`:
//! - `returning` sends only the medical-record number (`noRM`)
//! - `new` sends the full demographic set plus the responsible party
//!
//! Insurance fields are flattened into the body only when present.

use crate::patient::Gender;
use crate::{clean_text, parse_wire, SimrsError, SimrsResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// Request
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    /// `appointment`, `mcu` or `lab`.
    pub service_type: String,
    /// Doctor or provider identity the booking targets.
    pub provider_id: String,
    pub poli_code: String,
    pub appointment_date: NaiveDate,
    pub appointment_time: String,
    #[serde(flatten)]
    pub patient: PatientPayload,
    /// `kd_pj` of the selected payment method.
    pub payment_method: String,
    pub complaint: String,
    #[serde(flatten)]
    pub insurance: Option<InsurancePayload>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "patientType", rename_all = "lowercase")]
pub enum PatientPayload {
    Returning(ReturningPatientPayload),
    New(NewPatientPayload),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReturningPatientPayload {
    #[serde(rename = "noRM")]
    pub mr_number: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPatientPayload {
    pub nik: String,
    pub name: String,
    pub birth_date: NaiveDate,
    pub gender: Gender,
    pub religion: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub responsible_name: String,
    pub responsible_relationship: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsurancePayload {
    pub insurance_number: String,
    pub insurance_class: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral_number: Option<String>,
}

// ============================================================================
// Response
// ============================================================================

/// Server acknowledgement of a created booking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookingConfirmation {
    pub booking_code: String,
    pub message: Option<String>,
    /// True when the server registered a new patient as part of this booking.
    pub is_new_patient: bool,
    /// Medical-record number assigned to a newly registered patient.
    pub new_mr_number: Option<String>,
}

/// Booking response operations.
pub struct Booking;

impl Booking {
    /// Parse a success response body.
    ///
    /// # Errors
    ///
    /// Returns [`SimrsError::Translation`] on schema mismatch or an empty booking code.
    pub fn parse_confirmation(body: &str) -> SimrsResult<BookingConfirmation> {
        let wire: ConfirmationWire = parse_wire(body, "booking response")?;

        let booking_code = wire.booking_code.trim().to_string();
        if booking_code.is_empty() {
            return Err(SimrsError::Translation(
                "booking response has an empty bookingCode".into(),
            ));
        }

        Ok(BookingConfirmation {
            booking_code,
            message: clean_text(wire.message),
            is_new_patient: wire.is_new_patient.unwrap_or(false),
            new_mr_number: clean_text(wire.no_rm),
        })
    }

    /// Extract the human-readable message from an error response body, if it has one.
    ///
    /// Accepts `{ "message": ".." }` or `{ "error": ".." }`; anything else yields `None`.
    pub fn error_message(body: &str) -> Option<String> {
        let wire: ErrorWire = serde_json::from_str(body).ok()?;
        clean_text(wire.message).or_else(|| clean_text(wire.error))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmationWire {
    booking_code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    is_new_patient: Option<bool>,
    #[serde(default, rename = "noRM")]
    no_rm: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorWire {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_request(patient: PatientPayload, insurance: Option<InsurancePayload>) -> BookingRequest {
        BookingRequest {
            service_type: "appointment".into(),
            provider_id: "dr-042".into(),
            poli_code: "INT".into(),
            appointment_date: NaiveDate::from_ymd_opt(2026, 11, 2).expect("valid date"),
            appointment_time: "08:00-09:00".into(),
            patient,
            payment_method: "UMU".into(),
            complaint: "Demam tiga hari".into(),
            insurance,
        }
    }

    #[test]
    fn returning_payload_carries_only_mr_number() {
        let request = base_request(
            PatientPayload::Returning(ReturningPatientPayload {
                mr_number: "000123".into(),
            }),
            None,
        );
        let value = serde_json::to_value(&request).expect("serialise");
        assert_eq!(value["patientType"], json!("returning"));
        assert_eq!(value["noRM"], json!("000123"));
        assert_eq!(value["appointmentDate"], json!("2026-11-02"));
        assert!(value.get("nik").is_none());
        assert!(value.get("insuranceNumber").is_none());
    }

    #[test]
    fn new_payload_carries_demographics_and_insurance() {
        let request = base_request(
            PatientPayload::New(NewPatientPayload {
                nik: "3171234567890123".into(),
                name: "Budi Santoso".into(),
                birth_date: NaiveDate::from_ymd_opt(1990, 5, 1).expect("valid date"),
                gender: Gender::Male,
                religion: "ISLAM".into(),
                phone: "081234567890".into(),
                email: None,
                address: Some("Jl. Melati 3".into()),
                responsible_name: "Sri".into(),
                responsible_relationship: "ISTRI".into(),
            }),
            Some(InsurancePayload {
                insurance_number: "0001234567891".into(),
                insurance_class: "2".into(),
                referral_number: None,
            }),
        );
        let value = serde_json::to_value(&request).expect("serialise");
        assert_eq!(value["patientType"], json!("new"));
        assert_eq!(value["gender"], json!("L"));
        assert_eq!(value["responsibleRelationship"], json!("ISTRI"));
        assert_eq!(value["insuranceNumber"], json!("0001234567891"));
        assert!(value.get("email").is_none());
        assert!(value.get("referralNumber").is_none());
        assert!(value.get("noRM").is_none());
    }

    #[test]
    fn parses_confirmation_for_new_patient() {
        let body = r#"{"bookingCode":"BK-20261102-0007","message":"Berhasil","isNewPatient":true,"noRM":"000987"}"#;
        let confirmation = Booking::parse_confirmation(body).expect("parse");
        assert_eq!(confirmation.booking_code, "BK-20261102-0007");
        assert!(confirmation.is_new_patient);
        assert_eq!(confirmation.new_mr_number.as_deref(), Some("000987"));
    }

    #[test]
    fn rejects_missing_booking_code() {
        let err = Booking::parse_confirmation(r#"{"message":"ok"}"#).expect_err("missing code");
        assert!(err.to_string().contains("bookingCode"));

        let err = Booking::parse_confirmation(r#"{"bookingCode":"  "}"#).expect_err("empty code");
        assert!(matches!(err, SimrsError::Translation(_)));
    }

    #[test]
    fn extracts_error_messages() {
        assert_eq!(
            Booking::error_message(r#"{"message":"Kuota poli penuh"}"#).as_deref(),
            Some("Kuota poli penuh")
        );
        assert_eq!(
            Booking::error_message(r#"{"error":"NIK sudah terdaftar"}"#).as_deref(),
            Some("NIK sudah terdaftar")
        );
        assert_eq!(Booking::error_message("<html>502</html>"), None);
    }
}
