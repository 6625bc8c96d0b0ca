//! Patient search wire models and translation helpers.
//!
//! Responsibilities:
//! - Define the domain-level [`PatientRecord`] handed to the booking wizard
//! - Define the wire model of `GET /appointments/search-patient{,-nik}/{id}` responses
//! - Translate SIMRS column conventions (`jk` = `L`/`P`, `tgl_lahir` as `YYYY-MM-DD`) into
//!   typed values
//!
//! Notes:
//! - Unknown keys are tolerated: the SIMRS `pasien` row carries many columns this core ignores.
//! - A response that claims `found: true` without a patient object is rejected.

use crate::{clean_text, parse_wire, SimrsError, SimrsResult};
use booking_types::MedicalRecordNumber;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// Public domain-level types
// ============================================================================

/// Administrative gender as recorded by SIMRS.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    /// Laki-laki.
    #[serde(rename = "L")]
    Male,
    /// Perempuan.
    #[serde(rename = "P")]
    Female,
}

impl Gender {
    /// Convert to SIMRS wire format code.
    pub fn to_wire(self) -> &'static str {
        match self {
            Gender::Male => "L",
            Gender::Female => "P",
        }
    }

    /// Parse from SIMRS wire format code.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "L" => Some(Gender::Male),
            "P" => Some(Gender::Female),
            _ => None,
        }
    }
}

/// A registered patient as returned by the SIMRS registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatientRecord {
    /// Medical-record number (`no_rkm_medis`).
    pub mr_number: MedicalRecordNumber,

    /// National ID (`no_ktp`). Kept as free text: legacy rows are not always 16 digits.
    pub nik: Option<String>,

    /// Full name (`nm_pasien`).
    pub full_name: String,

    pub gender: Option<Gender>,

    pub birth_date: Option<NaiveDate>,

    pub phone: Option<String>,

    pub address: Option<String>,

    pub email: Option<String>,

    /// Insurance membership number (`no_peserta`).
    pub insurance_number: Option<String>,

    pub religion: Option<String>,
}

/// Terminal result of a successful search call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatientSearchOutcome {
    Found(PatientRecord),
    NotFound { message: Option<String> },
}

// ============================================================================
// Public PatientSearch operations
// ============================================================================

/// Patient search response operations.
///
/// This is a zero-sized type used for namespacing; all methods are associated functions.
pub struct PatientSearch;

impl PatientSearch {
    /// Parse a patient search response body.
    ///
    /// # Errors
    ///
    /// Returns [`SimrsError::Translation`] if:
    /// - the body does not match the search response schema,
    /// - `found` is true but no patient object is present,
    /// - the patient has an empty medical-record number, an unknown `jk` code or an unparseable
    ///   birth date.
    pub fn parse(body: &str) -> SimrsResult<PatientSearchOutcome> {
        let wire: SearchResponseWire = parse_wire(body, "patient search")?;
        wire_to_domain(wire)
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Debug, Deserialize)]
struct SearchResponseWire {
    found: bool,

    #[serde(default)]
    patient: Option<PatientWire>,

    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PatientWire {
    no_rkm_medis: String,

    #[serde(default)]
    no_ktp: Option<String>,

    nm_pasien: String,

    #[serde(default)]
    jk: Option<String>,

    #[serde(default)]
    tgl_lahir: Option<String>,

    #[serde(default)]
    no_tlp: Option<String>,

    #[serde(default)]
    alamat: Option<String>,

    #[serde(default)]
    email: Option<String>,

    #[serde(default)]
    no_peserta: Option<String>,

    #[serde(default)]
    agama: Option<String>,
}

// ============================================================================
// Helper functions (internal)
// ============================================================================

fn wire_to_domain(wire: SearchResponseWire) -> SimrsResult<PatientSearchOutcome> {
    if !wire.found {
        return Ok(PatientSearchOutcome::NotFound {
            message: clean_text(wire.message),
        });
    }

    let patient = wire.patient.ok_or_else(|| {
        SimrsError::Translation("patient search reported found without a patient".into())
    })?;

    patient_to_domain(patient).map(PatientSearchOutcome::Found)
}

fn patient_to_domain(wire: PatientWire) -> SimrsResult<PatientRecord> {
    let mr_number = MedicalRecordNumber::parse(&wire.no_rkm_medis)
        .map_err(|e| SimrsError::Translation(format!("invalid no_rkm_medis: {e}")))?;

    let gender = match clean_text(wire.jk) {
        Some(code) => Some(Gender::from_wire(&code).ok_or_else(|| {
            SimrsError::Translation(format!("unknown jk code '{code}'"))
        })?),
        None => None,
    };

    let birth_date = match clean_text(wire.tgl_lahir) {
        Some(raw) => parse_birth_date(&raw)?,
        None => None,
    };

    Ok(PatientRecord {
        mr_number,
        nik: clean_text(wire.no_ktp),
        full_name: wire.nm_pasien.trim().to_string(),
        gender,
        birth_date,
        phone: clean_text(wire.no_tlp),
        address: clean_text(wire.alamat),
        email: clean_text(wire.email),
        insurance_number: clean_text(wire.no_peserta),
        religion: clean_text(wire.agama),
    })
}

/// SIMRS stores `tgl_lahir` as a DATE column. Some gateways serialise it as a full timestamp,
/// and unset dates come through as `0000-00-00`.
fn parse_birth_date(raw: &str) -> SimrsResult<Option<NaiveDate>> {
    if raw.starts_with("0000-00-00") {
        return Ok(None);
    }

    let date_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map(Some)
        .map_err(|e| SimrsError::Translation(format!("invalid tgl_lahir '{raw}': {e}")))
}
