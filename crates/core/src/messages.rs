//! User-facing messages and the notification outbox types.
//!
//! The wizard never formats text inline. It builds a [`Message`] and renders it in the
//! session's [`Locale`]. Indonesian is the default, matching the hospital's patient-facing
//! pages.

use crate::constants::{MIN_PHONE_DIGITS, NIK_LEN};
use crate::validation::ValidationIssue;
use crate::{BookingError, BookingResult};
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Locale {
    /// Bahasa Indonesia.
    #[default]
    Id,
    En,
}

impl FromStr for Locale {
    type Err = BookingError;

    fn from_str(s: &str) -> BookingResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "id" | "id-id" | "in" => Ok(Locale::Id),
            "en" | "en-us" | "en-gb" => Ok(Locale::En),
            other => Err(BookingError::InvalidInput(format!(
                "unsupported locale '{other}' (expected 'id' or 'en')"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Info,
    Error,
}

/// A rendered message waiting for the host to display it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

/// Everything the wizard can say to the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message<'a> {
    Validation(&'a ValidationIssue),
    PatientFound { name: &'a str },
    PatientNotFound { server: Option<&'a str> },
    LookupFailed,
    BookingCreated { code: &'a str, new_mr: Option<&'a str> },
    SubmissionRateLimited,
    SubmissionRejected { server: &'a str },
    SubmissionFailed,
    DraftRestored,
}

impl Message<'_> {
    pub fn render(&self, locale: Locale) -> String {
        match locale {
            Locale::Id => self.render_id(),
            Locale::En => self.render_en(),
        }
    }

    fn render_id(&self) -> String {
        match self {
            Message::Validation(issue) => validation_id(issue),
            Message::PatientFound { name } => format!("Data pasien ditemukan: {name}"),
            Message::PatientNotFound { server } => format!(
                "{}. Periksa kembali nomor RM/NIK, kembali ke langkah sebelumnya, atau daftar sebagai pasien baru.",
                server.unwrap_or("Data pasien tidak ditemukan").trim_end_matches('.')
            ),
            Message::LookupFailed => {
                "Gagal mencari data pasien. Silakan coba lagi atau daftar sebagai pasien baru."
                    .into()
            }
            Message::BookingCreated { code, new_mr } => match new_mr {
                Some(rm) => format!(
                    "Booking berhasil! Kode booking: {code}. Nomor rekam medis baru Anda: {rm}"
                ),
                None => format!("Booking berhasil! Kode booking: {code}"),
            },
            Message::SubmissionRateLimited => {
                "Terlalu banyak permintaan. Mohon tunggu sebentar sebelum mencoba lagi.".into()
            }
            Message::SubmissionRejected { server } => (*server).to_string(),
            Message::SubmissionFailed => {
                "Gagal membuat booking. Silakan periksa kembali data Anda dan coba lagi.".into()
            }
            Message::DraftRestored => "Melanjutkan pendaftaran yang belum selesai.".into(),
        }
    }

    fn render_en(&self) -> String {
        match self {
            Message::Validation(issue) => validation_en(issue),
            Message::PatientFound { name } => format!("Patient found: {name}"),
            Message::PatientNotFound { server } => format!(
                "{}. Check the medical record number or NIK, go back a step, or register as a new patient.",
                server.unwrap_or("Patient not found").trim_end_matches('.')
            ),
            Message::LookupFailed => {
                "Patient search failed. Please try again or register as a new patient.".into()
            }
            Message::BookingCreated { code, new_mr } => match new_mr {
                Some(rm) => format!(
                    "Booking confirmed! Booking code: {code}. Your new medical record number: {rm}"
                ),
                None => format!("Booking confirmed! Booking code: {code}"),
            },
            Message::SubmissionRateLimited => {
                "Too many requests. Please wait a moment before trying again.".into()
            }
            Message::SubmissionRejected { server } => (*server).to_string(),
            Message::SubmissionFailed => {
                "Booking failed. Please check your details and try again.".into()
            }
            Message::DraftRestored => "Resuming your unfinished booking.".into(),
        }
    }
}

fn validation_id(issue: &ValidationIssue) -> String {
    match issue {
        ValidationIssue::PoliRequired => "Silakan pilih poli terlebih dahulu".into(),
        ValidationIssue::PoliNotEligible => {
            "Poli yang dipilih tidak tersedia untuk layanan ini".into()
        }
        ValidationIssue::DateRequired => "Silakan pilih tanggal kunjungan".into(),
        ValidationIssue::TimeSlotRequired => "Silakan pilih jam kunjungan".into(),
        ValidationIssue::MrNumberRequired => "Nomor rekam medis wajib diisi".into(),
        ValidationIssue::LookupIdentifierTooShort { min } => {
            format!("Nomor RM atau NIK minimal {min} karakter")
        }
        ValidationIssue::PatientNotVerified => {
            "Data pasien belum ditemukan. Silakan cari pasien terlebih dahulu".into()
        }
        ValidationIssue::NikLength { actual } => {
            format!("NIK harus {NIK_LEN} digit (saat ini {actual} digit)")
        }
        ValidationIssue::NikNotNumeric => "NIK hanya boleh berisi angka".into(),
        ValidationIssue::FullNameRequired => "Nama lengkap wajib diisi".into(),
        ValidationIssue::PhoneTooShort { actual } => {
            format!("Nomor telepon minimal {MIN_PHONE_DIGITS} digit (saat ini {actual} digit)")
        }
        ValidationIssue::PhoneInvalid => {
            "Nomor telepon hanya boleh berisi angka, spasi, '-' dan '+' di depan".into()
        }
        ValidationIssue::BirthDateRequired => "Tanggal lahir wajib diisi".into(),
        ValidationIssue::GenderRequired => "Jenis kelamin wajib dipilih".into(),
        ValidationIssue::ReligionRequired => "Agama wajib dipilih".into(),
        ValidationIssue::ResponsibleNameRequired => "Nama penanggung jawab wajib diisi".into(),
        ValidationIssue::ResponsibleRelationshipRequired => {
            "Hubungan penanggung jawab wajib dipilih".into()
        }
        ValidationIssue::ComplaintTooShort { actual, min } => {
            format!("Keluhan minimal {min} karakter ({actual}/{min})")
        }
        ValidationIssue::PaymentRequired => "Silakan pilih cara pembayaran".into(),
        ValidationIssue::ConsentsRequired => {
            "Anda harus menyetujui syarat & ketentuan, kebijakan privasi, dan informasi biaya"
                .into()
        }
        ValidationIssue::InsuranceNumberRequired => "Nomor kartu asuransi/BPJS wajib diisi".into(),
        ValidationIssue::InsuranceClassRequired => "Kelas asuransi/BPJS wajib dipilih".into(),
    }
}

fn validation_en(issue: &ValidationIssue) -> String {
    match issue {
        ValidationIssue::PoliRequired => "Please select a department first".into(),
        ValidationIssue::PoliNotEligible => {
            "The selected department is not available for this service".into()
        }
        ValidationIssue::DateRequired => "Please choose a visit date".into(),
        ValidationIssue::TimeSlotRequired => "Please choose a time slot".into(),
        ValidationIssue::MrNumberRequired => "Medical record number is required".into(),
        ValidationIssue::LookupIdentifierTooShort { min } => {
            format!("Enter at least {min} characters of the medical record number or NIK")
        }
        ValidationIssue::PatientNotVerified => {
            "Patient has not been found yet. Please search for the patient first".into()
        }
        ValidationIssue::NikLength { actual } => {
            format!("NIK must be exactly {NIK_LEN} digits (currently {actual})")
        }
        ValidationIssue::NikNotNumeric => "NIK must contain digits only".into(),
        ValidationIssue::FullNameRequired => "Full name is required".into(),
        ValidationIssue::PhoneTooShort { actual } => {
            format!("Phone number needs at least {MIN_PHONE_DIGITS} digits (currently {actual})")
        }
        ValidationIssue::PhoneInvalid => {
            "Phone number may only contain digits, spaces, '-' and a leading '+'".into()
        }
        ValidationIssue::BirthDateRequired => "Birth date is required".into(),
        ValidationIssue::GenderRequired => "Please select a gender".into(),
        ValidationIssue::ReligionRequired => "Please select a religion".into(),
        ValidationIssue::ResponsibleNameRequired => "Responsible party name is required".into(),
        ValidationIssue::ResponsibleRelationshipRequired => {
            "Please select the responsible party's relationship".into()
        }
        ValidationIssue::ComplaintTooShort { actual, min } => {
            format!("Complaint must be at least {min} characters ({actual}/{min})")
        }
        ValidationIssue::PaymentRequired => "Please select a payment method".into(),
        ValidationIssue::ConsentsRequired => {
            "You must accept the terms, the privacy policy and the fee information".into()
        }
        ValidationIssue::InsuranceNumberRequired => "Insurance/BPJS card number is required".into(),
        ValidationIssue::InsuranceClassRequired => "Please select the insurance/BPJS class".into(),
    }
}
