//! Constants used throughout the booking core crate.
//!
//! Validation thresholds, storage naming and configuration defaults live here so the rules
//! read the same everywhere they are enforced.

use booking_types::{Nik, PhoneNumber};

/// Exact number of digits in a national ID (NIK).
pub const NIK_LEN: usize = Nik::LEN;

/// Minimum number of digits in a phone number.
pub const MIN_PHONE_DIGITS: usize = PhoneNumber::MIN_DIGITS;

/// Minimum length of the visit complaint, counted on trimmed text.
pub const MIN_COMPLAINT_LEN: usize = 10;

/// Minimum length of a patient lookup identifier.
pub const MIN_LOOKUP_IDENTIFIER_LEN: usize = 3;

/// Identifiers at least this long are looked up as national IDs, shorter ones as
/// medical-record numbers.
pub const NIK_LOOKUP_MIN_LEN: usize = 15;

/// Prefix of every persisted draft key.
pub const DRAFT_KEY_PREFIX: &str = "booking_draft";

/// File extension used by the file-backed draft store.
pub const DRAFT_FILE_EXTENSION: &str = "json";

/// Default directory for persisted drafts when no explicit directory is configured.
pub const DEFAULT_DRAFT_DIR: &str = "booking_drafts";

/// Default maximum age of a persisted draft before it is discarded.
pub const DEFAULT_DRAFT_MAX_AGE_HOURS: i64 = 24;

/// Payment-method labels containing any of these (case-insensitive) are insurance-related.
pub const DEFAULT_INSURANCE_KEYWORDS: &[&str] =
    &["BPJS", "ASURANSI", "INSURANCE", "JKN", "KIS", "JAMKESDA"];
