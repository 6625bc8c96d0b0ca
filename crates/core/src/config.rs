//! Booking runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into the wizard. Nothing in
//! this crate reads environment variables while a booking is in progress; the binary turns
//! raw values into a [`BookingConfig`] using the `*_from_env_value` helpers below.

use crate::constants::{DEFAULT_DRAFT_MAX_AGE_HOURS, DEFAULT_INSURANCE_KEYWORDS};
use crate::messages::Locale;
use crate::{BookingError, BookingResult};
use std::path::{Path, PathBuf};

/// Booking configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct BookingConfig {
    api_base_url: String,
    api_token: Option<String>,
    draft_dir: PathBuf,
    insurance_keywords: Vec<String>,
    draft_max_age: chrono::Duration,
    locale: Locale,
}

impl BookingConfig {
    /// Create a new `BookingConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::InvalidInput`] if the API URL is not http(s), the keyword list
    /// is empty, or the draft age is not positive.
    pub fn new(
        api_base_url: String,
        api_token: Option<String>,
        draft_dir: PathBuf,
        insurance_keywords: Vec<String>,
        draft_max_age: chrono::Duration,
        locale: Locale,
    ) -> BookingResult<Self> {
        let api_base_url = api_base_url.trim().to_string();
        if !(api_base_url.starts_with("http://") || api_base_url.starts_with("https://")) {
            return Err(BookingError::InvalidInput(format!(
                "SIMRS_API_URL must start with http:// or https://, got '{api_base_url}'"
            )));
        }

        let insurance_keywords: Vec<String> = insurance_keywords
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        if insurance_keywords.is_empty() {
            return Err(BookingError::InvalidInput(
                "insurance keyword list cannot be empty".into(),
            ));
        }

        if draft_max_age <= chrono::Duration::zero() {
            return Err(BookingError::InvalidInput(
                "draft max age must be positive".into(),
            ));
        }

        Ok(Self {
            api_base_url,
            api_token: api_token.filter(|t| !t.trim().is_empty()),
            draft_dir,
            insurance_keywords,
            draft_max_age,
            locale,
        })
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn api_token(&self) -> Option<&str> {
        self.api_token.as_deref()
    }

    pub fn draft_dir(&self) -> &Path {
        &self.draft_dir
    }

    pub fn insurance_keywords(&self) -> &[String] {
        &self.insurance_keywords
    }

    pub fn draft_max_age(&self) -> chrono::Duration {
        self.draft_max_age
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a comma-separated insurance keyword list.
///
/// If `value` is `None` or blank, returns the built-in list.
pub fn insurance_keywords_from_env_value(value: Option<String>) -> Vec<String> {
    let parsed: Vec<String> = non_blank(value)
        .map(|v| {
            v.split(',')
                .map(|k| k.trim().to_uppercase())
                .filter(|k| !k.is_empty())
                .collect()
        })
        .unwrap_or_default();

    if parsed.is_empty() {
        DEFAULT_INSURANCE_KEYWORDS
            .iter()
            .map(|k| (*k).to_string())
            .collect()
    } else {
        parsed
    }
}

/// Parse the draft expiry in hours.
///
/// If `value` is `None` or blank, returns the default.
pub fn draft_max_age_from_env_value(value: Option<String>) -> BookingResult<chrono::Duration> {
    let Some(value) = non_blank(value) else {
        return Ok(chrono::Duration::hours(DEFAULT_DRAFT_MAX_AGE_HOURS));
    };
    let hours: i64 = value.parse().map_err(|_| {
        BookingError::InvalidInput(format!(
            "BOOKING_DRAFT_MAX_AGE_HOURS must be a whole number of hours, got '{value}'"
        ))
    })?;
    if hours <= 0 {
        return Err(BookingError::InvalidInput(
            "BOOKING_DRAFT_MAX_AGE_HOURS must be positive".into(),
        ));
    }
    Ok(chrono::Duration::hours(hours))
}

/// Parse the display locale. If `value` is `None` or blank, returns Indonesian.
pub fn locale_from_env_value(value: Option<String>) -> BookingResult<Locale> {
    non_blank(value)
        .map(|v| v.parse::<Locale>())
        .transpose()
        .map(Option::unwrap_or_default)
}
