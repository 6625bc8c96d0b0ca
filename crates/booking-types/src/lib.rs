//! Validated primitive types shared across the booking crates.
//!
//! Each type guarantees its invariant once constructed, so code that receives one never has to
//! re-check it. Construction trims surrounding whitespace before validating.

/// Errors that can occur when creating validated text types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,

    /// A national ID did not consist of exactly 16 digits
    #[error("NIK must be exactly {expected} digits (got {actual})")]
    NikLength { expected: usize, actual: usize },

    /// A national ID contained something other than ASCII digits
    #[error("NIK must contain digits only")]
    NikNotNumeric,

    /// A phone number had too few digits
    #[error("phone number must have at least {min} digits (got {actual})")]
    PhoneTooShort { min: usize, actual: usize },

    /// A phone number contained characters outside digits, spaces, '-' and a leading '+'
    #[error("phone number contains invalid characters")]
    PhoneInvalidCharacters,
}

/// A string type that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is automatically trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// # Returns
    ///
    /// Returns `Ok(NonEmptyText)` if the trimmed input is non-empty,
    /// or `Err(TextError::Empty)` if it's empty or contains only whitespace.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Indonesian national identity number (NIK): exactly 16 ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Nik(String);

impl Nik {
    /// Required number of digits.
    pub const LEN: usize = 16;

    pub fn parse(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TextError::NikNotNumeric);
        }
        if trimmed.len() != Self::LEN {
            return Err(TextError::NikLength {
                expected: Self::LEN,
                actual: trimmed.len(),
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A phone number with at least [`PhoneNumber::MIN_DIGITS`] digits.
///
/// Separators (spaces and `-`) and a single leading `+` are accepted and kept as entered; only
/// digits count towards the minimum.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Minimum number of digits.
    pub const MIN_DIGITS: usize = 10;

    pub fn parse(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }

        let body = trimmed.strip_prefix('+').unwrap_or(trimmed);
        if !body
            .chars()
            .all(|c| c.is_ascii_digit() || c == ' ' || c == '-')
        {
            return Err(TextError::PhoneInvalidCharacters);
        }

        let digits = Self::count_digits(body);
        if digits < Self::MIN_DIGITS {
            return Err(TextError::PhoneTooShort {
                min: Self::MIN_DIGITS,
                actual: digits,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Counts the ASCII digits in `input`.
    pub fn count_digits(input: &str) -> usize {
        input.chars().filter(|c| c.is_ascii_digit()).count()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A hospital-issued medical-record number (RM). Any non-empty trimmed token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MedicalRecordNumber(String);

impl MedicalRecordNumber {
    pub fn parse(input: impl AsRef<str>) -> Result<Self, TextError> {
        NonEmptyText::new(input).map(|t| Self(t.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Masks an identifier for logging, keeping only its last four characters.
///
/// `"3171234567890123"` becomes `"************0123"`.
pub fn mask_identifier(value: &str) -> String {
    let count = value.chars().count();
    let keep = count.min(4);
    let mut masked: String = "*".repeat(count - keep);
    masked.extend(value.chars().skip(count - keep));
    masked
}

macro_rules! text_newtype_impls {
    ($($ty:ident => $ctor:ident),* $(,)?) => {
        $(
            impl std::fmt::Display for $ty {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl AsRef<str> for $ty {
                fn as_ref(&self) -> &str {
                    &self.0
                }
            }

            impl std::str::FromStr for $ty {
                type Err = TextError;

                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    $ty::$ctor(s)
                }
            }

            impl serde::Serialize for $ty {
                fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
                where
                    S: serde::Serializer,
                {
                    serializer.serialize_str(&self.0)
                }
            }

            impl<'de> serde::Deserialize<'de> for $ty {
                fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
                where
                    D: serde::Deserializer<'de>,
                {
                    let s = String::deserialize(deserializer)?;
                    $ty::$ctor(&s).map_err(serde::de::Error::custom)
                }
            }
        )*
    };
}

text_newtype_impls!(
    NonEmptyText => new,
    Nik => parse,
    PhoneNumber => parse,
    MedicalRecordNumber => parse,
);
