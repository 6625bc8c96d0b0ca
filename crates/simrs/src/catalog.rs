//! Reference catalogues: departments (poli) and payment methods (penjab).
//!
//! Both lists are read-only data fetched once per wizard lifetime by the host. The SIMRS
//! gateway returns them either as a bare JSON array or wrapped in `{ "data": [...] }`; both
//! shapes are accepted.

use crate::{parse_wire, SimrsError, SimrsResult};
use serde::{Deserialize, Serialize};

/// A hospital department (`poliklinik` row).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Poli {
    /// `kd_poli`
    pub code: String,
    /// `nm_poli`
    pub name: String,
}

/// A payment method / guarantor (`penjab` row).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentMethod {
    /// `kd_pj`
    pub code: String,
    /// `png_jawab`, e.g. `"BPJS KESEHATAN"` or `"UMUM/TUNAI"`
    pub label: String,
}

/// Catalogue response operations.
pub struct Catalog;

impl Catalog {
    /// Parse the department list.
    ///
    /// # Errors
    ///
    /// Returns [`SimrsError::Translation`] on schema mismatch or when an entry has an empty
    /// code.
    pub fn parse_polis(body: &str) -> SimrsResult<Vec<Poli>> {
        let wire: ListWire<PoliWire> = parse_wire(body, "poli list")?;
        wire.into_items()
            .into_iter()
            .map(|p| {
                let code = required_code(p.kd_poli, "kd_poli")?;
                Ok(Poli {
                    code,
                    name: p.nm_poli.trim().to_string(),
                })
            })
            .collect()
    }

    /// Parse the payment-method list.
    ///
    /// # Errors
    ///
    /// Returns [`SimrsError::Translation`] on schema mismatch or when an entry has an empty
    /// code.
    pub fn parse_payment_methods(body: &str) -> SimrsResult<Vec<PaymentMethod>> {
        let wire: ListWire<PaymentMethodWire> = parse_wire(body, "payment method list")?;
        wire.into_items()
            .into_iter()
            .map(|p| {
                let code = required_code(p.kd_pj, "kd_pj")?;
                Ok(PaymentMethod {
                    code,
                    label: p.png_jawab.trim().to_string(),
                })
            })
            .collect()
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListWire<T> {
    Bare(Vec<T>),
    Wrapped { data: Vec<T> },
}

impl<T> ListWire<T> {
    fn into_items(self) -> Vec<T> {
        match self {
            ListWire::Bare(items) => items,
            ListWire::Wrapped { data } => data,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PoliWire {
    kd_poli: String,
    nm_poli: String,
}

#[derive(Debug, Deserialize)]
struct PaymentMethodWire {
    kd_pj: String,
    png_jawab: String,
}

fn required_code(raw: String, column: &str) -> SimrsResult<String> {
    let code = raw.trim();
    if code.is_empty() {
        return Err(SimrsError::Translation(format!("empty {column} in catalogue")));
    }
    Ok(code.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_poli_list() {
        let body = r#"[{"kd_poli":"INT","nm_poli":"Poli Penyakit Dalam"},{"kd_poli":"MCU","nm_poli":"Medical Check Up"}]"#;
        let polis = Catalog::parse_polis(body).expect("parse");
        assert_eq!(polis.len(), 2);
        assert_eq!(polis[1].code, "MCU");
        assert_eq!(polis[0].name, "Poli Penyakit Dalam");
    }

    #[test]
    fn parses_wrapped_payment_methods() {
        let body = r#"{"data":[{"kd_pj":"BPJ","png_jawab":"BPJS KESEHATAN"},{"kd_pj":"UMU","png_jawab":" UMUM/TUNAI "}]}"#;
        let methods = Catalog::parse_payment_methods(body).expect("parse");
        assert_eq!(
            methods,
            vec![
                PaymentMethod {
                    code: "BPJ".into(),
                    label: "BPJS KESEHATAN".into()
                },
                PaymentMethod {
                    code: "UMU".into(),
                    label: "UMUM/TUNAI".into()
                },
            ]
        );
    }

    #[test]
    fn rejects_empty_codes() {
        let err = Catalog::parse_polis(r#"[{"kd_poli":" ","nm_poli":"X"}]"#).expect_err("empty");
        assert!(err.to_string().contains("kd_poli"));
    }

    #[test]
    fn rejects_wrong_shape() {
        assert!(Catalog::parse_payment_methods(r#"{"items":[]}"#).is_err());
    }
}
