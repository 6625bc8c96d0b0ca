//! Who is booking, and what they are booking.
//!
//! [`SessionContext`] describes the signed-in user (if any) and the display locale.
//! [`WizardContext`] describes the service, the provider and the departments on offer.

use crate::messages::Locale;
use crate::step::Step;
use crate::{BookingError, BookingResult};
use booking_types::MedicalRecordNumber;
use serde::{Deserialize, Serialize};
use simrs::Poli;
use std::fmt;
use std::str::FromStr;

/// A patient signed in to the portal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatedPatient {
    pub mr_number: MedicalRecordNumber,
    pub full_name: String,
    pub phone: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub user: Option<AuthenticatedPatient>,
    pub locale: Locale,
}

impl SessionContext {
    pub fn anonymous(locale: Locale) -> Self {
        Self { user: None, locale }
    }

    pub fn signed_in(user: AuthenticatedPatient, locale: Locale) -> Self {
        Self {
            user: Some(user),
            locale,
        }
    }
}

/// The kind of service being booked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    #[default]
    Appointment,
    Mcu,
    Lab,
}

impl ServiceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceKind::Appointment => "appointment",
            ServiceKind::Mcu => "mcu",
            ServiceKind::Lab => "lab",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceKind {
    type Err = BookingError;

    fn from_str(s: &str) -> BookingResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "appointment" => Ok(ServiceKind::Appointment),
            "mcu" => Ok(ServiceKind::Mcu),
            "lab" => Ok(ServiceKind::Lab),
            other => Err(BookingError::InvalidInput(format!(
                "unknown service '{other}' (expected appointment, mcu or lab)"
            ))),
        }
    }
}

/// The booking target. Fixed for the lifetime of one wizard session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WizardContext {
    pub service: ServiceKind,
    pub provider_id: String,
    pub preselected_poli: Option<Poli>,
    /// Departments the user may choose from. Empty means "not known"; no eligibility check.
    pub eligible_polis: Vec<Poli>,
}

impl WizardContext {
    pub fn new(service: ServiceKind, provider_id: impl Into<String>) -> Self {
        Self {
            service,
            provider_id: provider_id.into(),
            preselected_poli: None,
            eligible_polis: Vec::new(),
        }
    }

    pub fn with_eligible_polis(mut self, polis: Vec<Poli>) -> Self {
        self.eligible_polis = polis;
        self
    }

    pub fn with_preselected_poli(mut self, poli: Poli) -> Self {
        self.preselected_poli = Some(poli);
        self
    }

    /// The department to use without asking: the preselected one, or the only eligible one.
    pub fn unambiguous_poli(&self) -> Option<&Poli> {
        if let Some(poli) = &self.preselected_poli {
            return Some(poli);
        }
        match self.eligible_polis.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    /// Poli selection is skipped when the department is already determined.
    pub fn initial_step(&self) -> Step {
        if self.unambiguous_poli().is_some() {
            Step::Schedule
        } else {
            Step::PoliSelection
        }
    }
}

/// Filter the department catalogue down to what `service` may book.
///
/// MCU and laboratory departments are recognised by "MCU" / "LAB" in their code or name;
/// ordinary appointments get everything else.
pub fn eligible_polis_for(service: ServiceKind, catalog: &[Poli]) -> Vec<Poli> {
    let mentions = |poli: &Poli, keyword: &str| {
        poli.code.to_uppercase().contains(keyword) || poli.name.to_uppercase().contains(keyword)
    };

    catalog
        .iter()
        .filter(|poli| match service {
            ServiceKind::Mcu => mentions(poli, "MCU"),
            ServiceKind::Lab => mentions(poli, "LAB"),
            ServiceKind::Appointment => !mentions(poli, "MCU") && !mentions(poli, "LAB"),
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poli(code: &str, name: &str) -> Poli {
        Poli {
            code: code.into(),
            name: name.into(),
        }
    }

    fn catalog() -> Vec<Poli> {
        vec![
            poli("INT", "Penyakit Dalam"),
            poli("ANA", "Anak"),
            poli("MCU01", "Medical Check Up"),
            poli("LAB", "Laboratorium"),
        ]
    }

    #[test]
    fn filters_catalogue_by_service() {
        let codes = |service| {
            eligible_polis_for(service, &catalog())
                .into_iter()
                .map(|p| p.code)
                .collect::<Vec<_>>()
        };
        assert_eq!(codes(ServiceKind::Appointment), vec!["INT", "ANA"]);
        assert_eq!(codes(ServiceKind::Mcu), vec!["MCU01"]);
        assert_eq!(codes(ServiceKind::Lab), vec!["LAB"]);
    }

    #[test]
    fn single_eligible_poli_skips_selection() {
        let ctx = WizardContext::new(ServiceKind::Lab, "lab-1")
            .with_eligible_polis(eligible_polis_for(ServiceKind::Lab, &catalog()));
        assert_eq!(ctx.initial_step(), Step::Schedule);
        assert_eq!(ctx.unambiguous_poli().map(|p| p.code.as_str()), Some("LAB"));
    }

    #[test]
    fn preselected_poli_wins() {
        let ctx = WizardContext::new(ServiceKind::Appointment, "dr-042")
            .with_eligible_polis(catalog())
            .with_preselected_poli(poli("ANA", "Anak"));
        assert_eq!(ctx.initial_step(), Step::Schedule);
        assert_eq!(ctx.unambiguous_poli().map(|p| p.code.as_str()), Some("ANA"));
    }

    #[test]
    fn ambiguous_context_starts_at_poli_selection() {
        let ctx = WizardContext::new(ServiceKind::Appointment, "dr-042");
        assert_eq!(ctx.initial_step(), Step::PoliSelection);

        let ctx = ctx.with_eligible_polis(catalog());
        assert_eq!(ctx.initial_step(), Step::PoliSelection);
    }

    #[test]
    fn parses_service_kind() {
        assert_eq!("MCU".parse::<ServiceKind>().expect("mcu"), ServiceKind::Mcu);
        assert!("dental".parse::<ServiceKind>().is_err());
    }
}
