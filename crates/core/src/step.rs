//! Wizard steps and the transition table.
//!
//! The wizard is strictly linear:
//!
//! ```text
//! poli-selection -> schedule -> patient-data -> confirmation -> success
//! ```
//!
//! [`transition`] lists every `(step, event)` pair explicitly, so adding a step or an event is a
//! compile error until the table covers it. Validation and the initial-step skip rule sit on
//! top of this table in [`crate::wizard`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// A named wizard step. The numeric index (1-based) is what draft storage records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    PoliSelection,
    Schedule,
    PatientData,
    Confirmation,
    Success,
}

impl Step {
    pub const ALL: [Step; 5] = [
        Step::PoliSelection,
        Step::Schedule,
        Step::PatientData,
        Step::Confirmation,
        Step::Success,
    ];

    pub fn index(self) -> u8 {
        match self {
            Step::PoliSelection => 1,
            Step::Schedule => 2,
            Step::PatientData => 3,
            Step::Confirmation => 4,
            Step::Success => 5,
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.index() == index)
    }

    pub fn is_terminal(self) -> bool {
        self == Step::Success
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Step::PoliSelection => "poli-selection",
            Step::Schedule => "schedule",
            Step::PatientData => "patient-data",
            Step::Confirmation => "confirmation",
            Step::Success => "success",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs that move the wizard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StepEvent {
    Advance,
    Retreat,
    Submitted,
}

impl fmt::Display for StepEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StepEvent::Advance => "advance",
            StepEvent::Retreat => "retreat",
            StepEvent::Submitted => "submit",
        })
    }
}

/// The transition table. `None` means the event is not accepted in that step.
pub fn transition(from: Step, event: StepEvent) -> Option<Step> {
    use Step::*;
    use StepEvent::*;

    match (from, event) {
        (PoliSelection, Advance) => Some(Schedule),
        (Schedule, Advance) => Some(PatientData),
        (PatientData, Advance) => Some(Confirmation),
        (Confirmation, Advance) => None,
        (Success, Advance) => None,

        (PoliSelection, Retreat) => None,
        (Schedule, Retreat) => Some(PoliSelection),
        (PatientData, Retreat) => Some(Schedule),
        (Confirmation, Retreat) => Some(PatientData),
        (Success, Retreat) => None,

        (PoliSelection, Submitted) => None,
        (Schedule, Submitted) => None,
        (PatientData, Submitted) => None,
        (Confirmation, Submitted) => Some(Success),
        (Success, Submitted) => None,
    }
}
