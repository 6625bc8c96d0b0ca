//! Best-effort draft persistence.
//!
//! Drafts are stored as JSON text behind the [`DraftStore`] key-value trait:
//! [`MemoryDraftStore`] for tests and embedding, [`FileDraftStore`] for one-file-per-key
//! storage on disk. [`DraftPersistence`] owns the key for one wizard and never returns errors
//! to the wizard: failures are logged and the draft is treated as absent.
//!
//! Stored value:
//!
//! ```json
//! { "step": 2, "formData": { ... }, "timestamp": "2026-10-19T08:30:00Z" }
//! ```

use crate::constants::{DRAFT_FILE_EXTENSION, DRAFT_KEY_PREFIX};
use crate::context::ServiceKind;
use crate::draft::BookingDraft;
use crate::step::Step;
use crate::{BookingError, BookingResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

// ============================================================================
// Stores
// ============================================================================

/// Key-value storage for serialised drafts.
pub trait DraftStore {
    fn load(&self, key: &str) -> BookingResult<Option<String>>;
    fn save(&self, key: &str, value: &str) -> BookingResult<()>;
    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> BookingResult<()>;
}

impl<T: DraftStore + ?Sized> DraftStore for &T {
    fn load(&self, key: &str) -> BookingResult<Option<String>> {
        (**self).load(key)
    }

    fn save(&self, key: &str, value: &str) -> BookingResult<()> {
        (**self).save(key, value)
    }

    fn remove(&self, key: &str) -> BookingResult<()> {
        (**self).remove(key)
    }
}

#[derive(Debug, Default)]
pub struct MemoryDraftStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DraftStore for MemoryDraftStore {
    fn load(&self, key: &str) -> BookingResult<Option<String>> {
        Ok(self.entries().get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> BookingResult<()> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> BookingResult<()> {
        self.entries().remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per draft under a directory.
#[derive(Clone, Debug)]
pub struct FileDraftStore {
    dir: PathBuf,
}

impl FileDraftStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path for `key`. Characters outside `[A-Za-z0-9_-]` become `_`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{name}.{DRAFT_FILE_EXTENSION}"))
    }
}

impl DraftStore for FileDraftStore {
    fn load(&self, key: &str) -> BookingResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BookingError::DraftRead(e)),
        }
    }

    fn save(&self, key: &str, value: &str) -> BookingResult<()> {
        fs::create_dir_all(&self.dir).map_err(BookingError::DraftWrite)?;

        let path = self.path_for(key);
        let tmp = path.with_extension(format!("{DRAFT_FILE_EXTENSION}.tmp"));
        fs::write(&tmp, value).map_err(BookingError::DraftWrite)?;
        fs::rename(&tmp, &path).map_err(BookingError::DraftWrite)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> BookingResult<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BookingError::DraftRemove(e)),
        }
    }
}

// ============================================================================
// Draft persistence
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredDraft {
    step: u8,
    form_data: BookingDraft,
    timestamp: DateTime<Utc>,
}

/// A draft read back from storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RestoredDraft {
    pub step: Step,
    pub draft: BookingDraft,
    pub saved_at: DateTime<Utc>,
}

/// Mirrors one wizard's draft into a [`DraftStore`] slot.
#[derive(Debug)]
pub struct DraftPersistence<S> {
    store: S,
    key: String,
    max_age: chrono::Duration,
}

impl<S: DraftStore> DraftPersistence<S> {
    pub fn new(store: S, key: String, max_age: chrono::Duration) -> Self {
        Self {
            store,
            key,
            max_age,
        }
    }

    /// Storage key for a service/provider pair: `booking_draft_{service}_{provider_id}`.
    pub fn key_for(service: ServiceKind, provider_id: &str) -> String {
        format!("{DRAFT_KEY_PREFIX}_{service}_{}", provider_id.trim())
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Point at a different slot. The old slot is left as it is.
    pub fn set_key(&mut self, key: String) {
        self.key = key;
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Persist the draft at `step`, with consents zeroed.
    ///
    /// At the terminal step the slot is cleared instead, so a finished booking never resumes.
    pub fn save(&self, step: Step, draft: &BookingDraft) {
        self.save_at(step, draft, Utc::now());
    }

    pub fn save_at(&self, step: Step, draft: &BookingDraft, now: DateTime<Utc>) {
        if step.is_terminal() {
            self.clear();
            return;
        }

        let stored = StoredDraft {
            step: step.index(),
            form_data: draft.without_consents(),
            timestamp: now,
        };
        let result = serde_json::to_string(&stored)
            .map_err(BookingError::DraftSerialization)
            .and_then(|json| self.store.save(&self.key, &json));

        match result {
            Ok(()) => tracing::debug!("draft saved at step {} under {}", step, self.key),
            Err(e) => tracing::warn!("could not save draft under {}: {}", self.key, e),
        }
    }

    /// Read the stored draft, if there is a usable one.
    pub fn load(&self) -> Option<RestoredDraft> {
        self.load_at(Utc::now())
    }

    /// As [`Self::load`], judging expiry against `now`.
    ///
    /// Malformed, terminal-step and expired drafts are logged, removed and reported as absent.
    pub fn load_at(&self, now: DateTime<Utc>) -> Option<RestoredDraft> {
        let raw = match self.store.load(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("could not read draft under {}: {}", self.key, e);
                return None;
            }
        };

        let stored: StoredDraft = match serde_json::from_str(&raw) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(
                    "ignoring malformed draft under {}: {}",
                    self.key,
                    BookingError::DraftDeserialization(e)
                );
                self.clear();
                return None;
            }
        };

        let Some(step) = Step::from_index(stored.step).filter(|s| !s.is_terminal()) else {
            tracing::warn!(
                "ignoring draft under {} with unusable step {}",
                self.key,
                stored.step
            );
            self.clear();
            return None;
        };

        if now - stored.timestamp > self.max_age {
            tracing::info!(
                "discarding draft under {} saved at {}",
                self.key,
                stored.timestamp.to_rfc3339()
            );
            self.clear();
            return None;
        }

        Some(RestoredDraft {
            step,
            draft: stored.form_data.without_consents(),
            saved_at: stored.timestamp,
        })
    }

    pub fn clear(&self) {
        if let Err(e) = self.store.remove(&self.key) {
            tracing::warn!("could not remove draft under {}: {}", self.key, e);
        }
    }
}
