//! The booking wizard: step controller, form state, lookup and submission tied together.
//!
//! One [`BookingWizard`] serves one booking session. It owns the draft exclusively, mirrors
//! it to draft storage after every change, and turns every failure into both an `Err` for the
//! caller and a [`Notification`] for the user.
//!
//! Async operations take `&mut self`, so nothing else can touch the wizard while a lookup or
//! submission is awaited. Hosts that need to stay responsive during a lookup use the split
//! form instead: [`BookingWizard::begin_lookup`], fetch with [`PatientResolver::fetch`]
//! against their own API handle, then [`BookingWizard::finish_lookup`]. Results arriving after
//! [`BookingWizard::close`] or after the identifier changed are dropped.

use crate::config::BookingConfig;
use crate::context::{SessionContext, WizardContext};
use crate::draft::{BookingDraft, DraftEdit, FormState, PatientType};
use crate::messages::{Locale, Message, Notification};
use crate::persistence::{DraftPersistence, DraftStore, RestoredDraft};
use crate::resolver::{LookupState, LookupTicket, PatientResolver};
use crate::step::{transition, Step, StepEvent};
use crate::submission::SubmissionClient;
use crate::validation::{self, validate_step, ValidationError, ValidationIssue};
use crate::{BookingError, BookingResult};
use simrs::{BookingConfirmation, PatientRecord, PatientSearchOutcome, SimrsApi, SimrsResult};
use std::sync::Arc;
use uuid::Uuid;

pub struct BookingWizard<A, S> {
    api: A,
    persistence: DraftPersistence<S>,
    config: Arc<BookingConfig>,
    session: SessionContext,
    context: WizardContext,
    form: FormState,
    step: Step,
    initial_step: Step,
    resolver: PatientResolver,
    closed: bool,
    confirmation: Option<BookingConfirmation>,
    request_id: Uuid,
    notifications: Vec<Notification>,
}

impl<A: SimrsApi, S: DraftStore> BookingWizard<A, S> {
    /// A fresh wizard. Stored drafts are left alone; use [`Self::open`] to resume one.
    pub fn new(
        api: A,
        store: S,
        config: Arc<BookingConfig>,
        session: SessionContext,
        context: WizardContext,
    ) -> Self {
        let key = DraftPersistence::<S>::key_for(context.service, &context.provider_id);
        let persistence = DraftPersistence::new(store, key, config.draft_max_age());
        let initial_step = context.initial_step();
        let form = FormState::new(initial_draft(&session, &context));

        Self {
            api,
            persistence,
            config,
            session,
            context,
            form,
            step: initial_step,
            initial_step,
            resolver: PatientResolver::new(),
            closed: false,
            confirmation: None,
            request_id: Uuid::new_v4(),
            notifications: Vec::new(),
        }
    }

    /// Open the wizard, resuming a stored draft for this service and provider when one exists.
    ///
    /// A resumed RETURNING draft re-runs its patient lookup. If it was saved at confirmation
    /// and the lookup does not find the patient, the wizard resumes at patient-data instead.
    pub async fn open(
        api: A,
        store: S,
        config: Arc<BookingConfig>,
        session: SessionContext,
        context: WizardContext,
    ) -> Self {
        let mut wizard = Self::new(api, store, config, session, context);
        if let Some(restored) = wizard.persistence.load() {
            wizard.restore(restored).await;
        }
        wizard
    }

    async fn restore(&mut self, restored: RestoredDraft) {
        let mut draft = restored.draft;
        if draft.poli.is_none() {
            draft.poli = self.context.unambiguous_poli().cloned();
        }
        self.form.reset(draft);
        self.step = restored.step.max(self.initial_step);
        tracing::info!(
            "resuming draft {} at step {}",
            self.persistence.key(),
            self.step
        );
        self.notify(Notification::info(
            Message::DraftRestored.render(self.locale()),
        ));

        let returning = self.form.draft().patient_type == PatientType::Returning;
        if returning && !self.form.draft().mr_number.trim().is_empty() {
            if let Err(err) = self.lookup_patient().await {
                tracing::debug!("lookup on resume did not verify the patient: {}", err);
            }
        }

        if returning && self.step == Step::Confirmation && self.verified_patient().is_none() {
            self.step = Step::PatientData;
            self.persist();
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn initial_step(&self) -> Step {
        self.initial_step
    }

    pub fn draft(&self) -> &BookingDraft {
        self.form.draft()
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn lookup_state(&self) -> &LookupState {
        self.resolver.state()
    }

    pub fn context(&self) -> &WizardContext {
        &self.context
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn confirmation(&self) -> Option<&BookingConfirmation> {
        self.confirmation.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Correlation id sent with every submission from this session.
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn locale(&self) -> Locale {
        self.session.locale
    }

    pub fn draft_key(&self) -> &str {
        self.persistence.key()
    }

    /// Drain pending user notifications, oldest first.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    // ========================================================================
    // Editing
    // ========================================================================

    /// Apply a user edit and mirror the draft to storage.
    ///
    /// Changing the lookup identifier or the patient type clears the search state.
    pub fn apply(&mut self, edit: DraftEdit) -> BookingResult<()> {
        self.ensure_open()?;

        let before = lookup_key(self.form.draft());
        let field = self.form.apply(edit);
        if lookup_key(self.form.draft()) != before {
            self.resolver.invalidate();
        }
        if !field.is_consent() {
            self.persist();
        }
        Ok(())
    }

    /// Enter a whole draft as user input, field by field.
    pub fn import(&mut self, draft: BookingDraft) -> BookingResult<()> {
        draft
            .into_edits()
            .into_iter()
            .try_for_each(|edit| self.apply(edit))
    }

    /// Enter the non-empty fields of `draft` over the current one, keeping what a resumed
    /// session already holds for the rest.
    pub fn merge(&mut self, draft: BookingDraft) -> BookingResult<()> {
        draft
            .into_edits()
            .into_iter()
            .filter(|edit| !edit.is_blank())
            .try_for_each(|edit| self.apply(edit))
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Validate the current step and move forward.
    ///
    /// Leaving patient-data as a RETURNING patient requires a found lookup for the entered
    /// identifier; one is run here if the current search state does not already have it.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] for local failures,
    /// [`BookingError::LookupNotFound`] / [`BookingError::LookupFailed`] when the patient
    /// cannot be verified, and [`BookingError::InvalidTransition`] at confirmation or success.
    pub async fn advance(&mut self) -> BookingResult<Step> {
        self.ensure_open()?;
        let next = transition(self.step, StepEvent::Advance).ok_or(
            BookingError::InvalidTransition {
                from: self.step,
                event: StepEvent::Advance,
            },
        )?;

        if let Err(err) = validate_step(
            self.step,
            self.form.draft(),
            &self.context,
            self.config.insurance_keywords(),
        ) {
            return Err(self.reject(err));
        }

        if self.step == Step::PatientData
            && self.form.draft().patient_type == PatientType::Returning
            && self.verified_patient().is_none()
        {
            self.lookup_patient().await?;
            self.ensure_open()?;
        }

        tracing::debug!("wizard {} -> {}", self.step, next);
        self.step = next;
        self.persist();
        Ok(next)
    }

    /// Go back one step. Entered data is kept.
    pub fn retreat(&mut self) -> BookingResult<Step> {
        self.ensure_open()?;
        let invalid = BookingError::InvalidTransition {
            from: self.step,
            event: StepEvent::Retreat,
        };
        if self.step == self.initial_step {
            return Err(invalid);
        }
        let previous = transition(self.step, StepEvent::Retreat).ok_or(invalid)?;

        tracing::debug!("wizard {} <- {}", previous, self.step);
        self.step = previous;
        self.persist();
        Ok(previous)
    }

    /// Start over for `context`: clear the draft and its storage, recompute the initial step.
    pub fn reset(&mut self, context: WizardContext) {
        self.persistence.clear();

        let key = DraftPersistence::<S>::key_for(context.service, &context.provider_id);
        self.persistence.set_key(key);
        self.persistence.clear();

        self.initial_step = context.initial_step();
        self.form.reset(initial_draft(&self.session, &context));
        self.context = context;
        self.step = self.initial_step;
        self.resolver.invalidate();
        self.confirmation = None;
        self.closed = false;
        self.request_id = Uuid::new_v4();
        tracing::debug!("wizard reset at step {}", self.step);
    }

    /// Close the wizard and discard the draft along with its stored copy. Late lookup results
    /// are dropped.
    ///
    /// A session that is dropped without closing keeps its stored draft for [`Self::open`].
    pub fn close(&mut self) {
        tracing::debug!("wizard closed at step {}", self.step);
        self.persistence.clear();
        self.form.reset(initial_draft(&self.session, &self.context));
        self.step = self.initial_step;
        self.resolver.invalidate();
        self.closed = true;
    }

    /// Abandon the booking. Same as [`Self::close`].
    pub fn cancel(&mut self) {
        self.close();
    }

    // ========================================================================
    // Patient lookup
    // ========================================================================

    /// Start a lookup for the entered identifier.
    pub fn begin_lookup(&mut self) -> BookingResult<LookupTicket> {
        self.ensure_open()?;
        let identifier = self.form.draft().mr_number.clone();
        match self.resolver.begin(&identifier) {
            Ok(ticket) => Ok(ticket),
            Err(issue) => Err(self.reject(ValidationError::new(Step::PatientData, issue))),
        }
    }

    /// Apply a lookup result. Returns `false` when the result was stale or the wizard closed.
    pub fn finish_lookup(
        &mut self,
        ticket: &LookupTicket,
        result: SimrsResult<PatientSearchOutcome>,
    ) -> bool {
        if self.closed {
            tracing::debug!("dropping lookup result after close");
            return false;
        }
        if !self.resolver.complete(ticket, result) {
            return false;
        }

        let locale = self.locale();
        let notification = match self.resolver.state() {
            LookupState::Found { patient, .. } => {
                let patient = patient.clone();
                self.form.autofill(&patient);
                Notification::success(
                    Message::PatientFound {
                        name: &patient.full_name,
                    }
                    .render(locale),
                )
            }
            LookupState::NotFound { server_message, .. } => Notification::error(
                Message::PatientNotFound {
                    server: server_message.as_deref(),
                }
                .render(locale),
            ),
            _ => Notification::error(Message::LookupFailed.render(locale)),
        };
        self.notify(notification);
        self.persist();
        true
    }

    /// Look up the entered identifier and wait for the result.
    pub async fn lookup_patient(&mut self) -> BookingResult<PatientRecord> {
        let ticket = self.begin_lookup()?;
        let result = PatientResolver::fetch(&self.api, &ticket).await;
        self.finish_lookup(&ticket, result);

        let locale = self.locale();
        match self.resolver.state() {
            LookupState::Found { patient, .. } => Ok(patient.clone()),
            LookupState::NotFound { server_message, .. } => Err(BookingError::LookupNotFound {
                message: Message::PatientNotFound {
                    server: server_message.as_deref(),
                }
                .render(locale),
            }),
            _ if self.closed => Err(BookingError::Closed),
            _ => Err(BookingError::LookupFailed {
                message: Message::LookupFailed.render(locale),
            }),
        }
    }

    /// The patient found for the entered identifier, if any.
    pub fn verified_patient(&self) -> Option<&PatientRecord> {
        self.resolver
            .state()
            .found_for(&self.form.draft().mr_number)
    }

    // ========================================================================
    // Submission
    // ========================================================================

    /// True when the insurance number and class are required by the chosen payment.
    pub fn insurance_required(&self) -> bool {
        validation::is_insurance_payment(
            self.form.draft().payment.as_ref(),
            self.config.insurance_keywords(),
        )
    }

    /// True when the submit action may be enabled.
    pub fn can_submit(&self) -> bool {
        !self.closed
            && self.step == Step::Confirmation
            && validation::can_submit(self.form.draft(), self.config.insurance_keywords())
            && (self.form.draft().patient_type == PatientType::New
                || self.verified_patient().is_some())
    }

    /// Submit the booking from the confirmation step.
    ///
    /// On success the wizard moves to the success step and the stored draft is removed. On
    /// failure the wizard stays at confirmation; re-invoking resends the full request.
    pub async fn submit(&mut self) -> BookingResult<BookingConfirmation> {
        self.ensure_open()?;
        let next = transition(self.step, StepEvent::Submitted).ok_or(
            BookingError::InvalidTransition {
                from: self.step,
                event: StepEvent::Submitted,
            },
        )?;

        if self.form.draft().patient_type == PatientType::Returning
            && self.verified_patient().is_none()
        {
            return Err(self.reject(ValidationError::new(
                Step::PatientData,
                ValidationIssue::PatientNotVerified,
            )));
        }

        let request = match SubmissionClient::build_request(
            self.form.draft(),
            &self.context,
            self.verified_patient(),
            self.config.insurance_keywords(),
        ) {
            Ok(request) => request,
            Err(BookingError::Validation(err)) => return Err(self.reject(err)),
            Err(other) => return Err(other),
        };

        let request_id = self.request_id.to_string();
        let locale = self.locale();
        match SubmissionClient::submit(&self.api, &request, &request_id).await {
            Ok(confirmation) => {
                self.step = next;
                self.persistence.clear();

                let new_mr = confirmation
                    .new_mr_number
                    .as_deref()
                    .filter(|_| confirmation.is_new_patient);
                self.notify(Notification::success(
                    Message::BookingCreated {
                        code: &confirmation.booking_code,
                        new_mr,
                    }
                    .render(locale),
                ));
                self.confirmation = Some(confirmation.clone());
                Ok(confirmation)
            }
            Err(failure) => {
                self.notify(Notification::error(failure.message(locale)));
                Err(failure.into_error(locale))
            }
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn ensure_open(&self) -> BookingResult<()> {
        if self.closed {
            Err(BookingError::Closed)
        } else {
            Ok(())
        }
    }

    fn persist(&self) {
        self.persistence.save(self.step, self.form.draft());
    }

    fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    fn reject(&mut self, err: ValidationError) -> BookingError {
        tracing::debug!("validation failed: {}", err);
        self.notify(Notification::error(err.message(self.locale())));
        BookingError::Validation(err)
    }
}

fn lookup_key(draft: &BookingDraft) -> (PatientType, String) {
    (draft.patient_type, draft.mr_number.trim().to_string())
}

/// The draft a session starts with: the unambiguous department, and the signed-in patient
/// as a RETURNING patient.
fn initial_draft(session: &SessionContext, context: &WizardContext) -> BookingDraft {
    let mut draft = BookingDraft {
        poli: context.unambiguous_poli().cloned(),
        ..BookingDraft::default()
    };
    if let Some(user) = &session.user {
        draft.patient_type = PatientType::Returning;
        draft.mr_number = user.mr_number.to_string();
        draft.full_name = user.full_name.clone();
        draft.phone = user.phone.clone().unwrap_or_default();
    }
    draft
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AuthenticatedPatient, ServiceKind};
    use crate::draft::{Consents, DraftField};
    use crate::messages::NotificationLevel;
    use crate::persistence::MemoryDraftStore;
    use crate::test_support::{
        default_keywords, new_patient_draft, patient_record, payment, returning_draft, ApiCall,
        FakeSimrs, Scripted,
    };
    use booking_types::MedicalRecordNumber;
    use simrs::Poli;
    use std::path::PathBuf;

    type TestWizard<'a> = BookingWizard<&'a FakeSimrs, &'a MemoryDraftStore>;

    fn config() -> Arc<BookingConfig> {
        Arc::new(
            BookingConfig::new(
                "http://simrs.test/api".into(),
                None,
                PathBuf::from("unused"),
                default_keywords(),
                chrono::Duration::hours(24),
                Locale::En,
            )
            .expect("valid config"),
        )
    }

    fn context() -> WizardContext {
        WizardContext::new(ServiceKind::Appointment, "dr-042")
    }

    fn wizard<'a>(api: &'a FakeSimrs, store: &'a MemoryDraftStore) -> TestWizard<'a> {
        BookingWizard::new(
            api,
            store,
            config(),
            SessionContext::anonymous(Locale::En),
            context(),
        )
    }

    fn found(mr: &str) -> Scripted<PatientSearchOutcome> {
        Scripted::Ok(PatientSearchOutcome::Found(patient_record(mr)))
    }

    fn agree_all(w: &mut TestWizard<'_>) {
        for edit in [
            DraftEdit::ConsentTerms(true),
            DraftEdit::ConsentPrivacy(true),
            DraftEdit::ConsentFee(true),
        ] {
            w.apply(edit).expect("consent edit");
        }
    }

    async fn to_confirmation(w: &mut TestWizard<'_>, draft: BookingDraft) {
        w.import(draft).expect("import");
        while w.step() != Step::Confirmation {
            w.advance().await.expect("advance");
        }
    }

    #[tokio::test]
    async fn returning_patient_cannot_pass_patient_data_without_found_lookup() {
        let api = FakeSimrs::new();
        api.push_search(Scripted::Ok(PatientSearchOutcome::NotFound { message: None }));
        let store = MemoryDraftStore::new();
        let mut w = wizard(&api, &store);
        w.import(returning_draft()).expect("import");

        w.advance().await.expect("poli");
        w.advance().await.expect("schedule");
        let err = w.advance().await.expect_err("not found");

        assert!(matches!(err, BookingError::LookupNotFound { .. }));
        assert_eq!(w.step(), Step::PatientData);
        let notes = w.take_notifications();
        assert!(notes
            .iter()
            .any(|n| n.level == NotificationLevel::Error && n.message.contains("new patient")));

        api.push_search(found("000123"));
        assert_eq!(w.advance().await.expect("found"), Step::Confirmation);
        assert_eq!(
            api.calls(),
            vec![
                ApiCall::SearchByMr("000123".into()),
                ApiCall::SearchByMr("000123".into())
            ]
        );
    }

    #[tokio::test]
    async fn lookup_failure_does_not_block_switching_to_new_patient() {
        let api = FakeSimrs::new();
        api.push_search(Scripted::Translation("missing field `nm_pasien`".into()));
        let store = MemoryDraftStore::new();
        let mut w = wizard(&api, &store);
        w.import(returning_draft()).expect("import");
        w.advance().await.expect("poli");
        w.advance().await.expect("schedule");

        let err = w.advance().await.expect_err("lookup fails");
        assert!(matches!(err, BookingError::LookupFailed { .. }));

        let draft = new_patient_draft();
        w.import(draft).expect("switch to new");
        assert_eq!(w.lookup_state(), &LookupState::Idle);
        assert_eq!(w.advance().await.expect("new patient"), Step::Confirmation);
    }

    #[tokio::test]
    async fn new_patient_nik_must_have_sixteen_digits() {
        let api = FakeSimrs::new();
        let store = MemoryDraftStore::new();
        let mut w = wizard(&api, &store);
        let mut draft = new_patient_draft();
        draft.nik = "317123456789012".into();
        w.import(draft).expect("import");
        w.advance().await.expect("poli");
        w.advance().await.expect("schedule");

        let err = w.advance().await.expect_err("short nik");
        assert!(matches!(
            err,
            BookingError::Validation(ValidationError {
                issue: ValidationIssue::NikLength { actual: 15 },
                ..
            })
        ));
        assert!(api.calls().is_empty());

        w.apply(DraftEdit::Nik("3171234567890123".into()))
            .expect("fix nik");
        assert_eq!(w.advance().await.expect("valid nik"), Step::Confirmation);
    }

    #[tokio::test]
    async fn validation_failure_keeps_step_and_reports_field() {
        let api = FakeSimrs::new();
        let store = MemoryDraftStore::new();
        let mut w = wizard(&api, &store);

        let err = w.advance().await.expect_err("no poli");
        assert_eq!(w.step(), Step::PoliSelection);
        match err {
            BookingError::Validation(e) => assert_eq!(e.field(), DraftField::Poli),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(
            w.take_notifications()[0].message,
            "Please select a department first"
        );
    }

    #[tokio::test]
    async fn unambiguous_department_opens_at_schedule() {
        let api = FakeSimrs::new();
        let store = MemoryDraftStore::new();
        let lab = Poli {
            code: "LAB".into(),
            name: "Laboratorium".into(),
        };
        let ctx = WizardContext::new(ServiceKind::Lab, "lab-1").with_eligible_polis(vec![lab]);
        let mut w = BookingWizard::new(
            &api,
            &store,
            config(),
            SessionContext::default(),
            ctx,
        );

        assert_eq!(w.step(), Step::Schedule);
        assert_eq!(w.draft().poli.as_ref().map(|p| p.code.as_str()), Some("LAB"));
        assert!(matches!(
            w.retreat(),
            Err(BookingError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn retreat_keeps_entered_data() {
        let api = FakeSimrs::new();
        let store = MemoryDraftStore::new();
        let mut w = wizard(&api, &store);
        w.import(returning_draft()).expect("import");
        w.advance().await.expect("poli");

        assert!(w.retreat().is_ok());
        assert_eq!(w.step(), Step::PoliSelection);
        assert_eq!(w.draft().complaint, returning_draft().complaint);
        assert!(w.retreat().is_err());
    }

    #[tokio::test]
    async fn stale_lookup_after_identifier_change_is_dropped() {
        let api = FakeSimrs::new();
        let store = MemoryDraftStore::new();
        let mut w = wizard(&api, &store);
        w.import(returning_draft()).expect("import");

        let ticket = w.begin_lookup().expect("begin");
        w.apply(DraftEdit::MrNumber("000999".into()))
            .expect("retype");

        let late = Ok(PatientSearchOutcome::Found(patient_record("000123")));
        assert!(!w.finish_lookup(&ticket, late));
        assert_eq!(w.lookup_state(), &LookupState::Idle);
        assert!(w.take_notifications().is_empty());
    }

    #[tokio::test]
    async fn close_discards_draft_and_suppresses_late_lookup() {
        let api = FakeSimrs::new();
        let store = MemoryDraftStore::new();
        let mut w = wizard(&api, &store);
        w.import(returning_draft()).expect("import");
        let key = w.draft_key().to_string();
        assert!(store.load(&key).expect("memory load").is_some());

        let ticket = w.begin_lookup().expect("begin");
        w.close();

        let late = Ok(PatientSearchOutcome::Found(patient_record("000123")));
        assert!(!w.finish_lookup(&ticket, late));
        assert!(w.draft().full_name.is_empty());
        assert!(w.draft().mr_number.is_empty());
        assert!(matches!(w.advance().await, Err(BookingError::Closed)));
        assert!(store.load(&key).expect("memory load").is_none());
    }

    #[tokio::test]
    async fn imported_draft_is_filled_by_found_lookup() {
        let api = FakeSimrs::new();
        api.push_search(found("000123"));
        let store = MemoryDraftStore::new();
        let mut w = wizard(&api, &store);
        w.import(returning_draft()).expect("import");

        let patient = w.lookup_patient().await.expect("found");

        assert_eq!(w.draft().full_name, patient.full_name);
        assert_eq!(w.draft().birth_date, patient.birth_date);
        assert_eq!(w.draft().gender, patient.gender);
        assert_eq!(w.draft().complaint, "Demam tiga hari");
    }

    #[tokio::test]
    async fn retyping_same_identifier_keeps_verified_patient() {
        let api = FakeSimrs::new();
        api.push_search(found("000123"));
        let store = MemoryDraftStore::new();
        let mut w = wizard(&api, &store);
        w.import(returning_draft()).expect("import");
        w.lookup_patient().await.expect("found");

        w.apply(DraftEdit::MrNumber(" 000123 ".into())).expect("retype");
        assert!(w.verified_patient().is_some());

        w.apply(DraftEdit::PatientType(PatientType::New)).expect("type");
        assert_eq!(w.lookup_state(), &LookupState::Idle);
    }

    #[tokio::test]
    async fn merge_keeps_fields_the_new_draft_leaves_empty() {
        let api = FakeSimrs::new();
        let store = MemoryDraftStore::new();
        let mut w = wizard(&api, &store);
        w.import(new_patient_draft()).expect("import");

        w.merge(BookingDraft {
            complaint: "Batuk kering dua minggu".into(),
            ..BookingDraft::default()
        })
        .expect("merge");

        assert_eq!(w.draft().complaint, "Batuk kering dua minggu");
        assert_eq!(w.draft().nik, new_patient_draft().nik);
        assert_eq!(w.draft().full_name, new_patient_draft().full_name);
    }

    #[tokio::test]
    async fn found_patient_fills_only_untouched_fields() {
        let api = FakeSimrs::new();
        api.push_search(found("000123"));
        let store = MemoryDraftStore::new();
        let mut w = wizard(&api, &store);
        w.apply(DraftEdit::PatientType(PatientType::Returning))
            .expect("type");
        w.apply(DraftEdit::MrNumber("000123".into())).expect("rm");
        w.apply(DraftEdit::Phone("089900001111".into())).expect("phone");

        let patient = w.lookup_patient().await.expect("found");

        assert_eq!(w.draft().full_name, patient.full_name);
        assert_eq!(w.draft().phone, "089900001111");
        assert_eq!(w.take_notifications()[0].level, NotificationLevel::Success);
    }

    #[tokio::test]
    async fn short_identifier_never_reaches_the_network() {
        let api = FakeSimrs::new();
        let store = MemoryDraftStore::new();
        let mut w = wizard(&api, &store);
        w.apply(DraftEdit::MrNumber("12".into())).expect("rm");

        assert!(matches!(
            w.lookup_patient().await,
            Err(BookingError::Validation(_))
        ));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn submit_requires_every_consent() {
        let api = FakeSimrs::new();
        let store = MemoryDraftStore::new();
        let mut w = wizard(&api, &store);
        to_confirmation(&mut w, new_patient_draft()).await;

        assert!(!w.can_submit());
        agree_all(&mut w);
        assert!(w.can_submit());

        w.apply(DraftEdit::ConsentPrivacy(false)).expect("toggle");
        assert!(!w.can_submit());
        assert!(matches!(
            w.submit().await,
            Err(BookingError::Validation(_))
        ));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn insurance_payment_requires_insurance_fields() {
        let api = FakeSimrs::new();
        let store = MemoryDraftStore::new();
        let mut w = wizard(&api, &store);
        let mut draft = new_patient_draft();
        draft.payment = Some(payment("BPJ", "BPJS KESEHATAN"));
        to_confirmation(&mut w, draft).await;
        agree_all(&mut w);

        assert!(w.insurance_required());
        assert!(!w.can_submit());

        w.apply(DraftEdit::Payment(Some(payment("UMU", "UMUM/TUNAI"))))
            .expect("cash");
        assert!(!w.insurance_required());
        assert!(w.can_submit());
    }

    #[tokio::test]
    async fn successful_submission_clears_draft_and_reports_new_rm() {
        let api = FakeSimrs::new();
        api.push_booking(Scripted::Ok(BookingConfirmation {
            booking_code: "BK-20261019-001".into(),
            message: None,
            is_new_patient: true,
            new_mr_number: Some("000987".into()),
        }));
        let store = MemoryDraftStore::new();
        let mut w = wizard(&api, &store);
        to_confirmation(&mut w, new_patient_draft()).await;
        agree_all(&mut w);
        let key = w.draft_key().to_string();
        assert!(store.load(&key).expect("memory load").is_some());
        w.take_notifications();

        let confirmation = w.submit().await.expect("booked");

        assert_eq!(confirmation.booking_code, "BK-20261019-001");
        assert_eq!(w.step(), Step::Success);
        assert!(store.load(&key).expect("memory load").is_none());
        let notes = w.take_notifications();
        assert_eq!(notes.len(), 1);
        assert!(notes[0].message.contains("000987"));
        assert!(matches!(
            w.retreat(),
            Err(BookingError::InvalidTransition { .. })
        ));
        assert_eq!(
            api.calls(),
            vec![ApiCall::CreateAppointment {
                request_id: w.request_id().to_string()
            }]
        );
    }

    #[tokio::test]
    async fn rate_limited_submission_gets_throttling_message() {
        let api = FakeSimrs::new();
        api.push_search(found("000123"));
        api.push_booking(Scripted::Status(429, Some("Too Many Requests".into())));
        let store = MemoryDraftStore::new();
        let mut w = wizard(&api, &store);
        to_confirmation(&mut w, returning_draft()).await;
        agree_all(&mut w);
        w.take_notifications();

        let err = w.submit().await.expect_err("throttled");

        assert!(matches!(err, BookingError::SubmissionRateLimited { .. }));
        assert_eq!(w.step(), Step::Confirmation);
        let notes = w.take_notifications();
        assert_eq!(
            notes[0].message,
            Message::SubmissionRateLimited.render(Locale::En)
        );
        assert_ne!(notes[0].message, Message::SubmissionFailed.render(Locale::En));
    }

    #[tokio::test]
    async fn rejected_submission_shows_server_message() {
        let api = FakeSimrs::new();
        api.push_booking(Scripted::Status(422, Some("Kuota poli penuh".into())));
        let store = MemoryDraftStore::new();
        let mut w = wizard(&api, &store);
        to_confirmation(&mut w, new_patient_draft()).await;
        agree_all(&mut w);
        w.take_notifications();

        let err = w.submit().await.expect_err("rejected");

        assert!(matches!(
            err,
            BookingError::SubmissionRejected { status: 422, .. }
        ));
        assert_eq!(w.take_notifications()[0].message, "Kuota poli penuh");
    }

    #[tokio::test]
    async fn open_resumes_stored_draft() {
        let api = FakeSimrs::new();
        let store = MemoryDraftStore::new();
        {
            let mut w = wizard(&api, &store);
            w.import(new_patient_draft()).expect("import");
            w.advance().await.expect("poli");
        }

        let w = BookingWizard::open(
            &api,
            &store,
            config(),
            SessionContext::anonymous(Locale::En),
            context(),
        )
        .await;

        assert_eq!(w.step(), Step::Schedule);
        assert_eq!(w.draft(), &new_patient_draft());
    }

    #[tokio::test]
    async fn resume_at_confirmation_demotes_when_patient_not_found() {
        let api = FakeSimrs::new();
        api.push_search(found("000123"));
        let store = MemoryDraftStore::new();
        {
            let mut w = wizard(&api, &store);
            to_confirmation(&mut w, returning_draft()).await;
        }

        let w = BookingWizard::open(
            &api,
            &store,
            config(),
            SessionContext::anonymous(Locale::En),
            context(),
        )
        .await;

        assert_eq!(w.step(), Step::PatientData);
        assert!(matches!(w.lookup_state(), LookupState::NotFound { .. }));
    }

    #[tokio::test]
    async fn resume_at_confirmation_reverifies_returning_patient() {
        let api = FakeSimrs::new();
        api.push_search(found("000123"));
        api.push_search(found("000123"));
        let store = MemoryDraftStore::new();
        {
            let mut w = wizard(&api, &store);
            to_confirmation(&mut w, returning_draft()).await;
        }

        let mut w = BookingWizard::open(
            &api,
            &store,
            config(),
            SessionContext::anonymous(Locale::En),
            context(),
        )
        .await;

        assert_eq!(w.step(), Step::Confirmation);
        assert!(w.verified_patient().is_some());
        assert!(!w.draft().consents.all());
        agree_all(&mut w);
        assert!(w.can_submit());
    }

    #[tokio::test]
    async fn reset_clears_draft_and_storage() {
        let api = FakeSimrs::new();
        let store = MemoryDraftStore::new();
        let mut w = wizard(&api, &store);
        w.import(returning_draft()).expect("import");
        w.advance().await.expect("poli");
        let old_key = w.draft_key().to_string();
        let first_request = w.request_id();

        let lab = Poli {
            code: "LAB".into(),
            name: "Laboratorium".into(),
        };
        w.reset(WizardContext::new(ServiceKind::Lab, "lab-1").with_eligible_polis(vec![lab]));

        assert_eq!(w.step(), Step::Schedule);
        assert_eq!(w.draft().complaint, "");
        assert!(store.load(&old_key).expect("memory load").is_none());
        assert_ne!(w.request_id(), first_request);
    }

    #[tokio::test]
    async fn cancel_clears_storage_and_closes() {
        let api = FakeSimrs::new();
        let store = MemoryDraftStore::new();
        let mut w = wizard(&api, &store);
        w.import(returning_draft()).expect("import");
        let key = w.draft_key().to_string();

        w.cancel();

        assert!(w.is_closed());
        assert!(store.load(&key).expect("memory load").is_none());
        assert!(matches!(
            w.apply(DraftEdit::Complaint("x".into())),
            Err(BookingError::Closed)
        ));
    }

    #[tokio::test]
    async fn signed_in_user_starts_as_returning_patient() {
        let api = FakeSimrs::new();
        let store = MemoryDraftStore::new();
        let user = AuthenticatedPatient {
            mr_number: MedicalRecordNumber::parse("000123").expect("rm"),
            full_name: "SITI AMINAH".into(),
            phone: None,
        };
        let w: TestWizard<'_> = BookingWizard::new(
            &api,
            &store,
            config(),
            SessionContext::signed_in(user, Locale::Id),
            context(),
        );

        assert_eq!(w.draft().patient_type, PatientType::Returning);
        assert_eq!(w.draft().mr_number, "000123");
        assert_eq!(w.locale(), Locale::Id);
        assert_eq!(w.draft().consents, Consents::default());
    }
}
