//! The contact dialog controller.
//!
//! One [`ContactDialog`] owns the form fields, their validation and the
//! submission lifecycle of a single dialog. The surrounding UI only owns the
//! open flag and is told about closes through the callback given to
//! [`ContactDialog::new`].

use std::sync::Arc;

use shared::{
    domain::ContactField,
    error::ContactRejected,
    protocol::ContactRequest,
    validation::{validate_field, validate_message, FieldError},
};
use thiserror::Error;
use tokio::{
    sync::{broadcast, Mutex},
    time::Instant,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    config::ClientSettings,
    deadline::SubmissionDeadline,
    debounce::Debouncer,
    state::{
        form_is_valid, DialogSnapshot, FormData, SubmissionFailure, SubmissionState,
        ValidationState,
    },
    transport::{ContactTransport, SubmitOutcome, TransportError},
};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogEvent {
    FieldValidated {
        field: ContactField,
        error: Option<FieldError>,
    },
    SubmissionChanged(SubmissionState),
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DialogError {
    #[error("the form cannot be edited while the dialog shows {0:?}")]
    FormUnavailable(SubmissionState),
    #[error("a submission cannot start while the dialog shows {0:?}")]
    NotIdle(SubmissionState),
    #[error("the form has missing or invalid fields")]
    InvalidForm,
}

struct DialogState {
    form: FormData,
    validation: ValidationState,
    submission: SubmissionState,
    /// Cancelled when the dialog closes; outstanding work checks it before
    /// touching state.
    session: CancellationToken,
    message_check: Debouncer,
}

impl DialogState {
    fn new(settings: &ClientSettings) -> Self {
        Self {
            form: FormData::default(),
            validation: ValidationState::default(),
            submission: SubmissionState::Idle,
            session: CancellationToken::new(),
            message_check: Debouncer::new(settings.message_debounce),
        }
    }

    /// False once the dialog is closing, even while a deferred reset still
    /// shows the old form.
    fn accepts_input(&self) -> bool {
        self.submission.is_idle() && !self.session.is_cancelled()
    }

    fn reset(&mut self) {
        self.message_check.cancel();
        self.form.clear();
        self.validation.clear();
        self.submission = SubmissionState::Idle;
        self.session = CancellationToken::new();
    }

    fn snapshot(&self) -> DialogSnapshot {
        DialogSnapshot {
            form: self.form.clone(),
            validation: self.validation.clone(),
            submission: self.submission.clone(),
        }
    }
}

fn apply_validation(
    state: &mut DialogState,
    events: &broadcast::Sender<DialogEvent>,
    field: ContactField,
    result: Result<(), FieldError>,
) {
    let error = result.as_ref().err().cloned();
    state.validation.set(field, result);
    let _ = events.send(DialogEvent::FieldValidated { field, error });
}

fn set_submission(
    state: &mut DialogState,
    events: &broadcast::Sender<DialogEvent>,
    submission: SubmissionState,
) {
    state.submission = submission.clone();
    let _ = events.send(DialogEvent::SubmissionChanged(submission));
}

pub struct ContactDialog {
    inner: Arc<Mutex<DialogState>>,
    transport: Arc<dyn ContactTransport>,
    settings: ClientSettings,
    on_close: Box<dyn Fn() + Send + Sync>,
    events: broadcast::Sender<DialogEvent>,
}

impl ContactDialog {
    pub fn new(
        transport: Arc<dyn ContactTransport>,
        settings: ClientSettings,
        on_close: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Mutex::new(DialogState::new(&settings))),
            transport,
            settings,
            on_close: Box::new(on_close),
            events,
        }
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DialogEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> DialogSnapshot {
        self.inner.lock().await.snapshot()
    }

    pub async fn submission_state(&self) -> SubmissionState {
        self.inner.lock().await.submission.clone()
    }

    /// Applies one edit. Name and email are validated immediately; the
    /// message is validated once typing pauses for `message_debounce`.
    pub async fn update_field(
        &self,
        field: ContactField,
        value: impl Into<String>,
    ) -> Result<(), DialogError> {
        let mut state = self.inner.lock().await;
        if !state.accepts_input() {
            return Err(DialogError::FormUnavailable(state.submission.clone()));
        }

        state.form.set(field, value.into());
        state.validation.touch(field);
        match field {
            ContactField::Message => self.schedule_message_validation(&mut state),
            ContactField::Name | ContactField::Email => {
                let result = validate_field(field, state.form.get(field));
                apply_validation(&mut state, &self.events, field, result);
            }
        }
        Ok(())
    }

    fn schedule_message_validation(&self, state: &mut DialogState) {
        let inner = Arc::clone(&self.inner);
        let events = self.events.clone();
        let session = state.session.clone();
        state.message_check.schedule(move || async move {
            let mut state = inner.lock().await;
            if session.is_cancelled() {
                return;
            }
            let result = validate_message(&state.form.message);
            apply_validation(&mut state, &events, ContactField::Message, result);
        });
    }

    /// Runs one submission to completion and returns the state it ended in.
    ///
    /// If the dialog is closed while the request is in flight the request is
    /// cancelled and its outcome is discarded.
    pub async fn submit(&self) -> Result<SubmissionState, DialogError> {
        let (request, session) = {
            let mut state = self.inner.lock().await;
            if !state.accepts_input() {
                return Err(DialogError::NotIdle(state.submission.clone()));
            }
            if state.message_check.cancel() {
                let result = validate_message(&state.form.message);
                apply_validation(&mut state, &self.events, ContactField::Message, result);
            }
            if !form_is_valid(&state.form, &state.validation) {
                debug!(
                    name_error = %state.validation.message(ContactField::Name),
                    email_error = %state.validation.message(ContactField::Email),
                    message_error = %state.validation.message(ContactField::Message),
                    "contact submission blocked by validation"
                );
                return Err(DialogError::InvalidForm);
            }
            set_submission(&mut state, &self.events, SubmissionState::Submitting);
            (state.form.to_request(), state.session.clone())
        };

        let started = Instant::now();
        let mut deadline = SubmissionDeadline::arm(&session, self.settings.submit_timeout);
        let outcome = self.deliver(&request, &deadline).await;
        deadline.disarm();

        let mut state = self.inner.lock().await;
        if session.is_cancelled() {
            debug!("dialog closed during submission; discarding outcome");
            return Ok(state.submission.clone());
        }
        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            outcome = ?outcome,
            "contact submission finished"
        );
        set_submission(&mut state, &self.events, outcome.clone());
        Ok(outcome)
    }

    async fn deliver(
        &self,
        request: &ContactRequest,
        deadline: &SubmissionDeadline,
    ) -> SubmissionState {
        let cancel = deadline.token().clone();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return cancelled_outcome(deadline),
            _ = tokio::time::sleep(self.settings.submit_delay) => {}
        }

        match self.transport.post_contact(request, cancel).await {
            Ok(SubmitOutcome::Accepted) => SubmissionState::Succeeded,
            Ok(SubmitOutcome::Rejected { status, body }) => {
                match serde_json::from_str::<ContactRejected>(&body) {
                    Ok(rejected) => {
                        warn!(status, reason = %rejected.reason, "contact submission rejected");
                        SubmissionState::Failed(SubmissionFailure::ServerRejected {
                            reason: rejected.reason,
                        })
                    }
                    Err(parse_error) => {
                        error!(
                            status,
                            %parse_error,
                            "failed to submit contact information; unreadable rejection body"
                        );
                        SubmissionState::Failed(SubmissionFailure::ParseFailure)
                    }
                }
            }
            Err(TransportError::Cancelled) => cancelled_outcome(deadline),
            Err(transport_error) => {
                error!(%transport_error, "failed to submit contact information");
                SubmissionState::Failed(SubmissionFailure::GenericFailure)
            }
        }
    }

    /// Notifies the parent, abandons any outstanding work and clears the
    /// dialog. Allowed in every state, including mid-submission.
    pub async fn close(&self) {
        (self.on_close)();
        {
            let mut state = self.inner.lock().await;
            state.session.cancel();
            state.message_check.cancel();
        }

        if !self.settings.close_reset_delay.is_zero() {
            tokio::time::sleep(self.settings.close_reset_delay).await;
        }

        self.inner.lock().await.reset();
        let _ = self.events.send(DialogEvent::Reset);
    }
}

fn cancelled_outcome(deadline: &SubmissionDeadline) -> SubmissionState {
    if deadline.timed_out() {
        SubmissionState::Failed(SubmissionFailure::Timeout)
    } else {
        // Only a close cancels without timing out; its outcome is discarded.
        SubmissionState::Failed(SubmissionFailure::GenericFailure)
    }
}

#[cfg(test)]
#[path = "tests/dialog_tests.rs"]
mod tests;
