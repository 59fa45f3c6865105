use super::*;
use async_trait::async_trait;
use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

#[derive(Debug, Clone)]
enum Script {
    Accept,
    Reject { status: u16, body: &'static str },
    Unavailable,
    Hang,
}

struct ScriptedTransport {
    script: Script,
    requests: Mutex<Vec<ContactRequest>>,
}

impl ScriptedTransport {
    fn new(script: Script) -> Self {
        Self {
            script,
            requests: Mutex::new(Vec::new()),
        }
    }

    async fn calls(&self) -> usize {
        self.requests.lock().await.len()
    }
}

#[async_trait]
impl ContactTransport for ScriptedTransport {
    async fn post_contact(
        &self,
        request: &ContactRequest,
        cancel: CancellationToken,
    ) -> Result<SubmitOutcome, TransportError> {
        self.requests.lock().await.push(request.clone());
        match &self.script {
            Script::Accept => Ok(SubmitOutcome::Accepted),
            Script::Reject { status, body } => Ok(SubmitOutcome::Rejected {
                status: *status,
                body: body.to_string(),
            }),
            Script::Unavailable => Err(TransportError::Other("connection refused".into())),
            Script::Hang => {
                cancel.cancelled().await;
                Err(TransportError::Cancelled)
            }
        }
    }
}

struct Harness {
    dialog: Arc<ContactDialog>,
    transport: Arc<ScriptedTransport>,
    closes: Arc<AtomicUsize>,
}

fn harness_with(script: Script, settings: ClientSettings) -> Harness {
    let transport = Arc::new(ScriptedTransport::new(script));
    let closes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&closes);
    let dialog = ContactDialog::new(transport.clone(), settings, move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    Harness {
        dialog: Arc::new(dialog),
        transport,
        closes,
    }
}

fn harness(script: Script) -> Harness {
    harness_with(script, ClientSettings::default())
}

async fn fill_valid_form(dialog: &ContactDialog) {
    dialog
        .update_field(ContactField::Name, "Ursula Le Guin")
        .await
        .expect("name");
    dialog
        .update_field(ContactField::Email, "ursula@example.com")
        .await
        .expect("email");
    dialog
        .update_field(ContactField::Message, "Looking for a backend developer")
        .await
        .expect("message");
    tokio::time::sleep(Duration::from_millis(600)).await;
}

fn drain(rx: &mut broadcast::Receiver<DialogEvent>) -> Vec<DialogEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn assert_cleared(snapshot: &DialogSnapshot) {
    assert!(snapshot.form.is_empty(), "form not cleared: {:?}", snapshot.form);
    assert_eq!(snapshot.validation, ValidationState::default());
    assert_eq!(snapshot.submission, SubmissionState::Idle);
}

#[tokio::test(start_paused = true)]
async fn accepted_submission_goes_idle_submitting_succeeded() {
    let h = harness(Script::Accept);
    fill_valid_form(&h.dialog).await;
    assert!(h.dialog.snapshot().await.can_send());

    let mut rx = h.dialog.subscribe();
    let started = Instant::now();
    let outcome = h.dialog.submit().await.expect("submit");

    assert_eq!(outcome, SubmissionState::Succeeded);
    assert!(started.elapsed() >= Duration::from_millis(500));
    assert_eq!(
        drain(&mut rx),
        vec![
            DialogEvent::SubmissionChanged(SubmissionState::Submitting),
            DialogEvent::SubmissionChanged(SubmissionState::Succeeded),
        ]
    );

    let requests = h.transport.requests.lock().await;
    assert_eq!(
        *requests,
        vec![ContactRequest {
            name: "Ursula Le Guin".into(),
            email: "ursula@example.com".into(),
            message: "Looking for a backend developer".into(),
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn rejection_reason_is_shown_to_the_user() {
    let h = harness(Script::Reject {
        status: 400,
        body: r#"{"reason":"spam detected"}"#,
    });
    fill_valid_form(&h.dialog).await;

    let outcome = h.dialog.submit().await.expect("submit");
    assert_eq!(
        outcome,
        SubmissionState::Failed(SubmissionFailure::ServerRejected {
            reason: "spam detected".into()
        })
    );
    let message = outcome.message().expect("message");
    assert!(message.contains("spam detected"), "{message}");
}

#[tokio::test(start_paused = true)]
async fn unreadable_rejection_is_a_parse_failure() {
    let h = harness(Script::Reject {
        status: 500,
        body: "Something went wrong, please try again.",
    });
    fill_valid_form(&h.dialog).await;

    let outcome = h.dialog.submit().await.expect("submit");
    assert_eq!(
        outcome,
        SubmissionState::Failed(SubmissionFailure::ParseFailure)
    );
    assert!(outcome
        .message()
        .is_some_and(|m| m.contains("Please try again shortly")));
}

#[tokio::test(start_paused = true)]
async fn transport_failure_is_generic() {
    let h = harness(Script::Unavailable);
    fill_valid_form(&h.dialog).await;

    let outcome = h.dialog.submit().await.expect("submit");
    assert_eq!(
        outcome,
        SubmissionState::Failed(SubmissionFailure::GenericFailure)
    );
    assert!(outcome
        .message()
        .is_some_and(|m| m.contains("Please try again later")));
}

#[tokio::test(start_paused = true)]
async fn hanging_endpoint_times_out_after_five_seconds() {
    let h = harness(Script::Hang);
    fill_valid_form(&h.dialog).await;

    let started = Instant::now();
    let outcome = h.dialog.submit().await.expect("submit");

    assert_eq!(started.elapsed(), Duration::from_millis(5000));
    assert_eq!(outcome, SubmissionState::Failed(SubmissionFailure::Timeout));
    assert!(outcome.message().is_some_and(|m| m.contains("timed out")));
    assert_eq!(h.transport.calls().await, 1);
}

#[tokio::test(start_paused = true)]
async fn timeout_counts_from_submission_start_including_delay() {
    let settings = ClientSettings {
        submit_timeout: Duration::from_millis(300),
        ..ClientSettings::default()
    };
    let h = harness_with(Script::Accept, settings);
    fill_valid_form(&h.dialog).await;

    let started = Instant::now();
    let outcome = h.dialog.submit().await.expect("submit");

    assert_eq!(outcome, SubmissionState::Failed(SubmissionFailure::Timeout));
    assert_eq!(started.elapsed(), Duration::from_millis(300));
    assert_eq!(h.transport.calls().await, 0);
}

#[tokio::test(start_paused = true)]
async fn closing_mid_submission_resets_and_discards_the_outcome() {
    let h = harness(Script::Hang);
    fill_valid_form(&h.dialog).await;

    let submit = tokio::spawn({
        let dialog = Arc::clone(&h.dialog);
        async move { dialog.submit().await }
    });
    tokio::time::sleep(Duration::from_millis(1000)).await;
    let snapshot = h.dialog.snapshot().await;
    assert!(snapshot.spinner_visible());
    assert!(!snapshot.can_close());

    h.dialog.close().await;
    assert_eq!(h.closes.load(Ordering::SeqCst), 1);
    assert_cleared(&h.dialog.snapshot().await);

    let finished = submit.await.expect("join").expect("submit");
    assert!(!finished.is_terminal(), "outcome leaked after close: {finished:?}");

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_cleared(&h.dialog.snapshot().await);
}

#[tokio::test(start_paused = true)]
async fn closing_after_any_outcome_resets_the_dialog() {
    for script in [Script::Accept, Script::Unavailable] {
        let h = harness(script);
        fill_valid_form(&h.dialog).await;
        let outcome = h.dialog.submit().await.expect("submit");
        assert!(outcome.is_terminal());

        let mut rx = h.dialog.subscribe();
        h.dialog.close().await;
        assert_cleared(&h.dialog.snapshot().await);
        assert_eq!(drain(&mut rx), vec![DialogEvent::Reset]);
        assert_eq!(h.closes.load(Ordering::SeqCst), 1);
    }
}

#[tokio::test(start_paused = true)]
async fn dialog_is_reusable_after_close() {
    let h = harness(Script::Accept);
    fill_valid_form(&h.dialog).await;
    h.dialog.submit().await.expect("first submit");
    h.dialog.close().await;

    fill_valid_form(&h.dialog).await;
    let outcome = h.dialog.submit().await.expect("second submit");
    assert_eq!(outcome, SubmissionState::Succeeded);
    assert_eq!(h.transport.calls().await, 2);
}

#[tokio::test(start_paused = true)]
async fn untouched_form_is_invalid_and_shows_no_errors() {
    let h = harness(Script::Accept);

    let err = h.dialog.submit().await.expect_err("invalid");
    assert_eq!(err, DialogError::InvalidForm);

    let snapshot = h.dialog.snapshot().await;
    for field in ContactField::ALL {
        assert_eq!(snapshot.error_message(field), "");
        assert!(!snapshot.validation.is_touched(field));
    }
    assert!(!snapshot.can_send());
    assert_eq!(h.transport.calls().await, 0);
}

#[tokio::test(start_paused = true)]
async fn clearing_a_touched_field_shows_required() {
    let h = harness(Script::Accept);
    h.dialog
        .update_field(ContactField::Email, "u@example.com")
        .await
        .expect("email");
    h.dialog
        .update_field(ContactField::Email, "")
        .await
        .expect("email");

    let snapshot = h.dialog.snapshot().await;
    assert_eq!(
        snapshot.validation.error(ContactField::Email),
        Some(&FieldError::Required)
    );
    assert_eq!(
        snapshot.helper_text(ContactField::Email),
        "This field is required"
    );
}

#[tokio::test(start_paused = true)]
async fn illegal_name_blocks_sending() {
    let h = harness(Script::Accept);
    fill_valid_form(&h.dialog).await;
    h.dialog
        .update_field(ContactField::Name, "Ursula (admin) (root)")
        .await
        .expect("name");

    let snapshot = h.dialog.snapshot().await;
    assert_eq!(
        snapshot.validation.error(ContactField::Name),
        Some(&FieldError::IllegalCharacters(vec!['(', ')']))
    );
    assert!(!snapshot.can_send());
    assert_eq!(
        h.dialog.submit().await.expect_err("invalid"),
        DialogError::InvalidForm
    );
}

#[tokio::test(start_paused = true)]
async fn message_validation_waits_for_typing_to_pause() {
    let h = harness(Script::Accept);
    h.dialog
        .update_field(ContactField::Message, "<b>hi</b>")
        .await
        .expect("message");

    assert_eq!(h.dialog.snapshot().await.error_message(ContactField::Message), "");
    tokio::time::sleep(Duration::from_millis(499)).await;
    assert_eq!(h.dialog.snapshot().await.error_message(ContactField::Message), "");

    tokio::time::sleep(Duration::from_millis(2)).await;
    assert_eq!(
        h.dialog
            .snapshot()
            .await
            .validation
            .error(ContactField::Message),
        Some(&FieldError::ContainsMarkup)
    );
}

#[tokio::test(start_paused = true)]
async fn only_the_last_message_edit_is_validated() {
    let h = harness(Script::Accept);
    let mut rx = h.dialog.subscribe();

    for text in ["<", "<b", "<b>x</b>", "hello"] {
        h.dialog
            .update_field(ContactField::Message, text)
            .await
            .expect("message");
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    tokio::time::sleep(Duration::from_millis(600)).await;

    assert_eq!(
        drain(&mut rx),
        vec![DialogEvent::FieldValidated {
            field: ContactField::Message,
            error: None
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn submit_validates_a_message_still_waiting_on_debounce() {
    let h = harness(Script::Accept);
    fill_valid_form(&h.dialog).await;
    h.dialog
        .update_field(ContactField::Message, "<script>x</script>")
        .await
        .expect("message");

    assert_eq!(
        h.dialog.submit().await.expect_err("invalid"),
        DialogError::InvalidForm
    );
    assert_eq!(
        h.dialog
            .snapshot()
            .await
            .validation
            .error(ContactField::Message),
        Some(&FieldError::ContainsMarkup)
    );
    assert_eq!(h.transport.calls().await, 0);
}

#[tokio::test(start_paused = true)]
async fn edits_are_refused_once_the_form_is_hidden() {
    let h = harness(Script::Accept);
    fill_valid_form(&h.dialog).await;
    h.dialog.submit().await.expect("submit");

    let err = h
        .dialog
        .update_field(ContactField::Name, "Someone else")
        .await
        .expect_err("hidden form");
    assert_eq!(err, DialogError::FormUnavailable(SubmissionState::Succeeded));
}

#[tokio::test(start_paused = true)]
async fn only_one_submission_may_be_in_flight() {
    let h = harness(Script::Hang);
    fill_valid_form(&h.dialog).await;

    let first = tokio::spawn({
        let dialog = Arc::clone(&h.dialog);
        async move { dialog.submit().await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(
        h.dialog.submit().await.expect_err("busy"),
        DialogError::NotIdle(SubmissionState::Submitting)
    );

    let outcome = first.await.expect("join").expect("submit");
    assert_eq!(outcome, SubmissionState::Failed(SubmissionFailure::Timeout));
    assert_eq!(h.transport.calls().await, 1);
}

#[tokio::test(start_paused = true)]
async fn deferred_reset_notifies_parent_before_clearing() {
    let settings = ClientSettings {
        close_reset_delay: Duration::from_millis(500),
        ..ClientSettings::default()
    };
    let h = harness_with(Script::Accept, settings);
    fill_valid_form(&h.dialog).await;

    let close = tokio::spawn({
        let dialog = Arc::clone(&h.dialog);
        async move { dialog.close().await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(h.closes.load(Ordering::SeqCst), 1);
    assert!(!h.dialog.snapshot().await.form.is_empty());

    close.await.expect("join");
    assert_cleared(&h.dialog.snapshot().await);
}

#[tokio::test(start_paused = true)]
async fn closing_dialog_refuses_edits_and_submits_until_reset() {
    let settings = ClientSettings {
        close_reset_delay: Duration::from_millis(500),
        ..ClientSettings::default()
    };
    let h = harness_with(Script::Accept, settings);
    fill_valid_form(&h.dialog).await;

    let close = tokio::spawn({
        let dialog = Arc::clone(&h.dialog);
        async move { dialog.close().await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let err = h
        .dialog
        .update_field(ContactField::Name, "Late edit")
        .await
        .expect_err("edit while closing");
    assert_eq!(err, DialogError::FormUnavailable(SubmissionState::Idle));
    let err = h.dialog.submit().await.expect_err("submit while closing");
    assert_eq!(err, DialogError::NotIdle(SubmissionState::Idle));
    assert_eq!(h.transport.calls().await, 0);
    assert_eq!(h.dialog.submission_state().await, SubmissionState::Idle);

    close.await.expect("join");
    assert_cleared(&h.dialog.snapshot().await);
    h.dialog
        .update_field(ContactField::Name, "Ursula")
        .await
        .expect("editable after reset");
}

#[tokio::test(start_paused = true)]
async fn closing_discards_a_pending_message_validation() {
    let h = harness(Script::Accept);
    h.dialog
        .update_field(ContactField::Message, "<b>x</b>")
        .await
        .expect("message");
    h.dialog.close().await;

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_cleared(&h.dialog.snapshot().await);
}
