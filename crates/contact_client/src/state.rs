use shared::{
    domain::ContactField,
    protocol::ContactRequest,
    validation::{helper_text, FieldError},
};
use thiserror::Error;

pub const SUCCESS_MESSAGE: &str = "Thank you for reaching out.\nI look forward to speaking with you.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl FormData {
    pub fn get(&self, field: ContactField) -> &str {
        match field {
            ContactField::Name => &self.name,
            ContactField::Email => &self.email,
            ContactField::Message => &self.message,
        }
    }

    pub fn set(&mut self, field: ContactField, value: String) {
        match field {
            ContactField::Name => self.name = value,
            ContactField::Email => self.email = value,
            ContactField::Message => self.message = value,
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.email.is_empty() && self.message.is_empty()
    }

    pub fn to_request(&self) -> ContactRequest {
        ContactRequest {
            name: self.name.clone(),
            email: self.email.clone(),
            message: self.message.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct FieldValidation {
    touched: bool,
    error: Option<FieldError>,
}

/// Per-field validation results. A field that was never edited carries no
/// error even when empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationState {
    name: FieldValidation,
    email: FieldValidation,
    message: FieldValidation,
}

impl ValidationState {
    fn slot(&self, field: ContactField) -> &FieldValidation {
        match field {
            ContactField::Name => &self.name,
            ContactField::Email => &self.email,
            ContactField::Message => &self.message,
        }
    }

    fn slot_mut(&mut self, field: ContactField) -> &mut FieldValidation {
        match field {
            ContactField::Name => &mut self.name,
            ContactField::Email => &mut self.email,
            ContactField::Message => &mut self.message,
        }
    }

    pub fn touch(&mut self, field: ContactField) {
        self.slot_mut(field).touched = true;
    }

    pub fn is_touched(&self, field: ContactField) -> bool {
        self.slot(field).touched
    }

    pub fn set(&mut self, field: ContactField, result: Result<(), FieldError>) {
        self.slot_mut(field).error = result.err();
    }

    pub fn error(&self, field: ContactField) -> Option<&FieldError> {
        self.slot(field).error.as_ref()
    }

    /// The error text for `field`, or an empty string when it has none.
    pub fn message(&self, field: ContactField) -> String {
        self.error(field).map(ToString::to_string).unwrap_or_default()
    }

    pub fn has_errors(&self) -> bool {
        ContactField::ALL
            .iter()
            .any(|field| self.error(*field).is_some())
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Errors reported by a finished submission. None of them is retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionFailure {
    #[error("Failed to submit contact information. Response: {reason}")]
    ServerRejected { reason: String },
    #[error("Failed to submit contact information.\nPlease try again shortly.")]
    ParseFailure,
    #[error("Failed to submit contact information. Request timed out.")]
    Timeout,
    #[error("Failed to submit contact information. Please try again later.")]
    GenericFailure,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SubmissionState {
    #[default]
    Idle,
    Submitting,
    Succeeded,
    Failed(SubmissionFailure),
}

impl SubmissionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed(_))
    }

    /// Outcome text shown in place of the form.
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Idle | Self::Submitting => None,
            Self::Succeeded => Some(SUCCESS_MESSAGE.to_string()),
            Self::Failed(failure) => Some(failure.to_string()),
        }
    }
}

/// Whether `form` may be submitted given `validation`.
///
/// The length checks keep an untouched, empty form from counting as valid.
pub fn form_is_valid(form: &FormData, validation: &ValidationState) -> bool {
    !validation.has_errors()
        && !form.name.is_empty()
        && !form.email.is_empty()
        && !form.message.is_empty()
}

/// Point-in-time copy of everything the dialog renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogSnapshot {
    pub form: FormData,
    pub validation: ValidationState,
    pub submission: SubmissionState,
}

impl DialogSnapshot {
    pub fn is_valid(&self) -> bool {
        form_is_valid(&self.form, &self.validation)
    }

    pub fn error_message(&self, field: ContactField) -> String {
        self.validation.message(field)
    }

    pub fn helper_text(&self, field: ContactField) -> String {
        helper_text(field, self.form.get(field), self.validation.error(field))
    }

    pub fn form_visible(&self) -> bool {
        self.submission.is_idle()
    }

    pub fn spinner_visible(&self) -> bool {
        self.submission == SubmissionState::Submitting
    }

    pub fn can_send(&self) -> bool {
        self.submission.is_idle() && self.is_valid()
    }

    /// Close is shown but disabled while a request is in flight.
    pub fn can_close(&self) -> bool {
        self.submission != SubmissionState::Submitting
    }
}
