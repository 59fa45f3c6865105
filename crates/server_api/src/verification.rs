//! Server-side verification of submitted contact forms.
//!
//! Stricter than the dialog: whitespace-only values are refused and the
//! email address must be well formed.

use shared::{
    protocol::ContactRequest,
    validation::{validate_message, validate_name},
};
use validator::ValidateEmail;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserName(String);

impl UserName {
    pub fn parse(s: String) -> Result<Self, String> {
        if s.trim().is_empty() {
            return Err("User name cannot be empty".into());
        }
        validate_name(&s).map_err(|err| format!("name: {err}"))?;
        Ok(Self(s))
    }
}

impl AsRef<str> for UserName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEmail(String);

impl UserEmail {
    pub fn parse(s: String) -> Result<Self, String> {
        if s.validate_email() {
            Ok(Self(s))
        } else {
            Err(format!("{s} is not a valid email."))
        }
    }
}

impl AsRef<str> for UserEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactMessage(String);

impl ContactMessage {
    pub fn parse(s: String) -> Result<Self, String> {
        if s.trim().is_empty() {
            return Err("Please provide a message.".into());
        }
        validate_message(&s).map_err(|err| format!("message: {err}"))?;
        Ok(Self(s))
    }
}

impl AsRef<str> for ContactMessage {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedContactForm {
    pub name: UserName,
    pub email: UserEmail,
    pub message: ContactMessage,
}

impl TryFrom<ContactRequest> for VerifiedContactForm {
    type Error = String;

    fn try_from(value: ContactRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            name: UserName::parse(value.name)?,
            email: UserEmail::parse(value.email)?,
            message: ContactMessage::parse(value.message)?,
        })
    }
}
