use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const NAME_MAX_CHARS: usize = 256;
pub const MESSAGE_MAX_CHARS: usize = 1024;
pub const FORBIDDEN_NAME_CHARACTERS: [char; 9] = ['/', '(', ')', '"', '<', '>', '\\', '{', '}'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactField {
    Name,
    Email,
    Message,
}

impl ContactField {
    pub const ALL: [ContactField; 3] = [ContactField::Name, ContactField::Email, ContactField::Message];

    pub fn as_str(self) -> &'static str {
        match self {
            ContactField::Name => "name",
            ContactField::Email => "email",
            ContactField::Message => "message",
        }
    }

    /// Character limit enforced on the field, if any.
    pub fn max_chars(self) -> Option<usize> {
        match self {
            ContactField::Name => Some(NAME_MAX_CHARS),
            ContactField::Email => None,
            ContactField::Message => Some(MESSAGE_MAX_CHARS),
        }
    }
}

impl std::fmt::Display for ContactField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable identifier of a contact, derived from the submitter's email.
///
/// The namespace must never change: existing rows are keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContactId(pub Uuid);

impl ContactId {
    pub fn for_email(email: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_DNS, email.as_bytes()))
    }
}

impl std::fmt::Display for ContactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
