//! Contact dialog controller: field state, validation, and the submission
//! lifecycle against `POST /contact`.

pub mod config;
pub mod debounce;
pub mod deadline;
pub mod dialog;
pub mod state;
pub mod transport;

pub use config::{load_settings, ClientSettings};
pub use dialog::{ContactDialog, DialogError, DialogEvent};
pub use shared::{domain::ContactField, protocol::ContactRequest, validation::FieldError};
pub use state::{DialogSnapshot, FormData, SubmissionFailure, SubmissionState, ValidationState};
pub use transport::{ContactTransport, HttpContactTransport, SubmitOutcome, TransportError};
