use serde::{Deserialize, Serialize};

pub const CONTACT_ROUTE: &str = "/contact";

/// JSON body of `POST /contact`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub message: String,
}
