use shared::{
    domain::ContactId,
    error::{ApiException, ErrorCode},
    protocol::ContactRequest,
};
use storage::{NewContactMessage, Storage};
use tracing::{info, warn};

mod verification;

pub use verification::{ContactMessage, UserEmail, UserName, VerifiedContactForm};

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
}

pub fn contact_route() -> &'static str {
    shared::protocol::CONTACT_ROUTE
}

pub async fn submit_contact(
    ctx: &ApiContext,
    request: ContactRequest,
) -> Result<ContactId, ApiException> {
    let form = VerifiedContactForm::try_from(request).map_err(|reason| {
        warn!(%reason, "contact submission rejected");
        ApiException::validation(reason)
    })?;

    let contact_id = ctx
        .storage
        .record_contact(NewContactMessage {
            name: form.name.as_ref(),
            email: form.email.as_ref(),
            message: form.message.as_ref(),
        })
        .await
        .map_err(internal)?;

    info!(%contact_id, "contact submission stored");
    Ok(contact_id)
}

pub async fn health(ctx: &ApiContext) -> Result<(), ApiException> {
    ctx.storage.health_check().await.map_err(internal)
}

fn internal(err: anyhow::Error) -> ApiException {
    ApiException::new(ErrorCode::Internal, format!("{err:#}"))
}
