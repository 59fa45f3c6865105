use std::{
    path::PathBuf,
    process::ExitCode,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use anyhow::Result;
use clap::Parser;
use contact_client::{
    config::{load_settings_from, SETTINGS_FILE},
    ContactDialog, ContactField, DialogError, HttpContactTransport, SubmissionState,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Sends one message through the contact form.
#[derive(Parser, Debug)]
struct Args {
    /// Overrides the endpoint from the settings file and environment.
    #[arg(long)]
    endpoint: Option<String>,
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    message: String,
    #[arg(long, default_value = SETTINGS_FILE)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();
    let args = Args::parse();

    let mut settings = load_settings_from(&args.config);
    if let Some(endpoint) = args.endpoint {
        settings.endpoint = endpoint;
    }
    let transport = Arc::new(HttpContactTransport::new(settings.endpoint_url()?));

    let open = Arc::new(AtomicBool::new(true));
    let dialog = ContactDialog::new(transport, settings, {
        let open = Arc::clone(&open);
        move || {
            open.store(false, Ordering::SeqCst);
            debug!("contact dialog closed");
        }
    });

    for (field, value) in [
        (ContactField::Name, args.name),
        (ContactField::Email, args.email),
        (ContactField::Message, args.message),
    ] {
        dialog.update_field(field, value).await?;
    }

    let exit = match dialog.submit().await {
        Ok(outcome) => report(&outcome),
        Err(DialogError::InvalidForm) => {
            let snapshot = dialog.snapshot().await;
            for field in ContactField::ALL {
                let error = snapshot.error_message(field);
                if !error.is_empty() {
                    eprintln!("{field}: {error}");
                }
            }
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    };

    dialog.close().await;
    info!(open = open.load(Ordering::SeqCst), "contact session finished");
    Ok(exit)
}

fn report(outcome: &SubmissionState) -> ExitCode {
    if let Some(message) = outcome.message() {
        println!("{message}");
    }
    match outcome {
        SubmissionState::Succeeded => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    }
}
