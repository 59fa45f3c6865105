use std::{fs, path::Path, time::Duration};

use anyhow::Context;
use serde::Deserialize;
use tracing::warn;
use url::Url;

pub const SETTINGS_FILE: &str = "contact.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub endpoint: String,
    /// Measured from the start of a submission, not from the last activity.
    pub submit_timeout: Duration,
    /// Pause before the request is issued so the spinner has time to appear.
    pub submit_delay: Duration,
    pub message_debounce: Duration,
    /// Delay between the close notification and the reset of the fields.
    pub close_reset_delay: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8080/contact".into(),
            submit_timeout: Duration::from_millis(5000),
            submit_delay: Duration::from_millis(500),
            message_debounce: Duration::from_millis(500),
            close_reset_delay: Duration::ZERO,
        }
    }
}

impl ClientSettings {
    pub fn endpoint_url(&self) -> anyhow::Result<Url> {
        Url::parse(&self.endpoint)
            .with_context(|| format!("invalid contact endpoint '{}'", self.endpoint))
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    endpoint: Option<String>,
    submit_timeout_ms: Option<u64>,
    submit_delay_ms: Option<u64>,
    message_debounce_ms: Option<u64>,
    close_reset_delay_ms: Option<u64>,
}

/// Defaults, then `contact.toml` in the working directory, then the environment.
pub fn load_settings() -> ClientSettings {
    load_settings_from(Path::new(SETTINGS_FILE))
}

pub fn load_settings_from(path: &Path) -> ClientSettings {
    let mut settings = ClientSettings::default();
    if let Ok(raw) = fs::read_to_string(path) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file(settings: &mut ClientSettings, raw: &str) {
    let file_cfg = match toml::from_str::<FileSettings>(raw) {
        Ok(file_cfg) => file_cfg,
        Err(error) => {
            warn!(%error, "ignoring unreadable contact settings file");
            return;
        }
    };
    if let Some(v) = file_cfg.endpoint {
        settings.endpoint = v;
    }
    if let Some(v) = file_cfg.submit_timeout_ms {
        settings.submit_timeout = Duration::from_millis(v);
    }
    if let Some(v) = file_cfg.submit_delay_ms {
        settings.submit_delay = Duration::from_millis(v);
    }
    if let Some(v) = file_cfg.message_debounce_ms {
        settings.message_debounce = Duration::from_millis(v);
    }
    if let Some(v) = file_cfg.close_reset_delay_ms {
        settings.close_reset_delay = Duration::from_millis(v);
    }
}

fn apply_env(settings: &mut ClientSettings, lookup: impl Fn(&str) -> Option<String>) {
    for key in ["CONTACT_ENDPOINT", "APP__CONTACT_ENDPOINT"] {
        if let Some(v) = lookup(key) {
            settings.endpoint = v;
        }
    }

    let millis = |key: &str| -> Option<Duration> {
        let raw = lookup(key)?;
        match raw.parse::<u64>() {
            Ok(ms) => Some(Duration::from_millis(ms)),
            Err(error) => {
                warn!(%error, key, value = %raw, "ignoring non-numeric duration");
                None
            }
        }
    };
    if let Some(v) = millis("APP__SUBMIT_TIMEOUT_MS") {
        settings.submit_timeout = v;
    }
    if let Some(v) = millis("APP__SUBMIT_DELAY_MS") {
        settings.submit_delay = v;
    }
    if let Some(v) = millis("APP__MESSAGE_DEBOUNCE_MS") {
        settings.message_debounce = v;
    }
    if let Some(v) = millis("APP__CLOSE_RESET_DELAY_MS") {
        settings.close_reset_delay = v;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_match_dialog_timings() {
        let settings = ClientSettings::default();
        assert_eq!(settings.submit_timeout, Duration::from_millis(5000));
        assert_eq!(settings.submit_delay, Duration::from_millis(500));
        assert_eq!(settings.message_debounce, Duration::from_millis(500));
        assert_eq!(settings.close_reset_delay, Duration::ZERO);
        assert_eq!(
            settings.endpoint_url().expect("url").path(),
            "/contact"
        );
    }

    #[test]
    fn file_overrides_only_named_keys() {
        let mut settings = ClientSettings::default();
        apply_file(
            &mut settings,
            r#"
            endpoint = "https://example.com/contact"
            close_reset_delay_ms = 500
            "#,
        );
        assert_eq!(settings.endpoint, "https://example.com/contact");
        assert_eq!(settings.close_reset_delay, Duration::from_millis(500));
        assert_eq!(settings.submit_timeout, Duration::from_millis(5000));
    }

    #[test]
    fn env_overrides_file_and_skips_bad_numbers() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("CONTACT_ENDPOINT", "http://a/contact"),
            ("APP__CONTACT_ENDPOINT", "http://b/contact"),
            ("APP__SUBMIT_TIMEOUT_MS", "250"),
            ("APP__SUBMIT_DELAY_MS", "soon"),
        ]);
        let mut settings = ClientSettings::default();
        apply_env(&mut settings, |key| env.get(key).map(|v| v.to_string()));

        assert_eq!(settings.endpoint, "http://b/contact");
        assert_eq!(settings.submit_timeout, Duration::from_millis(250));
        assert_eq!(settings.submit_delay, Duration::from_millis(500));
    }

    #[test]
    fn invalid_endpoint_is_reported() {
        let settings = ClientSettings {
            endpoint: "not a url".into(),
            ..ClientSettings::default()
        };
        assert!(settings.endpoint_url().is_err());
    }
}
