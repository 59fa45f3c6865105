use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Deserialize;
use tracing::warn;

pub const SETTINGS_FILE: &str = "server.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_bind: String,
    pub database_url: String,
    pub max_body_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8080".into(),
            database_url: "sqlite://./data/contacts.db".into(),
            max_body_bytes: 16 * 1024,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    bind_addr: Option<String>,
    database_url: Option<String>,
    max_body_bytes: Option<usize>,
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();
    if let Ok(raw) = fs::read_to_string(SETTINGS_FILE) {
        settings.apply_file(&raw);
    }
    settings.apply_env(|key| std::env::var(key).ok());
    settings
}

impl Settings {
    fn apply_file(&mut self, raw: &str) {
        let file_cfg = match toml::from_str::<FileSettings>(raw) {
            Ok(file_cfg) => file_cfg,
            Err(error) => {
                warn!(%error, file = SETTINGS_FILE, "ignoring unreadable settings file");
                return;
            }
        };
        if let Some(v) = file_cfg.bind_addr {
            self.server_bind = v;
        }
        if let Some(v) = file_cfg.database_url {
            self.database_url = v;
        }
        if let Some(v) = file_cfg.max_body_bytes {
            self.max_body_bytes = v;
        }
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for key in ["SERVER_BIND", "APP__BIND_ADDR"] {
            if let Some(v) = lookup(key) {
                self.server_bind = v;
            }
        }
        for key in ["DATABASE_URL", "APP__DATABASE_URL"] {
            if let Some(v) = lookup(key) {
                self.database_url = v;
            }
        }
        if let Some(v) = lookup("APP__MAX_BODY_BYTES") {
            match v.parse::<usize>() {
                Ok(parsed) => self.max_body_bytes = parsed,
                Err(error) => warn!(%error, value = %v, "ignoring APP__MAX_BODY_BYTES"),
            }
        }
    }
}

pub fn prepare_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    ensure_parent_dir_exists(&database_url)?;
    Ok(database_url)
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite:") || raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

fn ensure_parent_dir_exists(database_url: &str) -> anyhow::Result<()> {
    let Some(parent) = sqlite_path(database_url)
        .as_deref()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
    else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }

    fs::create_dir_all(&parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(PathBuf::from(path))
}
