use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::Deserialize;
use shared::domain::AccountId;
use url::Url;

pub const DEFAULT_SETTINGS_FILE: &str = "transfer_xml.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_base_url: String,
    pub api_token: Option<String>,
    pub default_account_id: Option<AccountId>,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000/api/".into(),
            api_token: None,
            default_account_id: None,
            request_timeout_secs: 30,
        }
    }
}

impl Settings {
    pub fn base_url(&self) -> Result<Url> {
        let url = Url::parse(self.api_base_url.trim())
            .with_context(|| format!("invalid api base url '{}'", self.api_base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("api base url must be http or https, got '{}'", url.scheme());
        }
        Ok(url)
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_base_url: Option<String>,
    api_token: Option<String>,
    default_account_id: Option<i64>,
    request_timeout_secs: Option<u64>,
}

/// Defaults, then `transfer_xml.toml` in the working directory, then the environment.
pub fn load_settings() -> Result<Settings> {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE))
}

pub fn load_settings_from(path: &Path) -> Result<Settings> {
    let mut settings = Settings::default();

    if path.exists() {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
        apply_file(&mut settings, &raw)
            .with_context(|| format!("failed to parse settings file '{}'", path.display()))?;
    }

    apply_env(&mut settings, |key| std::env::var(key).ok())?;
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file_cfg.api_base_url {
        settings.api_base_url = v;
    }
    if let Some(v) = file_cfg.api_token {
        settings.api_token = Some(v);
    }
    if let Some(v) = file_cfg.default_account_id {
        settings.default_account_id = Some(AccountId(v));
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout_secs = v;
    }
    Ok(())
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) -> Result<()> {
    if let Some(v) = var("TRANSFER_XML_API_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = var("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }

    if let Some(v) = var("APP__API_TOKEN") {
        settings.api_token = Some(v);
    }

    if let Some(v) = var("APP__DEFAULT_ACCOUNT_ID") {
        let id = v
            .trim()
            .parse::<i64>()
            .with_context(|| format!("APP__DEFAULT_ACCOUNT_ID is not an integer: '{v}'"))?;
        settings.default_account_id = Some(AccountId(id));
    }

    if let Some(v) = var("APP__REQUEST_TIMEOUT_SECS") {
        settings.request_timeout_secs = v.trim().parse::<u64>().with_context(|| {
            format!("APP__REQUEST_TIMEOUT_SECS is not a number of seconds: '{v}'")
        })?;
    }

    Ok(())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
