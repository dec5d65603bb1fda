use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone)]
pub struct Settings {
    pub addr: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
    pub max_retries: usize,
    pub base_url: String,
    pub validate_relationship_matrix: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:5000".to_string(),
            model: "gpt-4".to_string(),
            max_tokens: 1500,
            temperature: 0.0,
            timeout: Duration::from_secs(60),
            max_retries: 1,
            base_url: "https://api.openai.com/v1".to_string(),
            validate_relationship_matrix: false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    server: Option<ServerSettings>,
    model: Option<ModelSettings>,
    breakdown: Option<BreakdownSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSettings {
    addr: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ModelSettings {
    name: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    timeout_secs: Option<u64>,
    max_retries: Option<usize>,
    base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BreakdownSettings {
    validate_relationship_matrix: Option<bool>,
}

/// Loads the embedded defaults, then `settings.toml` and `settings.local.toml`
/// from the working directory, then `extra_path` when given. Later files win.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut ordered_paths = vec![
        PathBuf::from("settings.toml"),
        PathBuf::from("settings.local.toml"),
    ];

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    load_settings_from(&ordered_paths)
}

pub(crate) fn load_settings_from(paths: &[PathBuf]) -> Result<Settings> {
    let mut settings = Settings::default();
    let defaults: SettingsFile =
        toml::from_str(DEFAULT_SETTINGS_TOML).with_context(|| "failed to parse default settings")?;
    settings.merge(defaults);

    for path in paths {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }

    if let Some(base_url) = get_env("OPENAI_BASE_URL") {
        settings.base_url = base_url;
    }

    Ok(settings)
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(server) = incoming.server {
            if let Some(addr) = server.addr {
                if !addr.trim().is_empty() {
                    self.addr = addr;
                }
            }
        }
        if let Some(model) = incoming.model {
            if let Some(name) = model.name {
                if !name.trim().is_empty() {
                    self.model = name;
                }
            }
            if let Some(max_tokens) = model.max_tokens {
                if max_tokens > 0 {
                    self.max_tokens = max_tokens;
                }
            }
            if let Some(temperature) = model.temperature {
                if temperature >= 0.0 {
                    self.temperature = temperature;
                }
            }
            if let Some(secs) = model.timeout_secs {
                if secs > 0 {
                    self.timeout = Duration::from_secs(secs);
                }
            }
            if let Some(retries) = model.max_retries {
                self.max_retries = retries;
            }
            if let Some(base_url) = model.base_url {
                if !base_url.trim().is_empty() {
                    self.base_url = base_url.trim_end_matches('/').to_string();
                }
            }
        }
        if let Some(breakdown) = incoming.breakdown {
            if let Some(validate) = breakdown.validate_relationship_matrix {
                self.validate_relationship_matrix = validate;
            }
        }
    }
}

fn get_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().trim_end_matches('/').to_string())
        .filter(|value| !value.is_empty())
}
