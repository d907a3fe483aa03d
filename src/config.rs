/// Configuration resolution module
///
/// This module handles:
/// - Locating and parsing `relatorios.toml`
/// - Environment overrides (API URL, bearer token)
/// - Layering CLI flags on top of the file
/// - Building the viewer's session context
use crate::cli::CliArgs;
use crate::error::ConfigError;
use crate::types::{SessionContext, UserRole};
use log::debug;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "relatorios.toml";
pub const CONFIG_ENV: &str = "LICITACAO_CONFIG";
pub const API_URL_ENV: &str = "LICITACAO_API_URL";
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_TOKEN_ENV: &str = "LICITACAO_TOKEN";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Http,
    File,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub kind: StoreKind,
    pub path: Option<PathBuf>,
}

impl StoreSettings {
    /// File store location, defaulting next to the user config
    pub fn file_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|d| d.join("licitacao-relatorios").join("relatorios.json"))
                .unwrap_or_else(|| PathBuf::from("relatorios.json"))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub user_name: String,
    pub role: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self { user_name: String::new(), role: "admin".to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_base_url: String,
    /// Name of the environment variable holding the bearer token
    pub auth_token_env: String,
    pub output_dir: PathBuf,
    pub store: StoreSettings,
    pub session: SessionSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            auth_token_env: DEFAULT_TOKEN_ENV.to_string(),
            output_dir: PathBuf::from("relatorios"),
            store: StoreSettings::default(),
            session: SessionSettings::default(),
        }
    }
}

impl Settings {
    /// Parse settings from TOML text; absent keys keep their defaults
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Apply environment overrides through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(API_URL_ENV).filter(|u| !u.trim().is_empty()) {
            debug!("API base URL overridden by {}", API_URL_ENV);
            self.api_base_url = url;
        }
    }

    /// Apply command-line flags, which win over file and environment
    pub fn apply_cli(&mut self, args: &CliArgs) {
        if let Some(ref url) = args.api_url {
            self.api_base_url = url.clone();
        }
        if let Some(ref path) = args.store_file {
            self.store.kind = StoreKind::File;
            self.store.path = Some(path.clone());
        }
        if let Some(ref dir) = args.output_dir {
            self.output_dir = dir.clone();
        }
        if let Some(ref user) = args.user {
            self.session.user_name = user.clone();
        }
        if let Some(ref role) = args.role {
            self.session.role = role.clone();
        }
    }

    /// Bearer token from the configured environment variable, if set
    pub fn auth_token<F>(&self, lookup: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        lookup(&self.auth_token_env).filter(|t| !t.trim().is_empty())
    }

    pub fn session_context(&self) -> Result<SessionContext, ConfigError> {
        let role = UserRole::parse(&self.session.role).ok_or_else(|| ConfigError::InvalidRole(self.session.role.clone()))?;
        Ok(SessionContext::new(self.session.user_name.clone(), role))
    }
}

/// Locate the config file.
///
/// An explicit path (flag or `LICITACAO_CONFIG`) is returned as-is so a
/// typo is reported; the fallback locations are used only when they exist.
pub fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Ok(path) = env::var(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }

    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return Some(local);
    }
    dirs::config_dir().map(|d| d.join("licitacao-relatorios").join(CONFIG_FILE_NAME)).filter(|p| p.exists())
}

/// Read settings from `path`, or defaults when there is no config file
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let Some(path) = path else {
        debug!("No config file found, using defaults");
        return Ok(Settings::default());
    };

    debug!("Loading config from {:?}", path);
    let text =
        fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?;
    Settings::from_toml(&text)
}

/// Resolve the full configuration for a CLI invocation
pub fn resolve(args: &CliArgs) -> Result<Settings, ConfigError> {
    let path = config_path(args.config.as_deref());
    let mut settings = load_settings(path.as_deref())?;
    settings.apply_env(|key| env::var(key).ok());
    settings.apply_cli(args);
    debug!("Resolved settings: {:?}", settings);
    Ok(settings)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
