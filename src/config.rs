//! Runtime configuration.
//!
//! Server flags come from the CLI (see `main.rs`); the shared-passcode gate
//! is configured from the environment so the same binary can be deployed
//! with or without it.

use thiserror::Error;

pub const DEFAULT_AUTH_COOKIE_NAME: &str = "release_tracker_auth";
pub const AUTH_COOKIE_VALUE: &str = "authenticated";
/// Seven days, in seconds.
pub const AUTH_COOKIE_MAX_AGE: u64 = 7 * 24 * 60 * 60;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("ENABLE_PASSCODE is true but PASSCODE is not set")]
    MissingPasscode,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PasscodeConfig {
    pub enabled: bool,
    pub passcode: Option<String>,
    pub cookie_name: String,
}

impl Default for PasscodeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            passcode: None,
            cookie_name: DEFAULT_AUTH_COOKIE_NAME.to_string(),
        }
    }
}

impl PasscodeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. `from_env` passes the
    /// process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let enabled = lookup("ENABLE_PASSCODE")
            .map(|value| value.trim() == "true")
            .unwrap_or(false);
        let passcode = lookup("PASSCODE").filter(|value| !value.is_empty());
        let cookie_name = lookup("AUTH_COOKIE_NAME")
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_AUTH_COOKIE_NAME.to_string());

        if enabled && passcode.is_none() {
            return Err(ConfigError::MissingPasscode);
        }

        Ok(Self {
            enabled,
            passcode,
            cookie_name,
        })
    }

    pub fn enabled_with(passcode: impl Into<String>) -> Self {
        Self {
            enabled: true,
            passcode: Some(passcode.into()),
            cookie_name: DEFAULT_AUTH_COOKIE_NAME.to_string(),
        }
    }

    pub fn verify(&self, candidate: &str) -> bool {
        match &self.passcode {
            Some(passcode) => passcode == candidate,
            None => false,
        }
    }
}
