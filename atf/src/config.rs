//! Runtime settings for searches, input pacing and the remote session.

use crate::errors::AutomationError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const ENV_ACTION_DELAY_MS: &str = "ATF_ACTION_DELAY_MS";
pub const ENV_RETRY_DELAY_MS: &str = "ATF_RETRY_DELAY_MS";
pub const ENV_RETRY_COUNT: &str = "ATF_RETRY_COUNT";
pub const ENV_MACHINE_URL: &str = "ATF_MACHINE_URL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// WinAppDriver/Appium server reached over HTTP.
    #[default]
    Remote,
    /// In-process UI Automation tree (Windows only).
    Accessibility,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Pause between input actions.
    pub action_delay_ms: u64,
    /// Pause between two search attempts.
    pub retry_delay_ms: u64,
    /// Maximum number of search attempts.
    pub retry_count: u32,
    /// Tick of `wait_for` polling loops.
    pub wait_poll_interval_ms: u64,
    /// Upper bound of `wait_for` when the caller gives none.
    pub wait_default_timeout_ms: u64,
    /// Which automation backend drives the session.
    pub backend: Backend,
    /// Automation server, e.g. `http://127.0.0.1:4723`.
    pub machine_url: String,
    pub device_name: String,
    pub platform_name: String,
    pub new_command_timeout_secs: u64,
    /// Title of the application under test, if any.
    pub host_title: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            action_delay_ms: 200,
            retry_delay_ms: 500,
            retry_count: 5,
            wait_poll_interval_ms: 1000,
            wait_default_timeout_ms: 60_000,
            backend: Backend::Remote,
            machine_url: "http://127.0.0.1:4723".to_string(),
            device_name: "WindowsPC".to_string(),
            platform_name: "Windows".to_string(),
            new_command_timeout_secs: 60,
            host_title: None,
        }
    }
}

impl Settings {
    pub fn from_json_str(json: &str) -> Result<Self, AutomationError> {
        let settings: Settings = serde_json::from_str(json)
            .map_err(|e| AutomationError::Config(format!("invalid settings: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AutomationError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AutomationError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&content)
    }

    /// Applies `ATF_*` environment overrides on top of the loaded values.
    pub fn with_env_overrides(self) -> Result<Self, AutomationError> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AutomationError> {
        if let Some(v) = lookup(ENV_ACTION_DELAY_MS) {
            self.action_delay_ms = parse_number(ENV_ACTION_DELAY_MS, &v)?;
        }
        if let Some(v) = lookup(ENV_RETRY_DELAY_MS) {
            self.retry_delay_ms = parse_number(ENV_RETRY_DELAY_MS, &v)?;
        }
        if let Some(v) = lookup(ENV_RETRY_COUNT) {
            self.retry_count = parse_number(ENV_RETRY_COUNT, &v)?;
        }
        if let Some(v) = lookup(ENV_MACHINE_URL) {
            self.machine_url = v;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), AutomationError> {
        if self.retry_count == 0 {
            return Err(AutomationError::Config(
                "retry_count must allow at least one attempt".to_string(),
            ));
        }
        if self.wait_poll_interval_ms == 0 {
            return Err(AutomationError::Config(
                "wait_poll_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn action_delay(&self) -> Duration {
        Duration::from_millis(self.action_delay_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn wait_poll_interval(&self) -> Duration {
        Duration::from_millis(self.wait_poll_interval_ms)
    }

    pub fn wait_default_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_default_timeout_ms)
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, AutomationError> {
    value
        .trim()
        .parse()
        .map_err(|_| AutomationError::Config(format!("{name} is not a number: {value:?}")))
}
