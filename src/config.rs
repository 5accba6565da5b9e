//! Runtime settings, read from an optional JSON file and overridden by CLI
//! flags.

use crate::application::composer::{
    DEFAULT_CURRENCY_SYMBOL, DEFAULT_REPORT_LIMIT, MessageComposer,
};
use crate::application::dispatch::{DEFAULT_DELAY, DEFAULT_SEND_TIMEOUT, DispatchOptions};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchSettings {
    /// Signed so that a negative value in a config file is reported rather
    /// than failing to parse.
    pub delay_ms: i64,
    pub timeout_ms: i64,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            delay_ms: DEFAULT_DELAY.as_millis() as i64,
            timeout_ms: DEFAULT_SEND_TIMEOUT.as_millis() as i64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    pub limit: usize,
    pub currency_symbol: String,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            limit: DEFAULT_REPORT_LIMIT,
            currency_symbol: DEFAULT_CURRENCY_SYMBOL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookSettings {
    pub url: String,
    #[serde(default)]
    pub bearer_token: Option<String>,
    /// HTTP-level bound on one request, independent of the dispatch timeout.
    #[serde(default = "default_webhook_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_webhook_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub dispatch: DispatchSettings,
    pub report: ReportSettings,
    pub webhook: Option<WebhookSettings>,
    pub outbox_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dispatch: DispatchSettings::default(),
            report: ReportSettings::default(),
            webhook: None,
            outbox_path: PathBuf::from("outbox.jsonl"),
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let settings = serde_json::from_str(&raw)?;
        Ok(settings)
    }

    /// Loads `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn dispatch_options(&self) -> Result<DispatchOptions> {
        DispatchOptions::from_millis(self.dispatch.delay_ms, self.dispatch.timeout_ms)
    }

    pub fn composer(&self) -> MessageComposer {
        MessageComposer::new(self.report.currency_symbol.clone(), self.report.limit)
    }
}
