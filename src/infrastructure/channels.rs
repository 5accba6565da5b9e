use crate::config::{Settings, WebhookSettings};
use crate::domain::ports::{MessageChannel, MessageChannelBox};
use crate::error::{ArrearsError, ChannelError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Which delivery mechanism to dispatch through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// Print messages instead of sending them.
    #[default]
    Console,
    /// Append messages to a JSON-lines file picked up by an external sender.
    Outbox,
    /// POST each message to an HTTP endpoint.
    Webhook,
}

impl FromStr for ChannelKind {
    type Err = ArrearsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "console" => Ok(ChannelKind::Console),
            "outbox" => Ok(ChannelKind::Outbox),
            "webhook" => Ok(ChannelKind::Webhook),
            other => Err(ArrearsError::InvalidInput(format!(
                "unknown channel '{other}' (expected console, outbox or webhook)"
            ))),
        }
    }
}

/// Builds the channel selected by `kind` from settings.
pub fn build_channel(kind: ChannelKind, settings: &Settings) -> Result<MessageChannelBox> {
    match kind {
        ChannelKind::Console => Ok(Box::new(ConsoleChannel::new(std::io::stdout()))),
        ChannelKind::Outbox => {
            let path = settings.outbox_path.clone();
            Ok(Box::new(OutboxChannel::new(path)))
        }
        ChannelKind::Webhook => {
            let webhook = settings.webhook.as_ref().ok_or_else(|| {
                ArrearsError::InvalidInput(
                    "webhook channel selected but no webhook url configured".into(),
                )
            })?;
            Ok(Box::new(WebhookChannel::new(webhook.clone())?))
        }
    }
}

/// Writes each message to a `Write` sink.
pub struct ConsoleChannel<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> ConsoleChannel<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl<W: Write + Send> MessageChannel for ConsoleChannel<W> {
    fn name(&self) -> &str {
        "console"
    }

    async fn send(&self, phone: &str, text: &str) -> std::result::Result<(), ChannelError> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| ChannelError::Transport("console writer poisoned".into()))?;
        writeln!(out, "--- to {phone} ---")?;
        writeln!(out, "{text}")?;
        writeln!(out)?;
        out.flush()?;
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct OutboxEntry {
    pub phone: String,
    pub text: String,
}

/// Appends one JSON object per message to a file.
pub struct OutboxChannel {
    path: PathBuf,
}

impl OutboxChannel {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl MessageChannel for OutboxChannel {
    fn name(&self) -> &str {
        "outbox"
    }

    async fn send(&self, phone: &str, text: &str) -> std::result::Result<(), ChannelError> {
        let entry = OutboxEntry {
            phone: phone.to_string(),
            text: text.to_string(),
        };
        let mut line =
            serde_json::to_vec(&entry).map_err(|e| ChannelError::Transport(e.to_string()))?;
        line.push(b'\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Posts `{"phone": .., "text": ..}` to a configured URL.
///
/// Any non-2xx response is a rejection. Provider-specific payloads are left
/// to whatever sits behind the endpoint.
pub struct WebhookChannel {
    client: reqwest::Client,
    settings: WebhookSettings,
    timeout: Duration,
}

impl WebhookChannel {
    pub fn new(settings: WebhookSettings) -> Result<Self> {
        Self::with_builder(settings, reqwest::Client::builder())
    }

    fn with_builder(settings: WebhookSettings, builder: reqwest::ClientBuilder) -> Result<Self> {
        let timeout = Duration::from_millis(settings.timeout_ms);
        let client = builder
            .timeout(timeout)
            .build()
            .map_err(|e| ArrearsError::InvalidInput(format!("webhook client: {e}")))?;
        Ok(Self {
            client,
            settings,
            timeout,
        })
    }

    fn request_error(&self, err: reqwest::Error) -> ChannelError {
        if err.is_timeout() {
            ChannelError::Timeout(self.timeout)
        } else if let Some(status) = err.status() {
            ChannelError::Rejected(status.to_string())
        } else {
            ChannelError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl MessageChannel for WebhookChannel {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn send(&self, phone: &str, text: &str) -> std::result::Result<(), ChannelError> {
        let mut request = self.client.post(&self.settings.url).json(&OutboxEntry {
            phone: phone.to_string(),
            text: text.to_string(),
        });
        if let Some(token) = &self.settings.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| self.request_error(e))?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        let snippet: String = body.chars().take(200).collect();
        Err(ChannelError::Rejected(format!("{status}: {snippet}")))
    }
}
