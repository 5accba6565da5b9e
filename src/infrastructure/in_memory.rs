use crate::domain::overdue::{IdentityKey, UnpaidInvoiceRecord};
use crate::domain::ports::{CustomerDirectory, MessageChannel, UnpaidInvoiceSource};
use crate::error::{ChannelError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// A thread-safe in-memory phone book.
///
/// Uses `Arc<RwLock<HashMap<IdentityKey, String>>>` so clones share entries.
#[derive(Default, Clone)]
pub struct InMemoryCustomerDirectory {
    phones: Arc<RwLock<HashMap<IdentityKey, String>>>,
}

impl InMemoryCustomerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (IdentityKey, String)>) -> Self {
        Self {
            phones: Arc::new(RwLock::new(entries.into_iter().collect())),
        }
    }

    pub async fn insert(&self, key: IdentityKey, phone: impl Into<String>) {
        self.phones.write().await.insert(key, phone.into());
    }
}

#[async_trait]
impl CustomerDirectory for InMemoryCustomerDirectory {
    async fn resolve_phone(&self, key: &IdentityKey) -> Result<Option<String>> {
        let phones = self.phones.read().await;
        Ok(phones.get(key).cloned())
    }
}

/// In-memory unpaid invoice source keyed by customer identity.
#[derive(Default, Clone)]
pub struct InMemoryInvoiceSource {
    invoices: Arc<RwLock<HashMap<IdentityKey, Vec<UnpaidInvoiceRecord>>>>,
}

impl InMemoryInvoiceSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, key: IdentityKey, invoice: UnpaidInvoiceRecord) {
        self.invoices
            .write()
            .await
            .entry(key)
            .or_default()
            .push(invoice);
    }
}

#[async_trait]
impl UnpaidInvoiceSource for InMemoryInvoiceSource {
    async fn unpaid_for(&self, key: &IdentityKey) -> Result<Vec<UnpaidInvoiceRecord>> {
        let invoices = self.invoices.read().await;
        Ok(invoices.get(key).cloned().unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub phone: String,
    pub text: String,
    pub at: Instant,
}

/// Channel that keeps every delivered message in memory.
///
/// Phones can be scripted to fail or to respond slowly, which makes it the
/// stand-in for a real provider in tests and dry runs.
#[derive(Default, Clone)]
pub struct RecordingChannel {
    sent: Arc<RwLock<Vec<SentMessage>>>,
    failing: HashSet<String>,
    latency: HashMap<String, Duration>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends to `phone` will be rejected.
    pub fn failing_for(mut self, phone: impl Into<String>) -> Self {
        self.failing.insert(phone.into());
        self
    }

    /// Sends to `phone` take `latency` before completing.
    pub fn with_latency_for(mut self, phone: impl Into<String>, latency: Duration) -> Self {
        self.latency.insert(phone.into(), latency);
        self
    }

    pub async fn sent(&self) -> Vec<SentMessage> {
        self.sent.read().await.clone()
    }

    /// Highest number of sends observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl MessageChannel for RecordingChannel {
    fn name(&self) -> &str {
        "memory"
    }

    async fn send(&self, phone: &str, text: &str) -> std::result::Result<(), ChannelError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let at = Instant::now();
        if let Some(latency) = self.latency.get(phone) {
            tokio::time::sleep(*latency).await;
        }
        if self.failing.contains(phone) {
            return Err(ChannelError::Rejected(format!("{phone} is unreachable")));
        }

        self.sent.write().await.push(SentMessage {
            phone: phone.to_string(),
            text: text.to_string(),
            at,
        });
        Ok(())
    }
}
