use super::overdue::{IdentityKey, UnpaidInvoiceRecord};
use crate::error::{ChannelError, Result};
use async_trait::async_trait;

/// Resolves a customer identity to a phone number.
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    async fn resolve_phone(&self, key: &IdentityKey) -> Result<Option<String>>;
}

/// Supplies outstanding non-installment charges per customer.
#[async_trait]
pub trait UnpaidInvoiceSource: Send + Sync {
    async fn unpaid_for(&self, key: &IdentityKey) -> Result<Vec<UnpaidInvoiceRecord>>;
}

/// A delivery mechanism for text messages.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn send(&self, phone: &str, text: &str) -> std::result::Result<(), ChannelError>;
}

pub type MessageChannelBox = Box<dyn MessageChannel>;
