//! Engine Ports
//!
//! Traits the dispatch engine is constructed with. Every external
//! collaborator (recipient-list store, messaging provider, delivery ledger,
//! campaign store) comes in through one of these; nothing is reached via
//! ambient singletons.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use medcast_common::{
    CampaignRecord, CampaignState, DeliveryEntry, MessageTemplate, ProviderReceipt, RecipientEntry,
};

/// Errors from resolving a recipient list
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("recipient list not found: {0}")]
    NotFound(String),

    #[error("recipient list is inactive: {0}")]
    Inactive(String),

    #[error("recipient list has no recipients: {0}")]
    Empty(String),

    #[error("recipient list backend error: {0}")]
    Backend(String),
}

/// Resolves a recipient-list id into its ordered member entries.
///
/// Order is significant: the engine attempts sends in exactly the order
/// returned here.
#[async_trait]
pub trait RecipientResolver: Send + Sync {
    async fn resolve(&self, recipient_list_id: &str) -> Result<Vec<RecipientEntry>, ResolveError>;
}

/// A failed provider call, reduced to a human-readable message.
///
/// The engine does not interpret provider error codes beyond capturing the
/// message text.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct SendError {
    pub message: String,
}

impl SendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Wraps the external messaging provider: one network call per invocation.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// `parameters` are (placeholder, value) pairs in template body order.
    async fn send(
        &self,
        phone: &str,
        template: &MessageTemplate,
        parameters: &[(String, String)],
        locale: &str,
    ) -> Result<ProviderReceipt, SendError>;
}

/// Persistent per-recipient delivery record store.
///
/// Rows are keyed by (campaign_id, mr_id); seeding a duplicate pair is an
/// error, and a row's status moves away from pending exactly once.
#[async_trait]
pub trait DeliveryLedger: Send + Sync {
    /// Bulk insert pending rows. Must complete in full before any send.
    async fn seed(&self, entries: &[DeliveryEntry]) -> anyhow::Result<()>;

    async fn mark_sent(
        &self,
        campaign_id: &str,
        mr_id: &str,
        provider_message_id: &str,
        at: DateTime<Utc>,
    ) -> anyhow::Result<()>;

    async fn mark_failed(
        &self,
        campaign_id: &str,
        mr_id: &str,
        error: &str,
        at: DateTime<Utc>,
    ) -> anyhow::Result<()>;

    /// Mark every still-pending row of the campaign cancelled.
    /// Returns the number of rows affected.
    async fn cancel_pending(&self, campaign_id: &str) -> anyhow::Result<u64>;

    /// All rows of a campaign, in seeding order.
    async fn entries(&self, campaign_id: &str) -> anyhow::Result<Vec<DeliveryEntry>>;
}

/// Read access to message templates, for the submit pre-flight check.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn find(&self, template_id: &str) -> anyhow::Result<Option<MessageTemplate>>;
}

/// Campaign record persistence owned by the engine during a run.
#[async_trait]
pub trait CampaignStore: Send + Sync {
    async fn create(&self, campaign: &CampaignRecord) -> anyhow::Result<()>;

    async fn finalize(
        &self,
        campaign_id: &str,
        state: CampaignState,
        sent_count: u64,
        failed_count: u64,
    ) -> anyhow::Result<()>;
}
