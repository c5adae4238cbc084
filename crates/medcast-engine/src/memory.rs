//! In-memory port implementations
//!
//! Used by the engine's integration tests and for local development without
//! a database. Each store enforces the same invariants the persistent
//! implementations do, so tests written against these catch real contract
//! violations.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::bail;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use medcast_common::{
    CampaignRecord, CampaignState, DeliveryEntry, DeliveryStatus, MessageTemplate, RecipientEntry,
};

use crate::ports::{CampaignStore, DeliveryLedger, RecipientResolver, ResolveError, TemplateStore};

// ============================================================================
// Templates
// ============================================================================

#[derive(Default)]
pub struct InMemoryTemplateStore {
    templates: Mutex<HashMap<String, MessageTemplate>>,
}

impl InMemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, template: MessageTemplate) {
        self.templates
            .lock()
            .await
            .insert(template.id.clone(), template);
    }
}

#[async_trait]
impl TemplateStore for InMemoryTemplateStore {
    async fn find(&self, template_id: &str) -> anyhow::Result<Option<MessageTemplate>> {
        Ok(self.templates.lock().await.get(template_id).cloned())
    }
}

// ============================================================================
// Recipient lists
// ============================================================================

/// One configured recipient list: active flag plus ordered entries.
#[derive(Clone)]
pub struct ListFixture {
    pub active: bool,
    pub entries: Vec<RecipientEntry>,
}

#[derive(Default)]
pub struct InMemoryRecipientResolver {
    lists: Mutex<HashMap<String, ListFixture>>,
}

impl InMemoryRecipientResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, list_id: impl Into<String>, fixture: ListFixture) {
        self.lists.lock().await.insert(list_id.into(), fixture);
    }
}

#[async_trait]
impl RecipientResolver for InMemoryRecipientResolver {
    async fn resolve(&self, recipient_list_id: &str) -> Result<Vec<RecipientEntry>, ResolveError> {
        let lists = self.lists.lock().await;
        let fixture = lists
            .get(recipient_list_id)
            .ok_or_else(|| ResolveError::NotFound(recipient_list_id.to_string()))?;
        if !fixture.active {
            return Err(ResolveError::Inactive(recipient_list_id.to_string()));
        }
        if fixture.entries.is_empty() {
            return Err(ResolveError::Empty(recipient_list_id.to_string()));
        }
        Ok(fixture.entries.clone())
    }
}

// ============================================================================
// Delivery ledger
// ============================================================================

/// Vec-backed ledger preserving seeding order, with the same
/// (campaign_id, mr_id) uniqueness and single-transition rules as the
/// persistent one.
#[derive(Default)]
pub struct InMemoryDeliveryLedger {
    entries: Mutex<Vec<DeliveryEntry>>,
}

impl InMemoryDeliveryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeliveryLedger for InMemoryDeliveryLedger {
    async fn seed(&self, new_entries: &[DeliveryEntry]) -> anyhow::Result<()> {
        let mut entries = self.entries.lock().await;
        let mut seen: std::collections::HashSet<(String, String)> = entries
            .iter()
            .map(|e| (e.campaign_id.clone(), e.mr_id.clone()))
            .collect();
        for entry in new_entries {
            if !seen.insert((entry.campaign_id.clone(), entry.mr_id.clone())) {
                bail!(
                    "duplicate delivery entry for campaign {} mr {}",
                    entry.campaign_id,
                    entry.mr_id
                );
            }
        }
        entries.extend(new_entries.iter().cloned());
        Ok(())
    }

    async fn mark_sent(
        &self,
        campaign_id: &str,
        mr_id: &str,
        provider_message_id: &str,
        at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let mut entries = self.entries.lock().await;
        let entry = entries
            .iter_mut()
            .find(|e| e.campaign_id == campaign_id && e.mr_id == mr_id);
        match entry {
            Some(entry) if entry.status == DeliveryStatus::Pending => {
                entry.status = DeliveryStatus::Sent;
                entry.sent_at = Some(at);
                entry.provider_message_id = Some(provider_message_id.to_string());
                Ok(())
            }
            Some(entry) => bail!(
                "delivery entry for mr {} is already {}",
                mr_id,
                entry.status
            ),
            None => bail!("no delivery entry for campaign {} mr {}", campaign_id, mr_id),
        }
    }

    async fn mark_failed(
        &self,
        campaign_id: &str,
        mr_id: &str,
        error: &str,
        at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let mut entries = self.entries.lock().await;
        let entry = entries
            .iter_mut()
            .find(|e| e.campaign_id == campaign_id && e.mr_id == mr_id);
        match entry {
            Some(entry) if entry.status == DeliveryStatus::Pending => {
                entry.status = DeliveryStatus::Failed;
                entry.sent_at = Some(at);
                entry.error_message = Some(error.to_string());
                Ok(())
            }
            Some(entry) => bail!(
                "delivery entry for mr {} is already {}",
                mr_id,
                entry.status
            ),
            None => bail!("no delivery entry for campaign {} mr {}", campaign_id, mr_id),
        }
    }

    async fn cancel_pending(&self, campaign_id: &str) -> anyhow::Result<u64> {
        let mut entries = self.entries.lock().await;
        let mut affected = 0;
        for entry in entries
            .iter_mut()
            .filter(|e| e.campaign_id == campaign_id && e.status == DeliveryStatus::Pending)
        {
            entry.status = DeliveryStatus::Cancelled;
            affected += 1;
        }
        Ok(affected)
    }

    async fn entries(&self, campaign_id: &str) -> anyhow::Result<Vec<DeliveryEntry>> {
        Ok(self
            .entries
            .lock()
            .await
            .iter()
            .filter(|e| e.campaign_id == campaign_id)
            .cloned()
            .collect())
    }
}

// ============================================================================
// Campaigns
// ============================================================================

#[derive(Default)]
pub struct InMemoryCampaignStore {
    campaigns: Mutex<HashMap<String, CampaignRecord>>,
}

impl InMemoryCampaignStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, campaign_id: &str) -> Option<CampaignRecord> {
        self.campaigns.lock().await.get(campaign_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.campaigns.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.campaigns.lock().await.is_empty()
    }
}

#[async_trait]
impl CampaignStore for InMemoryCampaignStore {
    async fn create(&self, campaign: &CampaignRecord) -> anyhow::Result<()> {
        let mut campaigns = self.campaigns.lock().await;
        if campaigns.contains_key(&campaign.id) {
            bail!("campaign {} already exists", campaign.id);
        }
        campaigns.insert(campaign.id.clone(), campaign.clone());
        Ok(())
    }

    async fn finalize(
        &self,
        campaign_id: &str,
        state: CampaignState,
        sent_count: u64,
        failed_count: u64,
    ) -> anyhow::Result<()> {
        let mut campaigns = self.campaigns.lock().await;
        match campaigns.get_mut(campaign_id) {
            Some(campaign) => {
                campaign.state = state;
                campaign.sent_count = sent_count;
                campaign.failed_count = failed_count;
                Ok(())
            }
            None => bail!("campaign not found: {}", campaign_id),
        }
    }
}

/// Helper shared by tests: an `Arc` around each store, wired the way the
/// server wires the persistent ones.
pub struct InMemoryHarness {
    pub templates: Arc<InMemoryTemplateStore>,
    pub resolver: Arc<InMemoryRecipientResolver>,
    pub ledger: Arc<InMemoryDeliveryLedger>,
    pub campaigns: Arc<InMemoryCampaignStore>,
}

impl InMemoryHarness {
    pub fn new() -> Self {
        Self {
            templates: Arc::new(InMemoryTemplateStore::new()),
            resolver: Arc::new(InMemoryRecipientResolver::new()),
            ledger: Arc::new(InMemoryDeliveryLedger::new()),
            campaigns: Arc::new(InMemoryCampaignStore::new()),
        }
    }
}

impl Default for InMemoryHarness {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medcast_common::Recipient;

    fn resolved(mr_id: &str, phone: &str) -> RecipientEntry {
        RecipientEntry::Resolved(Recipient {
            mr_id: mr_id.to_string(),
            phone: phone.to_string(),
            first_name: Some("Test".to_string()),
            last_name: None,
            parameters: None,
        })
    }

    #[tokio::test]
    async fn ledger_rejects_duplicate_seed() {
        let ledger = InMemoryDeliveryLedger::new();
        let rows = vec![
            DeliveryEntry::pending("c1", &resolved("mr-1", "+1")),
            DeliveryEntry::pending("c1", &resolved("mr-1", "+1")),
        ];
        assert!(ledger.seed(&rows).await.is_err());
    }

    #[tokio::test]
    async fn ledger_transitions_once() {
        let ledger = InMemoryDeliveryLedger::new();
        let rows = vec![DeliveryEntry::pending("c1", &resolved("mr-1", "+1"))];
        ledger.seed(&rows).await.unwrap();

        ledger
            .mark_sent("c1", "mr-1", "wamid.1", Utc::now())
            .await
            .unwrap();
        // Second transition on the same row must fail
        assert!(ledger
            .mark_failed("c1", "mr-1", "boom", Utc::now())
            .await
            .is_err());

        let entries = ledger.entries("c1").await.unwrap();
        assert_eq!(entries[0].status, DeliveryStatus::Sent);
        assert_eq!(entries[0].provider_message_id.as_deref(), Some("wamid.1"));
    }

    #[tokio::test]
    async fn failed_row_records_attempt_timestamp() {
        let ledger = InMemoryDeliveryLedger::new();
        let rows = vec![DeliveryEntry::pending("c1", &resolved("mr-1", "+1"))];
        ledger.seed(&rows).await.unwrap();

        let at = Utc::now();
        ledger.mark_failed("c1", "mr-1", "boom", at).await.unwrap();

        let entries = ledger.entries("c1").await.unwrap();
        assert_eq!(entries[0].status, DeliveryStatus::Failed);
        assert_eq!(entries[0].sent_at, Some(at));
        assert_eq!(entries[0].error_message.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn cancel_pending_skips_terminal_rows() {
        let ledger = InMemoryDeliveryLedger::new();
        let rows = vec![
            DeliveryEntry::pending("c1", &resolved("mr-1", "+1")),
            DeliveryEntry::pending("c1", &resolved("mr-2", "+2")),
            DeliveryEntry::pending("c1", &resolved("mr-3", "+3")),
        ];
        ledger.seed(&rows).await.unwrap();
        ledger
            .mark_sent("c1", "mr-1", "wamid.1", Utc::now())
            .await
            .unwrap();

        let affected = ledger.cancel_pending("c1").await.unwrap();
        assert_eq!(affected, 2);

        let entries = ledger.entries("c1").await.unwrap();
        assert_eq!(entries[0].status, DeliveryStatus::Sent);
        assert_eq!(entries[1].status, DeliveryStatus::Cancelled);
        assert_eq!(entries[2].status, DeliveryStatus::Cancelled);
    }

    #[tokio::test]
    async fn resolver_distinguishes_missing_inactive_empty() {
        let resolver = InMemoryRecipientResolver::new();
        resolver
            .insert(
                "inactive",
                ListFixture {
                    active: false,
                    entries: vec![resolved("mr-1", "+1")],
                },
            )
            .await;
        resolver
            .insert(
                "empty",
                ListFixture {
                    active: true,
                    entries: vec![],
                },
            )
            .await;

        assert!(matches!(
            resolver.resolve("missing").await,
            Err(ResolveError::NotFound(_))
        ));
        assert!(matches!(
            resolver.resolve("inactive").await,
            Err(ResolveError::Inactive(_))
        ));
        assert!(matches!(
            resolver.resolve("empty").await,
            Err(ResolveError::Empty(_))
        ));
    }

    #[tokio::test]
    async fn campaign_store_rejects_duplicate_create() {
        let store = InMemoryCampaignStore::new();
        let record = CampaignRecord::new("Launch", "tpl-1", "list-1", "user-1", 1);
        store.create(&record).await.unwrap();
        assert!(store.create(&record).await.is_err());
    }
}
