//! MongoDB-backed engine ports
//!
//! Thin adapters from the dispatch engine's port traits onto the platform
//! repositories. Port errors are anyhow, so repository errors pass through
//! with context instead of being remapped.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Context};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use medcast_common::{
    CampaignRecord, CampaignState, DeliveryEntry, MessageTemplate, Recipient, RecipientEntry,
};
use medcast_engine::{
    CampaignStore, DeliveryLedger, RecipientResolver, ResolveError, TemplateStore,
};

use crate::campaign::entity::Campaign;
use crate::campaign::repository::CampaignRepository;
use crate::delivery::entity::DeliveryRecord;
use crate::delivery::repository::DeliveryRepository;
use crate::directory::repository::{
    MedicalRepRepository, RecipientListRepository, TemplateRepository,
};

pub struct MongoTemplateStore {
    templates: Arc<TemplateRepository>,
}

impl MongoTemplateStore {
    pub fn new(templates: Arc<TemplateRepository>) -> Self {
        Self { templates }
    }
}

#[async_trait]
impl TemplateStore for MongoTemplateStore {
    async fn find(&self, template_id: &str) -> anyhow::Result<Option<MessageTemplate>> {
        let template = self
            .templates
            .find_by_id(template_id)
            .await
            .context("template lookup failed")?;
        Ok(template.as_ref().map(MessageTemplate::from))
    }
}

/// Resolves a recipient list into engine entries, preserving list order.
///
/// MR references that no longer exist come back as `Unresolved` so the engine
/// records a per-recipient failure instead of dropping them silently.
pub struct MongoRecipientResolver {
    lists: Arc<RecipientListRepository>,
    reps: Arc<MedicalRepRepository>,
}

impl MongoRecipientResolver {
    pub fn new(lists: Arc<RecipientListRepository>, reps: Arc<MedicalRepRepository>) -> Self {
        Self { lists, reps }
    }
}

#[async_trait]
impl RecipientResolver for MongoRecipientResolver {
    async fn resolve(&self, recipient_list_id: &str) -> Result<Vec<RecipientEntry>, ResolveError> {
        let list = self
            .lists
            .find_by_id(recipient_list_id)
            .await
            .map_err(|e| ResolveError::Backend(e.to_string()))?
            .ok_or_else(|| ResolveError::NotFound(recipient_list_id.to_string()))?;

        if !list.active {
            return Err(ResolveError::Inactive(recipient_list_id.to_string()));
        }
        if list.member_ids.is_empty() {
            return Err(ResolveError::Empty(recipient_list_id.to_string()));
        }

        let reps = self
            .reps
            .find_by_ids(&list.member_ids)
            .await
            .map_err(|e| ResolveError::Backend(e.to_string()))?;
        let mut by_id: HashMap<String, _> =
            reps.into_iter().map(|rep| (rep.id.clone(), rep)).collect();

        // Re-order against the list: $in does not preserve member order.
        let entries = list
            .member_ids
            .iter()
            .map(|mr_id| match by_id.remove(mr_id) {
                Some(rep) => RecipientEntry::Resolved(Recipient {
                    mr_id: rep.id,
                    phone: rep.phone,
                    first_name: rep.first_name,
                    last_name: rep.last_name,
                    parameters: rep.parameters,
                }),
                None => RecipientEntry::Unresolved {
                    mr_id: mr_id.clone(),
                    reason: format!("medical rep not found: {}", mr_id),
                },
            })
            .collect();

        Ok(entries)
    }
}

pub struct MongoDeliveryLedger {
    deliveries: Arc<DeliveryRepository>,
}

impl MongoDeliveryLedger {
    pub fn new(deliveries: Arc<DeliveryRepository>) -> Self {
        Self { deliveries }
    }
}

#[async_trait]
impl DeliveryLedger for MongoDeliveryLedger {
    async fn seed(&self, entries: &[DeliveryEntry]) -> anyhow::Result<()> {
        let records: Vec<DeliveryRecord> = entries.iter().map(DeliveryRecord::from).collect();
        self.deliveries
            .insert_many(&records)
            .await
            .context("seeding delivery records failed")?;
        Ok(())
    }

    async fn mark_sent(
        &self,
        campaign_id: &str,
        mr_id: &str,
        provider_message_id: &str,
        at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let updated = self
            .deliveries
            .mark_sent(campaign_id, mr_id, provider_message_id, at)
            .await?;
        if !updated {
            bail!("no pending delivery record for campaign {} mr {}", campaign_id, mr_id);
        }
        Ok(())
    }

    async fn mark_failed(
        &self,
        campaign_id: &str,
        mr_id: &str,
        error: &str,
        at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let updated = self
            .deliveries
            .mark_failed(campaign_id, mr_id, error, at)
            .await?;
        if !updated {
            bail!("no pending delivery record for campaign {} mr {}", campaign_id, mr_id);
        }
        Ok(())
    }

    async fn cancel_pending(&self, campaign_id: &str) -> anyhow::Result<u64> {
        Ok(self.deliveries.cancel_pending(campaign_id).await?)
    }

    async fn entries(&self, campaign_id: &str) -> anyhow::Result<Vec<DeliveryEntry>> {
        let records = self.deliveries.find_by_campaign(campaign_id).await?;
        Ok(records.iter().map(DeliveryEntry::from).collect())
    }
}

pub struct MongoCampaignStore {
    campaigns: Arc<CampaignRepository>,
}

impl MongoCampaignStore {
    pub fn new(campaigns: Arc<CampaignRepository>) -> Self {
        Self { campaigns }
    }
}

#[async_trait]
impl CampaignStore for MongoCampaignStore {
    async fn create(&self, campaign: &CampaignRecord) -> anyhow::Result<()> {
        self.campaigns
            .insert(&Campaign::from(campaign))
            .await
            .context("inserting campaign failed")?;
        Ok(())
    }

    async fn finalize(
        &self,
        campaign_id: &str,
        state: CampaignState,
        sent_count: u64,
        failed_count: u64,
    ) -> anyhow::Result<()> {
        let updated = self
            .campaigns
            .finalize(campaign_id, state, sent_count, failed_count)
            .await?;
        if !updated {
            bail!("campaign not found: {}", campaign_id);
        }
        Ok(())
    }
}
