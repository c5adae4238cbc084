//! Delivery Record Repository

use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::doc,
    options::{FindOptions, IndexOptions},
    Collection, Database, IndexModel,
};

use crate::delivery::entity::DeliveryRecord;
use crate::shared::error::Result;

pub struct DeliveryRepository {
    collection: Collection<DeliveryRecord>,
}

impl DeliveryRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("delivery_records"),
        }
    }

    /// Unique index on (campaignId, mrId); duplicate seeding fails at the
    /// database rather than producing two rows for one recipient.
    pub async fn ensure_indexes(&self) -> Result<()> {
        let unique_pair = IndexModel::builder()
            .keys(doc! { "campaignId": 1, "mrId": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        let by_status = IndexModel::builder()
            .keys(doc! { "campaignId": 1, "status": 1 })
            .build();
        self.collection
            .create_indexes(vec![unique_pair, by_status])
            .await?;
        Ok(())
    }

    /// Bulk insert the seeded pending rows for one campaign.
    pub async fn insert_many(&self, records: &[DeliveryRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        self.collection.insert_many(records).await?;
        Ok(())
    }

    /// All rows of a campaign in seeding order (TSID `_id` ascending).
    pub async fn find_by_campaign(&self, campaign_id: &str) -> Result<Vec<DeliveryRecord>> {
        let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
        let cursor = self
            .collection
            .find(doc! { "campaignId": campaign_id })
            .with_options(options)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    /// Transition one pending row to SENT. Returns false when the row is
    /// missing or already terminal.
    pub async fn mark_sent(
        &self,
        campaign_id: &str,
        mr_id: &str,
        provider_message_id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = self
            .collection
            .update_one(
                doc! { "campaignId": campaign_id, "mrId": mr_id, "status": "PENDING" },
                doc! { "$set": {
                    "status": "SENT",
                    "sentAt": at,
                    "providerMessageId": provider_message_id,
                } },
            )
            .await?;
        Ok(result.modified_count > 0)
    }

    /// Transition one pending row to FAILED with the attempt timestamp.
    /// Returns false when the row is missing or already terminal.
    pub async fn mark_failed(
        &self,
        campaign_id: &str,
        mr_id: &str,
        error: &str,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = self
            .collection
            .update_one(
                doc! { "campaignId": campaign_id, "mrId": mr_id, "status": "PENDING" },
                doc! { "$set": {
                    "status": "FAILED",
                    "sentAt": at,
                    "errorMessage": error,
                } },
            )
            .await?;
        Ok(result.modified_count > 0)
    }

    /// Mark every remaining pending row of a campaign CANCELLED.
    pub async fn cancel_pending(&self, campaign_id: &str) -> Result<u64> {
        let result = self
            .collection
            .update_many(
                doc! { "campaignId": campaign_id, "status": "PENDING" },
                doc! { "$set": { "status": "CANCELLED" } },
            )
            .await?;
        Ok(result.modified_count)
    }
}
