//! Campaign Repository

use chrono::Utc;
use mongodb::{bson::doc, Collection, Database};

use medcast_common::CampaignState;

use crate::campaign::entity::Campaign;
use crate::shared::error::Result;

pub struct CampaignRepository {
    collection: Collection<Campaign>,
}

impl CampaignRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("campaigns"),
        }
    }

    pub async fn insert(&self, campaign: &Campaign) -> Result<()> {
        self.collection.insert_one(campaign).await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Campaign>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    /// Write the terminal status and final counts in one update.
    pub async fn finalize(
        &self,
        id: &str,
        status: CampaignState,
        sent_count: u64,
        failed_count: u64,
    ) -> Result<bool> {
        let status_str = status.to_string();
        let result = self
            .collection
            .update_one(
                doc! { "_id": id },
                doc! { "$set": {
                    "status": status_str,
                    "sentCount": sent_count as i64,
                    "failedCount": failed_count as i64,
                    "updatedAt": Utc::now(),
                } },
            )
            .await?;
        Ok(result.modified_count > 0)
    }
}
