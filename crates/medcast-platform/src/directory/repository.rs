//! Directory Repositories

use futures::TryStreamExt;
use mongodb::{bson::doc, Collection, Database};

use crate::directory::entity::{MedicalRep, RecipientList, Template};
use crate::shared::error::Result;

pub struct TemplateRepository {
    collection: Collection<Template>,
}

impl TemplateRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("templates"),
        }
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Template>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }
}

pub struct RecipientListRepository {
    collection: Collection<RecipientList>,
}

impl RecipientListRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("recipient_lists"),
        }
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<RecipientList>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }
}

pub struct MedicalRepRepository {
    collection: Collection<MedicalRep>,
}

impl MedicalRepRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("medical_reps"),
        }
    }

    /// Fetch a batch of reps by id. Order of the result is unspecified;
    /// callers re-order against their own id list.
    pub async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<MedicalRep>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let cursor = self
            .collection
            .find(doc! { "_id": { "$in": ids } })
            .await?;
        Ok(cursor.try_collect().await?)
    }
}
