//! Campaign Entity
//!
//! One submitted template campaign: who started it, what was sent, to which
//! list, and the final aggregate counts.

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use medcast_common::{CampaignRecord, CampaignState};

/// Campaign document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    /// TSID
    #[serde(rename = "_id")]
    pub id: String,

    pub name: String,

    pub template_id: String,

    pub recipient_list_id: String,

    /// Actor id from the authenticated request
    pub initiated_by: String,

    pub total_recipients: u64,

    #[serde(default)]
    pub sent_count: u64,

    #[serde(default)]
    pub failed_count: u64,

    #[serde(default)]
    pub status: CampaignState,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl From<&CampaignRecord> for Campaign {
    fn from(record: &CampaignRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            template_id: record.template_id.clone(),
            recipient_list_id: record.recipient_list_id.clone(),
            initiated_by: record.initiated_by.clone(),
            total_recipients: record.total_recipients,
            sent_count: record.sent_count,
            failed_count: record.failed_count,
            status: record.state,
            created_at: record.created_at,
            updated_at: record.created_at,
        }
    }
}

impl Campaign {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_mirrors_engine_record() {
        let record = CampaignRecord::new("Launch", "tpl-1", "list-1", "user-1", 4);
        let doc = Campaign::from(&record);
        assert_eq!(doc.id, record.id);
        assert_eq!(doc.status, CampaignState::Pending);
        assert_eq!(doc.total_recipients, 4);
        assert!(!doc.is_terminal());
    }

    #[test]
    fn serializes_with_camel_case_and_underscore_id() {
        let record = CampaignRecord::new("Launch", "tpl-1", "list-1", "user-1", 1);
        let doc = Campaign::from(&record);
        let json = serde_json::to_value(&doc).unwrap();
        assert!(json.get("_id").is_some());
        assert!(json.get("templateId").is_some());
        assert!(json.get("recipientListId").is_some());
    }
}
