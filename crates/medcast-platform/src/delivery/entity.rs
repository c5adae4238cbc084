//! Delivery Record Entity
//!
//! One per-recipient row of a campaign's delivery ledger. The `_id` is a
//! TSID so rows read back in seeding order.

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use medcast_common::{DeliveryEntry, DeliveryStatus, TsidGenerator};

/// Delivery ledger document, unique on (campaignId, mrId)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRecord {
    /// TSID
    #[serde(rename = "_id")]
    pub id: String,

    pub campaign_id: String,

    pub mr_id: String,

    pub phone: String,

    pub recipient_name: String,

    #[serde(default)]
    pub status: DeliveryStatus,

    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime_optional"
    )]
    pub sent_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub provider_message_id: Option<String>,

    #[serde(default)]
    pub error_message: Option<String>,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl From<&DeliveryEntry> for DeliveryRecord {
    fn from(entry: &DeliveryEntry) -> Self {
        Self {
            id: TsidGenerator::generate(),
            campaign_id: entry.campaign_id.clone(),
            mr_id: entry.mr_id.clone(),
            phone: entry.phone.clone(),
            recipient_name: entry.display_name.clone(),
            status: entry.status,
            sent_at: entry.sent_at,
            provider_message_id: entry.provider_message_id.clone(),
            error_message: entry.error_message.clone(),
            created_at: Utc::now(),
        }
    }
}

impl From<&DeliveryRecord> for DeliveryEntry {
    fn from(record: &DeliveryRecord) -> Self {
        Self {
            campaign_id: record.campaign_id.clone(),
            mr_id: record.mr_id.clone(),
            phone: record.phone.clone(),
            display_name: record.recipient_name.clone(),
            status: record.status,
            sent_at: record.sent_at,
            provider_message_id: record.provider_message_id.clone(),
            error_message: record.error_message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medcast_common::{Recipient, RecipientEntry};

    #[test]
    fn round_trips_through_the_engine_entry() {
        let entry = DeliveryEntry::pending(
            "c1",
            &RecipientEntry::Resolved(Recipient {
                mr_id: "mr-1".to_string(),
                phone: "+15550000001".to_string(),
                first_name: Some("Asha".to_string()),
                last_name: Some("Patel".to_string()),
                parameters: None,
            }),
        );
        let record = DeliveryRecord::from(&entry);
        assert_eq!(record.status, DeliveryStatus::Pending);
        assert_eq!(record.recipient_name, "Asha Patel");

        let back = DeliveryEntry::from(&record);
        assert_eq!(back.campaign_id, "c1");
        assert_eq!(back.mr_id, "mr-1");
        assert_eq!(back.display_name, "Asha Patel");
    }
}
