use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod logging;
pub mod tsid;

pub use tsid::TsidGenerator;

// ============================================================================
// Recipient Types
// ============================================================================

/// A single addressable target within a recipient list.
///
/// Carries everything the dispatch engine needs to fill a template and send
/// one message: phone, display names, and an optional per-recipient
/// parameter map keyed by template placeholder name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    /// Internal MR (medical representative) identifier
    pub mr_id: String,
    pub phone: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    /// Placeholder name -> value. When absent the engine falls back to
    /// `{first_name, last_name}`.
    #[serde(default)]
    pub parameters: Option<BTreeMap<String, String>>,
}

impl Recipient {
    /// Display name used on delivery records ("User" when nothing is known).
    pub fn display_name(&self) -> String {
        let name = format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        );
        let name = name.trim().to_string();
        if name.is_empty() {
            "User".to_string()
        } else {
            name
        }
    }
}

/// One entry in a resolved recipient list, in list order.
///
/// Lists can reference MR identities that no longer resolve; those come back
/// as `Unresolved` so the engine can record a per-recipient failure without
/// aborting the whole campaign.
#[derive(Debug, Clone)]
pub enum RecipientEntry {
    Resolved(Recipient),
    Unresolved { mr_id: String, reason: String },
}

impl RecipientEntry {
    pub fn mr_id(&self) -> &str {
        match self {
            RecipientEntry::Resolved(r) => &r.mr_id,
            RecipientEntry::Unresolved { mr_id, .. } => mr_id,
        }
    }

    pub fn phone(&self) -> &str {
        match self {
            RecipientEntry::Resolved(r) => &r.phone,
            RecipientEntry::Unresolved { .. } => "",
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            RecipientEntry::Resolved(r) => r.display_name(),
            RecipientEntry::Unresolved { .. } => "User".to_string(),
        }
    }
}

// ============================================================================
// Template Types
// ============================================================================

/// A message template as the provider knows it: the provider-side template
/// code, the locale it was approved for, and its declared placeholders in
/// body order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageTemplate {
    pub id: String,
    /// Provider-side template code (e.g. "mr_product_launch")
    pub code: String,
    pub locale: String,
    /// Placeholder names in body order
    #[serde(default)]
    pub placeholders: Vec<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Delivery Types
// ============================================================================

/// Status of one per-recipient delivery record.
///
/// Transitions exactly once from `Pending` to one of the terminal states,
/// never reverts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Pending,
    Sent,
    Failed,
    /// Campaign was cancelled before this recipient was attempted
    Cancelled,
}

impl DeliveryStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DeliveryStatus::Pending)
    }
}

impl Default for DeliveryStatus {
    fn default() -> Self {
        DeliveryStatus::Pending
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryStatus::Pending => write!(f, "PENDING"),
            DeliveryStatus::Sent => write!(f, "SENT"),
            DeliveryStatus::Failed => write!(f, "FAILED"),
            DeliveryStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// One per-recipient delivery ledger row.
///
/// Keyed by (campaign_id, mr_id); that pair is unique within the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryEntry {
    pub campaign_id: String,
    pub mr_id: String,
    pub phone: String,
    pub display_name: String,
    #[serde(default)]
    pub status: DeliveryStatus,
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
    /// Present only on success
    #[serde(default)]
    pub provider_message_id: Option<String>,
    /// Present only on failure
    #[serde(default)]
    pub error_message: Option<String>,
}

impl DeliveryEntry {
    /// A fresh pending row for one recipient of a campaign.
    pub fn pending(campaign_id: impl Into<String>, entry: &RecipientEntry) -> Self {
        Self {
            campaign_id: campaign_id.into(),
            mr_id: entry.mr_id().to_string(),
            phone: entry.phone().to_string(),
            display_name: entry.display_name(),
            status: DeliveryStatus::Pending,
            sent_at: None,
            provider_message_id: None,
            error_message: None,
        }
    }
}

// ============================================================================
// Campaign Types
// ============================================================================

/// Campaign lifecycle state.
///
/// `Completed` is the terminal state even for partially failed runs; `Failed`
/// is reserved for runs where zero recipients succeeded. There is no
/// externally visible intermediate state between `Pending` and terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignState {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl CampaignState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CampaignState::Pending)
    }
}

impl Default for CampaignState {
    fn default() -> Self {
        CampaignState::Pending
    }
}

impl std::fmt::Display for CampaignState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CampaignState::Pending => write!(f, "PENDING"),
            CampaignState::Completed => write!(f, "COMPLETED"),
            CampaignState::Failed => write!(f, "FAILED"),
            CampaignState::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// The campaign record the dispatch engine owns during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignRecord {
    /// TSID, human-shareable and time-sorted
    pub id: String,
    pub name: String,
    pub template_id: String,
    pub recipient_list_id: String,
    /// Opaque actor reference for auditing
    pub initiated_by: String,
    pub total_recipients: u64,
    #[serde(default)]
    pub sent_count: u64,
    #[serde(default)]
    pub failed_count: u64,
    #[serde(default)]
    pub state: CampaignState,
    pub created_at: DateTime<Utc>,
}

impl CampaignRecord {
    pub fn new(
        name: impl Into<String>,
        template_id: impl Into<String>,
        recipient_list_id: impl Into<String>,
        initiated_by: impl Into<String>,
        total_recipients: u64,
    ) -> Self {
        Self {
            id: TsidGenerator::generate(),
            name: name.into(),
            template_id: template_id.into(),
            recipient_list_id: recipient_list_id.into(),
            initiated_by: initiated_by.into(),
            total_recipients,
            sent_count: 0,
            failed_count: 0,
            state: CampaignState::Pending,
            created_at: Utc::now(),
        }
    }
}

// ============================================================================
// Provider Types
// ============================================================================

/// What the messaging provider returns for one accepted outbound message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderReceipt {
    pub message_id: String,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_falls_back_to_user() {
        let r = Recipient {
            mr_id: "mr-1".to_string(),
            phone: "+15550001111".to_string(),
            first_name: None,
            last_name: None,
            parameters: None,
        };
        assert_eq!(r.display_name(), "User");
    }

    #[test]
    fn display_name_joins_and_trims() {
        let r = Recipient {
            mr_id: "mr-1".to_string(),
            phone: "+15550001111".to_string(),
            first_name: Some("Asha".to_string()),
            last_name: None,
            parameters: None,
        };
        assert_eq!(r.display_name(), "Asha");
    }

    #[test]
    fn delivery_status_terminality() {
        assert!(!DeliveryStatus::Pending.is_terminal());
        assert!(DeliveryStatus::Sent.is_terminal());
        assert!(DeliveryStatus::Failed.is_terminal());
        assert!(DeliveryStatus::Cancelled.is_terminal());
    }

    #[test]
    fn campaign_state_serializes_screaming_snake() {
        let s = serde_json::to_string(&CampaignState::Completed).unwrap();
        assert_eq!(s, "\"COMPLETED\"");
    }

    #[test]
    fn new_campaign_record_is_pending() {
        let c = CampaignRecord::new("Launch", "tpl-1", "list-1", "user-9", 3);
        assert_eq!(c.state, CampaignState::Pending);
        assert_eq!(c.total_recipients, 3);
        assert_eq!(c.sent_count + c.failed_count, 0);
        assert_eq!(c.id.len(), 13);
    }
}
