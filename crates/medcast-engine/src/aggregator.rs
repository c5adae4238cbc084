//! Campaign delivery aggregation
//!
//! Rolls the per-recipient ledger rows of one campaign up into counts.

use std::sync::Arc;

use serde::Serialize;

use medcast_common::{DeliveryEntry, DeliveryStatus};

use crate::ports::DeliveryLedger;

/// Per-status counts for one campaign's ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryStats {
    pub total: u64,
    pub sent: u64,
    pub failed: u64,
    pub pending: u64,
    pub cancelled: u64,
}

impl DeliveryStats {
    pub fn from_entries(entries: &[DeliveryEntry]) -> Self {
        let mut stats = DeliveryStats {
            total: entries.len() as u64,
            ..Default::default()
        };
        for entry in entries {
            match entry.status {
                DeliveryStatus::Sent => stats.sent += 1,
                DeliveryStatus::Failed => stats.failed += 1,
                DeliveryStatus::Pending => stats.pending += 1,
                DeliveryStatus::Cancelled => stats.cancelled += 1,
            }
        }
        stats
    }

    /// Sent share of all ledger rows (pending and cancelled included),
    /// as a fraction in [0, 1].
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.sent as f64 / self.total as f64
    }
}

/// Reads a campaign's ledger and reduces it to stats.
pub struct CampaignAggregator {
    ledger: Arc<dyn DeliveryLedger>,
}

impl CampaignAggregator {
    pub fn new(ledger: Arc<dyn DeliveryLedger>) -> Self {
        Self { ledger }
    }

    pub async fn stats(&self, campaign_id: &str) -> anyhow::Result<DeliveryStats> {
        let entries = self.ledger.entries(campaign_id).await?;
        Ok(DeliveryStats::from_entries(&entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medcast_common::RecipientEntry;

    fn entry(mr_id: &str, status: DeliveryStatus) -> DeliveryEntry {
        let mut e = DeliveryEntry::pending(
            "c1",
            &RecipientEntry::Unresolved {
                mr_id: mr_id.to_string(),
                reason: "n/a".to_string(),
            },
        );
        e.status = status;
        e
    }

    #[test]
    fn counts_by_status() {
        let entries = vec![
            entry("a", DeliveryStatus::Sent),
            entry("b", DeliveryStatus::Sent),
            entry("c", DeliveryStatus::Failed),
            entry("d", DeliveryStatus::Pending),
            entry("e", DeliveryStatus::Cancelled),
        ];
        let stats = DeliveryStats::from_entries(&entries);
        assert_eq!(stats.total, 5);
        assert_eq!(stats.sent, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.cancelled, 1);
        assert!((stats.success_rate() - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_ledger_has_zero_rate() {
        let stats = DeliveryStats::from_entries(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.success_rate(), 0.0);
    }
}
