//! Campaign Dispatch Engine
//!
//! Drives one campaign run: pre-flight validation, campaign creation,
//! ledger seeding, the paced sequential send loop, and final status
//! aggregation. Per-recipient failures never abort the loop; pre-flight
//! failures abort before any campaign record exists.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use medcast_common::{
    CampaignRecord, CampaignState, DeliveryEntry, MessageTemplate, Recipient, RecipientEntry,
};

use crate::pacer::Pacer;
use crate::ports::{
    CampaignStore, DeliveryLedger, MessageSender, RecipientResolver, ResolveError, TemplateStore,
};

/// Errors that abort a submit call before the send loop starts.
///
/// Everything that happens inside the loop is per-recipient and is surfaced
/// through the result lists instead.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("persistence error: {0}")]
    Persistence(String),
}

/// Engine tuning knobs
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on one provider send call
    pub send_timeout: Duration,
    /// Bounded retries for a ledger write that fails after a send resolved
    pub ledger_write_retries: u32,
    /// Locale used when a template does not carry one
    pub default_locale: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            send_timeout: Duration::from_secs(30),
            ledger_write_retries: 3,
            default_locale: "en".to_string(),
        }
    }
}

/// Cooperative cancellation flag for a running campaign.
///
/// When raised, the engine stops issuing new sends, marks the remaining
/// pending rows cancelled, and finalizes the campaign as cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One submitted campaign run
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub name: String,
    pub template_id: String,
    pub recipient_list_id: String,
    /// Opaque actor reference for auditing
    pub initiated_by: String,
}

/// Successful per-recipient outcome
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentRecipient {
    pub mr_id: String,
    pub phone: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub message_id: String,
    pub status: String,
}

/// Failed per-recipient outcome
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedRecipient {
    pub mr_id: String,
    pub phone: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub error: String,
}

/// Aggregate result of one campaign run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignResult {
    pub campaign_id: String,
    pub campaign_name: String,
    pub total_recipients: u64,
    pub state: CampaignState,
    pub sent: Vec<SentRecipient>,
    pub failed: Vec<FailedRecipient>,
}

impl CampaignResult {
    pub fn success_count(&self) -> u64 {
        self.sent.len() as u64
    }

    pub fn failure_count(&self) -> u64 {
        self.failed.len() as u64
    }
}

/// The orchestrator. All collaborators are injected; the engine holds no
/// ambient state beyond its configuration and pacer.
pub struct DispatchEngine {
    templates: Arc<dyn TemplateStore>,
    resolver: Arc<dyn RecipientResolver>,
    sender: Arc<dyn MessageSender>,
    ledger: Arc<dyn DeliveryLedger>,
    campaigns: Arc<dyn CampaignStore>,
    pacer: Pacer,
    config: EngineConfig,
}

impl DispatchEngine {
    pub fn new(
        templates: Arc<dyn TemplateStore>,
        resolver: Arc<dyn RecipientResolver>,
        sender: Arc<dyn MessageSender>,
        ledger: Arc<dyn DeliveryLedger>,
        campaigns: Arc<dyn CampaignStore>,
        pacer: Pacer,
        config: EngineConfig,
    ) -> Self {
        Self {
            templates,
            resolver,
            sender,
            ledger,
            campaigns,
            pacer,
            config,
        }
    }

    /// Run one campaign to completion.
    pub async fn submit(&self, request: SubmitRequest) -> Result<CampaignResult, DispatchError> {
        self.submit_with_cancel(request, &CancelFlag::new()).await
    }

    /// Run one campaign to completion, honoring a cooperative cancel flag.
    pub async fn submit_with_cancel(
        &self,
        request: SubmitRequest,
        cancel: &CancelFlag,
    ) -> Result<CampaignResult, DispatchError> {
        if request.name.trim().is_empty() {
            return Err(DispatchError::InvalidState(
                "campaign name must not be empty".to_string(),
            ));
        }

        // Pre-flight: both references must resolve before anything persists.
        let template = self
            .templates
            .find(&request.template_id)
            .await
            .map_err(|e| DispatchError::Persistence(e.to_string()))?
            .ok_or_else(|| DispatchError::NotFound {
                entity: "template",
                id: request.template_id.clone(),
            })?;

        if !template.active {
            return Err(DispatchError::InvalidState(format!(
                "template {} is not active",
                template.id
            )));
        }

        let entries = self
            .resolver
            .resolve(&request.recipient_list_id)
            .await
            .map_err(|e| match e {
                ResolveError::NotFound(id) => DispatchError::NotFound {
                    entity: "recipient list",
                    id,
                },
                ResolveError::Inactive(id) => {
                    DispatchError::InvalidState(format!("recipient list {} is inactive", id))
                }
                ResolveError::Empty(id) => {
                    DispatchError::InvalidState(format!("recipient list {} has no recipients", id))
                }
                ResolveError::Backend(message) => DispatchError::Persistence(message),
            })?;

        if entries.is_empty() {
            return Err(DispatchError::InvalidState(format!(
                "recipient list {} has no recipients",
                request.recipient_list_id
            )));
        }

        let campaign = CampaignRecord::new(
            request.name.clone(),
            request.template_id.clone(),
            request.recipient_list_id.clone(),
            request.initiated_by.clone(),
            entries.len() as u64,
        );
        self.campaigns
            .create(&campaign)
            .await
            .map_err(|e| DispatchError::Persistence(e.to_string()))?;

        // Seed the ledger in full before the first send, so progress queries
        // issued mid-run always see a consistent total.
        let rows: Vec<DeliveryEntry> = entries
            .iter()
            .map(|entry| DeliveryEntry::pending(&campaign.id, entry))
            .collect();
        self.ledger
            .seed(&rows)
            .await
            .map_err(|e| DispatchError::Persistence(e.to_string()))?;

        info!(
            campaign_id = %campaign.id,
            template_id = %template.id,
            total_recipients = entries.len(),
            initiated_by = %request.initiated_by,
            "Starting campaign dispatch"
        );

        let mut sent: Vec<SentRecipient> = Vec::new();
        let mut failed: Vec<FailedRecipient> = Vec::new();
        let mut cancelled = false;

        for entry in &entries {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            self.pacer.acquire().await;

            match entry {
                RecipientEntry::Unresolved { mr_id, reason } => {
                    // Unresolvable MR reference: immediate per-recipient failure,
                    // no provider call.
                    warn!(campaign_id = %campaign.id, mr_id = %mr_id, reason = %reason,
                        "Skipping unresolved recipient");
                    let error = self
                        .record_failed(&campaign.id, mr_id, reason)
                        .await
                        .unwrap_or_else(|write_err| write_err);
                    failed.push(FailedRecipient {
                        mr_id: mr_id.clone(),
                        phone: String::new(),
                        first_name: None,
                        last_name: None,
                        error,
                    });
                }
                RecipientEntry::Resolved(recipient) => {
                    self.attempt_recipient(&campaign, &template, recipient, &mut sent, &mut failed)
                        .await;
                }
            }
        }

        if cancelled {
            let remaining = self
                .ledger
                .cancel_pending(&campaign.id)
                .await
                .map_err(|e| DispatchError::Persistence(e.to_string()))?;
            info!(campaign_id = %campaign.id, remaining, "Campaign cancelled mid-run");
        }

        let state = if cancelled {
            CampaignState::Cancelled
        } else if sent.is_empty() {
            CampaignState::Failed
        } else {
            CampaignState::Completed
        };

        self.campaigns
            .finalize(&campaign.id, state, sent.len() as u64, failed.len() as u64)
            .await
            .map_err(|e| DispatchError::Persistence(e.to_string()))?;

        info!(
            campaign_id = %campaign.id,
            status = %state,
            sent = sent.len(),
            failed = failed.len(),
            "Campaign dispatch finished"
        );

        Ok(CampaignResult {
            campaign_id: campaign.id,
            campaign_name: campaign.name,
            total_recipients: campaign.total_recipients,
            state,
            sent,
            failed,
        })
    }

    /// One send attempt for a resolved recipient. At most one provider call;
    /// the outcome lands in the ledger and in exactly one of the two lists.
    async fn attempt_recipient(
        &self,
        campaign: &CampaignRecord,
        template: &MessageTemplate,
        recipient: &Recipient,
        sent: &mut Vec<SentRecipient>,
        failed: &mut Vec<FailedRecipient>,
    ) {
        let parameters = match build_parameters(template, recipient) {
            Ok(parameters) => parameters,
            Err(message) => {
                warn!(campaign_id = %campaign.id, mr_id = %recipient.mr_id, error = %message,
                    "Recipient parameters incomplete");
                let error = self
                    .record_failed(&campaign.id, &recipient.mr_id, &message)
                    .await
                    .unwrap_or_else(|write_err| write_err);
                failed.push(failed_recipient(recipient, error));
                return;
            }
        };

        let locale = if template.locale.is_empty() {
            self.config.default_locale.as_str()
        } else {
            template.locale.as_str()
        };

        debug!(campaign_id = %campaign.id, mr_id = %recipient.mr_id, phone = %recipient.phone,
            "Sending template message");

        let outcome = tokio::time::timeout(
            self.config.send_timeout,
            self.sender
                .send(&recipient.phone, template, &parameters, locale),
        )
        .await;

        match outcome {
            Ok(Ok(receipt)) => {
                match self
                    .record_sent(&campaign.id, &recipient.mr_id, &receipt.message_id)
                    .await
                {
                    Ok(()) => sent.push(SentRecipient {
                        mr_id: recipient.mr_id.clone(),
                        phone: recipient.phone.clone(),
                        first_name: recipient.first_name.clone(),
                        last_name: recipient.last_name.clone(),
                        message_id: receipt.message_id,
                        status: receipt.status,
                    }),
                    // The send happened but its outcome could not be recorded.
                    // Surfaced as a per-recipient partial write failure rather
                    // than silently claiming success.
                    Err(write_err) => failed.push(failed_recipient(recipient, write_err)),
                }
            }
            Ok(Err(send_err)) => {
                warn!(campaign_id = %campaign.id, mr_id = %recipient.mr_id, error = %send_err,
                    "Provider send failed");
                let error = self
                    .record_failed(&campaign.id, &recipient.mr_id, &send_err.message)
                    .await
                    .unwrap_or_else(|write_err| write_err);
                failed.push(failed_recipient(recipient, error));
            }
            Err(_elapsed) => {
                let message = format!(
                    "send timed out after {}s",
                    self.config.send_timeout.as_secs()
                );
                warn!(campaign_id = %campaign.id, mr_id = %recipient.mr_id, "{}", message);
                let error = self
                    .record_failed(&campaign.id, &recipient.mr_id, &message)
                    .await
                    .unwrap_or_else(|write_err| write_err);
                failed.push(failed_recipient(recipient, error));
            }
        }
    }

    /// Ledger write with bounded retry. Losing the outcome of a send that
    /// already happened is worse than a few extra write attempts.
    async fn record_sent(
        &self,
        campaign_id: &str,
        mr_id: &str,
        provider_message_id: &str,
    ) -> Result<(), String> {
        let at = Utc::now();
        let mut last_error = String::new();
        for attempt in 0..=self.config.ledger_write_retries {
            match self
                .ledger
                .mark_sent(campaign_id, mr_id, provider_message_id, at)
                .await
            {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(campaign_id, mr_id, attempt, error = %e, "Ledger write failed");
                    last_error = e.to_string();
                }
            }
        }
        Err(format!(
            "partial write failure: sent outcome for {} not recorded: {}",
            mr_id, last_error
        ))
    }

    /// Records a failure in the ledger and returns the error message that
    /// should appear in the result (the original one, or a partial-write
    /// message when even the ledger write kept failing).
    async fn record_failed(
        &self,
        campaign_id: &str,
        mr_id: &str,
        error: &str,
    ) -> Result<String, String> {
        let at = Utc::now();
        let mut last_error = String::new();
        for attempt in 0..=self.config.ledger_write_retries {
            match self.ledger.mark_failed(campaign_id, mr_id, error, at).await {
                Ok(()) => return Ok(error.to_string()),
                Err(e) => {
                    warn!(campaign_id, mr_id, attempt, error = %e, "Ledger write failed");
                    last_error = e.to_string();
                }
            }
        }
        Err(format!(
            "partial write failure: failed outcome for {} not recorded ({}): {}",
            mr_id, error, last_error
        ))
    }
}

fn failed_recipient(recipient: &Recipient, error: String) -> FailedRecipient {
    FailedRecipient {
        mr_id: recipient.mr_id.clone(),
        phone: recipient.phone.clone(),
        first_name: recipient.first_name.clone(),
        last_name: recipient.last_name.clone(),
        error,
    }
}

/// Build the (placeholder, value) pairs for one recipient, in template body
/// order. Recipient-specific parameters win; the `{first_name, last_name}`
/// pair is the fallback for recipients without a parameter map.
pub fn build_parameters(
    template: &MessageTemplate,
    recipient: &Recipient,
) -> Result<Vec<(String, String)>, String> {
    let mut parameters = Vec::with_capacity(template.placeholders.len());

    for placeholder in &template.placeholders {
        let value = recipient
            .parameters
            .as_ref()
            .and_then(|params| params.get(placeholder).cloned())
            .or_else(|| match placeholder.as_str() {
                "first_name" => Some(
                    recipient
                        .first_name
                        .clone()
                        .unwrap_or_else(|| "User".to_string()),
                ),
                "last_name" => Some(recipient.last_name.clone().unwrap_or_default()),
                _ => None,
            });

        match value {
            Some(value) => parameters.push((placeholder.clone(), value)),
            None => {
                return Err(format!(
                    "no value for template placeholder '{}'",
                    placeholder
                ))
            }
        }
    }

    Ok(parameters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn template_with(placeholders: &[&str]) -> MessageTemplate {
        MessageTemplate {
            id: "tpl-1".to_string(),
            code: "mr_product_launch".to_string(),
            locale: "en".to_string(),
            placeholders: placeholders.iter().map(|s| s.to_string()).collect(),
            active: true,
        }
    }

    fn recipient(params: Option<BTreeMap<String, String>>) -> Recipient {
        Recipient {
            mr_id: "mr-1".to_string(),
            phone: "+15550001111".to_string(),
            first_name: Some("Asha".to_string()),
            last_name: Some("Patel".to_string()),
            parameters: params,
        }
    }

    #[test]
    fn parameters_prefer_recipient_map() {
        let mut params = BTreeMap::new();
        params.insert("first_name".to_string(), "Dr. Asha".to_string());
        params.insert("product".to_string(), "CardioMax".to_string());

        let template = template_with(&["product", "first_name"]);
        let built = build_parameters(&template, &recipient(Some(params))).unwrap();

        assert_eq!(
            built,
            vec![
                ("product".to_string(), "CardioMax".to_string()),
                ("first_name".to_string(), "Dr. Asha".to_string()),
            ]
        );
    }

    #[test]
    fn parameters_fall_back_to_names() {
        let template = template_with(&["first_name", "last_name"]);
        let built = build_parameters(&template, &recipient(None)).unwrap();

        assert_eq!(
            built,
            vec![
                ("first_name".to_string(), "Asha".to_string()),
                ("last_name".to_string(), "Patel".to_string()),
            ]
        );
    }

    #[test]
    fn parameters_fallback_defaults_when_names_missing() {
        let template = template_with(&["first_name", "last_name"]);
        let mut r = recipient(None);
        r.first_name = None;
        r.last_name = None;

        let built = build_parameters(&template, &r).unwrap();
        assert_eq!(
            built,
            vec![
                ("first_name".to_string(), "User".to_string()),
                ("last_name".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn missing_placeholder_value_is_an_error() {
        let template = template_with(&["product"]);
        let err = build_parameters(&template, &recipient(None)).unwrap_err();
        assert!(err.contains("product"));
    }

    #[test]
    fn cancel_flag_latches() {
        let flag = CancelFlag::new();
        assert!(!flag.is_cancelled());
        flag.cancel();
        assert!(flag.is_cancelled());
        let clone = flag.clone();
        assert!(clone.is_cancelled());
    }
}
