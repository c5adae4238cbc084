//! Campaign REST API
//!
//! Submit endpoint plus campaign detail and stats reads. Submit runs the
//! dispatch synchronously and returns the full per-recipient outcome.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use medcast_engine::{
    CampaignAggregator, DeliveryStats, DispatchEngine, FailedRecipient, SentRecipient,
    SubmitRequest,
};

use crate::campaign::entity::Campaign;
use crate::campaign::repository::CampaignRepository;
use crate::delivery::repository::DeliveryRepository;
use crate::shared::error::{PlatformError, Result};

/// Shared handler state
#[derive(Clone)]
pub struct CampaignApiState {
    pub engine: Arc<DispatchEngine>,
    pub aggregator: Arc<CampaignAggregator>,
    pub campaigns: Arc<CampaignRepository>,
    pub deliveries: Arc<DeliveryRepository>,
}

pub fn router(state: CampaignApiState) -> Router {
    Router::new()
        .route("/api/campaigns", post(submit_campaign))
        .route("/api/campaigns/:id", get(get_campaign))
        .route("/api/campaigns/:id/stats", get(get_campaign_stats))
        .with_state(state)
}

/// Submit request body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitCampaignRequest {
    pub name: String,
    pub template_id: String,
    pub recipient_list_id: String,
}

/// One successfully delivered recipient in the submit response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientResultResponse {
    pub mr_id: String,
    pub phone: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub success: bool,
    pub message_id: String,
    pub status: String,
}

impl From<SentRecipient> for RecipientResultResponse {
    fn from(sent: SentRecipient) -> Self {
        Self {
            mr_id: sent.mr_id,
            phone: sent.phone,
            first_name: sent.first_name,
            last_name: sent.last_name,
            success: true,
            message_id: sent.message_id,
            status: sent.status,
        }
    }
}

/// One failed recipient in the submit response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientErrorResponse {
    pub mr_id: String,
    pub phone: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub error: String,
}

impl From<FailedRecipient> for RecipientErrorResponse {
    fn from(failed: FailedRecipient) -> Self {
        Self {
            mr_id: failed.mr_id,
            phone: failed.phone,
            first_name: failed.first_name,
            last_name: failed.last_name,
            error: failed.error,
        }
    }
}

/// Submit response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitCampaignResponse {
    pub campaign_id: String,
    pub campaign_name: String,
    pub total_recipients: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub status: String,
    pub results: Vec<RecipientResultResponse>,
    pub errors: Vec<RecipientErrorResponse>,
}

/// One delivery row in the campaign detail response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRowResponse {
    pub id: String,
    pub phone: String,
    pub status: String,
    pub sent_at: Option<String>,
    pub error_message: Option<String>,
}

/// Campaign detail response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignDetailResponse {
    pub campaign: CampaignResponse,
    pub stats: DeliveryStats,
    pub recipients: Vec<DeliveryRowResponse>,
}

/// Campaign summary DTO
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignResponse {
    pub id: String,
    pub name: String,
    pub template_id: String,
    pub recipient_list_id: String,
    pub initiated_by: String,
    pub total_recipients: u64,
    pub sent_count: u64,
    pub failed_count: u64,
    pub status: String,
    pub created_at: String,
}

impl From<Campaign> for CampaignResponse {
    fn from(campaign: Campaign) -> Self {
        Self {
            id: campaign.id,
            name: campaign.name,
            template_id: campaign.template_id,
            recipient_list_id: campaign.recipient_list_id,
            initiated_by: campaign.initiated_by,
            total_recipients: campaign.total_recipients,
            sent_count: campaign.sent_count,
            failed_count: campaign.failed_count,
            status: campaign.status.to_string(),
            created_at: campaign.created_at.to_rfc3339(),
        }
    }
}

/// Actor id from the authenticated request headers
fn actor_id(headers: &HeaderMap) -> String {
    headers
        .get("x-actor-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("system")
        .to_string()
}

async fn submit_campaign(
    State(state): State<CampaignApiState>,
    headers: HeaderMap,
    Json(body): Json<SubmitCampaignRequest>,
) -> Result<Json<SubmitCampaignResponse>> {
    let initiated_by = actor_id(&headers);
    info!(name = %body.name, template_id = %body.template_id, %initiated_by,
        "Campaign submitted");

    let result = state
        .engine
        .submit(SubmitRequest {
            name: body.name,
            template_id: body.template_id,
            recipient_list_id: body.recipient_list_id,
            initiated_by,
        })
        .await
        .map_err(PlatformError::from)?;

    Ok(Json(SubmitCampaignResponse {
        campaign_id: result.campaign_id,
        campaign_name: result.campaign_name,
        total_recipients: result.total_recipients,
        success_count: result.sent.len() as u64,
        failure_count: result.failed.len() as u64,
        status: result.state.to_string(),
        results: result.sent.into_iter().map(Into::into).collect(),
        errors: result.failed.into_iter().map(Into::into).collect(),
    }))
}

async fn get_campaign(
    State(state): State<CampaignApiState>,
    Path(id): Path<String>,
) -> Result<Json<CampaignDetailResponse>> {
    let campaign = state
        .campaigns
        .find_by_id(&id)
        .await?
        .ok_or_else(|| PlatformError::not_found("campaign", &id))?;

    let records = state.deliveries.find_by_campaign(&id).await?;
    let stats = state
        .aggregator
        .stats(&id)
        .await
        .map_err(|e| PlatformError::internal(e.to_string()))?;

    let recipients = records
        .into_iter()
        .map(|record| DeliveryRowResponse {
            id: record.mr_id,
            phone: record.phone,
            status: record.status.to_string(),
            sent_at: record.sent_at.map(|t| t.to_rfc3339()),
            error_message: record.error_message,
        })
        .collect();

    Ok(Json(CampaignDetailResponse {
        campaign: campaign.into(),
        stats,
        recipients,
    }))
}

async fn get_campaign_stats(
    State(state): State<CampaignApiState>,
    Path(id): Path<String>,
) -> Result<Json<DeliveryStats>> {
    // 404 for unknown campaigns rather than an all-zero stats body
    state
        .campaigns
        .find_by_id(&id)
        .await?
        .ok_or_else(|| PlatformError::not_found("campaign", &id))?;

    let stats = state
        .aggregator
        .stats(&id)
        .await
        .map_err(|e| PlatformError::internal(e.to_string()))?;
    Ok(Json(stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use medcast_common::CampaignState;

    #[test]
    fn sent_recipient_maps_with_success_true() {
        let sent = SentRecipient {
            mr_id: "mr-1".to_string(),
            phone: "+15550000001".to_string(),
            first_name: Some("Asha".to_string()),
            last_name: Some("Patel".to_string()),
            message_id: "wamid.1".to_string(),
            status: "accepted".to_string(),
        };
        let dto = RecipientResultResponse::from(sent);
        assert!(dto.success);

        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["mrId"], "mr-1");
        assert_eq!(json["messageId"], "wamid.1");
        assert_eq!(json["success"], true);
    }

    #[test]
    fn submit_response_uses_screaming_status() {
        let response = SubmitCampaignResponse {
            campaign_id: "0ABC123456789".to_string(),
            campaign_name: "Launch".to_string(),
            total_recipients: 2,
            success_count: 1,
            failure_count: 1,
            status: CampaignState::Completed.to_string(),
            results: vec![],
            errors: vec![],
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "COMPLETED");
        assert_eq!(json["successCount"], 1);
        assert_eq!(json["failureCount"], 1);
    }
}
