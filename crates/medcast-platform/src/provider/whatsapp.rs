//! WhatsApp Cloud API Sender
//!
//! Sends one template message per call via
//! `POST {base}/{phone_number_id}/messages` with a Bearer token.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use medcast_common::{MessageTemplate, ProviderReceipt};
use medcast_engine::{MessageSender, SendError};

/// WhatsApp sender configuration
#[derive(Debug, Clone)]
pub struct WhatsAppConfig {
    /// Graph API base URL
    pub api_base_url: String,
    /// Business phone number id messages are sent from
    pub phone_number_id: String,
    /// Bearer token
    pub access_token: String,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Request timeout
    pub request_timeout: Duration,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://graph.facebook.com/v19.0".to_string(),
            phone_number_id: String::new(),
            access_token: String::new(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Outbound message payload (matches the Cloud API template message shape)
#[derive(Debug, Serialize)]
struct TemplateMessageRequest {
    messaging_product: &'static str,
    to: String,
    #[serde(rename = "type")]
    message_type: &'static str,
    template: TemplatePayload,
}

#[derive(Debug, Serialize)]
struct TemplatePayload {
    name: String,
    language: LanguagePayload,
    components: Vec<ComponentPayload>,
}

#[derive(Debug, Serialize)]
struct LanguagePayload {
    code: String,
}

#[derive(Debug, Serialize)]
struct ComponentPayload {
    #[serde(rename = "type")]
    component_type: &'static str,
    parameters: Vec<ParameterPayload>,
}

#[derive(Debug, Serialize)]
struct ParameterPayload {
    #[serde(rename = "type")]
    parameter_type: &'static str,
    text: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    messages: Vec<MessageId>,
}

#[derive(Debug, Deserialize)]
struct MessageId {
    id: String,
}

/// HTTP sender against the WhatsApp Cloud API
pub struct WhatsAppSender {
    config: WhatsAppConfig,
    client: reqwest::Client,
}

impl WhatsAppSender {
    pub fn new(config: WhatsAppConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self { config, client })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/{}/messages",
            self.config.api_base_url, self.config.phone_number_id
        )
    }

    fn build_request(
        &self,
        phone: &str,
        template: &MessageTemplate,
        parameters: &[(String, String)],
        locale: &str,
    ) -> TemplateMessageRequest {
        // Body parameters are positional on the wire; the pairs arrive in
        // template body order already.
        let components = if parameters.is_empty() {
            Vec::new()
        } else {
            vec![ComponentPayload {
                component_type: "body",
                parameters: parameters
                    .iter()
                    .map(|(_, value)| ParameterPayload {
                        parameter_type: "text",
                        text: value.clone(),
                    })
                    .collect(),
            }]
        };

        TemplateMessageRequest {
            messaging_product: "whatsapp",
            to: phone.to_string(),
            message_type: "template",
            template: TemplatePayload {
                name: template.code.clone(),
                language: LanguagePayload {
                    code: locale.to_string(),
                },
                components,
            },
        }
    }
}

#[async_trait]
impl MessageSender for WhatsAppSender {
    async fn send(
        &self,
        phone: &str,
        template: &MessageTemplate,
        parameters: &[(String, String)],
        locale: &str,
    ) -> Result<ProviderReceipt, SendError> {
        let url = self.messages_url();
        let payload = self.build_request(phone, template, parameters, locale);

        debug!(to = %phone, template = %template.code, "Sending WhatsApp template message");

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.config.access_token),
            )
            .json(&payload)
            .send()
            .await
            .map_err(|e| SendError::new(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(to = %phone, %status, "WhatsApp send failed: {}", error_body);
            return Err(SendError::new(format!("HTTP {}: {}", status, error_body)));
        }

        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|e| SendError::new(format!("Parse error: {}", e)))?;

        let message_id = body
            .messages
            .into_iter()
            .next()
            .map(|m| m.id)
            .ok_or_else(|| SendError::new("No message id in response"))?;

        Ok(ProviderReceipt {
            message_id,
            status: "accepted".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_template() -> MessageTemplate {
        MessageTemplate {
            id: "tpl-1".to_string(),
            code: "mr_product_launch".to_string(),
            locale: "en".to_string(),
            placeholders: vec!["first_name".to_string()],
            active: true,
        }
    }

    fn sender_for(server: &MockServer) -> WhatsAppSender {
        WhatsAppSender::new(WhatsAppConfig {
            api_base_url: server.uri(),
            phone_number_id: "12345".to_string(),
            access_token: "token-abc".to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn sends_template_message_and_returns_receipt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/12345/messages"))
            .and(header("Authorization", "Bearer token-abc"))
            .and(body_partial_json(json!({
                "messaging_product": "whatsapp",
                "to": "+15550000001",
                "type": "template",
                "template": {
                    "name": "mr_product_launch",
                    "language": { "code": "en" },
                    "components": [{
                        "type": "body",
                        "parameters": [{ "type": "text", "text": "Asha" }]
                    }]
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "messaging_product": "whatsapp",
                "contacts": [{ "input": "+15550000001", "wa_id": "15550000001" }],
                "messages": [{ "id": "wamid.ABC123" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let sender = sender_for(&server);
        let receipt = sender
            .send(
                "+15550000001",
                &test_template(),
                &[("first_name".to_string(), "Asha".to_string())],
                "en",
            )
            .await
            .unwrap();

        assert_eq!(receipt.message_id, "wamid.ABC123");
        assert_eq!(receipt.status, "accepted");
    }

    #[tokio::test]
    async fn non_success_status_is_a_send_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/12345/messages"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "message": "(#132001) Template name does not exist" }
            })))
            .mount(&server)
            .await;

        let sender = sender_for(&server);
        let err = sender
            .send("+15550000001", &test_template(), &[], "en")
            .await
            .unwrap_err();

        assert!(err.message.contains("HTTP 400"));
        assert!(err.message.contains("132001"));
    }

    #[tokio::test]
    async fn missing_message_id_is_a_send_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/12345/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "messaging_product": "whatsapp",
                "messages": []
            })))
            .mount(&server)
            .await;

        let sender = sender_for(&server);
        let err = sender
            .send("+15550000001", &test_template(), &[], "en")
            .await
            .unwrap_err();

        assert!(err.message.contains("No message id"));
    }
}
