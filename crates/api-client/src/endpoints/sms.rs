//! SMS relay endpoint

use crate::client::GeoremindClient;
use crate::error::{ApiError, ApiResult};
use georemind_engine::{NotifyError, SmsGateway, SmsMessage};
use serde::{Deserialize, Serialize};
use tracing::info;

/// SMS relay API interface
#[derive(Clone)]
pub struct SmsApi {
    client: GeoremindClient,
}

#[derive(Serialize)]
struct SmsRequest<'a> {
    to: &'a str,
    body: &'a str,
}

/// Relay acknowledgement
#[derive(Debug, Clone, Deserialize)]
pub struct SmsReceipt {
    /// Whether the relay accepted the message
    #[serde(default = "default_success")]
    pub success: bool,
    /// Provider message id; older relays call it `messageSid`
    #[serde(default, alias = "messageSid")]
    pub sid: Option<String>,
    /// Failure reason when `success` is false
    #[serde(default)]
    pub error: Option<String>,
}

fn default_success() -> bool {
    true
}

impl SmsApi {
    /// Create a new SMS API interface
    pub(crate) fn new(client: GeoremindClient) -> Self {
        Self { client }
    }

    /// Ask the relay to deliver one message
    pub async fn send_message(&self, message: &SmsMessage) -> ApiResult<SmsReceipt> {
        if message.to.trim().is_empty() {
            return Err(ApiError::InvalidInput("SMS recipient is empty".into()));
        }

        let config = self.client.config();
        let receipt: SmsReceipt = self
            .client
            .post_url(
                &config.sms_url,
                &SmsRequest {
                    to: &message.to,
                    body: &message.body,
                },
                config.sms_timeout,
            )
            .await?;

        if !receipt.success {
            return Err(ApiError::Rejected(
                receipt.error.unwrap_or_else(|| "no reason given".to_string()),
            ));
        }

        info!(sid = ?receipt.sid, "SMS accepted by relay");
        Ok(receipt)
    }
}

impl SmsGateway for SmsApi {
    async fn send(&self, message: SmsMessage) -> Result<Option<String>, NotifyError> {
        let receipt = self.send_message(&message).await?;
        Ok(receipt.sid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::test_support::serve_once;

    fn client_for(url: &str) -> GeoremindClient {
        GeoremindClient::with_config(ClientConfig::default().with_sms_url(url)).unwrap()
    }

    fn message() -> SmsMessage {
        SmsMessage {
            to: "+233000000000".into(),
            body: "Reminder: Buy milk at (5.6, -0.2)".into(),
        }
    }

    #[test]
    fn test_receipt_accepts_both_sid_spellings() {
        let a: SmsReceipt = serde_json::from_str(r#"{"success": true, "sid": "SM1"}"#).unwrap();
        let b: SmsReceipt = serde_json::from_str(r#"{"success": true, "messageSid": "SM2"}"#).unwrap();
        assert_eq!(a.sid.as_deref(), Some("SM1"));
        assert_eq!(b.sid.as_deref(), Some("SM2"));
    }

    #[tokio::test]
    async fn test_send_posts_json_with_request_id() {
        let server = serve_once(200, r#"{"success": true, "messageSid": "SM42"}"#);
        let sms = client_for(&format!("{}/send-sms", server.url)).sms();

        let sid = SmsGateway::send(&sms, message()).await.unwrap();
        assert_eq!(sid.as_deref(), Some("SM42"));

        let request = server.request();
        assert!(request.starts_with("POST /send-sms"));
        assert!(request.to_lowercase().contains("x-request-id:"));
        assert!(request.contains(r#""to":"+233000000000""#));
        assert!(request.contains("Reminder: Buy milk"));
    }

    #[tokio::test]
    async fn test_relay_failure_surfaces_error_message() {
        let server = serve_once(500, r#"{"success": false, "error": "Authenticate"}"#);
        let sms = client_for(&server.url).sms();

        let err = sms.send_message(&message()).await.unwrap_err();
        assert!(err.is_server_error());
        assert!(err.to_string().contains("Authenticate"));
    }

    #[tokio::test]
    async fn test_success_false_is_rejected() {
        let server = serve_once(200, r#"{"success": false, "error": "invalid number"}"#);
        let sms = client_for(&server.url).sms();

        let err = sms.send_message(&message()).await.unwrap_err();
        assert!(matches!(err, ApiError::Rejected(ref reason) if reason == "invalid number"));
    }

    #[tokio::test]
    async fn test_empty_recipient_is_not_sent() {
        let sms = client_for("http://127.0.0.1:9/send-sms").sms();
        let mut msg = message();
        msg.to = "  ".into();
        assert!(matches!(sms.send_message(&msg).await, Err(ApiError::InvalidInput(_))));
    }
}
