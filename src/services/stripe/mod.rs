// async-stripe is compiled with runtime-tokio-hyper, checkout, webhook-events and connect; the
// last two are needed for the webhook payload types even though only signature verification is
// used here.
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum StripeServiceError {
    #[error("webhook verification failed: {0}")]
    Webhook(String),
    #[error("serialization error: {0}")]
    Serde(String),
}

impl From<stripe::WebhookError> for StripeServiceError {
    fn from(err: stripe::WebhookError) -> Self {
        StripeServiceError::Webhook(err.to_string())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    pub r#type: String,
    pub payload: serde_json::Value,
}

pub trait StripeService: Send + Sync {
    fn verify_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<StripeEvent, StripeServiceError>;
}

mod live;
#[cfg(test)]
mod mock;

pub use live::LiveStripeService;
#[cfg(test)]
pub use mock::MockStripeService;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_verify_webhook_invalid_signature_maps_to_webhook_error() {
        let live = LiveStripeService::new("whsec_test");
        let payload = br#"{ "id": "evt_123", "type": "customer.subscription.updated" }"#;
        let result = live.verify_webhook(payload, "t=1,v1=invalidsignature");
        assert!(matches!(result, Err(StripeServiceError::Webhook(_))));
    }

    #[test]
    fn live_verify_webhook_rejects_non_utf8_payload() {
        let live = LiveStripeService::new("whsec_test");
        let result = live.verify_webhook(&[0xff, 0xfe], "t=1,v1=sig");
        assert!(matches!(result, Err(StripeServiceError::Serde(_))));
    }

    #[test]
    fn mock_records_verified_events() {
        let mock = MockStripeService::new();
        let payload = br#"{ "id": "evt_9", "type": "invoice.payment_failed", "data": {} }"#;
        let event = mock.verify_webhook(payload, "t=1,v1=stub").unwrap();
        assert_eq!(event.id, "evt_9");
        assert_eq!(event.r#type, "invoice.payment_failed");
        assert_eq!(mock.events.lock().unwrap().len(), 1);
    }

    #[test]
    fn mock_can_reject_signatures() {
        let mock = MockStripeService::rejecting();
        let result = mock.verify_webhook(b"{}", "t=1,v1=stub");
        assert!(matches!(result, Err(StripeServiceError::Webhook(_))));
    }
}
