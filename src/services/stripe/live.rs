use super::{StripeEvent, StripeService, StripeServiceError};

pub struct LiveStripeService {
    webhook_secret: String,
}

impl LiveStripeService {
    pub fn new(webhook_secret: impl Into<String>) -> Self {
        Self {
            webhook_secret: webhook_secret.into(),
        }
    }

    pub fn from_settings(settings: &crate::config::StripeSettings) -> Self {
        Self::new(settings.webhook_secret.clone())
    }
}

impl StripeService for LiveStripeService {
    fn verify_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<StripeEvent, StripeServiceError> {
        let payload_str =
            std::str::from_utf8(payload).map_err(|e| StripeServiceError::Serde(e.to_string()))?;
        let event =
            stripe::Webhook::construct_event(payload_str, signature_header, &self.webhook_secret)?;
        // Keep the raw body so fields async-stripe does not model survive.
        let payload: serde_json::Value = serde_json::from_str(payload_str)
            .map_err(|e| StripeServiceError::Serde(e.to_string()))?;
        Ok(StripeEvent {
            id: event.id.to_string(),
            r#type: event.type_.to_string(),
            payload,
        })
    }
}
