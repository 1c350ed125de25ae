use super::{StripeEvent, StripeService, StripeServiceError};
use std::sync::{Arc, Mutex};

/// Accepts any signature (unless built with `rejecting`) and parses the body
/// as the event.
#[derive(Clone, Default)]
pub struct MockStripeService {
    pub events: Arc<Mutex<Vec<StripeEvent>>>,
    pub reject_signatures: bool,
}

impl MockStripeService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting() -> Self {
        Self {
            reject_signatures: true,
            ..Default::default()
        }
    }
}

impl StripeService for MockStripeService {
    fn verify_webhook(
        &self,
        payload: &[u8],
        _signature_header: &str,
    ) -> Result<StripeEvent, StripeServiceError> {
        if self.reject_signatures {
            return Err(StripeServiceError::Webhook("signature mismatch".into()));
        }
        let val: serde_json::Value = serde_json::from_slice(payload)
            .map_err(|e| StripeServiceError::Serde(e.to_string()))?;
        let id = val
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or("evt_test")
            .to_string();
        let ty = val
            .get("type")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string();
        let evt = StripeEvent {
            id,
            r#type: ty,
            payload: val,
        };
        self.events.lock().unwrap().push(evt.clone());
        Ok(evt)
    }
}
