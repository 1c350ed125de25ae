use axum::Json;
use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use time::OffsetDateTime;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::plan::{PlanId, PLAN_FREE};
use crate::models::subscription::{Subscription, SubscriptionStatus};
use crate::responses::JsonResponse;
use crate::state::AppState;

// Small helper: nested json lookup
fn jget<'a>(val: &'a serde_json::Value, path: &[&str]) -> Option<&'a serde_json::Value> {
    let mut cur = val;
    for key in path {
        cur = cur.get(*key)?;
    }
    Some(cur)
}

fn extract_str<'a>(val: &'a serde_json::Value, path: &[&str]) -> Option<&'a str> {
    jget(val, path)?.as_str()
}

fn extract_i64(val: &serde_json::Value, path: &[&str]) -> Option<i64> {
    jget(val, path)?.as_i64()
}

fn extract_bool(val: &serde_json::Value, path: &[&str]) -> Option<bool> {
    jget(val, path)?.as_bool()
}

fn extract_timestamp(val: &serde_json::Value, path: &[&str]) -> Option<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp(extract_i64(val, path)?).ok()
}

/// `customer` arrives either as an id or as an expanded object.
fn extract_customer_id(object: &serde_json::Value) -> Option<String> {
    extract_str(object, &["customer"])
        .or_else(|| extract_str(object, &["customer", "id"]))
        .map(str::to_string)
}

const SUBSCRIPTION_EVENTS: [&str; 3] = [
    "customer.subscription.created",
    "customer.subscription.updated",
    "customer.subscription.deleted",
];
const PAYMENT_FAILED: &str = "invoice.payment_failed";

fn received() -> Response {
    Json(serde_json::json!({ "received": true })).into_response()
}

async fn resolve_team(
    state: &AppState,
    object: &serde_json::Value,
    customer_id: Option<&str>,
) -> Result<Option<Uuid>, sqlx::Error> {
    if let Some(team_id) =
        extract_str(object, &["metadata", "team_id"]).and_then(|raw| Uuid::parse_str(raw).ok())
    {
        return Ok(Some(team_id));
    }
    match customer_id {
        Some(customer_id) => {
            state
                .subscriptions
                .find_team_by_stripe_customer(customer_id)
                .await
        }
        None => Ok(None),
    }
}

// POST /api/billing/webhook
pub async fn webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Response {
    let sig = match headers
        .get("Stripe-Signature")
        .and_then(|h| h.to_str().ok())
    {
        Some(s) => s,
        None => return JsonResponse::bad_request("Missing Stripe-Signature").into_response(),
    };

    let evt = match app_state.stripe.verify_webhook(&body, sig) {
        Ok(e) => e,
        Err(err) => {
            warn!(?err, "stripe webhook verification failed");
            return JsonResponse::bad_request("invalid webhook").into_response();
        }
    };

    let evt_type = evt.r#type.as_str();
    let object = match jget(&evt.payload, &["data", "object"]) {
        Some(object) => object,
        None => {
            warn!(event_id = %evt.id, evt_type, "stripe event without data.object");
            return received();
        }
    };

    if evt_type != PAYMENT_FAILED && !SUBSCRIPTION_EVENTS.contains(&evt_type) {
        info!(event_id = %evt.id, evt_type, "ignoring stripe event");
        return received();
    }

    match app_state.stripe_events.has_processed_event(&evt.id).await {
        Ok(true) => {
            info!(event_id = %evt.id, evt_type, "stripe event already processed");
            return received();
        }
        Ok(false) => {}
        Err(err) => {
            error!(?err, event_id = %evt.id, "failed to check stripe event log");
            return JsonResponse::server_error("Failed to process webhook").into_response();
        }
    }

    // Stripe does not guarantee delivery order; `created` orders the events.
    let event_at = extract_timestamp(&evt.payload, &["created"]);
    let resp = if evt_type == PAYMENT_FAILED {
        mark_payment_failed(&app_state, &evt.id, event_at, object).await
    } else {
        sync_subscription(&app_state, &evt.id, evt_type, event_at, object).await
    };

    if resp.status().is_success() {
        if let Err(err) = app_state.stripe_events.record_event(&evt.id, evt_type).await {
            warn!(?err, event_id = %evt.id, "failed to record processed stripe event");
        }
    }
    resp
}

async fn sync_subscription(
    state: &AppState,
    event_id: &str,
    evt_type: &str,
    event_at: Option<OffsetDateTime>,
    object: &serde_json::Value,
) -> Response {
    let customer_id = extract_customer_id(object);
    let team_id = match resolve_team(state, object, customer_id.as_deref()).await {
        Ok(Some(team_id)) => team_id,
        Ok(None) => {
            warn!(event_id, ?customer_id, "subscription event does not map to a team");
            return received();
        }
        Err(err) => {
            error!(?err, event_id, "failed to resolve team for subscription event");
            return JsonResponse::server_error("Failed to process webhook").into_response();
        }
    };

    let existing = match state.subscriptions.find_for_team(team_id).await {
        Ok(existing) => existing,
        Err(err) => {
            error!(?err, %team_id, "failed to load subscription for webhook");
            return JsonResponse::server_error("Failed to process webhook").into_response();
        }
    };
    if existing
        .as_ref()
        .is_some_and(|sub| sub.has_newer_event_than(event_at))
    {
        info!(event_id, %team_id, "skipping subscription event older than the stored state");
        return received();
    }

    let status = if evt_type == "customer.subscription.deleted" {
        Some(SubscriptionStatus::Canceled)
    } else {
        extract_str(object, &["status"]).and_then(SubscriptionStatus::from_stripe)
    };
    let status = match status.or_else(|| existing.as_ref().map(|s| s.status)) {
        Some(status) => status,
        None => {
            warn!(event_id, %team_id, "subscription event has an unrecognized status");
            return received();
        }
    };

    // Unknown plan names are stored as sent; the gate then fails closed on them.
    let plan = extract_str(object, &["metadata", "plan"])
        .map(|raw| {
            PlanId::from_raw(raw)
                .map(|plan| plan.as_str().to_string())
                .unwrap_or_else(|| raw.trim().to_lowercase())
        })
        .or_else(|| existing.as_ref().map(|s| s.plan.clone()))
        .unwrap_or_else(|| PLAN_FREE.to_string());

    let renewal_anchor = extract_timestamp(object, &["billing_cycle_anchor"])
        .or_else(|| extract_timestamp(object, &["current_period_start"]))
        .or_else(|| existing.as_ref().and_then(|s| s.renewal_anchor));

    let subscription = Subscription {
        team_id,
        plan,
        status,
        renewal_anchor,
        trial_end: extract_timestamp(object, &["trial_end"]),
        cancel_at_period_end: extract_bool(object, &["cancel_at_period_end"]).unwrap_or(false),
        stripe_customer_id: customer_id,
        stripe_subscription_id: extract_str(object, &["id"]).map(str::to_string),
        updated_at: OffsetDateTime::now_utc(),
        last_event_at: event_at,
    };

    match state.subscriptions.upsert_subscription(&subscription).await {
        Ok(Some(saved)) => {
            info!(
                event_id,
                %team_id,
                plan = %saved.plan,
                status = saved.status.as_str(),
                "subscription synced from stripe"
            );
            received()
        }
        Ok(None) => {
            info!(event_id, %team_id, "newer subscription event stored concurrently");
            received()
        }
        Err(err) => {
            error!(?err, %team_id, "failed to store subscription from webhook");
            JsonResponse::server_error("Failed to process webhook").into_response()
        }
    }
}

async fn mark_payment_failed(
    state: &AppState,
    event_id: &str,
    event_at: Option<OffsetDateTime>,
    object: &serde_json::Value,
) -> Response {
    let customer_id = extract_customer_id(object);
    let team_id = match resolve_team(state, object, customer_id.as_deref()).await {
        Ok(Some(team_id)) => team_id,
        Ok(None) => {
            warn!(event_id, ?customer_id, "payment failure does not map to a team");
            return received();
        }
        Err(err) => {
            error!(?err, event_id, "failed to resolve team for payment failure");
            return JsonResponse::server_error("Failed to process webhook").into_response();
        }
    };

    match state
        .subscriptions
        .set_status(team_id, SubscriptionStatus::Failed, event_at)
        .await
    {
        Ok(Some(_)) => {
            warn!(event_id, %team_id, "subscription payment failed");
            received()
        }
        Ok(None) => {
            warn!(
                event_id,
                %team_id,
                "payment failure not applied: no subscription or a newer event"
            );
            received()
        }
        Err(err) => {
            error!(?err, %team_id, "failed to mark subscription as failed");
            JsonResponse::server_error("Failed to process webhook").into_response()
        }
    }
}
