use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::error;

use crate::models::subscription::Subscription;
use crate::responses::JsonResponse;
use crate::routes::auth::session::AuthSession;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SubscriptionView {
    #[serde(flatten)]
    pub subscription: Subscription,
    /// Plan usage is currently metered against.
    pub effective_plan: String,
}

// GET /api/subscription
pub async fn get_subscription(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
) -> Response {
    match state.subscriptions.find_for_team(claims.team_id).await {
        Ok(Some(subscription)) => {
            let effective_plan = subscription
                .effective_plan(OffsetDateTime::now_utc())
                .to_string();
            Json(SubscriptionView {
                subscription,
                effective_plan,
            })
            .into_response()
        }
        Ok(None) => JsonResponse::not_found("No subscription for this team").into_response(),
        Err(err) => {
            error!(?err, team_id = %claims.team_id, "failed to load subscription");
            JsonResponse::server_error("Failed to load subscription").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::subscription::SubscriptionStatus;
    use crate::routes::auth::claims::UserRole;
    use crate::state::test_support::{active_subscription, claims_for, TestState};
    use axum::http::StatusCode;
    use uuid::Uuid;

    #[tokio::test]
    async fn canceled_subscription_reports_free_as_effective_plan() {
        let team_id = Uuid::new_v4();
        let mut sub = active_subscription(team_id, "pro_unlimited");
        sub.status = SubscriptionStatus::Canceled;
        let state = TestState::with_subscription(sub).build();

        let resp = get_subscription(
            State(state),
            AuthSession(claims_for(team_id, UserRole::Member)),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["plan"], "pro_unlimited");
        assert_eq!(json["status"], "canceled");
        assert_eq!(json["effective_plan"], "free");
        assert!(json.get("stripe_customer_id").is_none());
    }

    #[tokio::test]
    async fn missing_subscription_is_not_found() {
        let state = TestState::default().build();
        let resp = get_subscription(
            State(state),
            AuthSession(claims_for(Uuid::new_v4(), UserRole::Member)),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
