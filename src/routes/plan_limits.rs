use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

use crate::responses::JsonResponse;
use crate::services::usage::{LimitCheck, LimitReason, UsageError};

pub(crate) const USAGE_LIMIT_REACHED: &str = "usage_limit_reached";
pub(crate) const USAGE_UNAVAILABLE: &str = "usage_unavailable";

/// 429 for a tool call the gate refused.
pub(crate) fn usage_limit_response(tool: &str, check: &LimitCheck) -> Response {
    match check.reason {
        Some(LimitReason::Unavailable) => JsonResponse::error_with_code(
            StatusCode::TOO_MANY_REQUESTS,
            "Usage could not be verified right now. Please try again shortly.",
            USAGE_UNAVAILABLE,
        )
        .into_response(),
        Some(LimitReason::Configuration) => JsonResponse::error_with_code(
            StatusCode::TOO_MANY_REQUESTS,
            "Your team has no active billing period yet. Contact support to finish setup.",
            USAGE_LIMIT_REACHED,
        )
        .into_response(),
        Some(LimitReason::UnknownPlanOrTool) => {
            let message = format!("{tool} is not available on your plan.");
            JsonResponse::error_with_code(
                StatusCode::TOO_MANY_REQUESTS,
                &message,
                USAGE_LIMIT_REACHED,
            )
            .into_response()
        }
        None => {
            let message = format!(
                "{tool} has used {} of {} runs this billing period. Upgrade or wait for the next period.",
                check.used, check.limit
            );
            JsonResponse::error_with_code(
                StatusCode::TOO_MANY_REQUESTS,
                &message,
                USAGE_LIMIT_REACHED,
            )
            .into_response()
        }
    }
}

pub(crate) fn usage_error_response(err: UsageError) -> Response {
    match err {
        UsageError::InvalidRequest(message) => {
            JsonResponse::error_with_code(StatusCode::BAD_REQUEST, &message, "invalid_request")
                .into_response()
        }
        UsageError::UnknownPlanOrTool { tool, .. } => {
            let message = format!("Unknown tool: {tool}");
            JsonResponse::error_with_code(StatusCode::NOT_FOUND, &message, "unknown_tool")
                .into_response()
        }
        UsageError::Configuration(message) => {
            warn!(%message, "usage configuration problem");
            JsonResponse::error_with_code(
                StatusCode::CONFLICT,
                "Your team has no active billing period yet.",
                "usage_configuration",
            )
            .into_response()
        }
        UsageError::Unavailable(_) | UsageError::ConcurrencyConflict => {
            error!(?err, "usage backend unavailable");
            JsonResponse::error_with_code(
                StatusCode::SERVICE_UNAVAILABLE,
                "Usage tracking is temporarily unavailable.",
                USAGE_UNAVAILABLE,
            )
            .into_response()
        }
    }
}
