use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

/// Envelope for plain status replies and errors.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonResponse {
    pub status: String,
    pub success: bool,
    pub message: String,
    pub code: Option<String>,
}

fn error_body(msg: &str, code: Option<&str>) -> Json<JsonResponse> {
    Json(JsonResponse {
        status: "error".to_string(),
        success: false,
        message: msg.to_string(),
        code: code.map(str::to_string),
    })
}

impl JsonResponse {
    pub fn success(msg: &str) -> impl IntoResponse {
        (
            StatusCode::OK,
            Json(JsonResponse {
                status: "success".to_string(),
                success: true,
                message: msg.to_string(),
                code: None,
            }),
        )
    }

    pub fn not_found(msg: &str) -> impl IntoResponse {
        (StatusCode::NOT_FOUND, error_body(msg, None))
    }

    pub fn server_error(msg: &str) -> impl IntoResponse {
        (StatusCode::INTERNAL_SERVER_ERROR, error_body(msg, None))
    }

    pub fn bad_request(msg: &str) -> impl IntoResponse {
        (StatusCode::BAD_REQUEST, error_body(msg, None))
    }

    pub fn too_many_requests(msg: &str) -> impl IntoResponse {
        (StatusCode::TOO_MANY_REQUESTS, error_body(msg, None))
    }

    pub fn error_with_code(status: StatusCode, msg: &str, code: &str) -> impl IntoResponse {
        (status, error_body(msg, Some(code)))
    }
}

#[cfg(test)]
mod tests {
    use axum::{http::StatusCode, response::IntoResponse};
    use serde_json::from_slice;

    use crate::responses::JsonResponse;

    #[tokio::test]
    async fn test_success_response() {
        let resp = JsonResponse::success("ok").into_response();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        let json: JsonResponse = from_slice(&body).unwrap();
        assert_eq!(json.status, "success");
        assert!(json.success);
        assert_eq!(json.message, "ok");
        assert!(json.code.is_none());
    }

    #[tokio::test]
    async fn test_error_with_code_response() {
        let resp = JsonResponse::error_with_code(
            StatusCode::TOO_MANY_REQUESTS,
            "limit reached",
            "usage_limit_reached",
        )
        .into_response();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

        let body = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        let json: JsonResponse = from_slice(&body).unwrap();
        assert_eq!(json.status, "error");
        assert!(!json.success);
        assert_eq!(json.code.as_deref(), Some("usage_limit_reached"));
    }
}
