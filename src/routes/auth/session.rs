use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;

use crate::routes::auth::claims::Claims;
use crate::state::AppState;

pub const AUTH_COOKIE: &str = "auth_token";

#[derive(Debug, PartialEq)]
pub struct AuthSession(pub Claims);

/// Authenticated caller whose token carries the admin role.
#[derive(Debug, PartialEq)]
pub struct AdminSession(pub Claims);

fn bearer_token(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = match bearer_token(parts) {
            Some(token) => token,
            None => {
                let jar = CookieJar::from_headers(&parts.headers);
                jar.get(AUTH_COOKIE)
                    .map(|c| c.value().to_string())
                    .ok_or(StatusCode::UNAUTHORIZED)?
            }
        };

        let claims = state.session_tokens.verify(&token).map_err(|err| {
            debug!(?err, "rejected session token");
            StatusCode::UNAUTHORIZED
        })?;

        Ok(AuthSession(claims))
    }
}

impl FromRequestParts<AppState> for AdminSession {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthSession(claims) = AuthSession::from_request_parts(parts, state).await?;
        if !claims.is_admin() {
            return Err(StatusCode::FORBIDDEN);
        }
        Ok(AdminSession(claims))
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        extract::FromRequestParts,
        http::{header, Method, Request, StatusCode},
    };
    use axum_extra::extract::cookie::Cookie;
    use uuid::Uuid;

    use super::{AdminSession, AuthSession, AUTH_COOKIE};
    use crate::routes::auth::claims::UserRole;
    use crate::state::test_support::{claims_for, test_session_tokens, TestState};

    fn token(role: UserRole) -> String {
        test_session_tokens()
            .sign(claims_for(Uuid::new_v4(), role))
            .expect("JWT should create successfully")
    }

    #[tokio::test]
    async fn test_valid_cookie_token_extracted() {
        let state = TestState::default().build();
        let cookie = Cookie::new(AUTH_COOKIE, token(UserRole::Member));
        let request = Request::builder()
            .method(Method::GET)
            .uri("/")
            .header(header::COOKIE, cookie.to_string())
            .body(())
            .unwrap();

        let mut parts = request.into_parts().0;
        let session = AuthSession::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert_eq!(session.0.email, "member@example.com");
        assert_eq!(session.0.role, Some(UserRole::Member));
    }

    #[tokio::test]
    async fn test_bearer_header_is_preferred() {
        let state = TestState::default().build();
        let request = Request::builder()
            .method(Method::GET)
            .uri("/")
            .header(header::AUTHORIZATION, format!("Bearer {}", token(UserRole::Admin)))
            .header(header::COOKIE, Cookie::new(AUTH_COOKIE, "garbage").to_string())
            .body(())
            .unwrap();

        let mut parts = request.into_parts().0;
        let session = AuthSession::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert_eq!(session.0.role, Some(UserRole::Admin));
    }

    #[tokio::test]
    async fn test_missing_token_returns_unauthorized() {
        let state = TestState::default().build();
        let request = Request::builder()
            .method(Method::GET)
            .uri("/")
            .body(())
            .unwrap();

        let mut parts = request.into_parts().0;
        let result = AuthSession::from_request_parts(&mut parts, &state).await;
        assert_eq!(result, Err(StatusCode::UNAUTHORIZED));
    }

    #[tokio::test]
    async fn test_invalid_token_returns_unauthorized() {
        let state = TestState::default().build();
        let cookie = Cookie::new(AUTH_COOKIE, "invalid.token.here");
        let request = Request::builder()
            .method(Method::GET)
            .uri("/")
            .header(header::COOKIE, cookie.to_string())
            .body(())
            .unwrap();

        let mut parts = request.into_parts().0;
        let result = AuthSession::from_request_parts(&mut parts, &state).await;
        assert_eq!(result, Err(StatusCode::UNAUTHORIZED));
    }

    #[tokio::test]
    async fn test_member_is_not_admin() {
        let state = TestState::default().build();
        let request = Request::builder()
            .method(Method::GET)
            .uri("/")
            .header(header::AUTHORIZATION, format!("Bearer {}", token(UserRole::Member)))
            .body(())
            .unwrap();

        let mut parts = request.into_parts().0;
        let result = AdminSession::from_request_parts(&mut parts, &state).await;
        assert_eq!(result, Err(StatusCode::FORBIDDEN));
    }
}
