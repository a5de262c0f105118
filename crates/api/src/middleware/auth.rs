//! Authentication middleware and role extractors for protected routes.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use grocer_core::order::OrderActor;
use grocer_db::UserRepository;
use grocer_shared::{Claims, Role};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// Extracts the bearer token from the Authorization header.
fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
}

/// Authentication middleware that validates access tokens.
///
/// This middleware:
/// 1. Extracts the Bearer token from the Authorization header
/// 2. Validates the token using the JWT service
/// 3. Rejects users that no longer exist or have been blocked
/// 4. Stores the claims in request extensions for handlers to access
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let Some(token) = auth_header.and_then(extract_bearer_token) else {
        return ApiError::unauthorized(
            "missing_token",
            "Authorization header with Bearer token is required",
        )
        .into_response();
    };

    let claims = match state.jwt_service.validate_token(token) {
        Ok(claims) => claims,
        Err(e) => return ApiError::from(e).into_response(),
    };

    let user_repo = UserRepository::new((*state.db).clone());
    match user_repo.find_by_id(claims.user_id()).await {
        Ok(Some(user)) if user.is_blocked => {
            info!(user_id = %user.id, "Rejected request from blocked account");
            return ApiError::forbidden("account_blocked", "This account has been blocked")
                .into_response();
        }
        Ok(Some(_)) => {}
        Ok(None) => {
            warn!(user_id = %claims.user_id(), "Token presented for unknown user");
            return ApiError::unauthorized("invalid_token", "Invalid or malformed token")
                .into_response();
        }
        Err(e) => return ApiError::from(e).into_response(),
    }

    request.extensions_mut().insert(claims);
    next.run(request).await
}

/// Extractor for authenticated user claims.
///
/// ```ignore
/// async fn handler(auth: AuthUser) -> impl IntoResponse {
///     let user_id = auth.user_id();
///     // ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    /// Returns the user ID from the claims.
    #[must_use]
    pub const fn user_id(&self) -> Uuid {
        self.0.user_id()
    }

    /// Returns the user's role.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.0.role
    }

    /// Returns the franchise the user works for, if any.
    #[must_use]
    pub const fn franchise_id(&self) -> Option<Uuid> {
        self.0.franchise_id()
    }

    /// Returns the caller as seen by the order rules.
    #[must_use]
    pub const fn actor(&self) -> OrderActor {
        OrderActor {
            user_id: self.0.sub,
            role: self.0.role,
            franchise_id: self.0.franchise,
        }
    }

    /// Returns the inner claims.
    #[must_use]
    pub const fn claims(&self) -> &Claims {
        &self.0
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| ApiError::unauthorized("unauthorized", "Authentication required"))
    }
}

/// Extractor that only admits platform administrators.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role() != Role::Admin {
            return Err(ApiError::forbidden(
                "forbidden",
                "Administrator role required",
            ));
        }
        Ok(Self(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request as HttpRequest, StatusCode};
    use chrono::{Duration, Utc};

    fn parts_with(claims: Option<Claims>) -> Parts {
        let (mut parts, ()) = HttpRequest::builder()
            .uri("/")
            .body(())
            .unwrap()
            .into_parts();
        if let Some(claims) = claims {
            parts.extensions.insert(claims);
        }
        parts
    }

    fn claims(role: Role, franchise: Option<Uuid>) -> Claims {
        Claims::new(Uuid::new_v4(), role, franchise, Utc::now() + Duration::minutes(5))
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("Basic abc"), None);
    }

    #[tokio::test]
    async fn test_auth_user_requires_claims() {
        let mut parts = parts_with(None);
        let rejection = AuthUser::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert_eq!(rejection.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_actor_carries_franchise() {
        let franchise = Uuid::new_v4();
        let mut parts = parts_with(Some(claims(Role::FranchiseStaff, Some(franchise))));
        let user = AuthUser::from_request_parts(&mut parts, &()).await.unwrap();

        let actor = user.actor();
        assert_eq!(actor.user_id, user.user_id());
        assert_eq!(actor.role, Role::FranchiseStaff);
        assert_eq!(actor.franchise_id, Some(franchise));
    }

    #[tokio::test]
    async fn test_admin_extractor_rejects_other_roles() {
        let mut parts = parts_with(Some(claims(Role::FranchiseOwner, Some(Uuid::new_v4()))));
        let rejection = AdminUser::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert_eq!(rejection.status(), StatusCode::FORBIDDEN);

        let mut parts = parts_with(Some(claims(Role::Admin, None)));
        assert!(AdminUser::from_request_parts(&mut parts, &()).await.is_ok());
    }
}
