//! Authentication routes: registration, login, token rotation, password reset.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::USER_AGENT},
    response::IntoResponse,
    routing::post,
};
use chrono::{DateTime, Duration, Utc};
use grocer_core::auth::{check_password_policy, hash_password, verify_password};
use grocer_db::entities::users;
use grocer_db::repositories::ClientInfo;
use grocer_db::{PasswordResetRepository, SessionRepository, UserRepository};
use grocer_shared::{Role, TokenPair};
use sea_orm::SqlErr;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;
use validator::Validate;

use crate::{AppState, error::ApiError};

/// Creates the auth router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Customer self-registration.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Login email; stored lowercased.
    #[validate(email)]
    pub email: String,
    /// Plain-text password.
    pub password: String,
    /// Display name.
    #[validate(length(min = 1, max = 255))]
    pub name: String,
}

/// Email/password login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Login email.
    pub email: String,
    /// Plain-text password.
    pub password: String,
}

/// Body carrying a refresh token.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// Refresh token issued at login or the previous refresh.
    pub refresh_token: String,
}

/// Reset link request.
#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    /// Account email.
    #[validate(email)]
    pub email: String,
}

/// Reset completion.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    /// Token from the emailed link.
    pub token: String,
    /// New plain-text password.
    pub password: String,
}

/// Public view of a user.
#[derive(Debug, Serialize)]
pub struct UserInfo {
    /// User id.
    pub id: Uuid,
    /// Login email.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Platform role.
    pub role: String,
    /// Franchise the user works for.
    pub franchise_id: Option<Uuid>,
    /// Loyalty balance.
    pub loyalty_points: i32,
}

impl From<users::Model> for UserInfo {
    fn from(user: users::Model) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            franchise_id: user.franchise_id,
            loyalty_points: user.loyalty_points,
        }
    }
}

/// Tokens plus the signed-in user.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    /// Signed-in user.
    pub user: UserInfo,
    /// Access and refresh tokens.
    #[serde(flatten)]
    pub tokens: TokenPair,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/register - Create a customer account and sign it in.
async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()?;
    check_password_policy(&payload.password)?;

    let user_repo = UserRepository::new((*state.db).clone());
    if user_repo.email_exists(&payload.email).await? {
        return Err(email_taken());
    }

    let password_hash = hash_password(&payload.password)?;
    let user = user_repo
        .create(&payload.email, &password_hash, payload.name.trim(), Role::Customer)
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => email_taken(),
            _ => ApiError::from(e),
        })?;

    let tokens = issue_session(&state, &user, &headers).await?;
    info!(user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: user.into(),
            tokens,
        }),
    ))
}

/// POST /auth/login - Authenticate and return a fresh token pair.
async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_repo = UserRepository::new((*state.db).clone());

    let Some(user) = user_repo.find_by_email(&payload.email).await? else {
        info!("Login attempt for unknown email");
        return Err(invalid_credentials());
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        info!(user_id = %user.id, "Failed login attempt - invalid password");
        return Err(invalid_credentials());
    }

    if user.is_blocked {
        return Err(account_blocked());
    }

    let tokens = issue_session(&state, &user, &headers).await?;
    info!(user_id = %user.id, "User logged in");

    Ok(Json(AuthResponse {
        user: user.into(),
        tokens,
    }))
}

/// POST /auth/refresh - Rotate a refresh token.
///
/// The presented token's session is revoked; replaying it afterwards fails.
async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let claims = state.jwt_service.validate_token(&payload.refresh_token)?;

    let user_repo = UserRepository::new((*state.db).clone());
    let Some(user) = user_repo.find_by_id(claims.user_id()).await? else {
        return Err(invalid_refresh_token());
    };
    if user.is_blocked {
        return Err(account_blocked());
    }

    let tokens = state
        .jwt_service
        .generate_pair(user.id, parse_role(&user)?, user.franchise_id)?;

    let session_repo = SessionRepository::new((*state.db).clone());
    let rotated = session_repo
        .rotate(
            &payload.refresh_token,
            user.id,
            &tokens.refresh_token,
            refresh_expiry(&state),
            client_info(&headers),
        )
        .await?;

    if rotated.is_none() {
        info!(user_id = %user.id, "Refresh with revoked or unknown token");
        return Err(invalid_refresh_token());
    }

    Ok(Json(AuthResponse {
        user: user.into(),
        tokens,
    }))
}

/// POST /auth/logout - Revoke the session behind a refresh token.
async fn logout(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session_repo = SessionRepository::new((*state.db).clone());
    if session_repo.revoke_by_token(&payload.refresh_token).await? {
        info!("Session revoked");
    }

    Ok(Json(json!({ "message": "Logged out" })))
}

/// POST /auth/forgot-password - Email a reset link.
///
/// Always answers 200 so the endpoint cannot reveal which emails have accounts.
async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()?;

    let user_repo = UserRepository::new((*state.db).clone());
    if let Some(user) = user_repo.find_by_email(&payload.email).await?
        && !user.is_blocked
    {
        let reset_repo = PasswordResetRepository::new((*state.db).clone());
        let token = reset_repo.create_token(user.id).await?;
        let frontend_url = state.frontend.base_url_for(parse_role(&user)?).to_string();
        let email_service = state.email_service.clone();
        let user_id = user.id;

        tokio::spawn(async move {
            if let Err(e) = email_service
                .send_password_reset(&user.email, &user.name, &frontend_url, &token)
                .await
            {
                error!(user_id = %user.id, error = %e, "Failed to send password reset email");
            }
        });
        info!(user_id = %user_id, "Password reset requested");
    }

    Ok(Json(json!({
        "message": "If an account exists for this email, a reset link has been sent"
    })))
}

/// POST /auth/reset-password - Set a new password with a reset token.
async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    check_password_policy(&payload.password)?;

    let reset_repo = PasswordResetRepository::new((*state.db).clone());
    let Some(user_id) = reset_repo.consume(&payload.token).await? else {
        return Err(ApiError::bad_request(
            "invalid_reset_token",
            "Reset token is invalid or has expired",
        ));
    };

    let password_hash = hash_password(&payload.password)?;
    UserRepository::new((*state.db).clone())
        .update_password(user_id, &password_hash)
        .await?;
    let revoked = SessionRepository::new((*state.db).clone())
        .revoke_all_user_sessions(user_id)
        .await?;

    info!(user_id = %user_id, revoked, "Password reset completed");
    Ok(Json(json!({ "message": "Password has been reset" })))
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Signs tokens for `user` and records the refresh session.
async fn issue_session(
    state: &AppState,
    user: &users::Model,
    headers: &HeaderMap,
) -> Result<TokenPair, ApiError> {
    let tokens = state
        .jwt_service
        .generate_pair(user.id, parse_role(user)?, user.franchise_id)?;

    SessionRepository::new((*state.db).clone())
        .create(
            user.id,
            &tokens.refresh_token,
            refresh_expiry(state),
            client_info(headers),
        )
        .await?;

    Ok(tokens)
}

fn parse_role(user: &users::Model) -> Result<Role, ApiError> {
    user.role.parse().map_err(|_| {
        ApiError::internal(format!("user {} has unknown role {}", user.id, user.role))
    })
}

fn refresh_expiry(state: &AppState) -> DateTime<Utc> {
    Utc::now() + Duration::days(state.jwt_service.refresh_token_expires_days())
}

fn client_info(headers: &HeaderMap) -> ClientInfo<'_> {
    ClientInfo {
        user_agent: headers.get(USER_AGENT).and_then(|v| v.to_str().ok()),
        ip_address: headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim),
    }
}

fn invalid_credentials() -> ApiError {
    ApiError::unauthorized("invalid_credentials", "Invalid email or password")
}

fn invalid_refresh_token() -> ApiError {
    ApiError::unauthorized("invalid_refresh_token", "Refresh token is no longer valid")
}

fn account_blocked() -> ApiError {
    ApiError::forbidden("account_blocked", "This account has been blocked")
}

fn email_taken() -> ApiError {
    ApiError::conflict("email_taken", "An account with this email already exists")
}
