use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tower_sessions::Session;

use crate::services::RegisterRequest;

use super::{ApiError, ApiResponse, AppState, types};

/// Session key holding the authenticated user's id.
const SESSION_USER_ID: &str = "user_id";

// ============================================================================
// Middleware
// ============================================================================

/// Requires an authenticated session. The denial carries no hint about
/// what lives behind the route.
pub async fn auth_middleware(
    session: Session,
    request: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    if let Ok(Some(user_id)) = session.get::<i32>(SESSION_USER_ID).await {
        tracing::Span::current().record("user_id", user_id);
        return Ok(next.run(request).await);
    }

    let response = (StatusCode::UNAUTHORIZED, "Unauthorized");
    Ok(response.into_response())
}

/// Requires an authenticated session whose user carries the admin flag.
pub async fn admin_middleware(
    State(state): State<Arc<AppState>>,
    session: Session,
    request: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    if let Ok(Some(user_id)) = session.get::<i32>(SESSION_USER_ID).await
        && let Ok(user) = state.auth.get_user(user_id).await
    {
        if user.is_admin {
            return Ok(next.run(request).await);
        }
        tracing::warn!("Unauthorized admin access attempt by user {user_id}");
    }

    let response = (StatusCode::FORBIDDEN, "Unauthorized access");
    Ok(response.into_response())
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/register
/// Create a new account. Duplicate username/email yields a conflict.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<types::RegisterRequestDto>,
) -> Result<Json<ApiResponse<types::UserDto>>, ApiError> {
    let user = state
        .auth
        .register(RegisterRequest {
            username: payload.username,
            email: payload.email,
            password: payload.password,
            confirm_password: payload.confirm_password,
        })
        .await?;

    tracing::info!("New user registered: {}", user.username);

    Ok(Json(ApiResponse::success(types::UserDto::from(user))))
}

/// POST /auth/login
/// Authenticate with username and password, establishes a session on success
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<types::LoginRequest>,
) -> Result<Json<ApiResponse<types::UserDto>>, ApiError> {
    let user = state.auth.login(&payload.username, &payload.password).await?;

    // Drop any pre-login session state before binding the identity.
    session
        .cycle_id()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to rotate session: {e}")))?;

    if let Err(e) = session.insert(SESSION_USER_ID, user.id).await {
        return Err(ApiError::internal(format!("Failed to create session: {e}")));
    }

    tracing::info!("Login successful for user: {}", user.username);

    Ok(Json(ApiResponse::success(types::UserDto::from(user))))
}

/// POST /auth/logout
/// Invalidate the current session
pub async fn logout(State(state): State<Arc<AppState>>, session: Session) -> impl IntoResponse {
    if let Ok(Some(user_id)) = session.get::<i32>(SESSION_USER_ID).await {
        state.auth.notify_logout(user_id).await;
    }

    let _ = session.flush().await;
    (StatusCode::OK, "Logged out")
}

/// GET /auth/me
/// Get current user information (requires authentication)
pub async fn get_current_user(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<types::UserDto>>, ApiError> {
    let user_id = get_session_user_id(&session).await?;
    let user = state.auth.get_user(user_id).await?;

    Ok(Json(ApiResponse::success(types::UserDto::from(user))))
}

// ============================================================================
// Helpers
// ============================================================================

/// Get the user id from the session, returns error if not authenticated
pub async fn get_session_user_id(session: &Session) -> Result<i32, ApiError> {
    session
        .get::<i32>(SESSION_USER_ID)
        .await
        .map_err(|e| ApiError::internal(format!("Session error: {e}")))?
        .ok_or_else(|| ApiError::Unauthorized("Not authenticated".to_string()))
}
