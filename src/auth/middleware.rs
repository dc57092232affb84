use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts, Request},
    middleware::Next,
    response::Response,
};
use diesel::prelude::*;
use std::sync::Arc;

use crate::auth::token;
use crate::shared::errors::AppError;
use crate::shared::models::{Role, User, UserProfile};
use crate::shared::schema::{user_profiles, users};
use crate::shared::state::AppState;

/// Authenticated caller, attached to every request that passed the token
/// and profile checks. Everything downstream treats this as plain input.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub profile: UserProfile,
    pub role: Role,
}

impl CurrentUser {
    pub fn id(&self) -> i32 {
        self.user.id
    }
}

/// Verify the bearer token, load the live user + profile, and stash the
/// result in request extensions. Runs before every protected route.
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing authorization header".to_string()))?;

    let bearer = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("invalid authorization format".to_string()))?;

    let user_id = token::verify(bearer, &state.config.key_token)?;
    let current = load_current_user(&state, user_id)?;

    request.extensions_mut().insert(current);
    Ok(next.run(request).await)
}

pub fn load_current_user(state: &AppState, user_id: i32) -> Result<CurrentUser, AppError> {
    let mut conn = state.conn.get()?;

    let user: User = users::table
        .filter(users::id.eq(user_id))
        .filter(users::deleted_at.is_null())
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::Unauthorized("user no longer exists".to_string()))?;

    let profile: UserProfile = user_profiles::table
        .filter(user_profiles::user_id.eq(user_id))
        .filter(user_profiles::deleted_at.is_null())
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::not_found("user profile"))?;

    let role = Role::from_i32(user.role_id)
        .ok_or_else(|| AppError::System(format!("user {user_id} has unknown role")))?;

    Ok(CurrentUser { user, profile, role })
}

fn caller(request: &Request<Body>) -> Result<CurrentUser, AppError> {
    request
        .extensions()
        .get::<CurrentUser>()
        .cloned()
        .ok_or_else(|| AppError::Unauthorized("authentication required".to_string()))
}

pub async fn require_admin(request: Request<Body>, next: Next) -> Result<Response, AppError> {
    if !caller(&request)?.role.is_admin() {
        return Err(AppError::Forbidden("admin access required".to_string()));
    }
    Ok(next.run(request).await)
}

/// Manager or general manager.
pub async fn require_any_manager(request: Request<Body>, next: Next) -> Result<Response, AppError> {
    if !caller(&request)?.role.is_any_manager() {
        return Err(AppError::Forbidden("manager access required".to_string()));
    }
    Ok(next.run(request).await)
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("authentication required".to_string()))
    }
}
