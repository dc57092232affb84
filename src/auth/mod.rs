//! Identity and session management: registration, login, bearer tokens,
//! password changes, and the per-request user profile every other module
//! consumes.

use axum::{
    extract::State,
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use diesel::prelude::*;
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::shared::config::FOLDER_AVATAR;
use crate::shared::errors::{ok, ApiResult, AppError};
use crate::shared::models::{NewUser, NewUserProfile, Role, User, UserProfile};
use crate::shared::schema::{user_profiles, users};
use crate::shared::state::AppState;
use crate::shared::utils::DbPool;

pub mod middleware;
pub mod password;
pub mod token;

pub use middleware::CurrentUser;

// ----- Requests / responses -----

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub birthday: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub company_joined_date: String,
    #[serde(default)]
    pub introduction: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub birthday: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub company_joined_date: String,
    #[serde(default)]
    pub introduction: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: i32,
    pub email: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub avatar_url: String,
    pub birthday: String,
    pub department: String,
    pub gender: String,
    pub company_joined_date: String,
    pub introduction: String,
}

// ----- Engine -----

pub struct AuthEngine {
    db: DbPool,
}

impl AuthEngine {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Creates the user and its profile atomically. Fails with `Conflict`
    /// when a live user already holds the email.
    pub fn register(&self, req: &RegisterRequest) -> Result<i32, AppError> {
        if req.email.is_empty() || req.password.is_empty() {
            return Err(AppError::InvalidParams(
                "email and password are required".to_string(),
            ));
        }

        let mut conn = self.db.get()?;
        let taken = users::table
            .filter(users::email.eq(&req.email))
            .filter(users::deleted_at.is_null())
            .count()
            .get_result::<i64>(&mut conn)?;
        if taken > 0 {
            return Err(AppError::Conflict("email already registered".to_string()));
        }

        let hashed = password::hash_password(&req.password)
            .map_err(|e| AppError::System(e.to_string()))?;

        // Self-registration always lands as trainee. Elevated roles are
        // provisioned directly, never through the public endpoint.
        let user_id = conn.transaction::<i32, diesel::result::Error, _>(|conn| {
            let user_id = diesel::insert_into(users::table)
                .values(NewUser {
                    email: &req.email,
                    password: &hashed,
                    role_id: Role::Trainee.as_i32(),
                })
                .returning(users::id)
                .get_result::<i32>(conn)?;

            diesel::insert_into(user_profiles::table)
                .values(NewUserProfile {
                    user_id,
                    first_name: &req.first_name,
                    last_name: &req.last_name,
                    phone: &req.phone,
                    avatar: &req.avatar,
                    birthday: &req.birthday,
                    department: &req.department,
                    gender: &req.gender,
                    company_joined_date: &req.company_joined_date,
                    introduction: &req.introduction,
                })
                .execute(conn)?;

            Ok(user_id)
        })?;

        info!("registered user {} ({})", user_id, req.email);
        Ok(user_id)
    }

    /// Verifies credentials, updates last-login, and rotates legacy SHA-256
    /// hashes to argon2 in the same write.
    pub fn login(&self, email: &str, plaintext: &str) -> Result<User, AppError> {
        let mut conn = self.db.get()?;
        let user: User = users::table
            .filter(users::email.eq(email))
            .filter(users::deleted_at.is_null())
            .first(&mut conn)
            .optional()?
            .ok_or_else(|| AppError::InvalidParams("email or password is incorrect".to_string()))?;

        let verified = password::verify_password(plaintext, &user.password)
            .map_err(|e| AppError::System(e.to_string()))?;
        if !verified {
            return Err(AppError::InvalidParams(
                "email or password is incorrect".to_string(),
            ));
        }

        let now = Utc::now();
        if password::is_legacy_hash(&user.password) {
            let rotated = password::hash_password(plaintext)
                .map_err(|e| AppError::System(e.to_string()))?;
            diesel::update(users::table.find(user.id))
                .set((
                    users::last_login.eq(now),
                    users::password.eq(&rotated),
                    users::updated_at.eq(now),
                ))
                .execute(&mut conn)?;
            info!("rotated legacy password hash for user {}", user.id);
        } else {
            diesel::update(users::table.find(user.id))
                .set((users::last_login.eq(now), users::updated_at.eq(now)))
                .execute(&mut conn)?;
        }

        Ok(user)
    }

    pub fn change_password(&self, user_id: i32, req: &ChangePasswordRequest) -> Result<(), AppError> {
        if req.new_password != req.confirm_password {
            return Err(AppError::InvalidParams(
                "new password and confirmation do not match".to_string(),
            ));
        }

        let mut conn = self.db.get()?;
        let user: User = users::table
            .filter(users::id.eq(user_id))
            .filter(users::deleted_at.is_null())
            .first(&mut conn)
            .optional()?
            .ok_or_else(|| AppError::not_found("user"))?;

        let verified = password::verify_password(&req.current_password, &user.password)
            .map_err(|e| AppError::System(e.to_string()))?;
        if !verified {
            return Err(AppError::InvalidParams(
                "current password is incorrect".to_string(),
            ));
        }

        let hashed = password::hash_password(&req.new_password)
            .map_err(|e| AppError::System(e.to_string()))?;
        diesel::update(users::table.find(user_id))
            .set((users::password.eq(&hashed), users::updated_at.eq(Utc::now())))
            .execute(&mut conn)?;
        Ok(())
    }

    /// Partial profile update: only non-empty fields overwrite.
    pub fn update_profile(&self, user_id: i32, req: &UpdateProfileRequest) -> Result<(), AppError> {
        let mut conn = self.db.get()?;
        let profile: UserProfile = user_profiles::table
            .filter(user_profiles::user_id.eq(user_id))
            .filter(user_profiles::deleted_at.is_null())
            .first(&mut conn)
            .optional()?
            .ok_or_else(|| AppError::not_found("user profile"))?;

        let pick = |incoming: &str, current: &str| -> String {
            if incoming.is_empty() {
                current.to_string()
            } else {
                incoming.to_string()
            }
        };

        diesel::update(user_profiles::table.find(profile.id))
            .set((
                user_profiles::first_name.eq(pick(&req.first_name, &profile.first_name)),
                user_profiles::last_name.eq(pick(&req.last_name, &profile.last_name)),
                user_profiles::phone.eq(pick(&req.phone, &profile.phone)),
                user_profiles::avatar.eq(pick(&req.avatar, &profile.avatar)),
                user_profiles::birthday.eq(pick(&req.birthday, &profile.birthday)),
                user_profiles::department.eq(pick(&req.department, &profile.department)),
                user_profiles::gender.eq(pick(&req.gender, &profile.gender)),
                user_profiles::company_joined_date
                    .eq(pick(&req.company_joined_date, &profile.company_joined_date)),
                user_profiles::introduction.eq(pick(&req.introduction, &profile.introduction)),
                user_profiles::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;
        Ok(())
    }
}

fn profile_response(state: &AppState, current: &CurrentUser) -> ProfileResponse {
    let avatar = &current.profile.avatar;
    let avatar_url = if avatar.is_empty() || avatar.starts_with("http") {
        avatar.clone()
    } else {
        state.config.storage_url(FOLDER_AVATAR, avatar)
    };
    ProfileResponse {
        id: current.user.id,
        email: current.user.email.clone(),
        role: current.role,
        first_name: current.profile.first_name.clone(),
        last_name: current.profile.last_name.clone(),
        phone: current.profile.phone.clone(),
        avatar_url,
        birthday: current.profile.birthday.clone(),
        department: current.profile.department.clone(),
        gender: current.profile.gender.clone(),
        company_joined_date: current.profile.company_joined_date.clone(),
        introduction: current.profile.introduction.clone(),
    }
}

// ----- Handlers -----

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult {
    let engine = AuthEngine::new(state.conn.clone());
    let user_id = engine.register(&req)?;
    Ok(ok(serde_json::json!({ "user_id": user_id })))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult {
    let engine = AuthEngine::new(state.conn.clone());
    let user = engine.login(&req.email, &req.password)?;
    let bearer = token::issue(user.id, &state.config.key_token)?;
    Ok(ok(serde_json::json!({
        "token": bearer,
        "user_id": user.id,
        "role": Role::from_i32(user.role_id),
    })))
}

pub async fn change_password(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult {
    let engine = AuthEngine::new(state.conn.clone());
    engine.change_password(current.id(), &req)?;
    Ok(ok(serde_json::Value::Null))
}

pub async fn get_profile(State(state): State<Arc<AppState>>, current: CurrentUser) -> ApiResult {
    Ok(ok(profile_response(&state, &current)))
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult {
    let engine = AuthEngine::new(state.conn.clone());
    engine.update_profile(current.id(), &req)?;
    let refreshed = middleware::load_current_user(&state, current.id())?;
    Ok(ok(profile_response(&state, &refreshed)))
}

/// Routes reachable without a token.
pub fn configure_public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

/// Routes for the authenticated caller's own account.
pub fn configure_user_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/change-password", post(change_password))
        .route("/user/profile", get(get_profile))
        .route("/user/profile", put(update_profile))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_payload_cannot_carry_a_role() {
        // A client-supplied role key is ignored; registration has no
        // field to elevate through.
        let req: RegisterRequest = serde_json::from_str(
            r#"{"email": "new@example.com", "password": "pw", "role": "admin"}"#,
        )
        .expect("register payload should parse");
        assert_eq!(req.email, "new@example.com");
        assert_eq!(req.password, "pw");
    }
}
