//! In-app feedback: trainees rate the platform, admins read and prune.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use diesel::prelude::*;
use log::info;
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::CurrentUser;
use crate::shared::errors::{ok, ApiResult, AppError};
use crate::shared::models::{AppFeedback, NewAppFeedback};
use crate::shared::schema::app_feedbacks;
use crate::shared::state::AppState;
use crate::shared::utils::DbPool;

#[derive(Debug, Deserialize)]
pub struct CreateFeedbackRequest {
    pub rating: i32,
    #[serde(default)]
    pub comment: String,
}

pub struct FeedbackEngine {
    db: DbPool,
}

impl FeedbackEngine {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub fn create(&self, user_id: i32, req: &CreateFeedbackRequest) -> Result<AppFeedback, AppError> {
        if !(1..=5).contains(&req.rating) {
            return Err(AppError::InvalidParams(
                "rating must be between 1 and 5".to_string(),
            ));
        }

        let mut conn = self.db.get()?;
        let feedback_id = diesel::insert_into(app_feedbacks::table)
            .values(NewAppFeedback {
                user_id,
                rating: req.rating,
                comment: &req.comment,
            })
            .returning(app_feedbacks::id)
            .get_result::<i32>(&mut conn)?;

        info!("user {} left feedback {}", user_id, feedback_id);
        app_feedbacks::table
            .find(feedback_id)
            .first(&mut conn)
            .map_err(AppError::from)
    }

    pub fn list(&self) -> Result<Vec<AppFeedback>, AppError> {
        let mut conn = self.db.get()?;
        Ok(app_feedbacks::table
            .filter(app_feedbacks::deleted_at.is_null())
            .order(app_feedbacks::created_at.desc())
            .load::<AppFeedback>(&mut conn)?)
    }

    pub fn delete(&self, feedback_id: i32) -> Result<(), AppError> {
        let mut conn = self.db.get()?;
        let updated = diesel::update(
            app_feedbacks::table
                .filter(app_feedbacks::id.eq(feedback_id))
                .filter(app_feedbacks::deleted_at.is_null()),
        )
        .set(app_feedbacks::deleted_at.eq(Utc::now()))
        .execute(&mut conn)?;
        if updated == 0 {
            return Err(AppError::not_found("feedback"));
        }
        Ok(())
    }
}

// ----- Handlers -----

pub async fn create_feedback(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Json(req): Json<CreateFeedbackRequest>,
) -> ApiResult {
    let engine = FeedbackEngine::new(state.conn.clone());
    Ok(ok(engine.create(current.id(), &req)?))
}

pub async fn list_feedback(State(state): State<Arc<AppState>>) -> ApiResult {
    let engine = FeedbackEngine::new(state.conn.clone());
    Ok(ok(engine.list()?))
}

pub async fn delete_feedback(
    State(state): State<Arc<AppState>>,
    Path(feedback_id): Path<i32>,
) -> ApiResult {
    let engine = FeedbackEngine::new(state.conn.clone());
    engine.delete(feedback_id)?;
    Ok(ok(serde_json::Value::Null))
}
