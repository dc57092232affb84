use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;

use crate::shared::errors::{ok, ApiResult, AppError};
use crate::shared::models::{NewSkillKeyword, SkillKeyword};
use crate::shared::schema::skill_keywords;
use crate::shared::state::AppState;
use crate::shared::utils::DbPool;

#[derive(Debug, Deserialize)]
pub struct CreateSkillKeywordRequest {
    pub name: String,
}

pub struct SkillKeywordEngine {
    db: DbPool,
}

impl SkillKeywordEngine {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub fn list(&self) -> Result<Vec<SkillKeyword>, AppError> {
        let mut conn = self.db.get()?;
        Ok(skill_keywords::table
            .filter(skill_keywords::deleted_at.is_null())
            .order(skill_keywords::name.asc())
            .load::<SkillKeyword>(&mut conn)?)
    }

    /// Name uniqueness applies to live rows only.
    pub fn create(&self, name: &str) -> Result<SkillKeyword, AppError> {
        if name.is_empty() {
            return Err(AppError::InvalidParams("name is required".to_string()));
        }
        let mut conn = self.db.get()?;
        let taken: i64 = skill_keywords::table
            .filter(skill_keywords::name.eq(name))
            .filter(skill_keywords::deleted_at.is_null())
            .count()
            .get_result(&mut conn)?;
        if taken > 0 {
            return Err(AppError::Conflict(format!(
                "skill keyword {name:?} already exists"
            )));
        }

        let keyword_id = diesel::insert_into(skill_keywords::table)
            .values(NewSkillKeyword { name })
            .returning(skill_keywords::id)
            .get_result::<i32>(&mut conn)?;

        skill_keywords::table
            .find(keyword_id)
            .first(&mut conn)
            .map_err(AppError::from)
    }

    pub fn delete(&self, keyword_id: i32) -> Result<(), AppError> {
        let mut conn = self.db.get()?;
        let updated = diesel::update(
            skill_keywords::table
                .filter(skill_keywords::id.eq(keyword_id))
                .filter(skill_keywords::deleted_at.is_null()),
        )
        .set(skill_keywords::deleted_at.eq(Utc::now()))
        .execute(&mut conn)?;
        if updated == 0 {
            return Err(AppError::not_found("skill keyword"));
        }
        Ok(())
    }
}

// ----- Handlers -----

pub async fn list_skill_keywords(State(state): State<Arc<AppState>>) -> ApiResult {
    let engine = SkillKeywordEngine::new(state.conn.clone());
    Ok(ok(engine.list()?))
}

pub async fn create_skill_keyword(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSkillKeywordRequest>,
) -> ApiResult {
    let engine = SkillKeywordEngine::new(state.conn.clone());
    Ok(ok(engine.create(&req.name)?))
}

pub async fn delete_skill_keyword(
    State(state): State<Arc<AppState>>,
    Path(keyword_id): Path<i32>,
) -> ApiResult {
    let engine = SkillKeywordEngine::new(state.conn.clone());
    engine.delete(keyword_id)?;
    Ok(ok(serde_json::Value::Null))
}
