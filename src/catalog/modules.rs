use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;

use crate::shared::errors::{ok, ApiResult, AppError};
use crate::shared::models::{Module, NewModule};
use crate::shared::schema::{courses, modules};
use crate::shared::state::AppState;
use crate::shared::utils::DbPool;

#[derive(Debug, Deserialize)]
pub struct CreateModuleRequest {
    pub course_id: i32,
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateModuleRequest {
    #[serde(default)]
    pub title: String,
}

pub struct ModuleEngine {
    db: DbPool,
}

impl ModuleEngine {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Admin list view: newest section first.
    pub fn list(&self, course_id: i32) -> Result<Vec<Module>, AppError> {
        let mut conn = self.db.get()?;
        ensure_course_live(&mut conn, course_id)?;
        Ok(modules::table
            .filter(modules::course_id.eq(course_id))
            .filter(modules::deleted_at.is_null())
            .order(modules::position.desc())
            .load::<Module>(&mut conn)?)
    }

    pub fn get(&self, module_id: i32) -> Result<Module, AppError> {
        let mut conn = self.db.get()?;
        modules::table
            .filter(modules::id.eq(module_id))
            .filter(modules::deleted_at.is_null())
            .first(&mut conn)
            .optional()?
            .ok_or_else(|| AppError::not_found("module"))
    }

    /// New modules append at max(position) + 1; ordering within a course
    /// is always strict.
    pub fn create(&self, req: &CreateModuleRequest) -> Result<Module, AppError> {
        if req.title.is_empty() {
            return Err(AppError::InvalidParams("title is required".to_string()));
        }

        let mut conn = self.db.get()?;
        ensure_course_live(&mut conn, req.course_id)?;

        let max_position: Option<i32> = modules::table
            .filter(modules::course_id.eq(req.course_id))
            .filter(modules::deleted_at.is_null())
            .select(diesel::dsl::max(modules::position))
            .first(&mut conn)?;

        let module_id = diesel::insert_into(modules::table)
            .values(NewModule {
                course_id: req.course_id,
                title: &req.title,
                position: max_position.unwrap_or(0) + 1,
            })
            .returning(modules::id)
            .get_result::<i32>(&mut conn)?;

        self.get(module_id)
    }

    pub fn update(&self, module_id: i32, req: &UpdateModuleRequest) -> Result<Module, AppError> {
        let mut conn = self.db.get()?;
        let module = self.get(module_id)?;
        let title = if req.title.is_empty() {
            module.title.clone()
        } else {
            req.title.clone()
        };
        diesel::update(modules::table.find(module_id))
            .set((modules::title.eq(title), modules::updated_at.eq(Utc::now())))
            .execute(&mut conn)?;
        self.get(module_id)
    }

    pub fn delete(&self, module_id: i32) -> Result<(), AppError> {
        let mut conn = self.db.get()?;
        let updated = diesel::update(
            modules::table
                .filter(modules::id.eq(module_id))
                .filter(modules::deleted_at.is_null()),
        )
        .set(modules::deleted_at.eq(Utc::now()))
        .execute(&mut conn)?;
        if updated == 0 {
            return Err(AppError::not_found("module"));
        }
        Ok(())
    }
}

pub fn ensure_course_live(conn: &mut PgConnection, course_id: i32) -> Result<(), AppError> {
    let live: i64 = courses::table
        .filter(courses::id.eq(course_id))
        .filter(courses::deleted_at.is_null())
        .count()
        .get_result(conn)?;
    if live == 0 {
        return Err(AppError::not_found("course"));
    }
    Ok(())
}

// ----- Handlers -----

pub async fn list_modules(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<i32>,
) -> ApiResult {
    let engine = ModuleEngine::new(state.conn.clone());
    Ok(ok(engine.list(course_id)?))
}

pub async fn create_module(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateModuleRequest>,
) -> ApiResult {
    let engine = ModuleEngine::new(state.conn.clone());
    Ok(ok(engine.create(&req)?))
}

pub async fn update_module(
    State(state): State<Arc<AppState>>,
    Path(module_id): Path<i32>,
    Json(req): Json<UpdateModuleRequest>,
) -> ApiResult {
    let engine = ModuleEngine::new(state.conn.clone());
    Ok(ok(engine.update(module_id, &req)?))
}

pub async fn delete_module(
    State(state): State<Arc<AppState>>,
    Path(module_id): Path<i32>,
) -> ApiResult {
    let engine = ModuleEngine::new(state.conn.clone());
    engine.delete(module_id)?;
    Ok(ok(serde_json::Value::Null))
}
