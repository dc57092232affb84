use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;

use crate::shared::errors::{ok, ApiResult, AppError};
use crate::shared::models::{ItemType, ModuleItem, NewModuleItem};
use crate::shared::schema::{module_items, modules, quizzes};
use crate::shared::state::AppState;
use crate::shared::utils::DbPool;

#[derive(Debug, Deserialize)]
pub struct CreateModuleItemRequest {
    pub module_id: i32,
    pub title: String,
    pub item_type: String,
    #[serde(default)]
    pub resource: String,
    #[serde(default)]
    pub required_time: i32,
    #[serde(default)]
    pub quiz_id: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateModuleItemRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub resource: String,
    pub required_time: Option<i32>,
}

pub struct ModuleItemEngine {
    db: DbPool,
}

impl ModuleItemEngine {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub fn list(&self, module_id: i32) -> Result<Vec<ModuleItem>, AppError> {
        let mut conn = self.db.get()?;
        ensure_module_live(&mut conn, module_id)?;
        Ok(module_items::table
            .filter(module_items::module_id.eq(module_id))
            .filter(module_items::deleted_at.is_null())
            .order(module_items::position.asc())
            .load::<ModuleItem>(&mut conn)?)
    }

    pub fn get(&self, item_id: i32) -> Result<ModuleItem, AppError> {
        let mut conn = self.db.get()?;
        module_items::table
            .filter(module_items::id.eq(item_id))
            .filter(module_items::deleted_at.is_null())
            .first(&mut conn)
            .optional()?
            .ok_or_else(|| AppError::not_found("module item"))
    }

    pub fn create(&self, req: &CreateModuleItemRequest) -> Result<ModuleItem, AppError> {
        if req.title.is_empty() {
            return Err(AppError::InvalidParams("title is required".to_string()));
        }
        let item_type = ItemType::parse(&req.item_type)
            .ok_or_else(|| AppError::InvalidParams(format!("unknown item type {:?}", req.item_type)))?;
        if req.required_time < 0 {
            return Err(AppError::InvalidParams(
                "required_time must not be negative".to_string(),
            ));
        }

        let mut conn = self.db.get()?;
        ensure_module_live(&mut conn, req.module_id)?;

        // Quiz items point at a live quiz; every other type carries a zero
        // quiz reference.
        match item_type {
            ItemType::Quiz => {
                if req.quiz_id == 0 {
                    return Err(AppError::InvalidParams(
                        "quiz items require a quiz_id".to_string(),
                    ));
                }
                let live: i64 = quizzes::table
                    .filter(quizzes::id.eq(req.quiz_id))
                    .filter(quizzes::deleted_at.is_null())
                    .count()
                    .get_result(&mut conn)?;
                if live == 0 {
                    return Err(AppError::not_found("quiz"));
                }
            }
            _ => {
                if req.quiz_id != 0 {
                    return Err(AppError::InvalidParams(
                        "only quiz items may reference a quiz".to_string(),
                    ));
                }
            }
        }

        let max_position: Option<i32> = module_items::table
            .filter(module_items::module_id.eq(req.module_id))
            .filter(module_items::deleted_at.is_null())
            .select(diesel::dsl::max(module_items::position))
            .first(&mut conn)?;

        let item_id = diesel::insert_into(module_items::table)
            .values(NewModuleItem {
                module_id: req.module_id,
                title: &req.title,
                item_type: item_type.as_str(),
                resource: &req.resource,
                position: max_position.unwrap_or(0) + 1,
                required_time: req.required_time,
                quiz_id: req.quiz_id,
            })
            .returning(module_items::id)
            .get_result::<i32>(&mut conn)?;

        self.get(item_id)
    }

    pub fn update(
        &self,
        item_id: i32,
        req: &UpdateModuleItemRequest,
    ) -> Result<ModuleItem, AppError> {
        let mut conn = self.db.get()?;
        let item = self.get(item_id)?;

        let title = if req.title.is_empty() {
            item.title.clone()
        } else {
            req.title.clone()
        };
        let resource = if req.resource.is_empty() {
            item.resource.clone()
        } else {
            req.resource.clone()
        };
        let required_time = req.required_time.unwrap_or(item.required_time);
        if required_time < 0 {
            return Err(AppError::InvalidParams(
                "required_time must not be negative".to_string(),
            ));
        }

        diesel::update(module_items::table.find(item_id))
            .set((
                module_items::title.eq(title),
                module_items::resource.eq(resource),
                module_items::required_time.eq(required_time),
                module_items::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;
        self.get(item_id)
    }

    pub fn delete(&self, item_id: i32) -> Result<(), AppError> {
        let mut conn = self.db.get()?;
        let updated = diesel::update(
            module_items::table
                .filter(module_items::id.eq(item_id))
                .filter(module_items::deleted_at.is_null()),
        )
        .set(module_items::deleted_at.eq(Utc::now()))
        .execute(&mut conn)?;
        if updated == 0 {
            return Err(AppError::not_found("module item"));
        }
        Ok(())
    }
}

fn ensure_module_live(conn: &mut PgConnection, module_id: i32) -> Result<(), AppError> {
    let live: i64 = modules::table
        .filter(modules::id.eq(module_id))
        .filter(modules::deleted_at.is_null())
        .count()
        .get_result(conn)?;
    if live == 0 {
        return Err(AppError::not_found("module"));
    }
    Ok(())
}

// ----- Handlers -----

pub async fn list_module_items(
    State(state): State<Arc<AppState>>,
    Path(module_id): Path<i32>,
) -> ApiResult {
    let engine = ModuleItemEngine::new(state.conn.clone());
    Ok(ok(engine.list(module_id)?))
}

pub async fn create_module_item(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateModuleItemRequest>,
) -> ApiResult {
    let engine = ModuleItemEngine::new(state.conn.clone());
    Ok(ok(engine.create(&req)?))
}

pub async fn update_module_item(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<i32>,
    Json(req): Json<UpdateModuleItemRequest>,
) -> ApiResult {
    let engine = ModuleItemEngine::new(state.conn.clone());
    Ok(ok(engine.update(item_id, &req)?))
}

pub async fn delete_module_item(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<i32>,
) -> ApiResult {
    let engine = ModuleItemEngine::new(state.conn.clone());
    engine.delete(item_id)?;
    Ok(ok(serde_json::Value::Null))
}
