//! Template paths: ordered course bundles managers hand out as learning
//! plans. Duration is derived, never client-supplied.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use diesel::prelude::*;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::shared::errors::{ok, ApiResult, AppError};
use crate::shared::models::{Course, NewTemplatePath, TemplatePath};
use crate::shared::schema::{courses, template_paths};
use crate::shared::state::AppState;
use crate::shared::utils::DbPool;

#[derive(Debug, Deserialize)]
pub struct CreateTemplatePathRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub course_ids: Vec<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTemplatePathRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub course_ids: Option<Vec<i32>>,
}

#[derive(Debug, Serialize)]
pub struct CourseSummary {
    pub id: i32,
    pub title: String,
    pub category: String,
    pub thumbnail: String,
    pub duration: i32,
}

pub struct TemplatePathEngine {
    db: DbPool,
}

impl TemplatePathEngine {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub fn list(&self) -> Result<Vec<TemplatePath>, AppError> {
        let mut conn = self.db.get()?;
        Ok(template_paths::table
            .filter(template_paths::deleted_at.is_null())
            .order(template_paths::created_at.desc())
            .load::<TemplatePath>(&mut conn)?)
    }

    /// Resolves the bundle's course ids into summaries, in bundle order.
    /// Courses that have vanished since the bundle was built are logged
    /// and omitted rather than failing the read.
    pub fn get(&self, path_id: i32) -> Result<serde_json::Value, AppError> {
        let mut conn = self.db.get()?;
        let path = live_path(&mut conn, path_id)?;

        let mut summaries = Vec::with_capacity(path.course_ids.len());
        for &course_id in &path.course_ids {
            let course: Option<Course> = courses::table
                .filter(courses::id.eq(course_id))
                .filter(courses::deleted_at.is_null())
                .first(&mut conn)
                .optional()?;
            match course {
                Some(course) => summaries.push(CourseSummary {
                    id: course.id,
                    title: course.title,
                    category: course.category,
                    thumbnail: course.thumbnail,
                    duration: course.duration,
                }),
                None => warn!(
                    "template path {} references missing course {}",
                    path_id, course_id
                ),
            }
        }

        let mut payload = serde_json::to_value(&path).unwrap_or_default();
        payload["courses"] = json!(summaries);
        Ok(payload)
    }

    pub fn create(&self, req: &CreateTemplatePathRequest) -> Result<TemplatePath, AppError> {
        if req.name.is_empty() {
            return Err(AppError::InvalidParams("name is required".to_string()));
        }
        if req.course_ids.is_empty() {
            return Err(AppError::InvalidParams(
                "course_ids must not be empty".to_string(),
            ));
        }

        let mut conn = self.db.get()?;
        let duration = total_duration(&mut conn, &req.course_ids)?;

        let path_id = diesel::insert_into(template_paths::table)
            .values(NewTemplatePath {
                name: &req.name,
                description: &req.description,
                course_ids: req.course_ids.clone(),
                duration,
            })
            .returning(template_paths::id)
            .get_result::<i32>(&mut conn)?;

        info!("created template path {} ({})", path_id, req.name);
        live_path(&mut conn, path_id)
    }

    pub fn update(
        &self,
        path_id: i32,
        req: &UpdateTemplatePathRequest,
    ) -> Result<TemplatePath, AppError> {
        let mut conn = self.db.get()?;
        let path = live_path(&mut conn, path_id)?;

        let name = if req.name.is_empty() {
            path.name.clone()
        } else {
            req.name.clone()
        };
        let description = if req.description.is_empty() {
            path.description.clone()
        } else {
            req.description.clone()
        };
        let course_ids = req.course_ids.clone().unwrap_or(path.course_ids);
        if course_ids.is_empty() {
            return Err(AppError::InvalidParams(
                "course_ids must not be empty".to_string(),
            ));
        }
        let duration = total_duration(&mut conn, &course_ids)?;

        diesel::update(template_paths::table.find(path_id))
            .set((
                template_paths::name.eq(name),
                template_paths::description.eq(description),
                template_paths::course_ids.eq(course_ids),
                template_paths::duration.eq(duration),
                template_paths::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;
        live_path(&mut conn, path_id)
    }

    pub fn delete(&self, path_id: i32) -> Result<(), AppError> {
        let mut conn = self.db.get()?;
        let updated = diesel::update(
            template_paths::table
                .filter(template_paths::id.eq(path_id))
                .filter(template_paths::deleted_at.is_null()),
        )
        .set(template_paths::deleted_at.eq(Utc::now()))
        .execute(&mut conn)?;
        if updated == 0 {
            return Err(AppError::not_found("template path"));
        }
        Ok(())
    }
}

fn live_path(conn: &mut PgConnection, path_id: i32) -> Result<TemplatePath, AppError> {
    template_paths::table
        .filter(template_paths::id.eq(path_id))
        .filter(template_paths::deleted_at.is_null())
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::not_found("template path"))
}

/// Every referenced course must be live; duration is their sum.
fn total_duration(conn: &mut PgConnection, course_ids: &[i32]) -> Result<i32, AppError> {
    let live: Vec<(i32, i32)> = courses::table
        .filter(courses::id.eq_any(course_ids))
        .filter(courses::deleted_at.is_null())
        .select((courses::id, courses::duration))
        .load(conn)?;

    for &course_id in course_ids {
        if !live.iter().any(|(id, _)| *id == course_id) {
            return Err(AppError::InvalidParams(format!(
                "course {course_id} does not exist"
            )));
        }
    }

    Ok(live.iter().map(|(_, duration)| duration).sum())
}

// ----- Handlers -----

pub async fn list_template_paths(State(state): State<Arc<AppState>>) -> ApiResult {
    let engine = TemplatePathEngine::new(state.conn.clone());
    Ok(ok(engine.list()?))
}

pub async fn get_template_path(
    State(state): State<Arc<AppState>>,
    Path(path_id): Path<i32>,
) -> ApiResult {
    let engine = TemplatePathEngine::new(state.conn.clone());
    Ok(ok(engine.get(path_id)?))
}

pub async fn create_template_path(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTemplatePathRequest>,
) -> ApiResult {
    let engine = TemplatePathEngine::new(state.conn.clone());
    Ok(ok(engine.create(&req)?))
}

pub async fn update_template_path(
    State(state): State<Arc<AppState>>,
    Path(path_id): Path<i32>,
    Json(req): Json<UpdateTemplatePathRequest>,
) -> ApiResult {
    let engine = TemplatePathEngine::new(state.conn.clone());
    Ok(ok(engine.update(path_id, &req)?))
}

pub async fn delete_template_path(
    State(state): State<Arc<AppState>>,
    Path(path_id): Path<i32>,
) -> ApiResult {
    let engine = TemplatePathEngine::new(state.conn.clone());
    engine.delete(path_id)?;
    Ok(ok(serde_json::Value::Null))
}
