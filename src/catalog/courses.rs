//! Course CRUD plus the skill-keyword tag links. Every multi-row mutation
//! here runs in one transaction: the catalog is the substrate the gating
//! engine computes over, so partial writes are never acceptable.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use diesel::prelude::*;
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::CurrentUser;
use crate::shared::errors::{ok, ApiResult, AppError};
use crate::shared::models::{Course, NewCourse, NewCourseSkillKeyword, SkillKeyword};
use crate::shared::schema::{course_skill_keywords, courses, skill_keywords, user_courses};
use crate::shared::state::AppState;
use crate::shared::utils::{page_bounds, DbPool};

#[derive(Debug, Deserialize)]
pub struct ListCoursesQuery {
    #[serde(default)]
    pub keyword: String,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default)]
    pub per_page: i64,
}

fn default_page() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct CreateCourseRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub skill_keyword_ids: Vec<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCourseRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub thumbnail: String,
    pub skill_keyword_ids: Option<Vec<i32>>,
}

#[derive(Debug, Serialize)]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: Course,
    pub skill_keywords: Vec<SkillKeyword>,
}

pub struct CourseEngine {
    db: DbPool,
}

impl CourseEngine {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Case-insensitive title search, newest first. `per_page = 0` returns
    /// every matching row; `total` is always the unpaged count.
    pub fn list(
        &self,
        keyword: &str,
        page: i64,
        per_page: i64,
    ) -> Result<(Vec<Course>, i64), AppError> {
        let mut conn = self.db.get()?;
        let pattern = format!("%{}%", keyword);

        let total: i64 = courses::table
            .filter(courses::deleted_at.is_null())
            .filter(courses::title.ilike(&pattern))
            .count()
            .get_result(&mut conn)?;

        let mut query = courses::table
            .filter(courses::deleted_at.is_null())
            .filter(courses::title.ilike(&pattern))
            .order(courses::created_at.desc())
            .into_boxed();

        if let Some((limit, offset)) = page_bounds(page, per_page) {
            query = query.limit(limit).offset(offset);
        }

        let rows = query.load::<Course>(&mut conn)?;
        Ok((rows, total))
    }

    pub fn get(&self, course_id: i32) -> Result<CourseDetail, AppError> {
        let mut conn = self.db.get()?;
        let course: Course = courses::table
            .filter(courses::id.eq(course_id))
            .filter(courses::deleted_at.is_null())
            .first(&mut conn)
            .optional()?
            .ok_or_else(|| AppError::not_found("course"))?;

        let keyword_ids: Vec<i32> = course_skill_keywords::table
            .filter(course_skill_keywords::course_id.eq(course_id))
            .filter(course_skill_keywords::deleted_at.is_null())
            .select(course_skill_keywords::skill_keyword_id)
            .load(&mut conn)?;

        let keywords = skill_keywords::table
            .filter(skill_keywords::id.eq_any(&keyword_ids))
            .filter(skill_keywords::deleted_at.is_null())
            .load::<SkillKeyword>(&mut conn)?;

        Ok(CourseDetail {
            course,
            skill_keywords: keywords,
        })
    }

    /// Course row and all tag links land together or not at all.
    pub fn create(&self, created_by: i32, req: &CreateCourseRequest) -> Result<i32, AppError> {
        if req.title.is_empty() || req.category.is_empty() {
            return Err(AppError::InvalidParams(
                "title and category are required".to_string(),
            ));
        }

        let mut conn = self.db.get()?;
        let course_id = conn.transaction::<i32, diesel::result::Error, _>(|conn| {
            let course_id = diesel::insert_into(courses::table)
                .values(NewCourse {
                    title: &req.title,
                    description: &req.description,
                    category: &req.category,
                    thumbnail: &req.thumbnail,
                    created_by,
                })
                .returning(courses::id)
                .get_result::<i32>(conn)?;

            for keyword_id in &req.skill_keyword_ids {
                diesel::insert_into(course_skill_keywords::table)
                    .values(NewCourseSkillKeyword {
                        course_id,
                        skill_keyword_id: *keyword_id,
                    })
                    .execute(conn)?;
            }

            Ok(course_id)
        })?;

        info!("created course {} ({})", course_id, req.title);
        Ok(course_id)
    }

    /// Partial update; when `skill_keyword_ids` is present the link set is
    /// replaced wholesale: old rows are physically deleted and the delete
    /// is verified before the new set is inserted.
    pub fn update(&self, course_id: i32, req: &UpdateCourseRequest) -> Result<(), AppError> {
        let mut conn = self.db.get()?;
        let course: Course = courses::table
            .filter(courses::id.eq(course_id))
            .filter(courses::deleted_at.is_null())
            .first(&mut conn)
            .optional()?
            .ok_or_else(|| AppError::not_found("course"))?;

        let pick = |incoming: &str, current: &str| -> String {
            if incoming.is_empty() {
                current.to_string()
            } else {
                incoming.to_string()
            }
        };

        conn.transaction::<(), AppError, _>(|conn| {
            diesel::update(courses::table.find(course_id))
                .set((
                    courses::title.eq(pick(&req.title, &course.title)),
                    courses::description.eq(pick(&req.description, &course.description)),
                    courses::category.eq(pick(&req.category, &course.category)),
                    courses::thumbnail.eq(pick(&req.thumbnail, &course.thumbnail)),
                    courses::updated_at.eq(Utc::now()),
                ))
                .execute(conn)
                .map_err(AppError::from)?;

            if let Some(keyword_ids) = &req.skill_keyword_ids {
                diesel::delete(
                    course_skill_keywords::table
                        .filter(course_skill_keywords::course_id.eq(course_id)),
                )
                .execute(conn)
                .map_err(AppError::from)?;

                let leftover: i64 = course_skill_keywords::table
                    .filter(course_skill_keywords::course_id.eq(course_id))
                    .count()
                    .get_result(conn)
                    .map_err(AppError::from)?;
                if leftover != 0 {
                    return Err(AppError::System(
                        "stale skill keyword links survived the delete".to_string(),
                    ));
                }

                for keyword_id in keyword_ids {
                    diesel::insert_into(course_skill_keywords::table)
                        .values(NewCourseSkillKeyword {
                            course_id,
                            skill_keyword_id: *keyword_id,
                        })
                        .execute(conn)
                        .map_err(AppError::from)?;
                }
            }

            Ok(())
        })
    }

    /// Soft-deletes the course and hard-deletes its trainee assignments.
    /// Modules and items disappear implicitly through the parent-live rule.
    pub fn delete(&self, course_id: i32) -> Result<(), AppError> {
        let mut conn = self.db.get()?;
        let now = Utc::now();

        conn.transaction::<(), diesel::result::Error, _>(|conn| {
            let updated = diesel::update(
                courses::table
                    .filter(courses::id.eq(course_id))
                    .filter(courses::deleted_at.is_null()),
            )
            .set(courses::deleted_at.eq(now))
            .execute(conn)?;
            if updated == 0 {
                return Err(diesel::result::Error::NotFound);
            }

            diesel::delete(user_courses::table.filter(user_courses::course_id.eq(course_id)))
                .execute(conn)?;
            Ok(())
        })?;

        info!("deleted course {}", course_id);
        Ok(())
    }
}

// ----- Handlers -----

pub async fn list_courses(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListCoursesQuery>,
) -> ApiResult {
    let engine = CourseEngine::new(state.conn.clone());
    let (courses, total) = engine.list(&query.keyword, query.page, query.per_page)?;
    Ok(ok(serde_json::json!({
        "courses": courses,
        "total": total,
    })))
}

pub async fn get_course(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<i32>,
) -> ApiResult {
    let engine = CourseEngine::new(state.conn.clone());
    Ok(ok(engine.get(course_id)?))
}

pub async fn create_course(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Json(req): Json<CreateCourseRequest>,
) -> ApiResult {
    let engine = CourseEngine::new(state.conn.clone());
    let course_id = engine.create(current.id(), &req)?;
    Ok(ok(engine.get(course_id)?))
}

pub async fn update_course(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<i32>,
    Json(req): Json<UpdateCourseRequest>,
) -> ApiResult {
    let engine = CourseEngine::new(state.conn.clone());
    engine.update(course_id, &req)?;
    Ok(ok(engine.get(course_id)?))
}

pub async fn delete_course(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<i32>,
) -> ApiResult {
    let engine = CourseEngine::new(state.conn.clone());
    engine.delete(course_id)?;
    Ok(ok(serde_json::Value::Null))
}
