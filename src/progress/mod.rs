//! Per-trainee course progress: the (module, item) cursor, completion
//! detection, bulk assignment, and manager review. The gating rule that
//! the lecture assembler consumes lives here too, as pure functions.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use diesel::prelude::*;
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::CurrentUser;
use crate::shared::errors::{ok, ApiResult, AppError};
use crate::shared::models::{Course, NewUserCourse, NewUserProgress, UserProgress};
use crate::shared::schema::{courses, module_items, modules, user_courses, user_progresses, users};
use crate::shared::state::AppState;
use crate::shared::utils::DbPool;

/// A trainee's cursor into a course. Positions are 1-based ordinals into
/// the module list and the current module's item list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub module: i32,
    pub item: i32,
}

impl Cursor {
    pub fn new(module: i32, item: i32) -> Self {
        Self { module, item }
    }

    /// Lexicographic max over (module, item); the cursor never rewinds.
    pub fn clamp_forward(self, other: Cursor) -> Cursor {
        if (other.module, other.item) > (self.module, self.item) {
            other
        } else {
            self
        }
    }
}

/// Item (m, i) is unlocked when it sits in a fully passed module, or in
/// the current module at or before the cursor. The first item of the
/// first module is therefore always unlocked.
pub fn is_unlocked(cursor: Cursor, module_pos: i32, item_pos: i32) -> bool {
    module_pos < cursor.module || (module_pos == cursor.module && item_pos <= cursor.item)
}

#[derive(Debug, Deserialize)]
pub struct AdvanceRequest {
    pub course_id: i32,
    pub module_position: i32,
    pub module_item_position: i32,
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub course_id: i32,
    pub user_ids: Vec<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub user_id: i32,
    pub course_id: i32,
    pub performance: i32,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Serialize)]
pub struct ProgressWithCourse {
    #[serde(flatten)]
    pub progress: UserProgress,
    pub course: Course,
}

pub struct ProgressEngine {
    db: DbPool,
}

impl ProgressEngine {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub fn get(&self, user_id: i32, course_id: i32) -> Result<UserProgress, AppError> {
        let mut conn = self.db.get()?;
        live_progress(&mut conn, user_id, course_id)?
            .ok_or_else(|| AppError::not_found("user progress"))
    }

    /// All of a trainee's courses in prescribed learning order.
    pub fn list_for_user(&self, user_id: i32) -> Result<Vec<ProgressWithCourse>, AppError> {
        let mut conn = self.db.get()?;
        let rows: Vec<(UserProgress, Course)> = user_progresses::table
            .inner_join(courses::table.on(courses::id.eq(user_progresses::course_id)))
            .filter(user_progresses::user_id.eq(user_id))
            .filter(user_progresses::deleted_at.is_null())
            .filter(courses::deleted_at.is_null())
            .order(user_progresses::course_position.asc())
            .load(&mut conn)?;
        Ok(rows
            .into_iter()
            .map(|(progress, course)| ProgressWithCourse { progress, course })
            .collect())
    }

    /// Moves the cursor forward. The submitted position is clamped against
    /// the stored one so a stale client can never rewind a trainee, and
    /// `completed` latches once the final item of the final module is
    /// reached.
    pub fn advance(
        &self,
        user_id: i32,
        req: &AdvanceRequest,
    ) -> Result<UserProgress, AppError> {
        if req.module_position < 1 || req.module_item_position < 1 {
            return Err(AppError::InvalidParams(
                "positions are 1-based".to_string(),
            ));
        }

        let mut conn = self.db.get()?;
        let (last_module_pos, last_item_pos) = course_extent(&mut conn, req.course_id)?;
        let submitted = Cursor::new(req.module_position, req.module_item_position);

        match live_progress(&mut conn, user_id, req.course_id)? {
            Some(existing) => {
                let stored = Cursor::new(existing.module_position, existing.module_item_position);
                let cursor = stored.clamp_forward(submitted);
                let completed = existing.completed
                    || (cursor.module >= last_module_pos && cursor.item >= last_item_pos);
                diesel::update(user_progresses::table.find(existing.id))
                    .set((
                        user_progresses::module_position.eq(cursor.module),
                        user_progresses::module_item_position.eq(cursor.item),
                        user_progresses::completed.eq(completed),
                        user_progresses::updated_at.eq(Utc::now()),
                    ))
                    .execute(&mut conn)?;
            }
            None => {
                let completed =
                    submitted.module >= last_module_pos && submitted.item >= last_item_pos;
                let course_position = next_course_position(&mut conn, user_id)?;
                diesel::insert_into(user_progresses::table)
                    .values(NewUserProgress {
                        user_id,
                        course_id: req.course_id,
                        course_position,
                        module_position: submitted.module,
                        module_item_position: submitted.item,
                        completed,
                    })
                    .execute(&mut conn)?;
            }
        }

        live_progress(&mut conn, user_id, req.course_id)?
            .ok_or_else(|| AppError::not_found("user progress"))
    }

    /// Enrolls a batch of trainees at cursor (1, 1). Trainees who already
    /// hold a live progress row for the course are skipped.
    pub fn assign(&self, req: &AssignRequest) -> Result<usize, AppError> {
        if req.user_ids.is_empty() {
            return Err(AppError::InvalidParams(
                "user_ids must not be empty".to_string(),
            ));
        }

        let mut conn = self.db.get()?;
        crate::catalog::modules::ensure_course_live(&mut conn, req.course_id)?;

        let live_ids: Vec<i32> = users::table
            .filter(users::id.eq_any(&req.user_ids))
            .filter(users::deleted_at.is_null())
            .select(users::id)
            .load(&mut conn)?;
        if let Some(missing) = first_missing(&req.user_ids, &live_ids) {
            return Err(AppError::InvalidParams(format!(
                "user {missing} does not exist"
            )));
        }

        let mut assigned = 0;
        for &user_id in &req.user_ids {
            if live_progress(&mut conn, user_id, req.course_id)?.is_some() {
                continue;
            }
            let course_position = next_course_position(&mut conn, user_id)?;
            conn.transaction::<(), diesel::result::Error, _>(|conn| {
                diesel::insert_into(user_progresses::table)
                    .values(NewUserProgress {
                        user_id,
                        course_id: req.course_id,
                        course_position,
                        module_position: 1,
                        module_item_position: 1,
                        completed: false,
                    })
                    .execute(conn)?;
                diesel::insert_into(user_courses::table)
                    .values(NewUserCourse {
                        user_id,
                        course_id: req.course_id,
                    })
                    .execute(conn)?;
                Ok(())
            })?;
            assigned += 1;
        }

        info!(
            "assigned course {} to {} trainee(s)",
            req.course_id, assigned
        );
        Ok(assigned)
    }

    /// Records a manager's assessment on the trainee's progress row.
    pub fn review(&self, reviewer_id: i32, req: &ReviewRequest) -> Result<UserProgress, AppError> {
        let mut conn = self.db.get()?;
        let existing = live_progress(&mut conn, req.user_id, req.course_id)?
            .ok_or_else(|| AppError::not_found("user progress"))?;

        diesel::update(user_progresses::table.find(existing.id))
            .set((
                user_progresses::performance.eq(Some(req.performance)),
                user_progresses::review_comment.eq(Some(req.comment.clone())),
                user_progresses::reviewed_by.eq(Some(reviewer_id)),
                user_progresses::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        live_progress(&mut conn, req.user_id, req.course_id)?
            .ok_or_else(|| AppError::not_found("user progress"))
    }
}

fn live_progress(
    conn: &mut PgConnection,
    user_id: i32,
    course_id: i32,
) -> Result<Option<UserProgress>, AppError> {
    user_progresses::table
        .filter(user_progresses::user_id.eq(user_id))
        .filter(user_progresses::course_id.eq(course_id))
        .filter(user_progresses::deleted_at.is_null())
        .first(conn)
        .optional()
        .map_err(AppError::from)
}

/// The final (module, item) positions of a course: the module at the
/// maximum position and the maximum item position within it.
fn course_extent(conn: &mut PgConnection, course_id: i32) -> Result<(i32, i32), AppError> {
    let last_module: Option<(i32, i32)> = modules::table
        .filter(modules::course_id.eq(course_id))
        .filter(modules::deleted_at.is_null())
        .order(modules::position.desc())
        .select((modules::id, modules::position))
        .first(conn)
        .optional()?;
    let (last_module_id, last_module_pos) =
        last_module.ok_or_else(|| AppError::not_found("course modules"))?;

    let last_item_pos: Option<i32> = module_items::table
        .filter(module_items::module_id.eq(last_module_id))
        .filter(module_items::deleted_at.is_null())
        .select(diesel::dsl::max(module_items::position))
        .first(conn)?;

    Ok((last_module_pos, last_item_pos.unwrap_or(0)))
}

/// First requested id missing from the live set, if any.
fn first_missing(requested: &[i32], live: &[i32]) -> Option<i32> {
    requested.iter().copied().find(|id| !live.contains(id))
}

/// Next ordinal in the trainee's learning path.
fn next_course_position(conn: &mut PgConnection, user_id: i32) -> Result<i32, AppError> {
    let max_position: Option<i32> = user_progresses::table
        .filter(user_progresses::user_id.eq(user_id))
        .filter(user_progresses::deleted_at.is_null())
        .select(diesel::dsl::max(user_progresses::course_position))
        .first(conn)?;
    Ok(max_position.unwrap_or(0) + 1)
}

// ----- Handlers -----

pub async fn get_progress(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(course_id): Path<i32>,
) -> ApiResult {
    let engine = ProgressEngine::new(state.conn.clone());
    Ok(ok(engine.get(current.id(), course_id)?))
}

pub async fn list_progress(State(state): State<Arc<AppState>>, current: CurrentUser) -> ApiResult {
    let engine = ProgressEngine::new(state.conn.clone());
    Ok(ok(engine.list_for_user(current.id())?))
}

pub async fn get_trainee_progress(
    State(state): State<Arc<AppState>>,
    Path((user_id, course_id)): Path<(i32, i32)>,
) -> ApiResult {
    let engine = ProgressEngine::new(state.conn.clone());
    Ok(ok(engine.get(user_id, course_id)?))
}

pub async fn list_trainee_progress(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i32>,
) -> ApiResult {
    let engine = ProgressEngine::new(state.conn.clone());
    Ok(ok(engine.list_for_user(user_id)?))
}

pub async fn advance_progress(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Json(req): Json<AdvanceRequest>,
) -> ApiResult {
    let engine = ProgressEngine::new(state.conn.clone());
    Ok(ok(engine.advance(current.id(), &req)?))
}

pub async fn assign_course(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AssignRequest>,
) -> ApiResult {
    let engine = ProgressEngine::new(state.conn.clone());
    let assigned = engine.assign(&req)?;
    Ok(ok(serde_json::json!({ "assigned": assigned })))
}

pub async fn review_progress(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Json(req): Json<ReviewRequest>,
) -> ApiResult {
    let engine = ProgressEngine::new(state.conn.clone());
    Ok(ok(engine.review(current.id(), &req)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gating_grid() {
        // Modules at positions 1..=3, two items each, cursor at (2, 1).
        let cursor = Cursor::new(2, 1);
        assert!(is_unlocked(cursor, 1, 1));
        assert!(is_unlocked(cursor, 1, 2));
        assert!(is_unlocked(cursor, 2, 1));
        assert!(!is_unlocked(cursor, 2, 2));
        assert!(!is_unlocked(cursor, 3, 1));
        assert!(!is_unlocked(cursor, 3, 2));
    }

    #[test]
    fn test_first_item_always_unlocked() {
        assert!(is_unlocked(Cursor::new(1, 1), 1, 1));
    }

    #[test]
    fn test_clamp_never_rewinds() {
        let stored = Cursor::new(2, 1);
        assert_eq!(stored.clamp_forward(Cursor::new(1, 2)), stored);
        assert_eq!(stored.clamp_forward(Cursor::new(2, 1)), stored);
        assert_eq!(
            stored.clamp_forward(Cursor::new(2, 2)),
            Cursor::new(2, 2)
        );
        assert_eq!(
            stored.clamp_forward(Cursor::new(3, 1)),
            Cursor::new(3, 1)
        );
    }

    #[test]
    fn test_first_missing_trainee_id() {
        assert_eq!(first_missing(&[1, 2, 3], &[1, 2, 3]), None);
        assert_eq!(first_missing(&[1, 4, 2], &[1, 2]), Some(4));
        assert_eq!(first_missing(&[], &[]), None);
        assert_eq!(first_missing(&[5], &[]), Some(5));
    }

    #[test]
    fn test_completion_rule() {
        let (last_module, last_item) = (3, 2);
        let complete = |c: Cursor| c.module >= last_module && c.item >= last_item;
        assert!(complete(Cursor::new(3, 2)));
        assert!(!complete(Cursor::new(2, 2)));
        assert!(!complete(Cursor::new(3, 1)));
    }
}
