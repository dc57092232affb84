//! Builds the gated per-trainee course view: every module with its items
//! in order, each item marked unlocked or locked, and per-type content
//! resolved (video metadata, file URLs, quiz bodies).
//!
//! External failures are per-item: a video whose metadata lookup fails is
//! skipped with a warning and the rest of the course still renders.

pub mod youtube;

use axum::extract::{Path, State};
use diesel::prelude::*;
use log::warn;
use serde_json::json;
use std::sync::Arc;

use crate::auth::CurrentUser;
use crate::progress::{is_unlocked, Cursor};
use crate::shared::config::{AppConfig, FOLDER_FILE};
use crate::shared::errors::{ok, warning, ApiResult, AppError};
use crate::shared::models::{
    Course, ItemType, Module, ModuleItem, QuestionType, Quiz, QuizAnswer, QuizQuestion,
    UserProgress,
};
use crate::shared::schema::{
    courses, module_items, modules, quiz_answers, quiz_questions, quizzes, user_progresses,
};
use crate::shared::state::AppState;
use crate::shared::utils::DbPool;
use youtube::YoutubeClient;

pub struct LectureEngine {
    db: DbPool,
    config: AppConfig,
    youtube: YoutubeClient,
}

impl LectureEngine {
    pub fn new(db: DbPool, config: AppConfig, http: reqwest::Client) -> Self {
        let youtube = YoutubeClient::new(http, config.youtube_api_key.clone());
        Self {
            db,
            config,
            youtube,
        }
    }

    /// Assembles the course for one trainee. Returns the payload and how
    /// many items had to be skipped because their content could not be
    /// resolved.
    pub async fn assemble(
        &self,
        user_id: i32,
        course_id: i32,
    ) -> Result<(serde_json::Value, usize), AppError> {
        let mut conn = self.db.get()?;

        let course: Course = courses::table
            .filter(courses::id.eq(course_id))
            .filter(courses::deleted_at.is_null())
            .first(&mut conn)
            .optional()?
            .ok_or_else(|| AppError::not_found("course"))?;

        let progress: UserProgress = user_progresses::table
            .filter(user_progresses::user_id.eq(user_id))
            .filter(user_progresses::course_id.eq(course_id))
            .filter(user_progresses::deleted_at.is_null())
            .first(&mut conn)
            .optional()?
            .ok_or_else(|| AppError::not_found("enrollment for this course"))?;
        let cursor = Cursor::new(progress.module_position, progress.module_item_position);

        let course_modules: Vec<Module> = modules::table
            .filter(modules::course_id.eq(course_id))
            .filter(modules::deleted_at.is_null())
            .order(modules::position.asc())
            .load(&mut conn)?;

        let mut skipped = 0;
        let mut rendered_modules = Vec::with_capacity(course_modules.len());
        for module in &course_modules {
            let items: Vec<ModuleItem> = module_items::table
                .filter(module_items::module_id.eq(module.id))
                .filter(module_items::deleted_at.is_null())
                .order(module_items::position.asc())
                .load(&mut conn)?;

            let mut lectures = Vec::with_capacity(items.len());
            for item in &items {
                let unlocked = is_unlocked(cursor, module.position, item.position);
                match self.render_item(&mut conn, item).await {
                    Ok(content) => lectures.push(json!({
                        "id": item.id,
                        "title": item.title,
                        "item_type": item.item_type,
                        "position": item.position,
                        "required_time": item.required_time,
                        "unlocked": unlocked,
                        "content": content,
                    })),
                    Err(err) => {
                        warn!(
                            "skipping item {} in course {}: {}",
                            item.id, course_id, err
                        );
                        skipped += 1;
                    }
                }
            }

            rendered_modules.push(json!({
                "id": module.id,
                "title": module.title,
                "position": module.position,
                "lectures": lectures,
            }));
        }

        let payload = json!({
            "course": course,
            "progress": progress,
            "modules": rendered_modules,
        });
        Ok((payload, skipped))
    }

    async fn render_item(
        &self,
        conn: &mut PgConnection,
        item: &ModuleItem,
    ) -> Result<serde_json::Value, AppError> {
        let item_type = ItemType::parse(&item.item_type)
            .ok_or_else(|| AppError::System(format!("unknown item type {:?}", item.item_type)))?;

        match item_type {
            ItemType::Video => {
                let metadata = self
                    .youtube
                    .video_metadata(&item.resource)
                    .await
                    .map_err(|e| AppError::System(e.to_string()))?;
                Ok(json!({
                    "video_id": item.resource,
                    "title": metadata.title,
                    "thumbnail": metadata.thumbnail,
                    "duration": metadata.duration,
                    "published_at": metadata.published_at,
                }))
            }
            ItemType::File | ItemType::Slide => Ok(json!({
                "url": self.config.storage_url(FOLDER_FILE, &item.resource),
            })),
            ItemType::Quiz => self.render_quiz(conn, item.quiz_id),
        }
    }

    /// Quiz body for the lecture view. Options expose ids and text only;
    /// the answer key never travels with a lecture, and essays carry no
    /// options at all.
    fn render_quiz(
        &self,
        conn: &mut PgConnection,
        quiz_id: i32,
    ) -> Result<serde_json::Value, AppError> {
        let quiz: Quiz = quizzes::table
            .filter(quizzes::id.eq(quiz_id))
            .filter(quizzes::deleted_at.is_null())
            .first(conn)
            .optional()?
            .ok_or_else(|| AppError::not_found("quiz"))?;

        let questions: Vec<QuizQuestion> = quiz_questions::table
            .filter(quiz_questions::quiz_id.eq(quiz_id))
            .filter(quiz_questions::deleted_at.is_null())
            .order(quiz_questions::id.asc())
            .load(conn)?;

        let mut rendered = Vec::with_capacity(questions.len());
        for question in &questions {
            let mut entry = json!({
                "id": question.id,
                "question_type": question.question_type,
                "question_text": question.question_text,
                "is_multiple_correct": question.is_multiple_correct,
            });

            if QuestionType::parse(&question.question_type) != Some(QuestionType::Essay) {
                let answers: Vec<QuizAnswer> = quiz_answers::table
                    .filter(quiz_answers::question_id.eq(question.id))
                    .filter(quiz_answers::deleted_at.is_null())
                    .order(quiz_answers::id.asc())
                    .load(conn)?;
                let options: Vec<serde_json::Value> = answers
                    .iter()
                    .map(|a| json!({ "id": a.id, "answer_text": a.answer_text }))
                    .collect();
                entry["options"] = json!(options);
            }
            rendered.push(entry);
        }

        Ok(json!({
            "quiz_id": quiz.id,
            "title": quiz.title,
            "difficulty": difficulty_label(quiz.difficulty),
            "total_score": quiz.total_score,
            "time_limit": quiz.time_limit,
            "questions": rendered,
        }))
    }
}

/// Difficulty is stored as 1..=3 and shown to trainees as a label.
pub fn difficulty_label(difficulty: i32) -> &'static str {
    match difficulty {
        1 => "easy",
        2 => "medium",
        3 => "hard",
        _ => "unknown",
    }
}

// ----- Handlers -----

pub async fn get_lecture(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(course_id): Path<i32>,
) -> ApiResult {
    let engine = LectureEngine::new(
        state.conn.clone(),
        state.config.clone(),
        state.http.clone(),
    );
    let (payload, skipped) = engine.assemble(current.id(), course_id).await?;

    if skipped > 0 {
        Ok(warning(
            &format!("{skipped} item(s) could not be loaded"),
            payload,
        ))
    } else {
        Ok(ok(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_labels() {
        assert_eq!(difficulty_label(1), "easy");
        assert_eq!(difficulty_label(2), "medium");
        assert_eq!(difficulty_label(3), "hard");
        assert_eq!(difficulty_label(0), "unknown");
        assert_eq!(difficulty_label(9), "unknown");
    }
}
