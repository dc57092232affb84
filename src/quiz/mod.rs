//! Quiz authoring, grading, and essay review.
//!
//! Multiple-choice answers are graded by set equality against the correct
//! answer set and scored as `weight * quiz.total_score`. Essays persist at
//! score 0 with `reviewed = false` until a manager awards points. Readers
//! always see the latest attempt only.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use diesel::prelude::*;
use log::{info, warn};
use serde::Deserialize;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::auth::CurrentUser;
use crate::shared::errors::{ok, ApiResult, AppError};
use crate::shared::models::{
    NewQuiz, NewQuizAnswer, NewQuizQuestion, NewQuizSubmission, QuestionType, Quiz, QuizAnswer,
    QuizQuestion, QuizSubmission,
};
use crate::shared::schema::{quiz_answers, quiz_questions, quiz_submissions, quizzes, users};
use crate::shared::state::AppState;
use crate::shared::utils::{page_bounds, DbPool};

/// Fraction of `total_score` a trainee must reach to pass.
pub const PASS_RATIO: f64 = 0.7;

const WEIGHT_EPSILON: f64 = 1e-6;

#[derive(Debug, Deserialize)]
pub struct ListQuizzesQuery {
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
pub struct CreateQuizRequest {
    pub title: String,
    #[serde(default)]
    pub difficulty: i32,
    pub total_score: f64,
    #[serde(default)]
    pub time_limit: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuizRequest {
    #[serde(default)]
    pub title: String,
    pub difficulty: Option<i32>,
    pub total_score: Option<f64>,
    pub time_limit: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct AnswerInput {
    pub answer_text: String,
    #[serde(default)]
    pub is_correct: bool,
}

#[derive(Debug, Deserialize)]
pub struct SaveQuestionRequest {
    /// Zero (or absent) creates a new question; otherwise the existing
    /// question is updated and its answer set replaced wholesale.
    #[serde(default)]
    pub question_id: i32,
    pub quiz_id: i32,
    pub question_type: String,
    pub question_text: String,
    #[serde(default)]
    pub explanation: String,
    pub weight: f64,
    #[serde(default)]
    pub is_multiple_correct: bool,
    #[serde(default)]
    pub answers: Vec<AnswerInput>,
}

#[derive(Debug, Deserialize)]
pub struct SubmittedAnswer {
    pub question_id: i32,
    #[serde(default)]
    pub selected_answer_ids: Vec<i32>,
    #[serde(default)]
    pub answer_text: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitFullRequest {
    pub quiz_id: i32,
    pub answers: Vec<SubmittedAnswer>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewEssayRequest {
    pub submission_id: i32,
    pub score: f64,
    #[serde(default)]
    pub feedback: String,
}

/// A multiple-choice answer is correct iff the selection, taken as a
/// set, equals the correct set exactly. Duplicate ids in the submission
/// collapse before comparing so a repeated pick cannot pad cardinality.
pub fn selection_is_correct(selected: &[i32], correct: &[i32]) -> bool {
    let selected: HashSet<i32> = selected.iter().copied().collect();
    let correct: HashSet<i32> = correct.iter().copied().collect();
    selected == correct
}

pub struct QuizEngine {
    db: DbPool,
}

impl QuizEngine {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub fn list(
        &self,
        keyword: &str,
        page: i64,
        per_page: i64,
    ) -> Result<(Vec<Quiz>, i64), AppError> {
        let mut conn = self.db.get()?;
        let pattern = format!("%{}%", keyword);

        let total: i64 = quizzes::table
            .filter(quizzes::deleted_at.is_null())
            .filter(quizzes::title.ilike(&pattern))
            .count()
            .get_result(&mut conn)?;

        let mut query = quizzes::table
            .filter(quizzes::deleted_at.is_null())
            .filter(quizzes::title.ilike(&pattern))
            .order(quizzes::created_at.desc())
            .into_boxed();
        if let Some((limit, offset)) = page_bounds(page, per_page) {
            query = query.limit(limit).offset(offset);
        }

        let rows = query.load::<Quiz>(&mut conn)?;
        Ok((rows, total))
    }

    pub fn get(&self, quiz_id: i32) -> Result<Quiz, AppError> {
        let mut conn = self.db.get()?;
        live_quiz(&mut conn, quiz_id)
    }

    pub fn create(&self, req: &CreateQuizRequest) -> Result<Quiz, AppError> {
        if req.title.is_empty() {
            return Err(AppError::InvalidParams("title is required".to_string()));
        }
        if req.total_score <= 0.0 {
            return Err(AppError::InvalidParams(
                "total_score must be positive".to_string(),
            ));
        }

        let mut conn = self.db.get()?;
        let quiz_id = diesel::insert_into(quizzes::table)
            .values(NewQuiz {
                title: &req.title,
                difficulty: req.difficulty,
                total_score: req.total_score,
                time_limit: req.time_limit,
            })
            .returning(quizzes::id)
            .get_result::<i32>(&mut conn)?;

        info!("created quiz {} ({})", quiz_id, req.title);
        live_quiz(&mut conn, quiz_id)
    }

    pub fn update(&self, quiz_id: i32, req: &UpdateQuizRequest) -> Result<Quiz, AppError> {
        let mut conn = self.db.get()?;
        let quiz = live_quiz(&mut conn, quiz_id)?;

        let title = if req.title.is_empty() {
            quiz.title.clone()
        } else {
            req.title.clone()
        };
        let total_score = req.total_score.unwrap_or(quiz.total_score);
        if total_score <= 0.0 {
            return Err(AppError::InvalidParams(
                "total_score must be positive".to_string(),
            ));
        }

        diesel::update(quizzes::table.find(quiz_id))
            .set((
                quizzes::title.eq(title),
                quizzes::difficulty.eq(req.difficulty.unwrap_or(quiz.difficulty)),
                quizzes::total_score.eq(total_score),
                quizzes::time_limit.eq(req.time_limit.unwrap_or(quiz.time_limit)),
                quizzes::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;
        live_quiz(&mut conn, quiz_id)
    }

    pub fn delete(&self, quiz_id: i32) -> Result<(), AppError> {
        let mut conn = self.db.get()?;
        let updated = diesel::update(
            quizzes::table
                .filter(quizzes::id.eq(quiz_id))
                .filter(quizzes::deleted_at.is_null()),
        )
        .set(quizzes::deleted_at.eq(Utc::now()))
        .execute(&mut conn)?;
        if updated == 0 {
            return Err(AppError::not_found("quiz"));
        }
        Ok(())
    }

    /// Inserts or updates a question together with its answer set. On
    /// update the prior answers are physically deleted so the new set
    /// fully replaces the old one. The quiz's live weights may not sum
    /// past 1.0.
    pub fn save_question(&self, req: &SaveQuestionRequest) -> Result<i32, AppError> {
        if req.question_text.is_empty() {
            return Err(AppError::InvalidParams(
                "question_text is required".to_string(),
            ));
        }
        let question_type = QuestionType::parse(&req.question_type).ok_or_else(|| {
            AppError::InvalidParams(format!("unknown question type {:?}", req.question_type))
        })?;
        if req.weight <= 0.0 || req.weight > 1.0 {
            return Err(AppError::InvalidParams(
                "weight must be in (0, 1]".to_string(),
            ));
        }
        match question_type {
            QuestionType::MultipleChoice => {
                if req.answers.is_empty() {
                    return Err(AppError::InvalidParams(
                        "multiple-choice questions require answers".to_string(),
                    ));
                }
                if !req.answers.iter().any(|a| a.is_correct) {
                    return Err(AppError::InvalidParams(
                        "at least one answer must be correct".to_string(),
                    ));
                }
            }
            QuestionType::Essay => {
                if !req.answers.is_empty() {
                    return Err(AppError::InvalidParams(
                        "essay questions carry no answer options".to_string(),
                    ));
                }
            }
        }

        let mut conn = self.db.get()?;
        live_quiz(&mut conn, req.quiz_id)?;

        let sibling_weight: Option<f64> = quiz_questions::table
            .filter(quiz_questions::quiz_id.eq(req.quiz_id))
            .filter(quiz_questions::deleted_at.is_null())
            .filter(quiz_questions::id.ne(req.question_id))
            .select(diesel::dsl::sum(quiz_questions::weight))
            .first(&mut conn)?;
        if sibling_weight.unwrap_or(0.0) + req.weight > 1.0 + WEIGHT_EPSILON {
            return Err(AppError::InvalidParams(
                "question weights for this quiz would exceed 1.0".to_string(),
            ));
        }

        let question_id = conn.transaction::<i32, AppError, _>(|conn| {
            let question_id = if req.question_id == 0 {
                diesel::insert_into(quiz_questions::table)
                    .values(NewQuizQuestion {
                        quiz_id: req.quiz_id,
                        question_type: question_type.as_str(),
                        question_text: &req.question_text,
                        explanation: &req.explanation,
                        weight: req.weight,
                        is_multiple_correct: req.is_multiple_correct,
                    })
                    .returning(quiz_questions::id)
                    .get_result::<i32>(conn)
                    .map_err(AppError::from)?
            } else {
                let updated = diesel::update(
                    quiz_questions::table
                        .filter(quiz_questions::id.eq(req.question_id))
                        .filter(quiz_questions::quiz_id.eq(req.quiz_id))
                        .filter(quiz_questions::deleted_at.is_null()),
                )
                .set((
                    quiz_questions::question_type.eq(question_type.as_str()),
                    quiz_questions::question_text.eq(&req.question_text),
                    quiz_questions::explanation.eq(&req.explanation),
                    quiz_questions::weight.eq(req.weight),
                    quiz_questions::is_multiple_correct.eq(req.is_multiple_correct),
                    quiz_questions::updated_at.eq(Utc::now()),
                ))
                .execute(conn)
                .map_err(AppError::from)?;
                if updated == 0 {
                    return Err(AppError::not_found("quiz question"));
                }

                diesel::delete(
                    quiz_answers::table.filter(quiz_answers::question_id.eq(req.question_id)),
                )
                .execute(conn)
                .map_err(AppError::from)?;
                req.question_id
            };

            for answer in &req.answers {
                diesel::insert_into(quiz_answers::table)
                    .values(NewQuizAnswer {
                        question_id,
                        answer_text: &answer.answer_text,
                        is_correct: answer.is_correct,
                    })
                    .execute(conn)
                    .map_err(AppError::from)?;
            }

            Ok(question_id)
        })?;

        info!("saved question {} on quiz {}", question_id, req.quiz_id);
        Ok(question_id)
    }

    /// Quiz plus questions and answer options. Non-managers never see
    /// which option is correct.
    pub fn get_detail(&self, quiz_id: i32, redact: bool) -> Result<serde_json::Value, AppError> {
        let mut conn = self.db.get()?;
        let quiz = live_quiz(&mut conn, quiz_id)?;
        let questions = live_questions(&mut conn, quiz_id)?;
        let mut answer_map = live_answers(&mut conn, &questions)?;

        let questions: Vec<serde_json::Value> = questions
            .into_iter()
            .map(|question| {
                let answers =
                    project_answers(&answer_map.remove(&question.id).unwrap_or_default(), redact);
                let mut entry = serde_json::to_value(&question).unwrap_or_default();
                entry["answers"] = json!(answers);
                entry
            })
            .collect();

        let mut detail = serde_json::to_value(&quiz).unwrap_or_default();
        detail["questions"] = json!(questions);
        Ok(detail)
    }

    /// Grades and persists a whole attempt in one batch.
    pub fn submit_full(
        &self,
        user_id: i32,
        req: &SubmitFullRequest,
    ) -> Result<serde_json::Value, AppError> {
        if req.answers.is_empty() {
            return Err(AppError::InvalidParams(
                "answers must not be empty".to_string(),
            ));
        }

        let mut conn = self.db.get()?;
        let quiz = live_quiz(&mut conn, req.quiz_id)?;
        let questions = live_questions(&mut conn, req.quiz_id)?;
        let answer_map = live_answers(&mut conn, &questions)?;
        let by_id: HashMap<i32, &QuizQuestion> =
            questions.iter().map(|q| (q.id, q)).collect();

        let max_attempt: Option<i32> = quiz_submissions::table
            .filter(quiz_submissions::user_id.eq(user_id))
            .filter(quiz_submissions::quiz_id.eq(req.quiz_id))
            .filter(quiz_submissions::deleted_at.is_null())
            .select(diesel::dsl::max(quiz_submissions::attempt))
            .first(&mut conn)?;
        let attempt = max_attempt.unwrap_or(0) + 1;

        let now = Utc::now();
        let mut user_score = 0.0;
        let mut has_essay = false;

        conn.transaction::<(), AppError, _>(|conn| {
            for answer in &req.answers {
                let question = match by_id.get(&answer.question_id) {
                    Some(question) => *question,
                    None => {
                        warn!(
                            "submission for quiz {} references unknown question {}",
                            req.quiz_id, answer.question_id
                        );
                        continue;
                    }
                };

                let (score, reviewed) = match QuestionType::parse(&question.question_type) {
                    Some(QuestionType::Essay) => {
                        has_essay = true;
                        (0.0, false)
                    }
                    _ => {
                        let correct_ids: Vec<i32> = answer_map
                            .get(&question.id)
                            .map(|answers| {
                                answers
                                    .iter()
                                    .filter(|a| a.is_correct)
                                    .map(|a| a.id)
                                    .collect()
                            })
                            .unwrap_or_default();
                        let correct =
                            selection_is_correct(&answer.selected_answer_ids, &correct_ids);
                        let score = if correct {
                            question.weight * quiz.total_score
                        } else {
                            0.0
                        };
                        (score, true)
                    }
                };

                user_score += score;
                diesel::insert_into(quiz_submissions::table)
                    .values(NewQuizSubmission {
                        user_id,
                        quiz_id: req.quiz_id,
                        question_id: question.id,
                        selected_answer_ids: answer.selected_answer_ids.clone(),
                        answer_text: &answer.answer_text,
                        score,
                        attempt,
                        reviewed,
                        submitted_at: now,
                    })
                    .execute(conn)
                    .map_err(AppError::from)?;
            }
            Ok(())
        })?;

        // Essays pend manager review; the provisional verdict stays
        // positive until get_results settles it.
        let passed = has_essay || user_score >= PASS_RATIO * quiz.total_score;
        info!(
            "user {} submitted quiz {} attempt {} (score {:.2})",
            user_id, req.quiz_id, attempt, user_score
        );

        Ok(json!({
            "attempt": attempt,
            "passed": passed,
            "user_score": user_score,
            "total_score": quiz.total_score,
        }))
    }

    /// Results for the latest attempt only.
    pub fn get_results(
        &self,
        target_user: i32,
        quiz_id: i32,
    ) -> Result<serde_json::Value, AppError> {
        let mut conn = self.db.get()?;
        let quiz = live_quiz(&mut conn, quiz_id)?;

        let max_attempt: Option<i32> = quiz_submissions::table
            .filter(quiz_submissions::user_id.eq(target_user))
            .filter(quiz_submissions::quiz_id.eq(quiz_id))
            .filter(quiz_submissions::deleted_at.is_null())
            .select(diesel::dsl::max(quiz_submissions::attempt))
            .first(&mut conn)?;
        let attempt = match max_attempt {
            Some(attempt) => attempt,
            None => {
                return Ok(json!({
                    "passed": false,
                    "results": { "answers": [] },
                }))
            }
        };

        let rows: Vec<(QuizSubmission, QuizQuestion)> = quiz_submissions::table
            .inner_join(
                quiz_questions::table.on(quiz_questions::id.eq(quiz_submissions::question_id)),
            )
            .filter(quiz_submissions::user_id.eq(target_user))
            .filter(quiz_submissions::quiz_id.eq(quiz_id))
            .filter(quiz_submissions::attempt.eq(attempt))
            .filter(quiz_submissions::deleted_at.is_null())
            .order(quiz_submissions::question_id.asc())
            .load(&mut conn)?;

        let questions: Vec<QuizQuestion> = rows.iter().map(|(_, q)| q.clone()).collect();
        let answer_map = live_answers(&mut conn, &questions)?;
        let correct_sets: HashMap<i32, Vec<i32>> = answer_map
            .iter()
            .map(|(question_id, answers)| {
                (
                    *question_id,
                    answers
                        .iter()
                        .filter(|a| a.is_correct)
                        .map(|a| a.id)
                        .collect(),
                )
            })
            .collect();

        Ok(assemble_results(&quiz, &rows, &correct_sets))
    }

    /// Essay submissions still waiting on a manager.
    pub fn pending_review(&self) -> Result<Vec<serde_json::Value>, AppError> {
        let mut conn = self.db.get()?;
        let rows: Vec<(QuizSubmission, QuizQuestion, Quiz, String)> = quiz_submissions::table
            .inner_join(
                quiz_questions::table.on(quiz_questions::id.eq(quiz_submissions::question_id)),
            )
            .inner_join(quizzes::table.on(quizzes::id.eq(quiz_submissions::quiz_id)))
            .inner_join(users::table.on(users::id.eq(quiz_submissions::user_id)))
            .filter(quiz_submissions::reviewed.eq(false))
            .filter(quiz_submissions::deleted_at.is_null())
            .filter(quiz_questions::question_type.eq(QuestionType::Essay.as_str()))
            .filter(quiz_questions::deleted_at.is_null())
            .filter(quizzes::deleted_at.is_null())
            .order(quiz_submissions::submitted_at.asc())
            .select((
                quiz_submissions::all_columns,
                quiz_questions::all_columns,
                quizzes::all_columns,
                users::email,
            ))
            .load(&mut conn)?;

        Ok(rows
            .into_iter()
            .map(|(submission, question, quiz, email)| {
                json!({
                    "submission_id": submission.id,
                    "user_id": submission.user_id,
                    "user_email": email,
                    "quiz_id": quiz.id,
                    "quiz_title": quiz.title,
                    "question_id": question.id,
                    "question_text": question.question_text,
                    "answer_text": submission.answer_text,
                    "attempt": submission.attempt,
                    "submitted_at": submission.submitted_at,
                })
            })
            .collect())
    }

    /// Awards points for an essay answer. The score is bounded by the
    /// question's share of the quiz total.
    pub fn review_essay(&self, req: &ReviewEssayRequest) -> Result<QuizSubmission, AppError> {
        let mut conn = self.db.get()?;
        let submission: QuizSubmission = quiz_submissions::table
            .filter(quiz_submissions::id.eq(req.submission_id))
            .filter(quiz_submissions::deleted_at.is_null())
            .first(&mut conn)
            .optional()?
            .ok_or_else(|| AppError::not_found("quiz submission"))?;

        let question: QuizQuestion = quiz_questions::table
            .find(submission.question_id)
            .first(&mut conn)?;
        if QuestionType::parse(&question.question_type) != Some(QuestionType::Essay) {
            return Err(AppError::InvalidParams(
                "only essay submissions can be reviewed".to_string(),
            ));
        }

        let quiz = live_quiz(&mut conn, submission.quiz_id)?;
        let max_score = question.weight * quiz.total_score;
        if req.score < 0.0 || req.score > max_score {
            return Err(AppError::InvalidParams(format!(
                "score must be between 0 and {max_score}"
            )));
        }

        diesel::update(quiz_submissions::table.find(submission.id))
            .set((
                quiz_submissions::score.eq(req.score),
                quiz_submissions::feedback.eq(&req.feedback),
                quiz_submissions::reviewed.eq(true),
                quiz_submissions::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        info!("reviewed essay submission {}", submission.id);
        quiz_submissions::table
            .find(submission.id)
            .first(&mut conn)
            .map_err(AppError::from)
    }
}

/// Projects one attempt into the result payload. Three shapes emerge:
/// pure multiple-choice reports the score; an unreviewed essay suppresses
/// score fields and reports a provisional pass; fully reviewed essays
/// report the score with the reviewer's feedback attached.
fn assemble_results(
    quiz: &Quiz,
    rows: &[(QuizSubmission, QuizQuestion)],
    correct_sets: &HashMap<i32, Vec<i32>>,
) -> serde_json::Value {
    let mut answers = Vec::new();
    let mut user_score = 0.0;
    let mut has_essay = false;
    let mut pending_essay = false;
    let mut feedback = Vec::new();

    for (submission, question) in rows {
        user_score += submission.score;
        match QuestionType::parse(&question.question_type) {
            Some(QuestionType::Essay) => {
                has_essay = true;
                let mut entry = json!({
                    "question_id": question.id,
                    "question_text": question.question_text,
                    "answer_text": submission.answer_text,
                });
                if submission.reviewed {
                    entry["score"] = json!(submission.score);
                    entry["feedback"] = json!(submission.feedback);
                    feedback.push(submission.feedback.clone());
                } else {
                    pending_essay = true;
                }
                answers.push(entry);
            }
            _ => {
                let correct_ids = correct_sets
                    .get(&question.id)
                    .cloned()
                    .unwrap_or_default();
                answers.push(json!({
                    "question_id": question.id,
                    "question_text": question.question_text,
                    "explanation": question.explanation,
                    "selected_answer_ids": submission.selected_answer_ids,
                    "correct_answer_ids": correct_ids,
                    "correct": submission.score > 0.0,
                    "score": submission.score,
                }));
            }
        }
    }

    if pending_essay {
        // Verdict stays provisional until every essay is reviewed.
        return json!({
            "passed": true,
            "results": { "answers": answers },
        });
    }

    let passed = user_score >= PASS_RATIO * quiz.total_score;
    let mut results = json!({
        "answers": answers,
        "user_score": user_score,
        "total_score": quiz.total_score,
    });
    if has_essay {
        results["feedback"] = json!(feedback.join("; "));
    }

    json!({
        "passed": passed,
        "results": results,
    })
}

/// Answer options for a detail view. A redacted projection clears every
/// `is_correct` flag so the answer key never reaches a trainee.
fn project_answers(answers: &[QuizAnswer], redact: bool) -> Vec<serde_json::Value> {
    answers
        .iter()
        .map(|a| {
            json!({
                "id": a.id,
                "question_id": a.question_id,
                "answer_text": a.answer_text,
                "is_correct": if redact { false } else { a.is_correct },
            })
        })
        .collect()
}

fn live_quiz(conn: &mut PgConnection, quiz_id: i32) -> Result<Quiz, AppError> {
    quizzes::table
        .filter(quizzes::id.eq(quiz_id))
        .filter(quizzes::deleted_at.is_null())
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::not_found("quiz"))
}

fn live_questions(conn: &mut PgConnection, quiz_id: i32) -> Result<Vec<QuizQuestion>, AppError> {
    quiz_questions::table
        .filter(quiz_questions::quiz_id.eq(quiz_id))
        .filter(quiz_questions::deleted_at.is_null())
        .order(quiz_questions::id.asc())
        .load(conn)
        .map_err(AppError::from)
}

fn live_answers(
    conn: &mut PgConnection,
    questions: &[QuizQuestion],
) -> Result<HashMap<i32, Vec<QuizAnswer>>, AppError> {
    let question_ids: Vec<i32> = questions.iter().map(|q| q.id).collect();
    let answers: Vec<QuizAnswer> = quiz_answers::table
        .filter(quiz_answers::question_id.eq_any(&question_ids))
        .filter(quiz_answers::deleted_at.is_null())
        .order(quiz_answers::id.asc())
        .load(conn)?;

    let mut map: HashMap<i32, Vec<QuizAnswer>> = HashMap::new();
    for answer in answers {
        map.entry(answer.question_id).or_default().push(answer);
    }
    Ok(map)
}

// ----- Handlers -----

pub async fn list_quizzes(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuizzesQuery>,
) -> ApiResult {
    let engine = QuizEngine::new(state.conn.clone());
    let (quizzes, total) = engine.list(&query.keyword, query.page, query.per_page)?;
    Ok(ok(json!({ "quizzes": quizzes, "total": total })))
}

pub async fn create_quiz(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateQuizRequest>,
) -> ApiResult {
    let engine = QuizEngine::new(state.conn.clone());
    Ok(ok(engine.create(&req)?))
}

pub async fn update_quiz(
    State(state): State<Arc<AppState>>,
    Path(quiz_id): Path<i32>,
    Json(req): Json<UpdateQuizRequest>,
) -> ApiResult {
    let engine = QuizEngine::new(state.conn.clone());
    Ok(ok(engine.update(quiz_id, &req)?))
}

pub async fn delete_quiz(
    State(state): State<Arc<AppState>>,
    Path(quiz_id): Path<i32>,
) -> ApiResult {
    let engine = QuizEngine::new(state.conn.clone());
    engine.delete(quiz_id)?;
    Ok(ok(serde_json::Value::Null))
}

pub async fn quiz_details(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(quiz_id): Path<i32>,
) -> ApiResult {
    let engine = QuizEngine::new(state.conn.clone());
    let redact = !current.role.is_any_manager();
    Ok(ok(engine.get_detail(quiz_id, redact)?))
}

pub async fn save_question(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SaveQuestionRequest>,
) -> ApiResult {
    let engine = QuizEngine::new(state.conn.clone());
    let question_id = engine.save_question(&req)?;
    Ok(ok(json!({ "question_id": question_id })))
}

pub async fn submit_full(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Json(req): Json<SubmitFullRequest>,
) -> ApiResult {
    let engine = QuizEngine::new(state.conn.clone());
    Ok(ok(engine.submit_full(current.id(), &req)?))
}

pub async fn own_quiz_result(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(quiz_id): Path<i32>,
) -> ApiResult {
    let engine = QuizEngine::new(state.conn.clone());
    Ok(ok(engine.get_results(current.id(), quiz_id)?))
}

pub async fn trainee_quiz_result(
    State(state): State<Arc<AppState>>,
    Path((quiz_id, user_id)): Path<(i32, i32)>,
) -> ApiResult {
    let engine = QuizEngine::new(state.conn.clone());
    Ok(ok(engine.get_results(user_id, quiz_id)?))
}

pub async fn pending_review(State(state): State<Arc<AppState>>) -> ApiResult {
    let engine = QuizEngine::new(state.conn.clone());
    Ok(ok(engine.pending_review()?))
}

pub async fn review_essay(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReviewEssayRequest>,
) -> ApiResult {
    let engine = QuizEngine::new(state.conn.clone());
    Ok(ok(engine.review_essay(&req)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn quiz(total_score: f64) -> Quiz {
        Quiz {
            id: 1,
            title: "safety basics".to_string(),
            difficulty: 1,
            total_score,
            time_limit: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    fn question(id: i32, question_type: QuestionType, weight: f64) -> QuizQuestion {
        QuizQuestion {
            id,
            quiz_id: 1,
            question_type: question_type.as_str().to_string(),
            question_text: format!("question {id}"),
            explanation: String::new(),
            weight,
            is_multiple_correct: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    fn submission(
        question_id: i32,
        score: f64,
        reviewed: bool,
        feedback: &str,
    ) -> QuizSubmission {
        QuizSubmission {
            id: question_id,
            user_id: 10,
            quiz_id: 1,
            question_id,
            selected_answer_ids: vec![],
            answer_text: "my answer".to_string(),
            score,
            attempt: 1,
            reviewed,
            feedback: feedback.to_string(),
            submitted_at: Utc::now(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn test_selection_set_equality() {
        assert!(selection_is_correct(&[7, 9], &[9, 7]));
        assert!(!selection_is_correct(&[7], &[7, 9]));
        assert!(!selection_is_correct(&[7, 9, 11], &[7, 9]));
        assert!(!selection_is_correct(&[7, 8], &[7, 9]));
        assert!(selection_is_correct(&[], &[]));
    }

    #[test]
    fn test_duplicate_selections_do_not_pad_the_set() {
        assert!(!selection_is_correct(&[7, 7], &[7, 9]));
        assert!(!selection_is_correct(&[9, 9, 9], &[7, 9]));
        // A repeated correct pick still collapses to the correct set.
        assert!(selection_is_correct(&[7, 7, 9], &[7, 9]));
    }

    fn answer(id: i32, is_correct: bool) -> QuizAnswer {
        QuizAnswer {
            id,
            question_id: 1,
            answer_text: format!("option {id}"),
            is_correct,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn test_answer_key_redaction() {
        let answers = vec![answer(1, true), answer(2, false), answer(3, true)];

        let trainee_view = project_answers(&answers, true);
        assert!(trainee_view.iter().all(|a| a["is_correct"] == json!(false)));

        let manager_view = project_answers(&answers, false);
        assert_eq!(manager_view[0]["is_correct"], json!(true));
        assert_eq!(manager_view[1]["is_correct"], json!(false));
        assert_eq!(manager_view[2]["is_correct"], json!(true));
    }

    #[test]
    fn test_multiple_choice_score() {
        // weight 0.5 on a 100-point quiz: exact match earns 50, which is
        // below the 70-point pass line.
        let quiz = quiz(100.0);
        let score = 0.5 * quiz.total_score;
        assert_eq!(score, 50.0);
        assert!(score < PASS_RATIO * quiz.total_score);
    }

    #[test]
    fn test_results_pure_multiple_choice() {
        let quiz = quiz(100.0);
        let rows = vec![
            (submission(1, 50.0, true, ""), question(1, QuestionType::MultipleChoice, 0.5)),
            (submission(2, 50.0, true, ""), question(2, QuestionType::MultipleChoice, 0.5)),
        ];
        let mut correct_sets = HashMap::new();
        correct_sets.insert(1, vec![7, 9]);
        correct_sets.insert(2, vec![3]);

        let payload = assemble_results(&quiz, &rows, &correct_sets);
        assert_eq!(payload["passed"], json!(true));
        assert_eq!(payload["results"]["user_score"], json!(100.0));
        assert_eq!(payload["results"]["total_score"], json!(100.0));
    }

    #[test]
    fn test_results_pending_essay_suppresses_scores() {
        let quiz = quiz(10.0);
        let rows = vec![(
            submission(1, 0.0, false, ""),
            question(1, QuestionType::Essay, 1.0),
        )];

        let payload = assemble_results(&quiz, &rows, &HashMap::new());
        assert_eq!(payload["passed"], json!(true));
        assert!(payload["results"].get("user_score").is_none());
        assert_eq!(
            payload["results"]["answers"][0]["answer_text"],
            json!("my answer")
        );
    }

    #[test]
    fn test_results_reviewed_essay_reports_score_and_feedback() {
        let quiz = quiz(10.0);
        let rows = vec![(
            submission(1, 8.0, true, "ok"),
            question(1, QuestionType::Essay, 1.0),
        )];

        let payload = assemble_results(&quiz, &rows, &HashMap::new());
        assert_eq!(payload["passed"], json!(true));
        assert_eq!(payload["results"]["user_score"], json!(8.0));
        assert_eq!(payload["results"]["feedback"], json!("ok"));
    }

    #[test]
    fn test_results_failing_score() {
        let quiz = quiz(100.0);
        let rows = vec![(
            submission(1, 50.0, true, ""),
            question(1, QuestionType::MultipleChoice, 0.5),
        )];

        let payload = assemble_results(&quiz, &rows, &HashMap::new());
        assert_eq!(payload["passed"], json!(false));
    }
}
