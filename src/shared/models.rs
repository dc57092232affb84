use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use super::schema::*;

/// Closed role set. Stored as an integer column; anything outside the
/// mapping is rejected at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    Trainee,
    GeneralManager,
}

impl Role {
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(Self::Admin),
            2 => Some(Self::Manager),
            3 => Some(Self::Trainee),
            4 => Some(Self::GeneralManager),
            _ => None,
        }
    }

    pub fn as_i32(self) -> i32 {
        match self {
            Self::Admin => 1,
            Self::Manager => 2,
            Self::Trainee => 3,
            Self::GeneralManager => 4,
        }
    }

    pub fn is_admin(self) -> bool {
        self == Self::Admin
    }

    /// Manager or general manager.
    pub fn is_any_manager(self) -> bool {
        matches!(self, Self::Manager | Self::GeneralManager)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Manager => write!(f, "manager"),
            Self::Trainee => write!(f, "trainee"),
            Self::GeneralManager => write!(f, "general_manager"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Video,
    File,
    Slide,
    Quiz,
}

impl ItemType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "video" => Some(Self::Video),
            "file" => Some(Self::File),
            "slide" => Some(Self::Slide),
            "quiz" => Some(Self::Quiz),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::File => "file",
            Self::Slide => "slide",
            Self::Quiz => "quiz",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    Essay,
}

impl QuestionType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "multiple_choice" => Some(Self::MultipleChoice),
            "essay" => Some(Self::Essay),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::MultipleChoice => "multiple_choice",
            Self::Essay => "essay",
        }
    }
}

// ----- Entities -----

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i32,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role_id: i32,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub role_id: i32,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = user_profiles)]
pub struct UserProfile {
    pub id: i32,
    pub user_id: i32,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub avatar: String,
    pub birthday: String,
    pub department: String,
    pub gender: String,
    pub company_joined_date: String,
    pub introduction: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = user_profiles)]
pub struct NewUserProfile<'a> {
    pub user_id: i32,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub phone: &'a str,
    pub avatar: &'a str,
    pub birthday: &'a str,
    pub department: &'a str,
    pub gender: &'a str,
    pub company_joined_date: &'a str,
    pub introduction: &'a str,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = courses)]
pub struct Course {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub category: String,
    pub thumbnail: String,
    pub duration: i32,
    pub created_by: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = courses)]
pub struct NewCourse<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub category: &'a str,
    pub thumbnail: &'a str,
    pub created_by: i32,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = modules)]
pub struct Module {
    pub id: i32,
    pub course_id: i32,
    pub title: String,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = modules)]
pub struct NewModule<'a> {
    pub course_id: i32,
    pub title: &'a str,
    pub position: i32,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = module_items)]
pub struct ModuleItem {
    pub id: i32,
    pub module_id: i32,
    pub title: String,
    pub item_type: String,
    pub resource: String,
    pub position: i32,
    pub required_time: i32,
    pub quiz_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = module_items)]
pub struct NewModuleItem<'a> {
    pub module_id: i32,
    pub title: &'a str,
    pub item_type: &'a str,
    pub resource: &'a str,
    pub position: i32,
    pub required_time: i32,
    pub quiz_id: i32,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = quizzes)]
pub struct Quiz {
    pub id: i32,
    pub title: String,
    pub difficulty: i32,
    pub total_score: f64,
    pub time_limit: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = quizzes)]
pub struct NewQuiz<'a> {
    pub title: &'a str,
    pub difficulty: i32,
    pub total_score: f64,
    pub time_limit: i32,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = quiz_questions)]
pub struct QuizQuestion {
    pub id: i32,
    pub quiz_id: i32,
    pub question_type: String,
    pub question_text: String,
    pub explanation: String,
    pub weight: f64,
    pub is_multiple_correct: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = quiz_questions)]
pub struct NewQuizQuestion<'a> {
    pub quiz_id: i32,
    pub question_type: &'a str,
    pub question_text: &'a str,
    pub explanation: &'a str,
    pub weight: f64,
    pub is_multiple_correct: bool,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = quiz_answers)]
pub struct QuizAnswer {
    pub id: i32,
    pub question_id: i32,
    pub answer_text: String,
    pub is_correct: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = quiz_answers)]
pub struct NewQuizAnswer<'a> {
    pub question_id: i32,
    pub answer_text: &'a str,
    pub is_correct: bool,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = quiz_submissions)]
pub struct QuizSubmission {
    pub id: i32,
    pub user_id: i32,
    pub quiz_id: i32,
    pub question_id: i32,
    pub selected_answer_ids: Vec<i32>,
    pub answer_text: String,
    pub score: f64,
    pub attempt: i32,
    pub reviewed: bool,
    pub feedback: String,
    pub submitted_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = quiz_submissions)]
pub struct NewQuizSubmission<'a> {
    pub user_id: i32,
    pub quiz_id: i32,
    pub question_id: i32,
    pub selected_answer_ids: Vec<i32>,
    pub answer_text: &'a str,
    pub score: f64,
    pub attempt: i32,
    pub reviewed: bool,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = user_progresses)]
pub struct UserProgress {
    pub id: i32,
    pub user_id: i32,
    pub course_id: i32,
    pub course_position: i32,
    pub module_position: i32,
    pub module_item_position: i32,
    pub completed: bool,
    pub performance: Option<i32>,
    pub review_comment: Option<String>,
    pub reviewed_by: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = user_progresses)]
pub struct NewUserProgress {
    pub user_id: i32,
    pub course_id: i32,
    pub course_position: i32,
    pub module_position: i32,
    pub module_item_position: i32,
    pub completed: bool,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = template_paths)]
pub struct TemplatePath {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub course_ids: Vec<i32>,
    pub duration: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = template_paths)]
pub struct NewTemplatePath<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub course_ids: Vec<i32>,
    pub duration: i32,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = skill_keywords)]
pub struct SkillKeyword {
    pub id: i32,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = skill_keywords)]
pub struct NewSkillKeyword<'a> {
    pub name: &'a str,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = course_skill_keywords)]
pub struct CourseSkillKeyword {
    pub id: i32,
    pub course_id: i32,
    pub skill_keyword_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = course_skill_keywords)]
pub struct NewCourseSkillKeyword {
    pub course_id: i32,
    pub skill_keyword_id: i32,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = user_courses)]
pub struct UserCourse {
    pub id: i32,
    pub user_id: i32,
    pub course_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = user_courses)]
pub struct NewUserCourse {
    pub user_id: i32,
    pub course_id: i32,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = app_feedbacks)]
pub struct AppFeedback {
    pub id: i32,
    pub user_id: i32,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = app_feedbacks)]
pub struct NewAppFeedback<'a> {
    pub user_id: i32,
    pub rating: i32,
    pub comment: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [Role::Admin, Role::Manager, Role::Trainee, Role::GeneralManager] {
            assert_eq!(Role::from_i32(role.as_i32()), Some(role));
        }
        assert_eq!(Role::from_i32(0), None);
        assert_eq!(Role::from_i32(99), None);
    }

    #[test]
    fn test_role_predicates() {
        assert!(Role::Manager.is_any_manager());
        assert!(Role::GeneralManager.is_any_manager());
        assert!(!Role::Admin.is_any_manager());
        assert!(!Role::Trainee.is_any_manager());
        assert!(Role::Admin.is_admin());
    }

    #[test]
    fn test_item_type_parsing() {
        assert_eq!(ItemType::parse("video"), Some(ItemType::Video));
        assert_eq!(ItemType::parse("slide"), Some(ItemType::Slide));
        assert_eq!(ItemType::parse("unknown"), None);
        assert_eq!(ItemType::Quiz.as_str(), "quiz");
    }

    #[test]
    fn test_question_type_parsing() {
        assert_eq!(
            QuestionType::parse("multiple_choice"),
            Some(QuestionType::MultipleChoice)
        );
        assert_eq!(QuestionType::parse("essay"), Some(QuestionType::Essay));
        assert_eq!(QuestionType::parse(""), None);
    }
}
