//! Route table for the whole API, grouped by access level: public,
//! authenticated, manager-only, and admin-only. Role guards are applied
//! per group; token verification wraps everything past the public tier.

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

use crate::auth::middleware::{authenticate, require_admin, require_any_manager};
use crate::shared::state::AppState;

pub fn configure_api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let authenticated = Router::new()
        .merge(crate::auth::configure_user_routes())
        .route("/lecture/:course_id", get(crate::lecture::get_lecture))
        .route("/course/list", get(crate::catalog::courses::list_courses))
        .route("/course/:id", get(crate::catalog::courses::get_course))
        .route(
            "/skill-keyword/list",
            get(crate::catalog::keywords::list_skill_keywords),
        )
        .route("/user-progress/list", get(crate::progress::list_progress))
        .route(
            "/user-progress/advance",
            post(crate::progress::advance_progress),
        )
        .route(
            "/user-progress/:course_id",
            get(crate::progress::get_progress),
        )
        .route("/quiz/details/:id", get(crate::quiz::quiz_details))
        .route("/quiz/submit-full", post(crate::quiz::submit_full))
        .route("/quiz/result/:id", get(crate::quiz::own_quiz_result))
        .route(
            "/app-feedback/create",
            post(crate::feedback::create_feedback),
        );

    let manager = Router::new()
        .route("/course/create", post(crate::catalog::courses::create_course))
        .route(
            "/course/update/:id",
            put(crate::catalog::courses::update_course),
        )
        .route(
            "/course/delete/:id",
            delete(crate::catalog::courses::delete_course),
        )
        .route(
            "/module/list/:course_id",
            get(crate::catalog::modules::list_modules),
        )
        .route("/module/create", post(crate::catalog::modules::create_module))
        .route(
            "/module/update/:id",
            put(crate::catalog::modules::update_module),
        )
        .route(
            "/module/delete/:id",
            delete(crate::catalog::modules::delete_module),
        )
        .route(
            "/module-item/list/:module_id",
            get(crate::catalog::items::list_module_items),
        )
        .route(
            "/module-item/create",
            post(crate::catalog::items::create_module_item),
        )
        .route(
            "/module-item/update/:id",
            put(crate::catalog::items::update_module_item),
        )
        .route(
            "/module-item/delete/:id",
            delete(crate::catalog::items::delete_module_item),
        )
        .route(
            "/skill-keyword/create",
            post(crate::catalog::keywords::create_skill_keyword),
        )
        .route(
            "/skill-keyword/delete/:id",
            delete(crate::catalog::keywords::delete_skill_keyword),
        )
        .route("/quiz/list", get(crate::quiz::list_quizzes))
        .route("/quiz/create", post(crate::quiz::create_quiz))
        .route("/quiz/update/:id", put(crate::quiz::update_quiz))
        .route("/quiz/delete/:id", delete(crate::quiz::delete_quiz))
        .route("/quiz/question/create", post(crate::quiz::save_question))
        .route(
            "/quiz/result/:id/user/:user_id",
            get(crate::quiz::trainee_quiz_result),
        )
        .route("/quiz/pending-review", get(crate::quiz::pending_review))
        .route("/quiz/review-essay", post(crate::quiz::review_essay))
        .route(
            "/user-progress/assign",
            post(crate::progress::assign_course),
        )
        .route(
            "/user-progress/review",
            post(crate::progress::review_progress),
        )
        .route(
            "/user-progress/user/:user_id/list",
            get(crate::progress::list_trainee_progress),
        )
        .route(
            "/user-progress/user/:user_id/course/:course_id",
            get(crate::progress::get_trainee_progress),
        )
        .route(
            "/template-path/list",
            get(crate::paths::list_template_paths),
        )
        .route("/template-path/:id", get(crate::paths::get_template_path))
        .route(
            "/template-path/create",
            post(crate::paths::create_template_path),
        )
        .route(
            "/template-path/update/:id",
            put(crate::paths::update_template_path),
        )
        .route(
            "/template-path/delete/:id",
            delete(crate::paths::delete_template_path),
        )
        .route_layer(middleware::from_fn(require_any_manager));

    let admin = Router::new()
        .route("/app-feedback/list", get(crate::feedback::list_feedback))
        .route(
            "/app-feedback/delete/:id",
            delete(crate::feedback::delete_feedback),
        )
        .route_layer(middleware::from_fn(require_admin));

    let protected = authenticated
        .merge(manager)
        .merge(admin)
        .layer(middleware::from_fn_with_state(state, authenticate));

    crate::auth::configure_public_routes().merge(protected)
}
