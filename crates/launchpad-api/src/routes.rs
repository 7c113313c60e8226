use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;
use crate::{admin, applications, auth, posts, programs, role_switch, startups};

pub fn router(state: AppState) -> Router {
    Router::new()
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/auth/request-reset", post(auth::request_reset))
        .route("/auth/reset-password", post(auth::reset_password))
        .route("/user/role-switch", post(role_switch::switch_role))
        // Programs
        .route("/programs", get(programs::list_programs).post(programs::create_program))
        .route("/programs/{id}", get(programs::get_program))
        // Startups
        .route("/startups", post(startups::create_startup))
        .route("/startups/mine", get(startups::my_startup))
        .route(
            "/startups/{id}",
            get(startups::get_startup)
                .put(startups::update_startup)
                .delete(startups::delete_startup),
        )
        .route("/startups/{id}/applications", get(startups::startup_applications))
        // Applications
        .route(
            "/applications",
            get(applications::list_applications).post(applications::submit_application),
        )
        .route(
            "/applications/{id}",
            get(applications::get_application).put(applications::update_status),
        )
        .route("/applications/{id}/reviews", post(applications::create_review))
        // Forum
        .route("/forum/posts", post(posts::create_post))
        .route(
            "/forum/posts/{id}",
            get(posts::get_post).put(posts::update_post).delete(posts::delete_post),
        )
        .route(
            "/forum/posts/{id}/comments",
            get(posts::list_comments).post(posts::create_comment),
        )
        // Admin
        .route("/admin/stats", get(admin::stats))
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/{id}", get(admin::get_user).put(admin::update_user))
        .with_state(state)
}
