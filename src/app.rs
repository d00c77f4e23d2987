use crate::handlers;
use crate::state::AppState;
use crate::ui;
use axum::{
    routing::{get, patch, post},
    Router,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(ui::index))
        .route("/api/users", post(handlers::create_user))
        .route("/api/users/guest", post(handlers::create_guest))
        .route("/api/users/external", post(handlers::sync_external_user))
        .route(
            "/api/users/:id",
            get(handlers::get_user)
                .patch(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route("/api/mood-entries", post(handlers::create_mood_entry))
        .route("/api/mood-entries/:id", get(handlers::list_mood_entries))
        .route(
            "/api/mood-entries/:id/weekly",
            get(handlers::weekly_mood_entries),
        )
        .route("/api/interventions", post(handlers::create_intervention))
        .route(
            "/api/interventions/generate",
            post(handlers::generate_intervention),
        )
        .route("/api/interventions/:id", get(handlers::list_interventions))
        .route(
            "/api/interventions/:id/complete",
            patch(handlers::complete_intervention),
        )
        .route("/api/cbt-prompt", post(handlers::generate_cbt_prompt))
        .route("/api/progress/:id", get(handlers::get_progress))
        .route("/api/progress/:id/streak", post(handlers::increment_streak))
        .route(
            "/api/community/posts",
            post(handlers::create_post).get(handlers::list_posts),
        )
        .route("/api/community/posts/:id/like", post(handlers::like_post))
        .route(
            "/api/community/posts/:id/comments",
            post(handlers::create_comment).get(handlers::list_comments),
        )
        .route("/api/crisis-resources", get(handlers::crisis_resources))
        .with_state(state)
}
