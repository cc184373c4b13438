pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post, put},
    Router,
};

use crate::announcements::handlers as announcements;
use crate::auth::handlers as auth;
use crate::contracts::handlers as contracts;
use crate::state::AppState;
use crate::tasks::handlers as tasks;
use crate::uploads::MAX_UPLOAD_BYTES;
use crate::users::handlers as users;
use crate::work_logs::handlers as work_logs;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Auth
        .route("/api/v1/setup", post(auth::handle_setup))
        .route("/api/v1/auth/login", post(auth::handle_login))
        .route("/api/v1/auth/logout", post(auth::handle_logout))
        .route("/api/v1/auth/session", get(auth::handle_current_session))
        // Users
        .route(
            "/api/v1/users/me",
            get(users::handle_get_me).patch(users::handle_update_me),
        )
        .route(
            "/api/v1/users/me/password",
            put(users::handle_change_password),
        )
        .route("/api/v1/users/me/avatar", post(users::handle_upload_avatar))
        .route(
            "/api/v1/users",
            get(users::handle_list_users).post(users::handle_create_user),
        )
        .route("/api/v1/users/:id", put(users::handle_update_user))
        // Work logs
        .route(
            "/api/v1/work-logs",
            get(work_logs::handle_list_work_logs).post(work_logs::handle_create_work_log),
        )
        .route("/api/v1/work-logs/today", get(work_logs::handle_today))
        .route(
            "/api/v1/work-logs/export",
            get(work_logs::handle_export_work_logs),
        )
        .route(
            "/api/v1/work-logs/:id",
            patch(work_logs::handle_update_work_log).delete(work_logs::handle_delete_work_log),
        )
        .route(
            "/api/v1/work-logs/:id/review",
            patch(work_logs::handle_review_work_log),
        )
        // Tasks
        .route(
            "/api/v1/tasks",
            get(tasks::handle_list_tasks).post(tasks::handle_create_task),
        )
        .route(
            "/api/v1/tasks/:id",
            patch(tasks::handle_update_task).delete(tasks::handle_delete_task),
        )
        .route(
            "/api/v1/tasks/:id/responses",
            post(tasks::handle_add_response),
        )
        .route("/api/v1/tasks/:id/status", put(tasks::handle_set_status))
        .route(
            "/api/v1/tasks/:id/attachment",
            post(tasks::handle_attach_file),
        )
        // Contract
        .route(
            "/api/v1/contract",
            get(contracts::handle_get_contract).put(contracts::handle_save_contract),
        )
        .route("/api/v1/contract/sign", post(contracts::handle_sign_contract))
        .route(
            "/api/v1/contract/sign/pdf",
            post(contracts::handle_upload_signed_pdf),
        )
        .route(
            "/api/v1/contract/signatures",
            get(contracts::handle_list_signatures),
        )
        // Announcements
        .route(
            "/api/v1/announcements",
            get(announcements::handle_list_announcements)
                .post(announcements::handle_create_announcement),
        )
        .route(
            "/api/v1/announcements/:id",
            delete(announcements::handle_delete_announcement),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}
