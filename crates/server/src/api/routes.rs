use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{commands, handlers, view};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Published view state
        .route("/view", get(view::get_snapshot))
        .route("/dashboard", get(view::get_dashboard))
        .route("/list", get(view::get_list))
        .route("/files", get(view::get_files))
        // Navigation
        .route("/list", post(commands::show_list))
        .route("/list/page", post(commands::goto_page))
        .route("/list/sort", post(commands::sort_list))
        .route("/list/sort", delete(commands::clear_sort))
        .route("/home", post(commands::show_home))
        .route("/inspect", post(commands::inspect))
        // File toggles
        .route("/files/priority", post(commands::set_priority))
        .route("/files/wanted", post(commands::set_wanted))
        // Polling
        .route("/refresh", post(commands::refresh))
        .route("/auto-reload", post(commands::set_auto_reload))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
}
