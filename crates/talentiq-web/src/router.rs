//! Axum router — maps all URL paths to handlers.

use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{analytics, data, jd, screening, system, vectors};
use crate::state::{AppState, SharedState};

/// Build and return the full Axum router.
pub fn build_router(state: AppState) -> Router {
    let shared: SharedState = Arc::new(state);

    Router::new()
        // Data
        .route("/api/v1/data/upload/{project_id}", post(data::upload))
        .route(
            "/api/v1/data/project/{project_id}",
            delete(data::delete_project),
        )
        .route(
            "/api/v1/llm/process-resumes/{project_id}",
            post(data::process_resumes),
        )
        // Screening
        .route(
            "/api/v1/llm/job-description/{project_id}",
            post(jd::save_job_description),
        )
        .route("/api/v1/llm/screen/{project_id}", post(screening::screen))
        // Vectors
        .route(
            "/api/v1/vectors/candidate/search/{project_id}",
            post(vectors::search),
        )
        .route(
            "/api/v1/vectors/candidate/info/{project_id}",
            get(vectors::info),
        )
        // Analytics
        .route("/api/v1/analytics/summary/{project_id}", get(analytics::summary))
        .route("/api/v1/analytics/files/{project_id}", get(analytics::files))
        .route("/api/v1/analytics/logs/{project_id}", get(analytics::logs))
        // System
        .route("/health", get(system::health))
        // Middleware
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}
