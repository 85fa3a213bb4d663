/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use kakari_api::{app::AppState, config::Config};
/// use kakari_shared::services::{mail::LogMailer, Directories};
/// use kakari_shared::storage::memory::MemoryStorage;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let directories = Directories::new(
///     Arc::new(MemoryStorage::new()),
///     Arc::new(LogMailer),
///     config.user_settings(),
/// );
/// let state = AppState::new(directories, config);
/// let app = kakari_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer};
use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use kakari_shared::{
    auth::{
        jwt::TokenKeys,
        middleware::{jwt_auth_middleware, AuthState},
    },
    services::Directories,
};
use std::{sync::Arc, time::Duration};
use tower_http::{
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// User, task and project directories over one store
    pub directories: Directories,

    /// Token signing keys
    pub keys: Arc<TokenKeys>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(directories: Directories, config: Config) -> Self {
        Self {
            directories,
            keys: Arc::new(config.token_keys()),
            config: Arc::new(config),
        }
    }

    /// State for the JWT middleware
    pub fn auth_state(&self) -> AuthState {
        AuthState::new(self.keys.clone(), self.directories.storage.clone())
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                                   # Health check (public)
/// └── /api/v1/
///     ├── /auth/            login, refresh      # public
///     ├── /user/            create, forgot-password, reset-password (public)
///     │                     me, update, update-roles, change-password
///     ├── /task/            CRUD, comments, creator/assignee/overdue/due queries
///     └── /project/         CRUD, members, task linkage
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Security headers
/// 2. CORS (tower-http CorsLayer)
/// 3. Request timeout (tower-http TimeoutLayer)
/// 4. Logging (tower-http TraceLayer)
/// 5. Authentication (protected routes only)
pub fn build_router(state: AppState) -> Router {
    use crate::routes::{auth, health, projects, tasks, users};

    let health_routes = Router::new().route("/health", get(health::health_check));

    // Public, no auth required
    let public_routes = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/user/create", post(users::create_user))
        .route("/user/forgot-password/:email", post(users::forgot_password))
        .route("/user/reset-password/:token", post(users::reset_password));

    // Require a valid access token
    let protected_routes = Router::new()
        .route("/user/me", get(users::me))
        .route("/user/:user_id", put(users::update_user))
        .route("/user/update-roles/:user_id", put(users::update_roles))
        .route("/user/change-password", post(users::change_password))
        .route("/task/create", post(tasks::create_task))
        .route(
            "/task/tasks/:task_id",
            get(tasks::get_task)
                .put(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .route(
            "/task/tasks/:task_id/comments",
            get(tasks::list_comments).post(tasks::add_comment),
        )
        .route("/task/created/:user_id", get(tasks::list_created))
        .route("/task/assigned/:user_id", get(tasks::list_assigned))
        .route("/task/overdue", get(tasks::list_overdue))
        .route("/task/overdue/:assignee_id", get(tasks::list_overdue_for_assignee))
        .route("/task/due/:date", get(tasks::list_due))
        .route("/task/due/:date/:assignee_id", get(tasks::list_due_for_assignee))
        .route(
            "/project",
            get(projects::list_projects).post(projects::create_project),
        )
        .route(
            "/project/",
            get(projects::list_projects).post(projects::create_project),
        )
        .route(
            "/project/:project_id",
            get(projects::get_project)
                .put(projects::update_project)
                .delete(projects::delete_project),
        )
        .route("/project/tasks/:project_id", get(projects::list_tasks))
        .route("/project/members/:project_id", get(projects::list_members))
        .route(
            "/project/:project_id/members/:user_id",
            post(projects::add_member).delete(projects::remove_member),
        )
        .route(
            "/project/:project_id/tasks/:task_id",
            post(projects::attach_task).delete(projects::detach_task),
        )
        .route_layer(from_fn_with_state(state.auth_state(), jwt_auth_middleware));

    let v1_routes = Router::new().merge(public_routes).merge(protected_routes);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.iter().any(|origin| origin == "*") {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(Duration::from_secs(3600))
    };

    let timeout = Duration::from_secs(state.config.api.request_timeout_secs);
    let production = state.config.api.production;

    Router::new()
        .merge(health_routes)
        .nest("/api/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(TimeoutLayer::new(timeout))
        .layer(cors)
        .layer(SecurityHeadersLayer::new(production))
        .with_state(state)
}
