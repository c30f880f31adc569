pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod state;
pub mod validation;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::database::models::PermissionLevel;
use crate::handlers::{protected, public};
use crate::middleware::{client_key_middleware, jwt_auth_middleware};
use crate::state::AppState;

/// Assemble every route and the global middleware stack
pub fn build_app(state: AppState) -> Router {
    let config = state.config.clone();

    Router::new()
        // Public
        .route("/health", get(public::health_get))
        .route("/publickey", get(public::publickey_get))
        .merge(oauth_routes())
        // Credential endpoints: client key, no session
        .merge(credential_routes(&state))
        // Session-protected API
        .merge(protected_routes(&state))
        // Global middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&config.security.cors_origins))
                .layer(TimeoutLayer::new(config.request_timeout()))
                .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes)),
        )
        .with_state(state)
}

fn oauth_routes() -> Router<AppState> {
    use handlers::public::auth;

    Router::new()
        .route("/auth/oauth", get(auth::oauth_get))
        .route("/auth/oauthsuccess", get(auth::oauth_success_get))
}

fn credential_routes(state: &AppState) -> Router<AppState> {
    use handlers::public::auth;

    Router::new()
        .route("/auth/login", post(auth::login_post))
        .route("/auth/register", post(auth::register_post).put(auth::register_post))
        .route_layer(from_fn_with_state(state.clone(), client_key_middleware))
}

fn protected_routes(state: &AppState) -> Router<AppState> {
    use protected::{accounts, admin, cafeteria_menus, checklist, events, map, timetable};

    Router::new()
        // Accounts by level
        .nest("/students", accounts::level_routes(PermissionLevel::Student))
        .nest("/teachers", accounts::level_routes(PermissionLevel::Teacher))
        .nest("/admins", accounts::level_routes(PermissionLevel::Admin))
        .route("/admins/accounts", get(admin::accounts_list))
        .route("/admins/accounts/:id", delete(admin::account_delete))
        // Timetable
        .route(
            "/timetable",
            get(timetable::timetable_get)
                .put(timetable::timetable_put)
                .post(timetable::timetable_post),
        )
        .route("/timetable/lock", get(timetable::timetable_lock))
        .route("/timetable/unlock", get(timetable::timetable_unlock))
        .route("/timetable/student/:user_id", get(timetable::student_timetable_get))
        .route(
            "/timetable/:id",
            put(timetable::timetable_entry_put).delete(timetable::timetable_entry_delete),
        )
        // Cafeteria menus
        .route(
            "/cafeteria_menus",
            get(cafeteria_menus::menus_get).post(cafeteria_menus::menus_post),
        )
        .route(
            "/cafeteria_menus/:id",
            put(cafeteria_menus::menu_put).delete(cafeteria_menus::menu_delete),
        )
        // Checklist
        .route(
            "/checklist",
            get(checklist::checklist_get).post(checklist::checklist_post),
        )
        .route("/checklist/lock", get(checklist::checklist_lock))
        .route("/checklist/unlock", get(checklist::checklist_unlock))
        .route("/checklist/student/:user_id", get(checklist::student_checklist_get))
        .route(
            "/checklist/:id",
            put(checklist::checklist_put).delete(checklist::checklist_delete),
        )
        // Events
        .route("/events", post(events::events_post))
        .route("/events/:month", get(events::events_get))
        // Map
        .route("/map", get(map::map_get).put(map::map_put))
        // Outermost runs first: client key, then session token
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware))
        .route_layer(from_fn_with_state(state.clone(), client_key_middleware))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", o);
                None
            }
        })
        .collect();
    CorsLayer::new().allow_origin(origins).allow_methods(Any).allow_headers(Any)
}
