// src/routes.rs

use std::any::Any;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use tower_http::{
    catch_panic::CatchPanicLayer, cors::CorsLayer, services::ServeDir, trace::TraceLayer,
};

use crate::{
    error::{self, AppError},
    handlers::type_the_answer,
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Upper bound for create/update bodies, images included.
const FORM_BODY_LIMIT: usize = 10 * 1024 * 1024;

async fn route_not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!("Handler panicked: {}", detail);

    AppError::InternalServerError(detail.to_string()).into_response()
}

/// Assembles the main application router.
///
/// * Public routes: play view of published games and the leaderboard.
/// * Everything else under `/api/type-the-answer` goes through `auth_middleware`.
/// * Uploaded images are served from `/uploads`.
pub fn create_router(state: AppState) -> Router {
    error::set_production_mode(state.config.is_production());

    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://localhost:5173"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
        HeaderValue::from_static("http://127.0.0.1:5173"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let public_routes = Router::new()
        .route("/{id}/play/public", get(type_the_answer::get_game_play_public))
        .route("/{id}/leaderboard", get(type_the_answer::get_leaderboard));

    let protected_routes = Router::new()
        .route("/", post(type_the_answer::create_game))
        .route(
            "/{id}",
            get(type_the_answer::get_game_detail)
                .put(type_the_answer::update_game)
                .delete(type_the_answer::delete_game),
        )
        .route("/{id}/status", patch(type_the_answer::update_status))
        .route("/{id}/play/private", get(type_the_answer::get_game_play_private))
        .route("/{id}/check", post(type_the_answer::check_answers))
        .layer(DefaultBodyLimit::max(FORM_BODY_LIMIT))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let game_routes = Router::new().merge(public_routes).merge(protected_routes);

    Router::new()
        .nest("/api/type-the-answer", game_routes)
        .nest_service("/uploads", ServeDir::new(&state.config.upload_dir))
        .fallback(route_not_found)
        // Global Middleware (applied from outside in)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
