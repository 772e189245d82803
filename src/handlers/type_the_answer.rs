// src/handlers/type_the_answer.rs

use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        game::UpdateStatusRequest,
        game_form::{CreateGameForm, UpdateGameForm},
        response::ApiResponse,
        result::CheckAnswerRequest,
        user::AuthUser,
    },
    services::type_the_answer as service,
    state::AppState,
    utils::form::FormPayload,
};

/// Form field names of the optional images.
const THUMBNAIL_FIELD: &str = "thumbnail_image";
const BACKGROUND_FIELD: &str = "background_image";

#[derive(Debug, Serialize)]
pub struct IdResponse {
    pub id: Uuid,
}

/// Game ids are UUIDs; anything else cannot name an existing game.
fn parse_game_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound("Game not found".to_string()))
}

/// Creates a new game.
///
/// Accepts multipart (text fields plus `thumbnail_image` / `background_image`
/// files) or JSON. Responds 201 with the stored game and its questions.
pub async fn create_game(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    mut form: FormPayload,
) -> Result<impl IntoResponse, AppError> {
    let input: CreateGameForm = form.parse()?;
    let thumbnail = form.take_file(THUMBNAIL_FIELD);
    let background = form.take_file(BACKGROUND_FIELD);

    let created =
        service::create_game(&state, &user, input.into(), thumbnail, background).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::data(created))))
}

/// Owner view of a game, answers included.
pub async fn get_game_detail(
    State(pool): State<PgPool>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_game_id(&id)?;
    let detail = service::get_game_detail(&pool, &user, id).await?;
    Ok(Json(ApiResponse::data(detail)))
}

pub async fn update_game(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    mut form: FormPayload,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_game_id(&id)?;
    let input: UpdateGameForm = form.parse()?;
    let thumbnail = form.take_file(THUMBNAIL_FIELD);
    let background = form.take_file(BACKGROUND_FIELD);

    let updated =
        service::update_game(&state, &user, id, input.into(), thumbnail, background).await?;

    Ok(Json(ApiResponse::data(IdResponse { id: updated.id })))
}

/// Publishes or unpublishes a game.
pub async fn update_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_game_id(&id)?;
    let Json(req) = payload?;

    let game = service::update_status(&state, &user, id, req.status).await?;
    Ok(Json(ApiResponse::data(game)))
}

pub async fn delete_game(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_game_id(&id)?;
    let id = service::delete_game(&state, &user, id).await?;
    Ok(Json(ApiResponse::data(IdResponse { id })))
}

/// Unauthenticated play view. Only published games are served.
pub async fn get_game_play_public(
    State(pool): State<PgPool>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_game_id(&id)?;
    let play = service::get_game_play(&pool, id, None).await?;
    Ok(Json(ApiResponse::data(play)))
}

/// Play view for the owner, drafts included.
pub async fn get_game_play_private(
    State(pool): State<PgPool>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_game_id(&id)?;
    let play = service::get_game_play(&pool, id, Some(&user)).await?;
    Ok(Json(ApiResponse::data(play)))
}

/// Scores submitted answers and records the attempt.
pub async fn check_answers(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<CheckAnswerRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_game_id(&id)?;
    let Json(req) = payload?;
    req.validate()?;

    let summary = service::check_answers(&state, &user, id, &req).await?;
    Ok(Json(ApiResponse::data(summary)))
}

pub async fn get_leaderboard(
    State(pool): State<PgPool>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_game_id(&id)?;
    let leaderboard = service::get_leaderboard(&pool, id).await?;
    Ok(Json(ApiResponse::data(leaderboard)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_id_is_not_found() {
        let err = parse_game_id("not-a-uuid").unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let id = Uuid::new_v4();
        assert_eq!(parse_game_id(&id.to_string()).unwrap(), id);
    }
}
