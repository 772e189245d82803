// src/services/type_the_answer.rs

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    config::{LEADERBOARD_SIZE, TYPE_THE_ANSWER_SLUG},
    error::AppError,
    models::{
        game::{
            GAME_COLUMNS, GameDetailResponse, GamePlayResponse, GameStatus, GameWithQuestions,
            TypeAnswerGame,
        },
        game_form::{GameChanges, NewGame},
        question::{NormalizedQuestion, TypeAnswerQuestion},
        result::{CheckAnswerRequest, CheckAnswerResponse, LeaderboardEntry, PlayerResult},
        user::AuthUser,
    },
    services::{games_index, scoring},
    state::AppState,
    utils::{csv_sync, form::UploadedFile, storage::FileStorage},
};

/// Upload namespace for game images.
const UPLOAD_NAMESPACE: &str = TYPE_THE_ANSWER_SLUG;

fn game_not_found() -> AppError {
    AppError::NotFound("Game not found".to_string())
}

/// Resolves the id of this feature's template. 404 when it was never seeded.
async fn require_template_id(pool: &PgPool) -> Result<Uuid, AppError> {
    sqlx::query_scalar::<_, Uuid>("SELECT id FROM game_templates WHERE slug = $1")
        .bind(TYPE_THE_ANSWER_SLUG)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Game template not found".to_string()))
}

async fn fetch_game(pool: &PgPool, id: Uuid) -> Result<TypeAnswerGame, AppError> {
    let sql = format!("SELECT {} FROM type_answer_games WHERE id = $1", GAME_COLUMNS);
    sqlx::query_as::<_, TypeAnswerGame>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch game {}: {:?}", id, e);
            AppError::InternalServerError(e.to_string())
        })?
        .ok_or_else(game_not_found)
}

/// Questions of a game in display order.
async fn fetch_questions(pool: &PgPool, game_id: Uuid) -> Result<Vec<TypeAnswerQuestion>, AppError> {
    let questions = sqlx::query_as::<_, TypeAnswerQuestion>(
        r#"
        SELECT id, game_id, order_index, text, answer
        FROM type_answer_questions
        WHERE game_id = $1
        ORDER BY order_index ASC, id ASC
        "#,
    )
    .bind(game_id)
    .fetch_all(pool)
    .await?;

    Ok(questions)
}

async fn insert_questions(
    conn: &mut PgConnection,
    game_id: Uuid,
    questions: &[NormalizedQuestion],
) -> Result<Vec<TypeAnswerQuestion>, sqlx::Error> {
    if questions.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO type_answer_questions (id, game_id, order_index, text, answer) ",
    );
    builder.push_values(questions, |mut row, question| {
        row.push_bind(Uuid::new_v4())
            .push_bind(game_id)
            .push_bind(question.order)
            .push_bind(&question.question_text)
            .push_bind(&question.correct_answer);
    });
    builder.push(" RETURNING id, game_id, order_index, text, answer");

    let mut inserted: Vec<TypeAnswerQuestion> = builder.build_query_as().fetch_all(conn).await?;
    inserted.sort_by(|a, b| a.order_index.cmp(&b.order_index).then(a.id.cmp(&b.id)));
    Ok(inserted)
}

/// Uploads an optional image, mapping any failure to 400.
async fn upload_optional(
    state: &AppState,
    file: Option<&UploadedFile>,
) -> Result<Option<String>, AppError> {
    match file {
        Some(file) => state
            .storage
            .upload(UPLOAD_NAMESPACE, file)
            .await
            .map(Some)
            .map_err(|e| {
                tracing::warn!("Image upload failed: {}", e);
                AppError::BadRequest(e.message().to_string())
            }),
        None => Ok(None),
    }
}

/// Uploads the optional thumbnail and background. When the second upload
/// fails the first one is removed again.
async fn upload_images(
    state: &AppState,
    thumbnail: Option<&UploadedFile>,
    background: Option<&UploadedFile>,
) -> Result<(Option<String>, Option<String>), AppError> {
    let thumbnail_url = upload_optional(state, thumbnail).await?;
    match upload_optional(state, background).await {
        Ok(background_url) => Ok((thumbnail_url, background_url)),
        Err(e) => {
            discard_files(state.storage.as_ref(), thumbnail_url.iter()).await;
            Err(e)
        }
    }
}

/// Best-effort removal of stored images. Failures are logged only.
async fn discard_files<'a>(storage: &dyn FileStorage, urls: impl IntoIterator<Item = &'a String>) {
    for url in urls {
        if let Err(e) = storage.remove(url).await {
            tracing::warn!("Failed to remove image {}: {}", url, e);
        }
    }
}

/// The stored image made obsolete by a replacement upload, if any.
fn superseded<'a>(current: &'a Option<String>, uploaded: &Option<String>) -> Option<&'a String> {
    match (current, uploaded) {
        (Some(old), Some(new)) if old != new => Some(old),
        _ => None,
    }
}

/// Creates a game with its questions and index row in one transaction.
pub async fn create_game(
    state: &AppState,
    creator: &AuthUser,
    input: NewGame,
    thumbnail: Option<UploadedFile>,
    background: Option<UploadedFile>,
) -> Result<GameWithQuestions, AppError> {
    let template_id = require_template_id(&state.pool).await?;

    let (thumbnail_url, background_url) =
        upload_images(state, thumbnail.as_ref(), background.as_ref()).await?;

    let status = GameStatus::from_published(input.is_published);
    let published_at = input.is_published.then(Utc::now);
    let game_id = Uuid::new_v4();

    let persisted = async {
        let mut tx = state.pool.begin().await?;

        let sql = format!(
            r#"
            INSERT INTO type_answer_games
                (id, template_id, creator_id, title, description, thumbnail_url, background_url,
                 time_limit_sec, points_per_question, status, published_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            GAME_COLUMNS
        );
        let game = sqlx::query_as::<_, TypeAnswerGame>(&sql)
            .bind(game_id)
            .bind(template_id)
            .bind(creator.id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&thumbnail_url)
            .bind(&background_url)
            .bind(input.time_limit_seconds)
            .bind(input.score_per_question)
            .bind(status.as_str())
            .bind(published_at)
            .fetch_one(&mut *tx)
            .await?;

        let questions = insert_questions(&mut tx, game.id, &input.questions).await?;
        games_index::upsert(&mut tx, &game).await?;

        tx.commit().await?;
        Ok::<_, sqlx::Error>(GameWithQuestions { game, questions })
    }
    .await;

    let created = match persisted {
        Ok(created) => created,
        Err(e) => {
            tracing::error!("Failed to create game: {:?}", e);
            discard_files(
                state.storage.as_ref(),
                [&thumbnail_url, &background_url].into_iter().flatten(),
            )
            .await;
            return Err(AppError::BadRequest("Failed to create game".to_string()));
        }
    };

    tracing::info!(
        "Game {} created by {} with {} questions",
        created.game.id,
        creator.id,
        created.questions.len()
    );
    csv_sync::spawn_sync(state.pool.clone(), state.config.csv_dir.clone());

    Ok(created)
}

/// Owner/admin view of a game.
pub async fn get_game_detail(
    pool: &PgPool,
    user: &AuthUser,
    id: Uuid,
) -> Result<GameDetailResponse, AppError> {
    let game = fetch_game(pool, id).await?;

    if !user.can_manage(game.creator_id) {
        return Err(AppError::Forbidden("User cannot access this game".to_string()));
    }

    let questions = fetch_questions(pool, id).await?;
    Ok(GameDetailResponse::new(&game, &questions))
}

/// Player view. `viewer` is `None` for the public endpoint, which only
/// serves published games.
pub async fn get_game_play(
    pool: &PgPool,
    id: Uuid,
    viewer: Option<&AuthUser>,
) -> Result<GamePlayResponse, AppError> {
    let game = fetch_game(pool, id).await?;

    match viewer {
        None if !game.is_published() => return Err(game_not_found()),
        Some(user) if !user.can_manage(game.creator_id) => {
            return Err(AppError::Forbidden("User cannot get this game data".to_string()));
        }
        _ => {}
    }

    let questions = fetch_questions(pool, id).await?;
    Ok(GamePlayResponse::new(&game, &questions))
}

/// Publish stamp after a status change: an already published game keeps its stamp.
fn next_published_at(game: &TypeAnswerGame, status: GameStatus, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match status {
        GameStatus::Published if game.is_published() => game.published_at.or(Some(now)),
        GameStatus::Published => Some(now),
        GameStatus::Draft => None,
    }
}

/// Updates a game. When `changes.questions` is set the stored questions are
/// replaced wholesale, in the same transaction as the game and index rows.
pub async fn update_game(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    changes: GameChanges,
    thumbnail: Option<UploadedFile>,
    background: Option<UploadedFile>,
) -> Result<TypeAnswerGame, AppError> {
    let game = fetch_game(&state.pool, id).await?;

    let slug = sqlx::query_scalar::<_, String>("SELECT slug FROM game_templates WHERE id = $1")
        .bind(game.template_id)
        .fetch_optional(&state.pool)
        .await?;
    if slug.as_deref() != Some(TYPE_THE_ANSWER_SLUG) {
        return Err(game_not_found());
    }

    if !user.can_manage(game.creator_id) {
        return Err(AppError::Forbidden("User cannot access this game".to_string()));
    }

    let (new_thumbnail, new_background) =
        upload_images(state, thumbnail.as_ref(), background.as_ref()).await?;
    let thumbnail_url = new_thumbnail.clone().or_else(|| game.thumbnail_url.clone());
    let background_url = new_background.clone().or_else(|| game.background_url.clone());

    let current_status = GameStatus::from_published(game.is_published());
    let status = changes
        .is_published
        .map(GameStatus::from_published)
        .unwrap_or(current_status);
    let published_at = next_published_at(&game, status, Utc::now());

    let persisted = async {
        let mut tx = state.pool.begin().await?;

        if let Some(questions) = &changes.questions {
            sqlx::query("DELETE FROM type_answer_questions WHERE game_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            insert_questions(&mut tx, id, questions).await?;
        }

        let sql = format!(
            r#"
            UPDATE type_answer_games SET
                title = $2,
                description = $3,
                thumbnail_url = $4,
                background_url = $5,
                time_limit_sec = $6,
                points_per_question = $7,
                status = $8,
                published_at = $9,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            GAME_COLUMNS
        );
        let updated = sqlx::query_as::<_, TypeAnswerGame>(&sql)
            .bind(id)
            .bind(changes.name.as_deref().unwrap_or(&game.title))
            .bind(changes.description.as_deref().unwrap_or(&game.description))
            .bind(&thumbnail_url)
            .bind(&background_url)
            .bind(changes.time_limit_seconds.unwrap_or(game.time_limit_sec))
            .bind(changes.score_per_question.unwrap_or(game.points_per_question))
            .bind(status.as_str())
            .bind(published_at)
            .fetch_one(&mut *tx)
            .await?;

        games_index::upsert(&mut tx, &updated).await?;
        tx.commit().await?;
        Ok::<_, sqlx::Error>(updated)
    }
    .await;

    let updated = match persisted {
        Ok(updated) => updated,
        Err(e) => {
            tracing::error!("Failed to update game {}: {:?}", id, e);
            discard_files(
                state.storage.as_ref(),
                [&new_thumbnail, &new_background].into_iter().flatten(),
            )
            .await;
            return Err(e.into());
        }
    };

    let replaced = [
        superseded(&game.thumbnail_url, &new_thumbnail),
        superseded(&game.background_url, &new_background),
    ];
    discard_files(state.storage.as_ref(), replaced.into_iter().flatten()).await;

    tracing::info!("Game {} updated by {}", id, user.id);
    csv_sync::spawn_sync(state.pool.clone(), state.config.csv_dir.clone());

    Ok(updated)
}

/// Publishes or unpublishes a game and mirrors the flag into the index row.
pub async fn update_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    status: GameStatus,
) -> Result<TypeAnswerGame, AppError> {
    require_template_id(&state.pool).await?;
    let game = fetch_game(&state.pool, id).await?;

    if !user.can_manage(game.creator_id) {
        return Err(AppError::Forbidden("User cannot access this game".to_string()));
    }

    let published_at = (status == GameStatus::Published).then(Utc::now);

    let persisted = async {
        let mut tx = state.pool.begin().await?;

        let sql = format!(
            r#"
            UPDATE type_answer_games
            SET status = $2, published_at = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            GAME_COLUMNS
        );
        let updated = sqlx::query_as::<_, TypeAnswerGame>(&sql)
            .bind(id)
            .bind(status.as_str())
            .bind(published_at)
            .fetch_one(&mut *tx)
            .await?;

        games_index::upsert(&mut tx, &updated).await?;
        tx.commit().await?;
        Ok::<_, sqlx::Error>(updated)
    }
    .await;

    let updated = persisted.map_err(|e| {
        tracing::error!("Failed to update status of game {}: {:?}", id, e);
        AppError::BadRequest("Failed to update game status".to_string())
    })?;

    tracing::info!("Game {} is now {}", id, status);
    csv_sync::spawn_sync(state.pool.clone(), state.config.csv_dir.clone());

    Ok(updated)
}

/// Deletes a game, its index row and (by cascade) its questions and results.
/// Stored images are removed afterwards on a best-effort basis.
pub async fn delete_game(state: &AppState, user: &AuthUser, id: Uuid) -> Result<Uuid, AppError> {
    let game = fetch_game(&state.pool, id).await?;

    if !user.can_delete(game.creator_id) {
        return Err(AppError::Forbidden("User cannot delete this game".to_string()));
    }

    let mut tx = state.pool.begin().await?;
    games_index::delete(&mut tx, id).await?;
    sqlx::query("DELETE FROM type_answer_games WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    discard_files(
        state.storage.as_ref(),
        [&game.thumbnail_url, &game.background_url].into_iter().flatten(),
    )
    .await;

    tracing::info!("Game {} deleted by {}", id, user.id);
    csv_sync::spawn_sync(state.pool.clone(), state.config.csv_dir.clone());

    Ok(id)
}

/// Grades a submission and stores it as a result of `player`.
pub async fn check_answers(
    state: &AppState,
    player: &AuthUser,
    id: Uuid,
    request: &CheckAnswerRequest,
) -> Result<CheckAnswerResponse, AppError> {
    let game = fetch_game(&state.pool, id).await?;

    if !game.is_published() && game.creator_id != player.id {
        return Err(AppError::Forbidden("Game is not published".to_string()));
    }

    let questions = fetch_questions(&state.pool, id).await?;
    let summary = scoring::score_answers(&questions, &request.answers, game.points_per_question);

    let mut tx = state.pool.begin().await?;
    sqlx::query(
        r#"
        INSERT INTO type_answer_results
            (id, game_id, player_id, score, correct_answers, total_questions,
             completion_time, percentage)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(id)
    .bind(player.id)
    .bind(summary.score)
    .bind(summary.correct_answers)
    .bind(summary.total_questions)
    .bind(request.completion_time)
    .bind(summary.percentage)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to store result for game {}: {:?}", id, e);
        AppError::InternalServerError(e.to_string())
    })?;
    games_index::record_play(&mut tx, id).await?;
    tx.commit().await?;

    csv_sync::spawn_sync(state.pool.clone(), state.config.csv_dir.clone());

    Ok(summary)
}

/// Top results of a game, best attempt per player.
pub async fn get_leaderboard(pool: &PgPool, id: Uuid) -> Result<Vec<LeaderboardEntry>, AppError> {
    fetch_game(pool, id).await?;

    let results = sqlx::query_as::<_, PlayerResult>(
        r#"
        SELECT
            r.player_id,
            u.username AS player_name,
            r.score,
            r.completion_time,
            r.percentage,
            r.created_at
        FROM type_answer_results r
        JOIN users u ON u.id = r.player_id
        WHERE r.game_id = $1
        "#,
    )
    .bind(id)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch leaderboard: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(scoring::build_leaderboard(results, LEADERBOARD_SIZE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn game(status: GameStatus, published_at: Option<DateTime<Utc>>) -> TypeAnswerGame {
        TypeAnswerGame {
            id: Uuid::new_v4(),
            template_id: Uuid::new_v4(),
            creator_id: Uuid::new_v4(),
            title: "t".to_string(),
            description: "d".to_string(),
            thumbnail_url: None,
            background_url: None,
            time_limit_sec: 30,
            points_per_question: 10,
            status: status.as_str().to_string(),
            published_at,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_publishing_a_draft_stamps_now() {
        let now = Utc::now();
        let draft = game(GameStatus::Draft, None);
        assert_eq!(next_published_at(&draft, GameStatus::Published, now), Some(now));
    }

    #[test]
    fn test_republishing_keeps_original_stamp() {
        let earlier = Utc::now() - Duration::days(3);
        let published = game(GameStatus::Published, Some(earlier));
        assert_eq!(
            next_published_at(&published, GameStatus::Published, Utc::now()),
            Some(earlier)
        );
    }

    #[test]
    fn test_unpublishing_clears_stamp() {
        let published = game(GameStatus::Published, Some(Utc::now()));
        assert_eq!(next_published_at(&published, GameStatus::Draft, Utc::now()), None);
    }

    #[test]
    fn test_only_replaced_images_are_superseded() {
        let old = Some("/uploads/type-the-answer/old.png".to_string());
        let new = Some("/uploads/type-the-answer/new.png".to_string());

        assert_eq!(superseded(&old, &new), old.as_ref());
        assert_eq!(superseded(&old, &None), None);
        assert_eq!(superseded(&None, &new), None);
        assert_eq!(superseded(&old, &old.clone()), None);
    }

    #[tokio::test]
    async fn test_discard_files_removes_stored_images_and_tolerates_failures() {
        use crate::utils::storage::LocalFileStorage;
        use axum::body::Bytes;

        let root = std::env::temp_dir().join(format!("tta-discard-{}", Uuid::new_v4()));
        let storage = LocalFileStorage::new(root.clone(), "/uploads");
        let file = UploadedFile {
            file_name: "cover.png".to_string(),
            content_type: Some("image/png".to_string()),
            bytes: Bytes::from_static(b"\x89PNG"),
        };

        let stored = storage.upload(UPLOAD_NAMESPACE, &file).await.unwrap();
        let foreign = "/elsewhere/cover.png".to_string();
        let stored_path = root.join(stored.trim_start_matches("/uploads/"));
        assert!(stored_path.exists());

        discard_files(&storage, [&foreign, &stored]).await;
        assert!(!stored_path.exists());

        let _ = tokio::fs::remove_dir_all(&root).await;
    }
}
