// src/utils/csv_sync.rs

//! Denormalized CSV snapshot of all type-the-answer data, rewritten after
//! every mutation.

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{FromRow, PgPool};

use crate::{
    error::AppError,
    models::{game::TypeAnswerGame, question::TypeAnswerQuestion, result::TypeAnswerResult},
};

pub const GAMES_FILE: &str = "type-answer-games.data.csv";
pub const QUESTIONS_FILE: &str = "type-answer-questions.data.csv";
pub const RESULTS_FILE: &str = "type-answer-results.data.csv";

const GAMES_HEADER: &str = "id,templateId,creatorId,creator_username,title,description,thumbnailUrl,timeLimitSec,pointsPerQuestion,status,publishedAt,createdAt,updatedAt";
const QUESTIONS_HEADER: &str = "id,gameId,order,text,answer";
const RESULTS_HEADER: &str = "id,gameId,playerId,player_username,score,correctAnswers,totalQuestions,completionTime,percentage,createdAt";

#[derive(Debug, FromRow)]
struct GameExportRow {
    #[sqlx(flatten)]
    game: TypeAnswerGame,
    creator_username: String,
}

#[derive(Debug, FromRow)]
struct ResultExportRow {
    #[sqlx(flatten)]
    result: TypeAnswerResult,
    player_username: String,
}

/// Row counts of one export run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSummary {
    pub games: usize,
    pub questions: usize,
    pub results: usize,
}

/// Wraps free text in double quotes, doubling inner quotes.
fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

/// ISO-8601 UTC with milliseconds, e.g. `2024-01-01T00:00:00.000Z`.
fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn game_line(row: &GameExportRow) -> String {
    let game = &row.game;
    [
        game.id.to_string(),
        game.template_id.to_string(),
        game.creator_id.to_string(),
        quote(&row.creator_username),
        quote(&game.title),
        quote(&game.description),
        game.thumbnail_url.as_deref().map(quote).unwrap_or_default(),
        game.time_limit_sec.to_string(),
        game.points_per_question.to_string(),
        game.status.clone(),
        game.published_at.as_ref().map(timestamp).unwrap_or_default(),
        timestamp(&game.created_at),
        timestamp(&game.updated_at),
    ]
    .join(",")
}

fn question_line(question: &TypeAnswerQuestion) -> String {
    [
        question.id.to_string(),
        question.game_id.to_string(),
        question.order_index.to_string(),
        quote(&question.text),
        quote(&question.answer),
    ]
    .join(",")
}

fn result_line(row: &ResultExportRow) -> String {
    let result = &row.result;
    [
        result.id.to_string(),
        result.game_id.to_string(),
        result.player_id.to_string(),
        quote(&row.player_username),
        result.score.to_string(),
        result.correct_answers.to_string(),
        result.total_questions.to_string(),
        result.completion_time.to_string(),
        result.percentage.to_string(),
        timestamp(&result.created_at),
    ]
    .join(",")
}

fn document(header: &str, lines: impl Iterator<Item = String>) -> String {
    std::iter::once(header.to_string())
        .chain(lines)
        .collect::<Vec<_>>()
        .join("\n")
}

async fn write_file(dir: &Path, name: &str, contents: String) -> Result<(), AppError> {
    let path = dir.join(name);
    tokio::fs::write(&path, contents).await.map_err(|e| {
        AppError::InternalServerError(format!("Failed to write {}: {}", path.display(), e))
    })
}

/// Exports games, questions and results into three CSV files under `dir`.
pub async fn sync_csv(pool: &PgPool, dir: &Path) -> Result<SyncSummary, AppError> {
    let games = sqlx::query_as::<_, GameExportRow>(
        r#"
        SELECT
            g.id, g.template_id, g.creator_id, g.title, g.description,
            g.thumbnail_url, g.background_url, g.time_limit_sec, g.points_per_question,
            g.status, g.published_at, g.created_at, g.updated_at,
            u.username AS creator_username
        FROM type_answer_games g
        JOIN users u ON u.id = g.creator_id
        ORDER BY g.created_at ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    let questions = sqlx::query_as::<_, TypeAnswerQuestion>(
        r#"
        SELECT q.id, q.game_id, q.order_index, q.text, q.answer
        FROM type_answer_questions q
        JOIN type_answer_games g ON g.id = q.game_id
        ORDER BY g.created_at ASC, q.order_index ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    let results = sqlx::query_as::<_, ResultExportRow>(
        r#"
        SELECT
            r.id, r.game_id, r.player_id, r.score, r.correct_answers, r.total_questions,
            r.completion_time, r.percentage, r.created_at,
            u.username AS player_username
        FROM type_answer_results r
        JOIN users u ON u.id = r.player_id
        ORDER BY r.created_at ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    tokio::fs::create_dir_all(dir).await.map_err(|e| {
        AppError::InternalServerError(format!("Failed to create {}: {}", dir.display(), e))
    })?;

    write_file(dir, GAMES_FILE, document(GAMES_HEADER, games.iter().map(game_line))).await?;
    write_file(
        dir,
        QUESTIONS_FILE,
        document(QUESTIONS_HEADER, questions.iter().map(question_line)),
    )
    .await?;
    write_file(dir, RESULTS_FILE, document(RESULTS_HEADER, results.iter().map(result_line))).await?;

    let summary = SyncSummary {
        games: games.len(),
        questions: questions.len(),
        results: results.len(),
    };
    tracing::info!(
        "CSV synced: {} games, {} questions, {} results",
        summary.games,
        summary.questions,
        summary.results
    );

    Ok(summary)
}

/// Runs `sync_csv` in the background. Failures are logged only.
pub fn spawn_sync(pool: PgPool, dir: impl Into<PathBuf>) {
    let dir = dir.into();
    tokio::spawn(async move {
        if let Err(e) = sync_csv(&pool, &dir).await {
            tracing::error!("CSV sync failed: {}", e);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    #[test]
    fn test_quote_doubles_inner_quotes() {
        assert_eq!(quote("plain"), "\"plain\"");
        assert_eq!(quote("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_timestamp_has_millis_and_z() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(timestamp(&at), "2024-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_game_line_layout() {
        let at = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let row = GameExportRow {
            game: TypeAnswerGame {
                id: Uuid::nil(),
                template_id: Uuid::nil(),
                creator_id: Uuid::nil(),
                title: "A, \"quoted\" title".to_string(),
                description: "desc".to_string(),
                thumbnail_url: None,
                background_url: Some("/uploads/bg.png".to_string()),
                time_limit_sec: 60,
                points_per_question: 10,
                status: "DRAFT".to_string(),
                published_at: None,
                created_at: at,
                updated_at: at,
            },
            creator_username: "quizmaster".to_string(),
        };

        let nil = Uuid::nil().to_string();
        assert_eq!(
            game_line(&row),
            format!(
                "{nil},{nil},{nil},\"quizmaster\",\"A, \"\"quoted\"\" title\",\"desc\",,60,10,DRAFT,,2024-05-06T07:08:09.000Z,2024-05-06T07:08:09.000Z"
            )
        );
    }

    #[test]
    fn test_result_line_percentage_format() {
        let row = ResultExportRow {
            result: TypeAnswerResult {
                id: Uuid::nil(),
                game_id: Uuid::nil(),
                player_id: Uuid::nil(),
                score: 10,
                correct_answers: 1,
                total_questions: 2,
                completion_time: 42,
                percentage: 50.0,
                created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            },
            player_username: "o\"neil, jr".to_string(),
        };

        let line = result_line(&row);
        assert!(line.ends_with(",\"o\"\"neil, jr\",10,1,2,42,50,2024-01-01T00:00:00.000Z"));
    }

    #[test]
    fn test_thumbnail_url_is_quoted_when_present() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let row = GameExportRow {
            game: TypeAnswerGame {
                id: Uuid::nil(),
                template_id: Uuid::nil(),
                creator_id: Uuid::nil(),
                title: "t".to_string(),
                description: "d".to_string(),
                thumbnail_url: Some("/uploads/a,b.png".to_string()),
                background_url: None,
                time_limit_sec: 60,
                points_per_question: 10,
                status: "PUBLISHED".to_string(),
                published_at: Some(at),
                created_at: at,
                updated_at: at,
            },
            creator_username: "name, with comma".to_string(),
        };

        let line = game_line(&row);
        assert!(line.contains(",\"name, with comma\",\"t\",\"d\",\"/uploads/a,b.png\",60,10,PUBLISHED,"));
    }

    #[test]
    fn test_document_without_rows_is_header_only() {
        assert_eq!(document(QUESTIONS_HEADER, std::iter::empty()), QUESTIONS_HEADER);
        let doc = document("h", vec!["a".to_string(), "b".to_string()].into_iter());
        assert_eq!(doc, "h\na\nb");
    }
}
