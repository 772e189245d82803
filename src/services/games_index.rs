// src/services/games_index.rs

//! The platform-wide `games` table lists games of every template. Each type-the-answer
//! game owns one row there with the same id; it must be written in the same
//! transaction as the game itself.

use serde_json::{Value, json};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{config::TYPE_THE_ANSWER_SLUG, models::game::TypeAnswerGame};

/// Template-specific payload stored in `games.game_json`.
pub fn game_json(game: &TypeAnswerGame) -> Value {
    json!({
        "type": TYPE_THE_ANSWER_SLUG,
        "type_answer_game_id": game.id,
        "time_limit_seconds": game.time_limit_sec,
        "score_per_question": game.points_per_question,
    })
}

/// Inserts or refreshes the index row mirroring `game`.
pub async fn upsert(conn: &mut PgConnection, game: &TypeAnswerGame) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO games
            (id, game_template_id, creator_id, name, description, thumbnail_image,
             is_published, game_json, total_played)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 0)
        ON CONFLICT (id) DO UPDATE SET
            name = EXCLUDED.name,
            description = EXCLUDED.description,
            thumbnail_image = EXCLUDED.thumbnail_image,
            is_published = EXCLUDED.is_published,
            game_json = EXCLUDED.game_json,
            updated_at = NOW()
        "#,
    )
    .bind(game.id)
    .bind(game.template_id)
    .bind(game.creator_id)
    .bind(&game.title)
    .bind(&game.description)
    .bind(&game.thumbnail_url)
    .bind(game.is_published())
    .bind(game_json(game))
    .execute(conn)
    .await?;

    Ok(())
}

/// Counts one more play in the index row.
pub async fn record_play(conn: &mut PgConnection, game_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE games SET total_played = total_played + 1 WHERE id = $1")
        .bind(game_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn delete(conn: &mut PgConnection, game_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM games WHERE id = $1")
        .bind(game_id)
        .execute(conn)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_game_json_shape() {
        let game = TypeAnswerGame {
            id: Uuid::new_v4(),
            template_id: Uuid::new_v4(),
            creator_id: Uuid::new_v4(),
            title: "t".to_string(),
            description: "d".to_string(),
            thumbnail_url: None,
            background_url: None,
            time_limit_sec: 90,
            points_per_question: 15,
            status: "DRAFT".to_string(),
            published_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let value = game_json(&game);
        assert_eq!(value["type"], "type-the-answer");
        assert_eq!(value["type_answer_game_id"], game.id.to_string());
        assert_eq!(value["time_limit_seconds"], 90);
        assert_eq!(value["score_per_question"], 15);
    }
}
