// src/models/game.rs

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::question::{PlayQuestion, QuestionDetail, TypeAnswerQuestion};

/// Column list shared by every query returning a full `TypeAnswerGame`.
pub const GAME_COLUMNS: &str = "id, template_id, creator_id, title, description, \
    thumbnail_url, background_url, time_limit_sec, points_per_question, status, \
    published_at, created_at, updated_at";

/// Publication status, stored as text in `type_answer_games.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    Draft,
    Published,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::Draft => "DRAFT",
            GameStatus::Published => "PUBLISHED",
        }
    }

    pub fn from_published(is_published: bool) -> Self {
        if is_published {
            GameStatus::Published
        } else {
            GameStatus::Draft
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents the 'type_answer_games' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TypeAnswerGame {
    pub id: Uuid,
    pub template_id: Uuid,
    pub creator_id: Uuid,
    pub title: String,
    pub description: String,
    pub thumbnail_url: Option<String>,
    pub background_url: Option<String>,
    pub time_limit_sec: i32,
    pub points_per_question: i32,

    /// 'DRAFT' or 'PUBLISHED'.
    pub status: String,

    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TypeAnswerGame {
    pub fn is_published(&self) -> bool {
        self.status == GameStatus::Published.as_str()
    }
}

/// A game together with its questions, returned after creation.
#[derive(Debug, Serialize)]
pub struct GameWithQuestions {
    #[serde(flatten)]
    pub game: TypeAnswerGame,
    pub questions: Vec<TypeAnswerQuestion>,
}

/// Owner/admin view of a game, answers included.
#[derive(Debug, Serialize)]
pub struct GameDetailResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub thumbnail_image: Option<String>,
    pub background_image: Option<String>,
    pub is_published: bool,
    pub time_limit_seconds: i32,
    pub score_per_question: i32,
    pub questions: Vec<QuestionDetail>,
}

impl GameDetailResponse {
    pub fn new(game: &TypeAnswerGame, questions: &[TypeAnswerQuestion]) -> Self {
        Self {
            id: game.id,
            name: game.title.clone(),
            description: game.description.clone(),
            thumbnail_image: game.thumbnail_url.clone(),
            background_image: game.background_url.clone(),
            is_published: game.is_published(),
            time_limit_seconds: game.time_limit_sec,
            score_per_question: game.points_per_question,
            questions: questions.iter().map(QuestionDetail::from).collect(),
        }
    }
}

/// Player view of a game. Answers stay on the server.
#[derive(Debug, Serialize)]
pub struct GamePlayResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub thumbnail_image: Option<String>,
    pub is_published: bool,
    pub questions: Vec<PlayQuestion>,
    pub time_limit_seconds: i32,
    pub score_per_question: i32,
}

impl GamePlayResponse {
    pub fn new(game: &TypeAnswerGame, questions: &[TypeAnswerQuestion]) -> Self {
        Self {
            id: game.id,
            name: game.title.clone(),
            description: game.description.clone(),
            thumbnail_image: game.thumbnail_url.clone(),
            is_published: game.is_published(),
            questions: questions.iter().map(PlayQuestion::from).collect(),
            time_limit_seconds: game.time_limit_sec,
            score_per_question: game.points_per_question,
        }
    }
}

/// DTO for publishing/unpublishing a game.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: GameStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(status: GameStatus) -> TypeAnswerGame {
        TypeAnswerGame {
            id: Uuid::new_v4(),
            template_id: Uuid::new_v4(),
            creator_id: Uuid::new_v4(),
            title: "Capitals".to_string(),
            description: "Name the capital".to_string(),
            thumbnail_url: Some("/uploads/type-the-answer/a.png".to_string()),
            background_url: None,
            time_limit_sec: 60,
            points_per_question: 10,
            status: status.as_str().to_string(),
            published_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn question(order: i32) -> TypeAnswerQuestion {
        TypeAnswerQuestion {
            id: Uuid::new_v4(),
            game_id: Uuid::new_v4(),
            order_index: order,
            text: format!("Question {}", order),
            answer: "secret".to_string(),
        }
    }

    #[test]
    fn test_play_view_hides_answers() {
        let view = GamePlayResponse::new(&game(GameStatus::Published), &[question(0), question(2)]);
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["is_published"], true);
        assert_eq!(json["questions"][1]["question_index"], 2);
        assert!(json["questions"][0].get("correct_answer").is_none());
        assert!(!json.to_string().contains("secret"));
    }

    #[test]
    fn test_detail_view_includes_answers() {
        let view = GameDetailResponse::new(&game(GameStatus::Draft), &[question(0)]);
        assert!(!view.is_published);
        assert_eq!(view.questions[0].correct_answer, "secret");
        assert_eq!(view.score_per_question, 10);
    }

    #[test]
    fn test_status_parsing() {
        assert!(serde_json::from_str::<UpdateStatusRequest>(r#"{"status":"published"}"#).is_err());
        let req: UpdateStatusRequest = serde_json::from_str(r#"{"status":"DRAFT"}"#).unwrap();
        assert_eq!(req.status, GameStatus::Draft);
    }
}
