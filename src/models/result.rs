// src/models/result.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::utils::form::coerce;

/// Represents the 'type_answer_results' table in the database.
/// One row per completed play attempt.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TypeAnswerResult {
    pub id: Uuid,
    pub game_id: Uuid,
    pub player_id: Uuid,
    pub score: i32,
    pub correct_answers: i32,
    pub total_questions: i32,
    pub completion_time: i32,
    pub percentage: f64,
    pub created_at: DateTime<Utc>,
}

/// A result joined with the player's display name, input to the leaderboard.
#[derive(Debug, Clone, FromRow)]
pub struct PlayerResult {
    pub player_id: Uuid,
    pub player_name: String,
    pub score: i32,
    pub completion_time: i32,
    pub percentage: f64,
    pub created_at: DateTime<Utc>,
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub player_name: String,
    pub score: i32,
    pub completion_time: i32,
    pub percentage: f64,
}

/// A single submitted answer.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmittedAnswer {
    #[serde(deserialize_with = "coerce::int")]
    pub question_index: i32,

    #[validate(length(min = 1, message = "user_answer must not be empty"))]
    pub user_answer: String,
}

/// DTO for submitting answers to a game.
#[derive(Debug, Deserialize, Validate)]
pub struct CheckAnswerRequest {
    #[validate(nested)]
    pub answers: Vec<SubmittedAnswer>,

    /// Seconds the player needed. Defaults to 0.
    #[serde(default)]
    #[validate(range(min = 0, message = "completion_time must be a non-negative integer"))]
    pub completion_time: i32,
}

/// Score breakdown returned after a check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckAnswerResponse {
    pub correct_answers: i32,
    pub total_questions: i32,
    pub max_score: i32,
    pub score: i32,
    pub percentage: f64,
}
