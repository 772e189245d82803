// src/models/game_form.rs

use serde::Deserialize;
use validator::Validate;

use crate::{
    models::question::{NormalizedQuestion, QuestionInput, normalize_questions},
    utils::{form::coerce, html::clean_html},
};

/// One day.
pub const MAX_TIME_LIMIT_SECONDS: i32 = 86_400;
pub const MAX_SCORE_PER_QUESTION: i32 = 1_000;

/// DTO for creating a game. Parsed from multipart text fields or JSON.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateGameForm {
    #[validate(length(min = 1, max = 255, message = "name must be between 1 and 255 characters"))]
    pub name: String,

    #[validate(length(min = 1, max = 5000, message = "description must be between 1 and 5000 characters"))]
    pub description: String,

    #[serde(default, deserialize_with = "coerce::flag")]
    pub is_published: bool,

    #[serde(deserialize_with = "coerce::int")]
    #[validate(range(min = 1, max = MAX_TIME_LIMIT_SECONDS, message = "time_limit_seconds must be an integer between 1 and 86400"))]
    pub time_limit_seconds: i32,

    #[serde(deserialize_with = "coerce::int")]
    #[validate(range(min = 1, max = MAX_SCORE_PER_QUESTION, message = "score_per_question must be an integer between 1 and 1000"))]
    pub score_per_question: i32,

    #[serde(deserialize_with = "coerce::json_list")]
    #[validate(length(min = 1, message = "at least one question is required"), nested)]
    pub questions: Vec<QuestionInput>,
}

/// DTO for updating a game. Every field falls back to the stored value.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateGameForm {
    #[validate(length(min = 1, max = 255, message = "name must be between 1 and 255 characters"))]
    pub name: Option<String>,

    #[validate(length(min = 1, max = 5000, message = "description must be between 1 and 5000 characters"))]
    pub description: Option<String>,

    #[serde(default, deserialize_with = "coerce::opt_flag")]
    pub is_published: Option<bool>,

    #[serde(default, deserialize_with = "coerce::opt_int")]
    #[validate(range(min = 1, max = MAX_TIME_LIMIT_SECONDS, message = "time_limit_seconds must be an integer between 1 and 86400"))]
    pub time_limit_seconds: Option<i32>,

    #[serde(default, deserialize_with = "coerce::opt_int")]
    #[validate(range(min = 1, max = MAX_SCORE_PER_QUESTION, message = "score_per_question must be an integer between 1 and 1000"))]
    pub score_per_question: Option<i32>,

    #[serde(default, deserialize_with = "coerce::opt_json_list")]
    #[validate(length(min = 1, message = "at least one question is required"), nested)]
    pub questions: Option<Vec<QuestionInput>>,
}

/// Validated, normalized input for creating a game.
#[derive(Debug, Clone)]
pub struct NewGame {
    pub name: String,
    pub description: String,
    pub is_published: bool,
    pub time_limit_seconds: i32,
    pub score_per_question: i32,
    pub questions: Vec<NormalizedQuestion>,
}

/// Validated, normalized input for updating a game.
#[derive(Debug, Clone, Default)]
pub struct GameChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_published: Option<bool>,
    pub time_limit_seconds: Option<i32>,
    pub score_per_question: Option<i32>,
    pub questions: Option<Vec<NormalizedQuestion>>,
}

impl From<CreateGameForm> for NewGame {
    fn from(form: CreateGameForm) -> Self {
        Self {
            name: clean_html(&form.name),
            description: clean_html(&form.description),
            is_published: form.is_published,
            time_limit_seconds: form.time_limit_seconds,
            score_per_question: form.score_per_question,
            questions: normalize_questions(&form.questions),
        }
    }
}

impl From<UpdateGameForm> for GameChanges {
    fn from(form: UpdateGameForm) -> Self {
        Self {
            name: form.name.as_deref().map(clean_html),
            description: form.description.as_deref().map(clean_html),
            is_published: form.is_published,
            time_limit_seconds: form.time_limit_seconds,
            score_per_question: form.score_per_question,
            questions: form.questions.as_deref().map(normalize_questions),
        }
    }
}
