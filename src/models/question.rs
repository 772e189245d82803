// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::utils::form::coerce;

/// Represents the 'type_answer_questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TypeAnswerQuestion {
    pub id: Uuid,

    pub game_id: Uuid,

    /// Zero-based display order. Neither unique nor contiguous.
    pub order_index: i32,

    /// The text shown to the player.
    pub text: String,

    /// The expected answer, compared trimmed and case-insensitively.
    pub answer: String,
}

/// One question as sent by the editor.
///
/// Front-ends send either snake_case or camelCase text fields, and numbers as
/// strings when the form is multipart.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = validate_question_fields))]
pub struct QuestionInput {
    #[serde(default, deserialize_with = "coerce::opt_int")]
    #[validate(range(min = 0, message = "order must be a non-negative integer"))]
    pub order: Option<i32>,

    #[serde(deserialize_with = "coerce::int")]
    #[validate(range(min = 0, message = "question_index must be a non-negative integer"))]
    pub question_index: i32,

    #[validate(length(min = 1, message = "question_text must not be empty"))]
    pub question_text: Option<String>,

    #[serde(rename = "questionText")]
    #[validate(length(min = 1, message = "questionText must not be empty"))]
    pub question_text_camel: Option<String>,

    #[validate(length(min = 1, message = "correct_answer must not be empty"))]
    pub correct_answer: Option<String>,

    #[serde(rename = "correctAnswer")]
    #[validate(length(min = 1, message = "correctAnswer must not be empty"))]
    pub correct_answer_camel: Option<String>,
}

fn validate_question_fields(question: &QuestionInput) -> Result<(), ValidationError> {
    if question.question_text.is_none() && question.question_text_camel.is_none() {
        return Err(ValidationError::new("question_text_required")
            .with_message("question text is required".into()));
    }
    if question.correct_answer.is_none() && question.correct_answer_camel.is_none() {
        return Err(ValidationError::new("correct_answer_required")
            .with_message("correct answer is required".into()));
    }
    Ok(())
}

/// A question ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedQuestion {
    pub order: i32,
    pub question_text: String,
    pub correct_answer: String,
}

/// Resolves field aliases and the display order of each question.
///
/// Order comes from `order` when given, else from `question_index`.
pub fn normalize_questions(questions: &[QuestionInput]) -> Vec<NormalizedQuestion> {
    questions
        .iter()
        .map(|q| NormalizedQuestion {
            order: q.order.unwrap_or(q.question_index),
            question_text: q
                .question_text
                .clone()
                .or_else(|| q.question_text_camel.clone())
                .unwrap_or_default(),
            correct_answer: q
                .correct_answer
                .clone()
                .or_else(|| q.correct_answer_camel.clone())
                .unwrap_or_default(),
        })
        .collect()
}

/// Question as shown in the owner's detail view.
#[derive(Debug, Serialize)]
pub struct QuestionDetail {
    pub question_index: i32,
    pub question_text: String,
    pub correct_answer: String,
}

/// DTO for sending a question to a player (excludes the answer).
#[derive(Debug, Serialize)]
pub struct PlayQuestion {
    pub question_index: i32,
    pub question_text: String,
}

impl From<&TypeAnswerQuestion> for QuestionDetail {
    fn from(q: &TypeAnswerQuestion) -> Self {
        Self {
            question_index: q.order_index,
            question_text: q.text.clone(),
            correct_answer: q.answer.clone(),
        }
    }
}

impl From<&TypeAnswerQuestion> for PlayQuestion {
    fn from(q: &TypeAnswerQuestion) -> Self {
        Self {
            question_index: q.order_index,
            question_text: q.text.clone(),
        }
    }
}
