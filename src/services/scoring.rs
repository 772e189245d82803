// src/services/scoring.rs

use std::{
    cmp::Ordering,
    collections::{HashMap, HashSet, hash_map::Entry},
};

use uuid::Uuid;

use crate::models::{
    question::TypeAnswerQuestion,
    result::{CheckAnswerResponse, LeaderboardEntry, PlayerResult, SubmittedAnswer},
};

/// Trimmed, case-insensitive comparison.
pub fn answers_match(expected: &str, given: &str) -> bool {
    expected.trim().to_lowercase() == given.trim().to_lowercase()
}

/// Finds the question an answer refers to.
///
/// A question whose stored order equals `question_index` wins; otherwise the
/// index is used as a position into `questions`.
fn locate_question(questions: &[TypeAnswerQuestion], question_index: i32) -> Option<usize> {
    questions
        .iter()
        .position(|q| q.order_index == question_index)
        .or_else(|| {
            usize::try_from(question_index)
                .ok()
                .filter(|&position| position < questions.len())
        })
}

/// Percentage of `score` over `max_score`, rounded to two decimals. 0 when there is nothing to score.
pub fn percentage(score: i64, max_score: i64) -> f64 {
    if max_score <= 0 {
        return 0.0;
    }
    let raw = score as f64 / max_score as f64 * 100.0;
    (raw * 100.0).round() / 100.0
}

fn clamp_to_i32(value: i64) -> i32 {
    i32::try_from(value).unwrap_or(if value < 0 { i32::MIN } else { i32::MAX })
}

/// Grades a submission against a game's questions.
///
/// `questions` must be ordered by display order. Answers that resolve to no
/// question are skipped, and each question is graded by the first answer
/// that resolves to it.
pub fn score_answers(
    questions: &[TypeAnswerQuestion],
    answers: &[SubmittedAnswer],
    points_per_question: i32,
) -> CheckAnswerResponse {
    let mut graded = HashSet::new();
    let mut correct_answers = 0;

    for answer in answers {
        let Some(position) = locate_question(questions, answer.question_index) else {
            continue;
        };
        if !graded.insert(position) {
            continue;
        }
        if answers_match(&questions[position].answer, &answer.user_answer) {
            correct_answers += 1;
        }
    }

    // Products are taken in i64 so the percentage stays exact; the stored
    // totals saturate at i32::MAX.
    let total_questions = i64::try_from(questions.len()).unwrap_or(i64::MAX);
    let points = i64::from(points_per_question);
    let score = i64::from(correct_answers).saturating_mul(points);
    let max_score = total_questions.saturating_mul(points);

    CheckAnswerResponse {
        correct_answers,
        total_questions: clamp_to_i32(total_questions),
        max_score: clamp_to_i32(max_score),
        score: clamp_to_i32(score),
        percentage: percentage(score, max_score),
    }
}

/// Higher score first, then faster completion, then the earlier attempt.
fn rank(a: &PlayerResult, b: &PlayerResult) -> Ordering {
    b.score
        .cmp(&a.score)
        .then(a.completion_time.cmp(&b.completion_time))
        .then(a.created_at.cmp(&b.created_at))
}

/// Keeps each player's best result and returns the top `limit`.
pub fn build_leaderboard(results: Vec<PlayerResult>, limit: usize) -> Vec<LeaderboardEntry> {
    let mut best: HashMap<Uuid, PlayerResult> = HashMap::new();

    for result in results {
        match best.entry(result.player_id) {
            Entry::Occupied(mut current) => {
                if rank(&result, current.get()) == Ordering::Less {
                    current.insert(result);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(result);
            }
        }
    }

    let mut rows: Vec<PlayerResult> = best.into_values().collect();
    rows.sort_by(|a, b| {
        rank(a, b)
            .then_with(|| a.player_name.cmp(&b.player_name))
            .then_with(|| a.player_id.cmp(&b.player_id))
    });
    rows.truncate(limit);

    rows.into_iter()
        .map(|r| LeaderboardEntry {
            player_name: r.player_name,
            score: r.score,
            completion_time: r.completion_time,
            percentage: r.percentage,
        })
        .collect()
}
