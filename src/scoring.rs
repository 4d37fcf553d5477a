// src/scoring.rs

use std::collections::HashMap;

use crate::models::{
    question::AnswerKey,
    submission::{AnswerDetail, AnswerSubmission, SubmissionResult},
};

/// Scores a submission against the answer keys found in the store.
///
/// `total_questions` is the number of submitted pairs, not the number of
/// matched questions: an id missing from `keys` adds to the denominator but
/// produces no detail line.
pub fn score_submission(
    answers: &[AnswerSubmission],
    keys: &HashMap<String, AnswerKey>,
) -> SubmissionResult {
    let mut correct_answers = 0;
    let mut details = Vec::with_capacity(answers.len());

    for answer in answers {
        let Some(key) = keys.get(&answer.question_id) else {
            continue;
        };

        let is_correct = answer.selected_answer == key.correct_answer_index;
        if is_correct {
            correct_answers += 1;
        }

        details.push(AnswerDetail {
            question_id: answer.question_id.clone(),
            question_text: key.question_text.clone(),
            selected_answer: answer.selected_answer,
            correct_answer: key.correct_answer_index,
            is_correct,
        });
    }

    let total_questions = answers.len();

    SubmissionResult {
        total_questions,
        correct_answers,
        score: percentage(correct_answers, total_questions),
        details,
    }
}

/// `round(100 * correct / total)`, half away from zero; 0 for an empty exam.
pub fn percentage(correct: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((correct as f64 / total as f64) * 100.0).round() as u32
}
