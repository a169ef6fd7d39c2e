use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Question;

/// A recorded answer: an option index for choice questions, free text for
/// short-answer ones.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum AnswerValue {
    Choice(usize),
    Text(String),
}

/// Answers keyed by question index. Recording twice for the same index keeps
/// only the latest value.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct AnswerSheet {
    answers: BTreeMap<usize, AnswerValue>,
}

impl AnswerSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, question_index: usize, value: AnswerValue) -> Option<AnswerValue> {
        self.answers.insert(question_index, value)
    }

    pub fn get(&self, question_index: usize) -> Option<&AnswerValue> {
        self.answers.get(&question_index)
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &AnswerValue)> {
        self.answers.iter().map(|(idx, value)| (*idx, value))
    }

    /// How the answer reads to a grader; `"Not answered"` when absent.
    pub fn label_for(&self, question_index: usize, question: &Question) -> String {
        match self.get(question_index) {
            None => "Not answered".to_string(),
            Some(AnswerValue::Choice(i)) => question
                .options
                .get(*i)
                .cloned()
                .unwrap_or_else(|| format!("option {}", i + 1)),
            Some(AnswerValue::Text(text)) if text.trim().is_empty() => "Not answered".to_string(),
            Some(AnswerValue::Text(text)) => text.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    #[serde(default)]
    pub question_id: Option<u32>,
    #[serde(alias = "correct")]
    pub is_correct: bool,
    #[serde(default)]
    pub feedback: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GradingResult {
    #[serde(alias = "total")]
    pub total_questions: u32,
    #[serde(alias = "correct")]
    pub correct_answers: u32,
    #[serde(alias = "percentage")]
    pub score: f64,
    pub grade: String,
    #[serde(default, alias = "overallFeedback")]
    pub feedback: String,
    #[serde(default, alias = "results")]
    pub question_results: Vec<QuestionResult>,
}

impl GradingResult {
    pub fn validate(&self) -> Result<(), String> {
        if self.correct_answers > self.total_questions {
            return Err(format!(
                "{} correct answers reported out of {} questions",
                self.correct_answers, self.total_questions
            ));
        }
        if !(0.0..=100.0).contains(&self.score) {
            return Err(format!("score {} is not a percentage", self.score));
        }
        if self.grade.trim().is_empty() {
            return Err("grade is empty".to_string());
        }
        Ok(())
    }

    /// Grader verdict for the question at `index`, matched by id first and
    /// by position otherwise.
    pub fn result_for(&self, index: usize, question: &Question) -> Option<&QuestionResult> {
        self.question_results
            .iter()
            .find(|r| r.question_id == Some(question.id))
            .or_else(|| self.question_results.get(index))
    }
}

/// One row of the post-grading review.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ReviewItem {
    pub question: String,
    pub your_answer: String,
    pub correct_answer: String,
    pub is_correct: Option<bool>,
    pub feedback: String,
}
