use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QuestionType {
    #[serde(
        rename = "multiple-choice",
        alias = "multiple_choice",
        alias = "multipleChoice",
        alias = "mcq"
    )]
    MultipleChoice,
    #[serde(
        rename = "true-false",
        alias = "true_false",
        alias = "trueFalse",
        alias = "true/false"
    )]
    TrueFalse,
    #[serde(rename = "short-answer", alias = "short_answer", alias = "shortAnswer")]
    ShortAnswer,
}

impl QuestionType {
    pub const ALL: [QuestionType; 3] = [
        QuestionType::MultipleChoice,
        QuestionType::TrueFalse,
        QuestionType::ShortAnswer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple-choice",
            QuestionType::TrueFalse => "true-false",
            QuestionType::ShortAnswer => "short-answer",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "Multiple Choice",
            QuestionType::TrueFalse => "True / False",
            QuestionType::ShortAnswer => "Short Answer",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical answer as the model sends it: an option index, free text, or
/// (for true/false questions) a bare boolean.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum CorrectAnswer {
    Index(usize),
    Flag(bool),
    Text(String),
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(default)]
    pub id: u32,
    #[serde(alias = "text", alias = "questionText")]
    pub question: String,
    #[serde(rename = "type", alias = "questionType")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(alias = "correct", alias = "answer", alias = "correct_answer")]
    pub correct_answer: CorrectAnswer,
}

impl Question {
    /// Brings a model-supplied question into canonical form: true/false
    /// questions get their two options and an index answer, choice answers
    /// given as text are mapped to their option index.
    pub fn normalize(mut self) -> Result<Self, String> {
        if self.question.trim().is_empty() {
            return Err("question text is empty".to_string());
        }

        match self.question_type {
            QuestionType::TrueFalse => {
                if self.options.is_empty() {
                    self.options = vec!["True".to_string(), "False".to_string()];
                }
                self.correct_answer = match self.correct_answer {
                    CorrectAnswer::Flag(true) => CorrectAnswer::Index(0),
                    CorrectAnswer::Flag(false) => CorrectAnswer::Index(1),
                    other => other,
                };
                self.resolve_choice_answer()?;
            }
            QuestionType::MultipleChoice => {
                if self.options.len() < 2 {
                    return Err(format!(
                        "multiple-choice question '{}' has {} options",
                        self.question,
                        self.options.len()
                    ));
                }
                self.resolve_choice_answer()?;
            }
            QuestionType::ShortAnswer => {
                self.options.clear();
                self.correct_answer = match self.correct_answer {
                    CorrectAnswer::Index(i) => CorrectAnswer::Text(i.to_string()),
                    CorrectAnswer::Flag(b) => CorrectAnswer::Text(b.to_string()),
                    text => text,
                };
            }
        }

        Ok(self)
    }

    fn resolve_choice_answer(&mut self) -> Result<(), String> {
        let index = match &self.correct_answer {
            CorrectAnswer::Index(i) => *i,
            CorrectAnswer::Text(text) => self
                .options
                .iter()
                .position(|opt| opt.trim().eq_ignore_ascii_case(text.trim()))
                .ok_or_else(|| format!("answer '{}' is not one of the options", text))?,
            CorrectAnswer::Flag(b) => {
                let wanted = if *b { "true" } else { "false" };
                self.options
                    .iter()
                    .position(|opt| opt.trim().eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| format!("answer '{}' is not one of the options", wanted))?
            }
        };

        if index >= self.options.len() {
            return Err(format!(
                "answer index {} is out of range for {} options",
                index,
                self.options.len()
            ));
        }
        self.correct_answer = CorrectAnswer::Index(index);
        Ok(())
    }

    pub fn has_options(&self) -> bool {
        self.question_type != QuestionType::ShortAnswer
    }

    /// Human-readable form of the canonical answer.
    pub fn correct_answer_label(&self) -> String {
        match &self.correct_answer {
            CorrectAnswer::Index(i) => self
                .options
                .get(*i)
                .cloned()
                .unwrap_or_else(|| format!("option {}", i + 1)),
            CorrectAnswer::Flag(b) => b.to_string(),
            CorrectAnswer::Text(text) => text.clone(),
        }
    }
}

/// Normalizes every question and renumbers ids when the model left them
/// missing or duplicated.
pub fn normalize_questions(questions: Vec<Question>) -> Result<Vec<Question>, String> {
    let mut normalized = questions
        .into_iter()
        .map(Question::normalize)
        .collect::<Result<Vec<_>, _>>()?;

    let mut ids: Vec<u32> = normalized.iter().map(|q| q.id).collect();
    ids.sort_unstable();
    ids.dedup();
    if ids.len() != normalized.len() || ids.contains(&0) {
        for (idx, question) in normalized.iter_mut().enumerate() {
            question.id = idx as u32 + 1;
        }
    }

    Ok(normalized)
}
