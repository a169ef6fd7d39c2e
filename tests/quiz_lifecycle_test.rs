mod common;

use common::ScriptedGateway;
use unimate_lib::quiz::{
    AnswerValue, CorrectAnswer, QuestionType, QuizEngine, QuizError, QuizPhase, TickOutcome,
    DEFAULT_QUIZ_DURATION_SECS, GENERATION_FAILED_MESSAGE, GRADING_FAILED_MESSAGE,
};

const QUIZ_REPLY: &str = r#"Sure! Here is a quiz on [Programming Fundamentals]:
```json
[
  {"id": 1, "question": "What does 2 + 2 evaluate to?", "type": "multiple-choice",
   "options": ["3", "4", "5", "22"], "correctAnswer": 1},
  {"id": 2, "question": "A while loop always runs at least once.", "type": "true-false",
   "correctAnswer": false},
  {"id": 3, "question": "Name a keyword that starts a loop.", "type": "short-answer",
   "correctAnswer": "for"}
]
```
Good luck!"#;

const GRADE_REPLY: &str = r#"Here is the grading: {"totalQuestions": 3, "correctAnswers": 2, "score": 66.67,
"grade": "C", "feedback": "Review loop semantics.",
"questionResults": [{"questionId": 1, "isCorrect": true, "feedback": "Correct"},
{"questionId": 2, "isCorrect": false, "feedback": "A while loop may run zero times"},
{"questionId": 3, "isCorrect": true, "feedback": "Yes"}]} Keep practicing."#;

fn engine(gateway: ScriptedGateway) -> QuizEngine<ScriptedGateway> {
    QuizEngine::new(gateway, "Programming Fundamentals")
}

async fn ready_quiz(gateway: ScriptedGateway) -> QuizEngine<ScriptedGateway> {
    let mut quiz = engine(gateway);
    quiz.generate().await.unwrap();
    quiz
}

#[tokio::test]
async fn array_inside_prose_is_accepted() {
    let mut quiz = engine(ScriptedGateway::new().reply(QUIZ_REPLY));
    quiz.generate().await.unwrap();

    assert_eq!(quiz.phase(), QuizPhase::Preview);
    assert_eq!(quiz.questions().len(), 3);
    assert_eq!(quiz.questions()[0].correct_answer, CorrectAnswer::Index(1));
    assert_eq!(quiz.questions()[1].options, vec!["True", "False"]);
    assert_eq!(quiz.questions()[1].correct_answer, CorrectAnswer::Index(1));
    assert_eq!(quiz.questions()[2].question_type, QuestionType::ShortAnswer);
    assert_eq!(quiz.timer().unwrap().remaining(), DEFAULT_QUIZ_DURATION_SECS);
    assert!(quiz.last_error().is_none());

    let requests = quiz.gateway().requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].prompt().contains("Programming Fundamentals"));
}

#[tokio::test]
async fn reply_without_array_returns_to_config_with_error() {
    let mut quiz = engine(ScriptedGateway::new().reply("Sorry, I cannot help with that right now."));
    let err = quiz.generate().await.unwrap_err();

    assert!(matches!(err, QuizError::Extract(_)));
    assert_eq!(quiz.phase(), QuizPhase::Config);
    assert_eq!(quiz.last_error(), Some(GENERATION_FAILED_MESSAGE));
    assert!(quiz.questions().is_empty());
}

#[tokio::test]
async fn gateway_failure_during_generation_returns_to_config() {
    let mut quiz = engine(ScriptedGateway::new().fail(500));
    assert!(matches!(quiz.generate().await, Err(QuizError::Gateway(_))));
    assert_eq!(quiz.phase(), QuizPhase::Config);
    assert!(!quiz.last_error().unwrap_or_default().is_empty());
}

#[tokio::test]
async fn generation_requires_a_question_type() {
    let mut quiz = engine(ScriptedGateway::new().reply(QUIZ_REPLY));
    quiz.set_type(QuestionType::MultipleChoice, false).unwrap();
    assert!(!quiz.can_generate());

    assert!(matches!(quiz.generate().await, Err(QuizError::NoQuestionTypes)));
    assert_eq!(quiz.phase(), QuizPhase::Config);
    assert!(quiz.gateway().requests().is_empty());
}

#[tokio::test]
async fn timer_expiry_grades_exactly_once() {
    let mut quiz = ready_quiz(ScriptedGateway::new().reply(QUIZ_REPLY).reply(GRADE_REPLY)).await;

    let mut expirations = 0;
    for second in 1..=DEFAULT_QUIZ_DURATION_SECS + 100 {
        match quiz.tick().await.unwrap() {
            TickOutcome::Expired => {
                expirations += 1;
                assert_eq!(second, DEFAULT_QUIZ_DURATION_SECS);
            }
            TickOutcome::Running { remaining } => assert_eq!(remaining, DEFAULT_QUIZ_DURATION_SECS - second),
            TickOutcome::Idle => assert!(second > DEFAULT_QUIZ_DURATION_SECS),
        }
    }

    assert_eq!(expirations, 1);
    assert_eq!(quiz.gateway().count("grade-quiz"), 1);
    assert_eq!(quiz.phase(), QuizPhase::Results);

    let review = quiz.review();
    assert_eq!(review.len(), 3);
    assert!(review.iter().all(|item| item.your_answer == "Not answered"));
}

#[tokio::test]
async fn failed_auto_submit_is_not_retried_by_later_ticks() {
    let mut quiz = ready_quiz(ScriptedGateway::new().reply(QUIZ_REPLY).fail(502)).await;

    let mut failures = 0;
    for _ in 0..DEFAULT_QUIZ_DURATION_SECS + 5 {
        if quiz.tick().await.is_err() {
            failures += 1;
        }
    }

    assert_eq!(failures, 1);
    assert_eq!(quiz.gateway().count("grade-quiz"), 1);
    assert_eq!(quiz.phase(), QuizPhase::Preview);
    assert_eq!(quiz.last_error(), Some(GRADING_FAILED_MESSAGE));
}

#[tokio::test]
async fn recording_twice_keeps_latest_answer() {
    let mut quiz = ready_quiz(ScriptedGateway::new().reply(QUIZ_REPLY)).await;

    quiz.record_answer(0, AnswerValue::Choice(0)).unwrap();
    quiz.record_answer(0, AnswerValue::Choice(1)).unwrap();
    quiz.record_answer(2, AnswerValue::Text("while".into())).unwrap();
    quiz.record_answer(2, AnswerValue::Text("for".into())).unwrap();

    let answers = quiz.answers().unwrap();
    assert_eq!(answers.len(), 2);
    assert_eq!(answers.get(0), Some(&AnswerValue::Choice(1)));
    assert_eq!(answers.get(2), Some(&AnswerValue::Text("for".into())));

    assert!(matches!(
        quiz.record_answer(7, AnswerValue::Choice(0)),
        Err(QuizError::QuestionOutOfRange { index: 7, count: 3 })
    ));
}

#[tokio::test]
async fn grading_failure_keeps_preview_and_timer() {
    let mut quiz = ready_quiz(ScriptedGateway::new().reply(QUIZ_REPLY).reply("no json here").reply(GRADE_REPLY)).await;
    quiz.record_answer(0, AnswerValue::Choice(1)).unwrap();
    for _ in 0..10 {
        quiz.tick().await.unwrap();
    }

    assert!(quiz.submit().await.is_err());
    assert_eq!(quiz.phase(), QuizPhase::Preview);
    assert_eq!(quiz.last_error(), Some(GRADING_FAILED_MESSAGE));
    assert_eq!(quiz.answers().unwrap().len(), 1);
    assert_eq!(quiz.timer().unwrap().remaining(), DEFAULT_QUIZ_DURATION_SECS - 10);

    assert_eq!(quiz.tick().await.unwrap(), TickOutcome::Running { remaining: DEFAULT_QUIZ_DURATION_SECS - 11 });

    quiz.submit().await.unwrap();
    assert_eq!(quiz.phase(), QuizPhase::Results);
    assert!(quiz.last_error().is_none());
}

#[tokio::test]
async fn grading_request_lists_every_question_and_answer() {
    let mut quiz = ready_quiz(ScriptedGateway::new().reply(QUIZ_REPLY).reply(GRADE_REPLY)).await;
    quiz.record_answer(0, AnswerValue::Choice(1)).unwrap();
    quiz.submit().await.unwrap();

    let requests = quiz.gateway().requests();
    let prompt = requests[1].prompt();
    assert!(prompt.contains("What does 2 + 2 evaluate to?"));
    assert!(prompt.contains("Student answer: 4"));
    assert!(prompt.contains("Correct answer: False"));
    assert!(prompt.contains("Student answer: Not answered"));

    let result = quiz.result().unwrap();
    assert_eq!(result.correct_answers, 2);
    assert_eq!(result.grade, "C");

    let review = quiz.review();
    assert_eq!(review[0].your_answer, "4");
    assert_eq!(review[1].is_correct, Some(false));
    assert_eq!(review[1].feedback, "A while loop may run zero times");
}

#[tokio::test]
async fn reset_returns_to_config_and_discards_attempt() {
    let mut quiz = ready_quiz(ScriptedGateway::new().reply(QUIZ_REPLY).reply(GRADE_REPLY)).await;
    quiz.set_question_count(5).unwrap_err();
    quiz.submit().await.unwrap();

    quiz.reset();
    assert_eq!(quiz.phase(), QuizPhase::Config);
    assert!(quiz.result().is_none());
    assert!(quiz.answers().is_none());
    assert!(quiz.review().is_empty());
    assert_eq!(quiz.tick().await.unwrap(), TickOutcome::Idle);
    assert_eq!(quiz.set_question_count(5).unwrap(), 5);
}

#[tokio::test]
async fn submit_outside_preview_is_rejected() {
    let mut quiz = engine(ScriptedGateway::new());
    assert!(matches!(
        quiz.submit().await,
        Err(QuizError::InvalidTransition { phase: QuizPhase::Config, .. })
    ));
    assert!(quiz.gateway().requests().is_empty());
}
