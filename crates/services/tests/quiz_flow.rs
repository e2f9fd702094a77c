use std::sync::Arc;
use std::time::Duration;

use quiz_core::model::{Question, QuestionSet, QuizStats};
use quiz_core::session::{AnswerOutcome, Transition};
use quiz_core::time::fixed_clock;
use serde_json::json;
use services::{
    BankQuestionSource, GenerationConfig, LlmQuestionSource, QuestionSource, QuizError,
    QuizLoopService,
};
use storage::repository::{InMemoryRepository, SeenQuestionRepository, StatsRepository};

const DELAY: Duration = Duration::from_millis(1500);

fn three_questions() -> QuestionSet {
    let question = |text: &str, correct: usize| {
        Question::new(
            text,
            vec!["A".into(), "B".into(), "C".into(), "D".into()],
            correct,
            Some(format!("{text} explained")),
        )
        .unwrap()
    };
    QuestionSet::from_questions(vec![
        question("First?", 0),
        question("Second?", 1),
        question("Third?", 2),
    ])
}

fn loop_service(repo: &InMemoryRepository, source: Arc<dyn QuestionSource>) -> QuizLoopService {
    QuizLoopService::new(
        fixed_clock(),
        source,
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
    )
    .with_advance_delay(DELAY)
}

#[tokio::test(start_paused = true)]
async fn correct_incorrect_correct_scores_two_of_three() {
    let repo = InMemoryRepository::new();
    let source = Arc::new(BankQuestionSource::builtin().unwrap());
    let service = loop_service(&repo, source);
    let mut session = service.start(three_questions()).unwrap();

    assert_eq!(session.submit_answer(0), AnswerOutcome::Correct { correct: 0 });
    assert_eq!(
        session.wait_for_advance().await,
        Some(Transition::Advanced { index: 1 })
    );
    assert_eq!(
        session.submit_answer(3),
        AnswerOutcome::Incorrect {
            chosen: 3,
            correct: 1
        }
    );
    session.wait_for_advance().await;
    assert_eq!(session.submit_answer(2), AnswerOutcome::Correct { correct: 2 });
    assert_eq!(session.wait_for_advance().await, Some(Transition::Completed));

    let completion = service.finish(&mut session).await.unwrap();
    assert_eq!(
        (
            completion.summary.score,
            completion.summary.total,
            completion.summary.percentage
        ),
        (2, 3, 67)
    );
    assert_eq!(
        completion.stats,
        QuizStats {
            quizzes_taken: 1,
            average_score: 67
        }
    );

    let review = session.answers();
    assert_eq!(review.len(), 3);
    assert!(review[0].correct && !review[1].correct && review[2].correct);
    assert_eq!(repo.list_seen(10).await.unwrap().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn running_stats_compound_across_quizzes() {
    let repo = InMemoryRepository::new();
    let set = QuestionSet::from_questions(
        (0..4)
            .map(|i| Question::new(format!("Q{i}"), vec!["x".into(), "y".into()], 0, None).unwrap())
            .collect(),
    );
    let service = loop_service(&repo, Arc::new(BankQuestionSource::builtin().unwrap()));

    for correct_answers in [3, 2] {
        let mut session = service.start(set.clone()).unwrap();
        for i in 0..4 {
            session.submit_answer(usize::from(i >= correct_answers));
            session.wait_for_advance().await;
        }
        service.finish(&mut session).await.unwrap();
    }

    assert_eq!(
        repo.load_stats().await.unwrap(),
        Some(QuizStats {
            quizzes_taken: 2,
            average_score: 63
        })
    );
}

#[tokio::test]
async fn generated_quiz_runs_end_to_end() {
    let payload = json!({
        "questions": [
            { "text": "What does UAS stand for?", "options": ["Unmanned Aircraft System", "Universal Air Service"], "correctAnswer": 0 },
            { "text": "Max open category height?", "options": ["50 m", "120 m", "300 m"], "correctAnswer": 1, "explanation": null }
        ]
    });
    let body = json!({ "choices": [{ "message": { "content": payload.to_string() } }] });

    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(body.to_string())
        .create_async()
        .await;

    let config = GenerationConfig::new(&server.url(), "key").unwrap();
    let repo = InMemoryRepository::new();
    let service = loop_service(&repo, Arc::new(LlmQuestionSource::new(Some(config))))
        .with_advance_delay(Duration::from_millis(5));

    let mut session = service.new_quiz(2).await.unwrap();
    mock.assert_async().await;
    while let Some(question) = session.snapshot().question {
        session.submit_answer(question.correct_answer());
        session.wait_for_advance().await;
    }
    let completion = service.finish(&mut session).await.unwrap();
    assert!(completion.summary.is_perfect());
    assert_eq!(completion.stats.average_score, 100);
}

#[tokio::test]
async fn failures_keep_their_class() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(503)
        .create_async()
        .await;
    let config = GenerationConfig::new(&server.url(), "key").unwrap();
    let repo = InMemoryRepository::new();
    let service = loop_service(&repo, Arc::new(LlmQuestionSource::new(Some(config))));
    assert!(matches!(
        service.new_quiz(3).await.unwrap_err(),
        QuizError::Generation(_)
    ));

    let bad = json!({ "questions": [{ "text": "Q", "options": ["a", "b", "c", "d"], "correctAnswer": 4 }] });
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(json!({ "choices": [{ "message": { "content": bad.to_string() } }] }).to_string())
        .create_async()
        .await;
    let config = GenerationConfig::new(&server.url(), "key").unwrap();
    let service = loop_service(&repo, Arc::new(LlmQuestionSource::new(Some(config))));
    match service.new_quiz(1).await.unwrap_err() {
        QuizError::Validation(err) => assert_eq!(err.index, Some(0)),
        other => panic!("unexpected error {other:?}"),
    }

    let empty = service.start(QuestionSet::from_questions(Vec::new()));
    assert!(matches!(empty.unwrap_err(), QuizError::EmptyQuestionSet(_)));
}
