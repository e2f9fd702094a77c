use chrono::Duration;
use quiz_core::model::{QuizStats, QuizSummary, SeenQuestion};
use quiz_core::time::fixed_now;
use storage::repository::{SEEN_LOG_CAP, SeenQuestionRepository, StatsRepository, Storage};
use storage::sqlite::{STATS_KEY, SqliteRepository};

async fn connect(name: &str) -> SqliteRepository {
    let repo = SqliteRepository::connect(&format!("sqlite:file:{name}?mode=memory&cache=shared"))
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_stats_round_trip_as_json() {
    let repo = connect("memdb_stats").await;
    assert_eq!(repo.load_stats().await.unwrap(), None);

    let stats = QuizStats::default().record(&QuizSummary::new(3, 4));
    repo.save_stats(&stats).await.unwrap();
    let updated = stats.record(&QuizSummary::new(2, 4));
    repo.save_stats(&updated).await.unwrap();

    assert_eq!(repo.load_stats().await.unwrap(), Some(updated));

    let raw: String = sqlx::query_scalar("SELECT value FROM client_state WHERE key = ?1")
        .bind(STATS_KEY)
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!(raw, r#"{"quizzesTaken":2,"averageScore":63}"#);
}

#[tokio::test]
async fn sqlite_seen_log_appends_and_caps() {
    let repo = connect("memdb_seen").await;
    let now = fixed_now();

    repo.append_seen(&[SeenQuestion::new("What is a UAS?", now)])
        .await
        .unwrap();
    let batch: Vec<_> = (0..SEEN_LOG_CAP)
        .map(|n| SeenQuestion::new(format!("Q{n}"), now + Duration::minutes(1)))
        .collect();
    repo.append_seen(&batch).await.unwrap();

    let all = repo.list_seen(usize::MAX).await.unwrap();
    assert_eq!(all.len(), SEEN_LOG_CAP);
    assert_eq!(all[0].text, "Q0");

    let recent = repo.list_seen(2).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[1].text, format!("Q{}", SEEN_LOG_CAP - 1));
}

#[tokio::test]
async fn sqlite_rejects_corrupt_stats_record() {
    let repo = connect("memdb_corrupt").await;
    sqlx::query("INSERT INTO client_state (key, value, updated_at) VALUES (?1, ?2, ?3)")
        .bind(STATS_KEY)
        .bind("not json")
        .bind(fixed_now())
        .execute(repo.pool())
        .await
        .unwrap();

    let err = repo.load_stats().await.unwrap_err();
    assert!(err.to_string().starts_with("serialization error"));
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let repo = connect("memdb_migrate").await;
    repo.migrate().await.expect("second migrate");
}

#[tokio::test]
async fn storage_sqlite_wires_both_repositories() {
    let storage = Storage::sqlite("sqlite:file:memdb_storage?mode=memory&cache=shared")
        .await
        .unwrap();
    storage
        .seen
        .append_seen(&[SeenQuestion::new("Q", fixed_now())])
        .await
        .unwrap();
    assert_eq!(storage.seen.list_seen(10).await.unwrap().len(), 1);
    assert_eq!(storage.stats.load_stats().await.unwrap(), None);
}
