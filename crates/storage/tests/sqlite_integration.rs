use chrono::Duration;
use exam_core::band::Band;
use exam_core::model::{
    ObjectiveScore, RESULT_SCHEMA_VERSION, ResultRecord, Section, TaskWordCount, WrittenResponse,
    WrittenSummary,
};
use exam_core::time::fixed_now;
use storage::repository::{ResultRepository, Storage, StorageError};
use storage::sqlite::SqliteRepository;
use uuid::Uuid;

fn build_record(student: &str, minutes_after: i64) -> ResultRecord {
    let completed_at = fixed_now() + Duration::minutes(minutes_after);
    ResultRecord {
        schema_version: RESULT_SCHEMA_VERSION,
        attempt_id: Uuid::new_v4(),
        definition: "ielts".into(),
        title: "IELTS Academic Mock Test".into(),
        student: student.into(),
        started_at: fixed_now(),
        completed_at,
        objective: vec![
            ObjectiveScore {
                section: Section::Reading,
                score: 40,
                total: 40,
                percentage: 100,
                band: Band::from_tenths(90),
            },
            ObjectiveScore {
                section: Section::Listening,
                score: 30,
                total: 40,
                percentage: 75,
                band: Band::from_tenths(75),
            },
        ],
        written: vec![WrittenSummary {
            section: Section::Writing,
            tasks: vec![TaskWordCount {
                title: "Task 1".into(),
                words: 152,
                min_words: 150,
            }],
            band: Some(Band::from_tenths(60)),
        }],
        responses: vec![WrittenResponse {
            section: Section::Writing,
            task: 1,
            text: "The chart shows...".into(),
        }],
        overall_band: Some(Band::from_tenths(75)),
        completed: true,
    }
}

#[tokio::test]
async fn sqlite_roundtrip_preserves_record() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_results_roundtrip?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let record = build_record("Abduraxmatov Abdulaziz", 0);
    let id = repo.append_result(&record).await.expect("append");

    let fetched = repo.get_result(id).await.expect("fetch");
    assert_eq!(fetched, record);
    assert_eq!(
        fetched.objective_score(Section::Listening).unwrap().band,
        Band::from_tenths(75)
    );

    assert!(matches!(
        repo.get_result(id + 100).await.unwrap_err(),
        StorageError::NotFound
    ));
}

#[tokio::test]
async fn sqlite_rejects_duplicate_attempts() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_results_dupes?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let record = build_record("a", 0);
    repo.append_result(&record).await.expect("append");
    assert!(matches!(
        repo.append_result(&record).await.unwrap_err(),
        StorageError::Conflict
    ));
}

#[tokio::test]
async fn sqlite_lists_newest_first_with_limit() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_results_list?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    repo.append_result(&build_record("early", 0)).await.unwrap();
    repo.append_result(&build_record("late", 90)).await.unwrap();
    repo.append_result(&build_record("middle", 45)).await.unwrap();

    let rows = repo.list_results(10).await.unwrap();
    let students: Vec<_> = rows.iter().map(|r| r.record.student.as_str()).collect();
    assert_eq!(students, ["late", "middle", "early"]);

    let limited = repo.list_results(2).await.unwrap();
    assert_eq!(limited.len(), 2);
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_results_migrate?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("first migrate");
    repo.migrate().await.expect("second migrate");

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_migrations")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!(applied, 1);
}

#[tokio::test]
async fn storage_sqlite_wires_result_repository() {
    let storage = Storage::sqlite("sqlite:file:memdb_results_storage?mode=memory&cache=shared")
        .await
        .expect("storage");
    let id = storage
        .results
        .append_result(&build_record("b", 5))
        .await
        .unwrap();
    assert_eq!(storage.results.get_result(id).await.unwrap().student, "b");
}
