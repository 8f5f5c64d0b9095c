//! End-to-end tests of the review lifecycle against a real SQLite store.

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use retain_core::{
    latest_review_date, AttemptType, ClassifierOutcome, ComparisonRequest, Difficulty, FallbackReason, FixedClock,
    Judgment, LlmClassifier, MemoryClassifier, MemoryRating, NewProblem, RetainError,
    ReviewEngine, ReviewRepository, ReviewScheduler, ReviewSubmission, SqliteStore,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 9, 1).unwrap()
}

fn plus(days: u64) -> NaiveDate {
    today().checked_add_days(Days::new(days)).unwrap()
}

/// Classifier that always returns the same rating, after a short delay so
/// concurrent callers overlap.
struct FixedRating {
    rating: MemoryRating,
    delay: Duration,
    calls: AtomicUsize,
}

impl FixedRating {
    fn new(rating: MemoryRating) -> Arc<Self> {
        Arc::new(Self {
            rating,
            delay: Duration::from_millis(20),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl MemoryClassifier for FixedRating {
    async fn compare(&self, _request: &ComparisonRequest) -> ClassifierOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        ClassifierOutcome::Judged(Judgment {
            summary: "Same approach as before.".to_string(),
            rating: self.rating,
        })
    }
}

fn engine(store: Arc<SqliteStore>, classifier: Arc<dyn MemoryClassifier>) -> ReviewEngine {
    ReviewEngine::with_scheduler(
        store,
        classifier,
        ReviewScheduler::with_clock(Arc::new(FixedClock(today()))),
    )
}

fn problem(external_ref: &str) -> NewProblem {
    NewProblem::new(external_ref, "Merge Intervals", Difficulty::Medium, "sort then sweep")
        .with_description("Merge all overlapping intervals.")
        .with_tags(["array", "sorting"])
}

#[tokio::test]
async fn test_full_review_cycle() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let classifier = FixedRating::new(MemoryRating::Remembered);
    let engine = engine(store.clone(), classifier.clone());

    let created = engine.create_problem("alice", problem("56")).await.unwrap();
    let problem_id = created.problem().id;
    assert_eq!(created.schedule().next_review_date, plus(5));

    // Not due until five days out
    assert!(engine.list_due("alice", Some(plus(4))).await.unwrap().is_empty());
    assert_eq!(engine.list_due("alice", Some(plus(5))).await.unwrap().len(), 1);

    let mut expected = 5u32;
    for _ in 0..3 {
        let result = engine
            .submit_review("alice", problem_id, ReviewSubmission::new("sort by start, merge"))
            .await
            .unwrap();
        expected = (expected * 2).max(10);
        assert_eq!(result.schedule.current_interval_days, expected);
        assert_eq!(result.schedule.next_review_date, plus(expected as u64));
        assert_eq!(result.schedule.last_review_date, Some(today()));
    }
    assert_eq!(expected, 40);
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 3);

    let history = engine.problem_history("alice", problem_id).await.unwrap();
    assert_eq!(history.len(), 4);
    assert_eq!(history[0].attempt_type, AttemptType::Original);
    assert!(history[1..].iter().all(|a| a.attempt_type == AttemptType::Review));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reviews_do_not_lose_updates() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let engine = Arc::new(engine(store.clone(), FixedRating::new(MemoryRating::Remembered)));

    let problem_id = engine
        .create_problem("alice", problem("56"))
        .await
        .unwrap()
        .problem()
        .id;

    let handles: Vec<_> = (0..2)
        .map(|i| {
            let engine = engine.clone();
            tokio::spawn(async move {
                engine
                    .submit_review("alice", problem_id, ReviewSubmission::new(format!("attempt {}", i)))
                    .await
            })
        })
        .collect();

    let mut intervals = Vec::new();
    for handle in handles {
        intervals.push(handle.await.unwrap().unwrap().schedule.current_interval_days);
    }
    intervals.sort_unstable();

    // Each advance builds on the previous one: 5 -> 10 -> 20
    assert_eq!(intervals, vec![10, 20]);

    let schedule = store.find_schedule("alice", problem_id).await.unwrap().unwrap();
    assert_eq!(schedule.current_interval_days, 20);
    assert_eq!(schedule.version, 2);
}

#[tokio::test]
async fn test_unconfigured_classifier_still_completes_review() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let engine = engine(store.clone(), Arc::new(LlmClassifier::unconfigured("Gemini")));

    let problem_id = engine
        .create_problem("alice", problem("56"))
        .await
        .unwrap()
        .problem()
        .id;

    let result = engine
        .submit_review("alice", problem_id, ReviewSubmission::new("sort then sweep"))
        .await
        .unwrap();

    assert_eq!(
        result.fallback,
        Some(FallbackReason::NotConfigured {
            service: "Gemini".to_string()
        })
    );
    assert_eq!(result.attempt.memory_rating, Some(MemoryRating::Forgot));
    assert_eq!(
        result.attempt.feedback_summary.as_deref(),
        Some("Gemini not configured.")
    );
    assert_eq!(result.schedule.current_interval_days, 5);
    assert_eq!(result.schedule.next_review_date, plus(5));

    // Persisted with the fallback verdict
    let stored = engine
        .get_attempt_with_original("alice", result.attempt.id)
        .await
        .unwrap();
    assert_eq!(stored.attempt.memory_rating, Some(MemoryRating::Forgot));
    assert_eq!(stored.original.approach_text, "sort then sweep");

    let weak = engine.list_weak("alice").await.unwrap();
    assert_eq!(weak.len(), 1);
}

#[tokio::test]
async fn test_relog_then_judged_review() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let classifier = FixedRating::new(MemoryRating::Partial);
    let engine = engine(store, classifier.clone());

    engine.create_problem("alice", problem("56")).await.unwrap();
    let relogged = engine.create_problem("alice", problem("56")).await.unwrap();
    assert!(!relogged.is_created());
    assert_eq!(relogged.schedule().current_interval_days, 10);
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);

    // A re-log is never weak
    assert!(engine.list_weak("alice").await.unwrap().is_empty());

    let result = engine
        .submit_review("alice", relogged.problem().id, ReviewSubmission::new("merge"))
        .await
        .unwrap();
    assert_eq!(result.schedule.current_interval_days, 15);
    assert_eq!(engine.list_weak("alice").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_users_are_isolated() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let engine = engine(store, FixedRating::new(MemoryRating::Forgot));

    let alice = engine.create_problem("alice", problem("56")).await.unwrap();
    let bob = engine.create_problem("bob", problem("56")).await.unwrap();

    // Same reference, separate problems
    assert!(bob.is_created());
    assert_ne!(alice.problem().id, bob.problem().id);

    let err = engine.get_problem("bob", alice.problem().id).await.unwrap_err();
    assert!(matches!(err, RetainError::NotFound { .. }));

    let err = engine
        .submit_review("bob", alice.problem().id, ReviewSubmission::new("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, RetainError::NotFound { .. }));

    let due = engine.list_due("bob", Some(plus(30))).await.unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].problem.id, bob.problem().id);

    let dashboard = engine.dashboard("alice").await.unwrap();
    assert_eq!(dashboard.total_problems, 1);
    assert_eq!(dashboard.total_attempts, 1);
}

#[tokio::test]
async fn test_long_growth_stops_at_latest_review_date() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let engine = engine(store, FixedRating::new(MemoryRating::Remembered));

    let problem_id = engine
        .create_problem("alice", problem("56"))
        .await
        .unwrap()
        .problem()
        .id;

    // Re-logs are not gated on the due date, so the interval can keep doubling.
    for _ in 0..40 {
        engine.create_problem("alice", problem("56")).await.unwrap();
    }

    let days_left = (latest_review_date() - today()).num_days() as u32;
    let schedule = engine.get_schedule("alice", problem_id).await.unwrap();
    assert_eq!(schedule.current_interval_days, days_left);
    assert_eq!(schedule.next_review_date, latest_review_date());
    assert_eq!(schedule.version, 40);

    // A judged review past the cap still completes.
    let result = engine
        .submit_review("alice", problem_id, ReviewSubmission::new("sort then sweep"))
        .await
        .unwrap();
    assert_eq!(result.schedule.current_interval_days, days_left);
    assert_eq!(result.schedule.next_review_date, latest_review_date());

    let day_before = latest_review_date().pred_opt().unwrap();
    assert!(engine.list_due("alice", Some(day_before)).await.unwrap().is_empty());
    assert_eq!(
        engine.list_due("alice", Some(latest_review_date())).await.unwrap().len(),
        1
    );
}
