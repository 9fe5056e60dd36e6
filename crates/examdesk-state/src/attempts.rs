//! Exam attempts and unlocked courses.
//!
//! [`ExamAttemptStore`] keeps one record per test ID and the set of courses
//! the learner has unlocked. Every mutation is written through to the
//! backing store before it becomes visible in memory.
//!
//! An attempt moves `not-started → in-progress → completed`. Completion only
//! happens through [`ExamAttemptStore::complete_test`]; a retake goes back
//! through [`ExamAttemptStore::reset_attempt`].

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::Result;
use crate::store::{SharedStore, keys, load_json, save_json};

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// Where an attempt is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttemptStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AttemptStatus::NotStarted => "not-started",
            AttemptStatus::InProgress => "in-progress",
            AttemptStatus::Completed => "completed",
        };
        f.pad(s)
    }
}

/// The learner's answer to one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    pub question_id: String,
    #[serde(default)]
    pub selected: Vec<String>,
    #[serde(default)]
    pub correct: bool,
}

/// One exam attempt, keyed by `test_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamAttempt {
    pub test_id: String,
    #[serde(default)]
    pub status: AttemptStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Seconds spent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_spent: Option<u64>,
    #[serde(default)]
    pub questions: Vec<QuestionResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrong_count: Option<u32>,
    /// Set exactly when `status` is `Completed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ExamAttempt {
    /// A fresh, not-started attempt.
    pub fn new(test_id: impl Into<String>) -> Self {
        Self {
            test_id: test_id.into(),
            status: AttemptStatus::NotStarted,
            score: None,
            time_spent: None,
            questions: Vec::new(),
            correct_count: None,
            wrong_count: None,
            completed_at: None,
        }
    }

    /// A fresh attempt already in progress.
    pub fn in_progress(test_id: impl Into<String>) -> Self {
        Self {
            status: AttemptStatus::InProgress,
            ..Self::new(test_id)
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn is_completed(&self) -> bool {
        self.status == AttemptStatus::Completed
    }

    fn normalize(&mut self, now: DateTime<Utc>) {
        match self.status {
            AttemptStatus::Completed => {
                self.completed_at.get_or_insert(now);
            }
            _ => self.completed_at = None,
        }
    }

    fn clear_results(&mut self) {
        self.status = AttemptStatus::NotStarted;
        self.score = None;
        self.time_spent = None;
        self.questions.clear();
        self.correct_count = None;
        self.wrong_count = None;
        self.completed_at = None;
    }
}

/// Results recorded when a test is completed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestCompletion {
    pub score: f64,
    pub time_spent: u64,
    pub questions: Vec<QuestionResult>,
    pub correct_count: u32,
    pub wrong_count: u32,
}

/// Everything the store holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Progress {
    pub unlocked_courses: Vec<String>,
    pub attempts: Vec<ExamAttempt>,
}

impl Progress {
    fn position(&self, test_id: &str) -> Option<usize> {
        self.attempts.iter().position(|a| a.test_id == test_id)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ExamAttemptStore
// ─────────────────────────────────────────────────────────────────────────────

struct Inner {
    store: SharedStore,
    progress: Mutex<Progress>,
    changes: watch::Sender<Progress>,
}

/// Persisted exam progress.
#[derive(Clone)]
pub struct ExamAttemptStore {
    inner: Arc<Inner>,
}

impl ExamAttemptStore {
    /// Load progress from `store`.
    ///
    /// Corrupt entries are dropped. Duplicate course IDs and duplicate
    /// attempts are collapsed, keeping the last record for each test ID.
    pub fn open(store: SharedStore) -> Self {
        let mut unlocked: Vec<String> =
            load_json(store.as_ref(), keys::UNLOCKED_COURSES).unwrap_or_default();
        let mut seen = std::collections::HashSet::new();
        unlocked.retain(|id| seen.insert(id.clone()));

        let loaded: Vec<ExamAttempt> =
            load_json(store.as_ref(), keys::TEST_ATTEMPTS).unwrap_or_default();
        let now = Utc::now();
        let mut attempts: Vec<ExamAttempt> = Vec::with_capacity(loaded.len());
        for mut attempt in loaded {
            attempt.normalize(now);
            match attempts.iter().position(|a| a.test_id == attempt.test_id) {
                Some(i) => attempts[i] = attempt,
                None => attempts.push(attempt),
            }
        }

        debug!(
            courses = unlocked.len(),
            attempts = attempts.len(),
            "Loaded exam progress"
        );

        let progress = Progress {
            unlocked_courses: unlocked,
            attempts,
        };
        Self {
            inner: Arc::new(Inner {
                store,
                changes: watch::Sender::new(progress.clone()),
                progress: Mutex::new(progress),
            }),
        }
    }

    // ── Courses ────────────────────────────────────────────────────────────

    /// Unlock `course_id`. Returns `false` if it was already unlocked.
    pub fn unlock_course_access(&self, course_id: &str) -> Result<bool> {
        self.update(|p| {
            if p.unlocked_courses.iter().any(|c| c == course_id) {
                return None;
            }
            p.unlocked_courses.push(course_id.to_string());
            Some(keys::UNLOCKED_COURSES)
        })
    }

    pub fn has_course_access(&self, course_id: &str) -> bool {
        self.inner
            .progress
            .lock()
            .unlocked_courses
            .iter()
            .any(|c| c == course_id)
    }

    pub fn unlocked_courses(&self) -> Vec<String> {
        self.inner.progress.lock().unlocked_courses.clone()
    }

    // ── Attempts ───────────────────────────────────────────────────────────

    /// Insert or fully replace the attempt with the same test ID.
    ///
    /// `completed_at` is cleared on records that are not completed and
    /// stamped on completed records that lack one.
    pub fn save_test_attempt(&self, mut attempt: ExamAttempt) -> Result<()> {
        attempt.normalize(Utc::now());
        self.update(|p| {
            match p.position(&attempt.test_id) {
                Some(i) => p.attempts[i] = attempt,
                None => p.attempts.push(attempt),
            }
            Some(keys::TEST_ATTEMPTS)
        })?;
        Ok(())
    }

    pub fn get_test_attempt(&self, test_id: &str) -> Option<ExamAttempt> {
        self.inner
            .progress
            .lock()
            .attempts
            .iter()
            .find(|a| a.test_id == test_id)
            .cloned()
    }

    /// Mark an existing attempt completed with `results`.
    ///
    /// Returns `false`, changing nothing, if there is no attempt for
    /// `test_id`.
    pub fn complete_test(&self, test_id: &str, results: TestCompletion) -> Result<bool> {
        let now = Utc::now();
        let completed = self.update(|p| {
            let i = p.position(test_id)?;
            let attempt = &mut p.attempts[i];
            attempt.status = AttemptStatus::Completed;
            attempt.score = Some(results.score);
            attempt.time_spent = Some(results.time_spent);
            attempt.questions = results.questions;
            attempt.correct_count = Some(results.correct_count);
            attempt.wrong_count = Some(results.wrong_count);
            attempt.completed_at = Some(now);
            Some(keys::TEST_ATTEMPTS)
        })?;
        if !completed {
            debug!(test_id, "No attempt to complete");
        }
        Ok(completed)
    }

    /// Remove the attempt for `test_id`. Returns `false` if there was none.
    pub fn delete_test_attempt(&self, test_id: &str) -> Result<bool> {
        self.update(|p| {
            let i = p.position(test_id)?;
            p.attempts.remove(i);
            Some(keys::TEST_ATTEMPTS)
        })
    }

    /// Return an attempt to `not-started` for a retake, dropping its results.
    ///
    /// Returns `false` if there is no attempt for `test_id`.
    pub fn reset_attempt(&self, test_id: &str) -> Result<bool> {
        self.update(|p| {
            let i = p.position(test_id)?;
            p.attempts[i].clear_results();
            Some(keys::TEST_ATTEMPTS)
        })
    }

    /// All attempts.
    pub fn attempts(&self) -> Vec<ExamAttempt> {
        self.inner.progress.lock().attempts.clone()
    }

    /// Courses and attempts together.
    pub fn snapshot(&self) -> Progress {
        self.inner.progress.lock().clone()
    }

    /// Watch for changes.
    pub fn subscribe(&self) -> watch::Receiver<Progress> {
        self.inner.changes.subscribe()
    }

    /// Apply `mutate` to a copy, persist the key it names, then commit.
    ///
    /// `mutate` returns `None` to signal a no-op. A failed write leaves the
    /// in-memory state untouched.
    fn update<F>(&self, mutate: F) -> Result<bool>
    where
        F: FnOnce(&mut Progress) -> Option<&'static str>,
    {
        let mut progress = self.inner.progress.lock();
        let mut next = progress.clone();
        let Some(key) = mutate(&mut next) else {
            return Ok(false);
        };

        let store = self.inner.store.as_ref();
        let written = if key == keys::UNLOCKED_COURSES {
            save_json(store, key, &next.unlocked_courses)
        } else {
            save_json(store, key, &next.attempts)
        };
        if let Err(e) = written {
            warn!(key, error = %e, "Failed to persist exam progress");
            return Err(e);
        }

        *progress = next.clone();
        drop(progress);
        self.inner.changes.send_replace(next);
        Ok(true)
    }
}

impl fmt::Debug for ExamAttemptStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let progress = self.inner.progress.lock();
        f.debug_struct("ExamAttemptStore")
            .field("unlocked_courses", &progress.unlocked_courses.len())
            .field("attempts", &progress.attempts.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StateError;
    use crate::store::{KeyValueStore, MemoryStore, create_file_store};
    use tempfile::tempdir;

    fn open_memory() -> (ExamAttemptStore, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (ExamAttemptStore::open(store.clone()), store)
    }

    fn completion(score: f64) -> TestCompletion {
        TestCompletion {
            score,
            time_spent: 1200,
            questions: vec![
                QuestionResult {
                    question_id: "q1".to_string(),
                    selected: vec!["a".to_string()],
                    correct: true,
                },
                QuestionResult {
                    question_id: "q2".to_string(),
                    selected: vec!["b".to_string(), "c".to_string()],
                    correct: false,
                },
            ],
            correct_count: 1,
            wrong_count: 1,
        }
    }

    /// Refuses every write.
    #[derive(Debug, Default)]
    struct ReadOnlyStore(MemoryStore);

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.0.get(key)
        }
        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(StateError::Storage("read-only".to_string()))
        }
        fn remove(&self, _key: &str) -> Result<()> {
            Err(StateError::Storage("read-only".to_string()))
        }
        fn keys(&self) -> Result<Vec<String>> {
            self.0.keys()
        }
    }

    #[test]
    fn test_unlock_is_idempotent() {
        let (attempts, store) = open_memory();
        assert!(!attempts.has_course_access("aws-saa"));

        assert!(attempts.unlock_course_access("aws-saa").unwrap());
        assert!(!attempts.unlock_course_access("aws-saa").unwrap());

        assert!(attempts.has_course_access("aws-saa"));
        assert_eq!(attempts.unlocked_courses(), vec!["aws-saa"]);
        assert_eq!(
            store.get(keys::UNLOCKED_COURSES).unwrap().as_deref(),
            Some(r#"["aws-saa"]"#)
        );
    }

    #[test]
    fn test_save_upserts_by_test_id() {
        let (attempts, _store) = open_memory();
        attempts.save_test_attempt(ExamAttempt::in_progress("t1")).unwrap();
        attempts
            .save_test_attempt(ExamAttempt::in_progress("t1").with_score(10.0))
            .unwrap();
        attempts.save_test_attempt(ExamAttempt::new("t2")).unwrap();

        let all = attempts.attempts();
        assert_eq!(all.len(), 2);
        let t1 = attempts.get_test_attempt("t1").unwrap();
        assert_eq!(t1.score, Some(10.0));
        assert_eq!(t1.status, AttemptStatus::InProgress);
        assert!(attempts.get_test_attempt("t3").is_none());
    }

    #[test]
    fn test_save_normalizes_completed_at() {
        let (attempts, _store) = open_memory();

        let mut stray = ExamAttempt::in_progress("t1");
        stray.completed_at = Some(Utc::now());
        attempts.save_test_attempt(stray).unwrap();
        assert!(attempts.get_test_attempt("t1").unwrap().completed_at.is_none());

        let mut done = ExamAttempt::new("t2");
        done.status = AttemptStatus::Completed;
        attempts.save_test_attempt(done).unwrap();
        assert!(attempts.get_test_attempt("t2").unwrap().completed_at.is_some());
    }

    #[test]
    fn test_complete_test() {
        let (attempts, _store) = open_memory();
        attempts.save_test_attempt(ExamAttempt::in_progress("t1")).unwrap();

        assert!(attempts.complete_test("t1", completion(72.5)).unwrap());

        let t1 = attempts.get_test_attempt("t1").unwrap();
        assert!(t1.is_completed());
        assert_eq!(t1.score, Some(72.5));
        assert_eq!(t1.time_spent, Some(1200));
        assert_eq!(t1.questions.len(), 2);
        assert_eq!(t1.correct_count, Some(1));
        assert_eq!(t1.wrong_count, Some(1));
        assert!(t1.completed_at.is_some());
    }

    #[test]
    fn test_complete_missing_is_noop() {
        let (attempts, store) = open_memory();
        attempts.save_test_attempt(ExamAttempt::in_progress("t1")).unwrap();
        let before = attempts.snapshot();
        let persisted = store.get(keys::TEST_ATTEMPTS).unwrap();

        assert!(!attempts.complete_test("missing-id", completion(90.0)).unwrap());

        assert_eq!(attempts.snapshot(), before);
        assert_eq!(store.get(keys::TEST_ATTEMPTS).unwrap(), persisted);
    }

    #[test]
    fn test_delete_and_reset() {
        let (attempts, _store) = open_memory();
        attempts.save_test_attempt(ExamAttempt::in_progress("t1")).unwrap();
        attempts.save_test_attempt(ExamAttempt::in_progress("t2")).unwrap();
        attempts.complete_test("t2", completion(50.0)).unwrap();

        assert!(attempts.reset_attempt("t2").unwrap());
        let t2 = attempts.get_test_attempt("t2").unwrap();
        assert_eq!(t2, ExamAttempt::new("t2"));

        assert!(attempts.delete_test_attempt("t1").unwrap());
        assert!(!attempts.delete_test_attempt("t1").unwrap());
        assert!(!attempts.reset_attempt("t1").unwrap());
        assert_eq!(attempts.attempts().len(), 1);
    }

    #[test]
    fn test_progress_survives_reopen() {
        let temp = tempdir().unwrap();
        {
            let attempts = ExamAttemptStore::open(create_file_store(temp.path()).unwrap());
            attempts.unlock_course_access("c1").unwrap();
            attempts.save_test_attempt(ExamAttempt::in_progress("t1")).unwrap();
            attempts.complete_test("t1", completion(88.0)).unwrap();
        }

        let attempts = ExamAttemptStore::open(create_file_store(temp.path()).unwrap());
        assert!(attempts.has_course_access("c1"));
        let t1 = attempts.get_test_attempt("t1").unwrap();
        assert!(t1.is_completed());
        assert_eq!(t1.score, Some(88.0));
    }

    #[test]
    fn test_open_repairs_persisted_data() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(keys::UNLOCKED_COURSES, r#"["c1","c2","c1"]"#)
            .unwrap();
        store
            .set(
                keys::TEST_ATTEMPTS,
                r#"[
                    {"testId":"t1","status":"in-progress","score":1},
                    {"testId":"t1","status":"in-progress","score":2},
                    {"testId":"t2","status":"completed"}
                ]"#,
            )
            .unwrap();

        let attempts = ExamAttemptStore::open(store);
        assert_eq!(attempts.unlocked_courses(), vec!["c1", "c2"]);
        assert_eq!(attempts.attempts().len(), 2);
        assert_eq!(attempts.get_test_attempt("t1").unwrap().score, Some(2.0));
        assert!(attempts.get_test_attempt("t2").unwrap().completed_at.is_some());
    }

    #[test]
    fn test_open_discards_corrupt_entries() {
        let store = Arc::new(MemoryStore::new());
        store.set(keys::UNLOCKED_COURSES, r#"["c1"]"#).unwrap();
        store.set(keys::TEST_ATTEMPTS, "not json").unwrap();

        let attempts = ExamAttemptStore::open(store.clone());
        assert!(attempts.attempts().is_empty());
        assert!(attempts.has_course_access("c1"));
        assert_eq!(store.get(keys::TEST_ATTEMPTS).unwrap(), None);
    }

    #[test]
    fn test_failed_write_changes_nothing() {
        let inner = MemoryStore::new();
        inner.set(keys::UNLOCKED_COURSES, r#"["c1"]"#).unwrap();
        let attempts = ExamAttemptStore::open(Arc::new(ReadOnlyStore(inner)));

        assert!(attempts.unlock_course_access("c2").is_err());
        assert!(!attempts.has_course_access("c2"));
        assert!(attempts.save_test_attempt(ExamAttempt::new("t1")).is_err());
        assert!(attempts.attempts().is_empty());
    }

    #[test]
    fn test_persisted_shape() {
        let (attempts, store) = open_memory();
        attempts.save_test_attempt(ExamAttempt::in_progress("t1")).unwrap();

        let raw = store.get(keys::TEST_ATTEMPTS).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value[0]["testId"], "t1");
        assert_eq!(value[0]["status"], "in-progress");
        assert!(value[0].get("completedAt").is_none());
    }

    #[test]
    fn test_subscribers_see_changes() {
        let (attempts, _store) = open_memory();
        let mut rx = attempts.subscribe();

        attempts.unlock_course_access("c1").unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().unlocked_courses, vec!["c1"]);

        attempts.unlock_course_access("c1").unwrap();
        assert!(!rx.has_changed().unwrap());
    }
}
