//! Client-side session and progress state for examdesk.
//!
//! # Components
//!
//! - [`store`] - key/value persistence shared by everything below
//! - [`session`] - the authenticated session, reconciled against the backend
//! - [`attempts`] - exam attempts and unlocked courses
//! - [`claims`] - unverified token claims, for UI hints only
//!
//! Persisted keys are namespaced (`session.*`, `progress.*`). Logging out
//! clears the `session.` namespace only; exam progress survives.

pub mod attempts;
pub mod claims;
pub mod error;
pub mod session;
pub mod store;

pub use attempts::{
    AttemptStatus, ExamAttempt, ExamAttemptStore, Progress, QuestionResult, TestCompletion,
};
pub use error::{Result, StateError};
pub use session::{AuthSession, ProfileSource, SessionState, VerifyOutcome};
pub use store::{FileStore, KeyValueStore, MemoryStore, SharedStore};
