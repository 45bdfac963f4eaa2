//! Review session state machine.
//!
//! ```text
//! Loading ──ExerciseReady──▶ Presenting ──AnswerSubmitted──▶ Checking ──Graded──▶ Feedback
//!    │  ▲                         │                            │  ▲                  │
//!    │  └───────Skipped/WentBack──┘                            └──┘ GradingFailed,   │
//!    │  ▲                                                           AnswerSubmitted  │
//!    │  └──────────────────────────────Advanced/WentBack─────────────────────────────┘
//!    ├──Revisited──▶ Feedback
//!    └──QueueExhausted──▶ Complete
//! ```

use serde::{Deserialize, Serialize};
use strum::Display;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[strum(serialize_all = "lowercase")]
pub enum SessionState {
    Loading,
    Presenting,
    Checking,
    Feedback,
    Complete,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum SessionEvent {
    /// Content for the current word is ready (possibly after a fallback).
    ExerciseReady,
    /// Entered a word that was already graded earlier in the session.
    Revisited,
    QueueExhausted,
    AnswerSubmitted,
    Graded,
    GradingFailed,
    Advanced,
    Skipped,
    WentBack,
}

impl SessionState {
    /// Transition table. `None` means the event is not allowed in this state.
    pub fn on(self, event: SessionEvent) -> Option<SessionState> {
        use SessionEvent as E;
        use SessionState as S;
        match (self, event) {
            (S::Loading, E::ExerciseReady) => Some(S::Presenting),
            (S::Loading, E::Revisited) => Some(S::Feedback),
            (S::Loading, E::QueueExhausted) => Some(S::Complete),

            (S::Presenting, E::AnswerSubmitted) => Some(S::Checking),
            (S::Presenting, E::Skipped) => Some(S::Loading),
            (S::Presenting, E::WentBack) => Some(S::Loading),

            (S::Checking, E::Graded) => Some(S::Feedback),
            (S::Checking, E::GradingFailed) => Some(S::Checking),
            (S::Checking, E::AnswerSubmitted) => Some(S::Checking),
            (S::Checking, E::Skipped) => Some(S::Loading),

            (S::Feedback, E::Advanced) => Some(S::Loading),
            (S::Feedback, E::WentBack) => Some(S::Loading),

            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == SessionState::Complete
    }
}
