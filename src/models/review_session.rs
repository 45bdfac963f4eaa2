//! Bookkeeping for one review session: the word queue, the cursor, what was
//! shown and graded for each word, and the state machine that guards it.
//! No I/O happens here; the session controller drives it.

use tokio::sync::watch;
use uuid::Uuid;

use super::{
    Archetype, ExerciseContent, ExercisePresentation, GradeOutcome, Outcome, SessionEvent,
    SessionState, WordEntry,
};
use crate::error::SessionError;

/// Content chosen for a word, remembered so going back and forth reuses it.
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedExercise {
    pub content: ExerciseContent,
    pub fallback_from: Option<Archetype>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GradedResult {
    pub outcome: Outcome,
    /// Set once the scheduling update for this grade has been computed.
    pub applied: bool,
}

#[derive(Clone, Debug)]
pub struct SessionItem {
    pub entry: WordEntry,
    pub exercise: Option<PreparedExercise>,
    pub result: Option<GradedResult>,
    /// Counted in the summary as skipped until it is graded.
    pub skipped: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub total: usize,
    pub correct: usize,
    pub synonyms: usize,
    pub incorrect: usize,
    pub skipped: usize,
    /// Updates that could not be written to the store.
    pub unsaved: usize,
}

pub struct ReviewSession {
    pub id: Uuid,
    /// Started over words that were not due yet.
    pub review_anyway: bool,
    items: Vec<SessionItem>,
    current_index: usize,
    state: SessionState,
    state_tx: watch::Sender<SessionState>,
    last_error: Option<String>,
    summary: SessionSummary,
}

impl ReviewSession {
    pub fn new(entries: Vec<WordEntry>, review_anyway: bool) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Loading);
        let total = entries.len();
        Self {
            id: Uuid::new_v4(),
            review_anyway,
            items: entries
                .into_iter()
                .map(|entry| SessionItem {
                    entry,
                    exercise: None,
                    result: None,
                    skipped: false,
                })
                .collect(),
            current_index: 0,
            state: SessionState::Loading,
            state_tx,
            last_error: None,
            summary: SessionSummary {
                total,
                ..Default::default()
            },
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Receiver that observes every state change of this session.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    pub fn allows(&self, event: SessionEvent) -> bool {
        self.state.on(event).is_some()
    }

    /// Applies `event`, or reports that `operation` is not valid in the current state.
    pub fn transition(
        &mut self,
        event: SessionEvent,
        operation: &'static str,
    ) -> Result<SessionState, SessionError> {
        let next = self.state.on(event).ok_or(SessionError::InvalidState {
            operation,
            state: self.state,
        })?;
        self.state = next;
        self.state_tx.send_replace(next);
        Ok(next)
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn total_count(&self) -> usize {
        self.items.len()
    }

    pub fn items(&self) -> &[SessionItem] {
        &self.items
    }

    pub fn current_item(&self) -> Option<&SessionItem> {
        self.items.get(self.current_index)
    }

    pub fn current_item_mut(&mut self) -> Option<&mut SessionItem> {
        self.items.get_mut(self.current_index)
    }

    /// Moves the cursor one word forward. Returns false once the queue is exhausted.
    pub fn move_forward(&mut self) -> bool {
        if self.current_index < self.items.len() {
            self.current_index += 1;
        }
        self.current_index < self.items.len()
    }

    pub fn move_back(&mut self) -> Result<(), SessionError> {
        if self.current_index == 0 {
            return Err(SessionError::AtFirstWord);
        }
        self.current_index -= 1;
        Ok(())
    }

    /// Translations of other words in the queue, used as wrong options.
    pub fn distractors(&self, limit: usize) -> Vec<String> {
        let current = self.current_item().map(|item| &item.entry.details.translation);
        let mut distractors: Vec<String> = Vec::new();
        for item in &self.items {
            let translation = &item.entry.details.translation;
            if translation.trim().is_empty()
                || Some(translation) == current
                || distractors.contains(translation)
            {
                continue;
            }
            distractors.push(translation.clone());
            if distractors.len() == limit {
                break;
            }
        }
        distractors
    }

    pub fn presentation(&self) -> Option<ExercisePresentation> {
        let item = self.current_item()?;
        let exercise = item.exercise.as_ref()?;
        Some(ExercisePresentation {
            word_key: item.entry.record.word_key.clone(),
            category: item.entry.record.category,
            details: item.entry.details.clone(),
            content: exercise.content.clone(),
            fallback_from: exercise.fallback_from,
            position: self.current_index + 1,
            total: self.items.len(),
            outcome: item.result.as_ref().map(|result| result.outcome.clone()),
        })
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn set_error(&mut self, message: String) {
        self.last_error = Some(message);
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    pub fn summary(&self) -> &SessionSummary {
        &self.summary
    }

    /// Counts the current word's applied grade. A word skipped earlier and
    /// graded after going back no longer counts as skipped.
    pub fn note_applied(&mut self, grade: GradeOutcome) {
        if let Some(item) = self.items.get_mut(self.current_index) {
            if item.skipped {
                item.skipped = false;
                self.summary.skipped -= 1;
            }
        }
        match grade {
            GradeOutcome::Correct => self.summary.correct += 1,
            GradeOutcome::CorrectAsSynonym => self.summary.synonyms += 1,
            GradeOutcome::Incorrect => self.summary.incorrect += 1,
        }
    }

    pub fn note_skipped(&mut self) {
        if let Some(item) = self.items.get_mut(self.current_index) {
            if !item.skipped {
                item.skipped = true;
                self.summary.skipped += 1;
            }
        }
    }

    pub fn note_unsaved(&mut self) {
        self.summary.unsaved += 1;
    }

    pub fn progress_message(&self) -> String {
        let position = (self.current_index + 1).min(self.items.len());
        if self.review_anyway {
            format!("Extra review: word {} of {}", position, self.items.len())
        } else {
            format!("Due review: word {} of {}", position, self.items.len())
        }
    }
}
