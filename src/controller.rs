//! Session controller: runs review sessions over the word store.
//!
//! Owns the open sessions, asks the selector for an archetype per word, calls
//! the reasoning service for content and grading, and applies exactly one
//! scheduling update per completed grade-then-feedback cycle. Service
//! failures never reach the review records.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{AppConfig, SessionConfig};
use crate::database::{WordStore, sort_by_due_date};
use crate::error::{ServiceError, SessionError};
use crate::models::review_session::{GradedResult, PreparedExercise};
use crate::models::sm2::calculate_next_review;
use crate::models::{
    Answer, Archetype, Category, ExerciseContent, ExercisePresentation, ExerciseSelector,
    Judgment, MasteryHint, MultipleChoiceQuestion, Outcome, ReviewRecord, ReviewSession,
    SessionEvent, SessionState, SessionSummary, WordEntry,
};
use crate::service::{ExerciseRequest, ReasoningService, ServiceResult, normalize_answer};

pub type SessionId = Uuid;

/// Wrong options offered to multiple-choice generation.
const DISTRACTOR_COUNT: usize = 3;

/// Which words a session draws from.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WordFilter {
    pub categories: Option<Vec<Category>>,
    pub mastery: Option<MasteryHint>,
    pub limit: Option<usize>,
}

impl WordFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn matches(&self, record: &ReviewRecord) -> bool {
        let category_ok = self
            .categories
            .as_ref()
            .is_none_or(|categories| categories.contains(&record.category));
        let mastery_ok = self
            .mastery
            .is_none_or(|mastery| mastery == record.mastery_hint);
        category_ok && mastery_ok
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Advance {
    Next {
        progress_saved: bool,
    },
    Complete {
        summary: SessionSummary,
        progress_saved: bool,
    },
}

impl Advance {
    /// False when the scheduling update could not be written to the store.
    pub fn progress_saved(&self) -> bool {
        match self {
            Advance::Next { progress_saved } | Advance::Complete { progress_saved, .. } => {
                *progress_saved
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Advance::Complete { .. })
    }
}

pub struct SessionController<S, R> {
    store: S,
    service: R,
    selector: ExerciseSelector,
    config: SessionConfig,
    rng: StdRng,
    sessions: HashMap<SessionId, ReviewSession>,
}

impl<S: WordStore, R: ReasoningService> SessionController<S, R> {
    pub fn new(store: S, service: R, config: &AppConfig) -> Self {
        let rng = match config.session.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            store,
            service,
            selector: ExerciseSelector::new(config.selection.clone()),
            config: config.session.clone(),
            rng,
            sessions: HashMap::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn service(&self) -> &R {
        &self.service
    }

    fn queue_limit(&self, filter: &WordFilter) -> Option<usize> {
        filter.limit.or(self.config.default_queue_limit)
    }

    /// Starts a session over the due words that match `filter`.
    ///
    /// Fails with `NothingDue` when words match but none is due yet; the
    /// caller can then offer [`Self::start_review_anyway`].
    pub async fn start_session(&mut self, filter: &WordFilter) -> Result<SessionId, SessionError> {
        let now = self.store.current_date()?;
        let mut due: Vec<WordEntry> = self
            .store
            .get_due(now)?
            .into_iter()
            .filter(|entry| filter.matches(&entry.record))
            .collect();

        if due.is_empty() {
            let candidates = self
                .store
                .get_all()?
                .iter()
                .filter(|entry| filter.matches(&entry.record))
                .count();
            return Err(if candidates == 0 {
                SessionError::NoWords
            } else {
                info!(candidates, "No words due");
                SessionError::NothingDue { candidates }
            });
        }

        if let Some(limit) = self.queue_limit(filter) {
            due.truncate(limit);
        }
        self.open_session(due, false).await
    }

    /// Starts a non-urgent session over every matching word, due or not.
    pub async fn start_review_anyway(
        &mut self,
        filter: &WordFilter,
    ) -> Result<SessionId, SessionError> {
        let mut entries: Vec<WordEntry> = self
            .store
            .get_all()?
            .into_iter()
            .filter(|entry| filter.matches(&entry.record))
            .collect();
        if entries.is_empty() {
            return Err(SessionError::NoWords);
        }
        sort_by_due_date(&mut entries);
        if let Some(limit) = self.queue_limit(filter) {
            entries.truncate(limit);
        }
        self.open_session(entries, true).await
    }

    async fn open_session(
        &mut self,
        entries: Vec<WordEntry>,
        review_anyway: bool,
    ) -> Result<SessionId, SessionError> {
        let words = entries.len();
        let mut session = ReviewSession::new(entries, review_anyway);
        let id = session.id;
        enter_current(
            &mut session,
            &self.service,
            &self.selector,
            &mut self.rng,
            self.config.service_timeout(),
        )
        .await?;
        self.sessions.insert(id, session);
        info!(%id, words, review_anyway, "Review session started");
        Ok(id)
    }

    pub fn session(&self, id: SessionId) -> Result<&ReviewSession, SessionError> {
        self.sessions.get(&id).ok_or(SessionError::UnknownSession(id))
    }

    pub fn state(&self, id: SessionId) -> Result<SessionState, SessionError> {
        Ok(self.session(id)?.state())
    }

    /// Watch channel that observes every state change of the session.
    pub fn subscribe(&self, id: SessionId) -> Result<watch::Receiver<SessionState>, SessionError> {
        Ok(self.session(id)?.subscribe())
    }

    /// Latest transient error shown to the learner (grading failure, unsaved progress).
    pub fn last_error(&self, id: SessionId) -> Result<Option<&str>, SessionError> {
        Ok(self.session(id)?.last_error())
    }

    pub fn current_exercise(&self, id: SessionId) -> Result<ExercisePresentation, SessionError> {
        let session = self.session(id)?;
        let invalid = SessionError::InvalidState {
            operation: "current_exercise",
            state: session.state(),
        };
        match session.state() {
            SessionState::Presenting | SessionState::Checking | SessionState::Feedback => {
                session.presentation().ok_or(invalid)
            }
            _ => Err(invalid),
        }
    }

    /// Grades the learner's answer for the current exercise.
    ///
    /// A grading failure leaves the session in `Checking`; submitting again
    /// retries. No review record changes until [`Self::advance`].
    pub async fn submit_answer(
        &mut self,
        id: SessionId,
        answer: Answer,
    ) -> Result<Outcome, SessionError> {
        let timeout = self.config.service_timeout();
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or(SessionError::UnknownSession(id))?;
        let invalid = SessionError::InvalidState {
            operation: "submit_answer",
            state: session.state(),
        };
        if !session.allows(SessionEvent::AnswerSubmitted) {
            return Err(invalid);
        }

        let (content, request) = {
            let item = session.current_item().ok_or(invalid)?;
            let exercise = item.exercise.as_ref().ok_or(SessionError::InvalidState {
                operation: "submit_answer",
                state: session.state(),
            })?;
            if !answer_fits(&exercise.content, &answer) {
                return Err(SessionError::AnswerMismatch(exercise.content.archetype()));
            }
            (
                exercise.content.clone(),
                ExerciseRequest::for_entry(&item.entry, Vec::new()),
            )
        };

        session.transition(SessionEvent::AnswerSubmitted, "submit_answer")?;
        match grade_answer(&self.service, &content, &request, &answer, timeout).await {
            Ok(outcome) => {
                session.clear_error();
                if let Some(item) = session.current_item_mut() {
                    item.result = Some(GradedResult {
                        outcome: outcome.clone(),
                        applied: false,
                    });
                }
                session.transition(SessionEvent::Graded, "submit_answer")?;
                debug!(%id, word = %request.word, grade = ?outcome.grade, "Answer graded");
                Ok(outcome)
            }
            Err(err) => {
                warn!(%id, word = %request.word, "Grading failed: {err}");
                session.set_error(err.to_string());
                session.transition(SessionEvent::GradingFailed, "submit_answer")?;
                Err(SessionError::Service(err))
            }
        }
    }

    /// Leaves the feedback step: applies the pending scheduling update, writes
    /// it back, and moves on to the next word.
    pub async fn advance(&mut self, id: SessionId) -> Result<Advance, SessionError> {
        let timeout = self.config.service_timeout();
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or(SessionError::UnknownSession(id))?;
        if !session.allows(SessionEvent::Advanced) {
            return Err(SessionError::InvalidState {
                operation: "advance",
                state: session.state(),
            });
        }

        let progress_saved = apply_pending(&self.store, session)?;
        session.transition(SessionEvent::Advanced, "advance")?;
        session.move_forward();
        enter_current(session, &self.service, &self.selector, &mut self.rng, timeout).await?;
        Ok(advance_result(session, progress_saved))
    }

    /// Abandons the current exercise without touching its review record.
    pub async fn skip(&mut self, id: SessionId) -> Result<Advance, SessionError> {
        let timeout = self.config.service_timeout();
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or(SessionError::UnknownSession(id))?;
        session.transition(SessionEvent::Skipped, "skip")?;
        session.note_skipped();
        session.clear_error();
        if let Some(item) = session.current_item() {
            debug!(%id, word = %item.entry.key(), "Exercise skipped");
        }
        session.move_forward();
        enter_current(session, &self.service, &self.selector, &mut self.rng, timeout).await?;
        Ok(advance_result(session, true))
    }

    /// Returns to the previous word. A word graded earlier is shown with its
    /// recorded outcome and is never graded again.
    pub async fn go_back(&mut self, id: SessionId) -> Result<(), SessionError> {
        let timeout = self.config.service_timeout();
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or(SessionError::UnknownSession(id))?;

        if !back_allowed(session) {
            return Err(SessionError::InvalidState {
                operation: "go_back",
                state: session.state(),
            });
        }
        if session.current_index() == 0 {
            return Err(SessionError::AtFirstWord);
        }

        session.transition(SessionEvent::WentBack, "go_back")?;
        session.move_back()?;
        session.clear_error();
        enter_current(session, &self.service, &self.selector, &mut self.rng, timeout).await
    }

    /// Whether [`Self::go_back`] would move to an earlier word right now.
    pub fn can_go_back(&self, id: SessionId) -> bool {
        self.session(id)
            .is_ok_and(|session| session.current_index() > 0 && back_allowed(session))
    }

    /// Closes the session. Grades that were not advanced past are dropped.
    pub fn close_session(&mut self, id: SessionId) -> Option<SessionSummary> {
        let session = self.sessions.remove(&id)?;
        let pending = session
            .items()
            .iter()
            .filter(|item| item.result.as_ref().is_some_and(|r| !r.applied))
            .count();
        if pending > 0 {
            debug!(%id, pending, "Discarding grades that were never advanced past");
        }
        info!(%id, state = %session.state(), "Review session closed");
        Some(session.summary().clone())
    }
}

/// Going back is refused while a fresh grade waits for its scheduling update.
fn back_allowed(session: &ReviewSession) -> bool {
    let pending_grade = session
        .current_item()
        .and_then(|item| item.result.as_ref())
        .is_some_and(|result| !result.applied);
    session.allows(SessionEvent::WentBack) && !pending_grade
}

fn advance_result(session: &ReviewSession, progress_saved: bool) -> Advance {
    if session.state().is_terminal() {
        Advance::Complete {
            summary: session.summary().clone(),
            progress_saved,
        }
    } else {
        Advance::Next { progress_saved }
    }
}

/// Applies the current word's pending grade, if any. Returns whether the
/// updated record reached the store; the session keeps the new record either way.
fn apply_pending<S: WordStore + ?Sized>(
    store: &S,
    session: &mut ReviewSession,
) -> Result<bool, SessionError> {
    let now = store.current_date().unwrap_or_else(|err| {
        warn!("Store clock unavailable, using system time: {err}");
        Utc::now()
    });

    let (grade, write) = {
        let Some(item) = session.current_item_mut() else {
            return Ok(true);
        };
        let Some(result) = item.result.as_mut().filter(|result| !result.applied) else {
            return Ok(true);
        };
        let updated = calculate_next_review(&item.entry.record, result.outcome.quality.value(), now)?;
        result.applied = true;
        info!(
            word = %updated.word_key,
            quality = result.outcome.quality.value(),
            interval = updated.interval,
            ease = updated.ease_factor,
            "Scheduling updated"
        );
        item.entry.record = updated;
        (result.outcome.grade, store.upsert(&item.entry))
    };

    session.note_applied(grade);
    match write {
        Ok(()) => Ok(true),
        Err(err) => {
            warn!("Failed to persist review: {err}");
            session.note_unsaved();
            session.set_error(format!("Your progress may not be saved: {err}"));
            Ok(false)
        }
    }
}

/// Moves the session out of `Loading` onto the word under the cursor.
async fn enter_current<R: ReasoningService + ?Sized>(
    session: &mut ReviewSession,
    service: &R,
    selector: &ExerciseSelector,
    rng: &mut StdRng,
    timeout: Duration,
) -> Result<(), SessionError> {
    let distractors = session.distractors(DISTRACTOR_COUNT);
    let Some(item) = session.current_item() else {
        session.transition(SessionEvent::QueueExhausted, "advance")?;
        info!(id = %session.id, summary = ?session.summary(), "Review session complete");
        return Ok(());
    };

    if item.result.is_some() {
        session.transition(SessionEvent::Revisited, "go_back")?;
        return Ok(());
    }

    if item.exercise.is_none() {
        let archetype = selector.select_archetype(&item.entry.record, rng);
        let request = ExerciseRequest::for_entry(&item.entry, distractors);
        let prepared = prepare_exercise(service, archetype, &request, timeout).await;
        if let Some(item) = session.current_item_mut() {
            item.exercise = Some(prepared);
        }
    }
    session.transition(SessionEvent::ExerciseReady, "present")?;
    Ok(())
}

/// Requests content for `archetype`, falling back to a flashcard when the
/// service fails, times out, or returns nothing usable.
async fn prepare_exercise<R: ReasoningService + ?Sized>(
    service: &R,
    archetype: Archetype,
    request: &ExerciseRequest,
    timeout: Duration,
) -> PreparedExercise {
    if !archetype.needs_content() {
        return PreparedExercise {
            content: ExerciseContent::Flashcard,
            fallback_from: None,
        };
    }

    let failure = match generate_content(service, archetype, request, timeout).await {
        Ok(content) if !content.is_empty() => {
            return PreparedExercise {
                content,
                fallback_from: None,
            };
        }
        Ok(_) => "service returned empty content".to_string(),
        Err(err) => err.to_string(),
    };
    warn!(word = %request.word, %archetype, "Falling back to flashcard: {failure}");
    PreparedExercise {
        content: ExerciseContent::Flashcard,
        fallback_from: Some(archetype),
    }
}

async fn with_timeout<T>(
    timeout: Duration,
    call: impl Future<Output = ServiceResult<T>>,
) -> ServiceResult<T> {
    tokio::time::timeout(timeout, call)
        .await
        .map_err(|_| ServiceError::Timeout(timeout.as_millis() as u64))?
}

async fn generate_content<R: ReasoningService + ?Sized>(
    service: &R,
    archetype: Archetype,
    request: &ExerciseRequest,
    timeout: Duration,
) -> ServiceResult<ExerciseContent> {
    let call = async {
        match archetype {
            Archetype::Flashcard => Ok(ExerciseContent::Flashcard),
            Archetype::MultipleChoice => service
                .generate_multiple_choice(request)
                .await
                .map(ExerciseContent::MultipleChoice),
            Archetype::ArticleDrill => service
                .generate_article_drill(request)
                .await
                .map(ExerciseContent::ArticleDrill),
            Archetype::VerbFormDrill => service
                .generate_verb_form_drill(request)
                .await
                .map(ExerciseContent::VerbFormDrill),
            Archetype::ClozeSentence => service
                .generate_cloze(request)
                .await
                .map(ExerciseContent::ClozeSentence),
            Archetype::FreeRecall => service
                .generate_free_recall(request)
                .await
                .map(ExerciseContent::FreeRecall),
        }
    };
    with_timeout(timeout, call).await
}

fn answer_fits(content: &ExerciseContent, answer: &Answer) -> bool {
    matches!(
        (content, answer),
        (ExerciseContent::Flashcard, Answer::SelfReport(_))
            | (ExerciseContent::MultipleChoice(_), Answer::Text(_))
            | (ExerciseContent::ArticleDrill(_), Answer::Text(_))
            | (ExerciseContent::VerbFormDrill(_), Answer::Text(_))
            | (ExerciseContent::ClozeSentence(_), Answer::Text(_))
            | (ExerciseContent::FreeRecall(_), Answer::Text(_))
    )
}

fn grade_choice(question: &MultipleChoiceQuestion, choice: &str) -> Judgment {
    let is_correct = normalize_answer(choice) == normalize_answer(&question.correct_answer);
    Judgment {
        is_correct,
        is_synonym: false,
        explanation: if is_correct {
            "Correct!".to_string()
        } else {
            format!("The correct answer is \"{}\".", question.correct_answer)
        },
        hint: None,
        correct_answer: Some(question.correct_answer.clone()),
    }
}

async fn grade_answer<R: ReasoningService + ?Sized>(
    service: &R,
    content: &ExerciseContent,
    request: &ExerciseRequest,
    answer: &Answer,
    timeout: Duration,
) -> ServiceResult<Outcome> {
    let text = match answer {
        Answer::SelfReport(recall) => return Ok(Outcome::from_recall(*recall)),
        Answer::Text(text) => text.as_str(),
    };

    let judgment = match content {
        ExerciseContent::MultipleChoice(question) => grade_choice(question, text),
        ExerciseContent::ArticleDrill(_) => {
            with_timeout(timeout, service.grade_article_answer(request, text)).await?
        }
        ExerciseContent::VerbFormDrill(_) => {
            with_timeout(timeout, service.grade_verb_form_answer(request, text)).await?
        }
        ExerciseContent::ClozeSentence(cloze) => {
            with_timeout(timeout, service.grade_cloze_answer(request, cloze, text)).await?
        }
        ExerciseContent::FreeRecall(_) => {
            with_timeout(timeout, service.grade_recall_answer(request, text)).await?
        }
        ExerciseContent::Flashcard => {
            return Err(ServiceError::Grading(
                "flashcards are graded by self-report".to_string(),
            ));
        }
    };
    Ok(Outcome::from_judgment(judgment))
}
