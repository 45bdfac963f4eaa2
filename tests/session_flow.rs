use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use vocab_trainer::config::AppConfig;
use vocab_trainer::database::{InMemoryWordStore, Result as StoreResult, WordStore};
use vocab_trainer::models::{
    Archetype, Article, ArticleDrill, ClozeExercise, GradeOutcome, Judgment, MultipleChoiceQuestion,
    NounDetails, Quality, RecallPrompt, SessionState, VerbDetails, VerbFormDrill,
};
use vocab_trainer::service::{ExerciseRequest, ReasoningService, ServiceResult, normalize_answer};
use vocab_trainer::{
    Advance, Answer, Category, Recall, ServiceError, SessionController, SessionError, StoreError,
    WordDetails, WordEntry, WordFilter,
};

/// Reasoning service whose failures are switched on per test.
#[derive(Default)]
struct ScriptedService {
    fail_content: AtomicBool,
    slow_content: AtomicBool,
    /// Content calls succeed but return blank text.
    blank_content: AtomicBool,
    content_calls: AtomicUsize,
    fail_grading: AtomicBool,
    slow_grading: AtomicBool,
    grading_calls: AtomicUsize,
}

impl ScriptedService {
    async fn content_gate(&self, archetype: Archetype) -> ServiceResult<()> {
        self.content_calls.fetch_add(1, Ordering::SeqCst);
        if self.slow_content.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(600)).await;
        }
        if self.fail_content.load(Ordering::SeqCst) {
            return Err(ServiceError::ContentGeneration {
                archetype,
                message: "model returned malformed output".to_string(),
            });
        }
        Ok(())
    }

    fn text(&self, text: String) -> String {
        if self.blank_content.load(Ordering::SeqCst) {
            String::new()
        } else {
            text
        }
    }

    async fn judge(&self, request: &ExerciseRequest, answer: &str) -> ServiceResult<Judgment> {
        self.grading_calls.fetch_add(1, Ordering::SeqCst);
        if self.slow_grading.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(600)).await;
        }
        if self.fail_grading.load(Ordering::SeqCst) {
            return Err(ServiceError::Grading("service unavailable".to_string()));
        }
        let expected = request.details.citation_form();
        let answer = normalize_answer(answer);
        let is_synonym = request
            .details
            .synonyms
            .iter()
            .any(|synonym| normalize_answer(synonym) == answer);
        Ok(Judgment {
            is_correct: answer == normalize_answer(&expected) || is_synonym,
            is_synonym,
            explanation: format!("Expected {expected}"),
            hint: None,
            correct_answer: Some(expected),
        })
    }
}

#[async_trait]
impl ReasoningService for ScriptedService {
    async fn generate_multiple_choice(
        &self,
        request: &ExerciseRequest,
    ) -> ServiceResult<MultipleChoiceQuestion> {
        self.content_gate(Archetype::MultipleChoice).await?;
        Ok(MultipleChoiceQuestion {
            question: self.text(format!("What does \"{}\" mean?", request.word)),
            options: vec![request.details.translation.clone(), "falsch".to_string()],
            correct_answer: request.details.translation.clone(),
        })
    }

    async fn generate_article_drill(&self, request: &ExerciseRequest) -> ServiceResult<ArticleDrill> {
        self.content_gate(Archetype::ArticleDrill).await?;
        Ok(ArticleDrill {
            prompt: self.text(format!("___ {}", request.word)),
            options: vec!["der".into(), "die".into(), "das".into()],
        })
    }

    async fn generate_verb_form_drill(
        &self,
        request: &ExerciseRequest,
    ) -> ServiceResult<VerbFormDrill> {
        self.content_gate(Archetype::VerbFormDrill).await?;
        Ok(VerbFormDrill {
            prompt: self.text(format!("Perfekt von \"{}\"?", request.word)),
        })
    }

    async fn generate_cloze(&self, request: &ExerciseRequest) -> ServiceResult<ClozeExercise> {
        self.content_gate(Archetype::ClozeSentence).await?;
        Ok(ClozeExercise {
            sentence_with_blank: self.text("Ich ______ gern.".to_string()),
            translation: request.details.translation.clone(),
            answer: request.word.clone(),
        })
    }

    async fn generate_free_recall(&self, request: &ExerciseRequest) -> ServiceResult<RecallPrompt> {
        self.content_gate(Archetype::FreeRecall).await?;
        Ok(RecallPrompt {
            prompt: self.text(format!("Which word means \"{}\"?", request.details.translation)),
        })
    }

    async fn grade_article_answer(
        &self,
        request: &ExerciseRequest,
        answer: &str,
    ) -> ServiceResult<Judgment> {
        self.judge(request, answer).await
    }

    async fn grade_verb_form_answer(
        &self,
        request: &ExerciseRequest,
        answer: &str,
    ) -> ServiceResult<Judgment> {
        self.judge(request, answer).await
    }

    async fn grade_cloze_answer(
        &self,
        request: &ExerciseRequest,
        _exercise: &ClozeExercise,
        answer: &str,
    ) -> ServiceResult<Judgment> {
        self.judge(request, answer).await
    }

    async fn grade_recall_answer(
        &self,
        request: &ExerciseRequest,
        answer: &str,
    ) -> ServiceResult<Judgment> {
        self.judge(request, answer).await
    }
}

/// In-memory store whose writes can be made to fail.
#[derive(Default)]
struct FlakyStore {
    inner: InMemoryWordStore,
    fail_writes: AtomicBool,
}

impl WordStore for FlakyStore {
    fn get_all(&self) -> StoreResult<Vec<WordEntry>> {
        self.inner.get_all()
    }

    fn get(&self, word_key: &str) -> StoreResult<Option<WordEntry>> {
        self.inner.get(word_key)
    }

    fn upsert(&self, entry: &WordEntry) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("disk full".to_string()));
        }
        self.inner.upsert(entry)
    }

    fn delete(&self, word_key: &str) -> StoreResult<bool> {
        self.inner.delete(word_key)
    }

    fn current_date(&self) -> StoreResult<DateTime<Utc>> {
        self.inner.current_date()
    }
}

fn start_of_day() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.session.rng_seed = Some(7);
    config.session.service_timeout_ms = 2_000;
    config
}

/// Every seen word is drilled with free recall.
fn recall_only_config() -> AppConfig {
    let mut config = config();
    config.selection.multiple_choice = 0.0;
    config.selection.cloze_sentence = 0.0;
    config.selection.article_drill = 0.0;
    config.selection.verb_form_drill = 0.0;
    config.selection.free_recall = 1.0;
    config
}

fn noun(text: &str, translation: &str, article: Article) -> WordDetails {
    let mut details = WordDetails::new(text, translation);
    details.noun = Some(NounDetails {
        article,
        plural: String::new(),
    });
    details
}

fn new_entry(details: WordDetails, category: Category, now: DateTime<Utc>) -> WordEntry {
    WordEntry::new(details, category, now)
}

fn seen_entry(
    details: WordDetails,
    category: Category,
    now: DateTime<Utc>,
    repetitions: u32,
    interval: u32,
) -> WordEntry {
    let mut entry = WordEntry::new(details, category, now);
    entry.record.repetitions = repetitions;
    entry.record.interval = interval;
    entry.record.next_review_at = now - chrono::Duration::days(1);
    entry.record.last_reviewed_at = Some(now - chrono::Duration::days(i64::from(interval) + 1));
    entry
}

fn store_with(entries: Vec<WordEntry>, now: DateTime<Utc>) -> InMemoryWordStore {
    let store = InMemoryWordStore::with_entries(entries);
    store.set_now(Some(now));
    store
}

fn stored(store: &impl WordStore, key: &str) -> WordEntry {
    store.get(key).unwrap().expect("word is stored")
}

#[tokio::test]
async fn content_failure_falls_back_to_flashcard_without_touching_the_record() {
    let now = start_of_day();
    let mut gehen = WordDetails::new("gehen", "идти");
    gehen.verb = Some(VerbDetails {
        present_tense: "geht".into(),
        perfect: "ist gegangen".into(),
        government: None,
        reflexive: false,
    });
    let entry = seen_entry(gehen, Category::Verb, now, 2, 6);
    let store = store_with(vec![entry.clone()], now);

    let service = ScriptedService::default();
    service.fail_content.store(true, Ordering::SeqCst);
    let mut controller = SessionController::new(store, service, &config());

    let id = controller.start_session(&WordFilter::all()).await.unwrap();
    let exercise = controller.current_exercise(id).unwrap();
    assert_eq!(exercise.archetype(), Archetype::Flashcard);
    let requested = exercise.fallback_from.expect("fallback is reported");
    assert_ne!(requested, Archetype::Flashcard);
    assert_eq!(controller.state(id).unwrap(), SessionState::Presenting);
    assert_eq!(stored(controller.store(), "gehen"), entry);

    let outcome = controller
        .submit_answer(id, Answer::SelfReport(Recall::Easy))
        .await
        .unwrap();
    assert_eq!(outcome.quality, Quality::PERFECT);
    assert_eq!(stored(controller.store(), "gehen"), entry);

    let advance = controller.advance(id).await.unwrap();
    assert!(advance.is_complete());
    assert!(advance.progress_saved());

    let record = stored(controller.store(), "gehen").record;
    assert_eq!(record.repetitions, 3);
    assert!((record.ease_factor - 2.6).abs() < 1e-9);
    assert_eq!(record.interval, 16);
    assert_eq!(record.next_review_at, now + chrono::Duration::days(16));
    assert_eq!(record.last_reviewed_at, Some(now));
}

#[tokio::test(start_paused = true)]
async fn slow_content_times_out_into_a_flashcard() {
    let now = start_of_day();
    let store = store_with(
        vec![seen_entry(noun("Haus", "дом", Article::Das), Category::Noun, now, 1, 1)],
        now,
    );
    let service = ScriptedService::default();
    service.slow_content.store(true, Ordering::SeqCst);
    let mut controller = SessionController::new(store, service, &recall_only_config());

    let id = controller.start_session(&WordFilter::all()).await.unwrap();
    let exercise = controller.current_exercise(id).unwrap();
    assert_eq!(exercise.archetype(), Archetype::Flashcard);
    assert_eq!(exercise.fallback_from, Some(Archetype::FreeRecall));
}

#[tokio::test]
async fn grading_failure_keeps_checking_until_a_retry_succeeds() {
    let now = start_of_day();
    let entry = seen_entry(noun("Haus", "дом", Article::Das), Category::Noun, now, 1, 1);
    let store = store_with(vec![entry.clone()], now);
    let service = ScriptedService::default();
    service.fail_grading.store(true, Ordering::SeqCst);
    let mut controller = SessionController::new(store, service, &recall_only_config());

    let id = controller.start_session(&WordFilter::all()).await.unwrap();
    assert_eq!(
        controller.current_exercise(id).unwrap().archetype(),
        Archetype::FreeRecall
    );

    let err = controller
        .submit_answer(id, Answer::Text("das Haus".into()))
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert!(matches!(err, SessionError::Service(ServiceError::Grading(_))));
    assert_eq!(controller.state(id).unwrap(), SessionState::Checking);
    assert!(controller.last_error(id).unwrap().is_some());
    assert_eq!(stored(controller.store(), "haus"), entry);

    controller.service().fail_grading.store(false, Ordering::SeqCst);
    let outcome = controller
        .submit_answer(id, Answer::Text("das Haus".into()))
        .await
        .unwrap();
    assert_eq!(outcome.grade, GradeOutcome::Correct);
    assert_eq!(controller.state(id).unwrap(), SessionState::Feedback);
    assert!(controller.last_error(id).unwrap().is_none());
    assert_eq!(controller.service().grading_calls.load(Ordering::SeqCst), 2);
    assert_eq!(stored(controller.store(), "haus"), entry);

    controller.advance(id).await.unwrap();
    let record = stored(controller.store(), "haus").record;
    assert_eq!(record.repetitions, 2);
    assert_eq!(record.interval, 6);
}

#[tokio::test(start_paused = true)]
async fn grading_timeout_is_retryable() {
    let now = start_of_day();
    let store = store_with(
        vec![seen_entry(noun("Haus", "дом", Article::Das), Category::Noun, now, 1, 1)],
        now,
    );
    let service = ScriptedService::default();
    service.slow_grading.store(true, Ordering::SeqCst);
    let mut controller = SessionController::new(store, service, &recall_only_config());

    let id = controller.start_session(&WordFilter::all()).await.unwrap();
    let err = controller
        .submit_answer(id, Answer::Text("das Haus".into()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::Service(ServiceError::Timeout(2_000))
    ));
    assert_eq!(controller.state(id).unwrap(), SessionState::Checking);
}

#[tokio::test]
async fn closing_before_advancing_discards_the_grade() {
    let now = start_of_day();
    let entry = new_entry(noun("Haus", "дом", Article::Das), Category::Noun, now);
    let store = store_with(vec![entry.clone()], now);
    let mut controller = SessionController::new(store, ScriptedService::default(), &config());

    let id = controller.start_session(&WordFilter::all()).await.unwrap();
    controller
        .submit_answer(id, Answer::SelfReport(Recall::Remembered))
        .await
        .unwrap();

    let summary = controller.close_session(id).unwrap();
    assert_eq!(summary.total, 1);
    assert_eq!(summary.correct, 0);
    assert_eq!(stored(controller.store(), "haus"), entry);

    assert!(controller.close_session(id).is_none());
    assert!(matches!(
        controller.advance(id).await,
        Err(SessionError::UnknownSession(_))
    ));
}

/// Reviews the only due word once and advances past it.
async fn review_once<S: WordStore>(
    controller: &mut SessionController<S, ScriptedService>,
    answer: Answer,
) -> Advance {
    let id = controller.start_session(&WordFilter::all()).await.unwrap();
    controller.submit_answer(id, answer).await.unwrap();
    let advance = controller.advance(id).await.unwrap();
    controller.close_session(id);
    advance
}

#[tokio::test]
async fn scheduling_follows_sm2_across_sessions() {
    let t0 = start_of_day();
    let store = store_with(
        vec![new_entry(noun("Haus", "дом", Article::Das), Category::Noun, t0)],
        t0,
    );
    let mut controller = SessionController::new(store, ScriptedService::default(), &recall_only_config());

    // Unseen words always start on a flashcard
    review_once(&mut controller, Answer::SelfReport(Recall::Easy)).await;
    let record = stored(controller.store(), "haus").record;
    assert_eq!((record.repetitions, record.interval), (1, 1));
    assert!((record.ease_factor - 2.6).abs() < 1e-9);

    let t1 = t0 + chrono::Duration::days(1);
    controller.store().set_now(Some(t1));
    review_once(&mut controller, Answer::Text("das Haus".into())).await;
    let record = stored(controller.store(), "haus").record;
    assert_eq!((record.repetitions, record.interval), (2, 6));
    assert!((record.ease_factor - 2.7).abs() < 1e-9);

    let t2 = t1 + chrono::Duration::days(6);
    controller.store().set_now(Some(t2));
    review_once(&mut controller, Answer::Text("das Haus".into())).await;
    let record = stored(controller.store(), "haus").record;
    assert_eq!((record.repetitions, record.interval), (3, 17));
    assert!((record.ease_factor - 2.8).abs() < 1e-9);

    let t3 = t2 + chrono::Duration::days(17);
    controller.store().set_now(Some(t3));
    review_once(&mut controller, Answer::Text("Haus".into())).await;
    let record = stored(controller.store(), "haus").record;
    assert_eq!((record.repetitions, record.interval), (0, 1));
    assert!((record.ease_factor - 2.8).abs() < 1e-9);
    assert_eq!(record.next_review_at, t3 + chrono::Duration::days(1));
}

#[tokio::test]
async fn going_back_shows_the_recorded_outcome_without_regrading() {
    let now = start_of_day();
    let store = store_with(
        vec![
            new_entry(noun("Apfel", "яблоко", Article::Der), Category::Noun, now),
            new_entry(noun("Birne", "груша", Article::Die), Category::Noun, now),
        ],
        now,
    );
    let mut controller = SessionController::new(store, ScriptedService::default(), &config());
    let id = controller.start_session(&WordFilter::all()).await.unwrap();

    assert!(matches!(
        controller.go_back(id).await,
        Err(SessionError::AtFirstWord)
    ));
    assert_eq!(controller.current_exercise(id).unwrap().word_key, "apfel");
    controller
        .submit_answer(id, Answer::SelfReport(Recall::Easy))
        .await
        .unwrap();
    assert!(!controller.can_go_back(id));
    assert!(matches!(
        controller.go_back(id).await,
        Err(SessionError::InvalidState { .. })
    ));

    assert_eq!(
        controller.advance(id).await.unwrap(),
        Advance::Next {
            progress_saved: true
        }
    );
    assert_eq!(controller.current_exercise(id).unwrap().word_key, "birne");
    assert!(controller.can_go_back(id));

    controller.go_back(id).await.unwrap();
    assert_eq!(controller.state(id).unwrap(), SessionState::Feedback);
    let revisited = controller.current_exercise(id).unwrap();
    assert_eq!(revisited.word_key, "apfel");
    assert!(revisited.outcome.is_some());
    assert!(matches!(
        controller
            .submit_answer(id, Answer::SelfReport(Recall::Forgot))
            .await,
        Err(SessionError::InvalidState { .. })
    ));

    controller.advance(id).await.unwrap();
    assert_eq!(controller.state(id).unwrap(), SessionState::Presenting);
    assert_eq!(controller.current_exercise(id).unwrap().word_key, "birne");
    assert_eq!(stored(controller.store(), "apfel").record.repetitions, 1);
    assert_eq!(controller.session(id).unwrap().summary().correct, 1);
}

#[tokio::test]
async fn nothing_due_offers_review_anyway() {
    let now = start_of_day();
    let mut later = new_entry(noun("Haus", "дом", Article::Das), Category::Noun, now);
    later.record.next_review_at = now + chrono::Duration::days(3);
    let store = store_with(vec![later], now);
    let mut controller = SessionController::new(store, ScriptedService::default(), &config());

    assert!(matches!(
        controller.start_session(&WordFilter::all()).await,
        Err(SessionError::NothingDue { candidates: 1 })
    ));

    let id = controller
        .start_review_anyway(&WordFilter::all())
        .await
        .unwrap();
    assert!(controller.session(id).unwrap().review_anyway);
    assert_eq!(controller.state(id).unwrap(), SessionState::Presenting);

    let verbs_only = WordFilter {
        categories: Some(vec![Category::Verb]),
        ..Default::default()
    };
    assert!(matches!(
        controller.start_review_anyway(&verbs_only).await,
        Err(SessionError::NoWords)
    ));
}

#[tokio::test]
async fn filter_and_limit_shape_the_queue() {
    let now = start_of_day();
    let mut entries = Vec::new();
    for (i, word) in ["eins", "zwei", "drei"].into_iter().enumerate() {
        let mut entry = new_entry(WordDetails::new(word, "число"), Category::Other, now);
        entry.record.next_review_at = now - chrono::Duration::days(3 - i as i64);
        entries.push(entry);
    }
    entries.push(new_entry(WordDetails::new("laufen", "бегать"), Category::Verb, now));
    let mut controller =
        SessionController::new(store_with(entries, now), ScriptedService::default(), &config());

    let filter = WordFilter {
        categories: Some(vec![Category::Other]),
        limit: Some(2),
        ..Default::default()
    };
    let id = controller.start_session(&filter).await.unwrap();
    let keys: Vec<&str> = controller
        .session(id)
        .unwrap()
        .items()
        .iter()
        .map(|item| item.entry.key())
        .collect();
    assert_eq!(keys, vec!["eins", "zwei"]);
}

#[tokio::test]
async fn persistence_failure_reports_unsaved_progress_and_continues() {
    let now = start_of_day();
    let store = FlakyStore::default();
    store.inner.set_now(Some(now));
    for word in ["eins", "zwei"] {
        store
            .inner
            .upsert(&new_entry(WordDetails::new(word, "число"), Category::Other, now))
            .unwrap();
    }
    store.fail_writes.store(true, Ordering::SeqCst);
    let mut controller = SessionController::new(store, ScriptedService::default(), &config());

    let id = controller.start_session(&WordFilter::all()).await.unwrap();
    controller
        .submit_answer(id, Answer::SelfReport(Recall::Remembered))
        .await
        .unwrap();
    let advance = controller.advance(id).await.unwrap();
    assert_eq!(
        advance,
        Advance::Next {
            progress_saved: false
        }
    );
    assert!(controller.last_error(id).unwrap().is_some());
    assert_eq!(controller.state(id).unwrap(), SessionState::Presenting);
    assert_eq!(stored(controller.store(), "eins").record.repetitions, 0);

    controller.store().fail_writes.store(false, Ordering::SeqCst);
    controller
        .submit_answer(id, Answer::SelfReport(Recall::Remembered))
        .await
        .unwrap();
    match controller.advance(id).await.unwrap() {
        Advance::Complete {
            summary,
            progress_saved,
        } => {
            assert!(progress_saved);
            assert_eq!(summary.unsaved, 1);
            assert_eq!(summary.correct, 2);
        }
        other => panic!("expected completion, got {other:?}"),
    }
    assert_eq!(stored(controller.store(), "zwei").record.repetitions, 1);
}

#[tokio::test]
async fn mismatched_answer_is_rejected_before_grading() {
    let now = start_of_day();
    let store = store_with(
        vec![new_entry(noun("Haus", "дом", Article::Das), Category::Noun, now)],
        now,
    );
    let mut controller = SessionController::new(store, ScriptedService::default(), &config());
    let id = controller.start_session(&WordFilter::all()).await.unwrap();

    let err = controller
        .submit_answer(id, Answer::Text("das Haus".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::AnswerMismatch(Archetype::Flashcard)));
    assert_eq!(controller.state(id).unwrap(), SessionState::Presenting);
}

#[tokio::test]
async fn skipping_leaves_the_record_alone() {
    let now = start_of_day();
    let entry = seen_entry(noun("Haus", "дом", Article::Das), Category::Noun, now, 1, 1);
    let store = store_with(vec![entry.clone()], now);
    let service = ScriptedService::default();
    service.fail_grading.store(true, Ordering::SeqCst);
    let mut controller = SessionController::new(store, service, &recall_only_config());
    let id = controller.start_session(&WordFilter::all()).await.unwrap();

    assert!(
        controller
            .submit_answer(id, Answer::Text("das Haus".into()))
            .await
            .is_err()
    );
    match controller.skip(id).await.unwrap() {
        Advance::Complete { summary, .. } => {
            assert_eq!(summary.skipped, 1);
            assert_eq!(summary.incorrect + summary.correct, 0);
        }
        other => panic!("expected completion, got {other:?}"),
    }
    assert_eq!(stored(controller.store(), "haus"), entry);
    assert!(matches!(
        controller.skip(id).await,
        Err(SessionError::InvalidState { .. })
    ));
}

#[tokio::test]
async fn subscribers_observe_state_changes() {
    let now = start_of_day();
    let store = store_with(
        vec![new_entry(noun("Haus", "дом", Article::Das), Category::Noun, now)],
        now,
    );
    let mut controller = SessionController::new(store, ScriptedService::default(), &config());
    let id = controller.start_session(&WordFilter::all()).await.unwrap();

    let mut rx = controller.subscribe(id).unwrap();
    assert_eq!(*rx.borrow_and_update(), SessionState::Presenting);

    controller
        .submit_answer(id, Answer::SelfReport(Recall::Forgot))
        .await
        .unwrap();
    assert!(rx.has_changed().unwrap());
    assert_eq!(*rx.borrow_and_update(), SessionState::Feedback);

    controller.advance(id).await.unwrap();
    assert_eq!(*rx.borrow_and_update(), SessionState::Complete);
}

#[tokio::test]
async fn synonyms_are_accepted_with_a_lower_quality() {
    let now = start_of_day();
    let mut details = WordDetails::new("beginnen", "начинать");
    details.synonyms = vec!["anfangen".into()];
    let store = store_with(vec![seen_entry(details, Category::Verb, now, 1, 1)], now);
    let mut controller = SessionController::new(store, ScriptedService::default(), &recall_only_config());

    let id = controller.start_session(&WordFilter::all()).await.unwrap();
    let outcome = controller
        .submit_answer(id, Answer::Text("anfangen".into()))
        .await
        .unwrap();
    assert_eq!(outcome.grade, GradeOutcome::CorrectAsSynonym);
    assert_eq!(outcome.quality, Quality::GOOD);

    controller.advance(id).await.unwrap();
    let record = stored(controller.store(), "beginnen").record;
    assert_eq!(record.interval, 6);
    assert!((record.ease_factor - 2.5).abs() < 1e-9);
}

#[tokio::test]
async fn blank_content_falls_back_to_flashcard() {
    let now = start_of_day();
    let entry = seen_entry(noun("Haus", "дом", Article::Das), Category::Noun, now, 1, 1);
    let store = store_with(vec![entry.clone()], now);
    let service = ScriptedService::default();
    service.blank_content.store(true, Ordering::SeqCst);
    let mut controller = SessionController::new(store, service, &config());

    let id = controller.start_session(&WordFilter::all()).await.unwrap();
    let exercise = controller.current_exercise(id).unwrap();
    assert_eq!(exercise.archetype(), Archetype::Flashcard);
    assert!(exercise.fallback_from.is_some());
    assert_eq!(controller.service().content_calls.load(Ordering::SeqCst), 1);
    assert_eq!(stored(controller.store(), "haus"), entry);

    controller.close_session(id);
    assert_eq!(stored(controller.store(), "haus"), entry);
}

fn three_seen_words(now: DateTime<Utc>) -> InMemoryWordStore {
    let mut entries = Vec::new();
    for (i, (text, translation, article)) in [
        ("Apfel", "яблоко", Article::Der),
        ("Birne", "груша", Article::Die),
        ("Kirsche", "вишня", Article::Die),
    ]
    .into_iter()
    .enumerate()
    {
        let mut entry = seen_entry(noun(text, translation, article), Category::Noun, now, 1, 1);
        entry.record.next_review_at = now - chrono::Duration::days(3 - i as i64);
        entries.push(entry);
    }
    store_with(entries, now)
}

#[tokio::test]
async fn revisiting_an_ungraded_word_reuses_its_exercise() {
    let now = start_of_day();
    let mut controller =
        SessionController::new(three_seen_words(now), ScriptedService::default(), &config());
    let id = controller.start_session(&WordFilter::all()).await.unwrap();

    let apfel = controller.current_exercise(id).unwrap();
    assert_eq!(apfel.word_key, "apfel");
    controller.skip(id).await.unwrap();
    let birne = controller.current_exercise(id).unwrap();
    assert_eq!(controller.service().content_calls.load(Ordering::SeqCst), 2);

    controller.go_back(id).await.unwrap();
    assert_eq!(controller.state(id).unwrap(), SessionState::Presenting);
    let again = controller.current_exercise(id).unwrap();
    assert_eq!(again.content, apfel.content);
    assert_eq!(again.fallback_from, apfel.fallback_from);

    controller.skip(id).await.unwrap();
    assert_eq!(controller.current_exercise(id).unwrap().content, birne.content);
    assert_eq!(controller.service().content_calls.load(Ordering::SeqCst), 2);

    controller.skip(id).await.unwrap();
    let kirsche = controller.current_exercise(id).unwrap();
    assert_eq!(kirsche.word_key, "kirsche");
    assert_eq!(controller.service().content_calls.load(Ordering::SeqCst), 3);

    // Same seed without the detour: the third word draws the same exercise
    let mut straight =
        SessionController::new(three_seen_words(now), ScriptedService::default(), &config());
    let other = straight.start_session(&WordFilter::all()).await.unwrap();
    straight.skip(other).await.unwrap();
    straight.skip(other).await.unwrap();
    assert_eq!(straight.current_exercise(other).unwrap().content, kirsche.content);
}

#[tokio::test]
async fn a_skipped_word_graded_later_is_not_counted_twice() {
    let now = start_of_day();
    let store = store_with(
        vec![
            new_entry(noun("Apfel", "яблоко", Article::Der), Category::Noun, now),
            new_entry(noun("Birne", "груша", Article::Die), Category::Noun, now),
        ],
        now,
    );
    let mut controller = SessionController::new(store, ScriptedService::default(), &config());
    let id = controller.start_session(&WordFilter::all()).await.unwrap();

    controller.skip(id).await.unwrap();
    assert_eq!(controller.session(id).unwrap().summary().skipped, 1);

    controller.go_back(id).await.unwrap();
    assert_eq!(controller.current_exercise(id).unwrap().word_key, "apfel");
    controller
        .submit_answer(id, Answer::SelfReport(Recall::Easy))
        .await
        .unwrap();
    controller.advance(id).await.unwrap();
    let summary = controller.session(id).unwrap().summary().clone();
    assert_eq!((summary.skipped, summary.correct), (0, 1));

    match controller.skip(id).await.unwrap() {
        Advance::Complete { summary, .. } => {
            assert_eq!(summary.skipped, 1);
            assert_eq!(summary.correct, 1);
            assert!(summary.skipped + summary.correct + summary.synonyms + summary.incorrect <= summary.total);
        }
        other => panic!("expected completion, got {other:?}"),
    }
    assert_eq!(stored(controller.store(), "apfel").record.repetitions, 1);
}
