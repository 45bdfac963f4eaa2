//! Boundary to the reasoning/content service that writes exercises and grades answers.
//!
//! Every call is fallible and may be slow; the session controller bounds each
//! one with a timeout and never lets a failure touch scheduling state.

mod local;

pub use local::LocalReasoningService;

use async_trait::async_trait;

use crate::error::ServiceError;
use crate::models::{
    ArticleDrill, Category, ClozeExercise, Judgment, MultipleChoiceQuestion, RecallPrompt,
    VerbFormDrill, WordDetails, WordEntry,
};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// What the service gets to know about the word being practiced.
#[derive(Clone, Debug, PartialEq)]
pub struct ExerciseRequest {
    pub word: String,
    pub category: Category,
    pub details: WordDetails,
    /// Translations of other words, for building wrong options.
    pub distractors: Vec<String>,
}

impl ExerciseRequest {
    pub fn for_entry(entry: &WordEntry, distractors: Vec<String>) -> Self {
        Self {
            word: entry.details.text.clone(),
            category: entry.record.category,
            details: entry.details.clone(),
            distractors,
        }
    }
}

/// One method per exercise archetype, each returning structured content or a
/// structured judgment.
#[async_trait]
pub trait ReasoningService: Send + Sync {
    async fn generate_multiple_choice(
        &self,
        request: &ExerciseRequest,
    ) -> ServiceResult<MultipleChoiceQuestion>;

    async fn generate_article_drill(&self, request: &ExerciseRequest)
    -> ServiceResult<ArticleDrill>;

    async fn generate_verb_form_drill(
        &self,
        request: &ExerciseRequest,
    ) -> ServiceResult<VerbFormDrill>;

    async fn generate_cloze(&self, request: &ExerciseRequest) -> ServiceResult<ClozeExercise>;

    async fn generate_free_recall(&self, request: &ExerciseRequest)
    -> ServiceResult<RecallPrompt>;

    async fn grade_article_answer(
        &self,
        request: &ExerciseRequest,
        answer: &str,
    ) -> ServiceResult<Judgment>;

    async fn grade_verb_form_answer(
        &self,
        request: &ExerciseRequest,
        answer: &str,
    ) -> ServiceResult<Judgment>;

    async fn grade_cloze_answer(
        &self,
        request: &ExerciseRequest,
        exercise: &ClozeExercise,
        answer: &str,
    ) -> ServiceResult<Judgment>;

    async fn grade_recall_answer(
        &self,
        request: &ExerciseRequest,
        answer: &str,
    ) -> ServiceResult<Judgment>;
}

/// Lower-cases and collapses whitespace so answers compare loosely.
pub fn normalize_answer(answer: &str) -> String {
    answer
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
