//! Exercise content, learner answers and grading outcomes.
use serde::{Deserialize, Serialize};

use super::archetype::Archetype;
use super::review_record::Category;
use super::sm2::Quality;
use super::word_details::WordDetails;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MultipleChoiceQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArticleDrill {
    pub prompt: String,
    pub options: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VerbFormDrill {
    pub prompt: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClozeExercise {
    pub sentence_with_blank: String,
    pub translation: String,
    pub answer: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecallPrompt {
    pub prompt: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ExerciseContent {
    Flashcard,
    MultipleChoice(MultipleChoiceQuestion),
    ArticleDrill(ArticleDrill),
    VerbFormDrill(VerbFormDrill),
    ClozeSentence(ClozeExercise),
    FreeRecall(RecallPrompt),
}

impl ExerciseContent {
    pub fn archetype(&self) -> Archetype {
        match self {
            ExerciseContent::Flashcard => Archetype::Flashcard,
            ExerciseContent::MultipleChoice(_) => Archetype::MultipleChoice,
            ExerciseContent::ArticleDrill(_) => Archetype::ArticleDrill,
            ExerciseContent::VerbFormDrill(_) => Archetype::VerbFormDrill,
            ExerciseContent::ClozeSentence(_) => Archetype::ClozeSentence,
            ExerciseContent::FreeRecall(_) => Archetype::FreeRecall,
        }
    }

    /// Content the learner cannot act on. Treated like a generation failure.
    pub fn is_empty(&self) -> bool {
        fn blank(s: &str) -> bool {
            s.trim().is_empty()
        }
        match self {
            ExerciseContent::Flashcard => false,
            ExerciseContent::MultipleChoice(q) => {
                blank(&q.question)
                    || blank(&q.correct_answer)
                    || q.options.len() < 2
                    || !q.options.iter().any(|o| o == &q.correct_answer)
            }
            ExerciseContent::ArticleDrill(d) => blank(&d.prompt) || d.options.is_empty(),
            ExerciseContent::VerbFormDrill(d) => blank(&d.prompt),
            ExerciseContent::ClozeSentence(c) => {
                blank(&c.sentence_with_blank) || blank(&c.answer)
            }
            ExerciseContent::FreeRecall(p) => blank(&p.prompt),
        }
    }
}

/// Learner's own three-way judgment on a flashcard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recall {
    Forgot,
    Remembered,
    Easy,
}

impl Recall {
    pub fn quality(self) -> Quality {
        match self {
            Recall::Forgot => Quality::AGAIN,
            Recall::Remembered => Quality::HARD,
            Recall::Easy => Quality::PERFECT,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Answer {
    SelfReport(Recall),
    Text(String),
}

/// Structured verdict from the grading boundary.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Judgment {
    pub is_correct: bool,
    #[serde(default)]
    pub is_synonym: bool,
    pub explanation: String,
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default)]
    pub correct_answer: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GradeOutcome {
    Correct,
    CorrectAsSynonym,
    Incorrect,
}

impl GradeOutcome {
    pub fn from_judgment(judgment: &Judgment) -> Self {
        match (judgment.is_correct, judgment.is_synonym) {
            (true, true) => GradeOutcome::CorrectAsSynonym,
            (true, false) => GradeOutcome::Correct,
            (false, _) => GradeOutcome::Incorrect,
        }
    }

    pub fn quality(self) -> Quality {
        match self {
            GradeOutcome::Correct => Quality::PERFECT,
            GradeOutcome::CorrectAsSynonym => Quality::GOOD,
            GradeOutcome::Incorrect => Quality::FAIL,
        }
    }
}

/// Result of one graded exercise, as shown in the feedback step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub grade: GradeOutcome,
    pub quality: Quality,
    pub explanation: Option<String>,
    pub hint: Option<String>,
    pub correct_answer: Option<String>,
}

impl Outcome {
    pub fn from_judgment(judgment: Judgment) -> Self {
        let grade = GradeOutcome::from_judgment(&judgment);
        Self {
            grade,
            quality: grade.quality(),
            explanation: Some(judgment.explanation).filter(|e| !e.trim().is_empty()),
            hint: judgment.hint,
            correct_answer: judgment.correct_answer,
        }
    }

    pub fn from_recall(recall: Recall) -> Self {
        let grade = match recall {
            Recall::Forgot => GradeOutcome::Incorrect,
            Recall::Remembered | Recall::Easy => GradeOutcome::Correct,
        };
        Self {
            grade,
            quality: recall.quality(),
            explanation: None,
            hint: None,
            correct_answer: None,
        }
    }
}

/// Everything a front end needs to render the current turn.
#[derive(Clone, Debug, PartialEq)]
pub struct ExercisePresentation {
    pub word_key: String,
    pub category: Category,
    pub details: WordDetails,
    pub content: ExerciseContent,
    /// The selected archetype when content generation fell back to a flashcard.
    pub fallback_from: Option<Archetype>,
    pub position: usize,
    pub total: usize,
    /// Present when revisiting a word that was already graded this session.
    pub outcome: Option<Outcome>,
}

impl ExercisePresentation {
    pub fn archetype(&self) -> Archetype {
        self.content.archetype()
    }
}
