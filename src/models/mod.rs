pub mod archetype;
pub mod exercise;
pub mod exercise_selector;
pub mod review_record;
pub mod review_session;
pub mod session_state;
pub mod sm2;
pub mod word_details;

pub use archetype::Archetype;
pub use exercise::{
    Answer, ArticleDrill, ClozeExercise, ExerciseContent, ExercisePresentation, GradeOutcome,
    Judgment, MultipleChoiceQuestion, Outcome, Recall, RecallPrompt, VerbFormDrill,
};
pub use exercise_selector::ExerciseSelector;
pub use review_record::{Category, MasteryHint, ReviewRecord, normalize_key};
pub use review_session::{ReviewSession, SessionSummary};
pub use session_state::{SessionEvent, SessionState};
pub use sm2::Quality;
pub use word_details::{
    AdjectiveDetails, Article, ExampleSentence, NounDetails, VerbDetails, WordDetails, WordEntry,
};
