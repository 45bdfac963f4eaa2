//! Exercise archetypes a review turn can take.
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    #[strum(to_string = "flashcard")]
    Flashcard,
    #[strum(to_string = "multiple choice")]
    MultipleChoice,
    #[strum(to_string = "article drill")]
    ArticleDrill,
    #[strum(to_string = "verb form drill")]
    VerbFormDrill,
    #[strum(to_string = "cloze sentence")]
    ClozeSentence,
    #[strum(to_string = "free recall")]
    FreeRecall,
}

impl Archetype {
    /// Flashcards are built locally from the stored details; every other
    /// archetype asks the reasoning service for content.
    pub fn needs_content(self) -> bool {
        !matches!(self, Archetype::Flashcard)
    }
}
