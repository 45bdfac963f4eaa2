//! Weighted, category-aware choice of the next exercise archetype.
//!
//! Rules, in order:
//! 1. Unseen words (no repetitions, no interval) always get a flashcard
//! 2. The candidate set depends on the word's category
//! 3. One weighted draw over the candidates; grammar drills carry weight only
//!    while the ease factor is below their configured threshold
//!
//! Selections are independent of each other. The caller supplies the random source.

use rand::Rng;

use super::{Archetype, Category, ReviewRecord};
use crate::config::SelectionConfig;

const NOUN_ARCHETYPES: &[Archetype] = &[
    Archetype::MultipleChoice,
    Archetype::ArticleDrill,
    Archetype::ClozeSentence,
    Archetype::FreeRecall,
];

const VERB_ARCHETYPES: &[Archetype] = &[
    Archetype::MultipleChoice,
    Archetype::VerbFormDrill,
    Archetype::ClozeSentence,
    Archetype::FreeRecall,
];

const COMMON_ARCHETYPES: &[Archetype] = &[
    Archetype::MultipleChoice,
    Archetype::ClozeSentence,
    Archetype::FreeRecall,
];

/// Archetypes a category may ever draw once the word has been seen.
pub fn eligible_archetypes(category: Category) -> &'static [Archetype] {
    match category {
        Category::Noun => NOUN_ARCHETYPES,
        Category::Verb => VERB_ARCHETYPES,
        _ => COMMON_ARCHETYPES,
    }
}

#[derive(Clone, Debug, Default)]
pub struct ExerciseSelector {
    config: SelectionConfig,
}

impl ExerciseSelector {
    pub fn new(config: SelectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    fn weight(&self, archetype: Archetype, record: &ReviewRecord) -> f64 {
        let config = &self.config;
        match archetype {
            Archetype::Flashcard => 0.0,
            Archetype::MultipleChoice => config.multiple_choice,
            Archetype::ClozeSentence => config.cloze_sentence,
            Archetype::FreeRecall => config.free_recall,
            Archetype::ArticleDrill if record.ease_factor < config.article_drill_max_ease => {
                config.article_drill
            }
            Archetype::VerbFormDrill if record.ease_factor < config.verb_form_drill_max_ease => {
                config.verb_form_drill
            }
            Archetype::ArticleDrill | Archetype::VerbFormDrill => 0.0,
        }
    }

    /// Candidates with a positive weight for this record, in draw order.
    /// Empty for unseen words.
    pub fn weighted_candidates(&self, record: &ReviewRecord) -> Vec<(Archetype, f64)> {
        if record.is_unseen() {
            return Vec::new();
        }
        eligible_archetypes(record.category)
            .iter()
            .map(|&archetype| (archetype, self.weight(archetype, record)))
            .filter(|&(_, weight)| weight > 0.0)
            .collect()
    }

    pub fn select_archetype<R: Rng>(&self, record: &ReviewRecord, rng: &mut R) -> Archetype {
        let candidates = self.weighted_candidates(record);
        let total: f64 = candidates.iter().map(|(_, weight)| weight).sum();
        if candidates.is_empty() || total <= 0.0 {
            return Archetype::Flashcard;
        }

        let draw = rng.random_range(0.0..total);
        let mut cumulative = 0.0;
        for &(archetype, weight) in &candidates {
            cumulative += weight;
            if cumulative > draw {
                return archetype;
            }
        }
        // Rounding in the running sum can leave the draw just past the last bucket
        candidates[candidates.len() - 1].0
    }
}
