//! Offline stand-in for the reasoning service.
//!
//! Builds exercises from the linguistic details already stored with each word
//! and grades by normalized string comparison. Anything it cannot build from
//! those details is reported as a content-generation failure, which the
//! session turns into a flashcard.

use async_trait::async_trait;
use tracing::debug;

use super::{ExerciseRequest, ReasoningService, ServiceResult, normalize_answer};
use crate::error::ServiceError;
use crate::models::{
    Archetype, Article, ArticleDrill, ClozeExercise, Judgment, MultipleChoiceQuestion,
    RecallPrompt, VerbFormDrill,
};

const BLANK: &str = "______";

#[derive(Clone, Debug)]
pub struct LocalReasoningService {
    max_distractors: usize,
}

impl Default for LocalReasoningService {
    fn default() -> Self {
        Self { max_distractors: 3 }
    }
}

impl LocalReasoningService {
    pub fn new() -> Self {
        Self::default()
    }

    fn unavailable(archetype: Archetype, message: &str) -> ServiceError {
        debug!(%archetype, "local content unavailable: {message}");
        ServiceError::ContentGeneration {
            archetype,
            message: message.to_string(),
        }
    }

    fn judge(expected: &str, answer: &str) -> Judgment {
        if normalize_answer(answer) == normalize_answer(expected) {
            Judgment {
                is_correct: true,
                explanation: format!("Correct: {expected}."),
                correct_answer: Some(expected.to_string()),
                ..Default::default()
            }
        } else {
            Judgment {
                is_correct: false,
                explanation: format!("Not quite. The answer is \"{expected}\"."),
                correct_answer: Some(expected.to_string()),
                ..Default::default()
            }
        }
    }
}

/// Replaces the first whole-word occurrence of `word` in `sentence` with a blank.
/// Returns the sentence with the blank and the form that was removed.
fn blank_out(sentence: &str, word: &str) -> Option<(String, String)> {
    let target = normalize_answer(word);
    let mut found: Option<String> = None;
    let tokens: Vec<String> = sentence
        .split(' ')
        .map(|token| {
            if found.is_some() {
                return token.to_string();
            }
            let core = token.trim_matches(|c: char| !c.is_alphanumeric());
            if !core.is_empty() && core.to_lowercase() == target {
                found = Some(core.to_string());
                token.replacen(core, BLANK, 1)
            } else {
                token.to_string()
            }
        })
        .collect();
    found.map(|answer| (tokens.join(" "), answer))
}

fn starts_with_article(answer: &str) -> bool {
    normalize_answer(answer)
        .split(' ')
        .next()
        .is_some_and(|first| first.parse::<Article>().is_ok())
}

#[async_trait]
impl ReasoningService for LocalReasoningService {
    async fn generate_multiple_choice(
        &self,
        request: &ExerciseRequest,
    ) -> ServiceResult<MultipleChoiceQuestion> {
        let correct = request.details.translation.trim();
        if correct.is_empty() {
            return Err(Self::unavailable(Archetype::MultipleChoice, "no translation stored"));
        }

        let mut options: Vec<String> = request
            .distractors
            .iter()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty() && normalize_answer(d) != normalize_answer(correct))
            .take(self.max_distractors)
            .collect();
        if options.is_empty() {
            return Err(Self::unavailable(
                Archetype::MultipleChoice,
                "not enough other words for wrong options",
            ));
        }
        options.push(correct.to_string());
        options.sort();
        options.dedup();

        Ok(MultipleChoiceQuestion {
            question: format!("What does \"{}\" mean?", request.word),
            options,
            correct_answer: correct.to_string(),
        })
    }

    async fn generate_article_drill(
        &self,
        request: &ExerciseRequest,
    ) -> ServiceResult<ArticleDrill> {
        if request.details.noun.is_none() {
            return Err(Self::unavailable(Archetype::ArticleDrill, "no article stored"));
        }
        Ok(ArticleDrill {
            prompt: request.word.clone(),
            options: [Article::Der, Article::Die, Article::Das]
                .iter()
                .map(|a| a.to_string())
                .collect(),
        })
    }

    async fn generate_verb_form_drill(
        &self,
        request: &ExerciseRequest,
    ) -> ServiceResult<VerbFormDrill> {
        match &request.details.verb {
            Some(verb) if !verb.perfect.trim().is_empty() => Ok(VerbFormDrill {
                prompt: format!("Give the perfect tense of \"{}\"", request.word),
            }),
            _ => Err(Self::unavailable(Archetype::VerbFormDrill, "no perfect form stored")),
        }
    }

    async fn generate_cloze(&self, request: &ExerciseRequest) -> ServiceResult<ClozeExercise> {
        request
            .details
            .examples
            .iter()
            .find_map(|example| {
                blank_out(&example.text, &request.word).map(|(sentence, answer)| ClozeExercise {
                    sentence_with_blank: sentence,
                    translation: example.translation.clone(),
                    answer,
                })
            })
            .ok_or_else(|| {
                Self::unavailable(Archetype::ClozeSentence, "no example sentence uses the word")
            })
    }

    async fn generate_free_recall(
        &self,
        request: &ExerciseRequest,
    ) -> ServiceResult<RecallPrompt> {
        let translation = request.details.translation.trim();
        if translation.is_empty() {
            return Err(Self::unavailable(Archetype::FreeRecall, "no translation stored"));
        }
        Ok(RecallPrompt {
            prompt: format!("Which word means \"{translation}\"?"),
        })
    }

    async fn grade_article_answer(
        &self,
        request: &ExerciseRequest,
        answer: &str,
    ) -> ServiceResult<Judgment> {
        let noun = request
            .details
            .noun
            .as_ref()
            .ok_or_else(|| ServiceError::Grading("word has no article".to_string()))?;
        let mut judgment = Self::judge(&noun.article.to_string(), answer);
        judgment.explanation = if judgment.is_correct {
            format!("Correct: {} {}.", noun.article, request.word)
        } else {
            format!("Not quite: it is \"{} {}\".", noun.article, request.word)
        };
        Ok(judgment)
    }

    async fn grade_verb_form_answer(
        &self,
        request: &ExerciseRequest,
        answer: &str,
    ) -> ServiceResult<Judgment> {
        let verb = request
            .details
            .verb
            .as_ref()
            .ok_or_else(|| ServiceError::Grading("word has no verb forms".to_string()))?;
        Ok(Self::judge(&verb.perfect, answer))
    }

    async fn grade_cloze_answer(
        &self,
        _request: &ExerciseRequest,
        exercise: &ClozeExercise,
        answer: &str,
    ) -> ServiceResult<Judgment> {
        Ok(Self::judge(&exercise.answer, answer))
    }

    async fn grade_recall_answer(
        &self,
        request: &ExerciseRequest,
        answer: &str,
    ) -> ServiceResult<Judgment> {
        let expected = request.details.citation_form();

        if request.details.noun.is_some() && !starts_with_article(answer) {
            return Ok(Judgment {
                is_correct: false,
                explanation: format!("Nouns need their article. The answer is \"{expected}\"."),
                correct_answer: Some(expected),
                ..Default::default()
            });
        }

        let judgment = Self::judge(&expected, answer);
        if judgment.is_correct {
            return Ok(judgment);
        }

        let given = normalize_answer(answer);
        let synonym = request.details.synonyms.iter().find(|synonym| {
            let synonym = normalize_answer(synonym);
            given == synonym || given.split_once(' ').is_some_and(|(_, rest)| rest == synonym)
        });
        match synonym {
            Some(synonym) => Ok(Judgment {
                is_correct: true,
                is_synonym: true,
                explanation: format!("Also right: \"{synonym}\" is a synonym of \"{expected}\"."),
                correct_answer: Some(expected),
                hint: None,
            }),
            None => Ok(judgment),
        }
    }
}
