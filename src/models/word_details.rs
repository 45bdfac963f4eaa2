//! Linguistic detail payload stored next to each review record.
//! The scheduler never reads it; only exercise generation does.
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::review_record::{Category, ReviewRecord};
use chrono::{DateTime, Utc};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Article {
    Der,
    Die,
    Das,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NounDetails {
    pub article: Article,
    #[serde(default)]
    pub plural: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VerbDetails {
    #[serde(default)]
    pub present_tense: String,
    pub perfect: String,
    #[serde(default)]
    pub government: Option<String>,
    #[serde(default)]
    pub reflexive: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdjectiveDetails {
    pub comparative: String,
    pub superlative: String,
    #[serde(default)]
    pub antonym: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExampleSentence {
    pub text: String,
    pub translation: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WordDetails {
    /// Display form of the word, as the learner typed it.
    pub text: String,
    #[serde(default)]
    pub translation: String,
    #[serde(default)]
    pub alternative_translations: Vec<String>,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub noun: Option<NounDetails>,
    #[serde(default)]
    pub verb: Option<VerbDetails>,
    #[serde(default)]
    pub adjective: Option<AdjectiveDetails>,
    #[serde(default)]
    pub examples: Vec<ExampleSentence>,
}

impl WordDetails {
    pub fn new(text: &str, translation: &str) -> Self {
        Self {
            text: text.trim().to_string(),
            translation: translation.trim().to_string(),
            ..Default::default()
        }
    }

    /// The answer expected in free recall: nouns carry their article.
    pub fn citation_form(&self) -> String {
        match &self.noun {
            Some(noun) => format!("{} {}", noun.article, self.text),
            None => self.text.clone(),
        }
    }
}

/// The persisted unit: scheduling state plus its linguistic payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WordEntry {
    pub record: ReviewRecord,
    pub details: WordDetails,
}

impl WordEntry {
    pub fn new(details: WordDetails, category: Category, now: DateTime<Utc>) -> Self {
        Self {
            record: ReviewRecord::new(&details.text, category, now),
            details,
        }
    }

    pub fn key(&self) -> &str {
        &self.record.word_key
    }
}
