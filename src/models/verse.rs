//! Verses and chapters kept in the user's library. Only text is stored.
use serde::{Deserialize, Serialize};

pub const DEFAULT_TRANSLATION: &str = "KJV";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Verse {
    pub id: String,
    pub reference: String,
    pub text: String,
    pub translation: String,
}

impl Verse {
    pub fn new(reference: &str, text: &str, translation: &str) -> Self {
        Self {
            id: slugify(reference),
            reference: reference.trim().to_string(),
            text: text.trim().to_string(),
            translation: translation.to_string(),
        }
    }

    pub fn word_count(&self) -> u32 {
        word_count(&self.text)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: String,
    pub reference: String,
    pub translation: String,
    pub verses: Vec<String>,
}

impl Chapter {
    pub fn new(reference: &str, verses: Vec<String>, translation: &str) -> Self {
        Self {
            id: slugify(reference),
            reference: reference.trim().to_string(),
            translation: translation.to_string(),
            verses,
        }
    }

    pub fn verse_word_counts(&self) -> Vec<u32> {
        self.verses.iter().map(|v| word_count(v)).collect()
    }
}

/// Turns a reference like "John 3:16" into the id `john-3-16`.
pub fn slugify(reference: &str) -> String {
    reference
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

pub fn word_count(text: &str) -> u32 {
    text.split_whitespace().count() as u32
}
