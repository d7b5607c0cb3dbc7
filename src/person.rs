//! Person records and the query matcher
//!
//! A `Person` is an immutable two-field record. Matching builds candidate
//! strings from the record (names joined without a separator, names joined
//! with a space, field initials, word initials) and checks whether the
//! query occurs as a case-insensitive substring of any of them.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use unicode_segmentation::UnicodeSegmentation;

/// A single directory entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub first_name: String,
    pub last_name: String,
}

impl Person {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    /// Render-ready `"First Last"` display string
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Initials as `"F L"`, using the first grapheme cluster of each field.
    ///
    /// An empty field contributes an empty initial rather than panicking,
    /// so records with missing names still produce a well-defined candidate.
    pub fn initials(&self) -> String {
        format!(
            "{} {}",
            first_grapheme(&self.first_name),
            first_grapheme(&self.last_name)
        )
    }

    /// Initials of every whitespace-separated word across both fields,
    /// concatenated: `"Chris P. Bacon"` yields `"CPB"`, so the query `"cp"`
    /// finds the record even though the field initials are only `"C B"`.
    fn word_initials(&self) -> String {
        self.first_name
            .split_whitespace()
            .chain(self.last_name.split_whitespace())
            .map(first_grapheme)
            .collect()
    }

    /// Case-insensitive substring match against the candidate strings.
    ///
    /// The empty query trivially matches every record; blank (whitespace)
    /// queries are short-circuited upstream by the pipeline and never reach
    /// the latency path, but they are still total here.
    pub fn matches_query(&self, query: &str) -> bool {
        let candidates = [
            format!("{}{}", self.first_name, self.last_name),
            format!("{} {}", self.first_name, self.last_name),
            self.initials(),
            self.word_initials(),
        ];

        let needle = query.to_lowercase();
        candidates
            .iter()
            .any(|candidate| candidate.to_lowercase().contains(&needle))
    }
}

fn first_grapheme(s: &str) -> &str {
    s.graphemes(true).next().unwrap_or("")
}

/// The built-in sample directory
pub fn sample_people() -> Vec<Person> {
    vec![
        Person::new("Philipp", "Lackner"),
        Person::new("Beff", "Jezos"),
        Person::new("Chris P.", "Bacon"),
        Person::new("Jeve", "Stops"),
    ]
}

/// Load a directory from a JSON file: an array of `{firstName, lastName}`
pub fn load_people(path: &Path) -> Result<Vec<Person>, AppError> {
    let contents = std::fs::read_to_string(path)?;
    let people = serde_json::from_str(&contents)?;
    Ok(people)
}
