//! Problem records and submission input.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::error::{RetainError, RetainResult};

/// Difficulty label carried over from the problem catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Difficulty {
    #[serde(alias = "EASY", alias = "easy")]
    Easy,
    #[serde(alias = "MEDIUM", alias = "medium")]
    Medium,
    #[serde(alias = "HARD", alias = "hard")]
    Hard,
}

/// A solved problem owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub id: Uuid,
    pub user_id: String,
    /// Catalog reference (e.g. a LeetCode slug or number), unique per user.
    pub external_ref: String,
    pub title: String,
    pub difficulty: Difficulty,
    pub tags: Vec<String>,
    pub description: String,
    pub first_solved_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Problem {
    /// Tags in their stored, comma-separated form.
    pub fn tags_joined(&self) -> String {
        join_tags(&self.tags)
    }
}

/// Input for a problem submission. Carries the original attempt alongside
/// the problem itself since the two are always created together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProblem {
    pub external_ref: String,
    pub title: String,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub description: String,
    pub approach_text: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

impl NewProblem {
    /// Create a new submission with the required fields.
    pub fn new(
        external_ref: impl Into<String>,
        title: impl Into<String>,
        difficulty: Difficulty,
        approach_text: impl Into<String>,
    ) -> Self {
        Self {
            external_ref: external_ref.into(),
            title: title.into(),
            difficulty,
            tags: Vec::new(),
            description: String::new(),
            approach_text: approach_text.into(),
            code: None,
            language: None,
        }
    }

    /// Builder: set the problem description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder: set tags.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Builder: attach code and its language.
    pub fn with_code(mut self, code: impl Into<String>, language: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self.language = Some(language.into());
        self
    }

    /// Check the fields every submission needs.
    pub fn validate(&self) -> RetainResult<()> {
        if self.external_ref.trim().is_empty() {
            return Err(RetainError::missing_field("external_ref"));
        }
        if self.title.trim().is_empty() {
            return Err(RetainError::missing_field("title"));
        }
        if self.approach_text.trim().is_empty() {
            return Err(RetainError::missing_field("approach_text"));
        }
        Ok(())
    }
}

/// Join tags into their stored form.
pub fn join_tags(tags: &[String]) -> String {
    tags.iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

/// Split a stored tag string, dropping blanks.
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_difficulty_parse_case_insensitive() {
        assert_eq!(Difficulty::from_str("EASY").unwrap(), Difficulty::Easy);
        assert_eq!(Difficulty::from_str("medium").unwrap(), Difficulty::Medium);
        assert_eq!(Difficulty::from_str("Hard").unwrap(), Difficulty::Hard);
        assert!(Difficulty::from_str("brutal").is_err());
    }

    #[test]
    fn test_difficulty_serde_aliases() {
        let d: Difficulty = serde_json::from_str("\"MEDIUM\"").unwrap();
        assert_eq!(d, Difficulty::Medium);
        assert_eq!(serde_json::to_string(&Difficulty::Hard).unwrap(), "\"Hard\"");
    }

    #[test]
    fn test_tags_round_trip_through_storage_form() {
        let tags = vec![" array ".to_string(), "".to_string(), "two-pointers".to_string()];
        let joined = join_tags(&tags);
        assert_eq!(joined, "array,two-pointers");
        assert_eq!(split_tags(&joined), vec!["array", "two-pointers"]);
        assert!(split_tags("").is_empty());
    }

    #[test]
    fn test_new_problem_validation() {
        let ok = NewProblem::new("1", "Two Sum", Difficulty::Easy, "hash map of complements");
        assert!(ok.validate().is_ok());

        let no_ref = NewProblem::new("  ", "Two Sum", Difficulty::Easy, "x");
        assert!(no_ref.validate().is_err());

        let no_approach = NewProblem::new("1", "Two Sum", Difficulty::Easy, "");
        assert!(no_approach.validate().is_err());
    }
}
