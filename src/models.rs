use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub const MISSING_NOTE_MESSAGE: &str = "Please enter a description before selecting an emoji.";
pub const MISSING_EMOJI_MESSAGE: &str = "Please select an emoji.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{}", MISSING_NOTE_MESSAGE)]
    MissingNote,
    #[error("{}", MISSING_EMOJI_MESSAGE)]
    MissingEmoji,
    #[error("'{0}' is not a calendar date (expected YYYY-MM-DD)")]
    InvalidDate(String),
}

/// Fields missing from stored data read as empty, so such entries are
/// kept but fail `is_complete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodEntry {
    #[serde(default)]
    pub emoji: String,
    #[serde(default)]
    pub note: String,
}

impl MoodEntry {
    /// Builds an entry from user input. The note is stored trimmed and must
    /// not be blank; the emoji is kept as given and only scored on read.
    pub fn new(emoji: impl Into<String>, note: &str) -> Result<Self, ValidationError> {
        let note = note.trim();
        if note.is_empty() {
            return Err(ValidationError::MissingNote);
        }
        let emoji = emoji.into();
        if emoji.trim().is_empty() {
            return Err(ValidationError::MissingEmoji);
        }
        Ok(Self {
            emoji,
            note: note.to_string(),
        })
    }

    pub fn is_complete(&self) -> bool {
        !self.emoji.trim().is_empty() && !self.note.trim().is_empty()
    }
}

/// One entry per calendar day, keyed by ISO `YYYY-MM-DD`.
pub type MoodLog = BTreeMap<String, MoodEntry>;

pub fn validate_date_key(date: &str) -> Result<String, ValidationError> {
    let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(date.to_string()))?;
    let canonical = parsed.format("%Y-%m-%d").to_string();
    if canonical != date {
        return Err(ValidationError::InvalidDate(date.to_string()));
    }
    Ok(canonical)
}

/// Entries sorted newest first, optionally capped.
pub fn newest_first(log: &MoodLog, limit: Option<usize>) -> Vec<(&String, &MoodEntry)> {
    log.iter()
        .rev()
        .take(limit.unwrap_or(usize::MAX))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub uid: String,
    pub display_name: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct MoodEntryRequest {
    #[serde(default)]
    pub emoji: String,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryRow {
    pub date: String,
    pub emoji: String,
    pub note: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub entries: Vec<HistoryRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoodBand {
    Excellent,
    Good,
    Neutral,
    FeelingDown,
    NeedsSupport,
}

impl MoodBand {
    /// Lower bounds are inclusive, so a boundary value lands in the higher band.
    pub fn for_score(score: f64) -> Self {
        if score >= 4.5 {
            Self::Excellent
        } else if score >= 3.5 {
            Self::Good
        } else if score >= 2.5 {
            Self::Neutral
        } else if score >= 2.0 {
            Self::FeelingDown
        } else {
            Self::NeedsSupport
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Neutral => "Neutral",
            Self::FeelingDown => "Feeling Down",
            Self::NeedsSupport => "Needs support",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklySummary {
    pub dates: Vec<String>,
    pub chart_labels: Vec<String>,
    pub scores: Vec<u8>,
    pub average: Option<f64>,
    pub band: Option<MoodBand>,
    pub label: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AiSummaryResponse {
    pub summary: String,
    pub generated: bool,
}
