use crate::catalog::lookup_score;
use crate::models::{MoodBand, MoodLog, WeeklySummary};

/// Number of most recent recorded days that make up the weekly window.
pub const WINDOW_SIZE: usize = 7;

pub const NO_DATA_LABEL: &str = "No mood data to analyze.";

/// Scores the last seven recorded days of a log.
///
/// The window counts recorded entries, not calendar days: a sparse log can
/// span several real weeks. ISO date keys sort correctly as strings, so the
/// map order is the chronological order.
pub fn build_weekly_summary(log: &MoodLog) -> WeeklySummary {
    let skip = log.len().saturating_sub(WINDOW_SIZE);

    let mut dates = Vec::with_capacity(WINDOW_SIZE);
    let mut chart_labels = Vec::with_capacity(WINDOW_SIZE);
    let mut scores = Vec::with_capacity(WINDOW_SIZE);
    for (date, entry) in log.iter().skip(skip) {
        dates.push(date.clone());
        chart_labels.push(chart_label(date));
        scores.push(lookup_score(&entry.emoji));
    }

    let average = average_score(&scores);
    let band = average.map(MoodBand::for_score);
    let label = band.map_or(NO_DATA_LABEL, MoodBand::label).to_string();

    WeeklySummary {
        dates,
        chart_labels,
        scores,
        average,
        band,
        label,
    }
}

fn average_score(scores: &[u8]) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }
    let total: u32 = scores.iter().map(|score| u32::from(*score)).sum();
    let mean = f64::from(total) / scores.len() as f64;
    Some((mean * 100.0).round() / 100.0)
}

/// `2024-06-03` → `06-03`.
fn chart_label(date: &str) -> String {
    date.get(5..).unwrap_or(date).to_string()
}
