use crate::models::MoodEntry;
use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySummary {
    pub date: String,
    pub entry_count: usize,
    /// Mean intensity for the day; 0.0 when the day has no entries, which
    /// the chart renders as a flat minimum bar.
    pub average_intensity: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklySummary {
    pub days: Vec<DaySummary>,
}

pub fn weekly_summary(entries: &[MoodEntry]) -> WeeklySummary {
    weekly_summary_at(Utc::now().date_naive(), entries)
}

/// Buckets the trailing 7 calendar days (oldest first, ending today) and
/// averages intensity per day.
pub fn weekly_summary_at(today: NaiveDate, entries: &[MoodEntry]) -> WeeklySummary {
    let mut days = Vec::with_capacity(7);
    for offset in (0..7).rev() {
        let date = today - Duration::days(offset);
        let mut count = 0usize;
        let mut total = 0f64;
        for entry in entries {
            if entry.created_at.date_naive() == date {
                count += 1;
                total += f64::from(entry.intensity);
            }
        }
        let average_intensity = if count == 0 { 0.0 } else { total / count as f64 };
        days.push(DaySummary {
            date: date.to_string(),
            entry_count: count,
            average_intensity,
        });
    }
    WeeklySummary { days }
}
