//! OKR rituals: planning, check-in, review and retrospective sessions

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RitualKind {
    Planning,
    CheckIn,
    Review,
    Retrospective,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RitualStatus {
    #[default]
    Upcoming,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ritual {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: RitualKind,
    pub title: String,
    pub sprint_id: String,
    #[serde(default)]
    pub sprint_name: String,
    pub date_time: DateTime<Utc>,
    #[serde(default)]
    pub facilitator: String,
    #[serde(default)]
    pub status: RitualStatus,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub participant_count: u32,
    /// Minutes
    #[serde(default)]
    pub duration: u32,
}

/// Rituals of one sprint, or all of them when `sprint_id` is `None`
pub fn for_sprint<'a>(rituals: &'a [Ritual], sprint_id: Option<&str>) -> Vec<&'a Ritual> {
    rituals
        .iter()
        .filter(|r| sprint_id.is_none_or(|id| r.sprint_id == id))
        .collect()
}

/// Upcoming rituals scheduled within `window` from `now`, soonest first
pub fn upcoming<'a>(
    rituals: &[&'a Ritual],
    now: DateTime<Utc>,
    window: Duration,
) -> Vec<&'a Ritual> {
    let horizon = now + window;
    let mut upcoming: Vec<&Ritual> = rituals
        .iter()
        .copied()
        .filter(|r| r.status == RitualStatus::Upcoming)
        .filter(|r| r.date_time >= now && r.date_time <= horizon)
        .collect();
    upcoming.sort_by_key(|r| r.date_time);
    upcoming
}

/// Most recently completed rituals, newest first, at most `limit`
pub fn recent<'a>(rituals: &[&'a Ritual], limit: usize) -> Vec<&'a Ritual> {
    let mut completed: Vec<&Ritual> = rituals
        .iter()
        .copied()
        .filter(|r| r.status == RitualStatus::Completed)
        .collect();
    completed.sort_by(|a, b| b.date_time.cmp(&a.date_time));
    completed.truncate(limit);
    completed
}
