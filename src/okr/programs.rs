//! Programs: cross-cutting initiatives that group objectives

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Person leading a program
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramLead {
    #[serde(alias = "id")]
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub initials: String,
    #[serde(default)]
    pub email: String,
}

/// Summary of an objective linked to a program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedObjective {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub organizational_unit: String,
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub owner: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    ProgramCreated,
    ProgramEdited,
    ObjectiveAdded,
    ObjectiveRemoved,
    ProgressUpdate,
    LeadAdded,
    LeadRemoved,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityUpdate {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub user: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub leads: Vec<ProgramLead>,
    #[serde(default)]
    pub linked_objectives: Vec<LinkedObjective>,
    #[serde(default)]
    pub overall_progress: u8,
    #[serde(default)]
    pub entities_involved: Vec<String>,
    #[serde(default)]
    pub activity_updates: Vec<ActivityUpdate>,
}

impl Program {
    /// Activity feed, newest first
    pub fn recent_activity(&self) -> Vec<&ActivityUpdate> {
        let mut updates: Vec<&ActivityUpdate> = self.activity_updates.iter().collect();
        updates.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        updates
    }
}

/// Dashboard filter. `None` on a field means "all".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramQuery {
    pub search: Option<String>,
    pub lead: Option<String>,
    pub entity: Option<String>,
}

impl ProgramQuery {
    pub fn matches(&self, program: &Program) -> bool {
        let matches_search = match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(query) => {
                let query = query.to_lowercase();
                program.name.to_lowercase().contains(&query)
                    || program.description.to_lowercase().contains(&query)
            }
        };
        let matches_lead = self
            .lead
            .as_deref()
            .is_none_or(|lead| program.leads.iter().any(|l| l.user_id == lead));
        let matches_entity = self
            .entity
            .as_deref()
            .is_none_or(|entity| program.entities_involved.iter().any(|e| e == entity));

        matches_search && matches_lead && matches_entity
    }

    pub fn apply<'a>(&self, programs: &'a [Program]) -> Vec<&'a Program> {
        programs.iter().filter(|p| self.matches(p)).collect()
    }
}

/// Distinct program leads across all programs, first occurrence wins
pub fn all_leads(programs: &[Program]) -> Vec<&ProgramLead> {
    let mut seen = HashSet::new();
    programs
        .iter()
        .flat_map(|p| p.leads.iter())
        .filter(|l| seen.insert(l.user_id.as_str()))
        .collect()
}

/// Distinct entities across all programs, sorted
pub fn all_entities(programs: &[Program]) -> Vec<&str> {
    programs
        .iter()
        .flat_map(|p| p.entities_involved.iter().map(String::as_str))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
