//! OKR (Objectives and Key Results) domain models
//!
//! This module provides the entities the preview harness renders:
//! - `OrganizationalUnit` - A node in the Group > Entity > Domain > Department > Team tree
//! - `Objective` - A goal owned by a unit and a person, optionally cascading from a parent
//! - `KeyResult` - A measurable outcome carrying metrics and tasks
//! - `Metric` - Baseline / current / target triple with a direction
//! - `Task` - Work item attached to a key result
//! - `Sprint`, `Program` - Master data referenced by objectives
//!
//! Everything here is plain data. The derived computations live in the
//! submodules: [`progress`], [`cascade`] and [`filter`].

pub mod cascade;
pub mod filter;
pub mod programs;
pub mod progress;
pub mod rituals;
pub mod snapshot;
pub mod tasks;

pub use cascade::CascadeResolver;
pub use filter::{FilterCriteria, NormalizedCriteria, OneOrMany, SavedFilter, SavedFilterSet};
pub use progress::{ProgressBand, compute_progress};
pub use snapshot::{Snapshot, SnapshotLoader};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Maximum number of metrics a key result may carry
pub const MAX_METRICS_PER_KEY_RESULT: usize = 3;

/// Organizational level, strictly ordered from the top of the tree down.
///
/// `Group < Entity < Domain < Department < Team` in `Ord` terms, so a level
/// that compares greater sits *lower* in the organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OrganizationalLevel {
    Group,
    Entity,
    Domain,
    Department,
    Team,
}

impl OrganizationalLevel {
    pub const ALL: [OrganizationalLevel; 5] = [
        OrganizationalLevel::Group,
        OrganizationalLevel::Entity,
        OrganizationalLevel::Domain,
        OrganizationalLevel::Department,
        OrganizationalLevel::Team,
    ];

    /// Position in the hierarchy, 0 for `Group`
    pub fn rank(self) -> usize {
        self as usize
    }

    /// True when `self` sits strictly below `other` in the organization
    pub fn is_below(self, other: OrganizationalLevel) -> bool {
        self > other
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrganizationalLevel::Group => "Group",
            OrganizationalLevel::Entity => "Entity",
            OrganizationalLevel::Domain => "Domain",
            OrganizationalLevel::Department => "Department",
            OrganizationalLevel::Team => "Team",
        }
    }
}

impl fmt::Display for OrganizationalLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for OrganizationalLevel {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseEnumError::new("organizational level", s))
    }
}

/// A node in the organizational tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationalUnit {
    pub id: String,
    pub name: String,
    pub level: OrganizationalLevel,
    #[serde(default)]
    pub parent_id: Option<String>,
}

/// A person referenced as owner, facilitator or assignee
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            avatar: None,
            email: None,
        }
    }

    /// Up to two uppercase initials, used for avatar badges
    pub fn initials(&self) -> String {
        self.name
            .split_whitespace()
            .filter_map(|part| part.chars().next())
            .flat_map(char::to_uppercase)
            .take(2)
            .collect()
    }
}

/// The logged-in user driving "My ..." views
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub entity: String,
    #[serde(default)]
    pub domain: String,
}

/// Lifecycle status shared by objectives and key results.
///
/// There is no enforced transition graph: any status may be set from any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ObjectiveStatus {
    #[default]
    Draft,
    Accepted,
    Active,
    Done,
    Archived,
    Cancelled,
}

pub type KeyResultStatus = ObjectiveStatus;

impl ObjectiveStatus {
    pub const ALL: [ObjectiveStatus; 6] = [
        ObjectiveStatus::Draft,
        ObjectiveStatus::Accepted,
        ObjectiveStatus::Active,
        ObjectiveStatus::Done,
        ObjectiveStatus::Archived,
        ObjectiveStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ObjectiveStatus::Draft => "Draft",
            ObjectiveStatus::Accepted => "Accepted",
            ObjectiveStatus::Active => "Active",
            ObjectiveStatus::Done => "Done",
            ObjectiveStatus::Archived => "Archived",
            ObjectiveStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for ObjectiveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ObjectiveStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseEnumError::new("status", s))
    }
}

/// A goal statement owned by an organizational unit and a person
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Objective {
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub description: String,

    pub organizational_unit_id: String,

    /// Derived from the organizational unit, see `Snapshot::resolve_derived_fields`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizational_level: Option<OrganizationalLevel>,

    /// Derived unit name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizational_unit: Option<String>,

    pub owner: User,

    #[serde(default)]
    pub status: ObjectiveStatus,

    /// Sprint reference (sprint id)
    #[serde(default)]
    pub sprint: String,

    /// 0-100, supplied externally and never derived from key results
    #[serde(default)]
    pub progress: u8,

    #[serde(default)]
    pub program_ids: Vec<String>,

    /// Single cascade parent. Children are computed from this link on demand.
    #[serde(default)]
    pub parent_objective_id: Option<String>,

    #[serde(default)]
    pub key_results: Vec<KeyResult>,
}

impl Objective {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        organizational_unit_id: impl Into<String>,
        owner: User,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            organizational_unit_id: organizational_unit_id.into(),
            organizational_level: None,
            organizational_unit: None,
            owner,
            status: ObjectiveStatus::Draft,
            sprint: String::new(),
            progress: 0,
            program_ids: Vec::new(),
            parent_objective_id: None,
            key_results: Vec::new(),
        }
    }

    /// Set the cascade parent
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_objective_id = Some(parent_id.into());
        self
    }

    /// Form requiredness checks for create/edit submissions
    pub fn validate(&self) -> Result<(), OkrValidationError> {
        if self.title.trim().is_empty() {
            return Err(OkrValidationError::EmptyTitle);
        }
        if self.organizational_unit_id.trim().is_empty() {
            return Err(OkrValidationError::MissingOrganizationalUnit);
        }
        if self.owner.id.trim().is_empty() {
            return Err(OkrValidationError::MissingOwner);
        }
        if self.parent_objective_id.as_deref() == Some(self.id.as_str()) {
            return Err(OkrValidationError::SelfParent);
        }
        for kr in &self.key_results {
            kr.validate()?;
        }
        Ok(())
    }
}

/// A measurable outcome belonging to exactly one objective
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyResult {
    pub id: String,

    pub title: String,

    /// Owning objective
    pub objective_id: String,

    #[serde(default)]
    pub status: KeyResultStatus,

    #[serde(default)]
    pub progress: u8,

    /// Optional cascade link to a different, lower-level objective
    #[serde(default)]
    pub linked_child_objective_id: Option<String>,

    #[serde(default)]
    pub tasks: Vec<Task>,

    #[serde(default)]
    pub metrics: Vec<Metric>,
}

impl KeyResult {
    pub fn new(
        id: impl Into<String>,
        objective_id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            objective_id: objective_id.into(),
            status: KeyResultStatus::Draft,
            progress: 0,
            linked_child_objective_id: None,
            tasks: Vec::new(),
            metrics: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), OkrValidationError> {
        if self.title.trim().is_empty() {
            return Err(OkrValidationError::EmptyKeyResultTitle);
        }
        if self.objective_id.trim().is_empty() {
            return Err(OkrValidationError::MissingObjective);
        }
        if self.metrics.is_empty() || self.metrics.len() > MAX_METRICS_PER_KEY_RESULT {
            return Err(OkrValidationError::MetricCount(self.metrics.len()));
        }
        if self.metrics.iter().any(|m| m.name.trim().is_empty()) {
            return Err(OkrValidationError::EmptyMetricName);
        }
        if self.linked_child_objective_id.as_deref() == Some(self.objective_id.as_str()) {
            return Err(OkrValidationError::LinkToOwnObjective);
        }
        Ok(())
    }

    pub fn open_tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|t| t.status == TaskStatus::Open)
    }
}

/// Display scale of a metric. Does not affect arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricScale {
    #[default]
    Percentage,
    Absolute,
    Score,
}

/// Whether progress is measured by the value going up or down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricDirection {
    #[default]
    Increase,
    Decrease,
}

/// A quantified target: baseline -> current -> target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub scale: MetricScale,
    #[serde(default)]
    pub direction: MetricDirection,
    pub baseline: f64,
    pub current_value: f64,
    pub target: f64,
    #[serde(default)]
    pub unit: String,
}

impl Metric {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        direction: MetricDirection,
        baseline: f64,
        target: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            scale: MetricScale::Percentage,
            direction,
            baseline,
            current_value: baseline,
            target,
            unit: String::new(),
        }
    }

    pub fn with_current_value(mut self, value: f64) -> Self {
        self.current_value = value;
        self
    }

    /// Progress percentage, see [`progress::compute_progress`]
    pub fn progress(&self) -> i64 {
        compute_progress(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Open,
    Completed,
}

/// Work item attached to a key result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub key_result_id: String,
    pub description: String,
    pub owner: User,
    #[serde(default)]
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    /// Set only while the task is completed
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SprintStatus {
    #[default]
    Inactive,
    Active,
    Done,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sprint {
    pub id: String,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub status: SprintStatus,
}

impl Sprint {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

/// Error returned when parsing one of the domain enums from user input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Validation errors for form submissions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OkrValidationError {
    #[error("objective title cannot be empty")]
    EmptyTitle,

    #[error("an organizational unit is required")]
    MissingOrganizationalUnit,

    #[error("an owner is required")]
    MissingOwner,

    #[error("an objective cannot be its own parent")]
    SelfParent,

    #[error("key result title cannot be empty")]
    EmptyKeyResultTitle,

    #[error("key result must belong to an objective")]
    MissingObjective,

    #[error("key result needs between 1 and 3 metrics, got {0}")]
    MetricCount(usize),

    #[error("metric name cannot be empty")]
    EmptyMetricName,

    #[error("key result cannot link to its own objective")]
    LinkToOwnObjective,

    #[error("linked objective {linked} is not below objective {owner} in the organization")]
    LinkNotLowerLevel { owner: String, linked: String },

    #[error("filter name cannot be empty")]
    EmptyFilterName,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kr_with_metrics(n: usize) -> KeyResult {
        let mut kr = KeyResult::new("kr-1", "obj-1", "Reduce churn");
        for i in 0..n {
            kr.metrics.push(Metric::new(
                format!("m-{i}"),
                "Churn",
                MetricDirection::Decrease,
                10.0,
                5.0,
            ));
        }
        kr
    }

    #[test]
    fn test_level_ordering() {
        assert!(OrganizationalLevel::Team.is_below(OrganizationalLevel::Department));
        assert!(OrganizationalLevel::Entity.is_below(OrganizationalLevel::Group));
        assert!(!OrganizationalLevel::Group.is_below(OrganizationalLevel::Group));
        assert_eq!(OrganizationalLevel::Domain.rank(), 2);
    }

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!("active".parse::<ObjectiveStatus>(), Ok(ObjectiveStatus::Active));
        assert_eq!(" Done ".parse::<ObjectiveStatus>(), Ok(ObjectiveStatus::Done));
        assert!("shipped".parse::<ObjectiveStatus>().is_err());
        assert_eq!(
            "team".parse::<OrganizationalLevel>(),
            Ok(OrganizationalLevel::Team)
        );
    }

    #[test]
    fn test_objective_validation() {
        let owner = User::new("u-1", "Ada Lovelace");
        let obj = Objective::new("obj-1", "Grow revenue", "unit-1", owner.clone());
        assert!(obj.validate().is_ok());

        let blank = Objective::new("obj-2", "  ", "unit-1", owner.clone());
        assert_eq!(blank.validate(), Err(OkrValidationError::EmptyTitle));

        let no_unit = Objective::new("obj-3", "Title", "", owner);
        assert_eq!(
            no_unit.validate(),
            Err(OkrValidationError::MissingOrganizationalUnit)
        );

        let own_parent =
            Objective::new("obj-4", "Loop", "unit-1", User::new("u-1", "A")).with_parent("obj-4");
        assert_eq!(own_parent.validate(), Err(OkrValidationError::SelfParent));
    }

    #[test]
    fn test_key_result_metric_count() {
        assert_eq!(
            kr_with_metrics(0).validate(),
            Err(OkrValidationError::MetricCount(0))
        );
        assert!(kr_with_metrics(1).validate().is_ok());
        assert!(kr_with_metrics(3).validate().is_ok());
        assert_eq!(
            kr_with_metrics(4).validate(),
            Err(OkrValidationError::MetricCount(4))
        );
    }

    #[test]
    fn test_user_initials() {
        assert_eq!(User::new("u", "ada lovelace king").initials(), "AL");
        assert_eq!(User::new("u", "Plato").initials(), "P");
    }

    #[test]
    fn test_objective_deserializes_camel_case() {
        let json = r#"{
            "id": "obj-1",
            "title": "Ship it",
            "organizationalUnitId": "unit-1",
            "owner": {"id": "u-1", "name": "Ada"},
            "status": "Active",
            "sprint": "s-1",
            "progress": 40,
            "programIds": ["p-1"],
            "parentObjectiveId": null,
            "childObjectiveIds": ["obj-9"],
            "keyResults": []
        }"#;
        let obj: Objective = serde_json::from_str(json).unwrap();
        assert_eq!(obj.status, ObjectiveStatus::Active);
        assert_eq!(obj.program_ids, vec!["p-1".to_string()]);
        assert!(obj.parent_objective_id.is_none());
    }
}
