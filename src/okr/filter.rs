//! Objective filtering
//!
//! A [`FilterCriteria`] is what the filter bar and the saved filters carry:
//! every dimension is optional and most accept either a single value or a
//! list. Criteria are normalized once into [`NormalizedCriteria`] (lists,
//! empty meaning unconstrained) and matching runs against that form.
//!
//! Within a dimension values combine with OR; across dimensions with AND.

use super::{Objective, ObjectiveStatus, OkrValidationError, OrganizationalLevel};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// A criteria field that may hold a single value or a list of values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn as_slice(&self) -> &[T] {
        match self {
            OneOrMany::One(value) => std::slice::from_ref(value),
            OneOrMany::Many(values) => values,
        }
    }
}

impl<T> From<T> for OneOrMany<T> {
    fn from(value: T) -> Self {
        OneOrMany::One(value)
    }
}

impl<T> From<Vec<T>> for OneOrMany<T> {
    fn from(values: Vec<T>) -> Self {
        OneOrMany::Many(values)
    }
}

/// Absent -> empty, scalar -> one element, list -> itself
pub fn as_list<T>(value: Option<&OneOrMany<T>>) -> &[T] {
    match value {
        Some(v) => v.as_slice(),
        None => &[],
    }
}

/// Filter criteria as authored in the filter bar or stored on a saved filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    /// Owner user id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizational_unit_id: Option<OneOrMany<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizational_level: Option<OneOrMany<OrganizationalLevel>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program_id: Option<OneOrMany<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OneOrMany<ObjectiveStatus>>,

    /// Sprint id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sprint: Option<String>,
}

impl FilterCriteria {
    pub fn normalize(&self) -> NormalizedCriteria {
        NormalizedCriteria {
            owner: non_blank(self.owner.as_deref()),
            unit_ids: as_list(self.organizational_unit_id.as_ref()).to_vec(),
            levels: as_list(self.organizational_level.as_ref()).to_vec(),
            program_ids: as_list(self.program_id.as_ref()).to_vec(),
            statuses: as_list(self.status.as_ref()).to_vec(),
            sprint: non_blank(self.sprint.as_deref()),
        }
    }

    /// True when no dimension constrains the result
    pub fn is_empty(&self) -> bool {
        self.normalize().is_unconstrained()
    }

    pub fn matches(&self, objective: &Objective) -> bool {
        self.normalize().matches(objective)
    }

    /// Selected values flattened into removable chips
    pub fn chips(&self) -> Vec<CriteriaChip> {
        let normalized = self.normalize();
        let mut chips = Vec::new();
        if let Some(owner) = normalized.owner {
            chips.push(CriteriaChip::new(CriteriaDimension::Owner, owner));
        }
        chips.extend(
            normalized
                .unit_ids
                .into_iter()
                .map(|id| CriteriaChip::new(CriteriaDimension::OrganizationalUnit, id)),
        );
        chips.extend(
            normalized
                .levels
                .into_iter()
                .map(|l| CriteriaChip::new(CriteriaDimension::OrganizationalLevel, l.to_string())),
        );
        chips.extend(
            normalized
                .program_ids
                .into_iter()
                .map(|id| CriteriaChip::new(CriteriaDimension::Program, id)),
        );
        chips.extend(
            normalized
                .statuses
                .into_iter()
                .map(|s| CriteriaChip::new(CriteriaDimension::Status, s.to_string())),
        );
        if let Some(sprint) = normalized.sprint {
            chips.push(CriteriaChip::new(CriteriaDimension::Sprint, sprint));
        }
        chips
    }

    /// Copy of these criteria with one chip removed. A list emptied by the
    /// removal drops its dimension entirely.
    pub fn without_chip(&self, chip: &CriteriaChip) -> FilterCriteria {
        let mut next = self.clone();
        match chip.dimension {
            CriteriaDimension::Owner => {
                if next.owner.as_deref() == Some(chip.value.as_str()) {
                    next.owner = None;
                }
            }
            CriteriaDimension::Sprint => {
                if next.sprint.as_deref() == Some(chip.value.as_str()) {
                    next.sprint = None;
                }
            }
            CriteriaDimension::OrganizationalUnit => {
                next.organizational_unit_id =
                    remove_value(self.organizational_unit_id.as_ref(), |v| *v == chip.value);
            }
            CriteriaDimension::OrganizationalLevel => {
                next.organizational_level =
                    remove_value(self.organizational_level.as_ref(), |v| {
                        v.as_str() == chip.value
                    });
            }
            CriteriaDimension::Program => {
                next.program_id = remove_value(self.program_id.as_ref(), |v| *v == chip.value);
            }
            CriteriaDimension::Status => {
                next.status = remove_value(self.status.as_ref(), |v| v.as_str() == chip.value);
            }
        }
        next
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn remove_value<T: Clone>(
    field: Option<&OneOrMany<T>>,
    is_target: impl Fn(&T) -> bool,
) -> Option<OneOrMany<T>> {
    let remaining: Vec<T> = as_list(field)
        .iter()
        .filter(|v| !is_target(v))
        .cloned()
        .collect();
    if remaining.is_empty() {
        None
    } else {
        Some(OneOrMany::Many(remaining))
    }
}

/// Criteria in list form. An empty list or `None` leaves a dimension open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedCriteria {
    pub owner: Option<String>,
    pub unit_ids: Vec<String>,
    pub levels: Vec<OrganizationalLevel>,
    pub program_ids: Vec<String>,
    pub statuses: Vec<ObjectiveStatus>,
    pub sprint: Option<String>,
}

impl NormalizedCriteria {
    pub fn is_unconstrained(&self) -> bool {
        self.owner.is_none()
            && self.unit_ids.is_empty()
            && self.levels.is_empty()
            && self.program_ids.is_empty()
            && self.statuses.is_empty()
            && self.sprint.is_none()
    }

    pub fn matches(&self, objective: &Objective) -> bool {
        if let Some(owner) = &self.owner
            && objective.owner.id != *owner
        {
            return false;
        }
        if !self.unit_ids.is_empty() && !self.unit_ids.contains(&objective.organizational_unit_id)
        {
            return false;
        }
        if !self.levels.is_empty() {
            // An objective whose level has not been derived cannot satisfy a level constraint
            match objective.organizational_level {
                Some(level) if self.levels.contains(&level) => {}
                _ => return false,
            }
        }
        if !self.program_ids.is_empty()
            && !objective
                .program_ids
                .iter()
                .any(|p| self.program_ids.contains(p))
        {
            return false;
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&objective.status) {
            return false;
        }
        if let Some(sprint) = &self.sprint
            && objective.sprint != *sprint
        {
            return false;
        }
        true
    }

    pub fn filter<'a>(&self, objectives: &'a [Objective]) -> Vec<&'a Objective> {
        objectives.iter().filter(|o| self.matches(o)).collect()
    }
}

/// Does `objective` satisfy every present dimension of `criteria`?
pub fn matches(criteria: &FilterCriteria, objective: &Objective) -> bool {
    criteria.matches(objective)
}

/// Objectives matching `criteria`, in collection order
pub fn filter_objectives<'a>(
    criteria: &FilterCriteria,
    objectives: &'a [Objective],
) -> Vec<&'a Objective> {
    criteria.normalize().filter(objectives)
}

/// Live preview count ("N objectives match")
pub fn count_matches(criteria: &FilterCriteria, objectives: &[Objective]) -> usize {
    let normalized = criteria.normalize();
    objectives.iter().filter(|o| normalized.matches(o)).count()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriteriaDimension {
    Owner,
    OrganizationalUnit,
    OrganizationalLevel,
    Program,
    Status,
    Sprint,
}

impl fmt::Display for CriteriaDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CriteriaDimension::Owner => "owner",
            CriteriaDimension::OrganizationalUnit => "unit",
            CriteriaDimension::OrganizationalLevel => "level",
            CriteriaDimension::Program => "program",
            CriteriaDimension::Status => "status",
            CriteriaDimension::Sprint => "sprint",
        };
        f.pad(label)
    }
}

/// One selected value shown as a removable chip
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CriteriaChip {
    pub dimension: CriteriaDimension,
    pub value: String,
}

impl CriteriaChip {
    pub fn new(dimension: CriteriaDimension, value: impl Into<String>) -> Self {
        Self {
            dimension,
            value: value.into(),
        }
    }
}

/// A named, reusable set of criteria
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedFilter {
    pub id: String,
    pub name: String,
    /// Presets ship with the product and cannot be edited or deleted
    #[serde(default)]
    pub is_preset: bool,
    #[serde(default)]
    pub criteria: FilterCriteria,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub is_shared: bool,
}

impl SavedFilter {
    /// Create a custom (non-preset) filter with a generated id
    pub fn new(
        name: impl Into<String>,
        criteria: FilterCriteria,
        created_by: Option<String>,
        is_shared: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            is_preset: false,
            criteria,
            created_by,
            is_shared,
        }
    }

    pub fn validate(&self) -> Result<(), OkrValidationError> {
        if self.name.trim().is_empty() {
            return Err(OkrValidationError::EmptyFilterName);
        }
        Ok(())
    }

    /// Matching ignores whether the filter is a preset
    pub fn matches(&self, objective: &Objective) -> bool {
        self.criteria.matches(objective)
    }
}

/// Errors from editing the saved filter collection
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterPolicyError {
    #[error("filter {0} is a preset and cannot be modified")]
    PresetImmutable(String),

    #[error("filter {0} not found")]
    NotFound(String),

    #[error(transparent)]
    Invalid(#[from] OkrValidationError),
}

/// Caller-side collection of saved filters enforcing the preset policy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavedFilterSet {
    filters: Vec<SavedFilter>,
}

impl SavedFilterSet {
    pub fn new(filters: Vec<SavedFilter>) -> Self {
        Self { filters }
    }

    pub fn all(&self) -> &[SavedFilter] {
        &self.filters
    }

    pub fn get(&self, id: &str) -> Option<&SavedFilter> {
        self.filters.iter().find(|f| f.id == id)
    }

    /// The active filter, if the id still exists
    pub fn resolve_active(&self, active_id: Option<&str>) -> Option<&SavedFilter> {
        active_id.and_then(|id| self.get(id))
    }

    pub fn presets(&self) -> impl Iterator<Item = &SavedFilter> {
        self.filters.iter().filter(|f| f.is_preset)
    }

    pub fn custom(&self) -> impl Iterator<Item = &SavedFilter> {
        self.filters.iter().filter(|f| !f.is_preset)
    }

    /// Presets, shared filters, and the user's own filters
    pub fn visible_to<'a>(&'a self, user_id: &'a str) -> impl Iterator<Item = &'a SavedFilter> {
        self.filters.iter().filter(move |f| {
            f.is_preset || f.is_shared || f.created_by.as_deref() == Some(user_id)
        })
    }

    pub fn save_as_new(
        &mut self,
        name: &str,
        criteria: FilterCriteria,
        is_shared: bool,
        created_by: Option<String>,
    ) -> Result<&SavedFilter, FilterPolicyError> {
        let filter = SavedFilter::new(name.trim(), criteria, created_by, is_shared);
        filter.validate()?;
        tracing::info!(filter_id = %filter.id, name = %filter.name, "Saved filter created");
        self.filters.push(filter);
        let last = self.filters.len() - 1;
        Ok(&self.filters[last])
    }

    pub fn update(&mut self, id: &str, criteria: FilterCriteria) -> Result<(), FilterPolicyError> {
        let filter = self.editable_mut(id)?;
        filter.criteria = criteria;
        tracing::info!(filter_id = %id, "Saved filter updated");
        Ok(())
    }

    pub fn rename(&mut self, id: &str, name: &str) -> Result<(), FilterPolicyError> {
        if name.trim().is_empty() {
            return Err(OkrValidationError::EmptyFilterName.into());
        }
        let filter = self.editable_mut(id)?;
        filter.name = name.trim().to_string();
        Ok(())
    }

    pub fn delete(&mut self, id: &str) -> Result<SavedFilter, FilterPolicyError> {
        let index = self
            .filters
            .iter()
            .position(|f| f.id == id)
            .ok_or_else(|| FilterPolicyError::NotFound(id.to_string()))?;
        if self.filters[index].is_preset {
            return Err(FilterPolicyError::PresetImmutable(id.to_string()));
        }
        tracing::info!(filter_id = %id, "Saved filter deleted");
        Ok(self.filters.remove(index))
    }

    fn editable_mut(&mut self, id: &str) -> Result<&mut SavedFilter, FilterPolicyError> {
        let filter = self
            .filters
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| FilterPolicyError::NotFound(id.to_string()))?;
        if filter.is_preset {
            return Err(FilterPolicyError::PresetImmutable(id.to_string()));
        }
        Ok(filter)
    }
}
