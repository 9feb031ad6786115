//! Snapshot loading
//!
//! The preview harness works on a JSON snapshot of master data and objectives.
//! A snapshot is read-only input: nothing here writes it back.

use super::filter::SavedFilter;
use super::programs::Program;
use super::rituals::Ritual;
use super::{CurrentUser, Objective, ObjectiveStatus, OrganizationalUnit, Sprint, User};
use crate::config::Config;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;

/// Everything the views render, as supplied by the caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub current_user: Option<CurrentUser>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub organizational_units: Vec<OrganizationalUnit>,
    #[serde(default)]
    pub sprints: Vec<Sprint>,
    #[serde(default)]
    pub programs: Vec<Program>,
    #[serde(default)]
    pub objectives: Vec<Objective>,
    #[serde(default)]
    pub saved_filters: Vec<SavedFilter>,
    #[serde(default)]
    pub rituals: Vec<Ritual>,
}

/// A reference to an id that is not present in the snapshot
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DanglingReference {
    ParentObjective { objective_id: String, missing_id: String },
    OrganizationalUnit { objective_id: String, missing_id: String },
    Program { objective_id: String, missing_id: String },
    LinkedObjective { key_result_id: String, missing_id: String },
    ParentUnit { unit_id: String, missing_id: String },
}

impl Snapshot {
    pub fn from_json(json: &str) -> Result<Self> {
        let mut snapshot: Snapshot =
            serde_json::from_str(json).context("Failed to parse OKR snapshot")?;
        snapshot.resolve_derived_fields();
        Ok(snapshot)
    }

    /// Fill `organizational_level` and `organizational_unit` on every
    /// objective from the unit collection. Unknown units clear both fields.
    pub fn resolve_derived_fields(&mut self) {
        let units: HashMap<&str, &OrganizationalUnit> = self
            .organizational_units
            .iter()
            .map(|u| (u.id.as_str(), u))
            .collect();
        for objective in &mut self.objectives {
            match units.get(objective.organizational_unit_id.as_str()) {
                Some(unit) => {
                    objective.organizational_level = Some(unit.level);
                    objective.organizational_unit = Some(unit.name.clone());
                }
                None => {
                    objective.organizational_level = None;
                    objective.organizational_unit = None;
                }
            }
        }
    }

    pub fn objective(&self, id: &str) -> Option<&Objective> {
        self.objectives.iter().find(|o| o.id == id)
    }

    pub fn sprint(&self, id: &str) -> Option<&Sprint> {
        self.sprints.iter().find(|s| s.id == id)
    }

    /// The sprint whose date range contains `today`, first match wins
    pub fn current_sprint(&self, today: NaiveDate) -> Option<&Sprint> {
        self.sprints.iter().find(|s| s.contains(today))
    }

    pub fn program(&self, id: &str) -> Option<&Program> {
        self.programs.iter().find(|p| p.id == id)
    }

    /// Names of the programs an objective belongs to, skipping unknown ids
    pub fn program_names(&self, objective: &Objective) -> Vec<&str> {
        objective
            .program_ids
            .iter()
            .filter_map(|id| self.program(id))
            .map(|p| p.name.as_str())
            .collect()
    }

    /// Users known to the snapshot: the explicit list followed by objective
    /// owners, deduplicated by id
    pub fn known_users(&self) -> Vec<&User> {
        let mut seen = HashSet::new();
        self.users
            .iter()
            .chain(self.objectives.iter().map(|o| &o.owner))
            .filter(|u| seen.insert(u.id.as_str()))
            .collect()
    }

    /// Every id reference that does not resolve. These are rendered as
    /// missing links, never treated as errors.
    pub fn dangling_references(&self) -> Vec<DanglingReference> {
        let objective_ids: HashSet<&str> = self.objectives.iter().map(|o| o.id.as_str()).collect();
        let unit_ids: HashSet<&str> = self
            .organizational_units
            .iter()
            .map(|u| u.id.as_str())
            .collect();
        let program_ids: HashSet<&str> = self.programs.iter().map(|p| p.id.as_str()).collect();

        let mut dangling = Vec::new();
        for unit in &self.organizational_units {
            if let Some(parent) = &unit.parent_id
                && !unit_ids.contains(parent.as_str())
            {
                dangling.push(DanglingReference::ParentUnit {
                    unit_id: unit.id.clone(),
                    missing_id: parent.clone(),
                });
            }
        }
        for objective in &self.objectives {
            if let Some(parent) = &objective.parent_objective_id
                && !objective_ids.contains(parent.as_str())
            {
                dangling.push(DanglingReference::ParentObjective {
                    objective_id: objective.id.clone(),
                    missing_id: parent.clone(),
                });
            }
            if !unit_ids.contains(objective.organizational_unit_id.as_str()) {
                dangling.push(DanglingReference::OrganizationalUnit {
                    objective_id: objective.id.clone(),
                    missing_id: objective.organizational_unit_id.clone(),
                });
            }
            for program in &objective.program_ids {
                if !program_ids.contains(program.as_str()) {
                    dangling.push(DanglingReference::Program {
                        objective_id: objective.id.clone(),
                        missing_id: program.clone(),
                    });
                }
            }
            for kr in &objective.key_results {
                if let Some(linked) = &kr.linked_child_objective_id
                    && !objective_ids.contains(linked.as_str())
                {
                    dangling.push(DanglingReference::LinkedObjective {
                        key_result_id: kr.id.clone(),
                        missing_id: linked.clone(),
                    });
                }
            }
        }
        dangling
    }

    pub fn stats(&self) -> SnapshotStats {
        let status_counts = self
            .objectives
            .iter()
            .fold(HashMap::new(), |mut acc, o| {
                *acc.entry(o.status).or_insert(0) += 1;
                acc
            });
        let key_results = self.objectives.iter().flat_map(|o| o.key_results.iter());
        let (total_key_results, total_metrics, total_tasks) =
            key_results.fold((0, 0, 0), |(krs, metrics, tasks), kr| {
                (krs + 1, metrics + kr.metrics.len(), tasks + kr.tasks.len())
            });

        SnapshotStats {
            total_objectives: self.objectives.len(),
            total_key_results,
            total_metrics,
            total_tasks,
            total_programs: self.programs.len(),
            total_saved_filters: self.saved_filters.len(),
            status_counts,
        }
    }
}

/// Counts reported by `okr-cascade stats`
#[derive(Debug, Serialize)]
pub struct SnapshotStats {
    pub total_objectives: usize,
    pub total_key_results: usize,
    pub total_metrics: usize,
    pub total_tasks: usize,
    pub total_programs: usize,
    pub total_saved_filters: usize,
    pub status_counts: HashMap<ObjectiveStatus, usize>,
}

/// Loads and caches a snapshot file
pub struct SnapshotLoader {
    path: PathBuf,
    cache: Arc<RwLock<Option<Snapshot>>>,
}

impl SnapshotLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Loader for the configured snapshot path, falling back to
    /// `<data dir>/snapshot.json`
    pub fn from_config(config: &Config) -> Result<Self> {
        let path = match &config.snapshot_path {
            Some(path) => path.clone(),
            None => Config::data_dir()
                .map(|dir| dir.join("snapshot.json"))
                .context("No snapshot path configured and no data directory available")?,
        };
        Ok(Self::new(path))
    }

    /// Load the snapshot, reading the file only on first use
    pub async fn load(&self) -> Result<Snapshot> {
        {
            let cache = self.cache.read().await;
            if let Some(snapshot) = cache.as_ref() {
                return Ok(snapshot.clone());
            }
        }
        self.reload().await
    }

    /// Read the file again and replace the cached snapshot
    pub async fn reload(&self) -> Result<Snapshot> {
        let data = fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read snapshot {}", self.path.display()))?;
        let snapshot = Snapshot::from_json(&data)
            .with_context(|| format!("Invalid snapshot {}", self.path.display()))?;

        let dangling = snapshot.dangling_references();
        if !dangling.is_empty() {
            tracing::warn!(
                path = %self.path.display(),
                count = dangling.len(),
                "Snapshot contains dangling references"
            );
        }
        tracing::info!(
            path = %self.path.display(),
            objectives = snapshot.objectives.len(),
            "OKR snapshot loaded"
        );

        let mut cache = self.cache.write().await;
        *cache = Some(snapshot.clone());
        Ok(snapshot)
    }

    pub async fn clear_cache(&self) {
        let mut cache = self.cache.write().await;
        *cache = None;
        tracing::debug!("OKR snapshot cache cleared");
    }
}
