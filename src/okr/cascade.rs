//! Cascade resolution over an objective snapshot
//!
//! Objectives form a forest through `parent_objective_id`. The resolver
//! indexes a caller-owned slice once and answers depth, ancestor and child
//! queries against it without mutating anything.
//!
//! Dangling parent references are treated as roots. Parent links that form a
//! cycle are cut at the first objective seen twice, so every walk terminates
//! with a partial chain.

use super::{KeyResult, Objective, OkrValidationError, OrganizationalLevel, OrganizationalUnit};
use std::collections::{HashMap, HashSet};

/// Read-only view of an objective collection for cascade queries
#[derive(Debug, Clone)]
pub struct CascadeResolver<'a> {
    objectives: &'a [Objective],
    by_id: HashMap<&'a str, &'a Objective>,
    unit_levels: HashMap<&'a str, OrganizationalLevel>,
}

/// One row of the flattened hierarchy view
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HierarchyEntry<'a> {
    pub depth: usize,
    pub objective: &'a Objective,
}

impl<'a> CascadeResolver<'a> {
    pub fn new(objectives: &'a [Objective]) -> Self {
        let mut by_id = HashMap::with_capacity(objectives.len());
        for objective in objectives {
            // First occurrence wins for duplicated ids
            by_id.entry(objective.id.as_str()).or_insert(objective);
        }
        Self {
            objectives,
            by_id,
            unit_levels: HashMap::new(),
        }
    }

    /// Resolve objective levels through the unit collection when an objective
    /// does not carry its derived level
    pub fn with_units(mut self, units: &'a [OrganizationalUnit]) -> Self {
        self.unit_levels = units.iter().map(|u| (u.id.as_str(), u.level)).collect();
        self
    }

    pub fn get(&self, id: &str) -> Option<&'a Objective> {
        self.by_id.get(id).copied()
    }

    pub fn parent_of(&self, objective: &Objective) -> Option<&'a Objective> {
        objective
            .parent_objective_id
            .as_deref()
            .and_then(|id| self.get(id))
    }

    /// Depth in the cascade: 0 for a root, 1 for its children and so on
    pub fn cascade_level(&self, objective: &Objective) -> usize {
        self.walk_ancestors(objective).len()
    }

    /// Ancestors ordered from the top-level objective down to the immediate
    /// parent. The objective itself is not included.
    pub fn ancestor_chain(&self, objective: &Objective) -> Vec<&'a Objective> {
        let mut chain = self.walk_ancestors(objective);
        chain.reverse();
        chain
    }

    /// Parents from the immediate one upward, stopping at a root, a dangling
    /// reference, or the first repeated id
    fn walk_ancestors(&self, objective: &Objective) -> Vec<&'a Objective> {
        let mut visited: HashSet<&str> = HashSet::new();
        visited.insert(objective.id.as_str());

        let mut ancestors = Vec::new();
        let mut parent_id = objective.parent_objective_id.as_deref();

        while let Some(id) = parent_id {
            let Some(parent) = self.get(id) else {
                tracing::debug!(
                    objective_id = %objective.id,
                    parent_id = %id,
                    "Parent objective not in snapshot, treating as root"
                );
                break;
            };
            if !visited.insert(parent.id.as_str()) {
                tracing::warn!(
                    objective_id = %objective.id,
                    repeated_id = %parent.id,
                    "Cycle in parent objective links, truncating ancestor walk"
                );
                break;
            }
            ancestors.push(parent);
            parent_id = parent.parent_objective_id.as_deref();
        }

        ancestors
    }

    /// Direct children, computed from `parent_objective_id` in collection order
    pub fn children_of(&self, objective_id: &str) -> Vec<&'a Objective> {
        self.objectives
            .iter()
            .filter(|o| o.id != objective_id)
            .filter(|o| o.parent_objective_id.as_deref() == Some(objective_id))
            .collect()
    }

    /// Objectives with no parent, or whose parent is missing from the snapshot
    pub fn roots(&self) -> Vec<&'a Objective> {
        self.objectives
            .iter()
            .filter(|o| self.parent_of(o).is_none())
            .collect()
    }

    /// Depth-first flattening of the forest for indented rendering.
    ///
    /// Every objective appears exactly once. Members of a parent cycle are
    /// unreachable from any root, so they are appended afterwards, each
    /// starting a new subtree in collection order.
    ///
    /// `depth` is the position in this flattened tree. Under a parent cycle it
    /// can be smaller than [`cascade_level`](Self::cascade_level), which counts
    /// every distinct ancestor the parent walk visits before an id repeats.
    pub fn hierarchy(&self) -> Vec<HierarchyEntry<'a>> {
        let mut entries = Vec::with_capacity(self.objectives.len());
        let mut seen: HashSet<&str> = HashSet::new();

        let starts = self
            .roots()
            .into_iter()
            .chain(self.objectives.iter());
        for start in starts {
            if seen.contains(start.id.as_str()) {
                continue;
            }
            let mut stack = vec![(start, 0usize)];
            while let Some((objective, depth)) = stack.pop() {
                if !seen.insert(objective.id.as_str()) {
                    continue;
                }
                entries.push(HierarchyEntry { depth, objective });
                for child in self.children_of(&objective.id).into_iter().rev() {
                    if !seen.contains(child.id.as_str()) {
                        stack.push((child, depth + 1));
                    }
                }
            }
        }

        entries
    }

    /// Organizational level of an objective, preferring the derived field
    pub fn level_of(&self, objective: &Objective) -> Option<OrganizationalLevel> {
        objective.organizational_level.or_else(|| {
            self.unit_levels
                .get(objective.organizational_unit_id.as_str())
                .copied()
        })
    }

    /// Candidates for a key result's cascade link: objectives strictly below
    /// the owning objective's level. When the owner's level is unknown every
    /// objective with a known level qualifies.
    pub fn linkable_objectives(&self, owner_objective_id: &str) -> Vec<&'a Objective> {
        let owner_level = self.get(owner_objective_id).and_then(|o| self.level_of(o));
        self.objectives
            .iter()
            .filter(|o| o.id != owner_objective_id)
            .filter(|o| match (self.level_of(o), owner_level) {
                (Some(level), Some(owner)) => level.is_below(owner),
                (Some(_), None) => true,
                (None, _) => false,
            })
            .collect()
    }

    /// Check a key result's `linked_child_objective_id` against the level rule.
    ///
    /// A link to an objective missing from the snapshot is accepted and simply
    /// not rendered.
    pub fn validate_key_result_link(&self, kr: &KeyResult) -> Result<(), OkrValidationError> {
        let Some(linked_id) = kr.linked_child_objective_id.as_deref() else {
            return Ok(());
        };
        if linked_id == kr.objective_id {
            return Err(OkrValidationError::LinkToOwnObjective);
        }
        let Some(linked) = self.get(linked_id) else {
            return Ok(());
        };
        let owner_level = self.get(&kr.objective_id).and_then(|o| self.level_of(o));
        let allowed = match (self.level_of(linked), owner_level) {
            (Some(level), Some(owner)) => level.is_below(owner),
            (Some(_), None) => true,
            (None, _) => false,
        };
        if allowed {
            Ok(())
        } else {
            Err(OkrValidationError::LinkNotLowerLevel {
                owner: kr.objective_id.clone(),
                linked: linked_id.to_string(),
            })
        }
    }
}

/// Units from the top of the organization down to `unit_id` inclusive.
/// Missing parents end the chain; repeated ids cut a cycle.
pub fn unit_chain<'a>(
    units: &'a [OrganizationalUnit],
    unit_id: &str,
) -> Vec<&'a OrganizationalUnit> {
    let by_id: HashMap<&str, &OrganizationalUnit> =
        units.iter().map(|u| (u.id.as_str(), u)).collect();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut chain = Vec::new();
    let mut next = Some(unit_id);

    while let Some(id) = next {
        let Some(unit) = by_id.get(id).copied() else {
            break;
        };
        if !visited.insert(unit.id.as_str()) {
            break;
        }
        chain.push(unit);
        next = unit.parent_id.as_deref();
    }

    chain.reverse();
    chain
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::okr::User;

    fn objective(id: &str, parent: Option<&str>) -> Objective {
        let obj = Objective::new(id, format!("Objective {id}"), "unit-1", User::new("u-1", "Ada"));
        match parent {
            Some(p) => obj.with_parent(p),
            None => obj,
        }
    }

    fn leveled(id: &str, level: OrganizationalLevel) -> Objective {
        let mut obj = objective(id, None);
        obj.organizational_level = Some(level);
        obj
    }

    fn ids(objectives: &[&Objective]) -> Vec<String> {
        objectives.iter().map(|o| o.id.clone()).collect()
    }

    #[test]
    fn test_cascade_levels() {
        let objectives = vec![
            objective("root", None),
            objective("child", Some("root")),
            objective("grandchild", Some("child")),
        ];
        let resolver = CascadeResolver::new(&objectives);

        assert_eq!(resolver.cascade_level(&objectives[0]), 0);
        assert_eq!(resolver.cascade_level(&objectives[1]), 1);
        assert_eq!(resolver.cascade_level(&objectives[2]), 2);
    }

    #[test]
    fn test_ancestor_chain_order() {
        let objectives = vec![
            objective("root", None),
            objective("child", Some("root")),
            objective("grandchild", Some("child")),
        ];
        let resolver = CascadeResolver::new(&objectives);

        assert!(resolver.ancestor_chain(&objectives[0]).is_empty());
        assert_eq!(ids(&resolver.ancestor_chain(&objectives[1])), vec!["root"]);
        assert_eq!(
            ids(&resolver.ancestor_chain(&objectives[2])),
            vec!["root", "child"]
        );
    }

    #[test]
    fn test_dangling_parent_is_root() {
        let objectives = vec![
            objective("orphan", Some("missing")),
            objective("child", Some("orphan")),
        ];
        let resolver = CascadeResolver::new(&objectives);

        assert_eq!(resolver.cascade_level(&objectives[0]), 0);
        assert_eq!(resolver.cascade_level(&objectives[1]), 1);
        assert_eq!(ids(&resolver.ancestor_chain(&objectives[1])), vec!["orphan"]);
        assert_eq!(ids(&resolver.roots()), vec!["orphan"]);
    }

    #[test]
    fn test_two_node_cycle_terminates() {
        let objectives = vec![objective("a", Some("b")), objective("b", Some("a"))];
        let resolver = CascadeResolver::new(&objectives);

        assert_eq!(resolver.cascade_level(&objectives[0]), 1);
        assert_eq!(resolver.cascade_level(&objectives[1]), 1);
        assert_eq!(ids(&resolver.ancestor_chain(&objectives[0])), vec!["b"]);
    }

    #[test]
    fn test_self_parent_terminates() {
        let objectives = vec![objective("a", Some("a"))];
        let resolver = CascadeResolver::new(&objectives);

        assert_eq!(resolver.cascade_level(&objectives[0]), 0);
        assert!(resolver.children_of("a").is_empty());
    }

    #[test]
    fn test_children_computed_from_parent_links() {
        let objectives = vec![
            objective("root", None),
            objective("c1", Some("root")),
            objective("other", None),
            objective("c2", Some("root")),
        ];
        let resolver = CascadeResolver::new(&objectives);

        assert_eq!(ids(&resolver.children_of("root")), vec!["c1", "c2"]);
        assert!(resolver.children_of("c1").is_empty());
    }

    #[test]
    fn test_hierarchy_is_depth_first() {
        let objectives = vec![
            objective("g1", Some("c1")),
            objective("root", None),
            objective("c1", Some("root")),
            objective("c2", Some("root")),
            objective("solo", None),
        ];
        let resolver = CascadeResolver::new(&objectives);

        let flat: Vec<(String, usize)> = resolver
            .hierarchy()
            .into_iter()
            .map(|e| (e.objective.id.clone(), e.depth))
            .collect();
        assert_eq!(
            flat,
            vec![
                ("root".to_string(), 0),
                ("c1".to_string(), 1),
                ("g1".to_string(), 2),
                ("c2".to_string(), 1),
                ("solo".to_string(), 0),
            ]
        );
    }

    #[test]
    fn test_hierarchy_includes_cycle_members_once() {
        let objectives = vec![
            objective("root", None),
            objective("a", Some("b")),
            objective("b", Some("a")),
        ];
        let resolver = CascadeResolver::new(&objectives);
        let entries = resolver.hierarchy();

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1].objective.id, "a");
        assert_eq!(entries[1].depth, 0);
        assert_eq!(entries[2].objective.id, "b");
        assert_eq!(entries[2].depth, 1);
    }

    #[test]
    fn test_linkable_objectives_are_lower_level() {
        let objectives = vec![
            leveled("group", OrganizationalLevel::Group),
            leveled("domain", OrganizationalLevel::Domain),
            leveled("team", OrganizationalLevel::Team),
            leveled("domain-2", OrganizationalLevel::Domain),
            objective("unknown", None),
        ];
        let resolver = CascadeResolver::new(&objectives);

        assert_eq!(
            ids(&resolver.linkable_objectives("domain")),
            vec!["team"]
        );
        assert_eq!(
            ids(&resolver.linkable_objectives("group")),
            vec!["domain", "team", "domain-2"]
        );
        assert!(resolver.linkable_objectives("team").is_empty());
    }

    #[test]
    fn test_level_resolved_through_units() {
        let units = vec![OrganizationalUnit {
            id: "unit-1".to_string(),
            name: "Platform".to_string(),
            level: OrganizationalLevel::Department,
            parent_id: None,
        }];
        let objectives = vec![objective("a", None)];
        let resolver = CascadeResolver::new(&objectives).with_units(&units);

        assert_eq!(
            resolver.level_of(&objectives[0]),
            Some(OrganizationalLevel::Department)
        );
    }

    #[test]
    fn test_validate_key_result_link() {
        let objectives = vec![
            leveled("entity", OrganizationalLevel::Entity),
            leveled("team", OrganizationalLevel::Team),
        ];
        let resolver = CascadeResolver::new(&objectives);

        let mut kr = KeyResult::new("kr-1", "entity", "Align teams");
        assert!(resolver.validate_key_result_link(&kr).is_ok());

        kr.linked_child_objective_id = Some("team".to_string());
        assert!(resolver.validate_key_result_link(&kr).is_ok());

        kr.linked_child_objective_id = Some("missing".to_string());
        assert!(resolver.validate_key_result_link(&kr).is_ok());

        kr.linked_child_objective_id = Some("entity".to_string());
        assert_eq!(
            resolver.validate_key_result_link(&kr),
            Err(OkrValidationError::LinkToOwnObjective)
        );

        let upward = KeyResult {
            linked_child_objective_id: Some("entity".to_string()),
            ..KeyResult::new("kr-2", "team", "Escalate")
        };
        assert!(matches!(
            resolver.validate_key_result_link(&upward),
            Err(OkrValidationError::LinkNotLowerLevel { .. })
        ));
    }

    #[test]
    fn test_unit_chain() {
        let unit = |id: &str, level, parent: Option<&str>| OrganizationalUnit {
            id: id.to_string(),
            name: id.to_uppercase(),
            level,
            parent_id: parent.map(str::to_string),
        };
        let units = vec![
            unit("team", OrganizationalLevel::Team, Some("dept")),
            unit("group", OrganizationalLevel::Group, None),
            unit("dept", OrganizationalLevel::Department, Some("group")),
        ];

        let chain: Vec<&str> = unit_chain(&units, "team")
            .into_iter()
            .map(|u| u.id.as_str())
            .collect();
        assert_eq!(chain, vec!["group", "dept", "team"]);
        assert!(unit_chain(&units, "nope").is_empty());
    }
}
