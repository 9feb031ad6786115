//! Correctness tests for the OKR cascade core.
//!
//! These tests ensure:
//! 1. Metric progress follows direction, rounding and zero-range rules
//! 2. Cascade levels and ancestor chains terminate on cycles and dangling parents
//! 3. Filter criteria combine OR within a dimension and AND across dimensions
//! 4. The bundled sample snapshot loads and renders consistently

use okr_cascade::okr::filter::{as_list, count_matches, filter_objectives};
use okr_cascade::okr::{
    CascadeResolver, FilterCriteria, Metric, MetricDirection, Objective, ObjectiveStatus,
    OneOrMany, OrganizationalLevel, SavedFilterSet, Snapshot, SnapshotLoader, User,
    compute_progress,
};

use chrono::NaiveDate;

// ============ Test Helpers ============

const SAMPLE: &str = include_str!("../data/sample_snapshot.json");

fn sample() -> Snapshot {
    Snapshot::from_json(SAMPLE).expect("sample snapshot parses")
}

fn owner() -> User {
    User::new("u-1", "Ada Lovelace")
}

fn ids(objectives: &[&Objective]) -> Vec<String> {
    objectives.iter().map(|o| o.id.clone()).collect()
}

// ============ Progress ============

mod progress {
    use super::*;

    #[test]
    fn increase_is_fraction_of_range() {
        let metric = Metric::new("m", "Revenue", MetricDirection::Increase, 0.0, 100.0)
            .with_current_value(40.0);
        assert_eq!(compute_progress(&metric), 40);
    }

    #[test]
    fn decrease_counts_reduction_towards_target() {
        let metric = Metric::new("m", "Churn", MetricDirection::Decrease, 10.0, 5.0)
            .with_current_value(7.0);
        assert_eq!(compute_progress(&metric), 60);
    }

    #[test]
    fn equal_baseline_and_target_is_zero() {
        let metric =
            Metric::new("m", "Flat", MetricDirection::Increase, 5.0, 5.0).with_current_value(9.0);
        assert_eq!(compute_progress(&metric), 0);
    }

    #[test]
    fn target_on_wrong_side_is_zero() {
        let metric = Metric::new("m", "Odd", MetricDirection::Decrease, 5.0, 8.0)
            .with_current_value(1.0);
        assert_eq!(compute_progress(&metric), 0);
    }

    #[test]
    fn overshoot_and_regression_are_not_clamped() {
        let over = Metric::new("m", "Over", MetricDirection::Increase, 0.0, 100.0)
            .with_current_value(150.0);
        let under = Metric::new("m", "Under", MetricDirection::Increase, 0.0, 100.0)
            .with_current_value(-50.0);
        assert_eq!(compute_progress(&over), 150);
        assert_eq!(compute_progress(&under), -50);
    }

    #[test]
    fn current_equal_to_baseline_is_zero_and_target_is_hundred() {
        let at_start = Metric::new("m", "Start", MetricDirection::Decrease, 4.0, 2.0);
        let at_target = at_start.clone().with_current_value(2.0);
        assert_eq!(compute_progress(&at_start), 0);
        assert_eq!(compute_progress(&at_target), 100);
    }

    #[test]
    fn sample_metrics() {
        let snapshot = sample();
        let expected = [
            ("m-1", 46),
            ("m-2", 40),
            ("m-3", 50),
            ("m-4", 45),
            ("m-5", 40),
            ("m-6", 0),
        ];
        let metrics: Vec<&Metric> = snapshot
            .objectives
            .iter()
            .flat_map(|o| o.key_results.iter())
            .flat_map(|kr| kr.metrics.iter())
            .collect();
        for (id, pct) in expected {
            let metric = metrics.iter().find(|m| m.id == id).unwrap();
            assert_eq!(compute_progress(metric), pct, "metric {id}");
        }
    }
}

// ============ Cascade ============

mod cascade {
    use super::*;

    #[test]
    fn chain_of_three() {
        let objectives = vec![
            Objective::new("a", "A", "g-1", owner()),
            Objective::new("b", "B", "e-1", owner()).with_parent("a"),
            Objective::new("c", "C", "d-1", owner()).with_parent("b"),
        ];
        let resolver = CascadeResolver::new(&objectives);

        assert_eq!(resolver.cascade_level(&objectives[0]), 0);
        assert_eq!(resolver.cascade_level(&objectives[1]), 1);
        assert_eq!(resolver.cascade_level(&objectives[2]), 2);
        assert_eq!(ids(&resolver.ancestor_chain(&objectives[2])), vec!["a", "b"]);
    }

    #[test]
    fn dangling_parent_stops_the_walk() {
        let objectives = vec![Objective::new("c", "C", "d-1", owner()).with_parent("gone")];
        let resolver = CascadeResolver::new(&objectives);

        assert_eq!(resolver.cascade_level(&objectives[0]), 0);
        assert!(resolver.ancestor_chain(&objectives[0]).is_empty());
    }

    #[test]
    fn two_cycle_terminates() {
        let objectives = vec![
            Objective::new("a", "A", "g-1", owner()).with_parent("b"),
            Objective::new("b", "B", "g-1", owner()).with_parent("a"),
        ];
        let resolver = CascadeResolver::new(&objectives);

        assert_eq!(resolver.cascade_level(&objectives[0]), 1);
        assert_eq!(ids(&resolver.ancestor_chain(&objectives[0])), vec!["b"]);
        assert_eq!(resolver.hierarchy().len(), 2);
    }

    #[test]
    fn three_cycle_with_tail_terminates() {
        let objectives = vec![
            Objective::new("a", "A", "g-1", owner()).with_parent("c"),
            Objective::new("b", "B", "g-1", owner()).with_parent("a"),
            Objective::new("c", "C", "g-1", owner()).with_parent("b"),
            Objective::new("d", "D", "g-1", owner()).with_parent("a"),
            Objective::new("e", "E", "g-1", owner()).with_parent("d"),
        ];
        let resolver = CascadeResolver::new(&objectives);

        assert_eq!(resolver.cascade_level(&objectives[3]), 3);
        assert_eq!(ids(&resolver.ancestor_chain(&objectives[3])), vec!["b", "c", "a"]);
        assert_eq!(resolver.cascade_level(&objectives[4]), 4);
        assert!(resolver.roots().is_empty());

        // Flattened depth follows the traversal, not the ancestor walk
        let rows: Vec<(usize, &str)> = resolver
            .hierarchy()
            .iter()
            .map(|e| (e.depth, e.objective.id.as_str()))
            .collect();
        assert_eq!(rows, vec![(0, "a"), (1, "b"), (2, "c"), (1, "d"), (2, "e")]);
    }

    #[test]
    fn self_parent_is_level_zero() {
        let objectives = vec![Objective::new("a", "A", "g-1", owner()).with_parent("a")];
        let resolver = CascadeResolver::new(&objectives);

        assert_eq!(resolver.cascade_level(&objectives[0]), 0);
        assert!(resolver.ancestor_chain(&objectives[0]).is_empty());
    }

    #[test]
    fn sample_cascade() {
        let snapshot = sample();
        let resolver =
            CascadeResolver::new(&snapshot.objectives).with_units(&snapshot.organizational_units);
        let leaf = snapshot.objective("obj-5").unwrap();

        assert_eq!(resolver.cascade_level(leaf), 4);
        assert_eq!(
            ids(&resolver.ancestor_chain(leaf)),
            vec!["obj-1", "obj-2", "obj-3", "obj-4"]
        );
        assert_eq!(ids(&resolver.roots()), vec!["obj-1", "obj-6"]);
        assert_eq!(ids(&resolver.children_of("obj-1")), vec!["obj-2"]);
    }

    #[test]
    fn sample_linkable_objectives_sit_below_the_owner() {
        let snapshot = sample();
        let resolver = CascadeResolver::new(&snapshot.objectives);

        assert_eq!(
            ids(&resolver.linkable_objectives("obj-3")),
            vec!["obj-4", "obj-5"]
        );
        for objective in &snapshot.objectives {
            for kr in &objective.key_results {
                assert!(resolver.validate_key_result_link(kr).is_ok(), "{}", kr.id);
            }
        }
    }

    #[test]
    fn hierarchy_orders_children_under_parents() {
        let snapshot = sample();
        let resolver = CascadeResolver::new(&snapshot.objectives);
        let rows: Vec<(usize, &str)> = resolver
            .hierarchy()
            .iter()
            .map(|e| (e.depth, e.objective.id.as_str()))
            .collect();

        assert_eq!(
            rows,
            vec![
                (0, "obj-1"),
                (1, "obj-2"),
                (2, "obj-3"),
                (3, "obj-4"),
                (4, "obj-5"),
                (0, "obj-6"),
            ]
        );
    }
}

// ============ Filters ============

mod filters {
    use super::*;

    #[test]
    fn as_list_normalizes_shapes() {
        let one = OneOrMany::One("x".to_string());
        let many = OneOrMany::Many(vec!["x".to_string(), "y".to_string()]);

        assert!(as_list::<String>(None).is_empty());
        assert_eq!(as_list(Some(&one)), ["x".to_string()]);
        assert_eq!(as_list(Some(&many)).len(), 2);
    }

    #[test]
    fn empty_criteria_match_everything() {
        let snapshot = sample();
        assert_eq!(
            count_matches(&FilterCriteria::default(), &snapshot.objectives),
            snapshot.objectives.len()
        );

        let blank = FilterCriteria {
            owner: Some("  ".to_string()),
            status: Some(OneOrMany::Many(Vec::new())),
            ..Default::default()
        };
        assert_eq!(count_matches(&blank, &snapshot.objectives), 6);
    }

    #[test]
    fn or_within_and_across_dimensions() {
        let snapshot = sample();
        let criteria = FilterCriteria {
            status: Some(OneOrMany::Many(vec![
                ObjectiveStatus::Active,
                ObjectiveStatus::Done,
            ])),
            organizational_level: Some(OneOrMany::One(OrganizationalLevel::Entity)),
            ..Default::default()
        };

        assert_eq!(
            ids(&filter_objectives(&criteria, &snapshot.objectives)),
            vec!["obj-2", "obj-6"]
        );
    }

    #[test]
    fn program_constraint_matches_on_intersection() {
        let snapshot = sample();
        let criteria = FilterCriteria {
            program_id: Some(OneOrMany::Many(vec![
                "prog-2".to_string(),
                "prog-unknown".to_string(),
            ])),
            ..Default::default()
        };

        assert_eq!(
            ids(&filter_objectives(&criteria, &snapshot.objectives)),
            vec!["obj-2", "obj-4"]
        );
    }

    #[test]
    fn level_constraint_excludes_objectives_without_a_level() {
        let objectives = vec![Objective::new("a", "A", "unknown-unit", owner())];
        let criteria = FilterCriteria {
            organizational_level: Some(OneOrMany::One(OrganizationalLevel::Group)),
            ..Default::default()
        };
        assert_eq!(count_matches(&criteria, &objectives), 0);
    }

    #[test]
    fn sample_saved_filters() {
        let snapshot = sample();
        let saved = SavedFilterSet::new(snapshot.saved_filters.clone());
        let count = |id: &str| {
            let filter = saved.get(id).unwrap();
            count_matches(&filter.criteria, &snapshot.objectives)
        };

        assert_eq!(count("preset-active"), 3);
        assert_eq!(count("preset-lower-levels"), 2);
        assert_eq!(count("filter-jonas-checkout"), 1);
        assert_eq!(saved.visible_to("u-1").count(), 2);
        assert_eq!(saved.visible_to("u-4").count(), 3);
    }

    #[test]
    fn presets_cannot_be_deleted() {
        let snapshot = sample();
        let mut saved = SavedFilterSet::new(snapshot.saved_filters.clone());

        assert!(saved.delete("preset-active").is_err());
        assert!(saved.delete("filter-jonas-checkout").is_ok());
        assert_eq!(saved.all().len(), 2);
    }
}

// ============ Snapshot ============

mod snapshot {
    use super::*;

    #[test]
    fn derived_fields_resolve_from_units() {
        let snapshot = sample();
        let objective = snapshot.objective("obj-4").unwrap();

        assert_eq!(
            objective.organizational_level,
            Some(OrganizationalLevel::Department)
        );
        assert_eq!(objective.organizational_unit.as_deref(), Some("E-commerce"));
    }

    #[test]
    fn current_sprint_by_date() {
        let snapshot = sample();
        let day = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();

        assert_eq!(snapshot.current_sprint(day(2026, 8, 1)).unwrap().id, "sprint-3");
        assert_eq!(snapshot.current_sprint(day(2026, 6, 30)).unwrap().id, "sprint-2");
        assert_eq!(snapshot.current_sprint(day(2026, 7, 1)).unwrap().id, "sprint-3");
        assert!(snapshot.current_sprint(day(2027, 1, 1)).is_none());
    }

    #[test]
    fn sample_has_no_dangling_references() {
        assert!(sample().dangling_references().is_empty());
    }

    #[test]
    fn sample_objectives_validate() {
        for objective in &sample().objectives {
            assert!(objective.validate().is_ok(), "{}", objective.id);
        }
    }

    #[tokio::test]
    async fn loader_caches_until_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        std::fs::write(&path, SAMPLE).unwrap();

        let loader = SnapshotLoader::new(&path);
        assert_eq!(loader.load().await.unwrap().objectives.len(), 6);

        std::fs::write(&path, r#"{ "objectives": [] }"#).unwrap();
        assert_eq!(loader.load().await.unwrap().objectives.len(), 6);
        assert!(loader.reload().await.unwrap().objectives.is_empty());
    }

    #[tokio::test]
    async fn loader_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let loader = SnapshotLoader::new(dir.path().join("missing.json"));
        assert!(loader.load().await.is_err());
    }
}
