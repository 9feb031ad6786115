//! Snapshot-driven report commands

use super::{
    CascadeArgs, Command, FilterArgs, ProgramsArgs, ProgressArgs, RitualsArgs, StatsArgs,
    TasksArgs,
};
use crate::config::{Config, ViewMode};
use crate::okr::cascade::unit_chain;
use crate::okr::filter::{CriteriaChip, count_matches, filter_objectives};
use crate::okr::programs::{Program, ProgramQuery, all_entities, all_leads};
use crate::okr::progress::{ProgressThresholds, key_result_metric_progress};
use crate::okr::rituals::{for_sprint, recent, upcoming};
use crate::okr::tasks::{TaskWithContext, my_tasks};
use crate::okr::{
    CascadeResolver, FilterCriteria, Metric, Objective, ObjectiveStatus, OneOrMany,
    OrganizationalLevel, SavedFilter, SavedFilterSet, Snapshot, SnapshotLoader, compute_progress,
};
use anyhow::{Context, Result};
use serde_json::json;
use std::fmt::Write as _;
use std::path::PathBuf;

pub async fn execute(command: Command, snapshot_path: Option<PathBuf>) -> Result<()> {
    if let Command::Config(args) = command {
        return super::config::execute(args).await;
    }

    let config = Config::load().await?;
    let loader = match snapshot_path {
        Some(path) => SnapshotLoader::new(path),
        None => SnapshotLoader::from_config(&config)?,
    };
    let snapshot = loader.load().await?;

    let output = match command {
        Command::Cascade(args) => cascade(args, &config, &snapshot)?,
        Command::Progress(args) => progress(args, &config, &snapshot)?,
        Command::Filter(args) => filter(args, &snapshot)?,
        Command::Tasks(args) => tasks(args, &config, &snapshot)?,
        Command::Programs(args) => programs(args, &snapshot)?,
        Command::Rituals(args) => rituals(args, &config, &snapshot)?,
        Command::Stats(args) => stats(args, &snapshot)?,
        Command::Config(_) => anyhow::bail!("config command does not read a snapshot"),
    };
    print!("{output}");
    Ok(())
}

fn cascade(args: CascadeArgs, config: &Config, snapshot: &Snapshot) -> Result<String> {
    let resolver =
        CascadeResolver::new(&snapshot.objectives).with_units(&snapshot.organizational_units);

    if let Some(id) = args.objective.as_deref() {
        let objective = resolver
            .get(id)
            .with_context(|| format!("Objective not found: {id}"))?;
        let ancestors = resolver.ancestor_chain(objective);
        let children = resolver.children_of(&objective.id);
        let linkable = resolver.linkable_objectives(&objective.id);
        let units = unit_chain(&snapshot.organizational_units, &objective.organizational_unit_id);

        if args.json {
            let value = json!({
                "objective": objective.id,
                "cascadeLevel": resolver.cascade_level(objective),
                "ancestors": ancestors.iter().map(|o| &o.id).collect::<Vec<_>>(),
                "unitPath": units.iter().map(|u| &u.id).collect::<Vec<_>>(),
                "children": children.iter().map(|o| &o.id).collect::<Vec<_>>(),
                "linkable": linkable.iter().map(|o| &o.id).collect::<Vec<_>>(),
            });
            return Ok(format!("{}\n", serde_json::to_string_pretty(&value)?));
        }

        let mut out = String::new();
        let crumbs: Vec<&str> = ancestors
            .iter()
            .map(|o| o.title.as_str())
            .chain(std::iter::once(objective.title.as_str()))
            .collect();
        writeln!(out, "{}", crumbs.join(" > "))?;
        if ancestors.is_empty() {
            writeln!(out, "Top-level objective")?;
        }
        if !units.is_empty() {
            let names: Vec<&str> = units.iter().map(|u| u.name.as_str()).collect();
            writeln!(out, "Unit: {}", names.join(" > "))?;
        }
        writeln!(out, "Cascade level: {}", resolver.cascade_level(objective))?;
        writeln!(out, "Children:")?;
        for child in &children {
            writeln!(out, "  - {} ({})", child.title, child.id)?;
        }
        writeln!(out, "Linkable for key results:")?;
        for candidate in &linkable {
            let level = resolver
                .level_of(candidate)
                .map(|l| l.to_string())
                .unwrap_or_default();
            writeln!(out, "  - {} [{}] ({})", candidate.title, level, candidate.id)?;
        }
        return Ok(out);
    }

    let mode = match args.mode.as_deref() {
        Some(mode) => mode.parse()?,
        None => config.view.mode,
    };

    if args.json {
        let rows: Vec<_> = resolver
            .hierarchy()
            .into_iter()
            .map(|entry| {
                json!({
                    "id": entry.objective.id,
                    "title": entry.objective.title,
                    "depth": entry.depth,
                    "status": entry.objective.status,
                    "progress": entry.objective.progress,
                })
            })
            .collect();
        return Ok(format!("{}\n", serde_json::to_string_pretty(&rows)?));
    }

    render_objectives(&resolver, snapshot, mode, config)
}

/// Render the objective list in one of the three layouts
pub fn render_objectives(
    resolver: &CascadeResolver<'_>,
    snapshot: &Snapshot,
    mode: ViewMode,
    config: &Config,
) -> Result<String> {
    let mut out = String::new();
    let indent = |depth: usize| " ".repeat(depth * config.view.indent_width);

    match mode {
        ViewMode::Hierarchy => {
            for entry in resolver.hierarchy() {
                writeln!(
                    out,
                    "{}{}",
                    indent(entry.depth),
                    objective_line(entry.objective)
                )?;
            }
        }
        ViewMode::Compact => {
            for objective in &snapshot.objectives {
                writeln!(
                    out,
                    "{:<12} {:<10} {:>4}%  {}",
                    objective.id, objective.status, objective.progress, objective.title
                )?;
            }
        }
        ViewMode::Full => {
            for objective in &snapshot.objectives {
                let depth = resolver.cascade_level(objective);
                writeln!(out, "{}{}", indent(depth), objective_line(objective))?;
                let unit = objective.organizational_unit.as_deref().unwrap_or("-");
                let sprint = snapshot
                    .sprint(&objective.sprint)
                    .map_or(objective.sprint.as_str(), |s| s.name.as_str());
                writeln!(
                    out,
                    "{}  owner: {}  unit: {}  sprint: {}",
                    indent(depth),
                    objective.owner.name,
                    unit,
                    sprint
                )?;
                let programs = snapshot.program_names(objective);
                if !programs.is_empty() {
                    writeln!(out, "{}  programs: {}", indent(depth), programs.join(", "))?;
                }
                for kr in &objective.key_results {
                    write!(
                        out,
                        "{}  * {} [{}] {}%",
                        indent(depth),
                        kr.title,
                        kr.status,
                        kr.progress
                    )?;
                    if let Some(linked) = kr
                        .linked_child_objective_id
                        .as_deref()
                        .and_then(|id| resolver.get(id))
                    {
                        write!(out, " -> {}", linked.title)?;
                    }
                    let open = kr.open_tasks().count();
                    if open > 0 {
                        write!(out, " ({open} open tasks)")?;
                    }
                    writeln!(out)?;
                }
            }
        }
    }
    Ok(out)
}

fn objective_line(objective: &Objective) -> String {
    format!(
        "{} [{}] {}%",
        objective.title, objective.status, objective.progress
    )
}

fn progress(args: ProgressArgs, config: &Config, snapshot: &Snapshot) -> Result<String> {
    let objectives: Vec<&Objective> = match args.objective.as_deref() {
        Some(id) => vec![
            snapshot
                .objective(id)
                .with_context(|| format!("Objective not found: {id}"))?,
        ],
        None => snapshot.objectives.iter().collect(),
    };

    if args.json {
        let rows: Vec<_> = objectives
            .iter()
            .flat_map(|o| o.key_results.iter())
            .flat_map(|kr| kr.metrics.iter().map(move |m| (kr, m)))
            .map(|(kr, m)| {
                let pct = compute_progress(m);
                json!({
                    "keyResultId": kr.id,
                    "metricId": m.id,
                    "metric": m.name,
                    "progress": pct,
                    "band": config.progress.classify(pct),
                })
            })
            .collect();
        return Ok(format!("{}\n", serde_json::to_string_pretty(&rows)?));
    }

    let mut out = String::new();
    for objective in objectives {
        writeln!(out, "{}", objective.title)?;
        for kr in &objective.key_results {
            writeln!(out, "  {}", kr.title)?;
            for (metric, pct) in key_result_metric_progress(kr) {
                writeln!(out, "    {}", metric_line(metric, pct, &config.progress))?;
            }
        }
    }
    Ok(out)
}

fn metric_line(metric: &Metric, pct: i64, thresholds: &ProgressThresholds) -> String {
    format!(
        "{}: {} -> {} -> {} {} = {}% ({})",
        metric.name,
        metric.baseline,
        metric.current_value,
        metric.target,
        metric.unit,
        pct,
        thresholds.classify(pct).label()
    )
}

/// Build criteria from command-line flags
pub fn criteria_from_args(args: &FilterArgs) -> Result<FilterCriteria> {
    let levels = args
        .levels
        .iter()
        .map(|l| l.parse::<OrganizationalLevel>())
        .collect::<Result<Vec<_>, _>>()?;
    let statuses = args
        .statuses
        .iter()
        .map(|s| s.parse::<ObjectiveStatus>())
        .collect::<Result<Vec<_>, _>>()?;

    Ok(FilterCriteria {
        owner: args.owner.clone(),
        organizational_unit_id: one_or_many(args.units.clone()),
        organizational_level: one_or_many(levels),
        program_id: one_or_many(args.programs.clone()),
        status: one_or_many(statuses),
        sprint: args.sprint.clone(),
    })
}

fn one_or_many<T>(mut values: Vec<T>) -> Option<OneOrMany<T>> {
    match values.len() {
        0 => None,
        1 => values.pop().map(OneOrMany::One),
        _ => Some(OneOrMany::Many(values)),
    }
}

fn filter(args: FilterArgs, snapshot: &Snapshot) -> Result<String> {
    let saved = SavedFilterSet::new(snapshot.saved_filters.clone());
    let mut out = String::new();

    if args.list {
        let line = |f: &SavedFilter| {
            let shared = if f.is_shared { " (shared)" } else { "" };
            let count = count_matches(&f.criteria, &snapshot.objectives);
            format!("  {:<24} {}{shared} - {count} objectives", f.id, f.name)
        };
        writeln!(out, "Presets")?;
        for f in saved.presets() {
            writeln!(out, "{}", line(f))?;
        }
        writeln!(out, "Custom")?;
        for f in saved.custom() {
            writeln!(out, "{}", line(f))?;
        }
        return Ok(out);
    }

    let criteria = match args.saved.as_deref() {
        Some(id) => saved
            .resolve_active(Some(id))
            .with_context(|| format!("Saved filter not found: {id}"))?
            .criteria
            .clone(),
        None => criteria_from_args(&args)?,
    };

    let matching = filter_objectives(&criteria, &snapshot.objectives);
    tracing::debug!(matches = matching.len(), "Filter evaluated");

    if args.count {
        writeln!(out, "{}", matching.len())?;
        return Ok(out);
    }
    if args.json {
        let value = json!({
            "criteria": criteria,
            "count": matching.len(),
            "objectives": matching.iter().map(|o| &o.id).collect::<Vec<_>>(),
        });
        return Ok(format!("{}\n", serde_json::to_string_pretty(&value)?));
    }

    let chips: Vec<String> = criteria.chips().iter().map(chip_label).collect();
    if !chips.is_empty() {
        writeln!(out, "Filters: {}", chips.join("  "))?;
    }
    for objective in &matching {
        writeln!(out, "  {}", objective_line(objective))?;
    }
    let noun = if matching.len() == 1 { "objective" } else { "objectives" };
    writeln!(out, "{} {noun} match", matching.len())?;
    Ok(out)
}

fn chip_label(chip: &CriteriaChip) -> String {
    format!("[{}: {}]", chip.dimension, chip.value)
}

fn tasks(args: TasksArgs, config: &Config, snapshot: &Snapshot) -> Result<String> {
    let user_id = args
        .user
        .or_else(|| snapshot.current_user.as_ref().map(|u| u.id.clone()))
        .or_else(|| config.current_user.clone())
        .context("No user given. Pass --user or set current_user in config")?;

    let mine = my_tasks(&snapshot.objectives, &user_id);

    if args.json {
        let row = |t: &TaskWithContext<'_>| {
            json!({
                "task": t.task,
                "keyResult": t.key_result.title,
                "objective": t.objective.title,
            })
        };
        let value = json!({
            "total": mine.total(),
            "open": mine.open.iter().map(row).collect::<Vec<_>>(),
            "completed": mine.completed.iter().map(row).collect::<Vec<_>>(),
        });
        return Ok(format!("{}\n", serde_json::to_string_pretty(&value)?));
    }

    let mut out = String::new();
    match snapshot.known_users().into_iter().find(|u| u.id == user_id) {
        Some(user) => writeln!(out, "Tasks for {} ({})", user.name, user.initials())?,
        None => writeln!(out, "Tasks for {user_id}")?,
    }
    writeln!(out, "Open ({})", mine.open.len())?;
    for t in &mine.open {
        writeln!(
            out,
            "  [ ] {}  ({} / {})",
            t.task.description, t.objective.title, t.key_result.title
        )?;
    }
    writeln!(out, "Completed ({})", mine.completed.len())?;
    for t in &mine.completed {
        let when = t
            .task
            .completed_at
            .map(|at| at.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        writeln!(out, "  [x] {}  {}", t.task.description, when)?;
    }
    Ok(out)
}

fn programs(args: ProgramsArgs, snapshot: &Snapshot) -> Result<String> {
    if let Some(id) = args.id.as_deref() {
        let program = snapshot
            .program(id)
            .with_context(|| format!("Program not found: {id}"))?;
        return program_detail(program, args.json);
    }

    let query = ProgramQuery {
        search: args.search,
        lead: args.lead,
        entity: args.entity,
    };
    let matching = query.apply(&snapshot.programs);

    if args.json {
        return Ok(format!("{}\n", serde_json::to_string_pretty(&matching)?));
    }

    let mut out = String::new();
    for program in &matching {
        let leads: Vec<&str> = program.leads.iter().map(|l| l.name.as_str()).collect();
        writeln!(
            out,
            "{} {}% - leads: {} - {} objectives",
            program.name,
            program.overall_progress,
            leads.join(", "),
            program.linked_objectives.len()
        )?;
    }
    let leads: Vec<&str> = all_leads(&snapshot.programs)
        .iter()
        .map(|l| l.name.as_str())
        .collect();
    writeln!(out, "Leads: {}", leads.join(", "))?;
    writeln!(out, "Entities: {}", all_entities(&snapshot.programs).join(", "))?;
    Ok(out)
}

fn program_detail(program: &Program, json: bool) -> Result<String> {
    let activity = program.recent_activity();

    if json {
        let value = json!({ "program": program, "recentActivity": activity });
        return Ok(format!("{}\n", serde_json::to_string_pretty(&value)?));
    }

    let mut out = String::new();
    writeln!(out, "{} ({}%)", program.name, program.overall_progress)?;
    if !program.description.is_empty() {
        writeln!(out, "{}", program.description)?;
    }
    let leads: Vec<String> = program
        .leads
        .iter()
        .map(|l| format!("{} ({})", l.name, l.initials))
        .collect();
    writeln!(out, "Leads: {}", leads.join(", "))?;
    writeln!(out, "Entities: {}", program.entities_involved.join(", "))?;
    writeln!(out, "Objectives:")?;
    for objective in &program.linked_objectives {
        writeln!(
            out,
            "  {} {}% ({}, {})",
            objective.title, objective.progress, objective.organizational_unit, objective.owner
        )?;
    }
    writeln!(out, "Activity:")?;
    for update in &activity {
        writeln!(
            out,
            "  {}  {}: {}",
            update.timestamp.format("%Y-%m-%d %H:%M"),
            update.user,
            update.description
        )?;
    }
    Ok(out)
}

fn rituals(args: RitualsArgs, config: &Config, snapshot: &Snapshot) -> Result<String> {
    let scoped = for_sprint(&snapshot.rituals, args.sprint.as_deref());
    let now = chrono::Utc::now();
    let window = chrono::Duration::days(config.rituals.upcoming_window_days);
    let next = upcoming(&scoped, now, window);
    let last = recent(&scoped, config.rituals.recent_limit);

    if args.json {
        let value = json!({ "upcoming": next, "recent": last });
        return Ok(format!("{}\n", serde_json::to_string_pretty(&value)?));
    }

    let mut out = String::new();
    writeln!(out, "Upcoming")?;
    for r in &next {
        writeln!(
            out,
            "  {}  {}  ({}, {} min)",
            r.date_time.format("%Y-%m-%d %H:%M"),
            r.title,
            r.facilitator,
            r.duration
        )?;
    }
    writeln!(out, "Recent")?;
    for r in &last {
        writeln!(out, "  {}  {}", r.date_time.format("%Y-%m-%d"), r.title)?;
    }
    Ok(out)
}

fn stats(args: StatsArgs, snapshot: &Snapshot) -> Result<String> {
    let stats = snapshot.stats();
    let dangling = snapshot.dangling_references();

    if args.json {
        let current = snapshot.current_sprint(chrono::Utc::now().date_naive());
        let value = json!({
            "stats": stats,
            "dangling": dangling,
            "currentSprint": current.map(|s| &s.id),
        });
        return Ok(format!("{}\n", serde_json::to_string_pretty(&value)?));
    }

    let mut out = String::new();
    writeln!(out, "Objectives:    {}", stats.total_objectives)?;
    writeln!(out, "Key results:   {}", stats.total_key_results)?;
    writeln!(out, "Metrics:       {}", stats.total_metrics)?;
    writeln!(out, "Tasks:         {}", stats.total_tasks)?;
    writeln!(out, "Programs:      {}", stats.total_programs)?;
    writeln!(out, "Saved filters: {}", stats.total_saved_filters)?;
    if let Some(sprint) = snapshot.current_sprint(chrono::Utc::now().date_naive()) {
        writeln!(out, "Current sprint: {}", sprint.name)?;
    }
    for status in ObjectiveStatus::ALL {
        if let Some(count) = stats.status_counts.get(&status) {
            writeln!(out, "  {status}: {count}")?;
        }
    }
    writeln!(out, "Dangling references: {}", dangling.len())?;
    Ok(out)
}
