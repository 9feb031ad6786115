//! CLI command definitions and handlers

pub mod config;
pub mod okr;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// OKR cascade preview - renders objectives, key results and filters from a snapshot
#[derive(Parser, Debug)]
#[command(name = "okr-cascade")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Snapshot file (overrides config and OKR_CASCADE_SNAPSHOT)
    #[arg(short, long, global = true)]
    pub snapshot: Option<PathBuf>,

    /// Log level
    #[arg(long, global = true, value_parser = ["DEBUG", "INFO", "WARN", "ERROR"])]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the objective cascade, or one objective's ancestor chain
    Cascade(CascadeArgs),

    /// Show metric progress per key result
    Progress(ProgressArgs),

    /// Evaluate filter criteria or a saved filter against the objectives
    Filter(FilterArgs),

    /// List tasks owned by a user
    Tasks(TasksArgs),

    /// Search and filter programs
    Programs(ProgramsArgs),

    /// Upcoming and recent rituals
    Rituals(RitualsArgs),

    /// Snapshot statistics and dangling references
    Stats(StatsArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

#[derive(Parser, Debug)]
pub struct CascadeArgs {
    /// Objective id to show the breadcrumb and linkable objectives for
    #[arg(short, long)]
    pub objective: Option<String>,

    /// Layout: full, compact, hierarchy (defaults to config view.mode)
    #[arg(long)]
    pub mode: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct ProgressArgs {
    /// Limit to one objective
    #[arg(short, long)]
    pub objective: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct FilterArgs {
    /// Apply a saved filter by id (criteria flags are ignored)
    #[arg(long)]
    pub saved: Option<String>,

    /// Owner user id
    #[arg(long)]
    pub owner: Option<String>,

    /// Organizational unit id (repeatable)
    #[arg(long = "unit")]
    pub units: Vec<String>,

    /// Organizational level: Group, Entity, Domain, Department, Team (repeatable)
    #[arg(long = "level")]
    pub levels: Vec<String>,

    /// Program id (repeatable)
    #[arg(long = "program")]
    pub programs: Vec<String>,

    /// Status: Draft, Accepted, Active, Done, Archived, Cancelled (repeatable)
    #[arg(long = "status")]
    pub statuses: Vec<String>,

    /// Sprint id
    #[arg(long)]
    pub sprint: Option<String>,

    /// Only print the number of matching objectives
    #[arg(long)]
    pub count: bool,

    /// List saved filters instead of evaluating
    #[arg(long)]
    pub list: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct TasksArgs {
    /// User id (defaults to the snapshot's current user, then config current_user)
    #[arg(short, long)]
    pub user: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct ProgramsArgs {
    /// Show one program with its linked objectives and activity feed
    #[arg(long)]
    pub id: Option<String>,

    /// Case-insensitive search over name and description
    #[arg(long)]
    pub search: Option<String>,

    /// Lead user id
    #[arg(long)]
    pub lead: Option<String>,

    /// Entity name
    #[arg(long)]
    pub entity: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct RitualsArgs {
    /// Sprint id
    #[arg(long)]
    pub sprint: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct StatsArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Show current configuration
    #[arg(long)]
    pub show: bool,

    /// Initialize default configuration
    #[arg(long)]
    pub init: bool,

    /// Set a configuration value
    #[arg(long)]
    pub set: Option<String>,
}
