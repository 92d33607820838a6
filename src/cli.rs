// src/cli.rs
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser, Debug)]
#[command(author, version, about = "Navigation and deep-link tooling for the KW8 site", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show which page (or modal) a URL maps to
    Parse {
        /// Path with optional query, e.g. "/workout-detail?id=abc"
        url: String,
    },
    /// Boot at a URL, navigate once and show the resulting state
    Navigate {
        /// Page, alias or modal name (e.g. "workout-detail", "coach-home", "terms")
        target: String,
        /// Workout plan id (workout-detail)
        plan_id: Option<String>,
        /// Link token (workout-card) or explicit variant (workout-detail)
        link_or_variant: Option<String>,
        /// URL the session starts at
        #[arg(long, default_value = "/")]
        from: String,
        /// Keep the current workouts tab instead of resetting it
        #[arg(long)]
        keep_tab: bool,
        /// Athlete whose assignments feed variant resolution
        #[arg(short, long)]
        user: Option<String>,
    },
    /// Run a sequence of steps: back, forward, logout, close:<modal>,
    /// tab:<name> or <target>[,<plan>[,<link-or-variant>]]
    Replay {
        #[arg(long, default_value = "/")]
        from: String,
        #[arg(short, long)]
        user: Option<String>,
        #[arg(required = true)]
        steps: Vec<String>,
    },
    /// List the route table
    Routes,
    /// Manage workout plans
    Plan {
        #[command(subcommand)]
        action: PlanCommands,
    },
    /// Assign a plan (optionally pinned to a variant) to an athlete
    Assign {
        #[arg(short, long)]
        user: String,
        /// Plan id, or a "<plan>|variant:<id>" token
        plan: String,
        #[arg(short, long)]
        variant: Option<String>,
    },
    /// Remove a plan assignment
    Unassign {
        #[arg(short, long)]
        user: String,
        plan: String,
    },
    /// List an athlete's plan assignments
    Assignments {
        #[arg(short, long)]
        user: String,
    },
    /// Show the configuration file path and values
    Config,
    /// Set the tab the workouts page opens on
    SetDefaultTab { tab: String },
    /// Set the log filter used when RUST_LOG is unset (e.g. "info", "kw8_nav=debug")
    SetLogLevel { level: String },
    /// Set the athlete used when --user is omitted
    SetDefaultUser {
        /// Leave empty to clear
        user: Option<String>,
    },
    /// Show the path to the database file
    DbPath,
    /// Generate shell completion script
    GenerateCompletion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum PlanCommands {
    /// Add or update a plan
    Add {
        #[arg(short, long)]
        id: String,
        #[arg(short, long)]
        name: String,
        /// Variant shown when neither URL nor assignment picks one
        #[arg(short, long)]
        active_variant: Option<String>,
    },
    List,
    Delete { id: String },
}

// Function to parse CLI arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}
