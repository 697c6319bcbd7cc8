//! ClinAudit CLI Module
//! Command-line interface for the audit register

pub mod formatter;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "clinaudit")]
#[command(author = "ClinAudit Team")]
#[command(version)]
#[command(about = "Clinical audit register with shared or local storage", long_about = None)]
pub struct Cli {
    /// Project directory (defaults to current directory)
    #[arg(short, long, global = true)]
    pub project: Option<PathBuf>,

    /// Output format (json for scripting)
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new audit register project
    Init {
        /// Project name
        #[arg(short, long)]
        name: String,

        /// Shared endpoint URL (omit to keep data in the local database)
        #[arg(long)]
        endpoint: Option<String>,

        /// Open the register read-only
        #[arg(long)]
        view_only: bool,
    },

    /// Run the shared endpoint server
    Serve {
        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
    },

    #[command(flatten)]
    Register(RegisterCommand),
}

/// Commands that open the project's register.
#[derive(Subcommand, Debug)]
pub enum RegisterCommand {
    /// List audits
    List {
        /// Only show audits for this year
        #[arg(short, long)]
        year: Option<String>,
    },

    /// Record a new audit
    Add {
        /// Clinical audit name
        #[arg(short, long)]
        name: String,

        /// Audit year (YYYY)
        #[arg(short, long)]
        year: String,

        /// Start month (YYYY-MM)
        #[arg(long)]
        start: Option<String>,

        /// First re-audit month (YYYY-MM)
        #[arg(long)]
        reaudit: Option<String>,
    },

    /// Append a re-audit date to an audit
    Reaudit {
        /// Audit id
        id: String,

        /// Re-audit month (YYYY-MM)
        period: String,
    },

    /// Note management
    Note {
        #[command(subcommand)]
        action: NoteAction,
    },

    /// Edit an audit's year, name or start month
    Edit {
        /// Audit id
        id: String,

        #[arg(long)]
        year: Option<String>,

        #[arg(long)]
        name: Option<String>,

        /// Start month (YYYY-MM); pass "" to clear
        #[arg(long)]
        start: Option<String>,
    },

    /// Delete an audit
    Delete {
        /// Audit id
        id: String,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Show totals and per-year counts
    Stats {
        #[arg(short, long)]
        year: Option<String>,
    },

    /// List selectable years
    Years,

    /// Export audits as JSON or CSV
    Export {
        #[arg(short, long)]
        year: Option<String>,

        /// Write CSV instead of JSON
        #[arg(long)]
        csv: bool,

        /// Output file (defaults to clinical-audits-<year|all>.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show project status
    Status,
}

#[derive(Subcommand, Debug)]
pub enum NoteAction {
    /// Add a note to an audit
    Add {
        /// Audit id
        id: String,

        /// Your name
        #[arg(short, long)]
        author: String,

        #[arg(short, long)]
        text: String,

        /// Month the note refers to (YYYY-MM, defaults to this month)
        #[arg(long)]
        period: Option<String>,
    },

    /// Replace a note's text
    Edit {
        /// Audit id
        id: String,

        /// Note number as shown by `list`
        number: usize,

        #[arg(short, long)]
        text: String,
    },

    /// Delete a note
    Delete {
        /// Audit id
        id: String,

        /// Note number as shown by `list`
        number: usize,
    },
}

impl Cli {
    pub fn get_project_dir(&self) -> PathBuf {
        self.project
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }
}
