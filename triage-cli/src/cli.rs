use clap::{Args, Parser, Subcommand, ValueEnum};
use is_terminal::IsTerminal;
use std::io;
use std::path::PathBuf;

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Optional issue fields that `update --clear` can reset
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum ClearableField {
    Description,
    Assignee,
    Reporter,
    Labels,
    DueDate,
    EstimatedHours,
}

impl ClearableField {
    /// Key of the field in a request body
    pub fn body_key(&self) -> &'static str {
        match self {
            ClearableField::Description => "description",
            ClearableField::Assignee => "assignee",
            ClearableField::Reporter => "reporter",
            ClearableField::Labels => "labels",
            ClearableField::DueDate => "dueDate",
            ClearableField::EstimatedHours => "estimatedHours",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "triage")]
#[command(version)]
#[command(about = "Track issues from the command line")]
#[command(long_about = "
triage keeps a list of issues in a JSON document under a data directory
(.triage by default) and lets you create, inspect, update, delete, search and
page through them.

Example usage:
  triage create \"Login button does nothing\" --priority high
  triage list --status open --sort-by priority --sort-order desc
  triage update iss-1a2b3c4d --status resolved
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Directory holding issues.json (overrides TRIAGE_DATA_DIR and triage.yaml)
    #[arg(long, global = true, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List issues with filtering, sorting and pagination
    #[command(long_about = "
Lists issues one page at a time. Filters of different kinds combine with AND;
repeating a filter flag accepts any of the given values.

Sort fields: id, title, status, priority, assignee, reporter, due_date,
estimated_hours, created_at, updated_at (default). Unknown fields fall back
to updated_at.

Examples:
  triage list
  triage list --search crash --status open --status in-progress
  triage list --assignee dev@example.com --sort-by due_date --sort-order asc
  triage list --page 2 --page-size 50 --format json
")]
    List(ListArgs),
    /// Show a single issue
    Show {
        /// Issue id, e.g. iss-1a2b3c4d
        id: String,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Create an issue
    Create(CreateArgs),
    /// Change fields of an issue; omitted fields are left alone
    #[command(long_about = "
Updates only the fields given on the command line. Use --clear to reset an
optional field (description, assignee, reporter, labels, due-date,
estimated-hours).

Examples:
  triage update iss-1a2b3c4d --status in-progress
  triage update iss-1a2b3c4d --assignee dev@example.com --label ui --label bug
  triage update iss-1a2b3c4d --clear assignee --clear due-date
")]
    Update(UpdateArgs),
    /// Delete an issue
    Delete {
        /// Issue id
        id: String,
    },
    /// Create every issue in a JSON array file, or none of them
    #[command(long_about = "
Reads a JSON array of issue bodies and creates them in one step. Keys use the
same camelCase names as `show --format json` (title, description, status,
priority, assignee, reporter, labels, dueDate, estimatedHours). If any entry
is invalid nothing is created and the offending entry is named.

Example:
  triage import backlog.json
")]
    Import {
        /// Path to the JSON file; use - for stdin
        file: PathBuf,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Case-insensitive text to find in title or description
    #[arg(long)]
    pub search: Option<String>,
    /// Only these statuses (repeatable)
    #[arg(long)]
    pub status: Vec<String>,
    /// Only these priorities (repeatable)
    #[arg(long)]
    pub priority: Vec<String>,
    /// Only these assignees (repeatable)
    #[arg(long)]
    pub assignee: Vec<String>,
    /// Field to sort by; unknown fields sort by last update
    #[arg(long)]
    pub sort_by: Option<String>,
    /// Sort direction, asc or desc; anything else sorts descending
    #[arg(long)]
    pub sort_order: Option<String>,
    /// Page number, starting at 1
    #[arg(long)]
    pub page: Option<usize>,
    /// Issues per page
    #[arg(long)]
    pub page_size: Option<usize>,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

/// Field values shared by `create` and `update`
#[derive(Args, Debug, Default)]
pub struct IssueFieldArgs {
    /// Longer description
    #[arg(long)]
    pub description: Option<String>,
    /// open, in-progress, resolved or closed
    #[arg(long)]
    pub status: Option<String>,
    /// low, medium, high or critical
    #[arg(long)]
    pub priority: Option<String>,
    /// Email of the person working on it
    #[arg(long)]
    pub assignee: Option<String>,
    /// Email of the person who reported it
    #[arg(long)]
    pub reporter: Option<String>,
    /// Label (repeatable)
    #[arg(long = "label")]
    pub labels: Vec<String>,
    /// Due date, YYYY-MM-DD or RFC 3339
    #[arg(long)]
    pub due_date: Option<String>,
    /// Expected effort in hours
    #[arg(long)]
    pub estimated_hours: Option<f64>,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Short summary
    pub title: String,
    #[command(flatten)]
    pub fields: IssueFieldArgs,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Issue id
    pub id: String,
    /// New title
    #[arg(long)]
    pub title: Option<String>,
    #[command(flatten)]
    pub fields: IssueFieldArgs,
    /// Reset an optional field (repeatable)
    #[arg(long, value_enum)]
    pub clear: Vec<ClearableField>,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    #[allow(dead_code)]
    pub fn try_parse_from_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(args)
    }

    pub fn should_use_color() -> bool {
        io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_help_works() {
        let error = Cli::try_parse_from_args(["triage", "--help"]).unwrap_err();
        assert_eq!(error.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_version_works() {
        let error = Cli::try_parse_from_args(["triage", "--version"]).unwrap_err();
        assert_eq!(error.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_cli_no_subcommand() {
        let cli = Cli::try_parse_from_args(["triage"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
        assert!(!cli.quiet);
        assert!(cli.data_dir.is_none());
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from_args([
            "triage",
            "list",
            "--quiet",
            "--data-dir",
            "/tmp/issues",
        ])
        .unwrap();
        assert!(cli.quiet);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/issues")));
    }

    #[test]
    fn test_cli_list_repeated_filters() {
        let cli = Cli::try_parse_from_args([
            "triage",
            "list",
            "--status",
            "open",
            "--status",
            "in-progress",
            "--priority",
            "high",
            "--sort-by",
            "due_date",
            "--sort-order",
            "asc",
            "--page-size",
            "50",
            "--format",
            "json",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::List(args)) => {
                assert_eq!(args.status, vec!["open", "in-progress"]);
                assert_eq!(args.priority, vec!["high"]);
                assert_eq!(args.sort_by.as_deref(), Some("due_date"));
                assert_eq!(args.sort_order.as_deref(), Some("asc"));
                assert_eq!(args.page_size, Some(50));
                assert_eq!(args.format, OutputFormat::Json);
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_create_with_fields() {
        let cli = Cli::try_parse_from_args([
            "triage",
            "create",
            "Crash on save",
            "--priority",
            "critical",
            "--label",
            "bug",
            "--label",
            "editor",
            "--estimated-hours",
            "2.5",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Create(args)) => {
                assert_eq!(args.title, "Crash on save");
                assert_eq!(args.fields.priority.as_deref(), Some("critical"));
                assert_eq!(args.fields.labels, vec!["bug", "editor"]);
                assert_eq!(args.fields.estimated_hours, Some(2.5));
            }
            other => panic!("expected create, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_update_clear_fields() {
        let cli = Cli::try_parse_from_args([
            "triage",
            "update",
            "iss-0000abcd",
            "--clear",
            "assignee",
            "--clear",
            "due-date",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Update(args)) => {
                assert_eq!(args.id, "iss-0000abcd");
                assert_eq!(
                    args.clear,
                    vec![ClearableField::Assignee, ClearableField::DueDate]
                );
            }
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_sort_order() {
        let result = Cli::try_parse_from_args(["triage", "list", "--sort-order", "up"]);
        assert!(result.is_err());
    }
}
