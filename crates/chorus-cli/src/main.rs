#![forbid(unsafe_code)]

mod cmd;
mod output;
mod validate;

use clap::{Parser, Subcommand};
use output::OutputMode;
use std::env;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "chorus: activity feeds and annotations for data workspaces",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Acting/viewing username (falls back to CHORUS_USER).
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Derive the output mode from flags and the user config.
    fn output_mode(&self) -> OutputMode {
        output::resolve_output_mode(self.json)
    }

    /// Get the identity flag as an `Option<&str>` for resolution.
    fn user_flag(&self) -> Option<&str> {
        self.user.as_deref()
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Lifecycle",
        about = "Initialize a chorus store",
        after_help = "EXAMPLES:\n    # Initialize a store in the current directory\n    chorus init\n\n    # Emit machine-readable output\n    chorus init --json"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Entities",
        about = "Manage user accounts",
        after_help = "EXAMPLES:\n    # Create the first (admin) account\n    chorus user add edcadmin --admin\n\n    # List accounts\n    chorus user list"
    )]
    User(cmd::user::UserArgs),

    #[command(
        next_help_heading = "Entities",
        about = "Register data instances",
        after_help = "EXAMPLES:\n    # Register a Greenplum instance\n    chorus --user edcadmin instance add prod-gp --flavor greenplum"
    )]
    Instance(cmd::instance::InstanceArgs),

    #[command(
        next_help_heading = "Entities",
        about = "Manage workspaces, membership, and archival",
        after_help = "EXAMPLES:\n    # Create a private workspace\n    chorus --user alice workspace create research\n\n    # Grant membership\n    chorus --user alice workspace member add 1 bob\n\n    # Archive\n    chorus --user alice workspace archive 1"
    )]
    Workspace(cmd::workspace::WorkspaceArgs),

    #[command(
        next_help_heading = "Entities",
        about = "Manage workspace datasets",
        after_help = "EXAMPLES:\n    # Register a source table\n    chorus --user alice dataset add 1 orders\n\n    # Remove (feeds tombstone old references)\n    chorus --user alice dataset rm 3"
    )]
    Dataset(cmd::dataset::DatasetArgs),

    #[command(
        next_help_heading = "Entities",
        about = "Manage workspace workfiles",
        after_help = "EXAMPLES:\n    # Add a workfile\n    chorus --user alice workfile add 1 report.sql"
    )]
    Workfile(cmd::workfile::WorkfileArgs),

    #[command(
        next_help_heading = "Activity",
        about = "Post a note on an entity",
        after_help = "EXAMPLES:\n    # Note on a workspace\n    chorus --user alice note workspace 1 \"baseline numbers are in\"\n\n    # Note on an instance\n    chorus --user dba note instance 2 \"maintenance window friday\""
    )]
    Note(cmd::note::NoteArgs),

    #[command(
        next_help_heading = "Activity",
        about = "Show an activity feed",
        after_help = "EXAMPLES:\n    # A workspace feed\n    chorus --user bob feed workspace:1\n\n    # The global feed, page 2\n    chorus --user bob feed global --offset 20 --limit 20\n\n    # Search within a feed\n    chorus --user bob feed workspace:1 --search vacuum"
    )]
    Feed(cmd::feed::FeedArgs),

    #[command(
        next_help_heading = "Activity",
        about = "Comment on feed events",
        after_help = "EXAMPLES:\n    # Comment on event 14\n    chorus --user bob comment add 14 \"on it\"\n\n    # Remove your comment\n    chorus --user bob comment delete 3"
    )]
    Comment(cmd::comment::CommentArgs),

    #[command(
        next_help_heading = "Search",
        about = "Tag entities and search tags",
        after_help = "EXAMPLES:\n    # Replace a workfile's tags\n    chorus tag set workfile 2 alpha omega\n\n    # Search tags by prefix\n    chorus tag search alp"
    )]
    Tag(cmd::tag::TagArgs),

    #[command(
        next_help_heading = "Search",
        about = "Full-text search over note bodies",
        after_help = "EXAMPLES:\n    # Find notes mentioning vacuum\n    chorus --user bob search vacuum"
    )]
    Search(cmd::search::SearchArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("CHORUS_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "chorus=debug,info"
        } else {
            "chorus=info,warn"
        })
    });

    let format = env::var("CHORUS_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry.with(fmt::layer().json().with_ansi(false)).init();
        }
        _ => {
            registry.with(fmt::layer().compact()).init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let project_root = std::env::current_dir()?;
    let output = cli.output_mode();

    match cli.command {
        Commands::Init(ref args) => cmd::init::run_init(args, output, &project_root),
        Commands::User(ref args) => {
            cmd::user::run_user(args, cli.user_flag(), output, &project_root)
        }
        Commands::Instance(ref args) => {
            cmd::instance::run_instance(args, cli.user_flag(), output, &project_root)
        }
        Commands::Workspace(ref args) => {
            cmd::workspace::run_workspace(args, cli.user_flag(), output, &project_root)
        }
        Commands::Dataset(ref args) => {
            cmd::dataset::run_dataset(args, cli.user_flag(), output, &project_root)
        }
        Commands::Workfile(ref args) => {
            cmd::workfile::run_workfile(args, cli.user_flag(), output, &project_root)
        }
        Commands::Note(ref args) => {
            cmd::note::run_note(args, cli.user_flag(), output, &project_root)
        }
        Commands::Feed(ref args) => {
            cmd::feed::run_feed(args, cli.user_flag(), output, &project_root)
        }
        Commands::Comment(ref args) => {
            cmd::comment::run_comment(args, cli.user_flag(), output, &project_root)
        }
        Commands::Tag(ref args) => cmd::tag::run_tag(args, output, &project_root),
        Commands::Search(ref args) => cmd::search::run_search(args, output, &project_root),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_sets_output_mode() {
        let cli = Cli::parse_from(["chorus", "--json", "user", "list"]);
        assert!(cli.json);
        assert!(cli.output_mode().is_json());
    }

    #[test]
    fn user_flag_parses_before_subcommand() {
        let cli = Cli::parse_from(["chorus", "--user", "alice", "feed", "global"]);
        assert_eq!(cli.user_flag(), Some("alice"));
    }

    #[test]
    fn user_flag_parses_after_subcommand() {
        let cli = Cli::parse_from(["chorus", "feed", "global", "--user", "alice"]);
        assert_eq!(cli.user_flag(), Some("alice"));
    }
}
