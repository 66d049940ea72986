use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "strata")]
#[command(about = "Structural analysis for Python repositories with a tamper-evident history")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args)]
pub struct GlobalArgs {
    /// Repository to analyze
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Config file (defaults to <root>/strata.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Ledger file, overriding [ledger] path
    #[arg(long, global = true)]
    pub ledger: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(long, short = 'v', global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Extract components and score complexity
    Scan(OutputArgs),

    /// List structural errors: parse failures, dead branches, cycles, layer violations
    Errors(ErrorsArgs),

    /// Analyze the repository and record the result in the ledger
    Snapshot(SnapshotArgs),

    /// List recorded snapshots
    Snapshots(OutputArgs),

    /// Compare two recorded snapshots
    Diff(DiffArgs),

    /// Check every ledger record's authentication tag
    Verify(OutputArgs),

    /// Export valid ledger records as CSV
    Export(ExportArgs),

    /// Delete the ledger
    Purge,

    /// Group structural errors into a prioritized backlog
    Issues(OutputArgs),
}

#[derive(Args)]
pub struct OutputArgs {
    /// Output as JSON instead of table
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct ErrorsArgs {
    /// Only report files under this relative path
    #[arg(long)]
    pub scope: Option<String>,

    /// Output as JSON instead of table
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct SnapshotArgs {
    /// Unique snapshot id
    #[arg(long)]
    pub id: String,

    /// Free-form revision label, e.g. a branch or commit
    #[arg(long, default_value = "")]
    pub repo_ref: String,

    /// Logical timestamp (defaults to the current UTC time, RFC 3339)
    #[arg(long)]
    pub timestamp: Option<String>,
}

#[derive(Args)]
pub struct DiffArgs {
    /// Older snapshot id
    #[arg(long)]
    pub old: String,

    /// Newer snapshot id
    #[arg(long)]
    pub new: String,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct ExportArgs {
    /// Destination CSV file
    #[arg(long)]
    pub out: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = Cli::parse_from(["strata", "errors", "--scope", "pkg", "--root", "/repo", "-v"]);
        assert_eq!(cli.global.root, PathBuf::from("/repo"));
        assert!(cli.global.verbose);
        match cli.command {
            Command::Errors(args) => assert_eq!(args.scope.as_deref(), Some("pkg")),
            _ => panic!("expected errors command"),
        }
    }

    #[test]
    fn diff_requires_both_ids() {
        assert!(Cli::try_parse_from(["strata", "diff", "--old", "a"]).is_err());
        assert!(Cli::try_parse_from(["strata", "diff", "--old", "a", "--new", "b"]).is_ok());
    }
}
