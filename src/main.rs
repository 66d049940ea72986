use clap::Parser;
use strata::analysis::governance;
use strata::cli::{Cli, Command, GlobalArgs};
use strata::config::Config;
use strata::report::{self, table};
use strata::{Engine, Ledger, Result};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "strata=debug" } else { "strata=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_ledger(global: &GlobalArgs, config: &Config) -> Result<Ledger> {
    let mut ledger_config = config.ledger.clone();
    if let Some(path) = &global.ledger {
        ledger_config.path = Some(path.clone());
    }
    Ledger::open(&ledger_config)
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::discover(&cli.global.root, cli.global.config.as_deref())?;
    let engine = Engine::new(&cli.global.root, config);

    match cli.command {
        Command::Scan(args) => {
            let analysis = engine.analyze();
            report::print_scan(&analysis, args.json, cli.global.verbose);
        }
        Command::Errors(args) => {
            let findings = match &args.scope {
                Some(scope) => engine.detect_structural_errors_in(scope),
                None => engine.detect_structural_errors(),
            };
            report::emit(findings.as_slice(), args.json, table::render_findings);
        }
        Command::Snapshot(args) => {
            let ledger = open_ledger(&cli.global, engine.config())?;
            let snapshot = engine.capture_snapshot(&args.id, &args.repo_ref);
            let timestamp = args.timestamp.unwrap_or_else(now);

            ledger.record_snapshot(&snapshot, &timestamp)?;
            println!(
                "recorded snapshot {} at {timestamp}: {} components, {} findings",
                snapshot.snapshot_id, snapshot.metrics.components_total, snapshot.metrics.findings_total
            );
        }
        Command::Snapshots(args) => {
            let ledger = open_ledger(&cli.global, engine.config())?;
            let snapshots = ledger.list_snapshots()?;
            report::emit(snapshots.as_slice(), args.json, table::render_snapshots);
        }
        Command::Diff(args) => {
            let ledger = open_ledger(&cli.global, engine.config())?;
            let diff = ledger.diff_snapshots(&args.old, &args.new)?;
            report::emit(&diff, args.json, table::render_diff);
        }
        Command::Verify(args) => {
            let ledger = open_ledger(&cli.global, engine.config())?;
            let integrity = ledger.verify()?;
            report::emit(&integrity, args.json, table::render_integrity);
        }
        Command::Export(args) => {
            let ledger = open_ledger(&cli.global, engine.config())?;
            let rows = ledger.export_tabular(&args.out)?;
            println!("exported {rows} records to {}", args.out.display());
        }
        Command::Purge => {
            let ledger = open_ledger(&cli.global, engine.config())?;
            ledger.purge()?;
            println!("purged {}", ledger.path().display());
        }
        Command::Issues(args) => {
            let issues = governance::build_issues(&engine.detect_structural_errors());
            report::emit(issues.as_slice(), args.json, table::render_issues);
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
