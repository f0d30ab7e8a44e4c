//! lockwait - find deadlocks in the current lock table
//!
//! Usage:
//!   lockwait -c postgres://gpadmin@mdw:5432/postgres
//!   lockwait -c postgres://localhost/app --flavor postgres -d waits.dot
//!   lockwait --snapshot pg_locks.json --format json
//!
//! Exits 0 when there is no deadlock. Otherwise prints the report to stderr,
//! the statement that breaks the deadlock to stdout, and exits 1.

use anyhow::Context;
use clap::Parser;
use lockwait::config::{ConfigBuilder, DetectorConfig, Flavor, LoggingConfig, ReportFormat};
use lockwait::report::{self, JsonReport};
use lockwait::snapshot::source_from_config;
use lockwait::{Analysis, DeadlockDetector};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "lockwait")]
#[command(about = "Detect deadlocks among PostgreSQL / Greenplum sessions", long_about = None)]
#[command(version)]
struct Cli {
    /// Connection string (postgres://user@host:port/db); PG* variables are used when absent
    #[arg(short = 'c', long = "conn")]
    conn: Option<String>,

    /// If set, write the lock wait-for graph to this file in Graphviz format
    #[arg(short = 'd', long = "dot")]
    dot: Option<PathBuf>,

    /// Analyze a saved pg_locks snapshot (JSON array of rows) instead of a live server
    #[arg(short = 's', long)]
    snapshot: Option<PathBuf>,

    /// Server flavor: greenplum, postgres
    #[arg(long)]
    flavor: Option<Flavor>,

    /// Output format: text, json
    #[arg(long)]
    format: Option<ReportFormat>,

    /// Connect timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Log level: trace, debug, info, warn, error
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn into_config(self, base: DetectorConfig) -> lockwait::Result<DetectorConfig> {
        let mut builder = ConfigBuilder::from_config(base);
        if let Some(conn) = self.conn {
            builder = builder.with_database_url(conn);
        }
        if let Some(dot) = self.dot {
            builder = builder.with_dot_file(dot);
        }
        if let Some(snapshot) = self.snapshot {
            builder = builder.with_snapshot_file(snapshot);
        }
        if let Some(flavor) = self.flavor {
            builder = builder.with_flavor(flavor);
        }
        if let Some(format) = self.format {
            builder = builder.with_format(format);
        }
        if let Some(timeout) = self.timeout {
            builder = builder.with_connect_timeout(timeout);
        }
        if let Some(level) = self.log_level {
            builder = builder.with_log_level(level);
        }
        builder.build()
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("lockwait={}", logging.level)));
    let registry = tracing_subscriber::registry().with(filter);

    if logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init();
    }
}

/// Returns whether a deadlock was found.
async fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = cli
        .into_config(DetectorConfig::from_env()?)
        .context("Invalid configuration")?;
    init_tracing(&config.logging);

    let source = source_from_config(&config.source)?;
    let analysis = DeadlockDetector::run(source.as_ref()).await?;

    let mut stderr = io::stderr().lock();
    report::write_human(&mut stderr, &analysis)?;

    if let (Analysis::Deadlock(found), Some(path)) = (&analysis, &config.output.dot_file) {
        std::fs::write(path, &found.dot)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        writeln!(stderr, "The lock waits-for graph has been write to '{}'", path.display())?;
    }

    let mut stdout = io::stdout().lock();
    match config.output.format {
        ReportFormat::Json => {
            serde_json::to_writer_pretty(&mut stdout, &JsonReport::new(&analysis, config.source.flavor))?;
            writeln!(stdout)?;
        }
        ReportFormat::Text => {
            if let Some(found) = analysis.report() {
                writeln!(stdout, "{}", found.cancel_statement(config.source.flavor))?;
            }
        }
    }

    Ok(analysis.is_deadlock())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(false) => ExitCode::SUCCESS,
        Ok(true) => ExitCode::from(1),
        Err(err) => {
            tracing::error!("{:#}", err);
            eprintln!("lockwait: {:#}", err);
            ExitCode::from(2)
        }
    }
}
