use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use depkeeper::config::{FETCH_TIMEOUT_MS, LOG_ENV_VAR};
use depkeeper::{Depkeeper, DepkeeperOptions, Policy, Strategy, Thresholds};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "depkeeper")]
#[command(version, about = "Report npm dependencies that drift past a version threshold")]
struct Cli {
    /// Project root holding package.json and node_modules
    #[arg(long, default_value = ".")]
    cwd: PathBuf,

    /// Registry used for every package instead of npmrc discovery
    #[arg(long)]
    registry: Option<String>,

    /// Include pattern; repeat for several. Defaults to every dependency
    #[arg(short, long = "pattern")]
    patterns: Vec<String>,

    /// Allowed major versions behind
    #[arg(long)]
    major: Option<u64>,

    /// Allowed minor versions behind
    #[arg(long)]
    minor: Option<u64>,

    /// Allowed patch versions behind
    #[arg(long)]
    patch: Option<u64>,

    /// Threshold strategy: separate or numeral
    #[arg(long, default_value = "separate")]
    strategy: Strategy,

    /// Registry fetch timeout in milliseconds
    #[arg(long, default_value_t = FETCH_TIMEOUT_MS)]
    timeout: u64,

    /// List every matching dependency instead of only outdated ones
    #[arg(long)]
    all: bool,
}

impl Cli {
    fn policy(&self) -> Policy {
        let thresholds = Thresholds {
            major: self.major,
            minor: self.minor,
            patch: self.patch,
        };
        Policy::new(thresholds, self.strategy)
    }

    fn options(&self) -> DepkeeperOptions {
        let options =
            DepkeeperOptions::new(&self.cwd).with_timeout(Duration::from_millis(self.timeout));
        match &self.registry {
            Some(url) => options.with_registry_url(url),
            None => options,
        }
    }
}

fn init_logging() -> WorkerGuard {
    let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(false)
        .init();

    guard
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let depkeeper = Depkeeper::new(cli.options());

    let output = if cli.all {
        let dependencies = depkeeper.dependencies(cli.patterns.clone()).await?;
        serde_json::to_string_pretty(&dependencies)?
    } else {
        let outdated = depkeeper.check(cli.patterns.clone(), cli.policy()).await?;
        serde_json::to_string_pretty(&outdated)?
    };

    println!("{}", output);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli))
}
