use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::ConfigArgs;

#[derive(Parser, Debug)]
#[command(
    name = "warden",
    version,
    about = "Warden - a Postgres proxy that holds dangerous statements for approval"
)]
struct Cli {
    /// Log filter (e.g. "info", "warden_proxy=debug"). Overrides RUST_LOG.
    #[arg(long, global = true, env = "WARDEN_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the proxy and the admin API.
    Serve {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Classify a statement the way the proxy would.
    Classify {
        /// SQL text to classify.
        sql: String,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Print the effective configuration as YAML.
    Config {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

fn init_tracing(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    match cli.cmd {
        Command::Serve { config } => commands::serve::run(config.load()?).await?,
        Command::Classify { sql, config } => commands::classify::run(&sql, &config.load()?)?,
        Command::Config { config } => commands::config::run(&config.load()?)?,
    }

    Ok(())
}
