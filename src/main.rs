use clap::{Parser, Subcommand};
use so_harness::config::HarnessConfig;
use so_harness::runner;

#[derive(Parser)]
#[command(name = "so-harness")]
#[command(about = "CI harness for object-storage round-trip tests", long_about = None)]
struct Cli {
    /// Treat secret credentials as available regardless of the environment
    #[arg(long)]
    secure_vars: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run the remote scenario suite and upload the timing report")]
    Benchmark,
    #[command(about = "Run the local test suite, then the remote suite when credentials allow")]
    Integration,
    #[command(about = "Delete everything under the configured key namespace")]
    Clear,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let mut config = HarnessConfig::from_env()?;
    if cli.secure_vars {
        config.secure_vars = true;
    }

    match cli.command {
        Commands::Benchmark => runner::benchmark(&config).await,
        Commands::Integration => runner::integration(&config).await,
        Commands::Clear => runner::clear(&config).await,
    }
}
