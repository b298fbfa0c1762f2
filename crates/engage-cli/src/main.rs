use clap::{Parser, Subcommand};
use engage_core::AppConfig;
use engage_instagram::InstagramSource;
use engage_metrics::{calculate, DEFAULT_SAMPLE_SIZE};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "engage-cli")]
#[command(about = "Instagram engagement statistics from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Sample a profile's recent posts and print its engagement figures
    Calculate {
        /// Profile handle, with or without a leading `@`
        handle: String,

        /// Maximum number of recent posts to sample
        #[arg(long, default_value_t = DEFAULT_SAMPLE_SIZE)]
        post_limit: usize,

        /// Print raw totals and unformatted figures instead of display strings
        #[arg(long)]
        raw: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = engage_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Calculate {
            handle,
            post_limit,
            raw,
        } => run_calculate(&config, &handle, post_limit, raw).await,
    }
}

async fn run_calculate(
    config: &AppConfig,
    handle: &str,
    post_limit: usize,
    raw: bool,
) -> anyhow::Result<()> {
    if config.require_login && config.credentials().is_none() {
        anyhow::bail!("Instagram credentials not set");
    }

    let source = InstagramSource::from_config(config)?;
    let stats = calculate(&source, handle, post_limit).await?;

    let rendered = if raw {
        serde_json::to_string_pretty(&stats)?
    } else {
        serde_json::to_string_pretty(&stats.to_result())?
    };
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests;
