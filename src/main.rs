use std::path::PathBuf;

use clap::{Parser, Subcommand};
use docs_crawler::Result;
use docs_crawler::commands::{CrawlOptions, crawl_site, init_config, show_config};
use docs_crawler::config::{Config, get_config_dir};

#[derive(Parser)]
#[command(name = "docs-crawler")]
#[command(about = "Concurrent documentation site crawler that collects page text for indexing")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml (defaults to ~/.docs-crawler)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl a documentation site and collect its text
    Crawl {
        /// Seed URL; falls back to `site.seed_url` from the config file
        url: Option<String>,
        /// Only URLs starting with this prefix are fetched (defaults to the seed)
        #[arg(long)]
        base_url: Option<String>,
        /// Only links containing this string are followed (defaults to the base URL host)
        #[arg(long)]
        domain: Option<String>,
        /// Number of parallel workers
        #[arg(long, short = 'w')]
        workers: Option<usize>,
        /// Print collected documents as JSON
        #[arg(long)]
        json: bool,
        /// Write collected documents as JSON to a file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
    /// Show or initialize the configuration file
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
        /// Write a default configuration file
        #[arg(long, conflicts_with = "show")]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => get_config_dir().map_err(anyhow::Error::from)?,
    };

    match cli.command {
        Commands::Crawl {
            url,
            base_url,
            domain,
            workers,
            json,
            output,
        } => {
            let config = Config::load(&config_dir)?;
            let options = CrawlOptions {
                url,
                base_url,
                domain,
                workers,
                json,
                output,
            };
            crawl_site(&config, options).await?;
        }
        Commands::Config { show: _, init: true } => {
            init_config(&config_dir)?;
        }
        Commands::Config { .. } => {
            show_config(&config_dir)?;
        }
    }

    Ok(())
}
