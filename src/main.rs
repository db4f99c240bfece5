use clap::Parser;
use news_curator::{Config, Curator};
use std::path::PathBuf;
use tracing::{error, info, Level};

#[derive(Parser)]
#[command(name = "news-curator", about = "AI-assisted personal news curation pipeline")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, default_value = "config/config.yaml")]
    config: String,

    /// Run the full pipeline without sending notifications
    #[arg(long)]
    dry_run: bool,

    /// Test the scraper against the first configured source and exit
    #[arg(long)]
    test_scraper: bool,

    /// Test chat model connectivity and exit
    #[arg(long)]
    test_model: bool,

    /// Test the Discord webhook and exit
    #[arg(long)]
    test_discord: bool,

    /// Render the dashboard HTML to the given file and exit
    #[arg(long)]
    dashboard: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let config = Config::load(&cli.config)?;
    let curator = match Curator::init(config).await {
        Ok(curator) => curator,
        Err(e) => {
            error!("Fatal error during initialization: {}", e);
            return Err(e.into());
        }
    };

    if cli.test_scraper {
        std::process::exit(i32::from(!curator.test_scraper().await));
    }
    if cli.test_model {
        std::process::exit(i32::from(!curator.test_model().await));
    }
    if cli.test_discord {
        std::process::exit(i32::from(!curator.test_discord().await));
    }

    if let Some(path) = cli.dashboard {
        let html = curator.render_dashboard().await?;
        std::fs::write(&path, html)?;
        info!("Dashboard written to {}", path.display());
        return Ok(());
    }

    curator.run(cli.dry_run).await?;
    Ok(())
}
