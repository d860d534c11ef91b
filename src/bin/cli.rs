//! Rando Romandie CLI
//!
//! Local entry point for scraping, filtering and inspecting stored hikes.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use rando::{
    error::{AppError, Result},
    models::{Config, HikeRecord},
    pipeline,
    services::{Dimension, Selections, filter_options, filter_with_report},
    storage::{HikeStore, open_store},
    utils::http::HttpFetcher,
};

/// Rando - hike browser for randoromandie.com
#[derive(Parser, Debug)]
#[command(name = "rando", version, about = "Hike scraper and filter for randoromandie.com")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape every hike post into the record store
    Scrape {
        /// Listing pages to walk (0 = built-in ceiling)
        #[arg(long)]
        max_pages: Option<usize>,

        /// Hikes to fetch (0 = all)
        #[arg(long)]
        max_hikes: Option<usize>,

        /// Seconds between post requests
        #[arg(long)]
        delay: Option<f64>,

        /// Concurrent post fetches
        #[arg(long)]
        concurrency: Option<usize>,

        /// Record store path (.json selects the JSON store)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List stored hikes matching the given filters
    Filter {
        /// Record store path
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        filters: FilterArgs,

        /// Print matching records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show filter dimensions and their values
    Options,

    /// Show the information table of one stored hike
    Show {
        /// Post URL
        url: String,

        /// Record store path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate the configuration file
    Validate,
}

/// Filter values; a flag may be repeated to select several values.
#[derive(Args, Debug, Default)]
struct FilterArgs {
    #[arg(long)]
    canton: Vec<String>,
    #[arg(long = "type")]
    type_parcours: Vec<String>,
    #[arg(long)]
    km: Vec<String>,
    #[arg(long)]
    duree: Vec<String>,
    #[arg(long)]
    env: Vec<String>,
    #[arg(long)]
    difficulte: Vec<String>,
    #[arg(long)]
    denivele: Vec<String>,
    #[arg(long)]
    saison: Vec<String>,
}

impl FilterArgs {
    fn selections(&self) -> Selections {
        Selections::new()
            .with(Dimension::Canton, &self.canton)
            .with(Dimension::TypeParcours, &self.type_parcours)
            .with(Dimension::Km, &self.km)
            .with(Dimension::Duree, &self.duree)
            .with(Dimension::Environnement, &self.env)
            .with(Dimension::Difficulte, &self.difficulte)
            .with(Dimension::Denivele, &self.denivele)
            .with(Dimension::Saison, &self.saison)
    }
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load_or_default(&cli.config);
    log::debug!("Loaded configuration from {}", cli.config.display());

    match cli.command {
        Command::Scrape {
            max_pages,
            max_hikes,
            delay,
            concurrency,
            output,
        } => {
            if let Some(max_pages) = max_pages {
                config.run.max_pages = max_pages;
            }
            if let Some(max_hikes) = max_hikes {
                config.run.max_hikes = max_hikes;
            }
            if let Some(delay) = delay {
                if !delay.is_finite() || delay < 0.0 {
                    return Err(AppError::validation("--delay must be a non-negative number"));
                }
                config.crawler.request_delay_ms = (delay * 1000.0).round() as u64;
            }
            if let Some(concurrency) = concurrency {
                config.crawler.max_concurrent = concurrency;
            }
            if let Some(output) = output {
                config.storage.output = output;
            }
            config.validate()?;

            let fetcher = HttpFetcher::new(&config.crawler)?;
            let store = open_store(&config.storage.output)?;
            pipeline::run_scraper(&config, &fetcher, store.as_ref()).await?;
        }

        Command::Filter {
            output,
            filters,
            json,
        } => {
            let store = open_store(output.as_ref().unwrap_or(&config.storage.output))?;
            let hikes = store.read_all().await?;
            let selections = filters.selections();
            let report = filter_with_report(&hikes, &selections);

            if report.season_divergences > 0 {
                log::warn!(
                    "{} hikes have season text that only matches \"Toute l'année\" through the derived season set",
                    report.season_divergences
                );
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&report.hikes)?);
            } else {
                for hike in &report.hikes {
                    println!("{}", summary_line(hike));
                }
                println!("{} / {} hikes", report.hikes.len(), hikes.len());
            }
        }

        Command::Options => {
            for (dimension, labels) in filter_options() {
                println!("{} (--{})", dimension.label(), dimension.key());
                for label in labels {
                    println!("    {label}");
                }
            }
        }

        Command::Show { url, output } => {
            let store = open_store(output.as_ref().unwrap_or(&config.storage.output))?;
            let hike = find_hike(store.as_ref(), &url).await?;

            println!("{}", hike.title);
            println!("{}", hike.url);
            for (key, value) in hike.info_rows() {
                println!("    {key}: {value}");
            }
            if let Some(map) = &hike.suisse_mobile_url {
                println!("    Carte: {map}");
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK ({})", cli.config.display());
        }
    }

    Ok(())
}

/// One line per hike for the filter listing.
fn summary_line(hike: &HikeRecord) -> String {
    let cells = [
        hike.canton.clone(),
        hike.km_range.map(|v| v.to_string()),
        hike.duree_range.map(|v| v.to_string()),
        hike.difficulte.map(|v| v.to_string()),
    ];
    let details: Vec<String> = cells.into_iter().flatten().collect();
    format!("{} | {} | {}", hike.title, details.join(", "), hike.url)
}

async fn find_hike(store: &dyn HikeStore, url: &str) -> Result<HikeRecord> {
    let wanted = url.trim().trim_end_matches('/');
    store
        .read_all()
        .await?
        .into_iter()
        .find(|h| h.url == wanted)
        .ok_or_else(|| AppError::validation(format!("no stored hike for {url}")))
}
