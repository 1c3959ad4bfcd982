mod cli;
mod error_mapping;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::sync::Arc;

use cli::{Cli, Commands};
use skycache_core::{AppError, Config, ConfigError};
use skycache_weather::{
    ForecastDisplay, ForecastEntry, ProviderOptions, Refresher, Schedule, ScheduleRegistry,
    Scheduler, SqliteForecastStore, WeatherProvider,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, validation) = Config::load_validated(cli.config.as_deref())?;

    let level = if cli.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    skycache_core::init(level)?;
    for warning in &validation.warnings {
        tracing::warn!("Config warning: {}", warning);
    }

    let refresher = Arc::new(build_refresher(&config)?);
    let display = ForecastDisplay::new(
        config.weather.symbol_base_url.as_str(),
        config.weather.date_format.as_str(),
    );

    let result = match cli.command {
        Commands::Run => run(&config, refresher).await,
        Commands::Show { source_id } => show(&config, &refresher, &display, &source_id).await,
        Commands::Fetch { place } => fetch(&refresher, &display, &place).await,
        Commands::List => list(&config, &refresher),
        Commands::Purge { source_id } => purge(&refresher, &source_id),
    };

    if let Err(e) = result {
        tracing::debug!("Command failed: {:#}", e);
        eprintln!("{}", exit_message(&e));
        std::process::exit(1);
    }
    Ok(())
}

/// One line for stderr: the user-facing text for application errors,
/// the full context chain for anything else.
fn exit_message(e: &anyhow::Error) -> String {
    match e.downcast_ref::<AppError>() {
        Some(app) => app.user_message().to_string(),
        None => format!("Error: {:#}", e),
    }
}

fn build_refresher(config: &Config) -> Result<Refresher> {
    let options = ProviderOptions {
        base_url: config.weather.base_url.clone(),
        timeout: config.weather.request_timeout(),
        user_agent: config.weather.user_agent.clone(),
    };
    let provider = WeatherProvider::new(&options).map_err(error_mapping::from_weather)?;

    let cache_path = config.cache_path();
    let store = SqliteForecastStore::open(&cache_path)
        .map_err(error_mapping::from_store)
        .with_context(|| format!("Failed to open forecast cache at {}", cache_path.display()))?;
    tracing::debug!("Using forecast cache at {}", cache_path.display());

    Ok(Refresher::new(
        provider,
        Arc::new(store),
        Arc::new(ScheduleRegistry::new()),
    ))
}

async fn run(config: &Config, refresher: Arc<Refresher>) -> Result<()> {
    if config.feeds.is_empty() {
        println!("No feeds configured. Add [[feeds]] entries to the config file.");
        return Ok(());
    }

    let scheduler = Scheduler::new(refresher);
    for feed in &config.feeds {
        let schedule = Schedule::new(
            feed.source_id.as_str(),
            feed.place.as_str(),
            feed.refresh_rate.as_duration(),
        );
        scheduler
            .register(schedule)
            .map_err(error_mapping::from_weather)?;
    }

    tracing::info!(
        "SkyCache running {} feed(s), press Ctrl-C to stop",
        config.feeds.len()
    );
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    scheduler.shutdown().await;
    Ok(())
}

async fn show(
    config: &Config,
    refresher: &Refresher,
    display: &ForecastDisplay,
    source_id: &str,
) -> Result<()> {
    let feed = config
        .feed(source_id)
        .ok_or_else(|| AppError::from(ConfigError::UnknownFeed(source_id.to_string())))?;

    let entry = refresher
        .get_current(&feed.source_id, &feed.place)
        .await
        .map_err(error_mapping::from_weather)?;

    println!(
        "Current Temperature in {}",
        display.place_breadcrumb(&feed.place)
    );
    print_entry(display, &entry);
    println!("{}", display.attribution());
    Ok(())
}

async fn fetch(refresher: &Refresher, display: &ForecastDisplay, place: &str) -> Result<()> {
    let series = refresher
        .fetch_future(place, Utc::now())
        .await
        .map_err(error_mapping::from_fetch)?;

    if series.is_empty() {
        println!("{}", skycache_core::WeatherError::NoFreshData.user_message());
        return Ok(());
    }

    println!("Forecast for {}", display.place_breadcrumb(place));
    for entry in &series {
        print_entry(display, entry);
    }
    println!("{}", display.attribution());
    Ok(())
}

fn list(config: &Config, refresher: &Refresher) -> Result<()> {
    let cached = refresher
        .cached_sources()
        .map_err(error_mapping::from_weather)?;

    for line in feed_listing(config, &cached) {
        println!("{}", line);
    }
    Ok(())
}

/// Configured feeds first, then cached records no feed refers to any more.
fn feed_listing(config: &Config, cached: &[String]) -> Vec<String> {
    let mut lines: Vec<String> = config
        .feeds
        .iter()
        .map(|feed| {
            let state = if cached.contains(&feed.source_id) {
                "cached"
            } else {
                "not cached"
            };
            format!(
                "{:<20} {:<12} {:<32} {}",
                feed.source_id,
                feed.refresh_rate.to_string(),
                feed.place,
                state
            )
        })
        .collect();

    lines.extend(
        cached
            .iter()
            .filter(|id| config.feed(id).is_none())
            .map(|id| format!("{:<20} (not configured, cached; remove with `skycache purge`)", id)),
    );
    lines
}

fn purge(refresher: &Refresher, source_id: &str) -> Result<()> {
    let removed = refresher
        .purge(source_id)
        .map_err(error_mapping::from_weather)?;

    if removed {
        println!("Removed cached forecast for {}", source_id);
    } else {
        println!("No cached forecast for {}", source_id);
    }
    Ok(())
}

fn print_entry(display: &ForecastDisplay, entry: &ForecastEntry) {
    println!(
        "  {:<22} {:>9}  {}",
        display.time_label(entry),
        display.temperature_label(entry),
        display.symbol_url(entry)
    );
}
