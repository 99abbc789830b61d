// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use kurzora_fx::api::RateApiClient;
use kurzora_fx::config::{self, Config};
use kurzora_fx::db;
use kurzora_fx::models::{currencies, BASE_CURRENCY, SUPPORTED_CURRENCIES};
use kurzora_fx::preferences::PreferenceStore;
use kurzora_fx::rate_cache::RateCache;
use kurzora_fx::{ConversionService, ConversionState, CurrencyContext, RefreshOutcome};

#[derive(Parser)]
#[command(name = "kurzora-fx", about = "Show USD amounts in your preferred currency")]
struct Cli {
    /// Path to config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a USD amount into the preferred (or given) currency
    Convert {
        amount: f64,
        #[arg(long, short)]
        currency: Option<String>,
    },
    /// Change the preferred currency
    Select { currency: String },
    /// Show the preferred currency and the cached rate
    Show,
    /// List supported currencies
    Currencies,
    /// Remove the cached rate
    ClearCache,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let mut config = config::load_config(cli.config.as_deref())?;
    config.apply_env_overrides()?;

    match cli.command {
        Commands::Convert { amount, currency } => convert(&config, amount, currency).await?,
        Commands::Select { currency } => select(&config, &currency).await?,
        Commands::Show => show(&config).await?,
        Commands::Currencies => list_currencies(),
        Commands::ClearCache => {
            rate_cache(&config).await?.clear().await?;
            println!("✅ Rate cache cleared");
        }
    }

    Ok(())
}

async fn rate_cache(config: &Config) -> Result<RateCache> {
    let pool = db::create_db_pool(&config.database_url).await?;
    Ok(RateCache::new(pool, config.cache_ttl()?))
}

fn open_preferences(config: &Config) -> Result<PreferenceStore> {
    match &config.preferences_path {
        Some(path) => PreferenceStore::open(path),
        None => PreferenceStore::open_default(),
    }
}

async fn load_context(config: &Config) -> Result<(CurrencyContext<RateApiClient>, RefreshOutcome)> {
    let service =
        ConversionService::new(RateApiClient::from_config(config), rate_cache(config).await?);
    Ok(CurrencyContext::load(open_preferences(config)?, service).await)
}

fn report(outcome: &RefreshOutcome) {
    match outcome {
        RefreshOutcome::Neutral => {}
        RefreshOutcome::CacheHit(rate) => println!("Using cached rate {}", rate),
        RefreshOutcome::Fetched(rate) => println!("✅ Fetched rate {}", rate),
        RefreshOutcome::Failed { message, rate } => {
            eprintln!("⚠️  {}", message);
            eprintln!("⚠️  Falling back to rate {}", rate);
        }
        RefreshOutcome::Superseded => {}
    }
}

async fn convert(config: &Config, amount: f64, currency: Option<String>) -> Result<()> {
    let base = currencies::format_amount(amount, BASE_CURRENCY);

    match currency {
        // One-off conversion; the saved preference stays untouched
        Some(code) => {
            let mut service =
                ConversionService::new(RateApiClient::from_config(config), rate_cache(config).await?);
            service.set_currency(&code);
            report(&service.refresh().await);
            println!("{} = {}", base, service.format(service.convert(amount)));
        }
        None => {
            let (ctx, outcome) = load_context(config).await?;
            report(&outcome);
            println!("{} = {}", base, ctx.display(amount));
        }
    }

    Ok(())
}

async fn select(config: &Config, currency: &str) -> Result<()> {
    let (mut ctx, _) = load_context(config).await?;
    let outcome = ctx.select_currency(currency).await?;
    report(&outcome);
    println!(
        "✅ Preferred currency set to {} (saved to {})",
        ctx.preferences().get(),
        ctx.preferences().path().display()
    );
    Ok(())
}

async fn show(config: &Config) -> Result<()> {
    let prefs = open_preferences(config)?;
    let cache = rate_cache(config).await?;
    let preferred = prefs.get().to_string();

    println!("Preferred currency: {}", preferred);
    println!("Cache TTL: {}s", cache.ttl().num_seconds());
    match cache.peek(&preferred).await? {
        Some(rate) => {
            let fresh = cache.read(&preferred).await?.is_some();
            println!(
                "Cached rate: 1 {} = {} {} (fetched {}, {})",
                BASE_CURRENCY,
                rate.rate,
                rate.currency_code,
                rate.fetched_at.format("%Y-%m-%d %H:%M:%S UTC"),
                if fresh { "fresh" } else { "expired" }
            );
        }
        None => println!("Cached rate: none"),
    }

    // Resolve without touching the network if a fresh entry exists
    let mut service = ConversionService::new(RateApiClient::from_config(config), cache);
    service.set_currency(&preferred);
    service.refresh().await;
    let state = match service.state() {
        ConversionState::Neutral => "neutral".to_string(),
        ConversionState::Loading => "loading".to_string(),
        ConversionState::Resolved(rate) => format!("resolved ({})", rate.rate),
        ConversionState::Errored { fallback, message } => match fallback {
            Some(rate) => format!("errored, using last good rate {} ({})", rate.rate, message),
            None => format!("errored, using neutral rate ({})", message),
        },
    };
    println!("State: {}", state);
    Ok(())
}

fn list_currencies() {
    for info in SUPPORTED_CURRENCIES {
        let marker = if info.code == BASE_CURRENCY { " (base)" } else { "" };
        println!("{}  {:<20} {}{}", info.code, info.name, info.symbol.trim(), marker);
    }
}
