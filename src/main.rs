//! Luno trade advisor CLI.
//!
//! Evaluates proposed trades against a portfolio snapshot and profit
//! targets, and journals every verdict.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use luno_advisor::config::AppConfig;
use luno_advisor::db::Database;
use luno_advisor::models::{PortfolioStatus, Targets, TradeSignal};
use luno_advisor::signals::{EnsembleSource, IndicatorSource, PriceHistory, SignalSource};
use luno_advisor::DecisionEngine;

/// Luno trade advisor CLI.
#[derive(Parser)]
#[command(name = "advisor")]
#[command(about = "Approve, reject or hold proposed Luno trades", long_about = None)]
struct Cli {
    /// Database URL for the decision journal
    #[arg(short, long, env = "ADVISOR_DATABASE_URL")]
    database: Option<String>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a trade scenario
    Evaluate {
        /// Scenario JSON file: {"signal": .., "portfolio": .., "targets": ..}
        #[arg(short, long)]
        input: PathBuf,

        /// Print the decision as JSON
        #[arg(long)]
        json: bool,

        /// Skip writing the decision to the journal
        #[arg(long)]
        no_record: bool,
    },

    /// Predict direction for a pair from price history
    Predict {
        /// Price history JSON file: {"BTC/ZAR": [closes, oldest first]}
        #[arg(long)]
        history: PathBuf,

        /// Pair to predict
        #[arg(short, long)]
        pair: String,

        /// Use the model ensemble instead of the indicator vote
        #[arg(long)]
        ensemble: bool,

        /// Also evaluate a trade of this many units against a scenario
        #[arg(long, requires = "scenario")]
        amount: Option<Decimal>,

        /// Scenario JSON providing the portfolio and targets
        #[arg(long)]
        scenario: Option<PathBuf>,
    },

    /// Show recent decisions from the journal
    History {
        /// Number of decisions to show
        #[arg(short = 'n', long, default_value = "20")]
        limit: i64,
    },

    /// Show the active risk policy
    Policy,
}

/// A trade to evaluate with its context.
#[derive(Debug, Deserialize)]
struct Scenario {
    signal: Option<TradeSignal>,
    portfolio: PortfolioStatus,
    targets: Targets,
}

impl Scenario {
    fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Invalid scenario JSON in {}", path.display()))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    let config = AppConfig::from_env()?;
    let database_url = cli.database.clone().unwrap_or(config.database_url.clone());
    let engine = DecisionEngine::new(config.policy.clone());

    match cli.command {
        Commands::Evaluate {
            input,
            json,
            no_record,
        } => {
            let scenario = Scenario::load(&input)?;
            let signal = scenario
                .signal
                .context("Scenario has no signal to evaluate")?;

            let result = engine.evaluate(&signal, &scenario.portfolio, &scenario.targets);

            if !no_record {
                let db = Database::new(&database_url).await?;
                let id = db.record_decision(&signal, &result).await?;
                info!(id = %id, "Decision recorded");
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!(
                    "\nSignal: {} {} {} @ {}",
                    signal.action.as_str().to_uppercase(),
                    signal.amount,
                    signal.normalized_pair(),
                    signal.price
                );
                println!(
                    "Progress: {} of monthly target, {} of weekly target",
                    percent(scenario.targets.progress(scenario.portfolio.monthly_performance)),
                    percent(scenario.targets.weekly_progress(scenario.portfolio.weekly_performance))
                );
                println!("{}", result);
            }
        }

        Commands::Predict {
            history,
            pair,
            ensemble,
            amount,
            scenario,
        } => {
            let history = PriceHistory::from_file(&history)?;
            let price = history.last_price(&pair);

            let source: Box<dyn SignalSource> = if ensemble {
                Box::new(EnsembleSource::with_default_models(history))
            } else {
                Box::new(IndicatorSource::new(history))
            };

            info!(pair = %pair, source = source.name(), "Predicting");
            let prediction = source.predict(&pair)?;

            println!("\n=== Prediction ({}) ===", source.name());
            println!("Pair:       {}", prediction.pair);
            println!("Direction:  {:?}", prediction.direction);
            println!("Return:     {:+.2}%", prediction.prediction * 100.0);
            println!("Confidence: {:.2}", prediction.confidence);
            println!("Strength:   {:?}", prediction.signal_strength);

            if let (Some(amount), Some(path)) = (amount, scenario) {
                let scenario = Scenario::load(&path)?;
                let price = price.context("Price history has no usable last close")?;

                match prediction.into_signal(amount, price) {
                    Some(signal) => {
                        let result =
                            engine.evaluate(&signal, &scenario.portfolio, &scenario.targets);
                        println!("\n{}", result);
                    }
                    None => println!("\nNeutral prediction, nothing to evaluate."),
                }
            }
        }

        Commands::History { limit } => {
            let db = Database::new(&database_url).await?;
            let decisions = db.recent_decisions(limit).await?;

            if decisions.is_empty() {
                println!("No decisions recorded. Use 'advisor evaluate --input <file>' first.");
                return Ok(());
            }

            println!(
                "\n{:<20} {:<10} {:<5} {:>14} {:<16} {:>6} {:<10}",
                "TIME", "PAIR", "SIDE", "AMOUNT", "DECISION", "CONF", "RISK"
            );
            println!("{}", "-".repeat(88));

            for d in &decisions {
                println!(
                    "{:<20} {:<10} {:<5} {:>14} {:<16} {:>6} {:<10}",
                    truncate(&d.created_at, 19),
                    d.pair,
                    d.action,
                    truncate(&d.amount, 14),
                    d.decision,
                    truncate(&d.confidence, 6),
                    d.risk_assessment
                );
            }

            let counts = db.decision_counts().await?;
            println!(
                "\nTotal: {} | Approved: {} | Rejected: {} | Held: {}",
                counts.total, counts.approved, counts.rejected, counts.held
            );
        }

        Commands::Policy => {
            let policy = engine.policy();
            let pct = |d: Decimal| (d * Decimal::ONE_HUNDRED).normalize();

            println!("\n=== Risk Policy ===\n");
            if let Some(path) = &config.policy_file {
                println!("Source:                 {}", path.display());
            }
            println!("Position Limits:");
            println!("  Max Risk Per Trade:   {}%", pct(policy.max_risk_per_trade));
            println!("  Max Asset Allocation: {}%", pct(policy.max_asset_allocation));
            println!("  Allocation Warning:   {}%", pct(policy.allocation_warning_level()));

            println!("\nExposure:");
            println!("  High Exposure:        {:.0}%", policy.high_exposure * 100.0);
            println!("  Low Exposure:         {:.0}%", policy.low_exposure * 100.0);

            println!("\nAssets:");
            println!("  Protected Asset:      {}", policy.protected_asset);
            println!("  Reserve Amount:       {}", policy.reserve_amount);
            println!("  Major Pairs:          {}", policy.major_pairs.join(", "));

            println!("\nDecision Thresholds:");
            println!("  Approve:              >= {}", policy.approve_threshold);
            println!("  Medium Risk:          >= {}", policy.medium_risk_threshold);
            println!("  Reject:               <  {}", policy.reject_threshold);
            println!("  Signal Quality Base:  {}", policy.signal_quality_base);
            println!("  Full Size Confidence: {}", policy.full_size_confidence);
        }
    }

    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    // Logs go to stderr so --json output stays parseable
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
        return Ok(());
    }

    let log_level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

/// Format a ratio as a percentage, or "n/a" when it could not be computed.
fn percent(ratio: Option<Decimal>) -> String {
    ratio
        .and_then(|r| r.checked_mul(Decimal::ONE_HUNDRED))
        .map(|pct| format!("{}%", pct.round_dp(1).normalize()))
        .unwrap_or_else(|| "n/a".to_string())
}

/// Truncate a string for display.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
