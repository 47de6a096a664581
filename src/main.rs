//! Mastery command-line interface
//!
//! Records learning signals and queries scores and classifications against
//! a local mastery database.

use clap::{Parser, Subcommand};
use mastery_core::{
    error::{MasteryError, Result},
    ClassifyOptions, MasteryConfig, MasteryEngine,
};
use std::path::PathBuf;
use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mastery", version, about = "Track topic mastery from learning signals")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Set log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Configuration file (TOML)
    #[arg(short, long, env = "MASTERY_CONFIG")]
    config: Option<PathBuf>,

    /// Database path (overrides the configuration file and default)
    #[arg(long, env = "MASTERY_DB_PATH")]
    db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a learning signal for a user and concept
    Record {
        user: String,

        concept: String,

        /// Event kind: confusion, assumed_mastery, recall_correct, recall_fail
        #[arg(short, long)]
        kind: Option<String>,

        /// Explicit weight (overrides the kind's weight)
        #[arg(short, long, allow_hyphen_values = true)]
        weight: Option<f64>,

        /// Unix timestamp in seconds (defaults to now)
        #[arg(short, long)]
        timestamp: Option<i64>,
    },

    /// Show decayed mastery scores for a user
    Scores {
        user: String,

        /// Half-life in days (defaults to the configured value)
        #[arg(long)]
        half_life: Option<f64>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Classify phrases as weak, strong or neutral for a user
    Classify {
        user: String,

        #[arg(required = true)]
        phrases: Vec<String>,

        #[arg(long)]
        weak_threshold: Option<f64>,

        #[arg(long)]
        strong_threshold: Option<f64>,

        /// Print JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// List registered concepts
    Concepts,

    /// Show the registered concepts closest to a phrase
    Similar {
        phrase: String,

        /// Maximum number of concepts to show
        #[arg(short = 'n', long, default_value = "5")]
        limit: usize,
    },

    /// Write the effective configuration as TOML
    InitConfig {
        /// Output path
        path: PathBuf,
    },
}

fn load_config(cli: &Cli) -> Result<MasteryConfig> {
    let mut config = match &cli.config {
        Some(path) => MasteryConfig::from_file(path)?,
        None => MasteryConfig::default(),
    };

    if let Some(db_path) = &cli.db_path {
        config.database_path = Some(db_path.clone());
    }

    Ok(config)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json =
        serde_json::to_string_pretty(value).map_err(|e| MasteryError::Validation(e.to_string()))?;
    println!("{}", json);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // fastembed and ort are chatty at info
    let filter = EnvFilter::new(format!(
        "mastery={lvl},mastery_core={lvl},ort=warn,fastembed=warn",
        lvl = level.as_str().to_lowercase()
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr) // Write logs to stderr, not stdout
        .init();

    debug!("Mastery v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = load_config(&cli)?;

    if let Commands::InitConfig { path } = &cli.command {
        config.to_file(path)?;
        println!("Wrote configuration to {}", path.display());
        return Ok(());
    }

    let engine = MasteryEngine::open(&config).await?;

    match cli.command {
        Commands::Record {
            user,
            concept,
            kind,
            weight,
            timestamp,
        } => {
            engine
                .record_event_kind(&user, &concept, kind.as_deref(), weight, timestamp)
                .await?;
            println!("Recorded event for {} on '{}'", user, concept.trim());
        }

        Commands::Scores {
            user,
            half_life,
            json,
        } => {
            let half_life = half_life.unwrap_or(config.scoring.half_life_days);
            let scores = engine.compute_scores(&user, half_life).await?;

            let mut rows: Vec<(String, f64)> = scores.into_iter().collect();
            rows.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

            if json {
                print_json(&rows)?;
            } else if rows.is_empty() {
                println!("No events recorded for {}", user);
            } else {
                for (concept, score) in rows {
                    println!("{:>6.3}  {}", score, concept);
                }
            }
        }

        Commands::Classify {
            user,
            phrases,
            weak_threshold,
            strong_threshold,
            json,
        } => {
            let defaults: ClassifyOptions = config.scoring.clone().into();
            let options = defaults.with_thresholds(
                weak_threshold.unwrap_or(defaults.weak_threshold),
                strong_threshold.unwrap_or(defaults.strong_threshold),
            );

            let classification = engine.classify_with(&user, &phrases, &options).await?;

            if json {
                print_json(&classification)?;
            } else {
                println!("Weak   : {:?}", classification.weak);
                println!("Strong : {:?}", classification.strong);
                println!("Neutral: {:?}", classification.neutral);
            }
        }

        Commands::Concepts => {
            let keys = engine.registry().keys().await?;
            if keys.is_empty() {
                println!("No concepts registered");
            }
            for key in keys {
                println!("{}", key);
            }
        }

        Commands::Similar { phrase, limit } => {
            let ranked = engine
                .registry()
                .similar(&mastery_core::normalize(&phrase), limit)
                .await?;
            if ranked.is_empty() {
                println!("No concepts registered");
            }
            for (concept, similarity) in ranked {
                println!("{:>6.3}  {}", similarity, concept);
            }
        }

        // Handled before the engine is opened
        Commands::InitConfig { .. } => {}
    }

    Ok(())
}
