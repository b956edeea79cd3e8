use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fhescore_client::{
    display_score, ClientConfig, LocalWallet, RetryPolicy, ScoreClient, ScoreRating,
    SUPPORTED_NETWORKS,
};
use fhescore_crypto::{utils::random_bytes, LocalCoprocessor};
use fhescore_ledger::{EngineConfig, ScoreLedger, Weights, DEFAULT_VERIFICATION_THRESHOLD};
use fhescore_types::{ActivityKind, Identity};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "fhescore", author, version, about, long_about = None)]
struct Args {
    #[arg(long, env = "FHESCORE_CHAIN_ID", default_value_t = 31337)]
    chain_id: u64,

    /// Score at or above which verification succeeds.
    #[arg(long, env = "FHESCORE_THRESHOLD", default_value_t = DEFAULT_VERIFICATION_THRESHOLD, allow_hyphen_values = true)]
    threshold: i64,

    #[arg(long, env = "FHESCORE_TIMEOUT_MS", default_value_t = 30_000)]
    timeout_ms: u64,

    /// Attempts for encrypt/decrypt calls, including the first.
    #[arg(long, env = "FHESCORE_RETRIES", default_value_t = 1)]
    retries: u32,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a scripted session against an in-process ledger.
    Demo {
        #[arg(long, default_value_t = 5)]
        repayments: u64,
        #[arg(long, default_value_t = 0)]
        defaults: u64,
        #[arg(long, default_value_t = 4)]
        staking: u64,
        #[arg(long, default_value_t = 3)]
        governance_votes: u64,
        #[arg(long, default_value_t = 10)]
        trading_volume: u64,
        /// Write the final ledger state (bincode for a `.bin` path, JSON otherwise).
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
    /// Print the scoring weights.
    Weights,
    /// Print the supported networks.
    Networks,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("{},fhescore=debug", args.log_level))),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match args.command {
        Command::Demo {
            repayments,
            defaults,
            staking,
            governance_votes,
            trading_volume,
            ref snapshot,
        } => {
            let counts = [repayments, defaults, staking, governance_votes, trading_volume];
            run_demo(&args, counts, snapshot.clone()).await
        }
        Command::Weights => {
            let weights = Weights::default();
            for kind in ActivityKind::ALL {
                println!("{:<26} {:>5}", kind.label(), weights.weight(kind));
            }
            println!("{:<26} {:>5}", "threshold", args.threshold);
            Ok(())
        }
        Command::Networks => {
            for network in SUPPORTED_NETWORKS.iter() {
                println!("{:>9}  {:<16} {}", network.chain_id, network.name, network.relayer_url);
            }
            Ok(())
        }
    }
}

async fn run_demo(args: &Args, counts: [u64; 5], snapshot: Option<PathBuf>) -> Result<()> {
    let service = Arc::new(LocalCoprocessor::new(args.chain_id));
    let contract = Identity::new(random_bytes());
    let config = EngineConfig::new(contract, args.chain_id).with_threshold(args.threshold);
    let ledger = Arc::new(ScoreLedger::deploy(config, service).await?);

    let client_config = ClientConfig::default()
        .with_timeout(Duration::from_millis(args.timeout_ms))
        .with_retry(RetryPolicy::exponential(args.retries));

    let user = ScoreClient::connect(ledger.clone(), LocalWallet::random(args.chain_id), client_config)?;
    let verifier =
        ScoreClient::connect(ledger.clone(), LocalWallet::random(args.chain_id), client_config)?;
    info!(contract = %contract, user = %user.identity(), network = user.network().name, "demo started");

    user.register().await?;
    for kind in ActivityKind::ALL {
        let value = counts[kind.index()];
        if value > 0 {
            user.submit_activity(kind, value).await?;
        }
    }
    user.calculate_score().await?;

    let summary = user.decrypt_activities().await?;
    let score = user.decrypt_score().await?;
    println!("identity      {}", user.identity());
    for kind in ActivityKind::ALL {
        println!("  {:<26} {}", kind.label(), summary.get(kind));
    }
    println!(
        "score         {} ({}, raw {})",
        display_score(score),
        ScoreRating::from_score(score),
        score
    );
    let expected = summary.expected_score(&ledger.weights());
    if expected != score {
        warn!(expected, score, "decrypted score does not match decrypted counters");
    }

    let result = verifier.verify_score(user.identity()).await?;
    let passed = verifier.decrypt_verification(result).await?;
    println!("verified by   {}", verifier.identity());
    println!("  score >= {}  {}", args.threshold, passed);

    if let Some(path) = snapshot {
        let snapshot = ledger.snapshot().await;
        let encoded = match path.extension().and_then(|ext| ext.to_str()) {
            Some("bin") => snapshot.to_bytes()?,
            _ => snapshot.to_json()?.into_bytes(),
        };
        std::fs::write(&path, encoded)
            .with_context(|| format!("failed to write snapshot to {}", path.display()))?;
        info!(path = %path.display(), "ledger snapshot written");
    }

    Ok(())
}
