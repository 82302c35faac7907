//! Generate a batch of synthetic transactions and classify each one.
//!
//! Usage: classify_batch [COUNT] [--seed N] [--direct]
//!
//! Prints one processed transaction per line as JSON, then a summary line.
//! `--direct` skips the proxy and prompts the upstream model itself.

use std::env;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

use fraud_monitor_rs::classifier::Classifier;
use fraud_monitor_rs::classifier::groq::GroqAnalyzer;
use fraud_monitor_rs::classifier::http::HttpClassifier;
use fraud_monitor_rs::config::Settings;
use fraud_monitor_rs::context::SessionContext;
use fraud_monitor_rs::generator::TransactionGenerator;
use fraud_monitor_rs::model::{ProcessedTransaction, SimulationStats};

struct Args {
    count: usize,
    seed: Option<u64>,
    direct: bool,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        count: 10,
        seed: None,
        direct: false,
    };

    let mut iter = env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--direct" => args.direct = true,
            "--seed" => {
                let raw = iter.next().ok_or("--seed needs a value")?;
                args.seed = Some(raw.parse().map_err(|e| format!("bad seed {}: {}", raw, e))?);
            }
            other => {
                args.count = other
                    .parse()
                    .map_err(|e| format!("bad count {}: {}", other, e))?;
            }
        }
    }
    Ok(args)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Logs go to stderr so stdout stays machine readable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(LevelFilter::INFO.into()))
        .with_writer(std::io::stderr)
        .init();

    dotenv::dotenv().ok();
    let args = parse_args()?;
    let settings = Settings::new()?;

    let classifier: Arc<dyn Classifier> = if args.direct {
        Arc::new(GroqAnalyzer::new(&settings.groq)?)
    } else {
        Arc::new(HttpClassifier::new(&settings.classifier)?)
    };
    info!(
        "🔧 Classifying {} transactions via {}",
        args.count,
        classifier.name()
    );

    let ctx = SessionContext::new_system();
    let mut generator = match args.seed.or(settings.simulation.seed) {
        Some(seed) => TransactionGenerator::with_seed(ctx, seed),
        None => TransactionGenerator::new(ctx),
    }
    .with_fraud_probability(settings.simulation.fraud_probability);

    let mut stats = SimulationStats::default();
    let mut fallbacks = 0usize;

    for _ in 0..args.count {
        let transaction = generator.generate();
        let verdict = classifier.classify(&transaction).await;
        if verdict.is_fallback() {
            fallbacks += 1;
        }

        let processed = ProcessedTransaction::new(transaction, verdict.into_result());
        stats.record(processed.is_fraud());
        println!("{}", serde_json::to_string(&processed)?);
    }

    info!(
        total = stats.total,
        fraud = stats.fraud,
        fallbacks,
        "✅ Batch complete"
    );
    Ok(())
}
