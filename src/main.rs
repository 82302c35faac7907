use actix_web::{App, HttpServer, web};
use actix_web_prom::PrometheusMetricsBuilder;
use fraud_monitor_rs::api;
use fraud_monitor_rs::classifier::Classifier;
use fraud_monitor_rs::classifier::groq::GroqAnalyzer;
use fraud_monitor_rs::classifier::http::HttpClassifier;
use fraud_monitor_rs::config::{LoggingConfig, Settings};
use fraud_monitor_rs::simulation::{Simulation, SimulationConfig};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_logging(config: &LoggingConfig) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Load environment variables
    dotenv::dotenv().ok();

    let settings = Settings::new()?;
    init_logging(&settings.logging);

    info!("╔═══════════════════════════════════════════════════════════════╗");
    info!("║               FRAUD MONITOR RS                                ║");
    info!("║               Live Transaction Fraud Dashboard                ║");
    info!("╚═══════════════════════════════════════════════════════════════╝");

    // --- Classification ---
    let classifier = HttpClassifier::new(&settings.classifier)?;
    info!("Classifier endpoint: {}", classifier.endpoint());
    let classifier: Arc<dyn Classifier> = Arc::new(classifier);

    let analyzer = match GroqAnalyzer::new(&settings.groq) {
        Ok(a) => {
            info!("✅ Classification proxy enabled (model {})", a.model());
            Some(Arc::new(a))
        }
        Err(e) => {
            warn!("Classification proxy disabled: {}", e);
            None
        }
    };

    // --- Simulation ---
    let simulation = Arc::new(Simulation::new(
        SimulationConfig::from(&settings.simulation),
        classifier,
    ));
    info!("✅ Simulation session {} ready", simulation.session_id());

    if settings.simulation.autostart {
        simulation.start();
    }

    // --- API Server ---
    let prometheus = PrometheusMetricsBuilder::new("fraud_monitor_api")
        .registry(prometheus::default_registry().clone())
        .endpoint("/metrics")
        .build()?;

    let bind_address = settings.server.bind_address();
    info!("🚀 Starting API Server on {}", bind_address);

    let state_for_api = simulation.clone();
    HttpServer::new(move || {
        let cors = actix_cors::Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header();

        let mut app = App::new()
            .wrap(prometheus.clone())
            .wrap(cors)
            .app_data(web::Data::new(state_for_api.clone()))
            .configure(api::config);

        if let Some(analyzer) = analyzer.clone() {
            app = app
                .app_data(web::Data::new(analyzer))
                .configure(api::proxy_config);
        }
        app
    })
    .bind(&bind_address)?
    .run()
    .await?;

    // Server has stopped (signal); disarm the timer before exiting
    simulation.shutdown().await;
    info!("Shutdown complete");

    Ok(())
}
