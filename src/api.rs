use crate::classifier::adapter::fallback_result;
use crate::classifier::groq::GroqAnalyzer;
use crate::simulation::{Simulation, SimulationStatus};
use actix_web::{HttpResponse, Responder, web};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::error;

pub const SERVER_FALLBACK_REASON: &str = "An error occurred during AI analysis on the server. Flagging as potential fraud for manual review.";

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Serialize)]
pub struct StatusResponse {
    status: SimulationStatus,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn not_found(message: String) -> HttpResponse {
    HttpResponse::NotFound().json(ErrorResponse { error: message })
}

pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn get_dashboard(sim: web::Data<Arc<Simulation>>) -> impl Responder {
    HttpResponse::Ok().json(sim.snapshot())
}

pub async fn get_transactions(sim: web::Data<Arc<Simulation>>) -> impl Responder {
    HttpResponse::Ok().json(sim.transactions())
}

pub async fn get_transaction(
    sim: web::Data<Arc<Simulation>>,
    path: web::Path<String>,
) -> impl Responder {
    let id = path.into_inner();
    match sim.get(&id) {
        Some(processed) => HttpResponse::Ok().json(processed),
        None => not_found(format!("Transaction {} is not in the feed", id)),
    }
}

pub async fn get_stats(sim: web::Data<Arc<Simulation>>) -> impl Responder {
    HttpResponse::Ok().json(sim.stats())
}

pub async fn get_selection(sim: web::Data<Arc<Simulation>>) -> impl Responder {
    HttpResponse::Ok().json(sim.selected())
}

pub async fn select_transaction(
    sim: web::Data<Arc<Simulation>>,
    path: web::Path<String>,
) -> impl Responder {
    let id = path.into_inner();
    match sim.select(&id) {
        Some(processed) => HttpResponse::Ok().json(processed),
        None => not_found(format!("Transaction {} is not in the feed", id)),
    }
}

pub async fn toggle_simulation(sim: web::Data<Arc<Simulation>>) -> impl Responder {
    let status = sim.toggle();
    HttpResponse::Ok().json(StatusResponse { status })
}

pub async fn start_simulation(sim: web::Data<Arc<Simulation>>) -> impl Responder {
    sim.start();
    HttpResponse::Ok().json(StatusResponse {
        status: sim.status(),
    })
}

pub async fn stop_simulation(sim: web::Data<Arc<Simulation>>) -> impl Responder {
    sim.stop();
    HttpResponse::Ok().json(StatusResponse {
        status: sim.status(),
    })
}

/// Classification proxy: prompt the upstream model with the posted document
/// and relay its verdict. Any JSON object is accepted as is.
pub async fn analyze_transaction(
    analyzer: web::Data<Arc<GroqAnalyzer>>,
    body: web::Bytes,
) -> impl Responder {
    let document = match serde_json::from_slice::<Value>(&body) {
        Ok(document @ Value::Object(_)) => document,
        _ => {
            return HttpResponse::BadRequest().json(ErrorResponse {
                error: "Transaction data is required.".to_string(),
            });
        }
    };
    let transaction_id = document
        .get("transactionId")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();

    match analyzer.analyze_document(&document).await {
        Ok(result) => HttpResponse::Ok().json(result),
        Err(e) => {
            error!(
                transaction_id = %transaction_id,
                "Error analyzing transaction with upstream model: {}", e
            );
            HttpResponse::InternalServerError().json(fallback_result(SERVER_FALLBACK_REASON))
        }
    }
}

// Dashboard routes
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(health_check)))
        .service(
            web::scope("/api")
                .route("/dashboard", web::get().to(get_dashboard))
                .route("/stats", web::get().to(get_stats))
                .route("/transactions", web::get().to(get_transactions))
                .route("/transactions/{id}", web::get().to(get_transaction))
                .route("/selection", web::get().to(get_selection))
                .route("/selection/{id}", web::post().to(select_transaction))
                .route("/simulation/toggle", web::post().to(toggle_simulation))
                .route("/simulation/start", web::post().to(start_simulation))
                .route("/simulation/stop", web::post().to(stop_simulation)),
        );
}

// Classification proxy route, registered only when an upstream key is configured
pub fn proxy_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/analyze-transaction-groq").route(web::post().to(analyze_transaction)),
    );
}
