use once_cell::sync::Lazy;
use prometheus::{
    Histogram, IntCounter, IntCounterVec, IntGauge, register_histogram, register_int_counter,
    register_int_counter_vec, register_int_gauge,
};

// --- Simulation Metrics ---

pub static TRANSACTIONS_PROCESSED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "fraud_monitor_transactions_processed_total",
        "Total transactions classified and published to a feed"
    )
    .expect("transactions_processed counter")
});

pub static FRAUD_FLAGGED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "fraud_monitor_fraud_flagged_total",
        "Total published transactions flagged as fraud"
    )
    .expect("fraud_flagged counter")
});

pub static STALE_CYCLES: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "fraud_monitor_stale_cycles_total",
        "Cycles whose verdict arrived after the simulation was stopped"
    )
    .expect("stale_cycles counter")
});

pub static SIMULATION_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "fraud_monitor_simulation_running",
        "Number of simulations currently running"
    )
    .expect("simulation_running gauge")
});

// --- Classifier Metrics ---

pub static CLASSIFICATION_LATENCY: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "fraud_monitor_classification_latency_seconds",
        "Round trip latency of a classification request",
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 3.0, 5.0, 10.0]
    )
    .expect("classification_latency histogram")
});

pub static CLASSIFIER_FALLBACKS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "fraud_monitor_classifier_fallbacks_total",
        "Verdicts replaced by the fallback verdict, by failure kind",
        &["kind"]
    )
    .expect("classifier_fallbacks counter")
});

pub fn record_published(is_fraud: bool) {
    TRANSACTIONS_PROCESSED.inc();
    if is_fraud {
        FRAUD_FLAGGED.inc();
    }
}

pub fn inc_stale_cycles() {
    STALE_CYCLES.inc();
}

pub fn inc_running() {
    SIMULATION_RUNNING.inc();
}

pub fn dec_running() {
    SIMULATION_RUNNING.dec();
}

pub fn observe_classification_latency(duration_sec: f64) {
    CLASSIFICATION_LATENCY.observe(duration_sec);
}

pub fn inc_classifier_fallbacks(kind: &str) {
    CLASSIFIER_FALLBACKS.with_label_values(&[kind]).inc();
}
