//! Periodic simulation loop and the bounded feed it maintains.
//!
//! A running simulation owns one timer task. Each tick runs a cycle
//! (generate, classify, publish) inside that task, so cycles of a run never
//! overlap. Every run has its own cancellation token; a cycle whose verdict
//! lands after the run was stopped is dropped without touching the feed.

use crate::classifier::Classifier;
use crate::config::SimulationSettings;
use crate::context::SessionContext;
use crate::generator::{DEFAULT_FRAUD_PROBABILITY, TransactionGenerator};
use crate::metrics;
use crate::model::{ProcessedTransaction, SimulationStats, Transaction};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

pub const DEFAULT_FEED_CAPACITY: usize = 50;
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationStatus {
    Idle,
    Running,
}

/// Newest-first history of processed transactions plus the running counters.
#[derive(Debug, Clone)]
pub struct FeedState {
    entries: VecDeque<ProcessedTransaction>,
    capacity: usize,
    stats: SimulationStats,
    selected: Option<ProcessedTransaction>,
}

impl Default for FeedState {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_CAPACITY)
    }
}

impl FeedState {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            stats: SimulationStats::default(),
            selected: None,
        }
    }

    /// Insert at the front, evicting the oldest entries past capacity.
    ///
    /// The first entry published while nothing is selected becomes the selection.
    pub fn publish(&mut self, processed: ProcessedTransaction) {
        self.stats.record(processed.is_fraud());
        if self.selected.is_none() {
            self.selected = Some(processed.clone());
        }
        self.entries.push_front(processed);
        self.entries.truncate(self.capacity);
    }

    /// Select an entry currently in the feed. Unknown ids leave the selection as is.
    pub fn select(&mut self, transaction_id: &str) -> Option<ProcessedTransaction> {
        let found = self.get(transaction_id).cloned()?;
        self.selected = Some(found.clone());
        Some(found)
    }

    pub fn get(&self, transaction_id: &str) -> Option<&ProcessedTransaction> {
        self.entries.iter().find(|p| p.id() == transaction_id)
    }

    // The selection may outlive its entry in the feed.
    pub fn selected(&self) -> Option<&ProcessedTransaction> {
        self.selected.as_ref()
    }

    pub fn entries(&self) -> impl Iterator<Item = &ProcessedTransaction> {
        self.entries.iter()
    }

    pub fn stats(&self) -> SimulationStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Everything a dashboard needs to render one frame.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedSnapshot {
    pub session_id: String,
    pub status: SimulationStatus,
    pub stats: SimulationStats,
    pub transactions: Vec<ProcessedTransaction>,
    pub selected: Option<ProcessedTransaction>,
}

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub interval: Duration,
    pub feed_capacity: usize,
    pub fraud_probability: f64,
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            feed_capacity: DEFAULT_FEED_CAPACITY,
            fraud_probability: DEFAULT_FRAUD_PROBABILITY,
            seed: None,
        }
    }
}

impl From<&SimulationSettings> for SimulationConfig {
    fn from(settings: &SimulationSettings) -> Self {
        Self {
            interval: settings.interval(),
            feed_capacity: settings.feed_capacity,
            fraud_probability: settings.fraud_probability,
            seed: settings.seed,
        }
    }
}

/// Cancellation signal owned by a single running period.
#[derive(Clone)]
struct RunToken {
    rx: watch::Receiver<bool>,
}

impl RunToken {
    fn is_cancelled(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

struct Runner {
    cancel: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Runner {
    fn cancel(&self) {
        let _ = self.cancel.send(true);
    }
}

struct Shared {
    session_id: String,
    state: RwLock<FeedState>,
    generator: Mutex<TransactionGenerator>,
    classifier: Arc<dyn Classifier>,
}

impl Shared {
    async fn process(&self, transaction: Transaction) -> ProcessedTransaction {
        let verdict = self.classifier.classify(&transaction).await;
        let fallback = verdict.is_fallback();
        let processed = ProcessedTransaction::new(transaction, verdict.into_result());

        info!(
            session_id = %self.session_id,
            transaction_id = %processed.id(),
            amount = %processed.transaction.amount,
            country = %processed.transaction.country,
            is_fraud = processed.analysis.is_fraud,
            fraud_score = processed.analysis.fraud_score,
            fallback,
            "Transaction analyzed"
        );
        processed
    }

    fn publish(&self, processed: ProcessedTransaction) {
        metrics::record_published(processed.is_fraud());
        self.state.write().publish(processed);
    }

    async fn run_cycle(&self, token: &RunToken) {
        let transaction = { self.generator.lock().generate() };
        let processed = self.process(transaction).await;

        if token.is_cancelled() {
            metrics::inc_stale_cycles();
            debug!(
                session_id = %self.session_id,
                transaction_id = %processed.id(),
                "Discarding verdict that arrived after stop"
            );
            return;
        }
        self.publish(processed);
    }
}

async fn run_loop(shared: Arc<Shared>, token: RunToken, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            // The first tick completes immediately.
            _ = ticker.tick() => shared.run_cycle(&token).await,
        }
    }

    debug!(session_id = %shared.session_id, "Simulation timer stopped");
}

/// One simulation session: generator, classifier, feed and timer.
pub struct Simulation {
    shared: Arc<Shared>,
    interval: Duration,
    runner: Mutex<Option<Runner>>,
}

impl Simulation {
    pub fn new(config: SimulationConfig, classifier: Arc<dyn Classifier>) -> Self {
        Self::with_context(SessionContext::new_system(), config, classifier)
    }

    pub fn with_context(
        ctx: SessionContext,
        config: SimulationConfig,
        classifier: Arc<dyn Classifier>,
    ) -> Self {
        let session_id = ctx.session_id.clone();
        let generator = match config.seed {
            Some(seed) => TransactionGenerator::with_seed(ctx, seed),
            None => TransactionGenerator::new(ctx),
        }
        .with_fraud_probability(config.fraud_probability);

        Self {
            shared: Arc::new(Shared {
                session_id,
                state: RwLock::new(FeedState::new(config.feed_capacity)),
                generator: Mutex::new(generator),
                classifier,
            }),
            interval: config.interval,
            runner: Mutex::new(None),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.shared.session_id
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn status(&self) -> SimulationStatus {
        match self.runner.lock().as_ref() {
            Some(runner) if !runner.handle.is_finished() => SimulationStatus::Running,
            _ => SimulationStatus::Idle,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status() == SimulationStatus::Running
    }

    /// Idle -> Running. Runs one cycle right away, then one per interval.
    ///
    /// Returns `false` if the simulation was already running. Must be called
    /// from within a Tokio runtime.
    pub fn start(&self) -> bool {
        self.start_locked(&mut self.runner.lock())
    }

    /// Running -> Idle. A classification already in flight still completes,
    /// but its verdict is discarded.
    pub fn stop(&self) -> bool {
        self.stop_locked(&mut self.runner.lock())
    }

    /// Flip between Idle and Running. The check and the transition happen
    /// under one lock, so concurrent toggles alternate.
    pub fn toggle(&self) -> SimulationStatus {
        let mut runner = self.runner.lock();
        let running = matches!(runner.as_ref(), Some(r) if !r.handle.is_finished());
        if running {
            self.stop_locked(&mut runner);
            SimulationStatus::Idle
        } else {
            self.start_locked(&mut runner);
            SimulationStatus::Running
        }
    }

    fn start_locked(&self, runner: &mut Option<Runner>) -> bool {
        if let Some(existing) = runner.as_ref() {
            if !existing.handle.is_finished() {
                debug!(session_id = %self.session_id(), "Simulation already running");
                return false;
            }
            metrics::dec_running();
        }

        let (cancel, rx) = watch::channel(false);
        let handle = tokio::spawn(run_loop(
            self.shared.clone(),
            RunToken { rx },
            self.interval,
        ));
        *runner = Some(Runner { cancel, handle });

        metrics::inc_running();
        info!(
            session_id = %self.session_id(),
            interval_ms = self.interval.as_millis() as u64,
            "▶️ Simulation started"
        );
        true
    }

    fn stop_locked(&self, runner: &mut Option<Runner>) -> bool {
        let Some(runner) = runner.take() else {
            return false;
        };
        runner.cancel();
        metrics::dec_running();
        info!(session_id = %self.session_id(), "⏹️ Simulation stopped");
        true
    }

    /// Disarm the timer and wait for its task to end.
    pub async fn shutdown(&self) {
        let runner = self.runner.lock().take();
        if let Some(runner) = runner {
            runner.cancel();
            runner.handle.abort();
            let _ = runner.handle.await;
            metrics::dec_running();
            info!(session_id = %self.session_id(), "Simulation shut down");
        }
    }

    /// Run a single cycle outside the timer.
    pub async fn step(&self) -> ProcessedTransaction {
        let transaction = { self.shared.generator.lock().generate() };
        self.ingest(transaction).await
    }

    /// Classify a given transaction and publish it to the feed.
    pub async fn ingest(&self, transaction: Transaction) -> ProcessedTransaction {
        let processed = self.shared.process(transaction).await;
        self.shared.publish(processed.clone());
        processed
    }

    pub fn select(&self, transaction_id: &str) -> Option<ProcessedTransaction> {
        self.shared.state.write().select(transaction_id)
    }

    pub fn get(&self, transaction_id: &str) -> Option<ProcessedTransaction> {
        self.shared.state.read().get(transaction_id).cloned()
    }

    pub fn selected(&self) -> Option<ProcessedTransaction> {
        self.shared.state.read().selected().cloned()
    }

    pub fn stats(&self) -> SimulationStats {
        self.shared.state.read().stats()
    }

    pub fn transactions(&self) -> Vec<ProcessedTransaction> {
        self.shared.state.read().entries().cloned().collect()
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        let status = self.status();
        let state = self.shared.state.read();
        FeedSnapshot {
            session_id: self.shared.session_id.clone(),
            status,
            stats: state.stats(),
            transactions: state.entries().cloned().collect(),
            selected: state.selected().cloned(),
        }
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        if let Some(runner) = self.runner.get_mut().take() {
            runner.cancel();
            runner.handle.abort();
            metrics::dec_running();
        }
    }
}
