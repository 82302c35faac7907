use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use uuid::Uuid;

/// Trait for providing the current time.
/// Decouples generation from `Utc::now()` so runs can be replayed deterministically.
pub trait TimeProvider: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Per-session context handed to the generator and the simulation.
#[derive(Clone)]
pub struct SessionContext {
    pub session_id: String,
    pub time: Arc<dyn TimeProvider>,
}

impl SessionContext {
    pub fn new_system() -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            time: Arc::new(SystemTimeProvider),
        }
    }

    pub fn new_simulated(start_time_ms: i64) -> Self {
        Self::with_clock(
            format!("sim-{}", start_time_ms),
            Arc::new(SimulatedTimeProvider::new(start_time_ms)),
        )
    }

    /// Session driven by a caller-owned clock, e.g. a shared `SimulatedTimeProvider`.
    pub fn with_clock(session_id: impl Into<String>, time: Arc<dyn TimeProvider>) -> Self {
        Self {
            session_id: session_id.into(),
            time,
        }
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("session_id", &self.session_id)
            .finish()
    }
}

pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub struct SimulatedTimeProvider {
    current_time_ms: AtomicI64,
}

impl SimulatedTimeProvider {
    pub fn new(start_time_ms: i64) -> Self {
        Self {
            current_time_ms: AtomicI64::new(start_time_ms),
        }
    }

    pub fn advance(&self, duration_ms: i64) {
        self.current_time_ms.fetch_add(duration_ms, Ordering::SeqCst);
    }
}

impl TimeProvider for SimulatedTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.current_time_ms.load(Ordering::SeqCst))
            .single()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_clock_advances() {
        let clock = Arc::new(SimulatedTimeProvider::new(1_700_000_000_000));
        let ctx = SessionContext::with_clock("replay", clock.clone());

        clock.advance(3_000);
        assert_eq!(ctx.time.now().timestamp_millis(), 1_700_000_003_000);
        assert_eq!(ctx.session_id, "replay");
    }

    #[test]
    fn test_system_sessions_are_distinct() {
        let a = SessionContext::new_system();
        let b = SessionContext::new_system();
        assert_ne!(a.session_id, b.session_id);
    }
}
