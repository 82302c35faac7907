//! Synthetic transaction generator.
//!
//! Draws users, merchants and countries from a small fixed catalog and injects
//! one of two fraud patterns into a configurable share of transactions.

use crate::context::SessionContext;
use crate::model::{SpendingRange, Transaction, UserProfile};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

pub const DEFAULT_FRAUD_PROBABILITY: f64 = 0.2;
pub const CURRENCY: &str = "USD";

/// Outlier amounts start at this multiple of the user's maximum spend.
pub const OUTLIER_MULTIPLIER: i64 = 5;
/// Upper bound (exclusive, in cents) of the random surcharge added to outliers.
const OUTLIER_JITTER_CENTS: i64 = 100_000;

pub const MERCHANTS: [&str; 10] = [
    "TechCorp Electronics",
    "Global Coffee Chain",
    "Speedy Online Mart",
    "The Book Nook",
    "Gourmet Burger Bar",
    "Fashion Forward",
    "Digital Stream Co.",
    "City Transit System",
    "Home Improvement Warehouse",
    "Fine Dining Italian",
];

pub const COUNTRIES: [&str; 9] = [
    "USA",
    "Canada",
    "UK",
    "Germany",
    "France",
    "Japan",
    "Australia",
    "Brazil",
    "Nigeria",
];

pub fn user_pool() -> Vec<UserProfile> {
    let user = |id: &str, name: &str, country: &str, min: Decimal, max: Decimal| UserProfile {
        id: id.to_string(),
        name: name.to_string(),
        home_country: country.to_string(),
        typical_spending: SpendingRange::new(min, max),
    };

    vec![
        user("user_1", "Alice", "USA", dec!(10), dec!(200)),
        user("user_2", "Bob", "Canada", dec!(20), dec!(350)),
        user("user_3", "Charlie", "UK", dec!(5), dec!(150)),
        user("user_4", "Diana", "Germany", dec!(50), dec!(500)),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FraudPattern {
    /// Amount far above the user's typical maximum, at home.
    AmountOutlier,
    /// Typical amount, but outside the user's home country.
    ForeignCountry,
}

/// A generated transaction together with the pattern injected into it, if any.
#[derive(Debug, Clone)]
pub struct GeneratedTransaction {
    pub transaction: Transaction,
    pub pattern: Option<FraudPattern>,
}

pub struct TransactionGenerator {
    ctx: SessionContext,
    rng: StdRng,
    users: Vec<UserProfile>,
    fraud_probability: f64,
    counter: u64,
}

impl TransactionGenerator {
    pub fn new(ctx: SessionContext) -> Self {
        Self::with_rng(ctx, StdRng::from_entropy())
    }

    /// Deterministic generator for reproducible runs.
    pub fn with_seed(ctx: SessionContext, seed: u64) -> Self {
        Self::with_rng(ctx, StdRng::seed_from_u64(seed))
    }

    fn with_rng(ctx: SessionContext, rng: StdRng) -> Self {
        Self {
            ctx,
            rng,
            users: user_pool(),
            fraud_probability: DEFAULT_FRAUD_PROBABILITY,
            counter: 0,
        }
    }

    /// Clamped to `[0, 1]`; a non-finite value keeps the default.
    pub fn with_fraud_probability(mut self, probability: f64) -> Self {
        self.fraud_probability = if probability.is_finite() {
            probability.clamp(0.0, 1.0)
        } else {
            DEFAULT_FRAUD_PROBABILITY
        };
        self
    }

    pub fn fraud_probability(&self) -> f64 {
        self.fraud_probability
    }

    /// Number of transactions produced so far.
    pub fn generated_count(&self) -> u64 {
        self.counter
    }

    pub fn users(&self) -> &[UserProfile] {
        &self.users
    }

    pub fn generate(&mut self) -> Transaction {
        self.generate_labeled().transaction
    }

    pub fn generate_labeled(&mut self) -> GeneratedTransaction {
        let user = self.users[self.rng.gen_range(0..self.users.len())].clone();

        let pattern = if self.rng.gen_bool(self.fraud_probability) {
            if self.rng.gen_bool(0.5) {
                Some(FraudPattern::AmountOutlier)
            } else {
                Some(FraudPattern::ForeignCountry)
            }
        } else {
            None
        };

        let (amount, country) = match pattern {
            Some(FraudPattern::AmountOutlier) => {
                (self.outlier_amount(&user.typical_spending), user.home_country.clone())
            }
            Some(FraudPattern::ForeignCountry) => (
                self.typical_amount(&user.typical_spending),
                self.foreign_country(&user.home_country),
            ),
            None => (
                self.typical_amount(&user.typical_spending),
                user.home_country.clone(),
            ),
        };

        let merchant = MERCHANTS[self.rng.gen_range(0..MERCHANTS.len())].to_string();
        let transaction = self.build(user, amount, merchant, country);

        GeneratedTransaction {
            transaction,
            pattern,
        }
    }

    fn build(
        &mut self,
        user: UserProfile,
        amount: Decimal,
        merchant: String,
        country: String,
    ) -> Transaction {
        self.counter += 1;
        let now = self.ctx.time.now();

        Transaction {
            transaction_id: format!("txn_{}_{}", now.timestamp_millis(), self.counter),
            timestamp: now,
            amount,
            currency: CURRENCY.to_string(),
            merchant,
            country,
            user,
        }
    }

    fn typical_amount(&mut self, range: &SpendingRange) -> Decimal {
        let (min, max) = range.bounds_in_cents();
        Decimal::new(self.rng.gen_range(min..=max), 2)
    }

    fn outlier_amount(&mut self, range: &SpendingRange) -> Decimal {
        let (_, max) = range.bounds_in_cents();
        let base = max * OUTLIER_MULTIPLIER;
        Decimal::new(base + self.rng.gen_range(0..OUTLIER_JITTER_CENTS), 2)
    }

    fn foreign_country(&mut self, home: &str) -> String {
        let candidates: Vec<&str> = COUNTRIES.iter().copied().filter(|c| *c != home).collect();
        candidates[self.rng.gen_range(0..candidates.len())].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SimulatedTimeProvider;
    use std::sync::Arc;

    fn seeded(seed: u64) -> TransactionGenerator {
        TransactionGenerator::with_seed(SessionContext::new_simulated(1_700_000_000_000), seed)
    }

    #[test]
    fn test_ids_carry_monotonic_counter() {
        let mut generator = seeded(1);
        let first = generator.generate();
        let second = generator.generate();

        assert_eq!(first.transaction_id, "txn_1700000000000_1");
        assert_eq!(second.transaction_id, "txn_1700000000000_2");
        assert_eq!(generator.generated_count(), 2);
    }

    #[test]
    fn test_ids_and_timestamps_follow_session_clock() {
        let clock = Arc::new(SimulatedTimeProvider::new(1_700_000_000_000));
        let mut generator =
            TransactionGenerator::with_seed(SessionContext::with_clock("clocked", clock.clone()), 3);

        let first = generator.generate();
        clock.advance(3_000);
        let second = generator.generate();

        assert_eq!(first.transaction_id, "txn_1700000000000_1");
        assert_eq!(second.transaction_id, "txn_1700000003000_2");
        assert_eq!(second.timestamp.timestamp_millis(), 1_700_000_003_000);
    }

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = seeded(42);
        let mut b = seeded(42);
        for _ in 0..20 {
            assert_eq!(a.generate(), b.generate());
        }
    }

    #[test]
    fn test_zero_probability_never_injects_fraud() {
        let mut generator = seeded(7).with_fraud_probability(0.0);
        for _ in 0..200 {
            let generated = generator.generate_labeled();
            assert!(generated.pattern.is_none());
            assert!(!generated.transaction.is_foreign());
        }
    }

    #[test]
    fn test_certain_fraud_uses_both_patterns() {
        let mut generator = seeded(11).with_fraud_probability(1.0);
        let patterns: Vec<_> = (0..200)
            .filter_map(|_| generator.generate_labeled().pattern)
            .collect();

        assert_eq!(patterns.len(), 200);
        assert!(patterns.contains(&FraudPattern::AmountOutlier));
        assert!(patterns.contains(&FraudPattern::ForeignCountry));
    }

    #[test]
    fn test_probability_is_clamped() {
        let generator = seeded(1).with_fraud_probability(3.0);
        assert_eq!(generator.fraud_probability(), 1.0);
    }

    #[test]
    fn test_non_finite_probability_keeps_default() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let mut generator = seeded(2).with_fraud_probability(bad);
            assert_eq!(generator.fraud_probability(), DEFAULT_FRAUD_PROBABILITY);
            generator.generate();
        }
    }

    #[test]
    fn test_transactions_are_usd() {
        let mut generator = seeded(3);
        assert_eq!(generator.generate().currency, "USD");
    }
}
