use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Inclusive spending band for a user, in whole currency units.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SpendingRange {
    pub min: Decimal,
    pub max: Decimal,
}

impl SpendingRange {
    pub fn new(min: Decimal, max: Decimal) -> Self {
        debug_assert!(min >= Decimal::ZERO && min <= max, "invalid spending range");
        Self { min, max }
    }

    pub fn contains(&self, amount: Decimal) -> bool {
        amount >= self.min && amount <= self.max
    }

    /// Bounds expressed in cents (scale 2 mantissas).
    pub fn bounds_in_cents(&self) -> (i64, i64) {
        (to_cents(self.min), to_cents(self.max))
    }
}

fn to_cents(value: Decimal) -> i64 {
    let mut scaled = value.round_dp(2);
    scaled.rescale(2);
    scaled.mantissa() as i64
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub home_country: String,
    pub typical_spending: SpendingRange,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub transaction_id: String,
    pub timestamp: DateTime<Utc>,
    pub amount: Decimal,
    pub currency: String,
    pub merchant: String,
    pub country: String,
    pub user: UserProfile,
}

impl Transaction {
    pub fn is_foreign(&self) -> bool {
        self.country != self.user.home_country
    }
}

/// Verdict payload returned by the classification service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FraudAnalysisResult {
    pub is_fraud: bool,
    pub reason: String,
    // Nominally 0-100; upstream does not enforce it.
    pub fraud_score: f64,
}

/// A transaction together with the verdict computed for it.
///
/// Serialized flat, with the transaction fields next to an `analysis` object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessedTransaction {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub analysis: FraudAnalysisResult,
}

impl ProcessedTransaction {
    pub fn new(transaction: Transaction, analysis: FraudAnalysisResult) -> Self {
        Self {
            transaction,
            analysis,
        }
    }

    pub fn id(&self) -> &str {
        &self.transaction.transaction_id
    }

    pub fn is_fraud(&self) -> bool {
        self.analysis.is_fraud
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SimulationStats {
    pub total: u64,
    pub fraud: u64,
}

impl SimulationStats {
    pub fn record(&mut self, is_fraud: bool) {
        self.total += 1;
        if is_fraud {
            self.fraud += 1;
        }
    }
}
