use crate::metrics;
use crate::model::{FraudAnalysisResult, Transaction};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;
use thiserror::Error;
use tracing::warn;

/// Score attached to every fallback verdict.
pub const FALLBACK_FRAUD_SCORE: f64 = 80.0;

pub const CONNECTION_FAILURE_REASON: &str = "Could not connect to the analysis server. Is it running? Flagging as potential fraud for manual review.";

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Network response was not ok (status: {status})")]
    Status { status: u16, reason: Option<String> },
    #[error("Invalid response format: {0}")]
    Malformed(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Connection refused, timeout, or any other transport failure.
    Transport,
    /// The service answered with a non-success status.
    UpstreamStatus,
    /// The body was not a well-formed verdict.
    MalformedResponse,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Transport => "transport",
            FailureKind::UpstreamStatus => "upstream_status",
            FailureKind::MalformedResponse => "malformed_response",
        }
    }
}

impl ClassifierError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ClassifierError::Network(_) | ClassifierError::Configuration(_) => {
                FailureKind::Transport
            }
            ClassifierError::Status { .. } => FailureKind::UpstreamStatus,
            ClassifierError::Malformed(_) => FailureKind::MalformedResponse,
        }
    }

    /// Reason text carried by the fallback verdict for this failure.
    pub fn fallback_reason(&self) -> String {
        match self {
            ClassifierError::Network(e) | ClassifierError::Configuration(e) => {
                format!("{} ({})", CONNECTION_FAILURE_REASON, e)
            }
            ClassifierError::Status {
                reason: Some(reason),
                ..
            } if !reason.trim().is_empty() => reason.clone(),
            ClassifierError::Status { .. } => self.to_string(),
            ClassifierError::Malformed(e) => {
                format!("Invalid response format from the analysis server: {}", e)
            }
        }
    }
}

/// Outcome of a classification: the service's own verdict, or the
/// conservative fallback substituted when no verdict could be obtained.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Verdict {
    Analyzed(FraudAnalysisResult),
    Fallback {
        kind: FailureKind,
        result: FraudAnalysisResult,
    },
}

impl Verdict {
    pub fn fallback(error: &ClassifierError) -> Self {
        Verdict::Fallback {
            kind: error.kind(),
            result: fallback_result(error.fallback_reason()),
        }
    }

    pub fn result(&self) -> &FraudAnalysisResult {
        match self {
            Verdict::Analyzed(result) => result,
            Verdict::Fallback { result, .. } => result,
        }
    }

    pub fn into_result(self) -> FraudAnalysisResult {
        match self {
            Verdict::Analyzed(result) => result,
            Verdict::Fallback { result, .. } => result,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Verdict::Fallback { .. })
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Verdict::Analyzed(_) => None,
            Verdict::Fallback { kind, .. } => Some(*kind),
        }
    }
}

pub fn fallback_result(reason: impl Into<String>) -> FraudAnalysisResult {
    FraudAnalysisResult {
        is_fraud: true,
        reason: reason.into(),
        fraud_score: FALLBACK_FRAUD_SCORE,
    }
}

/// Parse and type-check a verdict document.
///
/// All three fields must be present with the right JSON types; extra fields
/// are ignored.
pub fn parse_verdict(body: &str) -> Result<FraudAnalysisResult, ClassifierError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| ClassifierError::Malformed(format!("parse error: {}", e)))?;
    verdict_from_value(&value)
}

pub fn verdict_from_value(value: &Value) -> Result<FraudAnalysisResult, ClassifierError> {
    let object = value
        .as_object()
        .ok_or_else(|| ClassifierError::Malformed("expected a JSON object".to_string()))?;

    let is_fraud = object
        .get("isFraud")
        .and_then(Value::as_bool)
        .ok_or_else(|| ClassifierError::Malformed("isFraud must be a boolean".to_string()))?;
    let reason = object
        .get("reason")
        .and_then(Value::as_str)
        .ok_or_else(|| ClassifierError::Malformed("reason must be a string".to_string()))?;
    let fraud_score = object
        .get("fraudScore")
        .and_then(Value::as_f64)
        .ok_or_else(|| ClassifierError::Malformed("fraudScore must be a number".to_string()))?;

    Ok(FraudAnalysisResult {
        is_fraud,
        reason: reason.to_string(),
        fraud_score,
    })
}

#[async_trait]
pub trait Classifier: Send + Sync {
    /// Request a verdict, surfacing every failure.
    async fn analyze(&self, transaction: &Transaction) -> Result<FraudAnalysisResult, ClassifierError>;

    /// Request a verdict; failures resolve to the fallback verdict and are never returned.
    async fn classify(&self, transaction: &Transaction) -> Verdict {
        let started = Instant::now();
        let outcome = self.analyze(transaction).await;
        metrics::observe_classification_latency(started.elapsed().as_secs_f64());

        match outcome {
            Ok(result) => Verdict::Analyzed(result),
            Err(e) => {
                let verdict = Verdict::fallback(&e);
                metrics::inc_classifier_fallbacks(e.kind().as_str());
                warn!(
                    classifier = self.name(),
                    transaction_id = %transaction.transaction_id,
                    kind = e.kind().as_str(),
                    error = %e,
                    "Classification failed, using fallback verdict"
                );
                verdict
            }
        }
    }

    fn name(&self) -> &str;
}
