use crate::classifier::adapter::{Classifier, ClassifierError, parse_verdict};
use crate::config::ClassifierConfig;
use crate::model::{FraudAnalysisResult, Transaction};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

/// Gateway to a classification service speaking the verdict contract:
/// `POST` a transaction document, receive `{isFraud, reason, fraudScore}`.
pub struct HttpClassifier {
    endpoint: Url,
    client: Client,
}

impl HttpClassifier {
    pub fn new(config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        let raw = config.endpoint();
        let endpoint = Url::parse(&raw).map_err(|e| {
            ClassifierError::Configuration(format!("invalid classifier endpoint {}: {}", raw, e))
        })?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ClassifierError::Configuration(e.to_string()))?;

        Ok(Self { endpoint, client })
    }

    pub fn with_endpoint(endpoint: &str) -> Result<Self, ClassifierError> {
        Self::new(&ClassifierConfig {
            endpoint: Some(endpoint.to_string()),
            timeout_ms: None,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

/// Pull the `reason` string out of an error body, if the service sent one.
fn error_reason(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("reason").and_then(|r| r.as_str()).map(str::to_string))
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn analyze(&self, transaction: &Transaction) -> Result<FraudAnalysisResult, ClassifierError> {
        let resp = self
            .client
            .post(self.endpoint.clone())
            .json(transaction)
            .send()
            .await
            .map_err(|e| ClassifierError::Network(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ClassifierError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(ClassifierError::Status {
                status: status.as_u16(),
                reason: error_reason(&text),
            });
        }

        let result = parse_verdict(&text)?;
        debug!(
            transaction_id = %transaction.transaction_id,
            is_fraud = result.is_fraud,
            fraud_score = result.fraud_score,
            "Verdict received"
        );
        Ok(result)
    }

    fn name(&self) -> &str {
        "http"
    }
}
