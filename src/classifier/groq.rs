//! Upstream LLM analyzer behind the classification proxy.
//!
//! Talks to an OpenAI-compatible chat-completions API (Groq by default) and
//! asks the model for a JSON verdict.

use crate::classifier::adapter::{Classifier, ClassifierError, parse_verdict};
use crate::config::GroqConfig;
use crate::model::{FraudAnalysisResult, Transaction};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

pub struct GroqAnalyzer {
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    client: Client,
}

impl GroqAnalyzer {
    pub fn new(config: &GroqConfig) -> Result<Self, ClassifierError> {
        let api_key = config.get_api_key().ok_or_else(|| {
            ClassifierError::Configuration(
                "GROQ_API_KEY not set (check config or env)".to_string(),
            )
        })?;

        Ok(Self {
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client: Client::new(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Analyze an arbitrary transaction-shaped document.
    pub async fn analyze_document(
        &self,
        document: &serde_json::Value,
    ) -> Result<FraudAnalysisResult, ClassifierError> {
        let request = ChatCompletionRequest {
            messages: vec![ChatMessage {
                role: "user",
                content: build_prompt(document)?,
            }],
            model: &self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        let url = format!("{}/chat/completions", self.base_url);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ClassifierError::Network(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ClassifierError::Network(e.to_string()))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), body = %text, "Chat completion request failed");
            return Err(ClassifierError::Status {
                status: status.as_u16(),
                reason: None,
            });
        }

        let completion: ChatCompletionResponse = serde_json::from_str(&text)
            .map_err(|e| ClassifierError::Malformed(format!("completion parse error: {}", e)))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_else(|| "{}".to_string());

        debug!(model = %self.model, "Completion received");
        parse_verdict(&content)
    }
}

pub fn build_prompt(document: &serde_json::Value) -> Result<String, ClassifierError> {
    let transaction = serde_json::to_string_pretty(document)
        .map_err(|e| ClassifierError::Malformed(e.to_string()))?;

    Ok(format!(
        r#"You are a highly advanced AI fraud detection engine for a bank.
Your task is to analyze bank transactions and determine if they are fraudulent.

Consider these fraud indicators:
1. High Amount: Is the transaction amount significantly higher than the user's typical spending range?
2. Unusual Location: Is the transaction occurring in a country different from the user's home country?
3. Rapid Transactions: (Context not provided in single transaction, but be aware of this pattern)
4. Merchant Type: Is the merchant unusual for this user? (Context not provided)

Analyze this transaction: {transaction}

Respond with ONLY a valid JSON object containing exactly these fields:
{{
  "isFraud": boolean,        // true if fraudulent, false if legitimate
  "reason": string,         // detailed explanation for the assessment
  "fraudScore": number      // 0-100 score, higher means more likely fraud
}}"#
    ))
}

#[async_trait]
impl Classifier for GroqAnalyzer {
    async fn analyze(&self, transaction: &Transaction) -> Result<FraudAnalysisResult, ClassifierError> {
        let document = serde_json::to_value(transaction)
            .map_err(|e| ClassifierError::Malformed(e.to_string()))?;
        self.analyze_document(&document).await
    }

    fn name(&self) -> &str {
        "groq"
    }
}
