//! OpenAI-compatible chat completions backend for the semantic classifier

use crate::classifier::{
    ClassifierRequest, ClassifierResponse, ConfirmedCandidate, Discovery, SemanticClassifier,
};
use crate::config::ClassifierSettings;
use async_trait::async_trait;
use piiscrub_core::{Candidate, Error, Result};
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Last-resort scanner for `"type": "...", "text": "..."` pairs in a malformed reply
static LABELED_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""type"\s*:\s*"([^"]+)"\s*,\s*"text"\s*:\s*"([^"]+)""#)
        .expect("valid labeled pair regex")
});

/// Chat completions client that validates candidates and discovers contextual PII
pub struct OpenAiClassifier {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    temperature: f32,
    api_key: SecretString,
}

impl OpenAiClassifier {
    pub fn new(settings: &ClassifierSettings, api_key: SecretString) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| Error::classifier(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            api_key,
        })
    }

    /// Build a classifier from settings, reading the key from the configured variable.
    ///
    /// Returns `Ok(None)` when the classifier is disabled or no key is set.
    pub fn from_settings(settings: &ClassifierSettings) -> Result<Option<Self>> {
        if !settings.enabled {
            info!("Semantic classifier disabled by configuration");
            return Ok(None);
        }
        match std::env::var(&settings.api_key_env) {
            Ok(key) if !key.trim().is_empty() => {
                let classifier = Self::new(settings, SecretString::new(key))?;
                info!(model = %settings.model, endpoint = %settings.endpoint, "Semantic classifier configured");
                Ok(Some(classifier))
            }
            _ => {
                warn!(
                    env = %settings.api_key_env,
                    "No API key found, semantic classifier unavailable"
                );
                Ok(None)
            }
        }
    }

    fn build_prompt(request: &ClassifierRequest) -> Result<String> {
        let candidates: Vec<PromptCandidate<'_>> =
            request.candidates.iter().map(PromptCandidate::from).collect();
        let candidates_json = serde_json::to_string_pretty(&candidates)?;
        let language = request.language.as_deref().unwrap_or("unknown");

        Ok(format!(
            r#"You are a multilingual privacy assistant. The document is in language {language}.
Given one page of document text and a list of candidate PII items found by pattern matching, your task is to:

1. Validate each candidate by id and decide whether it is truly personally identifiable information of a specific individual.
2. Identify ALL additional PII the pattern matching missed.

DIRECT PII: full names, first or last names, nicknames or initials identifying a person; email addresses, phone and fax numbers; physical addresses of individuals, including partial addresses and postal codes; national ID, social security, passport, driver's license and personal tax numbers; dates of birth; credit card and personal bank account details; usernames, social media handles and personal URLs.

INDIRECT PII: booking or reservation codes, order numbers and customer IDs tied to an individual; invoice or transaction references connected to a person; patient, student, employee or membership numbers; IP addresses, device identifiers and cookies; vehicle license plates; travel itinerary details such as flight numbers with dates.

Focus ONLY on information about individual persons. Do not report organisation names or generic business contact details unless they identify a specific individual.

Answer with a single JSON object and nothing else:
{{"confirmed": [{{"id": <candidate id>, "type": "<precise type>"}}], "rejected": [<candidate id>], "discovered": [{{"type": "<precise type>", "text": "<exact text as it appears on the page>", "approx_location": "<where on the page>"}}]}}

Page text:
{text}

Candidates:
{candidates_json}
"#,
            language = language,
            text = request.page_text,
            candidates_json = candidates_json,
        ))
    }
}

#[async_trait]
impl SemanticClassifier for OpenAiClassifier {
    async fn classify(&self, request: &ClassifierRequest) -> Result<ClassifierResponse> {
        let start = Instant::now();
        let prompt = Self::build_prompt(request)?;

        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt.trim(),
            }],
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::classifier(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::classifier(format!("Classifier returned {}", status)));
        }

        let completion: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::classifier(format!("Malformed completion: {}", e)))?;
        let reply = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| Error::classifier("Completion has no choices"))?;

        let parsed = parse_classifier_reply(&reply, &request.candidates)?;
        debug!(
            page = request.page,
            confirmed = parsed.confirmed.len(),
            rejected = parsed.rejected.len(),
            discovered = parsed.discovered.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Classifier reply parsed"
        );
        Ok(parsed)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct PromptCandidate<'a> {
    id: usize,
    #[serde(rename = "type")]
    pii_type: &'a str,
    text: &'a str,
    valid: bool,
}

impl<'a> From<&'a Candidate> for PromptCandidate<'a> {
    fn from(candidate: &'a Candidate) -> Self {
        Self {
            id: candidate.id,
            pii_type: candidate.pii_type.as_str(),
            text: &candidate.text,
            valid: candidate.valid,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct LabeledText {
    #[serde(rename = "type")]
    pii_type: String,
    text: String,
}

/// Parse a free-text classifier reply.
///
/// Accepts the structured object, a bare JSON list of `{type, text}` items,
/// or (as a last resort) any `"type": "...", "text": "..."` pairs found in the
/// reply. List items whose text equals a candidate's text confirm that
/// candidate; the rest become discoveries.
pub fn parse_classifier_reply(reply: &str, candidates: &[Candidate]) -> Result<ClassifierResponse> {
    let cleaned = strip_code_fences(reply);

    if let Ok(response) = serde_json::from_str::<ClassifierResponse>(&cleaned) {
        return Ok(response);
    }
    if let Ok(items) = serde_json::from_str::<Vec<LabeledText>>(&cleaned) {
        return Ok(from_labeled(items, candidates));
    }

    warn!("Classifier reply is not valid JSON, scanning for type/text pairs");
    let items: Vec<LabeledText> = LABELED_PAIR
        .captures_iter(&cleaned)
        .map(|caps| LabeledText {
            pii_type: caps[1].to_string(),
            text: caps[2].to_string(),
        })
        .collect();

    if items.is_empty() {
        return Err(Error::classifier("Unparseable classifier reply"));
    }
    Ok(from_labeled(items, candidates))
}

fn strip_code_fences(reply: &str) -> String {
    reply
        .trim()
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn from_labeled(items: Vec<LabeledText>, candidates: &[Candidate]) -> ClassifierResponse {
    let mut response = ClassifierResponse::default();
    for item in items {
        let text = item.text.trim();
        match candidates.iter().find(|c| c.text == text) {
            Some(candidate) => {
                if !response.confirmed.iter().any(|c| c.id == candidate.id) {
                    response
                        .confirmed
                        .push(ConfirmedCandidate::with_type(candidate.id, item.pii_type));
                }
            }
            None => response.discovered.push(Discovery::new(item.pii_type, text)),
        }
    }
    response
}
