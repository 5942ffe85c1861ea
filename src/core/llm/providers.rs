use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use crate::error::{SpecsworthError, Result};
use crate::config::LlmConfig;
use super::super::rest::BusinessSemantic;
use super::documenter::{EndpointContext, ErrorCodeContext, ErrorInsight, NoOpEnhancer, SpecEnhancer};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Longest handler body sent in an error-code prompt
const HANDLER_SNIPPET_CHARS: usize = 800;

const ENDPOINT_SYSTEM_PROMPT: &str = "You are a REST API documentation expert. From the Java endpoint context provided, \
produce a structured business description. Reply with a single JSON object with exactly these string fields \
(any may be empty): \"function\" (one sentence on what the endpoint does), \"scenario\" (typical business scenario), \
\"implementationNotes\" (key logic, validation rules, services involved), \"cautions\" (what callers must watch out for). \
Output nothing but the JSON.";

const ERROR_CODE_SYSTEM_PROMPT: &str = "You are a REST API error-handling expert. From the error code and code context \
provided, explain it. Reply with a single JSON object with exactly these string fields (any may be empty): \
\"rootCause\" (typical business-level cause), \"handlingSuggestion\" (how an API caller should react: retry, fix \
parameters, contact support), \"prevention\" (how to avoid triggering it). Output nothing but the JSON.";

/// Factory function to create the enhancer the configuration asks for.
///
/// Disabled enhancement, or enhancement without an API key, yields the no-op enhancer.
pub fn create_enhancer(config: &LlmConfig) -> Result<Box<dyn SpecEnhancer>> {
    let has_key = config.api_key.as_deref().map(|k| !k.trim().is_empty()).unwrap_or(false);
    if !config.enabled || !has_key {
        return Ok(Box::new(NoOpEnhancer));
    }

    match config.provider.as_str() {
        "openai" => Ok(Box::new(OpenAiEnhancer::new(config)?)),
        _ => Err(SpecsworthError::Config(
            format!("Unsupported LLM provider: {}", config.provider)
        )),
    }
}

/// Enhancer backed by an OpenAI-compatible chat-completions API
pub struct OpenAiEnhancer {
    config: LlmConfig,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiEnhancer {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config.api_key.clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| SpecsworthError::Config("API key required for the openai provider".to_string()))?;

        Ok(Self {
            config: config.clone(),
            api_key,
            client: reqwest::Client::new(),
        })
    }

    fn endpoint_url(&self) -> String {
        let base = self.config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        format!("{}/chat/completions", base.trim_end_matches('/'))
    }

    async fn chat(&self, system: &str, prompt: &str) -> Result<String> {
        let payload = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": prompt }
            ],
            "max_tokens": self.config.max_tokens.unwrap_or(1024),
            "temperature": self.config.temperature.unwrap_or(0.3)
        });

        let response = self.client
            .post(self.endpoint_url())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SpecsworthError::Llm(
                format!("API error {}: {}", status, error_text)
            ));
        }

        let response_data: serde_json::Value = response.json().await?;

        if let Some(usage) = response_data.get("usage") {
            debug!("LLM tokens used: {}", usage["total_tokens"]);
        }

        response_data["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| SpecsworthError::Llm("Response has no message content".to_string()))
    }
}

#[async_trait]
impl SpecEnhancer for OpenAiEnhancer {
    async fn enhance_endpoint(&self, context: &EndpointContext) -> Result<Option<BusinessSemantic>> {
        let reply = self.chat(ENDPOINT_SYSTEM_PROMPT, &build_endpoint_prompt(context)).await?;
        parse_reply(&reply)
    }

    async fn enhance_error_code(&self, context: &ErrorCodeContext) -> Result<Option<ErrorInsight>> {
        let reply = self.chat(ERROR_CODE_SYSTEM_PROMPT, &build_error_code_prompt(context)).await?;
        parse_reply(&reply)
    }

    fn is_enabled(&self) -> bool {
        true
    }

    fn provider_name(&self) -> &str {
        "OpenAI-compatible"
    }
}

fn build_endpoint_prompt(context: &EndpointContext) -> String {
    let mut prompt = String::new();

    prompt.push_str("Endpoint:\n");
    prompt.push_str(&format!("- URI: {} {}\n", context.http_method, context.uri));
    prompt.push_str(&format!("- Method: {}\n", context.method_name));

    if let Some(javadoc) = context.javadoc.as_deref().filter(|j| !j.trim().is_empty()) {
        prompt.push_str(&format!("- Javadoc: {}\n", javadoc));
    }
    if !context.parameter_types.is_empty() {
        prompt.push_str(&format!("- Parameter types: {}\n", context.parameter_types.join(", ")));
    }
    prompt.push_str(&format!("- Return type: {}\n", context.return_type));

    if !context.body_snippet.trim().is_empty() {
        prompt.push_str(&format!("- Method body:\n```\n{}\n```\n", context.body_snippet));
    }
    if !context.called_method_names.is_empty() {
        prompt.push_str(&format!("- Called methods: {}\n", context.called_method_names.join(", ")));
    }
    if let Some(chain) = context.call_chain_snippet.as_deref() {
        prompt.push_str(&format!("- Call chain:\n```\n{}\n```\n", chain));
    }

    prompt.push_str("\nReply with the JSON business description.");
    prompt
}

fn build_error_code_prompt(context: &ErrorCodeContext) -> String {
    let mut prompt = String::new();

    prompt.push_str("Error code:\n");
    prompt.push_str(&format!("- code: {}\n", context.code));
    prompt.push_str(&format!("- message: {}\n", context.message));
    prompt.push_str(&format!("- HTTP status: {}\n", context.http_status));
    prompt.push_str(&format!("- Exception type: {}\n", context.exception_type));

    if !context.handler_body_snippet.trim().is_empty() {
        let snippet: String = context.handler_body_snippet.chars().take(HANDLER_SNIPPET_CHARS).collect();
        prompt.push_str(&format!("- Handler logic:\n```\n{}\n```\n", snippet));
    }

    prompt.push_str("\nReply with the JSON explanation.");
    prompt
}

/// Parse the JSON object embedded in a model reply. A reply without a usable
/// object yields `None`, not an error.
fn parse_reply<T: DeserializeOwned>(reply: &str) -> Result<Option<T>> {
    let text = reply.trim();
    let json = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => &text[start..=end],
        _ => return Ok(None),
    };

    match serde_json::from_str(json) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            debug!("Discarding unparseable LLM reply: {}", e);
            Ok(None)
        }
    }
}
