//! LLM API interaction with exponential backoff retry logic.
//!
//! This module provides the interface to an OpenAI-compatible chat
//! completions endpoint, used for summarization, region classification, and
//! insight generation.
//!
//! # Architecture
//!
//! - [`AskAsync`]: core trait defining async LLM interaction
//! - [`ChatClient`]: `reqwest`-backed implementation against
//!   `{base_url}/chat/completions`
//! - [`RetryAsk`]: decorator that adds retry logic to any `AskAsync`
//!   implementation
//!
//! # Retry Strategy
//!
//! - Exponential backoff starting at 1 second, capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd
//! - Attempt count comes from `llm.max_retries` in configuration

use crate::config::LlmConfig;
use crate::utils::truncate_for_log;
use once_cell::sync::Lazy;
use rand::{Rng, rng};
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use std::error::Error;
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

/// Trait for async LLM interaction.
///
/// Implementors send a prompt to a model and receive a text response. The
/// abstraction exists so retry decorators and test doubles can stand in for
/// the real endpoint.
pub trait AskAsync {
    /// Send a prompt to the model and receive its text response.
    async fn ask(&self, prompt: &str) -> Result<String, Box<dyn Error>>;
}

/// Wrapper that adds exponential backoff retry logic to any [`AskAsync`]
/// implementation.
///
/// # Backoff Strategy
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryAsk<T> {
    inner: T,
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T> RetryAsk<T>
where
    T: AskAsync,
{
    /// Create a new retry wrapper around an existing [`AskAsync`]
    /// implementation.
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync,
{
    #[instrument(level = "debug", skip_all)]
    async fn ask(&self, prompt: &str) -> Result<String, Box<dyn Error>> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.ask(prompt).await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "ask() exhausted retries"
                        );
                        return Err(e);
                    }

                    let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "ask() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

/// `reqwest`-backed client for an OpenAI-compatible chat completions API.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    max_retries: usize,
}

impl ChatClient {
    /// Build a client from configuration, reading the API key from the
    /// environment variable named by `llm.api_key_env`.
    ///
    /// # Errors
    ///
    /// Fails when the API key variable is unset or the HTTP client cannot
    /// be constructed.
    pub fn from_config(config: &LlmConfig) -> Result<Self, Box<dyn Error>> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            format!(
                "Missing required environment variable: {}",
                config.api_key_env
            )
        })?;

        let http = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(30))
            .build()?;

        Ok(ChatClient {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            max_retries: config.max_retries,
        })
    }

    /// Attempt count used when wrapping this client in [`RetryAsk`].
    pub fn max_retries(&self) -> usize {
        self.max_retries
    }
}

impl AskAsync for ChatClient {
    #[instrument(level = "debug", skip_all, fields(model = %self.model))]
    async fn ask(&self, prompt: &str) -> Result<String, Box<dyn Error>> {
        let clean = sanitize_prompt(prompt);
        debug!(prompt_chars = clean.chars().count(), "Calling chat completions");

        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": clean}],
        });

        let t0 = Instant::now();
        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let dt = t0.elapsed();

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            warn!(
                %status,
                elapsed_ms = dt.as_millis() as u64,
                body_preview = %truncate_for_log(&text, 200),
                "API call failed"
            );
            return Err(format!("chat completions returned {status}").into());
        }

        let parsed: ChatResponse = resp.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or("chat completions response had no choices")?;

        Ok(content)
    }
}

static HTML_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Sanitize a prompt before sending: strip HTML tags and drop control
/// characters other than newline and tab.
pub fn sanitize_prompt(prompt: &str) -> String {
    let without_tags = HTML_TAG_RE.replace_all(prompt, "");
    without_tags
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Unwrap a markdown code fence around a model response, if present.
///
/// Models frequently wrap JSON in ```` ```json ... ``` ```` despite being
/// asked not to.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = match rest.get(..4) {
        // tag case varies by model ("json", "JSON", "Json")
        Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
        _ => rest,
    };
    // anything after the closing fence is commentary, not payload
    match rest.find("```") {
        Some(end) => rest[..end].trim(),
        None => rest.trim(),
    }
}

/// Parse a structured model response, tolerating a markdown code fence.
pub fn parse_structured<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(strip_code_fence(raw))
}
