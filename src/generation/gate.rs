//! The generation gate itself: one external HTTP call, wrapped in quota
//! enforcement, input/output clamping, and a closed fail-soft taxonomy.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use thiserror::Error;

use super::config::GenerationConfig;
use super::usage::{UsageLog, UsageRecord};
use super::Intensity;
use crate::events::Event;
use crate::persona::resolve_tone;
use crate::world::drift::day_gap_utc;

/// Fixed system instruction sent with every generation request.
const SYSTEM_INSTRUCTION: &str = "Reply with one friendly sentence of at most eighteen words, \
plain text only, no markup, no emoji, no safety disclaimers.";

/// Closed failure taxonomy. `Display` yields the machine reason code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateFailure {
    /// Generation is globally disabled.
    #[error("llm_disabled")]
    Disabled,

    /// No API key configured.
    #[error("missing_api_key")]
    MissingApiKey,

    /// Non-success HTTP response.
    #[error("http_{status}")]
    Http { status: u16 },

    /// Response body was not valid JSON.
    #[error("invalid_json_payload")]
    InvalidJsonPayload,

    /// No known response shape yielded text.
    #[error("parse_no_text")]
    ParseNoText { shape: String },

    /// Extracted text was empty once normalized and clamped.
    #[error("empty_after_cleanup")]
    EmptyAfterCleanup,

    /// Request could not be sent or the response body could not be read.
    #[error("network_error")]
    NetworkError,
}

impl GenerateFailure {
    /// Machine reason code from the closed set.
    pub fn reason(&self) -> String {
        self.to_string()
    }

    /// Short shape-describing diagnostic, where one exists. Never raw
    /// content — user text must not leak into logs.
    pub fn detail(&self) -> Option<&str> {
        match self {
            GenerateFailure::ParseNoText { shape } => Some(shape),
            _ => None,
        }
    }
}

/// Structured outcome of a generation attempt, for debugging and tests.
#[derive(Debug, Clone)]
pub struct GenerateDebug {
    /// Cleaned reaction text, when the attempt succeeded.
    pub text: Option<String>,

    /// `"ok"`, `"ok_peak_budget_downgraded"`, or a failure reason code.
    pub reason: String,

    /// Optional diagnostic (payload shape, effective intensity).
    pub detail: Option<String>,
}

/// Budget-gated wrapper around the external text-generation service.
pub struct GenerationGate {
    config: GenerationConfig,
    client: reqwest::Client,
    usage: Arc<dyn UsageLog>,
}

impl GenerationGate {
    pub fn new(config: GenerationConfig, usage: Arc<dyn UsageLog>) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            usage,
        }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Attempt a generation. Never fails: any failure resolves to `None`
    /// and the caller falls back to template text.
    pub async fn generate(&self, event: &Event, intensity: Intensity) -> Option<String> {
        self.generate_debug(event, intensity).await.text
    }

    /// Attempt a generation, returning the structured outcome.
    pub async fn generate_debug(&self, event: &Event, intensity: Intensity) -> GenerateDebug {
        match self.attempt(event, intensity).await {
            Ok(success) => GenerateDebug {
                text: Some(success.text),
                reason: if success.downgraded {
                    "ok_peak_budget_downgraded".to_string()
                } else {
                    "ok".to_string()
                },
                detail: Some(format!("intensity={}", success.intensity)),
            },
            Err(failure) => {
                log::debug!(
                    "generation failed: {}{}",
                    failure.reason(),
                    failure
                        .detail()
                        .map(|d| format!(" ({d})"))
                        .unwrap_or_default()
                );
                GenerateDebug {
                    text: None,
                    reason: failure.reason(),
                    detail: failure.detail().map(str::to_string),
                }
            }
        }
    }

    /// Downgrade a peak request to light when the user's daily peak quota
    /// is exhausted. A degraded reaction is preferred over no reaction.
    fn resolve_intensity(&self, event: &Event, requested: Intensity) -> (Intensity, bool) {
        if requested == Intensity::Peak {
            if let Some(user_id) = event.meta.user_id.as_deref() {
                let day = event.timestamp.date_naive();
                if self.usage.peak_count_for_day(user_id, day) >= self.config.peak_daily_cap {
                    log::debug!("daily peak quota exhausted, downgrading to light");
                    return (Intensity::Light, true);
                }
            }
        }
        (requested, false)
    }

    /// Bounded context summary — the only material sent to the external
    /// service. Deliberately excludes raw user content beyond a short
    /// clamped excerpt (and even that when memory capture is suppressed).
    fn build_context_summary(&self, event: &Event) -> String {
        let mut parts: Vec<String> = Vec::new();
        parts.push(format!("event={}", event.event_type));
        parts.push(format!("at={}", event.timestamp.to_rfc3339()));

        if let Some(companion) = event.context.companion.as_ref() {
            parts.push(format!("companion={}", companion.name));
        }
        parts.push(format!("tone={}", resolve_tone(&event.context)));

        if let Some(world) = event.context.world.as_ref() {
            parts.push(format!("mood={}", world.effective_mood()));
            parts.push(format!("streak={}", world.streak_days));
            parts.push(format!("prev_streak={}", world.previous_streak_days));
            if let Some(end) = world.last_session_end {
                parts.push(format!("days_away={}", day_gap_utc(end, event.timestamp)));
            }
        }

        if !event.meta.suppress_memory {
            for key in ["reflection", "moodNote"] {
                if let Some(text) = event.payload_str(key) {
                    let excerpt = clamp_excerpt(
                        text,
                        self.config.excerpt_max_chars,
                        self.config.excerpt_max_words,
                    );
                    if !excerpt.is_empty() {
                        parts.push(format!("{key}={excerpt}"));
                    }
                }
            }
        }

        parts.join("; ")
    }

    async fn attempt(
        &self,
        event: &Event,
        requested: Intensity,
    ) -> Result<GenerateSuccess, GenerateFailure> {
        if !self.config.enabled {
            return Err(GenerateFailure::Disabled);
        }
        let api_key = match self.config.api_key.as_deref() {
            Some(key) if !key.is_empty() => key,
            _ => return Err(GenerateFailure::MissingApiKey),
        };

        let (intensity, downgraded) = self.resolve_intensity(event, requested);
        let summary = self.build_context_summary(event);
        let body = json!({
            "model": self.config.model_for(intensity),
            "instruction": SYSTEM_INSTRUCTION,
            "input": summary,
            "max_output_tokens": self.config.max_tokens_for(intensity),
        });

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                log::debug!("generation request failed to send: {e}");
                GenerateFailure::NetworkError
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenerateFailure::Http {
                status: status.as_u16(),
            });
        }

        let raw_body = response
            .text()
            .await
            .map_err(|_| GenerateFailure::NetworkError)?;
        let value: Value =
            serde_json::from_str(&raw_body).map_err(|_| GenerateFailure::InvalidJsonPayload)?;

        let raw_text = extract_text(&value).ok_or_else(|| GenerateFailure::ParseNoText {
            shape: describe_shape(&value),
        })?;

        let cleaned = cleanup_output(
            &raw_text,
            self.config.max_output_words,
            self.config.max_output_chars(intensity),
        );
        if cleaned.is_empty() {
            return Err(GenerateFailure::EmptyAfterCleanup);
        }

        self.usage.record(UsageRecord {
            user_id: event.meta.user_id.clone(),
            intensity,
            model: self.config.model_for(intensity).to_string(),
            output_chars: cleaned.chars().count(),
            timestamp: event.timestamp,
        });

        Ok(GenerateSuccess {
            text: cleaned,
            intensity,
            downgraded,
        })
    }
}

struct GenerateSuccess {
    text: String,
    intensity: Intensity,
    downgraded: bool,
}

// ---------------------------------------------------------------------------
// Response parsing — ordered extraction strategies
// ---------------------------------------------------------------------------

/// Try each known response shape in sequence; the first match wins. Kept as
/// a flat strategy list so the fallback chain stays auditable.
fn extract_text(value: &Value) -> Option<String> {
    const STRATEGIES: &[fn(&Value) -> Option<String>] = &[
        direct_string,
        text_field,
        output_text_field,
        content_fragments,
        chat_choice_content,
        nested_output_blocks,
        summary_text_block,
    ];
    STRATEGIES.iter().find_map(|strategy| strategy(value))
}

fn direct_string(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

fn text_field(value: &Value) -> Option<String> {
    value.get("text").and_then(Value::as_str).map(str::to_string)
}

fn output_text_field(value: &Value) -> Option<String> {
    value
        .get("output_text")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// `{"content": [{"text": "..."}, "..."]}` — concatenated fragments.
fn content_fragments(value: &Value) -> Option<String> {
    let items = value.get("content").and_then(Value::as_array)?;
    let fragments: Vec<&str> = items
        .iter()
        .filter_map(|item| {
            item.as_str()
                .or_else(|| item.get("text").and_then(Value::as_str))
        })
        .collect();
    if fragments.is_empty() {
        None
    } else {
        Some(fragments.join(" "))
    }
}

/// `{"choices": [{"message": {"content": "..."}}]}`.
fn chat_choice_content(value: &Value) -> Option<String> {
    value
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// `{"output": [{"content": [{"text": "..."}]}]}`.
fn nested_output_blocks(value: &Value) -> Option<String> {
    let blocks = value.get("output").and_then(Value::as_array)?;
    blocks.iter().find_map(content_fragments)
}

fn summary_text_block(value: &Value) -> Option<String> {
    value
        .get("summary")
        .and_then(|summary| summary.get("text"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Shape-only description of an unparsable payload. Key names are safe to
/// log; values never are.
fn describe_shape(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).take(6).collect();
            format!("object(keys=[{}])", keys.join(","))
        }
        Value::Array(items) => format!("array(len={})", items.len()),
        Value::String(_) => "string".to_string(),
        Value::Number(_) => "number".to_string(),
        Value::Bool(_) => "bool".to_string(),
        Value::Null => "null".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Clamping
// ---------------------------------------------------------------------------

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Normalize whitespace and clamp to the word and character ceilings. The
/// character bound holds even when the upstream service ignored the
/// requested output-token ceiling.
fn cleanup_output(raw: &str, max_words: usize, max_chars: usize) -> String {
    let normalized = WHITESPACE.replace_all(raw.trim(), " ");
    let clamped_words: Vec<&str> = normalized.split(' ').take(max_words).collect();
    let joined = clamped_words.join(" ");
    truncate_chars(&joined, max_chars).trim_end().to_string()
}

/// Clamp a free-text excerpt to the configured ceilings before it may be
/// included in the context summary.
fn clamp_excerpt(text: &str, max_chars: usize, max_words: usize) -> String {
    cleanup_output(text, max_words, max_chars)
}

fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventMeta, EventScope};
    use crate::generation::usage::InMemoryUsageLog;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn event_for(user: Option<&str>) -> Event {
        Event::new("session.start", EventScope::App).with_meta(EventMeta {
            user_id: user.map(str::to_string),
            ..Default::default()
        })
    }

    fn gate_with(config: GenerationConfig) -> (GenerationGate, Arc<InMemoryUsageLog>) {
        let usage = Arc::new(InMemoryUsageLog::new());
        (GenerationGate::new(config, usage.clone()), usage)
    }

    /// Serve exactly one canned HTTP response on a local socket.
    async fn one_shot_server(status_line: &str, body: &str) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = vec![0u8; 16 * 1024];
                let mut seen = Vec::new();
                loop {
                    match stream.read(&mut buf).await {
                        Ok(0) => break,
                        Ok(n) => {
                            seen.extend_from_slice(&buf[..n]);
                            // Request body is JSON; stop once it has fully arrived.
                            if seen.ends_with(b"}") {
                                break;
                            }
                        }
                        Err(_) => break,
                    }
                }
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });
        format!("http://{addr}/v1/generate")
    }

    fn enabled_config(endpoint: String) -> GenerationConfig {
        GenerationConfig {
            enabled: true,
            api_key: Some("test-key".to_string()),
            endpoint,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_disabled_fails_fast() {
        let (gate, _) = gate_with(GenerationConfig::disabled());
        let debug = gate.generate_debug(&event_for(None), Intensity::Light).await;
        assert!(debug.text.is_none());
        assert_eq!(debug.reason, "llm_disabled");
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let config = GenerationConfig {
            enabled: true,
            ..Default::default()
        };
        let (gate, _) = gate_with(config);
        let debug = gate.generate_debug(&event_for(None), Intensity::Light).await;
        assert_eq!(debug.reason, "missing_api_key");
    }

    #[tokio::test]
    async fn test_network_error_on_refused_connection() {
        let (gate, _) = gate_with(enabled_config("http://127.0.0.1:1/v1/generate".into()));
        let debug = gate.generate_debug(&event_for(None), Intensity::Light).await;
        assert_eq!(debug.reason, "network_error");
        assert!(debug.text.is_none());
    }

    #[tokio::test]
    async fn test_http_status_failure() {
        let endpoint = one_shot_server("HTTP/1.1 503 Service Unavailable", "{}").await;
        let (gate, _) = gate_with(enabled_config(endpoint));
        let debug = gate.generate_debug(&event_for(None), Intensity::Light).await;
        assert_eq!(debug.reason, "http_503");
    }

    #[tokio::test]
    async fn test_invalid_json_payload() {
        let endpoint = one_shot_server("HTTP/1.1 200 OK", "<html>oops</html>").await;
        let (gate, _) = gate_with(enabled_config(endpoint));
        let debug = gate.generate_debug(&event_for(None), Intensity::Light).await;
        assert_eq!(debug.reason, "invalid_json_payload");
    }

    #[tokio::test]
    async fn test_parse_no_text_reports_shape() {
        let endpoint = one_shot_server("HTTP/1.1 200 OK", r#"{"status":"ok","usage":{}}"#).await;
        let (gate, _) = gate_with(enabled_config(endpoint));
        let debug = gate.generate_debug(&event_for(None), Intensity::Light).await;
        assert_eq!(debug.reason, "parse_no_text");
        let detail = debug.detail.unwrap();
        assert!(detail.starts_with("object"), "unexpected detail: {detail}");
        assert!(!detail.contains("ok"), "detail must not leak values");
    }

    #[tokio::test]
    async fn test_empty_after_cleanup() {
        let endpoint = one_shot_server("HTTP/1.1 200 OK", r#"{"text":"   \n  "}"#).await;
        let (gate, _) = gate_with(enabled_config(endpoint));
        let debug = gate.generate_debug(&event_for(None), Intensity::Light).await;
        assert_eq!(debug.reason, "empty_after_cleanup");
    }

    #[tokio::test]
    async fn test_success_cleans_and_records_usage() {
        let endpoint =
            one_shot_server("HTTP/1.1 200 OK", r#"{"text":"  Nice   work \n today "}"#).await;
        let (gate, usage) = gate_with(enabled_config(endpoint));
        let debug = gate
            .generate_debug(&event_for(Some("u1")), Intensity::Light)
            .await;
        assert_eq!(debug.reason, "ok");
        assert_eq!(debug.text.as_deref(), Some("Nice work today"));

        let records = usage.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].intensity, Intensity::Light);
        assert_eq!(records[0].output_chars, 15);
    }

    #[tokio::test]
    async fn test_peak_quota_downgrades_to_light() {
        let endpoint = one_shot_server("HTTP/1.1 200 OK", r#"{"text":"Seven days strong"}"#).await;
        let config = enabled_config(endpoint);
        let (gate, usage) = gate_with(config);

        let event = event_for(Some("u1"));
        for _ in 0..2 {
            usage.record(UsageRecord {
                user_id: Some("u1".to_string()),
                intensity: Intensity::Peak,
                model: "reaction-peak".to_string(),
                output_chars: 50,
                timestamp: event.timestamp,
            });
        }

        let debug = gate.generate_debug(&event, Intensity::Peak).await;
        assert_eq!(debug.reason, "ok_peak_budget_downgraded");
        assert_eq!(debug.text.as_deref(), Some("Seven days strong"));

        let last = usage.records().pop().unwrap();
        assert_eq!(last.intensity, Intensity::Light);
    }

    #[test]
    fn test_extract_text_strategy_order() {
        assert_eq!(extract_text(&json!("direct")).as_deref(), Some("direct"));
        assert_eq!(
            extract_text(&json!({"text": "from text"})).as_deref(),
            Some("from text")
        );
        assert_eq!(
            extract_text(&json!({"output_text": "from output_text"})).as_deref(),
            Some("from output_text")
        );
        assert_eq!(
            extract_text(&json!({"content": [{"text": "a"}, "b"]})).as_deref(),
            Some("a b")
        );
        assert_eq!(
            extract_text(&json!({"choices": [{"message": {"content": "chat"}}]})).as_deref(),
            Some("chat")
        );
        assert_eq!(
            extract_text(&json!({"output": [{"content": [{"text": "nested"}]}]})).as_deref(),
            Some("nested")
        );
        assert_eq!(
            extract_text(&json!({"summary": {"text": "summarized"}})).as_deref(),
            Some("summarized")
        );
        assert_eq!(extract_text(&json!({"usage": {"tokens": 3}})), None);
    }

    #[test]
    fn test_cleanup_clamps_words_and_chars() {
        let twenty_five = (0..25).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
        let cleaned = cleanup_output(&twenty_five, 18, 1000);
        assert_eq!(cleaned.split(' ').count(), 18);

        let cleaned = cleanup_output("abcdef", 18, 4);
        assert_eq!(cleaned, "abcd");

        // Char truncation never splits a multi-byte character.
        let cleaned = cleanup_output("héllo wörld", 18, 7);
        assert_eq!(cleaned, "héllo w");
    }

    #[test]
    fn test_summary_excludes_excerpt_when_memory_suppressed() {
        let (gate, _) = gate_with(GenerationConfig::disabled());
        let mut event = event_for(Some("u1"));
        event
            .payload
            .insert("reflection".into(), json!("today felt heavy"));

        let open = gate.build_context_summary(&event);
        assert!(open.contains("reflection=today felt heavy"));

        event.meta.suppress_memory = true;
        let suppressed = gate.build_context_summary(&event);
        assert!(!suppressed.contains("reflection"));
    }
}
