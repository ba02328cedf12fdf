//! Generation gate configuration.
//!
//! Loaded from the environment in deployments; constructed directly in
//! tests. Absent or malformed variables fall back to defaults — reading
//! configuration never panics.

use serde::{Deserialize, Serialize};

use super::Intensity;

/// Conservative characters-per-token proxy used for output ceilings.
pub const CHARS_PER_TOKEN: usize = 4;

/// Configuration for the external generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Global kill switch. When false the gate fails fast with
    /// `llm_disabled`.
    pub enabled: bool,

    /// API key for the external service. Never serialized.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Endpoint URL for the generation call.
    pub endpoint: String,

    /// Model tier used for light-intensity reactions.
    pub light_model: String,

    /// Model tier used for peak-intensity reactions.
    pub peak_model: String,

    /// Output token ceiling for light reactions.
    pub light_max_tokens: u32,

    /// Output token ceiling for peak reactions.
    pub peak_max_tokens: u32,

    /// Per-user daily cap on peak-intensity generations.
    pub peak_daily_cap: u32,

    /// Character ceiling for free-text excerpts in the context summary.
    pub excerpt_max_chars: usize,

    /// Word ceiling for free-text excerpts in the context summary.
    pub excerpt_max_words: usize,

    /// Hard word ceiling on cleaned output.
    pub max_output_words: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            endpoint: "https://api.companion-gen.invalid/v1/generate".to_string(),
            light_model: "reaction-light".to_string(),
            peak_model: "reaction-peak".to_string(),
            light_max_tokens: 40,
            peak_max_tokens: 90,
            peak_daily_cap: 2,
            excerpt_max_chars: 160,
            excerpt_max_words: 30,
            max_output_words: 18,
        }
    }
}

impl GenerationConfig {
    /// Read configuration from the environment. Missing variables keep
    /// their defaults; the gate stays disabled unless explicitly enabled.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("COMPANION_GEN_ENABLED") {
            config.enabled = matches!(v.as_str(), "1" | "true" | "yes");
        }
        if let Ok(v) = std::env::var("COMPANION_GEN_API_KEY") {
            if !v.is_empty() {
                config.api_key = Some(v);
            }
        }
        if let Ok(v) = std::env::var("COMPANION_GEN_ENDPOINT") {
            if !v.is_empty() {
                config.endpoint = v;
            }
        }
        if let Ok(v) = std::env::var("COMPANION_GEN_LIGHT_MODEL") {
            if !v.is_empty() {
                config.light_model = v;
            }
        }
        if let Ok(v) = std::env::var("COMPANION_GEN_PEAK_MODEL") {
            if !v.is_empty() {
                config.peak_model = v;
            }
        }
        if let Ok(v) = std::env::var("COMPANION_GEN_PEAK_DAILY_CAP") {
            if let Ok(cap) = v.parse() {
                config.peak_daily_cap = cap;
            }
        }

        config
    }

    /// A disabled configuration, handy as a test fixture.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Model tier for an intensity.
    pub fn model_for(&self, intensity: Intensity) -> &str {
        match intensity {
            Intensity::Light => &self.light_model,
            Intensity::Peak => &self.peak_model,
        }
    }

    /// Output token ceiling for an intensity.
    pub fn max_tokens_for(&self, intensity: Intensity) -> u32 {
        match intensity {
            Intensity::Light => self.light_max_tokens,
            Intensity::Peak => self.peak_max_tokens,
        }
    }

    /// Output character ceiling for an intensity (`tokens × 4`). Holds
    /// even when the upstream service ignores the requested token ceiling.
    pub fn max_output_chars(&self, intensity: Intensity) -> usize {
        self.max_tokens_for(intensity) as usize * CHARS_PER_TOKEN
    }
}
