use std::time::Duration;

use clap::Args;

pub const DEFAULT_MARKET_TRENDS: &str = "Rise of neo-banks, increasing demand for personalized financial services, \
     and adoption of AI-driven customer support.";
pub const DEFAULT_COMPETITOR_ANALYSIS: &str = "Competitor apps offer more intuitive UIs and faster UPI transaction speeds. \
     Security features like biometric login are becoming standard.";

/// Connection settings for the OpenAI-compatible endpoint used for
/// classification and the SWOT / recommendation reports.
#[derive(Args, Debug, Clone)]
pub struct LlmConfig {
    #[arg(long, env = "LLM_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub llm_base_url: String,

    #[arg(long, env = "LLM_MODEL", default_value = "gpt-4o-mini")]
    pub llm_model: String,

    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,

    /// Upper bound for a single LLM call, including the classification batch
    #[arg(long, env = "LLM_TIMEOUT_SECS", default_value_t = 120)]
    pub llm_timeout_secs: u64,
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs.max(1))
    }

    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.llm_base_url.trim_end_matches('/'))
    }
}

/// Business context handed to the SWOT prompt alongside review data.
#[derive(Args, Debug, Clone)]
pub struct MarketContext {
    #[arg(long, env = "MARKET_TRENDS", default_value = DEFAULT_MARKET_TRENDS)]
    pub market_trends: String,

    #[arg(long, env = "COMPETITOR_ANALYSIS", default_value = DEFAULT_COMPETITOR_ANALYSIS)]
    pub competitor_analysis: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str, timeout: u64) -> LlmConfig {
        LlmConfig {
            llm_base_url: base_url.to_string(),
            llm_model: "gpt-4o-mini".to_string(),
            llm_api_key: None,
            llm_timeout_secs: timeout,
        }
    }

    #[test]
    fn completions_url_ignores_trailing_slash() {
        assert_eq!(
            config("http://localhost:8080/v1/", 10).chat_completions_url(),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[test]
    fn timeout_is_never_zero() {
        assert_eq!(config("http://x", 0).timeout(), Duration::from_secs(1));
    }
}
