use std::future::Future;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::classify::{ClassificationRequest, ClassificationResponse, ReviewClassifier};
use crate::config::LlmConfig;
use crate::error::ClassificationError;
use crate::insights::{RecommendationRequest, Recommendations, SwotAnalysis, SwotRequest};

const USER_AGENT: &str = concat!("review-insights/", env!("CARGO_PKG_VERSION"));

const CLASSIFY_PROMPT: &str = "You are an expert review analyst. For the following list of reviews, \
determine the sentiment and a single, most relevant theme for each.\n\
The available themes are: 'Login', 'Privacy', 'Crash', 'UPI', 'Credit Card', 'Registration', 'General', 'Interface/UI'.\n\
The available sentiments are: 'Positive', 'Negative', 'Neutral'.\n\
If a review text is empty or nonsensical, classify it as 'Neutral' and 'General'.\n\
Respond with a JSON object with a \"classifications\" array of {\"id\", \"sentiment\", \"theme\"} objects.";

const SWOT_PROMPT: &str = "You are a strategic analyst creating a SWOT analysis of a mobile banking app \
from user reviews and market data. Give 2-4 concrete points for each category.\n\
Every point has a \"title\" and a \"description\":\n\
- strengths: the strength and the evidence from reviews\n\
- weaknesses: the pain point and the strategic risk\n\
- opportunities: the opportunity area and the value creation potential\n\
- threats: the threat source and the strategic consequence\n\
Respond with a JSON object with \"strengths\", \"weaknesses\", \"opportunities\" and \"threats\" arrays.";

const RECOMMEND_PROMPT: &str = "You are a product manager improving a mobile banking app. Based on the \
negative reviews and identified weaknesses, give actionable recommendations.\n\
Respond with a JSON object with a \"recommendations\" array of \
{\"title\", \"actions\": [string], \"rationale\"} objects.";

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat completions endpoint running in JSON mode.
pub struct LlmClient {
    http_client: reqwest::Client,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self, ClassificationError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout())
            .build()
            .map_err(|e| ClassificationError::Http(e.to_string()))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    async fn complete_json<T: DeserializeOwned>(
        &self,
        system_prompt: &str,
        user_prompt: String,
    ) -> Result<T, ClassificationError> {
        let body = json!({
            "model": self.config.llm_model,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_prompt },
            ],
        });

        let mut request = self
            .http_client
            .post(self.config.chat_completions_url())
            .json(&body);
        if let Some(api_key) = &self.config.llm_api_key {
            request = request.bearer_auth(api_key);
        }

        tracing::debug!(model = %self.config.llm_model, "sending LLM request");
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ClassificationError::Timeout(self.config.llm_timeout_secs)
            } else {
                ClassificationError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ClassificationError::Status(status.as_u16(), error_text));
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| ClassificationError::MalformedResponse(e.to_string()))?;

        parse_completion(completion)
    }

    pub async fn swot_analysis(
        &self,
        request: &SwotRequest,
    ) -> Result<SwotAnalysis, ClassificationError> {
        let payload = serde_json::to_string_pretty(request)
            .map_err(|e| ClassificationError::MalformedResponse(e.to_string()))?;
        self.complete_json(SWOT_PROMPT, payload).await
    }

    pub async fn recommendations(
        &self,
        request: &RecommendationRequest,
    ) -> Result<Recommendations, ClassificationError> {
        let payload = serde_json::to_string_pretty(request)
            .map_err(|e| ClassificationError::MalformedResponse(e.to_string()))?;
        self.complete_json(RECOMMEND_PROMPT, payload).await
    }
}

fn parse_completion<T: DeserializeOwned>(
    completion: ChatCompletion,
) -> Result<T, ClassificationError> {
    let content = completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| ClassificationError::MalformedResponse("empty completion".to_string()))?;

    serde_json::from_str(&content)
        .map_err(|e| ClassificationError::MalformedResponse(e.to_string()))
}

impl ReviewClassifier for LlmClient {
    fn classify(
        &self,
        requests: &[ClassificationRequest],
    ) -> impl Future<Output = Result<ClassificationResponse, ClassificationError>> + Send {
        let payload = serde_json::to_string_pretty(requests);
        async move {
            let payload =
                payload.map_err(|e| ClassificationError::MalformedResponse(e.to_string()))?;
            self.complete_json(CLASSIFY_PROMPT, format!("Reviews to classify:\n{payload}"))
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completion(content: &str) -> ChatCompletion {
        serde_json::from_value(json!({
            "choices": [{ "message": { "role": "assistant", "content": content } }]
        }))
        .unwrap()
    }

    #[test]
    fn classification_content_is_decoded() {
        let parsed: ClassificationResponse = parse_completion(completion(
            r#"{"classifications":[{"id":"r1","sentiment":"Negative","theme":"UPI"}]}"#,
        ))
        .unwrap();
        let items = parsed.classifications.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].theme, "UPI");
    }

    #[test]
    fn missing_classifications_field_decodes_as_none() {
        let parsed: ClassificationResponse =
            parse_completion(completion(r#"{"result":"ok"}"#)).unwrap();
        assert!(parsed.classifications.is_none());
    }

    #[test]
    fn non_json_content_is_malformed() {
        let err = parse_completion::<ClassificationResponse>(completion("Sure! Here you go"))
            .unwrap_err();
        assert!(matches!(err, ClassificationError::MalformedResponse(_)));
    }

    #[test]
    fn empty_choices_are_malformed() {
        let empty = ChatCompletion { choices: Vec::new() };
        let err = parse_completion::<ClassificationResponse>(empty).unwrap_err();
        assert!(matches!(err, ClassificationError::MalformedResponse(_)));
    }

    #[test]
    fn swot_content_is_decoded() {
        let parsed: SwotAnalysis = parse_completion(completion(
            r#"{"strengths":[{"title":"Seamless UPI","description":"Praised in 40 reviews"}],
                "weaknesses":[],"opportunities":[],"threats":[]}"#,
        ))
        .unwrap();
        assert_eq!(parsed.strengths[0].title, "Seamless UPI");
    }
}
