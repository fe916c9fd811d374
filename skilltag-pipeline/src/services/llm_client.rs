//! OpenAI-compatible chat-completions classifier
//!
//! Sends one JSON-mode chat request per course-skill pair with a fixed seed
//! and low temperature. A `governor` quota caps the request rate on the
//! transport; the pipeline's cooldown limiter sits on top of that.

use async_trait::async_trait;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;

use super::classifier::{parse_classification, ClassificationRequest, Classifier, ClassifyError};
use crate::config::ClassifierSettings;
use crate::models::ClassificationResult;

const USER_AGENT: &str = concat!("skilltag/", env!("CARGO_PKG_VERSION"));

const SYSTEM_PROMPT: &str = "You assess the proficiency level a course develops for a given skill. \
Reply with a JSON object only.";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    seed: u64,
    response_format: ResponseFormat,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Live classification client
pub struct LlmClassifier {
    http_client: reqwest::Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    settings: ClassifierSettings,
}

impl LlmClassifier {
    pub fn new(settings: ClassifierSettings) -> Result<Self, ClassifyError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ClassifyError::Network(e.to_string()))?;

        let per_second = NonZeroU32::new(settings.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(per_second));

        Ok(Self {
            http_client,
            rate_limiter,
            settings,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.settings.base_url.trim_end_matches('/'))
    }

    fn user_prompt(request: &ClassificationRequest) -> String {
        let key = super::classifier::level_key(request.round);
        let mut prompt = format!(
            "Skill: {}\n\nSkill reference by proficiency level:\n{}\n\nCourse:\n{}\n\n",
            request.skill_title, request.knowledge_excerpt, request.course_text
        );
        if let Some(chart) = &request.reference_chart {
            prompt.push_str("General proficiency level guide:\n");
            prompt.push_str(chart);
            prompt.push_str("\n\n");
        }
        prompt.push_str(&format!(
            "Return {{\"{}\": <level, or 0 if unsure>, \"reason\": <short reason>, \
             \"confidence\": \"low\" | \"medium\" | \"high\"}}.",
            key
        ));
        prompt
    }

    fn chat_request(&self, request: &ClassificationRequest) -> ChatRequest<'_> {
        ChatRequest {
            model: &self.settings.model,
            temperature: self.settings.temperature,
            seed: self.settings.seed,
            response_format: ResponseFormat { kind: "json_object" },
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: Self::user_prompt(request),
                },
            ],
        }
    }
}

#[async_trait]
impl Classifier for LlmClassifier {
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn classify(
        &self,
        request: &ClassificationRequest,
    ) -> Result<ClassificationResult, ClassifyError> {
        self.rate_limiter.until_ready().await;

        tracing::debug!(
            unique_id = %request.unique_id,
            round = request.round.number(),
            "Requesting classification"
        );

        let response = self
            .http_client
            .post(self.endpoint())
            .bearer_auth(&self.settings.api_key)
            .json(&self.chat_request(request))
            .send()
            .await
            .map_err(|e| ClassifyError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifyError::Api(status.as_u16(), body));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| ClassifyError::Parse(e.to_string()))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ClassifyError::Parse("reply has no content".to_string()))?;

        parse_classification(&request.unique_id, request.round, &content)
    }
}
