use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::config::Settings;
use crate::model::{ArtifactRef, Grade};

const GRADING_SYSTEM_PROMPT: &str = r#"Вы — помощник для оценки учебных работ.
Проверьте работу студента по ссылке и выставьте оценку согласно критериям из задания.

Формат ответа (строгий JSON):
{
  "score": <число>,
  "comment": "развернутое обоснование выставленной оценки"
}
"#;

/// Opaque scoring oracle. Given an artifact reference and the assignment's
/// grading prompt, produce a score and a comment or fail.
#[async_trait]
pub trait GradingOracle: Send + Sync {
    async fn grade(&self, artifact: &ArtifactRef, prompt: &str) -> Result<Grade>;
}

#[derive(Debug, Deserialize)]
struct OracleReply {
    score: f64,
    comment: String,
}

/// OpenAI-compatible chat-completions client used as the grading oracle.
/// Transport retries with backoff live here, at the collaborator boundary;
/// the workflow itself never retries a failed grading call.
#[derive(Debug, Clone)]
pub struct AiGradingService {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
}

impl AiGradingService {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let timeout = Duration::from_secs(settings.ai().request_timeout);
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key: settings.ai().api_key.clone(),
            base_url: settings.ai().base_url.trim_end_matches('/').to_string(),
            model: settings.ai().model.clone(),
            max_tokens: settings.ai().max_tokens,
            temperature: settings.ai().temperature,
        })
    }
}

#[async_trait]
impl GradingOracle for AiGradingService {
    async fn grade(&self, artifact: &ArtifactRef, prompt: &str) -> Result<Grade> {
        let timer = Instant::now();

        let user_prompt = format!(
            "{prompt}\n\nФайл работы: {} ({})\n\nОБЯЗАТЕЛЬНО верните строгий JSON с ключами \"score\" и \"comment\".",
            artifact.url, artifact.file_name
        );

        let payload = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": GRADING_SYSTEM_PROMPT},
                {"role": "user", "content": user_prompt}
            ],
            "max_completion_tokens": self.max_tokens,
            "temperature": self.temperature,
            "response_format": {"type": "json_object"}
        });

        tracing::info!(file_name = %artifact.file_name, "Sending AI grading request");

        let url = format!("{}/chat/completions", self.base_url);
        let mut last_error = None;
        let mut body = Value::Null;

        for attempt in 0..=3 {
            let response =
                self.client.post(&url).bearer_auth(&self.api_key).json(&payload).send().await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    body = resp.json().await.unwrap_or(Value::Null);
                    if status.is_success() {
                        last_error = None;
                        break;
                    }
                    last_error = Some(anyhow::anyhow!("Grading API error: {body}"));
                }
                Err(err) => {
                    last_error = Some(anyhow::anyhow!(err).context("Failed to call grading API"));
                }
            }

            if attempt < 3 {
                tokio::time::sleep(Duration::from_secs(2_u64.pow(attempt as u32))).await;
            }
        }

        if let Some(err) = last_error {
            return Err(err);
        }

        let content = body
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|value| value.as_str())
            .context("Missing grading response content")?;

        let reply: OracleReply =
            serde_json::from_str(content).context("Failed to parse grading JSON")?;

        let tokens_used = body
            .get("usage")
            .and_then(|usage| usage.get("total_tokens"))
            .and_then(|value| value.as_u64());

        tracing::info!(
            file_name = %artifact.file_name,
            duration_seconds = timer.elapsed().as_secs_f64(),
            tokens_used,
            score = reply.score,
            "AI grading completed"
        );

        Ok(Grade { score: reply.score, comment: reply.comment })
    }
}
