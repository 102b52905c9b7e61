use crate::api::middleware::AppError;
use crate::config::LlmSettings;
use reqwest::Client as HttpClient;
use serde_json::json;

/// Client for an OpenAI-compatible chat-completions endpoint.
///
/// Constructed per request from the settings snapshot; temperature is pinned
/// to zero so the agent's output leans deterministic.
pub struct LlmClient {
    model: String,
    base_url: String,
    api_key: String,
    http_client: HttpClient,
}

impl LlmClient {
    pub fn new(settings: &LlmSettings) -> Self {
        Self {
            model: settings.model.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            http_client: HttpClient::new(),
        }
    }

    /// Send a system context message plus a user prompt and return the
    /// assistant's response text.
    pub async fn complete(&self, system: &str, user: &str) -> Result<String, AppError> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .http_client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({
                "model": self.model,
                "temperature": 0.0,
                "messages": [
                    {"role": "system", "content": system},
                    {"role": "user", "content": user},
                ],
            }))
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to call LLM service: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Llm(format!(
                "LLM service returned error {}: {}",
                status, error_text
            )));
        }

        let result: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse LLM response: {}", e)))?;

        let content = result["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                AppError::Llm("LLM response does not contain message content".to_string())
            })?;

        Ok(content.to_string())
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Strip markdown code fences that chat models like to wrap SQL in.
pub fn strip_code_fences(text: &str) -> String {
    text.trim()
        .trim_start_matches("```sql")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> LlmClient {
        LlmClient::new(&LlmSettings {
            model: "llama3.2:latest".to_string(),
            base_url: "http://localhost:11434/v1/".to_string(),
            api_key: "ollama".to_string(),
        })
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        assert_eq!(client().base_url, "http://localhost:11434/v1");
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(
            strip_code_fences("```sql\nSELECT 1\n```"),
            "SELECT 1"
        );
        assert_eq!(strip_code_fences("SELECT 1"), "SELECT 1");
        assert_eq!(strip_code_fences("```\nSELECT 1\n```"), "SELECT 1");
    }
}
