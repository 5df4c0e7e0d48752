use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::build_prompt::Message;
use crate::config::Config;
use crate::error::Result;
use crate::http::HttpClient;

/// Per-call generation settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatOptions {
    pub max_output_tokens: usize,
    /// How long the backend keeps the model loaded after the call, e.g. `30m`.
    pub keep_alive: String,
}

impl ChatOptions {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            max_output_tokens: cfg.max_output_tokens,
            keep_alive: cfg.keep_alive.clone(),
        }
    }
}

/// Chat-completion backend. Failures propagate to the caller untouched.
pub trait ChatModel: Send + Sync {
    fn chat(&self, messages: &[Message], options: &ChatOptions) -> Result<String>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    options: GenerateOptions,
    keep_alive: &'a str,
}

#[derive(Serialize)]
struct GenerateOptions {
    num_predict: usize,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ChatMessage>,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Non-streaming chat against an Ollama `/api/chat` endpoint.
#[derive(Clone, Debug)]
pub struct OllamaChat {
    http: HttpClient,
    base_url: String,
    model: String,
}

impl OllamaChat {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new(Duration::from_secs(cfg.request_timeout_secs))?,
            base_url: cfg.ollama_url.trim_end_matches('/').to_string(),
            model: cfg.chat_model.clone(),
        })
    }
}

impl ChatModel for OllamaChat {
    fn chat(&self, messages: &[Message], options: &ChatOptions) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);
        let req = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
            options: GenerateOptions {
                num_predict: options.max_output_tokens,
            },
            keep_alive: &options.keep_alive,
        };
        let res = self.http.post_json::<ChatResponse, _>(&url, &req)?;
        Ok(res.message.and_then(|m| m.content).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_carries_budget_and_keep_alive() {
        let messages = [Message::system("s"), Message::user("q")];
        let req = ChatRequest {
            model: "mistral:7b",
            messages: &messages,
            stream: false,
            options: GenerateOptions { num_predict: 220 },
            keep_alive: "30m",
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "model": "mistral:7b",
                "messages": [
                    {"role": "system", "content": "s"},
                    {"role": "user", "content": "q"}
                ],
                "stream": false,
                "options": {"num_predict": 220},
                "keep_alive": "30m"
            })
        );
    }

    #[test]
    fn missing_message_reads_as_empty_reply() {
        let res: ChatResponse = serde_json::from_str(r#"{"done":true}"#).unwrap();
        assert_eq!(res.message.and_then(|m| m.content).unwrap_or_default(), "");
    }
}
