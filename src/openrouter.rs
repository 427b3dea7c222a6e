// Copyright (c) 2025 Sean McNamara <smcnam@gmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! OpenRouter client: free-model listing and chat completions.

use anyhow::{Context, Result};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader};
use std::time::Duration;

use crate::constants::CODING_MODEL_KEYWORDS;
use crate::error::GrepoError;

const SERVICE: &str = "openrouter";

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub role: &'static str,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Model {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub context_length: Option<u64>,
    #[serde(default)]
    pricing: Pricing,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Pricing {
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    completion: Option<String>,
}

impl Model {
    /// Both prompt and completion are priced at exactly zero.
    pub fn is_free(&self) -> bool {
        let zero = |p: &Option<String>| {
            p.as_deref()
                .and_then(|s| s.trim().parse::<f64>().ok())
                .is_some_and(|v| v == 0.0)
        };
        zero(&self.pricing.prompt) && zero(&self.pricing.completion)
    }

    pub fn is_coding_model(&self) -> bool {
        let id = self.id.to_lowercase();
        let name = self.name.to_lowercase();
        CODING_MODEL_KEYWORDS
            .iter()
            .any(|k| id.contains(k) || name.contains(k))
    }
}

#[derive(Debug, Deserialize)]
struct ModelList {
    data: Vec<Model>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatContent>,
    #[serde(default)]
    delta: Option<ChatContent>,
}

#[derive(Debug, Deserialize)]
struct ChatContent {
    #[serde(default)]
    content: Option<String>,
}

/// One parsed line of a server-sent event stream.
#[derive(Debug, PartialEq, Eq)]
pub enum SseEvent {
    Delta(String),
    Done,
    Skip,
}

/// Parse one SSE line. Comments, keep-alives, non-data fields and malformed
/// payloads are skipped.
pub fn parse_sse_line(line: &str) -> SseEvent {
    let line = line.trim();
    let Some(data) = line.strip_prefix("data:") else {
        return SseEvent::Skip;
    };
    let data = data.trim();
    if data == "[DONE]" {
        return SseEvent::Done;
    }
    match serde_json::from_str::<ChatResponse>(data) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.delta)
            .and_then(|d| d.content)
            .filter(|s| !s.is_empty())
            .map(SseEvent::Delta)
            .unwrap_or(SseEvent::Skip),
        Err(_) => SseEvent::Skip,
    }
}

pub struct OpenRouter {
    client: Client,
    base: String,
    token: Option<String>,
}

impl OpenRouter {
    /// `token` may be omitted for the public model list.
    pub fn new(base: &str, token: Option<&str>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()).map(str::to_string),
        })
    }

    fn send(&self, req: RequestBuilder) -> Result<Response> {
        let req = match self.token {
            Some(ref token) => req.bearer_auth(token),
            None => req,
        };
        let response = req
            .header("X-Title", "grepo")
            .send()
            .map_err(|e| GrepoError::external(SERVICE, None, e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&text)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
            .unwrap_or(text);
        tracing::warn!(status = status.as_u16(), %message, "OpenRouter request failed");
        Err(GrepoError::external(SERVICE, Some(status.as_u16()), message).into())
    }

    fn require_token(&self) -> Result<()> {
        if self.token.is_none() {
            return Err(GrepoError::MissingCredential("OpenRouter token").into());
        }
        Ok(())
    }

    /// Free models, coding models first, then by id.
    pub fn list_free_models(&self) -> Result<Vec<Model>> {
        let list: ModelList = self
            .send(self.client.get(format!("{}/models", self.base)))?
            .json()
            .map_err(|e| GrepoError::external(SERVICE, None, format!("invalid model list: {}", e)))?;
        let mut models: Vec<Model> = list.data.into_iter().filter(Model::is_free).collect();
        models.sort_by(|a, b| {
            b.is_coding_model()
                .cmp(&a.is_coding_model())
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(models)
    }

    /// Streamed completion. `on_delta` sees each fragment as it arrives; the
    /// full text is returned.
    pub fn stream_chat(
        &self,
        model: &str,
        messages: &[Message],
        on_delta: &mut dyn FnMut(&str),
    ) -> Result<String> {
        self.require_token()?;
        let request = ChatRequest {
            model,
            messages,
            stream: true,
        };
        let response = self.send(
            self.client
                .post(format!("{}/chat/completions", self.base))
                .header("Accept", "text/event-stream")
                .json(&request),
        )?;

        let mut content = String::new();
        for line in BufReader::new(response).lines() {
            let line = line.map_err(|e| GrepoError::external(SERVICE, None, e.to_string()))?;
            match parse_sse_line(&line) {
                SseEvent::Delta(delta) => {
                    on_delta(&delta);
                    content.push_str(&delta);
                }
                SseEvent::Done => break,
                SseEvent::Skip => {}
            }
        }
        tracing::info!(model, chars = content.len(), "streamed completion finished");
        Ok(content)
    }

    /// Non-streaming completion returning the first choice's text.
    pub fn chat(&self, model: &str, messages: &[Message]) -> Result<String> {
        self.require_token()?;
        let request = ChatRequest {
            model,
            messages,
            stream: false,
        };
        let response: ChatResponse = self
            .send(
                self.client
                    .post(format!("{}/chat/completions", self.base))
                    .json(&request),
            )?
            .json()
            .map_err(|e| GrepoError::external(SERVICE, None, format!("invalid completion: {}", e)))?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .ok_or_else(|| GrepoError::external(SERVICE, None, "completion had no content").into())
    }
}
