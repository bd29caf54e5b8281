// Decision oracle backed by an OpenAI-compatible chat completions endpoint.
//
// Each step is one `POST {base}/chat/completions` with a system message and a
// user message. The user message carries the rendered decision prompt
// (`panonav_core::oracle::render_prompt`) and, when the request has imagery,
// one `data:image/jpeg;base64,...` part per view. There is no retry here: a
// transport error or non-success status is an `OracleError` and the
// navigation loop ends the run.
//
// The reply is reduced to a node id with `extract_node_id`; a reply that
// names no candidate is `OracleError::Unparsable`.

use crate::config::{ORACLE_KEY_VAR, OracleConfig};
use crate::error::ClientError;
use crate::http::{build_client, redact};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use panonav_core::error::OracleError;
use panonav_core::oracle::{DecisionOracle, DecisionRequest, extract_node_id, render_prompt};
use panonav_core::types::NodeId;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{Value, json};

pub const SYSTEM_PROMPT: &str = "You are a street-level navigation agent. You move through a graph of panorama viewpoints by choosing one adjacent node per step. Relative headings are measured clockwise from your current facing: 0 is straight ahead, 90 is to your right, 270 is to your left. Follow the turn guidance you are given, prefer moving toward the target, and avoid nodes you have already visited.";

/// Token counts reported by the endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

impl std::ops::AddAssign for TokenUsage {
    fn add_assign(&mut self, other: Self) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct ChatOracle {
    http: Client,
    config: OracleConfig,
    usage: TokenUsage,
    calls: usize,
}

impl ChatOracle {
    pub fn new(config: OracleConfig) -> Result<Self, ClientError> {
        if config.api_key.is_empty() {
            return Err(ClientError::MissingCredential(ORACLE_KEY_VAR));
        }
        Ok(Self {
            http: build_client(config.timeout())?,
            config,
            usage: TokenUsage::default(),
            calls: 0,
        })
    }

    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(OracleConfig::from_env())
    }

    /// Usage summed over every completed call.
    pub fn usage(&self) -> TokenUsage {
        self.usage
    }

    pub fn calls(&self) -> usize {
        self.calls
    }

    /// The JSON body sent for `request`.
    pub fn request_body(&self, request: &DecisionRequest) -> Value {
        let mut content = vec![json!({ "type": "text", "text": render_prompt(request) })];
        for image in &request.imagery {
            content.push(json!({
                "type": "image_url",
                "image_url": {
                    "url": format!("data:image/jpeg;base64,{}", BASE64.encode(&image.bytes)),
                },
            }));
        }
        json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": content },
            ],
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "top_p": self.config.top_p,
        })
    }

    /// Send one completion request and return the reply text.
    fn complete(&mut self, body: &Value) -> Result<String, OracleError> {
        let key = &self.config.api_key;
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        tracing::debug!(url = %url, model = %self.config.model, "oracle request");
        let response = self
            .http
            .post(&url)
            .bearer_auth(key)
            .json(body)
            .send()
            .map_err(|e| OracleError::Transport(redact(&e.to_string(), key)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "oracle request failed");
            return Err(OracleError::Status {
                status: status.as_u16(),
                body: redact(&text, key),
            });
        }

        let parsed: CompletionResponse = response
            .json()
            .map_err(|e| OracleError::Transport(e.to_string()))?;
        self.calls += 1;
        if let Some(usage) = parsed.usage {
            self.usage += usage;
            tracing::info!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "oracle token usage"
            );
        }

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(OracleError::EmptyReply)
    }
}

impl DecisionOracle for ChatOracle {
    fn choose_next(&mut self, request: &DecisionRequest) -> Result<NodeId, OracleError> {
        let body = self.request_body(request);
        let reply = self.complete(&body)?;
        extract_node_id(&reply, &request.candidate_ids()).ok_or(OracleError::Unparsable(reply))
    }
}
