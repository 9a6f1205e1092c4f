use anyhow::Context;
use serde::{Deserialize, Serialize};
use shared::domain::{TerrainMap, GRID_SIZE};

/// Chat-completion endpoint settings. The credential is injected at startup
/// and never logged.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: String,
}

#[derive(Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    cfg: LlmConfig,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: String,
}

#[derive(Deserialize)]
struct DescriptionReply {
    description: String,
}

impl LlmClient {
    pub fn new(cfg: LlmConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            cfg,
        }
    }

    /// Sends one prompt to the chat-completion endpoint and returns the raw
    /// reply text. One attempt per request; no retry, no cancellation.
    pub async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        let request = ChatRequest {
            model: &self.cfg.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let reply = self
            .http
            .post(&self.cfg.endpoint)
            .bearer_auth(&self.cfg.api_key)
            .json(&request)
            .send()
            .await
            .context("language model request failed")?
            .error_for_status()
            .context("language model returned non-2xx response")?
            .json::<ChatResponse>()
            .await
            .context("language model response decode failed")?;

        reply
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| anyhow::anyhow!("language model returned no choices"))
    }
}

/// Every cell as `(row,col) label`, coordinates numbered from 1. Presentation
/// only; the map itself stays 0-indexed.
pub fn coordinate_listing(map: &TerrainMap) -> String {
    let mut listing = String::new();
    for row in 0..GRID_SIZE {
        for col in 0..GRID_SIZE {
            listing.push_str(&format!(
                "({},{}) {}\n",
                row + 1,
                col + 1,
                map.label_at(row, col)
            ));
        }
    }
    listing
}

pub fn build_terrain_prompt(map: &TerrainMap, instruction: &str) -> String {
    format!(
        "The drone flies over a 4x4 terrain map. Coordinates are (row,column), \
         numbered from 1; the drone always starts at (1,1), the top-left tile.\n\n\
         [MAP]\n{listing}\n[INSTRUCTION]\n{instruction}\n\n\
         Follow the instruction move by move, staying inside the map edges, \
         and find the final tile.\n\
         Answer with exactly one JSON object and nothing else:\n\
         {{\"description\":\"<what is on the final tile, at most two words>\"}}\n",
        listing = coordinate_listing(map),
    )
}

/// Extracts the description from a model reply. The reply must be a single
/// JSON object with a `description` key, optionally wrapped in a code fence.
pub fn parse_description(raw: &str) -> anyhow::Result<String> {
    let reply: DescriptionReply = serde_json::from_str(strip_fences(raw))
        .with_context(|| format!("model reply is not a description object: {raw:?}"))?;
    Ok(reply.description)
}

fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
#[path = "tests/llm_tests.rs"]
mod tests;
