use std::{collections::HashMap, fs};

use anyhow::bail;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineKind {
    Local,
    Remote,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_bind: String,
    pub pipeline: PipelineKind,
    pub access_key: String,
    pub llm_endpoint: String,
    pub llm_model: String,
    pub llm_api_key: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8000".into(),
            pipeline: PipelineKind::Local,
            access_key: "dev-access-key".into(),
            llm_endpoint: "https://api.openai.com/v1/chat/completions".into(),
            llm_model: "gpt-4o-mini".into(),
            llm_api_key: None,
        }
    }
}

/// Defaults, overridden by an optional `server.toml`, overridden by the
/// environment. Secrets (`ACCESS_KEY`, `LLM_API_KEY`) are read from the
/// environment only.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("server.toml") {
        apply_file_settings(&mut settings, &raw);
    }
    apply_env_settings(&mut settings);

    settings
}

fn apply_file_settings(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) else {
        return;
    };
    if let Some(v) = file_cfg.get("bind_addr") {
        settings.server_bind = v.clone();
    }
    if let Some(parsed) = file_cfg.get("pipeline").and_then(|v| parse_pipeline(v)) {
        settings.pipeline = parsed;
    }
    if let Some(v) = file_cfg.get("llm_endpoint") {
        settings.llm_endpoint = v.clone();
    }
    if let Some(v) = file_cfg.get("llm_model") {
        settings.llm_model = v.clone();
    }
}

fn apply_env_settings(settings: &mut Settings) {
    if let Ok(v) = std::env::var("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(parsed) = std::env::var("PIPELINE").ok().and_then(|v| parse_pipeline(&v)) {
        settings.pipeline = parsed;
    }
    if let Ok(v) = std::env::var("ACCESS_KEY") {
        settings.access_key = v;
    }
    if let Ok(v) = std::env::var("LLM_ENDPOINT") {
        settings.llm_endpoint = v;
    }
    if let Ok(v) = std::env::var("LLM_MODEL") {
        settings.llm_model = v;
    }
    if let Ok(v) = std::env::var("LLM_API_KEY") {
        settings.llm_api_key = Some(v);
    }
}

fn parse_pipeline(raw: &str) -> Option<PipelineKind> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "local" => Some(PipelineKind::Local),
        "remote" => Some(PipelineKind::Remote),
        _ => None,
    }
}

/// Startup validation: the access key must be set, and the remote pipeline
/// requires an upstream credential. Violations abort startup.
pub fn validate_settings(settings: &Settings) -> anyhow::Result<()> {
    if settings.access_key.trim().is_empty() {
        bail!("ACCESS_KEY must not be empty");
    }
    if settings.pipeline == PipelineKind::Remote {
        match settings.llm_api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => {}
            _ => bail!("remote pipeline selected but LLM_API_KEY is not set"),
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
