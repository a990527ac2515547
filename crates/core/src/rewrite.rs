use crate::naming::NameRewriter;
use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const PREFERRED_MODEL_HINT: &str = "flash";
const MAX_TITLE_CHARS: usize = 120;

#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("service answered with status {0}")]
    Status(u16),
    #[error("still rate limited after {0} retries")]
    RateLimited(u32),
    #[error("unexpected response: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone)]
pub struct RewriteSettings {
    pub endpoint: String,
    pub api_key: String,
    pub default_model: String,
    pub retry_pause: Duration,
    pub max_retries: u32,
    pub timeout: Duration,
}

impl RewriteSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: api_key.into(),
            default_model: "gemini-1.5-flash".to_string(),
            retry_pause: Duration::from_secs(20),
            max_retries: 3,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Per-run state for the remote rewrite service.
///
/// Created once and handed to [`RemoteRewriter`]; the model picked on first
/// use is cached here for the rest of the run.
pub struct RewriteSession {
    client: Client,
    settings: RewriteSettings,
    model: Option<String>,
}

impl RewriteSession {
    pub fn new(settings: RewriteSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("could not build HTTP client for the rewrite service")?;
        Ok(Self {
            client,
            settings,
            model: None,
        })
    }

    pub fn model(&mut self) -> &str {
        if self.model.is_none() {
            let picked = match self.list_models() {
                Ok(models) => pick_model(&models),
                Err(err) => {
                    warn!("could not list rewrite models, using default: {err}");
                    None
                }
            };
            let model = picked.unwrap_or_else(|| qualified_model(&self.settings.default_model));
            debug!("rewrite model selected: {model}");
            self.model = Some(model);
        }
        self.model.as_deref().unwrap_or_default()
    }

    fn list_models(&self) -> Result<Vec<ModelInfo>, RewriteError> {
        let response = self
            .client
            .get(format!("{}/models", self.settings.endpoint))
            .header("x-goog-api-key", &self.settings.api_key)
            .send()?;
        if !response.status().is_success() {
            return Err(RewriteError::Status(response.status().as_u16()));
        }
        let body = response.text()?;
        let listing = serde_json::from_str::<ModelListing>(&body)
            .map_err(|e| RewriteError::Malformed(e.to_string()))?;
        Ok(listing.models)
    }

    pub fn generate(&mut self, prompt: &str) -> Result<String, RewriteError> {
        let model = self.model().to_string();
        let url = format!("{}/{model}:generateContent", self.settings.endpoint);
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        for attempt in 0..=self.settings.max_retries {
            let response = self
                .client
                .post(&url)
                .header("x-goog-api-key", &self.settings.api_key)
                .json(&request)
                .send()?;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                if attempt < self.settings.max_retries {
                    warn!(
                        "rewrite service rate limited, retry {}/{} in {:?}",
                        attempt + 1,
                        self.settings.max_retries,
                        self.settings.retry_pause
                    );
                    thread::sleep(self.settings.retry_pause);
                    continue;
                }
                return Err(RewriteError::RateLimited(self.settings.max_retries));
            }
            if !status.is_success() {
                return Err(RewriteError::Status(status.as_u16()));
            }

            let body = response.text()?;
            return parse_generate_response(&body);
        }

        Err(RewriteError::RateLimited(self.settings.max_retries))
    }
}

/// Asks the remote model for a tidier folder title.
pub struct RemoteRewriter {
    session: RewriteSession,
}

impl RemoteRewriter {
    pub fn new(session: RewriteSession) -> Self {
        Self { session }
    }
}

impl NameRewriter for RemoteRewriter {
    fn rewrite(&mut self, text: &str) -> String {
        match self.session.generate(&title_prompt(text)) {
            Ok(answer) => accept_answer(text, &answer),
            Err(err) => {
                warn!("rewrite of {text:?} skipped: {err}");
                text.to_string()
            }
        }
    }
}

fn title_prompt(text: &str) -> String {
    format!(
        "Rewrite this photo folder name as a short, clean title. Fix spelling and \
         spacing, keep the original language, do not add dates or quotes. \
         Answer with the title only.\n\n{text}"
    )
}

/// Falls back to the original unless the answer is a single short line.
fn accept_answer(original: &str, answer: &str) -> String {
    let trimmed = answer
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '`')
        .trim();
    if trimmed.is_empty()
        || trimmed.contains('\n')
        || trimmed.chars().count() > MAX_TITLE_CHARS
    {
        return original.to_string();
    }
    trimmed.to_string()
}

fn qualified_model(name: &str) -> String {
    if name.starts_with("models/") {
        name.to_string()
    } else {
        format!("models/{name}")
    }
}

fn pick_model(models: &[ModelInfo]) -> Option<String> {
    let usable: Vec<&ModelInfo> = models
        .iter()
        .filter(|m| {
            m.supported_generation_methods
                .iter()
                .any(|method| method == "generateContent")
        })
        .collect();
    usable
        .iter()
        .find(|m| m.name.contains(PREFERRED_MODEL_HINT))
        .or_else(|| usable.first())
        .map(|m| qualified_model(&m.name))
}

fn parse_generate_response(body: &str) -> Result<String, RewriteError> {
    let parsed = serde_json::from_str::<GenerateResponse>(body)
        .map_err(|e| RewriteError::Malformed(e.to_string()))?;
    parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|content| content.parts.into_iter().find_map(|p| p.text))
        .ok_or_else(|| RewriteError::Malformed("no candidate text".to_string()))
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelListing {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelInfo {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}
