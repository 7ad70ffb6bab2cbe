//! Client for a HuggingFace-style text-generation inference API. The relay
//! treats it as an opaque content source: prompt in, post text out.

use crate::http;
use crate::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Deserialize, Clone)]
pub(crate) struct Config {
    #[serde(default = "default_api_url")]
    pub(crate) api_url: url::Url,

    pub(crate) api_key: String,

    #[serde(default = "default_model")]
    pub(crate) model: String,

    #[serde(default = "default_prompt")]
    pub(crate) prompt: String,

    #[serde(default = "default_max_length")]
    pub(crate) max_length: u32,

    #[serde(default = "default_temperature")]
    pub(crate) temperature: f64,
}

fn default_api_url() -> url::Url {
    "https://api-inference.huggingface.co"
        .parse()
        .expect("BUG: hardcoded URL is valid")
}

fn default_model() -> String {
    "gpt2".to_owned()
}

fn default_prompt() -> String {
    "Write an interesting post for a Telegram channel.".to_owned()
}

fn default_max_length() -> u32 {
    100
}

fn default_temperature() -> f64 {
    0.7
}

#[derive(Debug, Error)]
pub(crate) enum GenError {
    #[error("The inference API returned no completions")]
    EmptyCompletion,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    inputs: &'a str,
    parameters: GenerateParameters,
}

#[derive(Serialize)]
struct GenerateParameters {
    max_length: u32,
    temperature: f64,
}

#[derive(Deserialize)]
struct Completion {
    generated_text: String,
}

pub(crate) struct Client {
    cfg: Config,
    http: http::Client,
}

impl Client {
    pub(crate) fn new(cfg: Config, http: http::Client) -> Self {
        Self { cfg, http }
    }

    #[instrument(skip_all)]
    pub(crate) async fn generate(&self) -> Result<String> {
        let mut url = self.cfg.api_url.clone();
        url.path_segments_mut()
            .map_err(|()| fatal!("Inference API base URL cannot be a base"))?
            .extend(["models", self.cfg.model.as_str()]);

        let request = GenerateRequest {
            inputs: &self.cfg.prompt,
            parameters: GenerateParameters {
                max_length: self.cfg.max_length,
                temperature: self.cfg.temperature,
            },
        };

        let completions: Vec<Completion> = self
            .http
            .post(url)
            .bearer_auth(&self.cfg.api_key)
            .send_and_read_json(request)
            .await?;

        let completion = completions
            .into_iter()
            .next()
            .ok_or_else(|| err!(GenError::EmptyCompletion))?;

        Ok(completion.generated_text.trim().to_owned())
    }
}
