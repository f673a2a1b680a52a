use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::CONFIG;
use crate::data_models::{BackendReply, Citation, DataType, SearchFilters};
use crate::error::SearchError;

pub const FAST_MODEL: &str = "gemini-2.5-flash";
pub const DEEP_MODEL: &str = "gemini-3-pro-preview";
pub const DEEP_THINKING_BUDGET: u32 = 8192;
const TEMPERATURE: f32 = 0.1;
const DEFAULT_CITATION_TITLE: &str = "Source";

/// Anything that can answer a search query with model text plus citations.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &str, filters: &SearchFilters)
    -> Result<BackendReply, SearchError>;
}

/// Stands in for Gemini when no API key is configured so the rest of the
/// application still runs; every search reports the configuration error.
pub struct UnconfiguredBackend;

#[async_trait]
impl SearchBackend for UnconfiguredBackend {
    async fn search(
        &self,
        _query: &str,
        _filters: &SearchFilters,
    ) -> Result<BackendReply, SearchError> {
        Err(SearchError::MissingApiKey)
    }
}

/// Gemini when a key is configured, otherwise [`UnconfiguredBackend`].
pub fn backend_from_config() -> Arc<dyn SearchBackend> {
    match GeminiClient::from_config() {
        Ok(client) => Arc::new(client),
        Err(e) => {
            warn!("{e}; searches will fail until a key is set");
            Arc::new(UnconfiguredBackend)
        }
    }
}

pub struct GeminiClient {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_key: Option<&str>, base_url: &str) -> Result<Self, SearchError> {
        let api_key = api_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(SearchError::MissingApiKey)?;
        Ok(Self {
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        })
    }

    pub fn from_config() -> Result<Self, SearchError> {
        Self::new(CONFIG.gemini_api_key.as_deref(), &CONFIG.gemini_base_url)
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl SearchBackend for GeminiClient {
    async fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
    ) -> Result<BackendReply, SearchError> {
        let request = GenerateContentRequest::for_search(query, filters);
        let model = model_for(filters);
        info!(model, data_type = %filters.data_type, "sending search to Gemini");

        let response = self
            .http
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Backend { status, body });
        }

        let body = response.text().await?;
        let parsed: GenerateContentResponse =
            serde_json::from_str(&body).map_err(|e| SearchError::Decode(e.to_string()))?;
        let reply = parsed.into_reply();
        debug!(
            chars = reply.text.len(),
            citations = reply.citations.len(),
            "Gemini reply received"
        );
        Ok(reply)
    }
}

pub fn model_for(filters: &SearchFilters) -> &'static str {
    if filters.deep_search {
        DEEP_MODEL
    } else {
        FAST_MODEL
    }
}

pub fn thinking_budget_for(filters: &SearchFilters) -> Option<u32> {
    filters.deep_search.then_some(DEEP_THINKING_BUDGET)
}

fn strategy_for(data_type: DataType) -> &'static str {
    match data_type {
        DataType::Text => {
            "Find webpages, articles, PDFs or documents containing this exact text or title, \
             or about this exact subject. Discard loose matches."
        }
        DataType::Url => {
            "Analyse the URL: who owns it, what reputation the site has, and where it is \
             linked or discussed (forums, social media, news)."
        }
        DataType::All => {
            "Infer the intent first. A URL is analysed as a URL, a personal name as a person, \
             anything else as an identifier."
        }
        _ => {
            "Correlate the identifier with real-world identities, social profiles and public \
             records."
        }
    }
}

/// Builds the instruction text sent to the model. The output contract is a
/// single ```json fenced object with an `items` array.
pub fn build_prompt(query: &str, filters: &SearchFilters) -> String {
    let item_type = match filters.data_type {
        DataType::All => "inferred_type".to_string(),
        other => other.to_string(),
    };

    format!(
        r#"Act as an open source intelligence investigator with global reach.

Query: "{query}"
Target type hint: {data_type}

Settings:
- exact match: {exact}
- cross-reference: {cross}
- include social platforms: {socials}
- scope: every publicly indexed source (web, social, news, directories)

Strategy for this type: {strategy}

Steps:
1. Split the query into every identifier or key phrase it contains.
2. Search broadly for each of them.
3. Keep only well supported findings. When cross-reference is on, establish a link between the main parts of the query.
4. Group findings into distinct entities.

Reply with one valid JSON object inside a ```json fenced block shaped like:
{{
  "items": [
    {{
      "id": "unique id",
      "title": "page title, entity name or domain",
      "description": "summary of what was found",
      "mainData": "the matching text, url or identifier",
      "type": "{item_type}",
      "linkedData": [
        {{
          "type": "email | phone | address | social | job | alias | website | author | date",
          "value": "string value",
          "confidence": "high | medium | low",
          "source": "platform name"
        }}
      ]
    }}
  ]
}}

If nothing trustworthy turns up, return an empty items array. Never invent data."#,
        query = query,
        data_type = filters.data_type,
        exact = filters.exact_match,
        cross = filters.cross_reference,
        socials = filters.include_socials,
        strategy = strategy_for(filters.data_type),
        item_type = item_type,
    )
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub tools: Vec<Tool>,
    pub generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    pub fn for_search(query: &str, filters: &SearchFilters) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(build_prompt(query, filters)),
                    thought: None,
                }],
            }],
            tools: vec![Tool {
                google_search: GoogleSearch {},
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                thinking_config: thinking_budget_for(filters)
                    .map(|thinking_budget| ThinkingConfig { thinking_budget }),
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
pub struct GoogleSearch {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_config: Option<ThinkingConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingConfig {
    pub thinking_budget: u32,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    #[serde(default)]
    pub grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize, Default)]
pub struct GroundingChunk {
    #[serde(default)]
    pub web: Option<WebChunk>,
}

#[derive(Debug, Deserialize, Default)]
pub struct WebChunk {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first candidate (thought parts excluded) and its grounding
    /// citations.
    pub fn into_reply(self) -> BackendReply {
        let Some(candidate) = self.candidates.into_iter().next() else {
            return BackendReply::default();
        };

        let text = candidate
            .content
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter(|p| !p.thought.unwrap_or(false))
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        let citations = candidate
            .grounding_metadata
            .map(|g| {
                g.grounding_chunks
                    .into_iter()
                    .map(|chunk| {
                        let web = chunk.web.unwrap_or_default();
                        Citation {
                            uri: web.uri.unwrap_or_default(),
                            title: web
                                .title
                                .unwrap_or_else(|| DEFAULT_CITATION_TITLE.to_string()),
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        BackendReply { text, citations }
    }
}
