use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of identifier a query targets.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    All,
    Username,
    Email,
    Phone,
    Address,
    Social,
    Text,
    Url,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::All => "all",
            DataType::Username => "username",
            DataType::Email => "email",
            DataType::Phone => "phone",
            DataType::Address => "address",
            DataType::Social => "social",
            DataType::Text => "text",
            DataType::Url => "url",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchFilters {
    pub data_type: DataType,
    pub exact_match: bool,
    pub include_socials: bool,
    pub deep_search: bool,
    pub cross_reference: bool,
}

impl Default for SearchFilters {
    fn default() -> Self {
        SearchFilters {
            data_type: DataType::All,
            exact_match: false,
            include_socials: true,
            deep_search: false,
            cross_reference: true,
        }
    }
}

impl SearchFilters {
    pub fn with_data_type(self, data_type: DataType) -> Self {
        SearchFilters { data_type, ..self }
    }
}

/// Type of a linked fact. Models reuse the query data types but also invent
/// subtypes such as `job` or `alias`, which are kept verbatim.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum EntityType {
    Known(DataType),
    Other(String),
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityType::Known(t) => t.fmt(f),
            EntityType::Other(s) => f.write_str(s),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
    #[default]
    #[serde(other)]
    Unknown,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
            Confidence::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LinkedEntity {
    #[serde(rename = "type")]
    pub kind: EntityType,
    pub value: String,
    pub confidence: Confidence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// A (uri, title) pair reported by the backend as supporting evidence.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    pub uri: String,
    pub title: String,
}

impl Citation {
    pub fn new(uri: impl Into<String>, title: impl Into<String>) -> Citation {
        Citation {
            uri: uri.into(),
            title: title.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub main_data: String,
    #[serde(rename = "type")]
    pub kind: EntityType,
    pub linked_data: Vec<LinkedEntity>,
    pub sources: Vec<Citation>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub items: Vec<SearchResultItem>,
    /// Unparsed model output, kept for display when nothing could be extracted.
    pub raw_text: String,
    pub citations: Vec<Citation>,
}

impl SearchResponse {
    pub fn is_structured(&self) -> bool {
        !self.items.is_empty()
    }
}

/// What a search backend hands back before extraction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BackendReply {
    pub text: String,
    pub citations: Vec<Citation>,
}
