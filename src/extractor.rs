use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::data_models::{
    Citation, Confidence, EntityType, LinkedEntity, SearchResponse, SearchResultItem,
};

static JSON_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```json\n(.*?)\n```").expect("json fence pattern is valid")
});
static ANY_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(.*?)```").expect("fence pattern is valid"));

/// Returns the inner text of the first ```json fenced block, or failing that
/// of the first fenced block of any kind.
pub fn find_fenced_block(text: &str) -> Option<&str> {
    JSON_FENCE
        .captures(text)
        .or_else(|| ANY_FENCE.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Builds a [`SearchResponse`] from raw model output.
///
/// Model output is unreliable, so nothing here fails: a missing block,
/// invalid JSON or an unexpected shape all produce an empty item list with
/// `raw_text` preserved for manual inspection. Every extracted item gets the
/// full list of citations that carry a uri.
pub fn extract(raw_text: &str, citations: &[Citation]) -> SearchResponse {
    let sources: Vec<Citation> = citations
        .iter()
        .filter(|c| !c.uri.is_empty())
        .cloned()
        .collect();

    let items = match find_fenced_block(raw_text) {
        Some(block) => parse_items(block)
            .into_iter()
            .map(|mut item| {
                item.sources = sources.clone();
                item
            })
            .collect(),
        None => {
            tracing::debug!("no fenced block in model output, returning raw text only");
            Vec::new()
        }
    };

    SearchResponse {
        items,
        raw_text: raw_text.to_string(),
        citations: citations.to_vec(),
    }
}

fn parse_items(block: &str) -> Vec<SearchResultItem> {
    let payload: Value = match serde_json::from_str(block) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("failed to parse JSON from model output: {e}");
            return Vec::new();
        }
    };

    let Some(items) = payload.get("items").and_then(Value::as_array) else {
        tracing::warn!("model output JSON has no `items` array");
        return Vec::new();
    };

    items
        .iter()
        .enumerate()
        .map(|(idx, value)| {
            // Anything that is not an object still yields an item, just an
            // empty one identified by its position.
            let raw = match value {
                Value::Object(_) => serde_json::from_value(value.clone()).unwrap_or_else(|e| {
                    tracing::warn!(index = idx, "malformed result item: {e}");
                    RawItem::default()
                }),
                _ => {
                    tracing::warn!(index = idx, "non-object result item");
                    RawItem::default()
                }
            };
            raw.into_item(idx)
        })
        .collect()
}

#[derive(Deserialize, Default)]
struct RawItem {
    #[serde(default, deserialize_with = "lenient_string")]
    id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    description: Option<String>,
    #[serde(rename = "mainData", default, deserialize_with = "lenient_string")]
    main_data: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<Value>,
    #[serde(rename = "linkedData", default)]
    linked_data: Option<Value>,
}

impl RawItem {
    fn into_item(self, idx: usize) -> SearchResultItem {
        SearchResultItem {
            id: self.id.unwrap_or_else(|| idx.to_string()),
            title: self.title.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            main_data: self.main_data.unwrap_or_default(),
            kind: entity_type(self.kind),
            linked_data: linked_entities(self.linked_data),
            sources: Vec::new(),
        }
    }
}

#[derive(Deserialize)]
struct RawLinked {
    #[serde(rename = "type", default)]
    kind: Option<Value>,
    #[serde(default, deserialize_with = "lenient_string")]
    value: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    confidence: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    source: Option<String>,
}

fn linked_entities(value: Option<Value>) -> Vec<LinkedEntity> {
    let Some(Value::Array(entries)) = value else {
        return Vec::new();
    };

    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<RawLinked>(entry) {
            Ok(raw) => Some(LinkedEntity {
                kind: entity_type(raw.kind),
                value: raw.value.unwrap_or_default(),
                confidence: confidence(raw.confidence),
                source: raw.source,
            }),
            Err(e) => {
                tracing::warn!("skipping malformed linked entity: {e}");
                None
            }
        })
        .collect()
}

fn entity_type(value: Option<Value>) -> EntityType {
    value
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_else(|| EntityType::Other(String::new()))
}

fn confidence(value: Option<String>) -> Confidence {
    value
        .and_then(|s| serde_json::from_value(Value::String(s.trim().to_lowercase())).ok())
        .unwrap_or_default()
}

/// Accepts any scalar so that `"id": 3` survives as `"3"`.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

#[test]
fn test_find_fenced_block_prefers_json_tag() {
    let text = "intro\n```\nplain\n```\nthen\n```json\n{\"items\":[]}\n```\n";
    assert_eq!(find_fenced_block(text), Some("{\"items\":[]}"));
}

#[test]
fn test_find_fenced_block_falls_back_to_untagged() {
    let text = "see ```{\"items\":[]}``` above";
    assert_eq!(find_fenced_block(text), Some("{\"items\":[]}"));
    assert_eq!(find_fenced_block("no fences here"), None);
}

#[test]
fn test_lenient_fields() {
    let block = r#"{"items":[{"id":7,"title":true,"linkedData":[{"type":"job","value":"Engineer","confidence":"HIGH"}]}]}"#;
    let items = parse_items(block);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, "7");
    assert_eq!(items[0].title, "true");
    assert_eq!(items[0].kind, EntityType::Other(String::new()));
    assert_eq!(items[0].linked_data[0].kind, EntityType::Other("job".into()));
    assert_eq!(items[0].linked_data[0].confidence, Confidence::High);
    assert_eq!(items[0].linked_data[0].source, None);
}
