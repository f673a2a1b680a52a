use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::data_models::{DataType, SearchFilters};

/// What survives between runs: the last query, the selected type and the
/// filter toggles. Results are never persisted.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct UiState {
    pub query: String,
    pub data_type: DataType,
    pub filters: SearchFilters,
}

impl UiState {
    /// Filters and type go back to defaults. The query text is kept so it can
    /// be re-run with clean filters.
    pub fn reset_filters(&mut self) {
        self.filters = SearchFilters::default();
        self.data_type = DataType::All;
    }

    /// Filters actually sent with a search: the toggles plus the selected type.
    pub fn active_filters(&self) -> SearchFilters {
        self.filters.with_data_type(self.data_type)
    }

    fn from_value(value: &Value) -> UiState {
        UiState {
            query: field_or_default(value, "query"),
            data_type: field_or_default(value, "dataType"),
            filters: field_or_default(value, "filters"),
        }
    }
}

fn field_or_default<T>(value: &Value, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    match value.get(key) {
        Some(v) => serde_json::from_value(v.clone()).unwrap_or_else(|e| {
            tracing::warn!("stored `{key}` is malformed, using default: {e}");
            T::default()
        }),
        None => T::default(),
    }
}

/// JSON file holding a [`UiState`].
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes go to a sibling file first and are renamed into place, so a
    /// reader never sees a half-written state.
    fn tmp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }

    /// Never fails: anything unreadable falls back to defaults, field by field.
    pub fn load(&self) -> UiState {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Self::decode(&content),
            Err(e) => {
                tracing::debug!("no stored state at {}: {e}", self.path.display());
                UiState::default()
            }
        }
    }

    pub async fn load_async(&self) -> UiState {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Self::decode(&content),
            Err(e) => {
                tracing::debug!("no stored state at {}: {e}", self.path.display());
                UiState::default()
            }
        }
    }

    fn decode(content: &str) -> UiState {
        match serde_json::from_str::<Value>(content) {
            Ok(value) => UiState::from_value(&value),
            Err(e) => {
                tracing::warn!("stored state is not valid JSON, using defaults: {e}");
                UiState::default()
            }
        }
    }

    pub fn save(&self, state: &UiState) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating state directory {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(state)?;
        let tmp = self.tmp_path();
        std::fs::write(&tmp, json).with_context(|| format!("writing {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }

    pub async fn save_async(&self, state: &UiState) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating state directory {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(state)?;
        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, json)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("nope.json"));
        assert_eq!(store.load(), UiState::default());
    }

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("nested").join("state.json"));
        let state = UiState {
            query: "john_doe".to_string(),
            data_type: DataType::Username,
            filters: SearchFilters {
                deep_search: true,
                ..SearchFilters::default()
            },
        };
        store.save(&state).unwrap();
        assert_eq!(store.load(), state);
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        store.save(&UiState::default()).unwrap();
        store
            .save(&UiState {
                query: "second".to_string(),
                ..UiState::default()
            })
            .unwrap();

        assert_eq!(store.load().query, "second");
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("state.json")]);
    }

    #[test]
    fn test_malformed_filters_fail_open_per_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(
            &path,
            r#"{"query":"kept","dataType":"email","filters":"garbage"}"#,
        )
        .unwrap();

        let state = StateStore::new(&path).load();
        assert_eq!(state.query, "kept");
        assert_eq!(state.data_type, DataType::Email);
        assert_eq!(state.filters, SearchFilters::default());
    }

    #[test]
    fn test_unknown_type_and_partial_filters() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(
            &path,
            r#"{"dataType":"fax","filters":{"exactMatch":true}}"#,
        )
        .unwrap();

        let state = StateStore::new(&path).load();
        assert_eq!(state.query, "");
        assert_eq!(state.data_type, DataType::All);
        assert!(state.filters.exact_match);
        assert!(state.filters.include_socials);
        assert!(state.filters.cross_reference);
    }

    #[test]
    fn test_not_json_at_all() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{{{").unwrap();
        assert_eq!(StateStore::new(&path).load(), UiState::default());
    }

    #[test]
    fn test_reset_keeps_query() {
        let mut state = UiState {
            query: "report.pdf".to_string(),
            data_type: DataType::Text,
            filters: SearchFilters {
                exact_match: true,
                include_socials: false,
                ..SearchFilters::default()
            },
        };
        state.reset_filters();
        assert_eq!(state.query, "report.pdf");
        assert_eq!(state.data_type, DataType::All);
        assert_eq!(state.filters, SearchFilters::default());
    }

    #[test]
    fn test_active_filters_use_selected_type() {
        let state = UiState {
            data_type: DataType::Phone,
            ..UiState::default()
        };
        assert_eq!(state.active_filters().data_type, DataType::Phone);
    }
}
