use thiserror::Error;

pub const BACKEND_ADVISORY: &str =
    "Intelligence gathering failed. Please check your connection or API key quota.";

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("no Gemini API key configured (set GEMINI_API_KEY)")]
    MissingApiKey,

    #[error("request to search backend failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("search backend returned {status}: {body}")]
    Backend { status: u16, body: String },

    #[error("could not decode search backend reply: {0}")]
    Decode(String),
}

impl SearchError {
    /// Configuration problems fail every search until the operator fixes them.
    pub fn is_configuration(&self) -> bool {
        matches!(self, SearchError::MissingApiKey)
    }

    /// Message suitable for showing to an end user.
    pub fn advisory(&self) -> String {
        if self.is_configuration() {
            self.to_string()
        } else {
            BACKEND_ADVISORY.to_string()
        }
    }
}
