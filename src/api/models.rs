use serde::{Deserialize, Serialize};

use crate::data_models::{DataType, SearchResponse};

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchReply {
    /// Query as sent to the backend, flags removed.
    pub query: String,
    pub data_type: DataType,
    pub response: SearchResponse,
    pub processing_time_ms: u128,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
