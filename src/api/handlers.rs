use axum::{Json, extract::State, http::StatusCode};
use std::sync::Arc;
use std::time::Instant;

use crate::data_models::SearchFilters;
use crate::error::SearchError;
use crate::session::{SearchOutcome, SearchSession};
use crate::state::UiState;

use super::models::{ErrorBody, SearchReply, SearchRequest};

type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

fn search_error(err: SearchError) -> ApiError {
    let status = match err {
        SearchError::MissingApiKey => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_GATEWAY,
    };
    api_error(status, err.advisory())
}

pub async fn search_handler(
    State(session): State<Arc<SearchSession>>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchReply>, ApiError> {
    let start = Instant::now();

    if request.query.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Query cannot be empty"));
    }

    match session.search(&request.query).await.map_err(search_error)? {
        SearchOutcome::Completed {
            query,
            data_type,
            response,
        } => Ok(Json(SearchReply {
            query,
            data_type,
            response: response.as_ref().clone(),
            processing_time_ms: start.elapsed().as_millis(),
        })),
        SearchOutcome::Skipped => Err(api_error(
            StatusCode::BAD_REQUEST,
            "Query contains only flags",
        )),
        SearchOutcome::Superseded => Err(api_error(
            StatusCode::CONFLICT,
            "Superseded by a newer query",
        )),
    }
}

pub async fn state_handler(State(session): State<Arc<SearchSession>>) -> Json<UiState> {
    Json(session.state().await)
}

pub async fn update_filters_handler(
    State(session): State<Arc<SearchSession>>,
    Json(filters): Json<SearchFilters>,
) -> Json<UiState> {
    Json(session.update_filters(filters).await)
}

pub async fn reset_handler(State(session): State<Arc<SearchSession>>) -> Json<UiState> {
    Json(session.reset_filters().await)
}
