use axum::http::StatusCode;
use tracing::error;

use super::models::{BreakdownRequest, ErrorResponse};
use super::state::ServerState;
use crate::breakdown::{BreakdownError, OrderedBreakdown};
use crate::languages::Language;

const DECODE_ERROR: &str = "Failed to parse JSON from OpenAI response";
const UPSTREAM_ERROR: &str = "Failed to get a response from the language model";
const TIMEOUT_ERROR: &str = "Timed out waiting for the language model";
const INVALID_BREAKDOWN_ERROR: &str = "The language model returned an invalid breakdown";
const INTERNAL_ERROR: &str = "Internal server error";

#[derive(Debug)]
pub(crate) struct ServerError {
    pub(crate) status: StatusCode,
    pub(crate) message: String,
    pub(crate) details: Option<String>,
}

impl ServerError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: None,
        }
    }

    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub(crate) fn into_body(self) -> (StatusCode, ErrorResponse) {
        (
            self.status,
            ErrorResponse {
                error: self.message,
                details: self.details,
            },
        )
    }
}

impl From<BreakdownError> for ServerError {
    fn from(err: BreakdownError) -> Self {
        match err {
            BreakdownError::Validation => ServerError::bad_request(err.to_string()),
            BreakdownError::NoJsonFound => ServerError::internal(err.to_string()),
            BreakdownError::JsonDecode { message, .. } => {
                ServerError::internal(DECODE_ERROR).with_details(message)
            }
            BreakdownError::UpstreamTimeout(_) => {
                ServerError::new(StatusCode::GATEWAY_TIMEOUT, TIMEOUT_ERROR)
            }
            BreakdownError::Upstream(_) => ServerError::internal(UPSTREAM_ERROR),
            BreakdownError::UnexpectedShape { .. }
            | BreakdownError::MissingPosition { .. }
            | BreakdownError::InvalidPosition { .. }
            | BreakdownError::InvalidMatrix { .. } => {
                ServerError::internal(INVALID_BREAKDOWN_ERROR)
            }
            BreakdownError::Unexpected(_) => ServerError::internal(INTERNAL_ERROR),
        }
    }
}

/// Rejects blank sentences and languages other than Turkish or Italian.
pub(crate) fn validate_request(
    request: &BreakdownRequest,
) -> Result<(&str, Language), BreakdownError> {
    let sentence = request.sentence.as_deref().unwrap_or_default().trim();
    let language = request
        .language
        .as_deref()
        .and_then(Language::parse)
        .ok_or(BreakdownError::Validation)?;
    if sentence.is_empty() {
        return Err(BreakdownError::Validation);
    }
    Ok((sentence, language))
}

pub(crate) async fn breakdown_request(
    state: &ServerState,
    request: BreakdownRequest,
) -> Result<OrderedBreakdown, ServerError> {
    let (sentence, language) = validate_request(&request)?;
    state
        .analyzer
        .analyze(sentence, language)
        .await
        .map_err(|err| {
            error!("grammar breakdown failed: {}", err);
            ServerError::from(err)
        })
}
