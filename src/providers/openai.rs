use serde::Deserialize;
use serde_json::json;

use super::retry::{RETRY_BASE_DELAY, is_transient, retry_after, wait_with_backoff};
use super::{ChatModel, CompletionFuture, CompletionRequest, GatewayError};
use crate::settings::Settings;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub(crate) const DEFAULT_MODEL: &str = "gpt-4";

#[derive(Debug, Clone)]
pub struct OpenAI {
    key: Option<String>,
    model: String,
    base_url: String,
    max_retries: usize,
    client: reqwest::Client,
}

impl OpenAI {
    /// A gateway without a key is still usable; every call fails with
    /// [`GatewayError::MissingApiKey`].
    pub fn new(key: Option<String>) -> Self {
        Self {
            key: key.filter(|value| !value.trim().is_empty()),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_retries: 0,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_settings(key: Option<String>, settings: &Settings) -> Self {
        Self::new(key)
            .with_model(settings.model.clone())
            .with_base_url(settings.base_url.clone())
            .with_max_retries(settings.max_retries)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if !model.trim().is_empty() {
            self.model = model;
        }
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let base_url = base_url.trim().trim_end_matches('/');
        if !base_url.is_empty() {
            self.base_url = base_url.to_string();
        }
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn has_key(&self) -> bool {
        self.key.is_some()
    }
}

impl ChatModel for OpenAI {
    fn complete(&self, request: CompletionRequest) -> CompletionFuture<'_> {
        Box::pin(async move {
            let key = self.key.as_deref().ok_or(GatewayError::MissingApiKey)?;
            let url = format!("{}/chat/completions", self.base_url);
            let body = json!({
                "model": self.model,
                "messages": [
                    {"role": "system", "content": request.system_prompt},
                    {"role": "user", "content": request.user_prompt}
                ],
                "max_tokens": request.max_tokens,
                "temperature": request.temperature
            });

            let mut attempt = 0usize;
            let mut delay = RETRY_BASE_DELAY;
            loop {
                attempt += 1;
                let response = match self
                    .client
                    .post(&url)
                    .bearer_auth(key)
                    .json(&body)
                    .send()
                    .await
                {
                    Ok(response) => response,
                    Err(err) if attempt <= self.max_retries => {
                        tracing::warn!("OpenAI request error: {}", err);
                        delay =
                            wait_with_backoff("OpenAI", attempt, self.max_retries, delay, None)
                                .await;
                        continue;
                    }
                    Err(err) => return Err(err.into()),
                };

                let status = response.status();
                let retry_after = retry_after(response.headers());
                let text = response.text().await.unwrap_or_default();
                if status.is_success() {
                    return extract_message_content(&text);
                }
                if is_transient(status, &text) && attempt <= self.max_retries {
                    delay = wait_with_backoff(
                        "OpenAI",
                        attempt,
                        self.max_retries,
                        delay,
                        retry_after,
                    )
                    .await;
                    continue;
                }
                return Err(GatewayError::Status {
                    status: status.as_u16(),
                    message: extract_openai_error(&text).unwrap_or(text),
                });
            }
        })
    }
}

fn extract_message_content(text: &str) -> Result<String, GatewayError> {
    let payload: ChatCompletionResponse = serde_json::from_str(text)
        .map_err(|err| GatewayError::Envelope(format!("invalid JSON envelope: {}", err)))?;
    payload
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .ok_or_else(|| GatewayError::Envelope("no message content returned".to_string()))
}

fn extract_openai_error(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<OpenAIError>,
    }

    #[derive(Deserialize)]
    struct OpenAIError {
        message: Option<String>,
        #[serde(rename = "type")]
        kind: Option<String>,
        code: Option<String>,
    }

    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    let error = parsed.error?;
    Some(format_error_parts(error.message, error.kind, error.code))
}

fn format_error_parts(
    message: Option<String>,
    kind: Option<String>,
    code: Option<String>,
) -> String {
    let mut parts = Vec::new();
    if let Some(message) = message.filter(|value| !value.trim().is_empty()) {
        parts.push(message);
    }
    if let Some(kind) = kind.filter(|value| !value.trim().is_empty()) {
        parts.push(format!("type: {}", kind));
    }
    if let Some(code) = code.filter(|value| !value.trim().is_empty()) {
        parts.push(format!("code: {}", code));
    }
    if parts.is_empty() {
        "unknown error".to_string()
    } else {
        parts.join(" | ")
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::post;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn request() -> CompletionRequest {
        CompletionRequest {
            system_prompt: "system".to_string(),
            user_prompt: "user".to_string(),
            max_tokens: 10,
            temperature: 0.0,
        }
    }

    async fn spawn_api(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn extracts_trimmed_message_content() {
        let payload = include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/openai_chat_response.json"
        ));
        let content = extract_message_content(payload).unwrap();
        assert!(content.starts_with("Here is the breakdown:"));
        assert!(content.ends_with("]]}"));
    }

    #[test]
    fn empty_choices_is_an_envelope_error() {
        let err = extract_message_content(r#"{"choices": []}"#).unwrap_err();
        assert!(matches!(err, GatewayError::Envelope(_)));
        let err = extract_message_content(r#"{"choices": [{"message": {"content": null}}]}"#)
            .unwrap_err();
        assert!(matches!(err, GatewayError::Envelope(_)));
        let err = extract_message_content("<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, GatewayError::Envelope(_)));
    }

    #[test]
    fn formats_api_error_body() {
        let body = r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error", "code": "invalid_api_key"}}"#;
        assert_eq!(
            extract_openai_error(body).as_deref(),
            Some("Incorrect API key provided | type: invalid_request_error | code: invalid_api_key")
        );
        assert_eq!(extract_openai_error("not json"), None);
        assert_eq!(
            extract_openai_error(r#"{"error": {}}"#).as_deref(),
            Some("unknown error")
        );
    }

    #[tokio::test]
    async fn missing_key_fails_without_network() {
        let gateway = OpenAI::new(Some("   ".to_string())).with_base_url("http://127.0.0.1:9");
        assert!(!gateway.has_key());
        let err = gateway.complete(request()).await.unwrap_err();
        assert!(matches!(err, GatewayError::MissingApiKey));
    }

    #[tokio::test]
    async fn sends_chat_request_and_returns_content() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|axum::Json(body): axum::Json<serde_json::Value>| async move {
                assert_eq!(body["model"], "gpt-4");
                assert_eq!(body["messages"][0]["role"], "system");
                assert_eq!(body["messages"][1]["content"], "user");
                assert_eq!(body["max_tokens"], 10);
                axum::Json(json!({
                    "choices": [{"message": {"role": "assistant", "content": "  {\"sentence\": {}}\n"}}]
                }))
            }),
        );
        let base = spawn_api(router).await;
        let gateway = OpenAI::new(Some("sk-test".to_string())).with_base_url(format!("{}/v1/", base));
        let content = gateway.complete(request()).await.unwrap();
        assert_eq!(content, "{\"sentence\": {}}");
    }

    #[tokio::test]
    async fn non_success_status_surfaces_api_message() {
        let router = Router::new().route(
            "/chat/completions",
            post(|| async {
                (
                    StatusCode::UNAUTHORIZED,
                    axum::Json(json!({"error": {"message": "bad key"}})),
                )
            }),
        );
        let base = spawn_api(router).await;
        let gateway = OpenAI::new(Some("sk-test".to_string())).with_base_url(base);
        match gateway.complete(request()).await.unwrap_err() {
            GatewayError::Status { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "bad key");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn retries_once_on_transient_failure() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/chat/completions",
            post(move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        (StatusCode::SERVICE_UNAVAILABLE, axum::Json(json!({})))
                    } else {
                        (
                            StatusCode::OK,
                            axum::Json(json!({"choices": [{"message": {"content": "{}"}}]})),
                        )
                    }
                }
            }),
        );
        let base = spawn_api(router).await;
        let gateway = OpenAI::new(Some("sk-test".to_string()))
            .with_base_url(base)
            .with_max_retries(1);
        let content = gateway.complete(request()).await.unwrap();
        assert_eq!(content, "{}");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn does_not_retry_without_budget() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/chat/completions",
            post(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    (StatusCode::SERVICE_UNAVAILABLE, "overloaded")
                }
            }),
        );
        let base = spawn_api(router).await;
        let gateway = OpenAI::new(Some("sk-test".to_string())).with_base_url(base);
        let err = gateway.complete(request()).await.unwrap_err();
        assert!(matches!(err, GatewayError::Status { status: 503, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
