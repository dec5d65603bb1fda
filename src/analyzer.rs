use std::sync::Arc;
use tracing::{error, info};

use crate::breakdown::{self, BreakdownError, NormalizeOptions, OrderedBreakdown};
use crate::languages::Language;
use crate::prompts::{self, SYSTEM_PROMPT};
use crate::providers::{ChatModel, CompletionRequest};
use crate::settings::Settings;

/// Runs one sentence through prompt, model, extraction and normalization.
#[derive(Clone)]
pub struct Analyzer {
    model: Arc<dyn ChatModel>,
    settings: Settings,
}

impl Analyzer {
    pub fn new(model: Arc<dyn ChatModel>, settings: Settings) -> Self {
        Self { model, settings }
    }

    pub async fn analyze(
        &self,
        sentence: &str,
        language: Language,
    ) -> Result<OrderedBreakdown, BreakdownError> {
        let user_prompt = prompts::build_prompt(sentence, language)
            .map_err(|err| BreakdownError::Unexpected(format!("{:#}", err)))?;
        let request = CompletionRequest {
            system_prompt: SYSTEM_PROMPT.to_string(),
            user_prompt,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };

        let timeout = self.settings.timeout;
        let raw = tokio::time::timeout(timeout, self.model.complete(request))
            .await
            .map_err(|_| BreakdownError::UpstreamTimeout(timeout))??;
        info!(%language, "raw model reply: {}", raw);

        let payload = breakdown::extract(&raw)
            .inspect_err(|err| error!("{}; raw reply: {}", err, raw))?;
        let options = NormalizeOptions {
            validate_relationship_matrix: self.settings.validate_relationship_matrix,
        };
        breakdown::normalize(&payload, options)
            .inspect_err(|err| error!("failed to normalize model reply: {}; payload: {}", err, payload))
    }
}
