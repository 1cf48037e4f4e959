//! Artifact composition through a text-generation model.

use stitch_model::{ErrorKind, ModelFinishReason, ModelProvider, ModelRequest};
use thiserror::Error;

use crate::model_client::ModelClient;
use crate::pattern::{self, Pattern};
use crate::slot::CollectedData;

/// Error returned by [`PatternComposer`].
#[derive(Debug, Error)]
pub enum ComposeError {
    /// The model provider failed.
    #[error("pattern generation failed ({kind}): {message}")]
    Generation {
        /// Kind reported by the provider.
        kind: ErrorKind,
        /// Provider message.
        message: String,
    },
    /// The model replied with nothing usable.
    #[error("the model returned an empty reply")]
    EmptyResponse,
}

impl ComposeError {
    /// Returns `true` if sending the same request again may succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            ComposeError::Generation {
                kind: ErrorKind::Moderated,
                ..
            }
        )
    }
}

/// Turns collected data into a [`Pattern`] by asking a model to write it.
#[derive(Clone)]
pub struct PatternComposer {
    model_client: ModelClient,
}

impl PatternComposer {
    /// Creates a composer backed by `provider`.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(provider: P) -> Self {
        Self {
            model_client: ModelClient::new(provider),
        }
    }

    /// Generates one free-text completion.
    pub async fn generate_text(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, ComposeError> {
        let req = ModelRequest::with_prompts(system_prompt, user_prompt);
        let completion =
            self.model_client.send_request(req).await.map_err(|err| {
                ComposeError::Generation {
                    kind: err.kind(),
                    message: err.to_string(),
                }
            })?;
        if completion
            .finish_reason
            .is_some_and(ModelFinishReason::is_truncated)
        {
            warn!(
                len = completion.text.len(),
                "model reply was cut off by the token limit"
            );
        }
        Ok(completion.text)
    }

    /// Writes the pattern for `data`.
    pub async fn compose(
        &self,
        data: &CollectedData,
    ) -> Result<Pattern, ComposeError> {
        debug!(slots = data.len(), "composing pattern");
        let reply = self
            .generate_text(&pattern::system_prompt(), &pattern::user_prompt(data))
            .await?;
        pattern::parse_reply(data, &reply).ok_or(ComposeError::EmptyResponse)
    }
}
