use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use stitch_core::{
    CollectedData, ComposeError, Pattern, PatternComposer, Step, Turn,
};
use stitch_model::ModelProvider;

use crate::store::{MemorySessionStore, SessionId, SessionStore, StoreError};

/// Error returned by [`PatternService`].
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// No session is stored under the given id.
    #[error("session {0} not found")]
    SessionNotFound(SessionId),
    /// The session store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The pattern could not be composed. The dialogue state of the session
    /// was saved, so calling [`PatternService::advance`] again retries.
    #[error("session {session_id}: {source}")]
    Compose {
        /// The session, also when it was created by the failing call.
        session_id: SessionId,
        /// Why composition failed.
        #[source]
        source: ComposeError,
    },
}

impl ServiceError {
    /// The session the error belongs to, if one exists.
    pub fn session_id(&self) -> Option<SessionId> {
        match self {
            ServiceError::SessionNotFound(_) | ServiceError::Store(_) => None,
            ServiceError::Compose { session_id, .. } => Some(*session_id),
        }
    }
}

/// The outcome of one [`PatternService::advance`] call.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AdvanceResponse {
    /// The next question, or the closing message.
    pub response: String,
    /// Session the turn belongs to.
    pub session_id: SessionId,
    /// Step after the turn.
    pub current_step: Step,
    /// Everything learned so far.
    pub collected_data: CollectedData,
    /// The pattern, once the dialogue is complete.
    pub pattern: Option<Pattern>,
}

/// A read-only view of one session.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConversationSnapshot {
    /// Session id.
    pub session_id: SessionId,
    /// The transcript, oldest turn first.
    pub history: Vec<Turn>,
    /// Everything learned so far.
    pub collected_data: CollectedData,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
}

/// A builder for [`PatternService`].
pub struct PatternServiceBuilder {
    composer: PatternComposer,
    store: Option<Arc<dyn SessionStore>>,
}

impl PatternServiceBuilder {
    /// Creates a builder that composes patterns with `provider`.
    pub fn with_model_provider<P: ModelProvider + 'static>(provider: P) -> Self {
        Self {
            composer: PatternComposer::with_model_provider(provider),
            store: None,
        }
    }

    /// Sets the session store. Defaults to an unbounded
    /// [`MemorySessionStore`].
    #[inline]
    pub fn with_store<S: SessionStore + 'static>(mut self, store: S) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Builds the service.
    pub fn build(self) -> PatternService {
        PatternService {
            composer: self.composer,
            store: self
                .store
                .unwrap_or_else(|| Arc::new(MemorySessionStore::new())),
        }
    }
}

/// Runs dialogue turns against stored sessions.
///
/// Concurrent calls for the same session are not serialized; hosts that
/// allow them must queue them per session.
#[derive(Clone)]
pub struct PatternService {
    composer: PatternComposer,
    store: Arc<dyn SessionStore>,
}

impl PatternService {
    /// The text to display before the first turn.
    #[inline]
    pub fn greeting(&self) -> String {
        stitch_core::greeting()
    }

    /// Handles one user utterance.
    ///
    /// Without a session id a new session is created. Once the dialogue
    /// completes the pattern is composed and kept with the session, later
    /// calls return the same pattern. The dialogue state is stored before
    /// composing, so if composition fails the next call tries again.
    pub async fn advance(
        &self,
        session_id: Option<SessionId>,
        utterance: &str,
    ) -> Result<AdvanceResponse, ServiceError> {
        let (session_id, mut record) = match session_id {
            Some(id) => {
                let record = self.store.get(id).await?;
                (id, record.ok_or(ServiceError::SessionNotFound(id))?)
            }
            None => {
                let id = SessionId::new();
                info!(session = %id, "starting a new session");
                (id, self.store.get_or_create(id).await?)
            }
        };

        let response = record.state.advance(utterance);
        self.store.put(session_id, record.clone()).await?;

        if record.state.is_complete() && record.pattern.is_none() {
            let pattern = self
                .composer
                .compose(record.state.collected_data())
                .await
                .map_err(|source| {
                    error!(session = %session_id, "failed to compose: {source}");
                    ServiceError::Compose { session_id, source }
                })?;
            info!(session = %session_id, "pattern composed");
            record.pattern = Some(pattern);
            self.store.put(session_id, record.clone()).await?;
        }

        let current_step = record.state.current_step();
        Ok(AdvanceResponse {
            response,
            session_id,
            current_step,
            collected_data: record.state.collected_data().clone(),
            pattern: record.pattern,
        })
    }

    /// Returns the transcript and data of a session.
    pub async fn conversation(
        &self,
        session_id: SessionId,
    ) -> Result<ConversationSnapshot, ServiceError> {
        let record = self
            .store
            .get(session_id)
            .await?
            .ok_or(ServiceError::SessionNotFound(session_id))?;
        Ok(ConversationSnapshot {
            session_id,
            history: record.state.history().to_vec(),
            collected_data: record.state.collected_data().clone(),
            created_at: record.created_at,
        })
    }
}
