//! Session storage: one [`SessionRecord`] per session id.

use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stitch_core::{ConversationState, Pattern};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Opaque identifier of a dialogue session.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a new random id.
    #[inline]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Everything stored for one session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Dialogue state.
    pub state: ConversationState,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// The composed pattern, once generation succeeded.
    pub pattern: Option<Pattern>,
}

impl SessionRecord {
    /// Creates a record holding a fresh dialogue.
    pub fn new() -> Self {
        Self {
            state: ConversationState::new(),
            created_at: Utc::now(),
            pattern: None,
        }
    }
}

impl Default for SessionRecord {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// Error from [`SessionStore`] operations.
#[derive(Debug, thiserror::Error)]
#[error("session store error: {0}")]
pub struct StoreError(pub String);

/// Storage for session records.
///
/// Implementations only need to keep each record intact. Callers serialize
/// the turns of one session themselves.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Loads the record of `id`, if it exists.
    async fn get(
        &self,
        id: SessionId,
    ) -> Result<Option<SessionRecord>, StoreError>;

    /// Inserts or replaces the record of `id`.
    async fn put(
        &self,
        id: SessionId,
        record: SessionRecord,
    ) -> Result<(), StoreError>;

    /// Loads the record of `id`, creating and storing a fresh one if there
    /// is none.
    async fn get_or_create(
        &self,
        id: SessionId,
    ) -> Result<SessionRecord, StoreError> {
        if let Some(record) = self.get(id).await? {
            return Ok(record);
        }
        let record = SessionRecord::new();
        self.put(id, record.clone()).await?;
        Ok(record)
    }
}

/// An in-process [`SessionStore`].
///
/// With a capacity set, storing a new session beyond it evicts the session
/// created first.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    records: Mutex<HashMap<SessionId, SessionRecord>>,
    max_sessions: Option<usize>,
}

impl MemorySessionStore {
    /// Creates an unbounded store.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that holds at most `max_sessions` sessions.
    #[inline]
    pub fn with_max_sessions(max_sessions: usize) -> Self {
        Self {
            records: Mutex::default(),
            max_sessions: Some(max_sessions.max(1)),
        }
    }

    /// Number of stored sessions.
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    /// Returns `true` if no session is stored.
    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(
        &self,
        id: SessionId,
    ) -> Result<Option<SessionRecord>, StoreError> {
        Ok(self.records.lock().await.get(&id).cloned())
    }

    async fn put(
        &self,
        id: SessionId,
        record: SessionRecord,
    ) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        let full = self
            .max_sessions
            .is_some_and(|max| records.len() >= max);
        if full && !records.contains_key(&id) {
            let oldest = records
                .iter()
                .min_by_key(|(_, record)| record.created_at)
                .map(|(id, _)| *id);
            if let Some(oldest) = oldest {
                debug!(session = %oldest, "evicting the oldest session");
                records.remove(&oldest);
            }
        }
        records.insert(id, record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn test_session_id_round_trip() {
        let id = SessionId::new();
        let parsed: SessionId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<SessionId>().is_err());
    }

    #[tokio::test]
    async fn test_get_or_create() {
        let store = MemorySessionStore::new();
        let id = SessionId::new();
        assert_eq!(store.get(id).await.unwrap(), None);

        let mut record = store.get_or_create(id).await.unwrap();
        assert_eq!(store.len().await, 1);

        record.state.advance("a red hat");
        store.put(id, record.clone()).await.unwrap();
        assert_eq!(store.get_or_create(id).await.unwrap(), record);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_evicts_oldest() {
        let store = MemorySessionStore::with_max_sessions(2);
        let ids = [SessionId::new(), SessionId::new(), SessionId::new()];
        let now = Utc::now();
        for (age, id) in ids.iter().enumerate() {
            let record = SessionRecord {
                created_at: now + Duration::seconds(age as i64),
                ..SessionRecord::new()
            };
            store.put(*id, record).await.unwrap();
        }

        assert_eq!(store.len().await, 2);
        assert!(store.get(ids[0]).await.unwrap().is_none());
        assert!(store.get(ids[1]).await.unwrap().is_some());
        assert!(store.get(ids[2]).await.unwrap().is_some());

        // Replacing an existing session never evicts.
        store.put(ids[1], SessionRecord::new()).await.unwrap();
        assert_eq!(store.len().await, 2);
        assert!(store.get(ids[2]).await.unwrap().is_some());
    }
}
