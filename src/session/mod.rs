// Session module
// One interactive session: the current document's collection and the answer history

pub mod history;


use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

use crate::FinWhizError;
use crate::assistant::Assistant;
use crate::database::CollectionHandle;
use crate::document::Document;

pub use history::{HistoryEntry, HistoryStore, export_file_name};

/// Explicit session context passed to every handler.
///
/// A handler that fails leaves the collection handle and the history exactly
/// as they were before the call.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    started_at: DateTime<Utc>,
    collection: Option<CollectionHandle>,
    history: HistoryStore,
}

impl Default for Session {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    #[inline]
    pub fn new() -> Self {
        let session = Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            collection: None,
            history: HistoryStore::new(),
        };
        info!("Started session {}", session.id);
        session
    }

    #[inline]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[inline]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Collection of the most recently uploaded document
    #[inline]
    pub fn collection(&self) -> Option<&CollectionHandle> {
        self.collection.as_ref()
    }

    #[inline]
    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Index `document` and make it the target of subsequent questions
    #[inline]
    pub fn upload(
        &mut self,
        assistant: &Assistant<'_>,
        document: &Document,
    ) -> crate::Result<&CollectionHandle> {
        let handle = assistant.index_document(document)?;
        info!("Session {} now answers from {}", self.id, document.name);
        let handle: &CollectionHandle = self.collection.insert(handle);
        Ok(handle)
    }

    /// Answer `question` from the current document and record it in the history
    #[inline]
    pub fn ask(
        &mut self,
        assistant: &Assistant<'_>,
        question: &str,
    ) -> crate::Result<&HistoryEntry> {
        let question = question.trim();
        if question.is_empty() {
            return Err(FinWhizError::InvalidInput(
                "Question must not be empty".to_string(),
            ));
        }
        let collection = self.collection.as_ref().ok_or(FinWhizError::NoDocument)?;

        let answer = assistant.answer(question, collection)?;
        self.history.append(question, answer);

        self.history.latest().ok_or_else(|| {
            FinWhizError::Other(anyhow::anyhow!("History entry was not recorded"))
        })
    }

    /// Export answer `n` (1 is the most recent) into `directory`
    #[inline]
    pub fn export(&self, n: usize, directory: &Path) -> crate::Result<PathBuf> {
        self.history.export_answer(n, directory)
    }
}
