
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::FinWhizError;

/// One answered question
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub question: String,
    pub answer: String,
    pub asked_at: DateTime<Utc>,
}

/// Append-only record of a session's questions and answers
#[derive(Debug, Clone, Default)]
pub struct HistoryStore {
    // Oldest first
    entries: Vec<HistoryEntry>,
}

impl HistoryStore {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn append(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.entries.push(HistoryEntry {
            question: question.into(),
            answer: answer.into(),
            asked_at: Utc::now(),
        });
    }

    #[inline]
    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    /// Entries most recent first
    #[inline]
    pub fn list(&self) -> impl ExactSizeIterator<Item = &HistoryEntry> {
        self.entries.iter().rev()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry `n`, counting from 1 at the most recent
    #[inline]
    pub fn entry(&self, n: usize) -> Option<&HistoryEntry> {
        n.checked_sub(1).and_then(|offset| self.list().nth(offset))
    }

    /// Write the answer of entry `n` to `finwhiz_response_<n>.txt` in `directory`
    #[inline]
    pub fn export_answer(&self, n: usize, directory: &Path) -> crate::Result<PathBuf> {
        let entry = self.entry(n).ok_or_else(|| {
            FinWhizError::InvalidInput(format!(
                "No history entry {} (history holds {})",
                n,
                self.len()
            ))
        })?;

        fs::create_dir_all(directory)?;
        let path = directory.join(export_file_name(n));
        fs::write(&path, &entry.answer)?;

        info!("Exported answer {} to {}", n, path.display());
        Ok(path)
    }
}

#[inline]
pub fn export_file_name(n: usize) -> String {
    format!("finwhiz_response_{}.txt", n)
}
