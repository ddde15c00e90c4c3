//! Process-lifetime log of successful analyses, newest first.

use std::collections::VecDeque;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::capture::CroppedImage;

const COLLAPSED_PREVIEW_CHARS: usize = 120;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const COLLAPSE_HINT: &str = "Tap to collapse";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct HistoryId(Uuid);

impl HistoryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for HistoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for HistoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    id: HistoryId,
    image: CroppedImage,
    answer_text: String,
    created_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(image: CroppedImage, answer_text: impl Into<String>) -> Self {
        Self {
            id: HistoryId::new(),
            image,
            answer_text: answer_text.into(),
            created_at: Utc::now(),
        }
    }

    pub const fn id(&self) -> HistoryId {
        self.id
    }

    pub const fn image(&self) -> &CroppedImage {
        &self.image
    }

    pub fn answer_text(&self) -> &str {
        &self.answer_text
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn summary(&self) -> HistoryEntrySummary {
        HistoryEntrySummary {
            id: self.id,
            answer_text: self.answer_text.clone(),
            created_at: self.created_at(),
            image_width: self.image.width(),
            image_height: self.image.height(),
            image_bytes: self.image.bytes().len(),
        }
    }
}

/// Serializable view of an entry without the image payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntrySummary {
    pub id: HistoryId,
    pub answer_text: String,
    pub created_at: DateTime<Utc>,
    pub image_width: u32,
    pub image_height: u32,
    pub image_bytes: usize,
}

#[derive(Debug, Default)]
pub struct HistoryStore {
    entries: VecDeque<HistoryEntry>,
    expanded: Option<HistoryId>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts at the front. Entries are never deduplicated or rewritten.
    pub fn append(&mut self, entry: HistoryEntry) {
        tracing::debug!(id = %entry.id, total = self.entries.len() + 1, "history entry added");
        self.entries.push_front(entry);
    }

    /// Expands `id`, or collapses it if it is already the expanded entry.
    pub fn toggle_expanded(&mut self, id: HistoryId) {
        self.expanded = match self.expanded {
            Some(current) if current == id => None,
            _ => Some(id),
        };
    }

    pub const fn expanded(&self) -> Option<HistoryId> {
        self.expanded
    }

    pub fn is_expanded(&self, id: HistoryId) -> bool {
        self.expanded == Some(id)
    }

    pub fn entries(&self) -> impl ExactSizeIterator<Item = &HistoryEntry> + '_ {
        self.entries.iter()
    }

    pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn rows(&self) -> Vec<HistoryRow<'_>> {
        self.entries
            .iter()
            .map(|entry| HistoryRow::new(entry, self.is_expanded(entry.id)))
            .collect()
    }
}

/// One entry as the history screen presents it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRow<'a> {
    pub id: HistoryId,
    pub image: &'a CroppedImage,
    pub expanded: bool,
    /// Full answer when expanded, shortened preview otherwise.
    pub text: String,
    pub timestamp: Option<String>,
    pub hint: Option<&'static str>,
}

impl<'a> HistoryRow<'a> {
    fn new(entry: &'a HistoryEntry, expanded: bool) -> Self {
        if expanded {
            Self {
                id: entry.id,
                image: &entry.image,
                expanded,
                text: entry.answer_text.clone(),
                timestamp: Some(
                    entry
                        .created_at()
                        .with_timezone(&Local)
                        .format(TIMESTAMP_FORMAT)
                        .to_string(),
                ),
                hint: Some(COLLAPSE_HINT),
            }
        } else {
            Self {
                id: entry.id,
                image: &entry.image,
                expanded,
                text: preview_text(&entry.answer_text, COLLAPSED_PREVIEW_CHARS),
                timestamp: None,
                hint: None,
            }
        }
    }
}

pub fn preview_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
