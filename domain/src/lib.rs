//! Domain library for the Notes API.
//!
//! This crate holds the domain types, the repository port (trait), and error
//! definitions. Keep IO concerns out of this crate; the only adapter living
//! here is the in-memory repository.

use std::time::SystemTime;

use thiserror::Error;
use uuid::Uuid;

/// Server-generated identifier of a note.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NoteId(String);

impl NoteId {
    pub fn new<S: Into<String>>(s: S) -> Result<Self, CoreError> {
        let val = s.into();
        if val.is_empty() {
            return Err(CoreError::Validation("note id is empty".into()));
        }
        Ok(Self(val))
    }

    /// Fresh random (v4) identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Client-supplied fields for creating or replacing a note.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NoteDraft {
    pub title: String,
    pub description: String,
}

impl NoteDraft {
    pub fn new<T: Into<String>, D: Into<String>>(title: T, description: D) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Stored note.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub description: String,
    /// Set by the repository on create and on every update.
    pub created_on: SystemTime,
}

impl Note {
    /// Build a note from a draft; the caller supplies id and timestamp.
    pub fn from_draft(id: NoteId, draft: NoteDraft, created_on: SystemTime) -> Self {
        Self {
            id,
            title: draft.title,
            description: draft.description,
            created_on,
        }
    }

    /// ASCII case-insensitive substring match on title or description.
    /// An empty filter matches every note.
    pub fn matches(&self, filter: &str) -> bool {
        if filter.is_empty() {
            return true;
        }
        let needle = filter.to_ascii_lowercase();
        self.title.to_ascii_lowercase().contains(&needle)
            || self.description.to_ascii_lowercase().contains(&needle)
    }
}

/// Time source abstraction to make code testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

/// Wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Repository port for persisting and loading notes.
///
/// Every backend must reject duplicate titles with [`CoreError::TitleConflict`]
/// and report absent ids with [`CoreError::NotFound`].
pub trait NoteRepository: Send + Sync {
    /// Seed the store with [`sample_notes`].
    fn populate(&self) -> Result<(), CoreError>;
    /// Persist a new note under a freshly generated id and return that id.
    fn create(&self, draft: NoteDraft) -> Result<NoteId, CoreError>;
    /// Replace title and description of an existing note, refreshing its timestamp.
    fn update(&self, id: &NoteId, draft: NoteDraft) -> Result<(), CoreError>;
    /// Hard delete.
    fn delete(&self, id: &NoteId) -> Result<(), CoreError>;
    fn get_by_id(&self, id: &NoteId) -> Result<Note, CoreError>;
    /// Notes whose title or description contains `filter`, ordered by
    /// `created_on` then title. An empty result is `NotFound`.
    fn get_all(&self, filter: &str) -> Result<Vec<Note>, CoreError>;
}

/// Notes written by `populate()`.
pub fn sample_notes() -> Vec<NoteDraft> {
    vec![
        NoteDraft::new("slog", "slog is a logging package"),
        NoteDraft::new("viper", "viper is a configuration management package"),
    ]
}

/// Core domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("note doesn't exist")]
    NotFound,
    #[error("note title exists")]
    TitleConflict,
    #[error("invalid note: {0}")]
    Validation(String),
    #[error("storage error: {0}")]
    Storage(String),
}

pub mod adapters;
pub mod validate;
