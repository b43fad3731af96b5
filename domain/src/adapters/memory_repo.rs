use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::validate::validate_draft;
use crate::{
    sample_notes, Clock, CoreError, Note, NoteDraft, NoteId, NoteRepository, SystemClock,
};

/// Map-backed note repository; contents are lost on restart.
///
/// Reads share the lock, writes hold it exclusively for the whole operation
/// so the title scan and the insert in `create` are atomic.
pub struct InMemoryNoteRepo<C: Clock = SystemClock> {
    inner: RwLock<BTreeMap<String, Note>>,
    clock: C,
}

impl InMemoryNoteRepo {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for InMemoryNoteRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> InMemoryNoteRepo<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            inner: RwLock::new(BTreeMap::new()),
            clock,
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, Note>>, CoreError> {
        self.inner
            .read()
            .map_err(|_| CoreError::Storage("lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, Note>>, CoreError> {
        self.inner
            .write()
            .map_err(|_| CoreError::Storage("lock poisoned".into()))
    }
}

fn title_taken(map: &BTreeMap<String, Note>, title: &str, except: Option<&NoteId>) -> bool {
    map.values()
        .any(|n| n.title == title && Some(&n.id) != except)
}

impl<C: Clock> NoteRepository for InMemoryNoteRepo<C> {
    fn populate(&self) -> Result<(), CoreError> {
        for draft in sample_notes() {
            self.create(draft)?;
        }
        Ok(())
    }

    fn create(&self, draft: NoteDraft) -> Result<NoteId, CoreError> {
        validate_draft(&draft)?;
        let mut map = self.write()?;
        if title_taken(&map, &draft.title, None) {
            return Err(CoreError::TitleConflict);
        }
        let id = NoteId::generate();
        if map.contains_key(id.as_str()) {
            return Err(CoreError::Storage("generated id already in use".into()));
        }
        let note = Note::from_draft(id.clone(), draft, self.clock.now());
        map.insert(id.as_str().to_string(), note);
        Ok(id)
    }

    fn update(&self, id: &NoteId, draft: NoteDraft) -> Result<(), CoreError> {
        validate_draft(&draft)?;
        let mut map = self.write()?;
        if !map.contains_key(id.as_str()) {
            return Err(CoreError::NotFound);
        }
        if title_taken(&map, &draft.title, Some(id)) {
            return Err(CoreError::TitleConflict);
        }
        let now = self.clock.now();
        match map.get_mut(id.as_str()) {
            Some(note) => {
                note.title = draft.title;
                note.description = draft.description;
                note.created_on = now;
                Ok(())
            }
            None => Err(CoreError::NotFound),
        }
    }

    fn delete(&self, id: &NoteId) -> Result<(), CoreError> {
        let mut map = self.write()?;
        match map.remove(id.as_str()) {
            Some(_) => Ok(()),
            None => Err(CoreError::NotFound),
        }
    }

    fn get_by_id(&self, id: &NoteId) -> Result<Note, CoreError> {
        let map = self.read()?;
        map.get(id.as_str()).cloned().ok_or(CoreError::NotFound)
    }

    fn get_all(&self, filter: &str) -> Result<Vec<Note>, CoreError> {
        let map = self.read()?;
        let mut notes: Vec<Note> = map.values().filter(|n| n.matches(filter)).cloned().collect();
        if notes.is_empty() {
            return Err(CoreError::NotFound);
        }
        notes.sort_by(|a, b| {
            a.created_on
                .cmp(&b.created_on)
                .then_with(|| a.title.cmp(&b.title))
        });
        Ok(notes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    /// Advances one second per call.
    struct StepClock(AtomicU64);

    impl StepClock {
        fn new() -> Self {
            Self(AtomicU64::new(1_700_000_000))
        }
    }

    impl Clock for StepClock {
        fn now(&self) -> SystemTime {
            UNIX_EPOCH + Duration::from_secs(self.0.fetch_add(1, Ordering::Relaxed))
        }
    }

    fn repo() -> InMemoryNoteRepo<StepClock> {
        InMemoryNoteRepo::with_clock(StepClock::new())
    }

    #[test]
    fn create_then_get_roundtrip() {
        let repo = repo();
        let id = repo.create(NoteDraft::new("tokio", "async runtime")).unwrap();
        let got = repo.get_by_id(&id).unwrap();
        assert_eq!(got.id, id);
        assert_eq!(got.title, "tokio");
        assert_eq!(got.description, "async runtime");
        assert_eq!(got.created_on, UNIX_EPOCH + Duration::from_secs(1_700_000_000));
    }

    #[test]
    fn create_assigns_fresh_ids() {
        let repo = repo();
        let a = repo.create(NoteDraft::new("a", "")).unwrap();
        let b = repo.create(NoteDraft::new("b", "")).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn duplicate_title_is_rejected_and_store_unchanged() {
        let repo = repo();
        repo.create(NoteDraft::new("dup", "first")).unwrap();
        let err = repo.create(NoteDraft::new("dup", "second")).unwrap_err();
        assert!(matches!(err, CoreError::TitleConflict));
        let all = repo.get_all("dup").unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].description, "first");
    }

    #[test]
    fn title_uniqueness_is_case_sensitive() {
        let repo = repo();
        repo.create(NoteDraft::new("Dup", "")).unwrap();
        assert!(repo.create(NoteDraft::new("dup", "")).is_ok());
    }

    #[test]
    fn invalid_draft_is_rejected() {
        let repo = repo();
        let err = repo.create(NoteDraft::new("  ", "x")).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let repo = repo();
        let missing = NoteId::new("missing").unwrap();
        assert!(matches!(repo.get_by_id(&missing), Err(CoreError::NotFound)));
        assert!(matches!(
            repo.update(&missing, NoteDraft::new("t", "d")),
            Err(CoreError::NotFound)
        ));
        assert!(matches!(repo.delete(&missing), Err(CoreError::NotFound)));
    }

    #[test]
    fn update_replaces_fields_and_refreshes_timestamp() {
        let repo = repo();
        let id = repo.create(NoteDraft::new("old", "old desc")).unwrap();
        let before = repo.get_by_id(&id).unwrap().created_on;
        repo.update(&id, NoteDraft::new("new", "new desc")).unwrap();
        let got = repo.get_by_id(&id).unwrap();
        assert_eq!(got.id, id);
        assert_eq!(got.title, "new");
        assert_eq!(got.description, "new desc");
        assert!(got.created_on > before);
    }

    #[test]
    fn update_keeping_own_title_is_allowed() {
        let repo = repo();
        let id = repo.create(NoteDraft::new("same", "v1")).unwrap();
        repo.update(&id, NoteDraft::new("same", "v2")).unwrap();
        assert_eq!(repo.get_by_id(&id).unwrap().description, "v2");
    }

    #[test]
    fn update_to_another_notes_title_conflicts() {
        let repo = repo();
        repo.create(NoteDraft::new("first", "")).unwrap();
        let id = repo.create(NoteDraft::new("second", "")).unwrap();
        let err = repo.update(&id, NoteDraft::new("first", "")).unwrap_err();
        assert!(matches!(err, CoreError::TitleConflict));
    }

    #[test]
    fn delete_then_get_is_not_found() {
        let repo = repo();
        let id = repo.create(NoteDraft::new("gone", "")).unwrap();
        repo.delete(&id).unwrap();
        assert!(matches!(repo.get_by_id(&id), Err(CoreError::NotFound)));
        assert!(matches!(repo.delete(&id), Err(CoreError::NotFound)));
    }

    #[test]
    fn get_all_on_empty_store_is_not_found() {
        let repo = repo();
        assert!(matches!(repo.get_all(""), Err(CoreError::NotFound)));
    }

    #[test]
    fn populate_then_filter_returns_viper_only() {
        let repo = repo();
        repo.populate().unwrap();
        let all = repo.get_all("").unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].title, "slog");

        let hits = repo.get_all("vi").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "viper");

        assert!(matches!(repo.get_all("no-such-thing"), Err(CoreError::NotFound)));
    }

    #[test]
    fn populate_twice_conflicts() {
        let repo = repo();
        repo.populate().unwrap();
        assert!(matches!(repo.populate(), Err(CoreError::TitleConflict)));
    }

    #[test]
    fn filter_matches_description_case_insensitively() {
        let repo = repo();
        repo.populate().unwrap();
        let hits = repo.get_all("LOGGING").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "slog");
    }

    #[test]
    fn concurrent_creates_of_one_title_yield_single_winner() {
        let repo = Arc::new(InMemoryNoteRepo::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let repo = Arc::clone(&repo);
                std::thread::spawn(move || repo.create(NoteDraft::new("race", "")).is_ok())
            })
            .collect();
        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(wins, 1);
        assert_eq!(repo.get_all("race").unwrap().len(), 1);
    }
}
