//! Storage selection for the server: in-memory or SQLite (feature-gated),
//! dispatched behind one `NoteRepository` implementation.

use std::sync::Arc;

use domain::adapters::memory_repo::InMemoryNoteRepo;
use domain::{CoreError, Note, NoteDraft, NoteId, NoteRepository};
use tracing::{info, warn};

use crate::config::{Config, StorageProvider};

enum RepoKind {
    Memory(InMemoryNoteRepo),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite_adapter::SqliteNoteRepo),
}

/// Cheaply cloneable handle shared by all request handlers.
#[derive(Clone)]
pub struct AnyRepo {
    kind: Arc<RepoKind>,
}

impl AnyRepo {
    pub fn memory() -> Self {
        Self {
            kind: Arc::new(RepoKind::Memory(InMemoryNoteRepo::new())),
        }
    }

    #[cfg(feature = "sqlite")]
    pub fn sqlite(path: &std::path::Path, reset: bool) -> Result<Self, CoreError> {
        let repo = if reset {
            sqlite_adapter::SqliteNoteRepo::open_fresh(path)?
        } else {
            sqlite_adapter::SqliteNoteRepo::open(path)?
        };
        Ok(Self {
            kind: Arc::new(RepoKind::Sqlite(repo)),
        })
    }

    fn inner(&self) -> &dyn NoteRepository {
        match &*self.kind {
            RepoKind::Memory(r) => r,
            #[cfg(feature = "sqlite")]
            RepoKind::Sqlite(r) => r,
        }
    }
}

impl NoteRepository for AnyRepo {
    fn populate(&self) -> Result<(), CoreError> {
        self.inner().populate()
    }

    fn create(&self, draft: NoteDraft) -> Result<NoteId, CoreError> {
        self.inner().create(draft)
    }

    fn update(&self, id: &NoteId, draft: NoteDraft) -> Result<(), CoreError> {
        self.inner().update(id, draft)
    }

    fn delete(&self, id: &NoteId) -> Result<(), CoreError> {
        self.inner().delete(id)
    }

    fn get_by_id(&self, id: &NoteId) -> Result<Note, CoreError> {
        self.inner().get_by_id(id)
    }

    fn get_all(&self, filter: &str) -> Result<Vec<Note>, CoreError> {
        self.inner().get_all(filter)
    }
}

/// Construct a repository instance based on config and feature flags.
pub fn build_repo(cfg: &Config) -> Result<AnyRepo, CoreError> {
    match cfg.storage_provider {
        #[cfg(feature = "sqlite")]
        StorageProvider::Sqlite => {
            info!(path = %cfg.db_path.display(), reset = cfg.db_reset_on_start, "using sqlite storage");
            AnyRepo::sqlite(&cfg.db_path, cfg.db_reset_on_start)
        }
        #[cfg(not(feature = "sqlite"))]
        StorageProvider::Sqlite => {
            warn!("sqlite storage requested but the `sqlite` feature is disabled; using memory");
            Ok(AnyRepo::memory())
        }
        StorageProvider::Memory => {
            info!("using in-memory storage");
            Ok(AnyRepo::memory())
        }
    }
}

/// Write the sample notes; an already-seeded store is not an error.
pub fn seed(repo: &AnyRepo) -> Result<(), CoreError> {
    match repo.populate() {
        Ok(()) => {
            info!("sample notes written");
            Ok(())
        }
        Err(CoreError::TitleConflict) => {
            warn!("sample notes already present; skipping seed");
            Ok(())
        }
        Err(e) => Err(e),
    }
}
