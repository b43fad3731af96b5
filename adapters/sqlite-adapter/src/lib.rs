//! sqlite-adapter — SQLite implementation of the NoteRepository port.
//!
//! Purpose
//! - Provide a lightweight, file-based note store for the api-server.
//! - Implements the `NoteRepository` trait from the `domain` crate.
//!
//! Notes
//! - Uses `rusqlite` with the `bundled` feature for portability.
//! - Title uniqueness is enforced by the table's UNIQUE constraint; the
//!   constraint failure is translated into `CoreError::TitleConflict`.
//! - `created_on` is stored as a UTC DATETIME through rusqlite's chrono support.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use domain::validate::validate_draft;
use domain::{
    sample_notes, Clock, CoreError, Note, NoteDraft, NoteId, NoteRepository, SystemClock,
};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};

const SELECT_NOTES: &str = "SELECT id, title, description, created_on FROM notes";

const SIDECAR_SUFFIXES: [&str; 3] = ["-journal", "-wal", "-shm"];

/// SQLite-backed note repository.
pub struct SqliteNoteRepo<C: Clock = SystemClock> {
    conn: Mutex<Connection>,
    clock: C,
}

impl SqliteNoteRepo {
    /// Open (or create) a SQLite database at the given path and ensure schema.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        Self::open_with_clock(path, SystemClock)
    }

    /// Delete any existing database at `path`, including its `-journal`,
    /// `-wal` and `-shm` files, then open a new one.
    pub fn open_fresh<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        let path = path.as_ref();
        remove_if_exists(path)?;
        for suffix in SIDECAR_SUFFIXES {
            let mut sidecar = path.as_os_str().to_owned();
            sidecar.push(suffix);
            remove_if_exists(Path::new(&sidecar))?;
        }
        Self::open(path)
    }

    /// Private in-memory database; gone when the repository is dropped.
    pub fn open_in_memory() -> Result<Self, CoreError> {
        Self::from_conn(Connection::open_in_memory().map_err(map_sqerr)?, SystemClock)
    }
}

impl<C: Clock> SqliteNoteRepo<C> {
    pub fn open_with_clock<P: AsRef<Path>>(path: P, clock: C) -> Result<Self, CoreError> {
        let path = path.as_ref();
        // Ensure directory exists
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(map_sqerr)?;
        }
        let conn = Connection::open(path).map_err(map_sqerr)?;
        debug!(path = %path.display(), "opened sqlite database");
        Self::from_conn(conn, clock)
    }

    fn from_conn(conn: Connection, clock: C) -> Result<Self, CoreError> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            clock,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, CoreError> {
        self.conn
            .lock()
            .map_err(|_| CoreError::Storage("mutex poisoned".into()))
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now().into()
    }
}

fn remove_if_exists(path: &Path) -> Result<(), CoreError> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            info!(path = %path.display(), "removed existing database file");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(map_sqerr(e)),
    }
}

fn init_schema(conn: &Connection) -> Result<(), CoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS notes (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL,
            created_on DATETIME NOT NULL
        );
        "#,
    )
    .map_err(map_sqerr)
}

fn map_sqerr<E: std::fmt::Display>(e: E) -> CoreError {
    CoreError::Storage(format!("sqlite error: {e}"))
}

/// Like `map_sqerr`, but a UNIQUE violation (only `title` carries one) is a
/// title conflict. Primary key collisions stay storage errors.
fn map_write_err(e: rusqlite::Error) -> CoreError {
    if let rusqlite::Error::SqliteFailure(err, _) = &e {
        if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE {
            return CoreError::TitleConflict;
        }
    }
    map_sqerr(e)
}

/// Escape LIKE metacharacters so the filter is matched literally.
fn escape_like(filter: &str) -> String {
    let mut out = String::with_capacity(filter.len());
    for c in filter.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

type NoteRow = (String, String, String, DateTime<Utc>);

fn read_row(row: &rusqlite::Row) -> rusqlite::Result<NoteRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn row_to_note((id, title, description, created_on): NoteRow) -> Result<Note, CoreError> {
    let id = NoteId::new(id).map_err(|e| CoreError::Storage(format!("bad id in db: {e}")))?;
    Ok(Note {
        id,
        title,
        description,
        created_on: created_on.into(),
    })
}

impl<C: Clock> NoteRepository for SqliteNoteRepo<C> {
    fn populate(&self) -> Result<(), CoreError> {
        info!("populating sqlite database with sample notes");
        init_schema(&*self.lock()?)?;
        for draft in sample_notes() {
            if let Err(e) = self.create(draft) {
                warn!(err = %e, "populate failed");
                return Err(e);
            }
        }
        Ok(())
    }

    fn create(&self, draft: NoteDraft) -> Result<NoteId, CoreError> {
        validate_draft(&draft)?;
        info!(title = %draft.title, "creating note");
        let id = NoteId::generate();
        let conn = self.lock()?;
        let res = conn.execute(
            "INSERT INTO notes(id, title, description, created_on) VALUES (?1, ?2, ?3, ?4)",
            params![id.as_str(), draft.title, draft.description, self.now()],
        );
        match res {
            Ok(_) => {
                info!(id = %id, "created note");
                Ok(id)
            }
            Err(e) => {
                let mapped = map_write_err(e);
                warn!(title = %draft.title, err = %mapped, "create rejected");
                Err(mapped)
            }
        }
    }

    fn update(&self, id: &NoteId, draft: NoteDraft) -> Result<(), CoreError> {
        validate_draft(&draft)?;
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE notes SET title = ?1, description = ?2, created_on = ?3 WHERE id = ?4",
                params![draft.title, draft.description, self.now(), id.as_str()],
            )
            .map_err(map_write_err)?;
        if changed == 0 {
            debug!(id = %id, "update matched no rows");
            Err(CoreError::NotFound)
        } else {
            info!(id = %id, "updated note");
            Ok(())
        }
    }

    fn delete(&self, id: &NoteId) -> Result<(), CoreError> {
        let conn = self.lock()?;
        let changed = conn
            .execute("DELETE FROM notes WHERE id = ?1", params![id.as_str()])
            .map_err(map_sqerr)?;
        if changed == 0 {
            debug!(id = %id, "delete matched no rows");
            Err(CoreError::NotFound)
        } else {
            info!(id = %id, "deleted note");
            Ok(())
        }
    }

    fn get_by_id(&self, id: &NoteId) -> Result<Note, CoreError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                &format!("{SELECT_NOTES} WHERE id = ?1"),
                params![id.as_str()],
                read_row,
            )
            .optional()
            .map_err(map_sqerr)?;
        match row {
            Some(row) => row_to_note(row),
            None => Err(CoreError::NotFound),
        }
    }

    fn get_all(&self, filter: &str) -> Result<Vec<Note>, CoreError> {
        if filter.is_empty() {
            debug!("retrieving all notes");
        } else {
            debug!(keywords = %filter, "retrieving notes by keywords");
        }
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                r"{SELECT_NOTES} WHERE title LIKE ?1 ESCAPE '\' OR description LIKE ?1 ESCAPE '\' ORDER BY created_on, title"
            ))
            .map_err(map_sqerr)?;
        let pattern = format!("%{}%", escape_like(filter));
        let mut rows = stmt.query(params![pattern]).map_err(map_sqerr)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(map_sqerr)? {
            out.push(row_to_note(read_row(row).map_err(map_sqerr)?)?);
        }
        debug!(count = out.len(), "found notes");
        if out.is_empty() {
            return Err(CoreError::NotFound);
        }
        Ok(out)
    }
}
