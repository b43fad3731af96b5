//! Note CRUD handlers mounted under `/api/v1/notes`.

use std::num::NonZeroU32;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use domain::{CoreError, Note, NoteDraft, NoteId, NoteRepository};
use governor::{Quota, RateLimiter};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::repo::AnyRepo;

/// Collection path; single notes live at `{NOTES_PATH}/:id`.
pub const NOTES_PATH: &str = "/api/v1/notes";

/// One token bucket shared by every client.
pub type GlobalRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

#[derive(Clone)]
pub struct AppState {
    pub repo: AnyRepo,
    pub rate_limiter: Arc<GlobalRateLimiter>,
}

impl AppState {
    /// Allows `rps` requests per second, with bursts of up to `rps`.
    pub fn new(repo: AnyRepo, rps: NonZeroU32) -> Self {
        Self {
            repo,
            rate_limiter: Arc::new(RateLimiter::direct(Quota::per_second(rps))),
        }
    }
}

/// Request body for create and update. Client-supplied `noteid` and
/// `createdon` fields are ignored.
#[derive(Deserialize)]
pub struct NoteIn {
    title: String,
    #[serde(default)]
    description: String,
}

impl From<NoteIn> for NoteDraft {
    fn from(body: NoteIn) -> Self {
        NoteDraft::new(body.title, body.description)
    }
}

#[derive(Serialize)]
struct NoteOut {
    noteid: String,
    title: String,
    description: String,
    createdon: String,
}

impl From<Note> for NoteOut {
    fn from(note: Note) -> Self {
        Self {
            noteid: note.id.as_str().to_string(),
            title: note.title,
            description: note.description,
            createdon: http_common::system_time_to_rfc3339(note.created_on),
        }
    }
}

#[derive(Serialize)]
struct CreatedOut {
    noteid: String,
}

#[derive(Deserialize)]
pub struct ListQuery {
    keywords: Option<String>,
}

/// Run a repository call on the blocking pool.
async fn with_repo<T, F>(state: &AppState, f: F) -> Result<T, CoreError>
where
    F: FnOnce(&AnyRepo) -> Result<T, CoreError> + Send + 'static,
    T: Send + 'static,
{
    let repo = state.repo.clone();
    tokio::task::spawn_blocking(move || f(&repo))
        .await
        .map_err(|e| CoreError::Storage(format!("repository task failed: {e}")))?
}

fn error_response(op: &'static str, err: CoreError) -> Response {
    let (status, _) = http_common::status_for(&err);
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        error!(op, err = %err, "request failed");
    } else {
        warn!(op, err = %err, "request rejected");
    }
    (status, Json(http_common::error_body(&err))).into_response()
}

fn bad_body(op: &'static str, rejection: JsonRejection) -> Response {
    warn!(op, err = %rejection, "invalid request body");
    (
        StatusCode::BAD_REQUEST,
        Json(http_common::json_error_with_message(
            "bad_request",
            &rejection.body_text(),
        )),
    )
        .into_response()
}

pub async fn list_notes(State(state): State<AppState>, Query(q): Query<ListQuery>) -> Response {
    let keywords = q.keywords.unwrap_or_default();
    match with_repo(&state, move |r| r.get_all(&keywords)).await {
        Ok(notes) => {
            info!(count = notes.len(), "list ok");
            let out: Vec<NoteOut> = notes.into_iter().map(NoteOut::from).collect();
            (StatusCode::OK, Json(out)).into_response()
        }
        Err(e) => error_response("list", e),
    }
}

pub async fn get_note(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = match NoteId::new(id) {
        Ok(id) => id,
        Err(e) => return error_response("get", e),
    };
    match with_repo(&state, move |r| r.get_by_id(&id)).await {
        Ok(note) => (StatusCode::OK, Json(NoteOut::from(note))).into_response(),
        Err(e) => error_response("get", e),
    }
}

pub async fn create_note(
    State(state): State<AppState>,
    body: Result<Json<NoteIn>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return bad_body("create", rejection),
    };
    let draft = NoteDraft::from(body);
    match with_repo(&state, move |r| r.create(draft)).await {
        Ok(id) => {
            info!(id = %id, "create ok");
            let location = format!("{NOTES_PATH}/{id}");
            (
                StatusCode::CREATED,
                [(header::LOCATION, location)],
                Json(CreatedOut {
                    noteid: id.as_str().to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => error_response("create", e),
    }
}

pub async fn update_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<NoteIn>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return bad_body("update", rejection),
    };
    let id = match NoteId::new(id) {
        Ok(id) => id,
        Err(e) => return error_response("update", e),
    };
    let draft = NoteDraft::from(body);
    match with_repo(&state, move |r| r.update(&id, draft)).await {
        Ok(()) => {
            info!("update ok");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => error_response("update", e),
    }
}

pub async fn delete_note(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = match NoteId::new(id) {
        Ok(id) => id,
        Err(e) => return error_response("delete", e),
    };
    match with_repo(&state, move |r| r.delete(&id)).await {
        Ok(()) => {
            info!("delete ok");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => error_response("delete", e),
    }
}
