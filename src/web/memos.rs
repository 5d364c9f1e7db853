//! Memo page handlers.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::store::{Memo, MemoDraft, MemoId, MemoStore};

use super::pages::{self, FormValues};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MemoStore>,
}

/// Posted memo form. `_method` carries PATCH/DELETE from HTML forms.
#[derive(Deserialize, Debug, Default)]
pub struct MemoForm {
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(rename = "_method")]
    pub method: Option<String>,
}

impl MemoForm {
    fn draft(&self) -> MemoDraft {
        MemoDraft {
            title: self.title.clone(),
            content: self.content.clone(),
        }
    }

    fn values(&self) -> FormValues<'_> {
        FormValues {
            title: self.title.as_deref().unwrap_or(""),
            content: self.content.as_deref().unwrap_or(""),
        }
    }
}

fn parse_id(raw: &str) -> Option<MemoId> {
    raw.parse::<MemoId>().ok().filter(|id| *id > 0)
}

pub fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Html(pages::error_page("Page not found", "The page could not be found.")),
    )
        .into_response()
}

fn internal_error(e: Error) -> Response {
    tracing::error!("request failed: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(pages::error_page("Error", "Something went wrong.")),
    )
        .into_response()
}

fn invalid_form(id: Option<MemoId>, form: &MemoForm) -> Response {
    let message = "Title is required and must be at most 100 characters.";
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Html(pages::edit_page(id, &form.values(), Some(message))),
    )
        .into_response()
}

/// Run a store call on the blocking pool; both backends do synchronous IO.
async fn blocking<T, F>(state: &AppState, f: F) -> Result<T>
where
    F: FnOnce(&dyn MemoStore) -> T + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(&state.store);
    tokio::task::spawn_blocking(move || f(store.as_ref()))
        .await
        .map_err(|e| Error::Web(format!("store task failed: {}", e)))
}

pub async fn index(State(state): State<AppState>) -> Response {
    match blocking(&state, |store| store.ids_with_title()).await.and_then(|r| r) {
        Ok(titles) => Html(pages::index_page(&titles)).into_response(),
        Err(e) => internal_error(e),
    }
}

pub async fn style() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], pages::STYLE_CSS)
}

pub async fn new_memo() -> Html<String> {
    Html(pages::edit_page(None, &FormValues::default(), None))
}

pub async fn create_memo(State(state): State<AppState>, Form(form): Form<MemoForm>) -> Response {
    let draft = form.draft();
    match blocking(&state, move |store| store.insert(&draft)).await {
        Ok(Some(memo)) => Redirect::to(&format!("/memos/{}", memo.id)).into_response(),
        Ok(None) => invalid_form(None, &form),
        Err(e) => internal_error(e),
    }
}

async fn lookup(state: &AppState, raw_id: &str) -> Result<Option<Memo>> {
    let Some(id) = parse_id(raw_id) else {
        return Ok(None);
    };
    blocking(state, move |store| store.find(id)).await?
}

pub async fn show_memo(State(state): State<AppState>, Path(raw_id): Path<String>) -> Response {
    match lookup(&state, &raw_id).await {
        Ok(Some(memo)) => Html(pages::memo_page(&memo)).into_response(),
        Ok(None) => not_found(),
        Err(e) => internal_error(e),
    }
}

pub async fn edit_memo(State(state): State<AppState>, Path(raw_id): Path<String>) -> Response {
    match lookup(&state, &raw_id).await {
        Ok(Some(memo)) => {
            let values = FormValues {
                title: &memo.title,
                content: &memo.content,
            };
            Html(pages::edit_page(Some(memo.id), &values, None)).into_response()
        }
        Ok(None) => not_found(),
        Err(e) => internal_error(e),
    }
}

pub async fn update_memo(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Form(form): Form<MemoForm>,
) -> Response {
    apply_update(&state, &raw_id, &form).await
}

pub async fn delete_memo(State(state): State<AppState>, Path(raw_id): Path<String>) -> Response {
    apply_delete(&state, &raw_id).await
}

/// `POST /memos/:id` dispatched on the `_method` form field.
pub async fn override_memo(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Form(form): Form<MemoForm>,
) -> Response {
    match form.method.as_deref().map(str::to_ascii_lowercase).as_deref() {
        Some("patch") | Some("put") => apply_update(&state, &raw_id, &form).await,
        Some("delete") => apply_delete(&state, &raw_id).await,
        _ => method_not_allowed(),
    }
}

fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Html(pages::error_page(
            "Method not allowed",
            "This form action is not supported.",
        )),
    )
        .into_response()
}

async fn apply_update(state: &AppState, raw_id: &str, form: &MemoForm) -> Response {
    let Some(id) = parse_id(raw_id) else {
        return not_found();
    };
    let draft = form.draft();
    // None from update is either a bad form or a missing memo; exists tells them apart.
    let outcome = blocking(state, move |store| match store.update(id, &draft) {
        Some(_) => Ok(None),
        None => store.exists(id).map(Some),
    })
    .await
    .and_then(|r| r);

    match outcome {
        // PRG
        Ok(None) => Redirect::to(&format!("/memos/{}", id)).into_response(),
        Ok(Some(true)) => invalid_form(Some(id), form),
        Ok(Some(false)) => not_found(),
        Err(e) => internal_error(e),
    }
}

async fn apply_delete(state: &AppState, raw_id: &str) -> Response {
    let Some(id) = parse_id(raw_id) else {
        return not_found();
    };
    match blocking(state, move |store| store.delete(id)).await.and_then(|r| r) {
        Ok(_) => Redirect::to("/").into_response(),
        Err(e) => internal_error(e),
    }
}
