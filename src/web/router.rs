//! Route definitions for web server.

use axum::{
    http::{HeaderName, HeaderValue},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::store::MemoStore;

use super::memos::{self, AppState};

/// Create the app router over a store handle.
pub fn create_app_router(store: Arc<dyn MemoStore>) -> Router {
    Router::new()
        .route("/", get(memos::index))
        .route("/style.css", get(memos::style))
        .route("/memos", post(memos::create_memo))
        .route("/memos/new", get(memos::new_memo))
        .route(
            "/memos/:id",
            get(memos::show_memo)
                .post(memos::override_memo)
                .patch(memos::update_memo)
                .put(memos::update_memo)
                .delete(memos::delete_memo),
        )
        .route("/memos/:id/edit", get(memos::edit_memo))
        .fallback(fallback)
        .with_state(AppState { store })
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-xss-protection"),
            HeaderValue::from_static("1; mode=block"),
        ))
        .layer(TraceLayer::new_for_http())
}

async fn fallback() -> axum::response::Response {
    memos::not_found()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::store::lock::try_acquire_lock;
    use crate::store::{FileStore, MemoDraft, RelationalConfig, RelationalStore};

    fn file_store() -> (TempDir, Arc<dyn MemoStore>) {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().join("memo_data.json"));
        store.insert(&MemoDraft::new("メモ1", "このメモはテスト1の内容です。"));
        (temp_dir, Arc::new(store))
    }

    fn form(method: Method, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn assert_html_headers(response: &axum::response::Response) {
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/html; charset=utf-8"
        );
        assert_eq!(response.headers()["x-xss-protection"], "1; mode=block");
    }

    #[tokio::test]
    async fn test_root() {
        let (_dir, store) = file_store();
        let response = create_app_router(store).oneshot(get_request("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_html_headers(&response);
        assert!(body_text(response).await.contains("メモ1"));
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (_dir, store) = file_store();
        let app = create_app_router(store);

        let response = app
            .clone()
            .oneshot(form(Method::POST, "/memos", "title=test2&content=test_content"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/memos/2");

        let response = app.oneshot(get_request("/memos/2")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("test_content"));
    }

    #[tokio::test]
    async fn test_create_with_empty_title_rerenders_form() {
        let (_dir, store) = file_store();
        let app = create_app_router(Arc::clone(&store));

        let response = app
            .oneshot(form(Method::POST, "/memos", "title=&content=lost"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_text(response).await.contains("lost"));
        assert_eq!(store.ids().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_get_notfound() {
        let (_dir, store) = file_store();
        let app = create_app_router(store);

        let response = app.clone().oneshot(get_request("/unknown_place")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_html_headers(&response);

        for uri in ["/memos/99", "/memos/abc", "/memos/99/edit"] {
            let response = app.clone().oneshot(get_request(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_update_via_method_override() {
        let (_dir, store) = file_store();
        let app = create_app_router(Arc::clone(&store));

        let response = app
            .oneshot(form(
                Method::POST,
                "/memos/1",
                "_method=patch&title=test1&content=test_content_modified",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/memos/1");

        let memo = store.find(1).unwrap().unwrap();
        assert_eq!(memo.title, "test1");
        assert_eq!(memo.content, "test_content_modified");
    }

    #[tokio::test]
    async fn test_update_missing_memo_is_not_found() {
        let (_dir, store) = file_store();
        let app = create_app_router(Arc::clone(&store));

        let response = app
            .oneshot(form(Method::PATCH, "/memos/5", "title=t&content=c"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(store.ids().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_delete_and_notfound() {
        let store: Arc<dyn MemoStore> =
            Arc::new(RelationalStore::open(&RelationalConfig::default()).unwrap());
        store.insert(&MemoDraft::new("one", ""));
        store.insert(&MemoDraft::new("two", ""));
        let app = create_app_router(store);

        let response = app
            .clone()
            .oneshot(form(Method::POST, "/memos/2", "_method=delete"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/");

        let response = app.clone().oneshot(get_request("/memos/2")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        // Deleting again still redirects
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::DELETE)
                    .uri("/memos/2")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn test_unknown_method_override_renders_error_page() {
        let (_dir, store) = file_store();
        let app = create_app_router(Arc::clone(&store));

        let response = app
            .oneshot(form(Method::POST, "/memos/1", "_method=bogus&title=x"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_html_headers(&response);
        assert!(body_text(response).await.contains("Method not allowed"));
        assert_eq!(store.find(1).unwrap().unwrap().title, "メモ1");
    }

    #[tokio::test]
    async fn test_waiting_writer_does_not_stall_readers() {
        let (dir, store) = file_store();
        let app = create_app_router(store);
        let held = try_acquire_lock(&dir.path().join("memo_data.json"))
            .unwrap()
            .unwrap();

        let writer = tokio::spawn(
            app.clone()
                .oneshot(form(Method::POST, "/memos", "title=queued&content=")),
        );
        tokio::task::yield_now().await;

        let response = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            app.oneshot(get_request("/")),
        )
        .await
        .expect("reader stalled behind the writer")
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        drop(held);
        let response = writer.await.unwrap().unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/memos/2");
    }

    #[tokio::test]
    async fn test_stylesheet() {
        let (_dir, store) = file_store();
        let response = create_app_router(store)
            .oneshot(get_request("/style.css"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/css; charset=utf-8"
        );
    }
}
