use std::{sync::Arc, time::Duration};

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use camino::Utf8PathBuf as PathBuf;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use galleria::app_state::AppState;
use galleria_core::{
    catalog::Gallery,
    config::DEFAULT_MAX_UPLOAD_BYTES,
    media::{local::LocalMediaStore, retry::RetryConfig, MediaClient},
    model::repository::db,
};

const PASSWORD: &str = "correct horse";
const BOUNDARY: &str = "galleria-test-boundary";

struct TestApp {
    app: Router,
    cookie: Option<String>,
    _dir: TempDir,
}

impl TestApp {
    async fn new() -> TestApp {
        let dir = tempfile::tempdir().unwrap();
        let root = PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let pool = db::open_and_migrate(root.join("galleria.db").as_str())
            .await
            .unwrap();
        let media_root = root.join("media");
        std::fs::create_dir_all(&media_root).unwrap();
        let store = LocalMediaStore::new(media_root.clone(), "/media".to_owned());
        let retry = RetryConfig {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        };
        let gallery = Gallery::new(
            pool,
            MediaClient::new(Arc::new(store), retry),
            "photo_gallery",
        );
        let state = Arc::new(AppState::new(
            gallery,
            PASSWORD,
            DEFAULT_MAX_UPLOAD_BYTES,
            Some(media_root),
        ));
        TestApp {
            app: galleria::app(state),
            cookie: None,
            _dir: dir,
        }
    }

    async fn logged_in() -> TestApp {
        let mut app = TestApp::new().await;
        app.login().await;
        app
    }

    async fn login(&mut self) {
        let response = self
            .app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/auth/login",
                &json!({ "password": PASSWORD }),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(set_cookie.contains("Max-Age="));
        let cookie = set_cookie.split(';').next().unwrap().to_owned();
        assert!(cookie.starts_with("galleria_session="));
        self.cookie = Some(cookie);
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    async fn json(&self, method: Method, uri: &str, body: &Value) -> (StatusCode, Value) {
        self.send(json_request(method, uri, body, self.cookie.as_deref()))
            .await
    }

    async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        let mut request = Request::builder().method(Method::DELETE).uri(uri);
        if let Some(cookie) = &self.cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.send(request.body(Body::empty()).unwrap()).await
    }

    async fn upload(
        &self,
        files: &[(&str, &str)],
        collection_id: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut body: Vec<u8> = Vec::new();
        for (filename, data) in files {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data.as_bytes());
            body.extend_from_slice(b"\r\n");
        }
        if let Some(collection_id) = collection_id {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"collection_id\"\r\n\r\n{collection_id}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        let mut request = Request::builder()
            .method(Method::POST)
            .uri("/api/photos")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(cookie) = &self.cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.send(request.body(Body::from(body)).unwrap()).await
    }

    async fn create_collection(&self, name: &str) -> String {
        let (status, body) = self
            .json(Method::POST, "/api/collections", &json!({ "name": name }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["collection"]["id"].as_str().unwrap().to_owned()
    }
}

fn json_request(method: Method, uri: &str, body: &Value, cookie: Option<&str>) -> Request<Body> {
    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    request.body(Body::from(body.to_string())).unwrap()
}

fn assert_error_envelope(body: &Value) {
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].is_string(), "{}", body);
}

#[tokio::test]
async fn vacation_collection_lifecycle() {
    let app = TestApp::logged_in().await;
    let vacation = app.create_collection("Vacation").await;

    let (status, body) = app
        .upload(
            &[("beach.jpg", "sand"), ("hills.png", "grass")],
            Some(&vacation),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["uploaded_count"], json!(2));
    assert_eq!(body["failed_count"], json!(0));
    assert_eq!(body["message"], json!("Successfully uploaded 2 photos"));
    for photo in body["photos"].as_array().unwrap() {
        assert_eq!(photo["collection_id"], json!(vacation));
        assert_eq!(photo["collection_name"], json!("Vacation"));
    }

    let (status, body) = app.get("/api/collections").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["collections"][0]["name"], json!("Vacation"));
    assert_eq!(body["collections"][0]["photo_count"], json!(2));

    let (_, body) = app
        .get(&format!("/api/photos?collection_id={}", vacation))
        .await;
    assert_eq!(body["photos"].as_array().unwrap().len(), 2);

    let (status, body) = app
        .delete(&format!("/api/collections/{}", vacation))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["unassigned_count"], json!(2));

    let (_, body) = app.get("/api/photos").await;
    let photos = body["photos"].as_array().unwrap();
    assert_eq!(photos.len(), 2);
    for photo in photos {
        assert_eq!(photo["collection_id"], Value::Null);
    }
    let (_, body) = app.get("/api/collections").await;
    assert_eq!(body["collections"], json!([]));
}

#[tokio::test]
async fn collection_names_are_unique_ignoring_case() {
    let app = TestApp::logged_in().await;
    app.create_collection("A").await;

    let (status, body) = app
        .json(Method::POST, "/api/collections", &json!({ "name": "a" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_error_envelope(&body);

    let (_, body) = app.get("/api/collections").await;
    assert_eq!(body["collections"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn empty_collection_name_is_rejected() {
    let app = TestApp::logged_in().await;
    let (status, body) = app
        .json(Method::POST, "/api/collections", &json!({ "name": "   " }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error_envelope(&body);
}

#[tokio::test]
async fn mutations_require_login() {
    let app = TestApp::new().await;
    let (status, body) = app
        .json(Method::POST, "/api/collections", &json!({ "name": "Vacation" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_error_envelope(&body);

    let (status, _) = app.upload(&[("beach.jpg", "sand")], None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.get("/api/collections").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
}

#[tokio::test]
async fn wrong_password_and_logout() {
    let mut app = TestApp::new().await;
    let (status, body) = app
        .json(
            Method::POST,
            "/api/auth/login",
            &json!({ "password": "guess" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], json!("Invalid password"));

    app.login().await;
    let (_, body) = app
        .send(json_request(
            Method::GET,
            "/api/auth/status",
            &json!({}),
            app.cookie.as_deref(),
        ))
        .await;
    assert_eq!(body["logged_in"], json!(true));

    let (status, _) = app.json(Method::POST, "/api/auth/logout", &json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .json(Method::POST, "/api/collections", &json!({ "name": "Vacation" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn one_failed_file_does_not_fail_the_upload() {
    let app = TestApp::logged_in().await;
    let (status, body) = app
        .upload(&[("good.jpg", "pixels"), ("empty.jpg", "")], None)
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["uploaded_count"], json!(1));
    assert_eq!(body["failed_count"], json!(1));
    assert_eq!(body["failed"][0]["filename"], json!("empty.jpg"));
    assert_eq!(body["photos"][0]["title"], json!("good.jpg"));

    let (_, body) = app.get("/api/photos").await;
    assert_eq!(body["photos"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn upload_where_every_file_fails_is_an_error() {
    let app = TestApp::logged_in().await;
    let (status, body) = app.upload(&[("empty.jpg", "")], None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_error_envelope(&body);
    assert_eq!(body["failed_count"], json!(1));
}

#[tokio::test]
async fn upload_to_unknown_collection_is_not_found() {
    let app = TestApp::logged_in().await;
    let (status, body) = app.upload(&[("beach.jpg", "sand")], Some("999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_error_envelope(&body);
}

#[tokio::test]
async fn uploaded_blob_is_served_locally() {
    let app = TestApp::logged_in().await;
    let (_, body) = app.upload(&[("beach.jpg", "sand")], None).await;
    let url = body["photos"][0]["url"].as_str().unwrap().to_owned();
    assert!(url.starts_with("/media/photo_gallery/"), "{}", url);
    assert!(url.ends_with(".jpg"), "{}", url);

    let response = app
        .app
        .clone()
        .oneshot(Request::builder().uri(&url).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], "sand".as_bytes());
}

#[tokio::test]
async fn clearing_a_photo_collection_with_null() {
    let app = TestApp::logged_in().await;
    let trips = app.create_collection("Trips").await;
    let (_, body) = app.upload(&[("beach.jpg", "sand")], Some(&trips)).await;
    let photo_id = body["photos"][0]["id"].as_str().unwrap().to_owned();

    let (status, body) = app
        .json(
            Method::PUT,
            &format!("/api/photos/{}/collection", photo_id),
            &json!({ "collection_id": null }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["photo"]["collection_id"], Value::Null);
    assert_eq!(body["photo"]["collection_name"], Value::Null);

    let (_, body) = app.get("/api/collections").await;
    assert_eq!(body["collections"][0]["photo_count"], json!(0));
}

#[tokio::test]
async fn bulk_update_and_delete_accept_numbers_and_strings() {
    let app = TestApp::logged_in().await;
    let trips = app.create_collection("Trips").await;
    let (_, body) = app
        .upload(&[("a.jpg", "a"), ("b.jpg", "b"), ("c.jpg", "c")], None)
        .await;
    let ids: Vec<String> = body["photos"]
        .as_array()
        .unwrap()
        .iter()
        .map(|photo| photo["id"].as_str().unwrap().to_owned())
        .collect();
    let first: i64 = ids[0].parse().unwrap();

    let (status, body) = app
        .json(
            Method::PUT,
            "/api/photos/bulk-update",
            &json!({ "photo_ids": [first, ids[1]], "collection_id": trips }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["updated_count"], json!(2));

    let (_, body) = app
        .get(&format!("/api/photos?collection_id={}", trips))
        .await;
    assert_eq!(body["photos"].as_array().unwrap().len(), 2);

    let (status, body) = app
        .json(
            Method::DELETE,
            "/api/photos/bulk-delete",
            &json!({ "photo_ids": ids }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["deleted_count"], json!(3));

    let (_, body) = app.get("/api/photos").await;
    assert_eq!(body["photos"], json!([]));
}

#[tokio::test]
async fn bulk_update_without_ids_is_rejected() {
    let app = TestApp::logged_in().await;
    let (status, body) = app
        .json(
            Method::PUT,
            "/api/photos/bulk-update",
            &json!({ "photo_ids": [] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error_envelope(&body);
}

#[tokio::test]
async fn malformed_ids_are_bad_requests() {
    let app = TestApp::logged_in().await;
    let (status, body) = app.delete("/api/photos/not-a-number").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error_envelope(&body);

    let (status, body) = app.get("/api/photos?collection_id=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error_envelope(&body);

    let (status, _) = app.delete("/api/photos/42").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_json_uses_the_error_envelope() {
    let app = TestApp::logged_in().await;
    let mut request = Request::builder()
        .method(Method::POST)
        .uri("/api/collections")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = &app.cookie {
        request = request.header(header::COOKIE, cookie);
    }
    let (status, body) = app
        .send(request.body(Body::from("{not json")).unwrap())
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error_envelope(&body);
}

#[tokio::test]
async fn unknown_route_is_a_json_not_found() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/api/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_error_envelope(&body);
}

#[tokio::test]
async fn health_and_reconcile() {
    let app = TestApp::logged_in().await;
    let (status, body) = app.get("/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("healthy"));
    assert_eq!(body["media_store"], json!("local"));
    assert_eq!(body["pending_remote_ops"], json!(0));

    let (status, body) = app
        .json(Method::POST, "/api/admin/reconcile", &json!({}))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["pending_remote_ops"], json!(0));
}
