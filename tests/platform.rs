use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};

use watermark_eraser::{
    AuthProvider, CandidateFile, Config, FileSaveTarget, GateMode, ImageTransformer,
    ModifyImageRequest, ObjectStorage, PlatformClient, ProcessingState, RecordingNotifier,
    ResultFetcher, ServiceError, Services, UploadOptions, UploadWorkflow,
};

const KEY: &str = "test-key";

#[derive(Clone, Copy, Default)]
enum Mode {
    #[default]
    Healthy,
    StorageForbidden,
    AiRateLimited,
    AiGarbage,
}

struct Upload {
    bucket: String,
    key: String,
    content_type: Option<String>,
    upsert: Option<String>,
    len: usize,
}

struct Server {
    base: String,
    mode: Mode,
    uploads: Mutex<Vec<Upload>>,
    prompts: Mutex<Vec<Value>>,
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {KEY}"))
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn user(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, "invalid token").into_response();
    }
    Json(json!({ "id": "user-1", "email": "user@example.com" })).into_response()
}

async fn logout() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn put_object(
    State(server): State<Arc<Server>>,
    Path((bucket, key)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if matches!(server.mode, Mode::StorageForbidden) {
        return (StatusCode::FORBIDDEN, "bucket is read-only").into_response();
    }
    let public_url = format!("{}/public/{bucket}/{key}", server.base);
    server.uploads.lock().unwrap().push(Upload {
        bucket,
        key,
        content_type: header(&headers, "content-type"),
        upsert: header(&headers, "x-upsert"),
        len: body.len(),
    });
    Json(json!({ "publicUrl": public_url })).into_response()
}

async fn modify(
    State(server): State<Arc<Server>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    server.prompts.lock().unwrap().push(body);
    match server.mode {
        Mode::AiRateLimited => (StatusCode::TOO_MANY_REQUESTS, "slow down").into_response(),
        Mode::AiGarbage => "definitely not json".into_response(),
        _ => Json(json!({ "data": [{ "url": format!("{}/out.png", server.base) }] }))
            .into_response(),
    }
}

async fn result_png() -> Vec<u8> {
    b"processed-bytes".to_vec()
}

async fn spawn(mode: Mode) -> Arc<Server> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let server = Arc::new(Server {
        base: format!("http://{}", listener.local_addr().unwrap()),
        mode,
        uploads: Mutex::new(Vec::new()),
        prompts: Mutex::new(Vec::new()),
    });

    let app = Router::new()
        .route("/auth/v1/user", get(user))
        .route("/auth/v1/logout", post(logout))
        .route("/storage/v1/object/{bucket}/{*key}", put(put_object))
        .route("/ai/v1/images/modify", post(modify))
        .route("/out.png", get(result_png))
        .with_state(Arc::clone(&server));

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    server
}

fn client(base: &str, key: &str) -> PlatformClient {
    PlatformClient::new(&Config {
        api_url: base.to_string(),
        api_key: key.to_string(),
        bucket: "images".to_string(),
        timeout: Duration::from_secs(5),
        gate: GateMode::Enforce,
    })
    .unwrap()
}

#[tokio::test]
async fn login_populates_session_and_logout_clears_it() {
    let server = spawn(Mode::Healthy).await;
    let client = client(&server.base, KEY);
    assert!(client.current().user.is_none());

    let state = client.login().await.unwrap();
    let user = state.user.unwrap();
    assert_eq!(user.id, "user-1");
    assert_eq!(user.email.as_deref(), Some("user@example.com"));
    assert!(!client.current().is_loading);

    client.logout().await.unwrap();
    assert!(client.current().user.is_none());
}

#[tokio::test]
async fn login_with_bad_key_is_unauthorized() {
    let server = spawn(Mode::Healthy).await;
    let client = client(&server.base, "wrong");

    assert_eq!(client.login().await.unwrap_err(), ServiceError::Unauthorized);
    let state = client.current();
    assert!(state.user.is_none());
    assert!(!state.is_loading);
}

#[tokio::test]
async fn upload_sends_bytes_headers_and_key() {
    let server = spawn(Mode::Healthy).await;
    let client = client(&server.base, KEY);

    let stored = client
        .upload(
            vec![1, 2, 3, 4],
            "watermark-removal/original-42.png",
            UploadOptions {
                upsert: false,
                content_type: "image/png".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(
        stored.public_url,
        format!(
            "{}/public/images/watermark-removal/original-42.png",
            server.base
        )
    );

    let uploads = server.uploads.lock().unwrap();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].bucket, "images");
    assert_eq!(uploads[0].key, "watermark-removal/original-42.png");
    assert_eq!(uploads[0].content_type.as_deref(), Some("image/png"));
    assert_eq!(uploads[0].upsert.as_deref(), Some("false"));
    assert_eq!(uploads[0].len, 4);
}

#[tokio::test]
async fn http_statuses_become_typed_errors() {
    let server = spawn(Mode::StorageForbidden).await;
    let err = client(&server.base, KEY)
        .upload(
            vec![0],
            "k.png",
            UploadOptions {
                upsert: false,
                content_type: "image/png".into(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err, ServiceError::Forbidden);

    let server = spawn(Mode::AiRateLimited).await;
    let err = client(&server.base, KEY)
        .modify_image(ModifyImageRequest::watermark_removal("https://cdn/x/a.png"))
        .await
        .unwrap_err();
    assert_eq!(err, ServiceError::RateLimited);
}

#[tokio::test]
async fn undecodable_body_is_a_decode_error() {
    let server = spawn(Mode::AiGarbage).await;
    let err = client(&server.base, KEY)
        .modify_image(ModifyImageRequest::watermark_removal("https://cdn/x/a.png"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Decode(_)), "{err:?}");
}

#[tokio::test]
async fn unreachable_host_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let err = client(&base, KEY)
        .fetch(&format!("{base}/out.png"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Transport(_)), "{err:?}");
}

#[tokio::test]
async fn workflow_runs_end_to_end_over_http() {
    let server = spawn(Mode::Healthy).await;
    let client = Arc::new(client(&server.base, KEY));
    client.login().await.unwrap();

    let notifier = RecordingNotifier::new();
    let mut wf = UploadWorkflow::new(Services::shared(client), Arc::new(notifier.clone()))
        .with_clock(|| 1_700_000_000_123);

    wf.select_file(CandidateFile::new("cat.png", "image/png", vec![9; 2048]))
        .unwrap();
    assert_eq!(wf.process().await, ProcessingState::Complete);

    let result = wf.result().unwrap().clone();
    assert_eq!(
        result.original_url,
        format!(
            "{}/public/images/watermark-removal/original-1700000000123.png",
            server.base
        )
    );
    assert_eq!(result.processed_url, format!("{}/out.png", server.base));

    let prompts = server.prompts.lock().unwrap().clone();
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0]["images"], json!([result.original_url]));
    assert_eq!(prompts[0]["quality"], "high");
    assert_eq!(prompts[0]["n"], 1);

    let dir = tempfile::tempdir().unwrap();
    wf.download(&FileSaveTarget::new(dir.path())).await.unwrap();
    assert_eq!(
        std::fs::read(dir.path().join("cat_watermark_removed.png")).unwrap(),
        b"processed-bytes"
    );
    assert!(notifier.all().iter().all(|n| n.level == watermark_eraser::Level::Success));
}
