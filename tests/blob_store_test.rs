//! HttpBlobStore 集成测试：本地 axum 桩服务模拟 Blob REST 接口

#![cfg(feature = "http")]

use std::collections::HashMap;

use axum::extract::{Path, Query};
use axum::http::{header::AUTHORIZATION, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use ops_agents::manuals::blob::{shared_key_signature, string_to_sign};
use ops_agents::manuals::{BlobStore, HttpBlobStore, StoreError};
use reqwest::Url;

const ACCOUNT_KEY: &str = "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=";
const ACCOUNT_KEY_BYTES: &[u8] = b"0123456789abcdef0123456789abcdef";

async fn blob(Path(name): Path<String>) -> Response {
    match name.as_str() {
        "machine001.md" => (StatusCode::OK, "Step 1 text").into_response(),
        "locked.md" => StatusCode::FORBIDDEN.into_response(),
        "binary.md" => (StatusCode::OK, vec![0xff_u8, 0xfe, 0xfd]).into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn list(Query(params): Query<HashMap<String, String>>) -> Response {
    if params.get("comp").map(String::as_str) != Some("list") {
        return StatusCode::BAD_REQUEST.into_response();
    }
    let body = match params.get("marker").map(String::as_str) {
        None => {
            "<EnumerationResults><Blobs><Blob><Name>a.md</Name></Blob><Blob><Name>b.md</Name></Blob></Blobs><NextMarker>page-2</NextMarker></EnumerationResults>"
        }
        Some("page-2") => {
            "<EnumerationResults><Blobs><Blob><Name>c.md</Name></Blob></Blobs><NextMarker /></EnumerationResults>"
        }
        Some(_) => return StatusCode::BAD_REQUEST.into_response(),
    };
    (StatusCode::OK, body).into_response()
}

/// 每页都返回同一个 marker
async fn looping_list() -> &'static str {
    "<EnumerationResults><Blobs><Blob><Name>x.md</Name></Blob></Blobs><NextMarker>again</NextMarker></EnumerationResults>"
}

/// 按 Shared Key 方案重新计算签名，不匹配则 403
async fn private_blob(method: Method, uri: Uri, headers: HeaderMap) -> Response {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };
    let date = header("x-ms-date");
    let version = header("x-ms-version");
    let url = Url::parse(&format!("http://stub{}", uri)).unwrap();
    let to_sign = string_to_sign(
        method.as_str(),
        &url,
        "acct",
        &[("x-ms-date", date.as_str()), ("x-ms-version", version.as_str())],
    );
    let expected = format!(
        "SharedKey acct:{}",
        shared_key_signature(ACCOUNT_KEY_BYTES, &to_sign).unwrap()
    );
    if date.is_empty() || header(AUTHORIZATION.as_str()) != expected {
        return StatusCode::FORBIDDEN.into_response();
    }
    (StatusCode::OK, "secret manual").into_response()
}

async fn spawn_stub() -> String {
    let app = Router::new()
        .route("/acct/manuals-md", get(list))
        .route("/acct/manuals-md/:blob", get(blob))
        .route("/acct/looping", get(looping_list))
        .route("/acct/private/:blob", get(private_blob));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/acct", addr)
}

fn store(endpoint: &str, container: &str) -> HttpBlobStore {
    HttpBlobStore::from_connection_string(&format!("BlobEndpoint={}", endpoint), container).unwrap()
}

#[tokio::test]
async fn test_exists_status_mapping() {
    let endpoint = spawn_stub().await;
    let store = store(&endpoint, "manuals-md");

    assert!(store.exists("machine001.md").await.unwrap());
    assert!(!store.exists("machine404.md").await.unwrap());
    match store.exists("locked.md").await {
        Err(StoreError::Status { status, url }) => {
            assert_eq!(status, 403);
            assert!(url.ends_with("/acct/manuals-md/locked.md"));
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[tokio::test]
async fn test_download_text() {
    let endpoint = spawn_stub().await;
    let store = store(&endpoint, "manuals-md");

    assert_eq!(store.download_text("machine001.md").await.unwrap(), "Step 1 text");
    assert!(matches!(
        store.download_text("binary.md").await,
        Err(StoreError::Utf8(_))
    ));
    assert!(matches!(
        store.download_text("machine404.md").await,
        Err(StoreError::Status { status: 404, .. })
    ));
}

#[tokio::test]
async fn test_list_follows_next_marker() {
    let endpoint = spawn_stub().await;
    let names = store(&endpoint, "manuals-md").list().await.unwrap();
    assert_eq!(names, vec!["a.md", "b.md", "c.md"]);
}

#[tokio::test]
async fn test_list_stops_on_repeated_marker() {
    let endpoint = spawn_stub().await;
    let names = store(&endpoint, "looping").list().await.unwrap();
    assert_eq!(names, vec!["x.md", "x.md"]);
}

#[tokio::test]
async fn test_shared_key_requests_are_signed() {
    let endpoint = spawn_stub().await;
    let signed = HttpBlobStore::from_connection_string(
        &format!("BlobEndpoint={};AccountName=acct;AccountKey={}", endpoint, ACCOUNT_KEY),
        "private",
    )
    .unwrap();
    assert!(signed.exists("machine001.md").await.unwrap());
    assert_eq!(
        signed.download_text("machine001.md").await.unwrap(),
        "secret manual"
    );

    // 没有密钥的匿名请求被拒绝
    let anonymous = store(&endpoint, "private");
    assert!(matches!(
        anonymous.exists("machine001.md").await,
        Err(StoreError::Status { status: 403, .. })
    ));
}
