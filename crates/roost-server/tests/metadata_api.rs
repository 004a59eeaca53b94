//! Integration tests driving the metadata router end to end
//!
//! Builds a per-client tree in a temp directory and exercises the axum
//! router directly via `oneshot`, with the peer address injected the way
//! the connect-info machinery would.

use std::fs;
use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use roost_server::{app, ServerConfig};
use tower::ServiceExt;

fn client_addr() -> SocketAddr {
    SocketAddr::from(([10, 0, 0, 7], 51234))
}

fn other_addr() -> SocketAddr {
    SocketAddr::from(([10, 0, 0, 8], 40000))
}

fn fixture() -> (tempfile::TempDir, Router) {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");

    let ec2 = tmp.path().join("10.0.0.7/ec2");
    fs::create_dir_all(ec2.join("meta-data/public-keys")).unwrap();
    fs::create_dir_all(ec2.join("meta-data/placement")).unwrap();
    fs::write(ec2.join("user-data"), b"#cloud-config\nhostname: server-01\n").unwrap();
    fs::write(ec2.join("meta-data/hostname"), b"server-01\n").unwrap();
    fs::write(ec2.join("meta-data/placement/region"), b"eu-west-1\n").unwrap();
    fs::write(ec2.join("meta-data/public-keys/key-b"), b"ssh-rsa BBBB\n").unwrap();
    fs::write(ec2.join("meta-data/public-keys/key-a"), b"ssh-rsa AAAA\n").unwrap();

    let other = tmp.path().join("10.0.0.8/ec2");
    fs::create_dir_all(&other).unwrap();
    fs::write(other.join("user-data"), b"#!/bin/sh\necho other\n").unwrap();

    let config = ServerConfig::new("127.0.0.1:0".parse().unwrap(), tmp.path());
    (tmp, app(&config))
}

async fn request(
    app: Router,
    method: Method,
    addr: SocketAddr,
    path: &str,
) -> (StatusCode, String) {
    let mut request = Request::builder()
        .method(method)
        .uri(path)
        .body(Body::empty())
        .unwrap();
    request.extensions_mut().insert(ConnectInfo(addr));

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8_lossy(&body).into_owned())
}

async fn get(app: Router, addr: SocketAddr, path: &str) -> (StatusCode, String) {
    request(app, Method::GET, addr, path).await
}

#[tokio::test]
async fn test_user_data() {
    let (_tmp, app) = fixture();

    let (status, body) = get(app, client_addr(), "/latest/user-data").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "#cloud-config\nhostname: server-01\n");
}

#[tokio::test]
async fn test_user_data_extra_segment_is_not_found() {
    let (_tmp, app) = fixture();

    let (status, body) = get(app, client_addr(), "/latest/user-data/extra").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_any_method_is_accepted() {
    let (_tmp, app) = fixture();

    let (status, body) =
        request(app, Method::POST, client_addr(), "/latest/user-data").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "#cloud-config\nhostname: server-01\n");
}

#[tokio::test]
async fn test_public_keys_listing_is_sorted() {
    let (_tmp, app) = fixture();

    let (status, body) = get(app, client_addr(), "/latest/meta-data/public-keys").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "0=key-a\n1=key-b\n");
}

#[tokio::test]
async fn test_public_key_format_listing() {
    let (_tmp, app) = fixture();

    let (status, body) = get(app, client_addr(), "/latest/meta-data/public-keys/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "openssh-key\n");
}

#[tokio::test]
async fn test_public_key_content() {
    let (_tmp, app) = fixture();

    let (status, body) = get(
        app,
        client_addr(),
        "/latest/meta-data/public-keys/0/openssh-key",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ssh-rsa AAAA\n");
}

#[tokio::test]
async fn test_public_key_directory_entry_loses_suffix() {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let keys = tmp.path().join("10.0.0.7/ec2/meta-data/public-keys");
    fs::create_dir_all(keys.join("key-dir")).unwrap();
    fs::write(keys.join("key-a"), b"ssh-rsa AAAA\n").unwrap();
    fs::write(keys.join("key-dir/openssh-key"), b"ssh-rsa DDDD\n").unwrap();
    let config = ServerConfig::new("127.0.0.1:0".parse().unwrap(), tmp.path());
    let app = app(&config);

    // The directory entry is reported as a plain key name
    let (status, body) = get(app.clone(), client_addr(), "/latest/meta-data/public-keys").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "0=key-a\n1=key-dir\n");

    // The stripped name is what the keyed fetch resolves against
    let (status, body) = get(
        app,
        client_addr(),
        "/latest/meta-data/public-keys/1/openssh-key",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "openssh-key\n");
}

#[tokio::test]
async fn test_public_key_index_out_of_range() {
    let (_tmp, app) = fixture();

    let (status, body) = get(app, client_addr(), "/latest/meta-data/public-keys/2").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_generic_attribute() {
    let (_tmp, app) = fixture();

    let (status, body) = get(app, client_addr(), "/latest/meta-data/hostname").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "server-01\n");
}

#[tokio::test]
async fn test_directory_attribute_listing() {
    let (_tmp, app) = fixture();

    let (status, body) = get(app, client_addr(), "/latest/meta-data").await;
    assert_eq!(status, StatusCode::OK);
    let mut lines: Vec<_> = body.lines().collect();
    lines.sort();
    assert_eq!(lines, vec!["hostname", "placement/", "public-keys/"]);
}

#[tokio::test]
async fn test_invalid_characters_are_not_found() {
    let (_tmp, app) = fixture();

    let (status, body) = get(app, client_addr(), "/latest/meta-data/HOSTNAME").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_traversal_is_cleaned() {
    let (_tmp, app) = fixture();

    let (status, body) = get(app, client_addr(), "/latest/skipped/../user-data").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "#cloud-config\nhostname: server-01\n");
}

#[tokio::test]
async fn test_percent_encoded_path_is_decoded() {
    let (_tmp, app) = fixture();

    let (status, body) = get(app, client_addr(), "/latest/%75ser-data").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "#cloud-config\nhostname: server-01\n");
}

#[tokio::test]
async fn test_encoded_traversal_stays_in_subtree() {
    let (_tmp, app) = fixture();

    // %2e%2e decodes to ".." and is folded away before resolution
    let (status, body) = get(app, client_addr(), "/latest/%2e%2e/latest/user-data").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "#cloud-config\nhostname: server-01\n");
}

#[tokio::test]
async fn test_undecodable_path_is_not_found() {
    let (_tmp, app) = fixture();

    let (status, body) = get(app, client_addr(), "/latest/%ff%fe").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_openstack_is_not_found() {
    let (_tmp, app) = fixture();

    let (status, _) = get(app, client_addr(), "/openstack/latest/meta-data").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_clients_are_isolated() {
    let (_tmp, app) = fixture();

    let (status, body) = get(app.clone(), other_addr(), "/latest/user-data").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "#!/bin/sh\necho other\n");

    // The other client has no keys
    let (status, _) = get(app, other_addr(), "/latest/meta-data/public-keys").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_client_is_not_found() {
    let (_tmp, app) = fixture();

    let unknown = SocketAddr::from(([192, 168, 9, 9], 1234));
    let (status, body) = get(app, unknown, "/latest/user-data").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_root_path_is_not_found() {
    let (_tmp, app) = fixture();

    let (status, _) = get(app, client_addr(), "/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
