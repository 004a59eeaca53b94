//! Request handling for the metadata endpoint
//!
//! Every path goes through the same handler regardless of HTTP method;
//! only the path and the peer address matter. Resolution failures of any
//! kind collapse to 404 with an empty body so callers cannot tell a
//! malformed path from a missing resource.

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use roost_metadata::{FileContent, MetadataResponse};
use tokio_util::io::ReaderStream;
use tower_http::services::ServeFile;
use tracing::{debug, warn};

use crate::AppState;

pub(crate) async fn serve_metadata(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
) -> Response {
    // Client identity is the address portion only; the typed peer address
    // carries no port ambiguity
    let client = addr.ip().to_string();
    let raw_path = request.uri().path().to_string();
    debug!("{} {} from {}", request.method(), raw_path, client);

    // The resolver sees the decoded path; escapes that decode to
    // disallowed characters still die on the whitelist afterwards
    let url_path = match urlencoding::decode(&raw_path) {
        Ok(decoded) => decoded.into_owned(),
        Err(err) => {
            debug!("undecodable path {} from {}: {}", raw_path, client, err);
            return StatusCode::NOT_FOUND.into_response();
        }
    };

    match state.service.resolve(&client, &url_path).await {
        Ok(MetadataResponse::Text(body)) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            body,
        )
            .into_response(),
        Ok(MetadataResponse::File(content)) => serve_file(content, request).await,
        Err(err) => {
            debug!("no metadata for {} {}: {}", client, url_path, err);
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

/// Stream file content back to the client.
///
/// GET and HEAD requests with a native path hint go through the static
/// file service, which brings byte ranges, conditional requests, and MIME
/// detection for free. Everything else gets a plain byte-copy of the
/// already opened file.
async fn serve_file(content: FileContent, request: Request) -> Response {
    let is_read = request.method() == Method::GET || request.method() == Method::HEAD;
    if is_read {
        if let Some(path) = content.hint_path() {
            let mut service = ServeFile::new(path);
            return match service.try_call(request).await {
                Ok(response) => response.into_response(),
                Err(err) => {
                    warn!("error serving metadata file {}: {}", path.display(), err);
                    StatusCode::NOT_FOUND.into_response()
                }
            };
        }
    }

    let len = content.len();
    let stream = ReaderStream::new(content.into_reader());
    let mut response = Body::from_stream(stream).into_response();
    response
        .headers_mut()
        .insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    response
}
