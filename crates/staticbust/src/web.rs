//! HTTP surface: an axum router that answers every path from a [`StaticServer`].
//!
//! Path resolution touches the filesystem synchronously, so it runs on the
//! blocking pool. Only the final byte streaming is async.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, request::Parts, Method, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use tracing::{debug, error, warn};

use crate::content;
use crate::error::{ErrorKind, ServeError};
use crate::server::{Resolution, StaticServer};

/// Characters escaped when a decoded path goes back into a `Location` header.
const LOCATION: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Router serving every request path through `server`.
pub fn router(server: Arc<StaticServer>) -> Router {
    Router::new().fallback(serve_request).with_state(server)
}

/// Resolve and answer one request.
pub async fn serve_request(State(server): State<Arc<StaticServer>>, request: Request) -> Response {
    let (parts, _body) = request.into_parts();

    if parts.method != Method::GET && parts.method != Method::HEAD {
        return (StatusCode::METHOD_NOT_ALLOWED, [(header::ALLOW, "GET, HEAD")]).into_response();
    }

    let path = percent_decode_str(parts.uri.path())
        .decode_utf8_lossy()
        .into_owned();
    let query = parts.uri.query().map(str::to_string);

    let resolving = Arc::clone(&server);
    let resolution = match tokio::task::spawn_blocking(move || {
        resolving.resolve(&path, query.as_deref())
    })
    .await
    {
        Ok(resolution) => resolution,
        Err(err) => {
            error!(error = %err, uri = %parts.uri, "resolver task failed");
            return server.handlers().internal.respond(&parts);
        }
    };

    match resolution {
        Resolution::Redirect { location, status } => redirect(&server, &parts, &location, status),
        Resolution::Serve(open) => match content::serve_content(&parts, open).await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, uri = %parts.uri, "failed to serve file");
                server.handlers().internal.respond(&parts)
            }
        },
        Resolution::Error(err) => render_error(&server, &parts, &err),
    }
}

fn redirect(server: &StaticServer, parts: &Parts, location: &str, status: StatusCode) -> Response {
    let mut target = utf8_percent_encode(location, LOCATION).to_string();
    if let Some(query) = parts.uri.query().filter(|q| !q.is_empty()) {
        target.push('?');
        target.push_str(query);
    }

    match Response::builder()
        .status(status)
        .header(header::LOCATION, target)
        .body(Body::empty())
    {
        Ok(response) => response,
        Err(err) => {
            error!(error = %err, location, "invalid redirect location");
            server.handlers().internal.respond(parts)
        }
    }
}

fn render_error(server: &StaticServer, parts: &Parts, err: &ServeError) -> Response {
    let kind = err.kind();
    match kind {
        ErrorKind::NotFound => debug!(uri = %parts.uri, error = %err, "not found"),
        ErrorKind::Forbidden => warn!(uri = %parts.uri, error = %err, "forbidden"),
        ErrorKind::Internal => warn!(uri = %parts.uri, error = %err, "internal error"),
    }
    server.handlers().for_kind(kind).respond(parts)
}
