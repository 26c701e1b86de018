//! Error responders for the three externally visible failure classes.

use std::fmt;
use std::sync::Arc;

use axum::http::{header, request::Parts, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::error::ErrorKind;

/// Renders the response for a failed request.
///
/// Implemented for any `Fn(&Parts) -> Response` closure, so a custom page is
/// usually just `Arc::new(|_: &Parts| ...)`.
pub trait ErrorHandler: Send + Sync {
    fn respond(&self, request: &Parts) -> Response;
}

impl<F> ErrorHandler for F
where
    F: Fn(&Parts) -> Response + Send + Sync,
{
    fn respond(&self, request: &Parts) -> Response {
        self(request)
    }
}

/// Minimal built-in responder: the status code and its reason phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusHandler(pub StatusCode);

impl ErrorHandler for StatusHandler {
    fn respond(&self, _request: &Parts) -> Response {
        let body = format!(
            "{} {}\n",
            self.0.as_u16(),
            self.0.canonical_reason().unwrap_or("Error")
        );
        (
            self.0,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            body,
        )
            .into_response()
    }
}

/// One handler per [`ErrorKind`], each defaulting to a [`StatusHandler`].
#[derive(Clone)]
pub struct ErrorHandlers {
    pub not_found: Arc<dyn ErrorHandler>,
    pub forbidden: Arc<dyn ErrorHandler>,
    pub internal: Arc<dyn ErrorHandler>,
}

impl ErrorHandlers {
    pub fn for_kind(&self, kind: ErrorKind) -> &dyn ErrorHandler {
        match kind {
            ErrorKind::NotFound => self.not_found.as_ref(),
            ErrorKind::Forbidden => self.forbidden.as_ref(),
            ErrorKind::Internal => self.internal.as_ref(),
        }
    }
}

impl Default for ErrorHandlers {
    fn default() -> Self {
        Self {
            not_found: Arc::new(StatusHandler(StatusCode::NOT_FOUND)),
            forbidden: Arc::new(StatusHandler(StatusCode::FORBIDDEN)),
            internal: Arc::new(StatusHandler(StatusCode::INTERNAL_SERVER_ERROR)),
        }
    }
}

impl fmt::Debug for ErrorHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorHandlers").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts() -> Parts {
        let (parts, _) = Request::builder().uri("/missing").body(()).unwrap().into_parts();
        parts
    }

    #[test]
    fn test_defaults_map_kinds_to_status() {
        let handlers = ErrorHandlers::default();
        let parts = parts();
        assert_eq!(
            handlers.for_kind(ErrorKind::NotFound).respond(&parts).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            handlers.for_kind(ErrorKind::Forbidden).respond(&parts).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            handlers.for_kind(ErrorKind::Internal).respond(&parts).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_closure_handler() {
        let handlers = ErrorHandlers {
            not_found: Arc::new(|req: &Parts| {
                (StatusCode::GONE, format!("no {}", req.uri.path())).into_response()
            }),
            ..ErrorHandlers::default()
        };
        let response = handlers.for_kind(ErrorKind::NotFound).respond(&parts());
        assert_eq!(response.status(), StatusCode::GONE);
    }
}
