//! Byte serving for a resolved file.
//!
//! Handles what a static file response needs once the path question is
//! settled: content type, `Last-Modified`, conditional requests, single byte
//! ranges and HEAD. The file is streamed, never read into memory.

use std::io::{self, SeekFrom};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::http::{header, request::Parts, HeaderValue, Method, StatusCode};
use axum::response::Response;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use crate::fs::OpenFile;

/// A `Range` header that cannot be satisfied for the file's length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeNotSatisfiable;

/// Parse a single `bytes=` range into an inclusive `(start, end)` pair.
///
/// Returns `Ok(None)` for multi-range requests, which are answered with the
/// whole file.
pub fn parse_range(value: &str, size: u64) -> Result<Option<(u64, u64)>, RangeNotSatisfiable> {
    let ranges = value.trim().strip_prefix("bytes=").ok_or(RangeNotSatisfiable)?;
    if ranges.contains(',') {
        return Ok(None);
    }
    if size == 0 {
        return Err(RangeNotSatisfiable);
    }

    let (first, last) = ranges.split_once('-').ok_or(RangeNotSatisfiable)?;
    let (first, last) = (first.trim(), last.trim());

    if first.is_empty() {
        // bytes=-N: the final N bytes
        let n: u64 = last.parse().map_err(|_| RangeNotSatisfiable)?;
        if n == 0 {
            return Err(RangeNotSatisfiable);
        }
        return Ok(Some((size.saturating_sub(n), size - 1)));
    }

    let start: u64 = first.parse().map_err(|_| RangeNotSatisfiable)?;
    if start >= size {
        return Err(RangeNotSatisfiable);
    }
    let end = if last.is_empty() {
        size - 1
    } else {
        let end: u64 = last.parse().map_err(|_| RangeNotSatisfiable)?;
        if end < start {
            return Err(RangeNotSatisfiable);
        }
        end.min(size - 1)
    };
    Ok(Some((start, end)))
}

/// HTTP dates have one-second resolution.
fn truncate_to_secs(time: SystemTime) -> SystemTime {
    let secs = time
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    UNIX_EPOCH + Duration::from_secs(secs)
}

fn header_date(request: &Parts, name: header::HeaderName) -> Option<SystemTime> {
    let value = request.headers.get(name)?.to_str().ok()?;
    httpdate::parse_http_date(value).ok()
}

fn bare(status: StatusCode, last_modified: Option<&HeaderValue>) -> io::Result<Response> {
    let mut builder = Response::builder().status(status);
    if let Some(value) = last_modified {
        builder = builder.header(header::LAST_MODIFIED, value);
    }
    builder.body(Body::empty()).map_err(io::Error::other)
}

/// Write `open` to a response, honouring conditional and range headers.
pub async fn serve_content(request: &Parts, open: OpenFile) -> io::Result<Response> {
    let size = open.len();
    let modified = open.modified().map(truncate_to_secs);
    let last_modified = modified
        .map(httpdate::fmt_http_date)
        .and_then(|date| HeaderValue::from_str(&date).ok());
    let mime = mime_guess::from_path(open.name()).first_or_octet_stream();

    if let Some(modified) = modified {
        if let Some(since) = header_date(request, header::IF_UNMODIFIED_SINCE) {
            if modified > since {
                return bare(StatusCode::PRECONDITION_FAILED, None);
            }
        }
        let cacheable = request.method == Method::GET || request.method == Method::HEAD;
        if cacheable {
            if let Some(since) = header_date(request, header::IF_MODIFIED_SINCE) {
                if modified <= since {
                    return bare(StatusCode::NOT_MODIFIED, last_modified.as_ref());
                }
            }
        }
    }

    // If-Range with a stale date means "send everything". No entity tags
    // are issued, so a tag never matches either.
    let range_applies = match request.headers.get(header::IF_RANGE) {
        None => true,
        Some(_) => match header_date(request, header::IF_RANGE) {
            Some(date) => modified == Some(date),
            None => false,
        },
    };
    let range = match request.headers.get(header::RANGE).and_then(|v| v.to_str().ok()) {
        Some(value) if range_applies => match parse_range(value, size) {
            Ok(range) => range,
            Err(RangeNotSatisfiable) => {
                return Response::builder()
                    .status(StatusCode::RANGE_NOT_SATISFIABLE)
                    .header(header::CONTENT_RANGE, format!("bytes */{size}"))
                    .body(Body::empty())
                    .map_err(io::Error::other);
            }
        },
        _ => None,
    };

    let (status, start, length) = match range {
        Some((start, end)) => (StatusCode::PARTIAL_CONTENT, start, end - start + 1),
        None => (StatusCode::OK, 0, size),
    };

    let mut builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, mime.to_string())
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONTENT_LENGTH, length);
    if let Some(value) = &last_modified {
        builder = builder.header(header::LAST_MODIFIED, value);
    }
    if let Some((start, end)) = range {
        builder = builder.header(header::CONTENT_RANGE, format!("bytes {start}-{end}/{size}"));
    }

    let body = if request.method == Method::HEAD {
        Body::empty()
    } else {
        let mut file = tokio::fs::File::from_std(open.file);
        if start > 0 {
            file.seek(SeekFrom::Start(start)).await?;
        }
        Body::from_stream(ReaderStream::new(file.take(length)))
    };

    builder.body(body).map_err(io::Error::other)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range_forms() {
        assert_eq!(parse_range("bytes=0-499", 1000), Ok(Some((0, 499))));
        assert_eq!(parse_range("bytes=-500", 1000), Ok(Some((500, 999))));
        assert_eq!(parse_range("bytes=500-", 1000), Ok(Some((500, 999))));
        assert_eq!(parse_range("bytes=0-", 1000), Ok(Some((0, 999))));
    }

    #[test]
    fn test_parse_range_clamps() {
        assert_eq!(parse_range("bytes=0-9999", 100), Ok(Some((0, 99))));
        assert_eq!(parse_range("bytes=-5000", 100), Ok(Some((0, 99))));
    }

    #[test]
    fn test_parse_range_unsatisfiable() {
        assert_eq!(parse_range("bytes=100-", 100), Err(RangeNotSatisfiable));
        assert_eq!(parse_range("bytes=5-1", 100), Err(RangeNotSatisfiable));
        assert_eq!(parse_range("bytes=-0", 100), Err(RangeNotSatisfiable));
        assert_eq!(parse_range("items=0-1", 100), Err(RangeNotSatisfiable));
        assert_eq!(parse_range("bytes=0-1", 0), Err(RangeNotSatisfiable));
        assert_eq!(parse_range("bytes=a-b", 100), Err(RangeNotSatisfiable));
    }

    #[test]
    fn test_parse_range_multi_serves_whole_file() {
        assert_eq!(parse_range("bytes=0-1,5-6", 100), Ok(None));
    }

    #[test]
    fn test_truncate_to_secs() {
        let t = UNIX_EPOCH + Duration::from_millis(1_500);
        assert_eq!(truncate_to_secs(t), UNIX_EPOCH + Duration::from_secs(1));
    }
}
