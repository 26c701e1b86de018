//! Request resolution: decide between redirecting, serving and failing.
//!
//! A request path goes through these steps, any of which may end it early
//! with a redirect or an error:
//!
//! 1. Normalise: root it, clean it, strip the configured URL root.
//! 2. Index shortcut: `/dir/index.html` redirects to `/dir/`.
//! 3. Hash check: compare the request with the hashed form of its canonical
//!    path and redirect when they differ.
//! 4. Open the path (alternate directory first).
//! 5. Trailing-slash normalisation, when enabled.
//! 6. Directory expansion to the index page.
//! 7. Serve the file, or NotFound for a directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::http::StatusCode;
use tracing::debug;

use crate::cache::{DigestLookup, HashCache};
use crate::codec::{self, base_name, canonical_path, clean_path, hashed_path, join_root};
use crate::config::ServerConfig;
use crate::error::{Result, ServeError};
use crate::fs::{FileResolver, Filesystem, LocalFilesystem, OpenFile};
use crate::handlers::{ErrorHandler, ErrorHandlers};
use crate::hash::{Blake3Hasher, ContentHasher};

/// What to do with a request.
#[derive(Debug)]
pub enum Resolution {
    /// Send the client elsewhere. `location` is an absolute URL path
    /// without query string.
    Redirect {
        location: String,
        status: StatusCode,
    },
    /// Serve this file's bytes.
    Serve(OpenFile),
    /// Render the error handler for this error's kind.
    Error(ServeError),
}

impl Resolution {
    fn redirect(location: String, status: StatusCode) -> Self {
        debug!(%location, status = status.as_u16(), "redirecting");
        Self::Redirect { location, status }
    }
}

/// Static file server with content-hash cache busting.
///
/// Owns its digest cache; two servers never share digests.
#[derive(Debug)]
pub struct StaticServer {
    root: String,
    index_page: String,
    redirect_trailing_slash: bool,
    no_hash_query_strings: bool,
    filenames: Option<Vec<PathBuf>>,
    resolver: FileResolver,
    hasher: Option<Arc<dyn ContentHasher>>,
    cache: HashCache,
    handlers: ErrorHandlers,
}

impl StaticServer {
    /// Build a server from configuration, reading the local filesystem.
    pub fn new(config: ServerConfig) -> Self {
        let root = config.normalized_root();
        let hasher: Option<Arc<dyn ContentHasher>> = if config.hashing {
            Some(Arc::new(Blake3Hasher::new(config.hash_length)))
        } else {
            None
        };

        Self {
            root,
            index_page: config.index_page,
            redirect_trailing_slash: config.redirect_trailing_slash,
            no_hash_query_strings: config.no_hash_query_strings,
            filenames: config.filenames,
            resolver: FileResolver::new(config.dir, config.alt_dir, Arc::new(LocalFilesystem)),
            hasher,
            cache: HashCache::new(),
            handlers: ErrorHandlers::default(),
        }
    }

    /// Replace the content hasher. `None` disables hash rewriting.
    pub fn with_hasher(mut self, hasher: Option<Arc<dyn ContentHasher>>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn with_filesystem(mut self, fs: Arc<dyn Filesystem>) -> Self {
        let dir = self.resolver.dir().to_path_buf();
        let alt_dir = self.resolver.alt_dir().map(Path::to_path_buf);
        self.resolver = FileResolver::new(dir, alt_dir, fs);
        self
    }

    /// Start from a different (usually empty) digest cache.
    pub fn with_cache(mut self, cache: HashCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_not_found_handler(mut self, handler: Arc<dyn ErrorHandler>) -> Self {
        self.handlers.not_found = handler;
        self
    }

    pub fn with_forbidden_handler(mut self, handler: Arc<dyn ErrorHandler>) -> Self {
        self.handlers.forbidden = handler;
        self
    }

    pub fn with_internal_error_handler(mut self, handler: Arc<dyn ErrorHandler>) -> Self {
        self.handlers.internal = handler;
        self
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn cache(&self) -> &HashCache {
        &self.cache
    }

    pub fn handlers(&self) -> &ErrorHandlers {
        &self.handlers
    }

    /// Strip the URL root from a cleaned path. `None` when the path is
    /// outside the root.
    fn strip_root(&self, cleaned: &str) -> Option<String> {
        if self.root.is_empty() {
            return Some(cleaned.to_string());
        }
        match cleaned.strip_prefix(self.root.as_str()) {
            Some("") => Some("/".to_string()),
            Some(rest) if rest.starts_with('/') => Some(rest.to_string()),
            _ => None,
        }
    }

    /// Resolve a request path (and its raw query string, if any).
    ///
    /// Performs blocking filesystem I/O.
    pub fn resolve(&self, path: &str, query: Option<&str>) -> Resolution {
        let mut url_path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };

        let Some(mut p) = self.strip_root(&clean_path(&url_path)) else {
            debug!(path = %url_path, root = %self.root, "request outside root");
            return Resolution::Error(ServeError::NotFound);
        };

        if !self.index_page.is_empty() && url_path.ends_with(&format!("/{}", self.index_page)) {
            return Resolution::redirect(
                codec::resolve_redirect(&url_path, "./"),
                StatusCode::MOVED_PERMANENTLY,
            );
        }

        // The requested path, when hashing swapped in its canonical form.
        let mut literal: Option<String> = None;
        let has_query = query.is_some_and(|q| !q.is_empty());
        if let Some(hasher) = self.hasher.as_deref() {
            if !(self.no_hash_query_strings && has_query) {
                let canonical = canonical_path(&p, hasher);
                match self.cache.lookup_by_content(&canonical, &self.resolver, hasher) {
                    Ok(DigestLookup::NotRegularFile) => {}
                    Ok(DigestLookup::Digest(digest)) => {
                        let hashed = hashed_path(&canonical, &digest);
                        if hashed != p {
                            return Resolution::redirect(
                                join_root(&self.root, &hashed),
                                StatusCode::FOUND,
                            );
                        }
                        if self.redirect_trailing_slash && url_path.ends_with('/') {
                            return Resolution::redirect(
                                join_root(&self.root, &p),
                                StatusCode::MOVED_PERMANENTLY,
                            );
                        }
                        url_path = join_root(&self.root, &canonical);
                        if canonical != p {
                            literal = Some(std::mem::replace(&mut p, canonical));
                        }
                    }
                    Ok(DigestLookup::Missing(err)) => {
                        debug!(path = %canonical, error = %err, "no file to hash, serving literally");
                    }
                    Err(err) => return Resolution::Error(err),
                }
            }
        }

        let open = match (self.resolver.open(&p), literal) {
            (Ok(open), _) => open,
            // Only a hashed copy exists on disk, e.g. one whose digest was
            // recovered from its filename.
            (Err(err), Some(requested)) if err.is_not_found() => {
                debug!(path = %p, literal = %requested, "canonical file missing, serving hashed copy");
                match self.resolver.open(&requested) {
                    Ok(open) => {
                        url_path = join_root(&self.root, &requested);
                        p = requested;
                        open
                    }
                    Err(err) => return Resolution::Error(err),
                }
            }
            (Err(err), _) => return Resolution::Error(err),
        };

        if self.redirect_trailing_slash {
            if open.is_dir() && !url_path.ends_with('/') {
                return Resolution::redirect(
                    codec::resolve_redirect(&url_path, &format!("{url_path}/")),
                    StatusCode::MOVED_PERMANENTLY,
                );
            }
            if !open.is_dir() && url_path.ends_with('/') {
                return Resolution::redirect(
                    codec::resolve_redirect(&url_path, &format!("../{}", base_name(&url_path))),
                    StatusCode::MOVED_PERMANENTLY,
                );
            }
        }

        let mut open = open;
        if open.is_dir() && !self.index_page.is_empty() {
            let index = format!("{}/{}", p.trim_end_matches('/'), self.index_page);
            match self.resolver.open(&index) {
                Ok(index_file) => open = index_file,
                Err(err) => debug!(path = %index, error = %err, "no index page"),
            }
        }

        if open.is_dir() {
            return Resolution::Error(ServeError::NotFound);
        }
        Resolution::Serve(open)
    }

    /// URL of `path` with its current content digest, for building links.
    ///
    /// Falls back to digests recovered from hashed filenames on disk when
    /// the canonical file cannot be opened.
    pub fn hashed_path(&self, path: &str) -> Result<String> {
        let Some(hasher) = self.hasher.as_deref() else {
            return Ok(join_root(&self.root, path));
        };

        let canonical = clean_path(path);
        let digest = match self.cache.lookup_by_content(&canonical, &self.resolver, hasher)? {
            DigestLookup::Digest(digest) => digest,
            DigestLookup::NotRegularFile => String::new(),
            DigestLookup::Missing(_) => self.cache.lookup_by_filename(
                &canonical,
                &self.resolver,
                hasher,
                self.filenames.as_deref(),
            )?,
        };

        Ok(join_root(&self.root, &hashed_path(&canonical, &digest)))
    }
}
