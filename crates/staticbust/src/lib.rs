//! Static file serving with content-hash cache busting.
//!
//! Files are addressed by URLs that embed a digest of their content, so they
//! can be cached forever and still change the moment the file does.
//!
//! - `/css/app.css` redirects to `/css/app.1f2e3d4c5b6a7988.css`
//! - `/css/app.1f2e3d4c5b6a7988.css` serves the bytes of `css/app.css`
//! - a stale digest redirects to the current one
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use staticbust::{web, ServerConfig, StaticServer};
//!
//! # async fn run() -> std::io::Result<()> {
//! let config = ServerConfig {
//!     root: "/static".to_string(),
//!     ..ServerConfig::with_dir("/srv/www/static")
//! };
//! let server = Arc::new(StaticServer::new(config));
//!
//! // Build links for templates
//! let _href = server.hashed_path("/css/app.css");
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, web::router(server)).await
//! # }
//! ```
//!
//! # Alternate directory
//!
//! When `alt_dir` is set it is searched first. A file missing there falls
//! back to `dir`; any other error (permissions, I/O) is reported as is.
//!
//! # Configuration
//!
//! See [`config`] for the `STATICBUST_*` environment variables and the
//! `[server]` TOML section.

pub mod cache;
pub mod codec;
pub mod config;
pub mod content;
pub mod error;
pub mod fs;
pub mod handlers;
pub mod hash;
pub mod server;
pub mod web;

// Re-exports for convenience
pub use cache::{DigestLookup, HashCache};
pub use config::{ConfigError, ServerConfig};
pub use error::{ErrorKind, Result, ServeError};
pub use fs::{FileResolver, Filesystem, LocalFilesystem, OpenFile};
pub use handlers::{ErrorHandler, ErrorHandlers, StatusHandler};
pub use hash::{Blake3Hasher, ContentHasher};
pub use server::{Resolution, StaticServer};
