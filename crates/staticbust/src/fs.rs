//! File resolution over a primary directory and an optional alternate one.
//!
//! Layout:
//! ```text
//! alt_dir/            # tried first when configured
//! └── css/app.css     # shadows dir/css/app.css
//! dir/                # fallback, or the only directory
//! ├── css/app.css
//! └── docs/index.html
//! ```
//!
//! Only a not-found error from the alternate directory falls through to the
//! primary one. Permission and I/O errors are reported as they are.

use std::fmt;
use std::fs::{File, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tracing::debug;

use crate::codec;
use crate::error::Result;

/// Capability for opening a URL path below a directory.
///
/// This is the seam tests use to inject failures the real filesystem cannot
/// produce on demand (permission errors when running as root, for example).
pub trait Filesystem: Send + Sync + fmt::Debug {
    /// Open `path`, a rooted `/`-separated URL path, relative to `dir`.
    fn open(&self, dir: &Path, path: &str) -> io::Result<File>;
}

/// The local disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFilesystem;

impl Filesystem for LocalFilesystem {
    fn open(&self, dir: &Path, path: &str) -> io::Result<File> {
        File::open(local_path(dir, path))
    }
}

/// Map a URL path onto a platform path below `dir`.
///
/// `.` and `..` segments are dropped, so the result never escapes `dir`.
pub fn local_path(dir: &Path, path: &str) -> PathBuf {
    let mut full = dir.to_path_buf();
    for segment in path.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            continue;
        }
        full.push(segment);
    }
    full
}

/// An open file together with its metadata.
///
/// The handle closes when this value is dropped, on every exit path.
#[derive(Debug)]
pub struct OpenFile {
    pub file: File,
    pub metadata: Metadata,
    /// The URL path this file was opened under.
    pub path: String,
}

impl OpenFile {
    pub fn is_dir(&self) -> bool {
        self.metadata.is_dir()
    }

    pub fn is_file(&self) -> bool {
        self.metadata.is_file()
    }

    /// File name used for content-type detection.
    pub fn name(&self) -> &str {
        codec::base_name(&self.path)
    }

    pub fn modified(&self) -> Option<SystemTime> {
        self.metadata.modified().ok()
    }

    pub fn len(&self) -> u64 {
        self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.len() == 0
    }
}

/// Opens URL paths against the configured directory pair.
#[derive(Debug, Clone)]
pub struct FileResolver {
    dir: PathBuf,
    alt_dir: Option<PathBuf>,
    fs: Arc<dyn Filesystem>,
}

impl FileResolver {
    pub fn new(dir: impl Into<PathBuf>, alt_dir: Option<PathBuf>, fs: Arc<dyn Filesystem>) -> Self {
        Self {
            dir: dir.into(),
            alt_dir,
            fs,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn alt_dir(&self) -> Option<&Path> {
        self.alt_dir.as_deref()
    }

    /// Directories in lookup order: alternate first, primary last.
    pub fn search_dirs(&self) -> impl Iterator<Item = &Path> {
        self.alt_dir.as_deref().into_iter().chain(Some(self.dir.as_path()))
    }

    /// Open `path` and stat it.
    pub fn open(&self, path: &str) -> Result<OpenFile> {
        let file = match &self.alt_dir {
            None => self.fs.open(&self.dir, path)?,
            Some(alt) => match self.fs.open(alt, path) {
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    debug!(path, "not in alternate directory, trying primary");
                    self.fs.open(&self.dir, path)?
                }
                other => other?,
            },
        };
        let metadata = file.metadata()?;

        Ok(OpenFile {
            file,
            metadata,
            path: path.to_string(),
        })
    }
}
