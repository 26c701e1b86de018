//! Memoised content digests keyed by canonical path.
//!
//! The cache is append-only for the life of its owner: entries are never
//! evicted and never invalidated when a file changes on disk. Build a fresh
//! cache to forget digests.
//!
//! Lookups take the read lock, fills take the write lock. Two requests that
//! miss on the same path at the same time both hash the file and both insert;
//! the second write replaces an equal value.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use tracing::debug;

use crate::codec;
use crate::error::{Result, ServeError};
use crate::fs::{local_path, FileResolver};
use crate::hash::ContentHasher;

/// Outcome of a content-based digest lookup that did not hard-fail.
#[derive(Debug)]
pub enum DigestLookup {
    /// The digest of the file at the canonical path.
    Digest(String),
    /// The canonical path names a directory or other non-regular entry.
    /// Serve it the ordinary way.
    NotRegularFile,
    /// The canonical path could not be opened. The request may still name a
    /// literal file, so the caller carries on without rewriting.
    Missing(ServeError),
}

/// Digest cache owned by one server instance.
#[derive(Debug, Default)]
pub struct HashCache {
    entries: RwLock<HashMap<String, String>>,
}

impl HashCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, canonical: &str) -> Option<String> {
        // The map is only ever appended to, so a poisoned guard is still coherent.
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(canonical).cloned()
    }

    pub fn insert(&self, canonical: impl Into<String>, digest: impl Into<String>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(canonical.into(), digest.into());
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Digest of the file currently at `canonical`, hashing it on first use.
    ///
    /// Only a failure while hashing an opened regular file is a hard error.
    pub fn lookup_by_content(
        &self,
        canonical: &str,
        resolver: &FileResolver,
        hasher: &dyn ContentHasher,
    ) -> Result<DigestLookup> {
        if let Some(digest) = self.get(canonical) {
            return Ok(DigestLookup::Digest(digest));
        }

        let mut open = match resolver.open(canonical) {
            Ok(open) => open,
            Err(err) => return Ok(DigestLookup::Missing(err)),
        };
        if !open.is_file() {
            return Ok(DigestLookup::NotRegularFile);
        }

        let digest = hasher.hash(&mut open.file)?;
        debug!(path = canonical, digest = %digest, "hashed file content");
        self.insert(canonical, digest.clone());
        Ok(DigestLookup::Digest(digest))
    }

    /// Recover the digest of `canonical` from hashed files already on disk.
    ///
    /// Used when the canonical file itself cannot be opened. Candidates come
    /// from `filenames` when given, or from globbing `stem.*.ext` in the
    /// search directories. The first candidate whose canonical form equals
    /// `canonical` and whose digest part validates wins.
    pub fn lookup_by_filename(
        &self,
        canonical: &str,
        resolver: &FileResolver,
        hasher: &dyn ContentHasher,
        filenames: Option<&[PathBuf]>,
    ) -> Result<String> {
        if let Some(digest) = self.get(canonical) {
            return Ok(digest);
        }

        let (stem, ext) = codec::split_extension(canonical);
        let mut candidates = Vec::new();

        for dir in resolver.search_dirs() {
            let prefix = local_path(dir, stem);
            match filenames {
                Some(known) => {
                    let prefix = prefix.to_string_lossy();
                    candidates.extend(
                        known
                            .iter()
                            .filter(|name| name.to_string_lossy().starts_with(&*prefix))
                            .filter_map(|name| url_path(dir, name)),
                    );
                }
                None => {
                    let pattern = format!(
                        "{}.*{}",
                        glob::Pattern::escape(&prefix.to_string_lossy()),
                        glob::Pattern::escape(ext)
                    );
                    for entry in glob::glob(&pattern)?.flatten() {
                        candidates.extend(url_path(dir, &entry));
                    }
                }
            }
        }

        for candidate in &candidates {
            if codec::canonical_path(candidate, hasher) != canonical {
                continue;
            }
            let Some(without_ext) = candidate.strip_suffix(ext) else {
                continue;
            };
            let (_, digest) = codec::split_extension(without_ext);
            let digest = digest.trim_start_matches('.');
            if hasher.is_hash(digest) {
                debug!(path = canonical, digest, file = %candidate, "recovered digest from filename");
                self.insert(canonical, digest);
                return Ok(digest.to_string());
            }
        }

        Err(ServeError::NotFound)
    }
}

/// Convert an on-disk path below `dir` back into a rooted URL path.
fn url_path(dir: &Path, file: &Path) -> Option<String> {
    let rel = file.strip_prefix(dir).ok()?;
    let mut url = String::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => {
                url.push('/');
                url.push_str(part.to_str()?);
            }
            _ => return None,
        }
    }
    Some(url)
}
