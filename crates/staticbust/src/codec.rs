//! Path codec: conversion between canonical and hashed URL paths.
//!
//! A canonical path is what a file is called on disk (`/css/app.css`). Its
//! hashed form carries the content digest before the last extension
//! (`/css/app.1f2e3d4c.css`), or as a trailing extension when there is none
//! (`/README.1f2e3d4c`).
//!
//! For every canonical path `c` and digest `h` produced by the configured
//! hasher, `canonical_path(&hashed_path(c, h), hasher) == c`.
//!
//! The module also carries the small set of URL path helpers the resolver
//! needs (`clean_path`, `join_root`, `resolve_redirect`). They operate on
//! `/`-separated URL paths, never on platform paths.

use crate::hash::ContentHasher;

/// Insert `digest` into the last path segment of `canonical`.
///
/// An empty digest leaves the path untouched.
pub fn hashed_path(canonical: &str, digest: &str) -> String {
    if digest.is_empty() {
        return canonical.to_string();
    }

    let (stem, ext) = split_extension(canonical);
    format!("{stem}.{digest}{ext}")
}

/// Split the extension (with its dot) off the last path segment.
///
/// A leading dot does not start an extension, so `/.env` has none.
pub fn split_extension(path: &str) -> (&str, &str) {
    let (dir, file) = split(path);
    match file.rfind('.') {
        Some(i) if i > 0 => path.split_at(dir.len() + i),
        _ => (path, ""),
    }
}

/// Strip a digest from the last path segment of `requested`, if it has one.
///
/// With three or more dot-separated parts the digest sits second to last
/// (`app.<h>.css`); otherwise it is the last part (`README.<h>`). A dotfile
/// split into exactly three parts (`.env.<h>`) carries it last as well, and
/// a bare dotfile (`.env`) never loses a part.
pub fn canonical_path(requested: &str, hasher: &dyn ContentHasher) -> String {
    let (dir, file) = split(requested);
    let parts: Vec<&str> = file.split('.').collect();
    let len = parts.len();

    let removable = len >= 3 || (len == 2 && !parts[0].is_empty());
    if !removable {
        return requested.to_string();
    }

    let dotfile_triplet = len == 3 && parts[0].is_empty();
    let candidate = if len > 2 && !dotfile_triplet {
        len - 2
    } else {
        len - 1
    };

    if !hasher.is_hash(parts[candidate]) {
        return requested.to_string();
    }

    let kept: Vec<&str> = parts
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != candidate)
        .map(|(_, part)| *part)
        .collect();
    format!("{dir}{}", kept.join("."))
}

/// Split a path right after its final slash into directory and file name.
pub fn split(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(i) => (&path[..=i], &path[i + 1..]),
        None => ("", path),
    }
}

/// Lexically normalise a URL path.
///
/// The result is always rooted, has no `.` or `..` segments, no repeated
/// slashes and no trailing slash (except for `/` itself). `..` never climbs
/// above the root.
pub fn clean_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    format!("/{}", segments.join("/"))
}

/// Last element of a path, ignoring trailing slashes.
pub fn base_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/";
    }
    match trimmed.rfind('/') {
        Some(i) => &trimmed[i + 1..],
        None => trimmed,
    }
}

/// Prefix `path` with the URL root and normalise the result.
pub fn join_root(root: &str, path: &str) -> String {
    if root.is_empty() {
        clean_path(path)
    } else {
        clean_path(&format!("{root}/{path}"))
    }
}

/// Resolve a redirect target against the path of the request being answered.
///
/// Relative targets (`./`, `../name`) are resolved against the directory of
/// `request_path`, the way a browser resolves a relative `Location`. A
/// trailing slash on the target survives normalisation.
pub fn resolve_redirect(request_path: &str, target: &str) -> String {
    let joined = if target.starts_with('/') {
        target.to_string()
    } else {
        let base = if request_path.is_empty() { "/" } else { request_path };
        let (dir, _) = split(base);
        format!("{dir}{target}")
    };

    let mut resolved = clean_path(&joined);
    if joined.ends_with('/') && !resolved.ends_with('/') {
        resolved.push('/');
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Blake3Hasher;

    fn hasher() -> Blake3Hasher {
        Blake3Hasher::new(8)
    }

    #[test]
    fn test_hashed_path_inserts_before_extension() {
        assert_eq!(hashed_path("/css/app.css", "deadbeef"), "/css/app.deadbeef.css");
        assert_eq!(hashed_path("/js/app.min.js", "deadbeef"), "/js/app.min.deadbeef.js");
    }

    #[test]
    fn test_hashed_path_appends_without_extension() {
        assert_eq!(hashed_path("/README", "deadbeef"), "/README.deadbeef");
        assert_eq!(hashed_path("/.env", "deadbeef"), "/.env.deadbeef");
    }

    #[test]
    fn test_hashed_path_empty_digest_is_identity() {
        for path in ["/", "/a.css", "/README", "/.env", "/x/y/z.tar.gz"] {
            assert_eq!(hashed_path(path, ""), path);
        }
    }

    #[test]
    fn test_canonical_path_strips_digest() {
        let h = hasher();
        assert_eq!(canonical_path("/css/app.deadbeef.css", &h), "/css/app.css");
        assert_eq!(canonical_path("/README.deadbeef", &h), "/README");
        assert_eq!(canonical_path("/js/app.min.deadbeef.js", &h), "/js/app.min.js");
        assert_eq!(canonical_path("/.env.deadbeef", &h), "/.env");
    }

    #[test]
    fn test_canonical_path_leaves_plain_names_alone() {
        let h = hasher();
        assert_eq!(canonical_path("/css/app.css", &h), "/css/app.css");
        assert_eq!(canonical_path("/js/app.min.js", &h), "/js/app.min.js");
        assert_eq!(canonical_path("/docs/", &h), "/docs/");
        assert_eq!(canonical_path("/", &h), "/");
    }

    #[test]
    fn test_canonical_path_dotfiles_are_safe() {
        let h = hasher();
        assert_eq!(canonical_path("/.env", &h), "/.env");
        assert_eq!(canonical_path("/.deadbeef", &h), "/.deadbeef");
        assert_eq!(canonical_path("/deadbeef", &h), "/deadbeef");
    }

    #[test]
    fn test_round_trip() {
        let h = hasher();
        let paths = [
            "/css/app.css",
            "/README",
            "/.env",
            "/fonts/Inter-Bold.woff2",
            "/archive.tar.gz",
            "/deep/nested/dir/file.js",
        ];
        for path in paths {
            let digest = h.hash_bytes(path.as_bytes());
            let hashed = hashed_path(path, &digest);
            assert_ne!(hashed, path);
            assert_eq!(canonical_path(&hashed, &h), path, "via {hashed}");
        }
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("/css/app.css"), ("/css/app", ".css"));
        assert_eq!(split_extension("/a.b/README"), ("/a.b/README", ""));
        assert_eq!(split_extension("/.env"), ("/.env", ""));
        assert_eq!(split_extension("/x.tar.gz"), ("/x.tar", ".gz"));
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path(""), "/");
        assert_eq!(clean_path("/"), "/");
        assert_eq!(clean_path("a/b"), "/a/b");
        assert_eq!(clean_path("/a//b/./c/"), "/a/b/c");
        assert_eq!(clean_path("/a/b/../c"), "/a/c");
        assert_eq!(clean_path("/../../etc/passwd"), "/etc/passwd");
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("/docs/app.css"), "app.css");
        assert_eq!(base_name("/docs/app.css/"), "app.css");
        assert_eq!(base_name("/"), "/");
        assert_eq!(base_name("name"), "name");
    }

    #[test]
    fn test_join_root() {
        assert_eq!(join_root("", "/a.css"), "/a.css");
        assert_eq!(join_root("/static", "/a.css"), "/static/a.css");
        assert_eq!(join_root("/static", "/"), "/static");
    }

    #[test]
    fn test_resolve_redirect() {
        assert_eq!(resolve_redirect("/docs/index.html", "./"), "/docs/");
        assert_eq!(resolve_redirect("/index.html", "./"), "/");
        assert_eq!(resolve_redirect("/docs/app.css/", "../app.css"), "/docs/app.css");
        assert_eq!(resolve_redirect("/docs", "/docs/"), "/docs/");
        assert_eq!(resolve_redirect("", "./"), "/");
    }
}
