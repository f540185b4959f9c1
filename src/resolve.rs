//! Request path resolution.
//!
//! Maps a request-relative path onto the configured base directory and
//! guarantees the result stays inside it. Two checks run, in order:
//!
//! 1. **Lexical**: the request path is split on `/`, `.` and empty segments
//!    are dropped, `..` pops a segment. A `..` with nothing left to pop is
//!    rejected before the filesystem is touched.
//! 2. **Canonical**: the joined path is canonicalized (resolving symlinks)
//!    and must still start with the canonical base directory. This catches
//!    symlinks inside the tree that point outside it.
//!
//! Request paths arrive already percent-decoded.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// A source image on disk, as seen at resolution time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    /// Canonical absolute path.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
}

/// Normalize a request path into a relative path with no `.`/`..` segments.
///
/// Pure: never touches the filesystem.
pub fn normalize_request_path(request_path: &str) -> Result<PathBuf, ResolveError> {
    if request_path.contains('\0') {
        return Err(ResolveError::InvalidPath(request_path.escape_debug().to_string()));
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in request_path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(ResolveError::InvalidPath(request_path.to_string()));
                }
            }
            s => segments.push(s),
        }
    }
    Ok(segments.iter().collect())
}

/// Resolves request paths against a fixed base directory.
#[derive(Debug, Clone)]
pub struct PathResolver {
    base: PathBuf,
}

impl PathResolver {
    /// Canonicalizes `base` once; fails if it does not exist.
    pub fn new(base: &Path) -> Result<Self, ResolveError> {
        let base = base.canonicalize().map_err(|e| match e.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::NotADirectory => {
                ResolveError::NotFound(base.display().to_string())
            }
            _ => ResolveError::Io(e),
        })?;
        Ok(Self { base })
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Join, canonicalize, and bound-check a request path.
    pub fn resolve(&self, request_path: &str) -> Result<PathBuf, ResolveError> {
        let relative = normalize_request_path(request_path)?;
        let candidate = self.base.join(relative);

        // A file used as a directory ("a.jpg/x.jpg") is just as missing.
        let resolved = candidate.canonicalize().map_err(|e| match e.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::NotADirectory => {
                ResolveError::NotFound(request_path.to_string())
            }
            _ => ResolveError::Io(e),
        })?;

        if !resolved.starts_with(&self.base) {
            return Err(ResolveError::InvalidPath(request_path.to_string()));
        }
        Ok(resolved)
    }

    /// Resolve a request path that must name a regular file.
    pub fn resolve_source(&self, request_path: &str) -> Result<SourceImage, ResolveError> {
        let path = self.resolve(request_path)?;
        let meta = fs::metadata(&path)?;
        if !meta.is_file() {
            return Err(ResolveError::NotFound(request_path.to_string()));
        }
        Ok(SourceImage {
            path,
            size: meta.len(),
        })
    }

    /// Resolve a request path that must name a directory.
    pub fn resolve_dir(&self, request_path: &str) -> Result<PathBuf, ResolveError> {
        let path = self.resolve(request_path)?;
        if !path.is_dir() {
            return Err(ResolveError::NotFound(request_path.to_string()));
        }
        Ok(path)
    }

    /// Path of `resolved` relative to the base, with `/` separators.
    pub fn relative(&self, resolved: &Path) -> String {
        resolved
            .strip_prefix(&self.base)
            .map(|p| {
                p.components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .unwrap_or_default()
    }
}
