//! Directory listing for the gallery pages.
//!
//! Lists one level of a directory under the base: subdirectories and
//! supported images, each sorted by name. Dot-entries and the cache
//! directory are hidden. Symlinks are followed only when their target stays
//! inside the base directory.

use crate::imaging::is_supported_image;
use crate::resolve::{PathResolver, ResolveError};
use std::io;
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

/// One directory's browsable contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirContents {
    /// Path relative to the base, `/`-separated, empty for the base itself.
    pub path: String,
    /// Subdirectory names.
    pub subdirs: Vec<String>,
    /// Image file names.
    pub images: Vec<String>,
}

impl DirContents {
    /// Request path of a child entry.
    pub fn child_path(&self, name: &str) -> String {
        join_rel(&self.path, name)
    }

    /// Previous and next image around `name`, if any.
    pub fn neighbors(&self, name: &str) -> (Option<&str>, Option<&str>) {
        let Some(idx) = self.images.iter().position(|i| i == name) else {
            return (None, None);
        };
        let prev = idx.checked_sub(1).map(|i| self.images[i].as_str());
        let next = self.images.get(idx + 1).map(String::as_str);
        (prev, next)
    }
}

/// Whether a walked entry is browsable: not a dot-entry and not the
/// (canonical) cache directory.
pub fn is_listed(entry: &DirEntry, cache_dir: Option<&Path>) -> bool {
    if entry.file_name().to_string_lossy().starts_with('.') {
        return false;
    }
    cache_dir.is_none_or(|c| entry.path() != c)
}

/// List the directory at request path `rel`.
///
/// `cache_dir` must be canonical to match; pass `None` when it lies outside
/// the base.
pub fn scan_dir(
    resolver: &PathResolver,
    rel: &str,
    cache_dir: Option<&Path>,
) -> Result<DirContents, ResolveError> {
    let dir = resolver.resolve_dir(rel)?;
    let path = resolver.relative(&dir);
    let mut contents = DirContents {
        path,
        ..DirContents::default()
    };

    for entry in WalkDir::new(&dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(io::Error::from)?;
        if !is_listed(&entry, cache_dir) {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();

        let file_type = entry.file_type();
        let (is_dir, is_file) = if file_type.is_symlink() {
            match resolver.resolve(&contents.child_path(&name)) {
                Ok(target) if cache_dir.is_some_and(|c| target == c) => continue,
                Ok(target) => (target.is_dir(), target.is_file()),
                Err(_) => continue,
            }
        } else {
            (file_type.is_dir(), file_type.is_file())
        };

        if is_dir {
            contents.subdirs.push(name);
        } else if is_file && is_supported_image(&name) {
            contents.images.push(name);
        }
    }

    Ok(contents)
}

/// Split a request path into its non-empty segments.
pub fn segments(rel: &str) -> Vec<&str> {
    rel.split('/').filter(|s| !s.is_empty()).collect()
}

/// Parent request path and final segment of `rel`.
pub fn split_parent(rel: &str) -> (String, &str) {
    let segs = segments(rel);
    match segs.split_last() {
        Some((last, parent)) => (parent.join("/"), *last),
        None => (String::new(), ""),
    }
}

fn join_rel(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}
