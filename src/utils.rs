// ABOUTME: Utility functions for the tutorial-slides application
// ABOUTME: Directory validation and creation, path resolution and content types

use crate::errors::{Result, SlideError};
use std::path::{Path, PathBuf};

/// Check that a site root or source directory is present before using it
pub fn validate_directory_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(SlideError::PathNotFoundError(path.to_path_buf()));
    }
    if !path.is_dir() {
        return Err(SlideError::ValidationError(format!(
            "Path is not a directory: {:?}",
            path
        )));
    }
    Ok(())
}

/// Create the flat output directory (and parents) unless it already exists.
///
/// Safe to call before every build; fails when a file sits at `path`.
pub fn ensure_directory_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    } else if !path.is_dir() {
        return Err(SlideError::ValidationError(format!(
            "Path exists but is not a directory: {:?}",
            path
        )));
    }
    Ok(())
}

/// Canonical form of a watched path, so event paths can be compared against it
pub fn get_absolute_path(path: &Path) -> Result<PathBuf> {
    std::fs::canonicalize(path).map_err(|e| {
        SlideError::ValidationError(format!("Failed to get absolute path for {:?}: {}", path, e))
    })
}

/// Map a request path like `/slides/ocaml-intro.html` onto a file under `root`.
///
/// Segments are percent-decoded. Returns `None` for paths that try to leave
/// `root` or that do not decode to UTF-8.
pub fn resolve_request_path(root: &Path, url_path: &str) -> Option<PathBuf> {
    // Drop query string and fragment
    let path = url_path.split(['?', '#']).next().unwrap_or("");

    let mut resolved = root.to_path_buf();
    for segment in path.split('/') {
        let decoded = urlencoding::decode(segment).ok()?;
        match decoded.as_ref() {
            "" | "." => {}
            ".." => return None,
            part if part.contains(['/', '\\', '\0']) => return None,
            part => resolved.push(part),
        }
    }

    if resolved.is_dir() || path.is_empty() || path.ends_with('/') {
        resolved.push("index.html");
    }
    Some(resolved)
}

/// Content type for a served file, based on its extension
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "md" => "text/markdown; charset=utf-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        _ => "application/octet-stream",
    }
}
