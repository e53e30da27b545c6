// ABOUTME: Drive path normalization for FODI file stores
// ABOUTME: Collapses separators, rejects parent traversal, and scopes paths under a drive root
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use crate::types::DriveError;

/// Path of the drive root
pub const ROOT: &str = "/";

/// Normalize a drive path to `/segment/segment` form
///
/// Empty segments and `.` are dropped, a trailing slash is removed, and the
/// empty string maps to the root. Backslashes are treated as separators.
///
/// # Errors
///
/// Returns `InvalidInput` if any segment is `..`.
pub fn normalize(path: &str) -> Result<String, DriveError> {
    let mut segments = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment.trim() {
            "" | "." => {}
            ".." => {
                return Err(DriveError::invalid_input(format!(
                    "Parent traversal is not allowed: {path}"
                )));
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return Ok(ROOT.to_owned());
    }
    Ok(format!("/{}", segments.join("/")))
}

/// Join a child name onto a normalized directory path
pub fn join(dir: &str, name: &str) -> String {
    let name = name.trim_matches('/');
    if dir == ROOT || dir.is_empty() {
        format!("/{name}")
    } else {
        format!("{}/{name}", dir.trim_end_matches('/'))
    }
}

/// Parent directory of a normalized path (the root is its own parent)
pub fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => ROOT,
        Some(idx) => &path[..idx],
    }
}

/// Last segment of a normalized path (empty for the root)
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Resolve a caller path beneath a configured drive root
///
/// With root `/Public`, the caller path `/docs` becomes `/Public/docs`; the
/// caller can never escape the root because `..` is rejected.
pub fn scoped(root: &str, path: &str) -> Result<String, DriveError> {
    let root = normalize(root)?;
    let path = normalize(path)?;
    if root == ROOT {
        return Ok(path);
    }
    if path == ROOT {
        return Ok(root);
    }
    Ok(format!("{root}{path}"))
}

/// Strip a configured drive root from a store path, the inverse of [`scoped`]
pub fn unscoped<'a>(root: &str, path: &'a str) -> &'a str {
    let root = root.trim_end_matches('/');
    if root.is_empty() {
        return path;
    }
    match path.strip_prefix(root) {
        Some("") => ROOT,
        Some(rest) if rest.starts_with('/') => rest,
        _ => path,
    }
}
