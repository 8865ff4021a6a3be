//! relative slash-separated path handling
//!
//! all paths inside buckets, manifests and configuration files are relative,
//! `/`-separated and normalized. these helpers work lexically and never touch
//! the filesystem.

use crate::error::{Error, Result};

/// normalize a path lexically
///
/// collapses repeated separators, drops `.` components and resolves `..`
/// against preceding components. a path that normalizes to nothing becomes
/// `"."`. leading `..` components that cannot be resolved are kept, and a
/// leading `/` is preserved.
pub fn normalize(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if absolute => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }
    let joined = parts.join("/");
    match (absolute, joined.is_empty()) {
        (true, _) => format!("/{}", joined),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// normalize a path and reject anything that is not a relative path
/// contained in its context directory
pub fn normalize_and_validate(path: &str) -> Result<String> {
    if path.is_empty() {
        return Err(Error::invalid_path(path, "path is empty"));
    }
    let normalized = normalize(path);
    if normalized.starts_with('/') {
        return Err(Error::invalid_path(path, "path must be relative"));
    }
    if normalized == ".." || normalized.starts_with("../") {
        return Err(Error::invalid_path(
            path,
            "path is outside the context directory",
        ));
    }
    Ok(normalized)
}

/// normalize a path that must name an object, so `"."` is rejected too
pub fn normalize_and_validate_object(path: &str) -> Result<String> {
    let normalized = normalize_and_validate(path)?;
    if normalized == "." {
        return Err(Error::invalid_path(path, "path does not name a file"));
    }
    Ok(normalized)
}

/// does `parent` strictly contain `child`
///
/// both paths must already be normalized. `"."` contains every path except
/// itself.
pub fn contains_path(parent: &str, child: &str) -> bool {
    if parent == child {
        return false;
    }
    if parent == "." {
        return child != "." && !child.starts_with('/');
    }
    child
        .strip_prefix(parent)
        .is_some_and(|rest| rest.starts_with('/'))
}

/// does `parent` equal or contain `child`
pub fn equals_or_contains_path(parent: &str, child: &str) -> bool {
    parent == child || contains_path(parent, child)
}

/// rebase `target` onto `base`
///
/// `target` must equal or be contained in `base`; equal paths give `"."`.
pub fn rel(base: &str, target: &str) -> Result<String> {
    if base == target {
        return Ok(".".to_string());
    }
    if base == "." {
        return Ok(target.to_string());
    }
    target
        .strip_prefix(base)
        .and_then(|rest| rest.strip_prefix('/'))
        .map(str::to_string)
        .ok_or_else(|| {
            Error::Internal(format!("{:?} is not contained in {:?}", target, base))
        })
}

/// join two normalized relative paths
pub fn join(base: &str, path: &str) -> String {
    normalize(&format!("{}/{}", base, path))
}

/// file extension of the last component, including the dot
pub fn ext(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(0) | None => "",
        Some(i) => &name[i..],
    }
}
