/// Path resolution and validation.
///
/// Normalises `.`/`..` segments lexically, resolves symlinks of the existing
/// prefix via canonicalisation, and rejects paths that escape the permitted
/// roots. Deliberately does NOT check existence or read permission of the
/// final path — "syntactically invalid" and "inaccessible" must stay
/// distinguishable error kinds, so existence is the caller's concern.
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Resolve `raw` to a canonical absolute path.
///
/// When `allowed_roots` is non-empty, the resolved path must lie under at
/// least one of the roots or the call fails with [`Error::InvalidPath`].
/// Relative inputs are interpreted against the current working directory.
pub fn resolve(raw: &Path, allowed_roots: &[PathBuf]) -> Result<PathBuf> {
    if raw.as_os_str().is_empty() {
        return Err(Error::InvalidPath("empty path".into()));
    }
    if raw.as_os_str().as_encoded_bytes().contains(&0) {
        return Err(Error::InvalidPath(format!(
            "{}: embedded NUL byte",
            raw.to_string_lossy()
        )));
    }

    let absolute = if raw.is_absolute() {
        raw.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| Error::from_io(e, raw))?
            .join(raw)
    };

    let normalized = normalize_lexically(&absolute)?;
    let canonical = canonicalize_existing_prefix(&normalized)?;

    if !allowed_roots.is_empty() {
        let inside = allowed_roots.iter().any(|root| {
            canonicalize_existing_prefix(root)
                .map(|r| canonical.starts_with(&r))
                .unwrap_or(false)
        });
        if !inside {
            return Err(Error::InvalidPath(format!(
                "{}: escapes permitted roots",
                raw.to_string_lossy()
            )));
        }
    }

    Ok(canonical)
}

/// Collapse `.` and `..` components without touching the filesystem.
/// `..` above the filesystem root is invalid rather than silently clamped.
fn normalize_lexically(path: &Path) -> Result<PathBuf> {
    let mut out = PathBuf::new();
    let mut depth = 0usize;
    for component in path.components() {
        match component {
            Component::Prefix(p) => out.push(p.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return Err(Error::InvalidPath(format!(
                        "{}: traversal above root",
                        path.to_string_lossy()
                    )));
                }
                out.pop();
                depth -= 1;
            }
            Component::Normal(seg) => {
                out.push(seg);
                depth += 1;
            }
        }
    }
    Ok(out)
}

/// Canonicalise the longest existing prefix of `path` (resolving symlinks),
/// then re-append the non-existent tail untouched. The tail is already free
/// of `.`/`..` because the input is lexically normalized.
fn canonicalize_existing_prefix(path: &Path) -> Result<PathBuf> {
    let mut existing = path.to_path_buf();
    let mut tail: Vec<std::ffi::OsString> = Vec::new();

    loop {
        match existing.canonicalize() {
            Ok(canonical) => {
                let mut result = canonical;
                for seg in tail.into_iter().rev() {
                    result.push(seg);
                }
                return Ok(result);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                match (existing.file_name().map(|n| n.to_os_string()), existing.parent()) {
                    (Some(name), Some(parent)) if !parent.as_os_str().is_empty() => {
                        tail.push(name);
                        existing = parent.to_path_buf();
                    }
                    // Even the root does not resolve; give the path back as-is.
                    _ => {
                        let mut result = path.to_path_buf();
                        result.extend(tail.into_iter().rev());
                        return Ok(result);
                    }
                }
            }
            Err(e) => return Err(Error::from_io(e, path)),
        }
    }
}
