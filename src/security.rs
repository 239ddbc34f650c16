use crate::errors::AppError;
use crate::paths::absolutize;
use axum::http::HeaderMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Outcome of resolving a path against the live filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// The whole path exists and was canonicalized.
    Canonical(PathBuf),
    /// Part of the path does not exist yet. Every existing prefix was
    /// canonicalized and the missing tail appended lexically.
    Fallback(PathBuf),
    /// The path cannot be pinned down: a dangling or looping symlink sits
    /// somewhere along it, or the working directory is unknown.
    Unresolvable,
}

impl Resolved {
    pub fn into_path(self) -> Option<PathBuf> {
        match self {
            Resolved::Canonical(p) | Resolved::Fallback(p) => Some(p),
            Resolved::Unresolvable => None,
        }
    }
}

/// Best-effort canonicalization that never fails outright.
pub fn resolve(path: &Path) -> Resolved {
    let Some(abs) = absolutize(path) else {
        return Resolved::Unresolvable;
    };
    match dunce::canonicalize(&abs) {
        Ok(real) => Resolved::Canonical(real),
        Err(_) => resolve_existing_prefix(&abs),
    }
}

fn resolve_existing_prefix(abs: &Path) -> Resolved {
    let mut out = PathBuf::new();
    for comp in abs.components() {
        match comp {
            Component::Prefix(_) | Component::RootDir => out.push(comp.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                // earlier segments are already resolved, so this pops the real parent
                out.pop();
            }
            Component::Normal(seg) => {
                out.push(seg);
                match dunce::canonicalize(&out) {
                    Ok(real) => out = real,
                    Err(_) => {
                        let dangling = fs::symlink_metadata(&out)
                            .map(|m| m.file_type().is_symlink())
                            .unwrap_or(false);
                        if dangling {
                            return Resolved::Unresolvable;
                        }
                    }
                }
            }
        }
    }
    Resolved::Fallback(out)
}

#[cfg(windows)]
fn normalize_case(p: PathBuf) -> Option<PathBuf> {
    // lossy conversion could merge distinct names, so refuse instead
    p.to_str().map(|s| PathBuf::from(s.to_lowercase()))
}

#[cfg(not(windows))]
fn normalize_case(p: PathBuf) -> Option<PathBuf> {
    Some(p)
}

fn comparable(p: &Path) -> Option<PathBuf> {
    resolve(p).into_path().and_then(normalize_case)
}

/// Where a target sits relative to a root, both already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Relation {
    Same,
    Below,
    Above,
    OtherVolume,
}

fn relation(root: &Path, target: &Path) -> Relation {
    let prefix = |p: &Path| match p.components().next() {
        Some(Component::Prefix(pre)) => Some(pre.as_os_str().to_owned()),
        _ => None,
    };
    if prefix(root) != prefix(target) {
        return Relation::OtherVolume;
    }
    match target.strip_prefix(root) {
        Ok(rel) if rel.as_os_str().is_empty() => Relation::Same,
        Ok(_) => Relation::Below,
        Err(_) => Relation::Above,
    }
}

fn relate(root: &Path, target: &Path) -> Option<Relation> {
    let root = comparable(root)?;
    let target = comparable(target)?;
    Some(relation(&root, &target))
}

/// True when `target` is `root` or lies beneath it once both are resolved
/// through the filesystem. Anything that cannot be resolved is outside.
pub fn is_inside(root: &Path, target: &Path) -> bool {
    matches!(relate(root, target), Some(Relation::Same | Relation::Below))
}

/// Like [`is_inside`] but the root itself does not count.
pub fn is_strictly_inside(root: &Path, target: &Path) -> bool {
    matches!(relate(root, target), Some(Relation::Below))
}

/// True when `target` is inside at least one of `roots`. No roots, no access.
pub fn is_inside_any<I, P>(roots: I, target: &Path) -> bool
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    roots.into_iter().any(|root| is_inside(root.as_ref(), target))
}

/// Trimmed value, or `None` when blank or a bare `.`/`..`.
pub fn get_non_empty_string(value: Option<&str>) -> Option<&str> {
    let trimmed = value?.trim();
    match trimmed {
        "" | "." | ".." => None,
        _ => Some(trimmed),
    }
}

pub fn must_be_non_empty_string<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, AppError> {
    get_non_empty_string(value).ok_or_else(|| AppError::InvalidInput(format!("{field} must be non-empty")))
}

pub fn require_bearer(headers: &HeaderMap, expected: &str) -> Result<(), AppError> {
    let auth = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Unauthorized)?;
    let token = auth.strip_prefix("Bearer ").ok_or(AppError::Unauthorized)?;
    if token != expected {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}
