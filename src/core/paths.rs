//! Path helpers shared by the resolver and the cleanup executor.

use std::env;
use std::path::{Component, Path, PathBuf};

/// Resolve a path to an absolute, normalized path.
///
/// Uses `fs::canonicalize` when the path exists so symlinks are resolved.
/// Otherwise the path is joined onto `base` (or the CWD when `base` is
/// `None`) and `.`/`..` components are folded syntactically.
pub fn resolve_absolute_path(path: &Path, base: Option<&Path>) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else if let Some(base) = base {
        base.join(path)
    } else {
        env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
    };

    if let Ok(canonical) = std::fs::canonicalize(&absolute) {
        return canonical;
    }

    normalize_syntactic(&absolute)
}

/// Whether `path` lies inside `root` (or is `root` itself) after both are
/// resolved with [`resolve_absolute_path`].
///
/// Comparison is component-wise, so `/repo-old` is not inside `/repo`.
pub fn is_within(path: &Path, root: &Path) -> bool {
    let path = resolve_absolute_path(path, None);
    let root = resolve_absolute_path(root, None);
    path.starts_with(&root)
}

/// Whether a file or directory name is hidden by the leading-dot convention.
pub fn is_hidden_name(name: &std::ffi::OsStr) -> bool {
    name.as_encoded_bytes().first() == Some(&b'.')
}

fn normalize_syntactic(path: &Path) -> PathBuf {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::Prefix(..) | Component::RootDir | Component::Normal(_) => {
                components.push(component);
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if let Some(Component::Normal(_)) = components.last() {
                    components.pop();
                }
            }
        }
    }
    components.into_iter().collect()
}
