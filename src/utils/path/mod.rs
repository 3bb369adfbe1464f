//! Path helpers shared by the loader and the asset sync.

use std::path::{Component, Path, PathBuf};

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first, then falls back to joining with the
/// current directory so missing paths still produce a usable value.
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

/// Expand `~` and resolve a relative path against `root`.
pub fn resolve_against(root: &Path, path: &Path) -> PathBuf {
    let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
    let path = PathBuf::from(expanded);
    if path.is_relative() {
        root.join(path)
    } else {
        path
    }
}

/// Object key for a path relative to some base: forward slashes, no
/// leading slash, no `.` components.
pub fn to_object_key(rel: &Path) -> String {
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Directory served to clients despite its leading dot (RFC 8615).
pub const WELL_KNOWN: &str = ".well-known";

/// Entries hidden by convention (`.DS_Store`, `.gitkeep`, dot-directories).
/// `.well-known` is always published.
pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.') && name != WELL_KNOWN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key() {
        assert_eq!(to_object_key(Path::new("assets/app.js")), "assets/app.js");
        assert_eq!(to_object_key(Path::new("./favicon.ico")), "favicon.ico");
        assert_eq!(to_object_key(Path::new("a/./b/c.css")), "a/b/c.css");
    }

    #[test]
    fn test_resolve_against() {
        let root = Path::new("/srv/app");
        assert_eq!(
            resolve_against(root, Path::new("build/client")),
            PathBuf::from("/srv/app/build/client")
        );
        assert_eq!(
            resolve_against(root, Path::new("/opt/out")),
            PathBuf::from("/opt/out")
        );
    }

    #[test]
    fn test_hidden() {
        assert!(is_hidden(".DS_Store"));
        assert!(is_hidden(".well-known-old"));
        assert!(!is_hidden("favicon.ico"));
        assert!(!is_hidden(".well-known"));
    }
}
