//! One-level listing of the assets root.

use std::fs;
use std::path::Path;

use crate::error::DeployError;
use crate::plan::PathPattern;
use crate::utils::path::is_hidden;

/// Static routes for the immediate children of `assets_path`.
///
/// Files become exact patterns and directories become prefix patterns.
/// Files come first, then directories, each group sorted by name. Deeper
/// entries are covered by their directory's prefix.
pub fn scan_static_routes(assets_path: &Path) -> Result<Vec<PathPattern>, DeployError> {
    let io_err = |e| DeployError::Io(assets_path.to_path_buf(), e);

    let mut files = Vec::new();
    let mut dirs = Vec::new();

    for entry in fs::read_dir(assets_path).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_hidden(&name) {
            continue;
        }
        // follows symlinks, so a linked directory is still a prefix
        if entry.path().is_dir() {
            dirs.push(name);
        } else {
            files.push(name);
        }
    }

    files.sort_unstable();
    dirs.sort_unstable();

    Ok(files
        .into_iter()
        .map(PathPattern::file)
        .chain(dirs.into_iter().map(PathPattern::dir))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_files_then_dirs_sorted() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("images")).unwrap();
        fs::create_dir(dir.path().join("assets")).unwrap();
        fs::write(dir.path().join("robots.txt"), "").unwrap();
        fs::write(dir.path().join("favicon.ico"), "").unwrap();

        let routes = scan_static_routes(dir.path()).unwrap();
        let shown: Vec<_> = routes.iter().map(ToString::to_string).collect();
        assert_eq!(shown, ["favicon.ico", "robots.txt", "assets/*", "images/*"]);
    }

    #[test]
    fn test_no_recursion_and_hidden_skipped() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("assets/deep/er")).unwrap();
        fs::write(dir.path().join("assets/deep/er/x.js"), "").unwrap();
        fs::write(dir.path().join(".DS_Store"), "").unwrap();
        fs::create_dir(dir.path().join(".cache")).unwrap();

        let routes = scan_static_routes(dir.path()).unwrap();
        assert_eq!(routes, vec![PathPattern::dir("assets")]);
    }

    #[test]
    fn test_well_known_is_routed() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(".well-known")).unwrap();
        fs::write(dir.path().join(".well-known/security.txt"), "").unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();

        let routes = scan_static_routes(dir.path()).unwrap();
        assert_eq!(routes, vec![PathPattern::dir(".well-known")]);
        assert_eq!(routes[0].to_cdn(), ".well-known/*");
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_followed() {
        use std::os::unix::fs::symlink;

        let dir = TempDir::new().unwrap();
        let shared = dir.path().join("shared");
        let root = dir.path().join("client");
        fs::create_dir_all(&shared).unwrap();
        fs::create_dir_all(&root).unwrap();
        fs::write(shared.join("app.js"), "").unwrap();
        symlink(&shared, root.join("static")).unwrap();
        symlink(shared.join("app.js"), root.join("top.js")).unwrap();

        let routes = scan_static_routes(&root).unwrap();
        assert_eq!(routes, vec![PathPattern::file("top.js"), PathPattern::dir("static")]);
    }

    #[test]
    fn test_empty_dir() {
        let dir = TempDir::new().unwrap();
        assert!(scan_static_routes(dir.path()).unwrap().is_empty());
    }
}
