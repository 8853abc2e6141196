//! Index file resolution

use std::fs::File;
use std::path::Path;

/// Index files probed, in order, when a descriptor names none
pub const DEFAULT_INDEX_FILES: [&str; 3] = ["index.html", "index.md", "index.json"];

/// Find the file that serves as a page's primary content.
///
/// An explicit name is checked on its own, without falling back to the
/// defaults. Returns `None` when no readable candidate exists.
pub fn resolve_index(dir: &Path, explicit: Option<&str>) -> Option<String> {
    match explicit {
        Some(name) => is_readable_file(&dir.join(name)).then(|| name.to_string()),
        None => DEFAULT_INDEX_FILES
            .iter()
            .find(|name| is_readable_file(&dir.join(name)))
            .map(|name| name.to_string()),
    }
}

fn is_readable_file(path: &Path) -> bool {
    path.is_file() && File::open(path).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_priority() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.json"), "{}").unwrap();
        fs::write(dir.path().join("index.md"), "# hi").unwrap();
        assert_eq!(resolve_index(dir.path(), None).as_deref(), Some("index.md"));

        fs::write(dir.path().join("index.html"), "<p>hi</p>").unwrap();
        assert_eq!(
            resolve_index(dir.path(), None).as_deref(),
            Some("index.html")
        );
    }

    #[test]
    fn test_explicit_name_without_fallback() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.html"), "<p>hi</p>").unwrap();
        assert_eq!(resolve_index(dir.path(), Some("main.md")), None);

        fs::write(dir.path().join("main.md"), "# main").unwrap();
        assert_eq!(
            resolve_index(dir.path(), Some("main.md")).as_deref(),
            Some("main.md")
        );
    }

    #[test]
    fn test_directory_is_not_an_index() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("index.html")).unwrap();
        assert_eq!(resolve_index(dir.path(), None), None);
    }

    #[test]
    fn test_no_index() {
        let dir = TempDir::new().unwrap();
        assert_eq!(resolve_index(dir.path(), None), None);
    }
}
