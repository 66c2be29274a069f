use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::extract::dialect::test_units;
use crate::extract::dialect_for;
use crate::syntax::{parse_file, SourceLanguage};

const IGNORED_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "target",
    "build",
    ".gradle",
    "__pycache__",
    ".venv",
];

fn is_ignored(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| IGNORED_DIRS.contains(&name))
}

/// Every supported source file under `root`, sorted by path.
pub fn discover_workspace_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| !is_ignored(entry))
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| SourceLanguage::from_path(entry.path()).is_some())
        .map(DirEntry::into_path)
        .collect();
    files.sort();
    debug!(root = %root.display(), files = files.len(), "workspace discovered");
    files
}

/// Files that declare at least one test.
pub fn discover_features(files: &[PathBuf]) -> Vec<PathBuf> {
    files
        .iter()
        .filter(|path| match parse_file(path) {
            Ok(parsed) => {
                let dialect = dialect_for(parsed.language);
                !test_units(dialect, parsed.root(), &parsed.source).is_empty()
            }
            Err(_) => false,
        })
        .cloned()
        .collect()
}

/// Stable feature id for a discovered file: its path relative to the workspace.
pub fn feature_id_for(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn scratch_dir() -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        std::env::temp_dir().join(format!("intent-lens-discover-{nanos}"))
    }

    #[test]
    fn walks_sources_and_picks_out_tests() {
        let root = scratch_dir();
        fs::create_dir_all(root.join("src/pages")).expect("pages dir");
        fs::create_dir_all(root.join("src/tests")).expect("tests dir");
        fs::create_dir_all(root.join("build/gen")).expect("build dir");
        fs::create_dir_all(root.join("node_modules/x")).expect("modules dir");

        fs::write(
            root.join("src/pages/LoginPage.java"),
            "public class LoginPage { public void open() {} }",
        )
        .expect("page");
        fs::write(
            root.join("src/tests/LoginTest.java"),
            "class LoginTest { @Test public void logs() { driver.get(\"/\"); } }",
        )
        .expect("test");
        fs::write(
            root.join("src/tests/test_search.py"),
            "def test_search():\n    assert True\n",
        )
        .expect("py test");
        fs::write(root.join("src/tests/notes.txt"), "ignore me").expect("txt");
        fs::write(root.join("build/gen/Generated.java"), "class Generated {}").expect("gen");
        fs::write(root.join("node_modules/x/helper.py"), "x = 1").expect("module");

        let files = discover_workspace_files(&root);
        let ids: Vec<_> = files.iter().map(|f| feature_id_for(&root, f)).collect();
        assert_eq!(
            ids,
            vec![
                "src/pages/LoginPage.java",
                "src/tests/LoginTest.java",
                "src/tests/test_search.py",
            ]
        );

        let features = discover_features(&files);
        let ids: Vec<_> = features.iter().map(|f| feature_id_for(&root, f)).collect();
        assert_eq!(ids, vec!["src/tests/LoginTest.java", "src/tests/test_search.py"]);

        let _ = fs::remove_dir_all(&root);
    }
}
