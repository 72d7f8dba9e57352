use std::path::{Path, PathBuf};
use tracing::{trace, warn};
use walkdir::WalkDir;

use crate::syntax::Language;

/// Build output, dependency and tooling directories that never hold code
/// worth scanning.
pub const EXCLUDED_DIRS: &[&str] = &[
    "target",
    "build",
    "dist",
    "node_modules",
    "venv",
    ".venv",
    "__pycache__",
    ".git",
];

/// A file selected for scanning.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourceFile {
    pub path: PathBuf,
    pub language: Language,
}

/// Source files under `root` in one of `languages`, sorted by path. Hidden
/// and excluded directories are skipped; unreadable entries are logged and
/// skipped.
pub fn discover_files(root: &Path, languages: &[Language]) -> Vec<SourceFile> {
    let mut files = Vec::new();

    let walker = WalkDir::new(root).into_iter().filter_entry(|e| {
        if e.depth() == 0 || !e.file_type().is_dir() {
            return true;
        }
        let name = e.file_name().to_string_lossy();
        !name.starts_with('.') && !EXCLUDED_DIRS.contains(&name.as_ref())
    });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(root = %root.display(), "skipping unreadable entry: {err}");
                continue;
            }
        };
        if !entry.file_type().is_file() || entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        let Some(language) = Language::from_path(entry.path()) else {
            continue;
        };
        if languages.contains(&language) {
            trace!(path = %entry.path().display(), %language, "discovered source file");
            files.push(SourceFile {
                path: entry.into_path(),
                language,
            });
        }
    }

    files.sort();
    files
}
