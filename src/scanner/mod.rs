//! Per-file scan pipeline and the parallel directory driver.
//!
//! For every file: parse, collect declarations, run the detection executive,
//! translate each finding into nodes, reorganize them and record the result
//! in the shared [`Inventory`]. Files are independent of each other and are
//! scanned in parallel.

pub mod discovery;

pub use discovery::{discover_files, SourceFile, EXCLUDED_DIRS};

use rayon::prelude::*;
use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::config::EngineConfig;
use crate::engine::Finding;
use crate::error::{IoError, ParserError, Result};
use crate::inventory::Inventory;
use crate::model::Node;
use crate::syntax::{support_for, Language, SourceUnit, TypeHierarchy};

/// Everything one file produced.
#[derive(Debug, Clone)]
pub struct FileReport {
    pub file_path: String,
    pub language: Language,
    pub findings: Vec<Finding>,
    /// Reorganized trees, in finding order.
    pub nodes: Vec<Node>,
}

impl FileReport {
    fn empty(file_path: &str, language: Language) -> Self {
        Self {
            file_path: file_path.to_string(),
            language,
            findings: Vec::new(),
            nodes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileError {
    pub path: PathBuf,
    pub message: String,
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub files_scanned: usize,
    pub findings: usize,
    pub nodes: usize,
    pub errors: Vec<FileError>,
}

impl ScanResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    fn record(&mut self, report: &FileReport) {
        self.files_scanned += 1;
        self.findings += report.findings.len();
        self.nodes += report.nodes.len();
    }
}

pub struct Scanner {
    config: Arc<EngineConfig>,
    inventory: Arc<Inventory>,
}

impl Scanner {
    pub fn new(config: Arc<EngineConfig>) -> Self {
        Self {
            config,
            inventory: Arc::new(Inventory::new()),
        }
    }

    /// Records into an existing inventory instead of a fresh one.
    pub fn with_inventory(mut self, inventory: Arc<Inventory>) -> Self {
        self.inventory = inventory;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn inventory(&self) -> &Arc<Inventory> {
        &self.inventory
    }

    /// Runs the pipeline over in-memory source. Nothing is recorded in the
    /// inventory.
    pub fn scan_source(
        &self,
        source: &str,
        file_path: &str,
        language: Language,
    ) -> Result<FileReport> {
        let Some(executive) = self.config.executive(language) else {
            trace!(file_path, %language, "no rules for language");
            return Ok(FileReport::empty(file_path, language));
        };

        let tree = language.parse_source(source, Path::new(file_path))?;
        let declarations = support_for(language).declarations(tree.root_node(), source.as_bytes());
        let empty = TypeHierarchy::new();
        let library = self.config.types(language).unwrap_or(&empty);
        let unit = SourceUnit::new(
            &tree,
            source.as_bytes(),
            file_path,
            language,
            library,
            declarations,
        );

        let findings = executive.findings(&unit);
        let translator = self.config.translator();
        let mut nodes: Vec<Node> = findings
            .iter()
            .flat_map(|finding| translator.translate_finding(finding))
            .collect();
        self.config.reorganizer().reorganize(&mut nodes);

        debug!(
            file_path,
            findings = findings.len(),
            nodes = nodes.len(),
            "scan complete"
        );
        Ok(FileReport {
            file_path: file_path.to_string(),
            language,
            findings,
            nodes,
        })
    }

    /// Scans one file and records its nodes in the inventory.
    pub fn scan_file(&self, path: &Path) -> Result<FileReport> {
        let language = Language::from_path(path).ok_or_else(|| {
            let extension = path
                .extension()
                .map(|e| e.to_string_lossy().to_string())
                .unwrap_or_default();
            ParserError::unsupported_language(extension)
        })?;
        let bytes = fs::read(path).map_err(|e| IoError::read_error(path, e))?;
        let source = String::from_utf8_lossy(&bytes);
        if let Cow::Owned(_) = source {
            debug!(path = %path.display(), "replaced invalid UTF-8 sequences");
        }
        let file_path = path.to_string_lossy().to_string();

        let report = self.scan_source(&source, &file_path, language)?;
        self.inventory.add(file_path, report.nodes.clone());
        Ok(report)
    }

    /// Scans a file or every supported file below a directory. Per-file
    /// failures are collected in the result; only an unusable root is an
    /// error.
    pub fn scan_path(&self, root: &Path) -> Result<ScanResult> {
        if !root.exists() {
            return Err(IoError::file_not_found(root).into());
        }
        let languages: Vec<Language> = self.config.languages().collect();
        let files = if root.is_file() {
            match Language::from_path(root) {
                Some(language) if languages.contains(&language) => vec![SourceFile {
                    path: root.to_path_buf(),
                    language,
                }],
                _ => Vec::new(),
            }
        } else if root.is_dir() {
            discover_files(root, &languages)
        } else {
            return Err(IoError::invalid_path(root).into());
        };
        debug!(root = %root.display(), files = files.len(), "discovered files");

        let outcomes: Vec<(PathBuf, Result<FileReport>)> = files
            .par_iter()
            .map(|file| (file.path.clone(), self.scan_file(&file.path)))
            .collect();

        let mut result = ScanResult::default();
        for (path, outcome) in outcomes {
            match outcome {
                Ok(report) => result.record(&report),
                Err(err) => {
                    warn!(path = %path.display(), "failed to scan file: {err}");
                    result.errors.push(FileError {
                        path,
                        message: err.to_string(),
                    });
                }
            }
        }
        debug!(
            files = result.files_scanned,
            findings = result.findings,
            errors = result.errors.len(),
            "directory scan complete"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::NodeKind;
    use pretty_assertions::assert_eq;

    fn scanner() -> Scanner {
        Scanner::new(Arc::new(EngineConfig::standard().unwrap()))
    }

    const DIGEST_SOURCE: &str = r#"
import java.security.MessageDigest;

class Hashing {
    byte[] hash(byte[] data) throws Exception {
        MessageDigest md = MessageDigest.getInstance("SHA-256");
        return md.digest(data);
    }
}
"#;

    #[test]
    fn test_scan_source_translates_findings() {
        let report = scanner()
            .scan_source(DIGEST_SOURCE, "Hashing.java", Language::Java)
            .unwrap();

        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.nodes.len(), 1);
        let digest = &report.nodes[0];
        assert_eq!((digest.kind, digest.name.as_str()), (NodeKind::MessageDigest, "SHA256"));
        assert_eq!(digest.child(NodeKind::DigestSize).unwrap().name, "256");
    }

    #[test]
    fn test_scan_source_does_not_touch_inventory() {
        let scanner = scanner();
        scanner
            .scan_source(DIGEST_SOURCE, "Hashing.java", Language::Java)
            .unwrap();
        assert!(scanner.inventory().is_empty());
    }

    #[test]
    fn test_scan_path_records_inventory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Hashing.java"), DIGEST_SOURCE).unwrap();
        fs::write(dir.path().join("empty.py"), "x = 1\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "MessageDigest").unwrap();

        let scanner = scanner();
        let result = scanner.scan_path(dir.path()).unwrap();

        assert_eq!(result.files_scanned, 2);
        assert_eq!(result.findings, 1);
        assert!(!result.has_errors());
        assert_eq!(scanner.inventory().file_count(), 1);
    }

    #[test]
    fn test_scan_path_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Hashing.java");
        fs::write(&path, DIGEST_SOURCE).unwrap();

        let result = scanner().scan_path(&path).unwrap();
        assert_eq!(result.files_scanned, 1);
        assert_eq!(result.nodes, 1);
    }

    #[test]
    fn test_scan_path_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let err = scanner().scan_path(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, Error::Io(IoError::FileNotFound { .. })));
    }

    #[test]
    fn test_scan_file_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.go");
        fs::write(&path, "package main").unwrap();

        let err = scanner().scan_file(&path).unwrap_err();
        assert!(matches!(err, Error::Parser(ParserError::UnsupportedLanguage { .. })));
    }

    #[test]
    fn test_invalid_utf8_is_scanned_lossily() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = b"// caf".to_vec();
        source.push(0xe9);
        source.extend_from_slice(DIGEST_SOURCE.as_bytes());
        let path = dir.path().join("Hashing.java");
        fs::write(&path, source).unwrap();

        let report = scanner().scan_file(&path).unwrap();
        assert_eq!(report.nodes.len(), 1);
        assert_eq!(report.nodes[0].name, "SHA256");
    }

    #[test]
    fn test_scan_file_reports_read_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = scanner()
            .scan_file(&dir.path().join("Missing.java"))
            .unwrap_err();
        assert!(matches!(err, Error::Io(IoError::ReadError { .. })));
    }
}
