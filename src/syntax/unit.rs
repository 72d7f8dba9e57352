//! A parsed source file together with everything resolution needs to know
//! about it.

use serde::Serialize;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use tree_sitter::{Node, Tree};

use super::imports::ImportMap;
use super::language::Language;
use super::types::{HierarchyView, TypeHierarchy};

/// Position of a detection in the scanned sources. Lines and columns are
/// 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Location {
    pub file: String,
    pub line: usize,
    pub column: usize,
    #[serde(skip)]
    pub start_byte: usize,
    #[serde(skip)]
    pub end_byte: usize,
}

impl Location {
    pub fn new(file: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            start_byte: 0,
            end_byte: 0,
        }
    }

    pub fn of(node: &Node, file: &str) -> Self {
        let start = node.start_position();
        Self {
            file: file.to_string(),
            line: start.row + 1,
            column: start.column + 1,
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Names declared by a unit itself, collected once by its frontend.
#[derive(Debug, Clone, Default)]
pub struct Declarations {
    pub imports: ImportMap,
    pub package: Option<String>,
    /// Supertype edges of classes declared in the unit.
    pub local_types: TypeHierarchy,
}

pub struct SourceUnit<'a> {
    tree: &'a Tree,
    source: &'a [u8],
    file_path: String,
    language: Language,
    library: &'a TypeHierarchy,
    declarations: Declarations,
    /// Identifier nodes currently being resolved (cycle detection).
    resolving: RefCell<HashSet<usize>>,
}

impl<'a> SourceUnit<'a> {
    pub fn new(
        tree: &'a Tree,
        source: &'a [u8],
        file_path: impl Into<String>,
        language: Language,
        library: &'a TypeHierarchy,
        declarations: Declarations,
    ) -> Self {
        Self {
            tree,
            source,
            file_path: file_path.into(),
            language,
            library,
            declarations,
            resolving: RefCell::new(HashSet::new()),
        }
    }

    pub fn tree(&self) -> &'a Tree {
        self.tree
    }

    pub fn root(&self) -> Node<'a> {
        self.tree.root_node()
    }

    pub fn source(&self) -> &'a [u8] {
        self.source
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn imports(&self) -> &ImportMap {
        &self.declarations.imports
    }

    pub fn package(&self) -> Option<&str> {
        self.declarations.package.as_deref()
    }

    pub fn types(&self) -> HierarchyView<'_> {
        HierarchyView::new(self.library, &self.declarations.local_types)
    }

    /// Source text of a node. Invalid UTF-8 is replaced rather than rejected.
    pub fn text(&self, node: &Node) -> String {
        String::from_utf8_lossy(&self.source[node.start_byte()..node.end_byte()]).to_string()
    }

    pub fn location(&self, node: &Node) -> Location {
        Location::of(node, &self.file_path)
    }

    /// Marks `node` as being resolved. Returns false if it already was,
    /// which means resolution has looped back onto itself.
    pub fn enter(&self, node: &Node) -> bool {
        self.resolving.borrow_mut().insert(node.id())
    }

    pub fn leave(&self, node: &Node) {
        self.resolving.borrow_mut().remove(&node.id());
    }
}
