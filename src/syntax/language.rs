use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::ParserError;

/// Source languages with a frontend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Java,
    Python,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::Java, Language::Python];

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "java" => Some(Self::Java),
            "python" | "py" => Some(Self::Python),
            _ => None,
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "java" => Some(Self::Java),
            "py" => Some(Self::Python),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Java => "java",
            Self::Python => "python",
        }
    }

    pub fn grammar(&self) -> tree_sitter::Language {
        match self {
            Self::Java => tree_sitter_java::LANGUAGE.into(),
            Self::Python => tree_sitter_python::LANGUAGE.into(),
        }
    }

    /// Parses `source` with this language's grammar.
    pub fn parse_source(
        &self,
        source: &str,
        path: &Path,
    ) -> Result<tree_sitter::Tree, ParserError> {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&self.grammar())
            .map_err(|_| ParserError::language_setup_failed(self.name()))?;
        parser
            .parse(source, None)
            .ok_or_else(|| ParserError::parse_failed(path))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Language {
    type Err = ParserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ParserError::unsupported_language(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_language_names() {
        assert_eq!(Language::parse("java"), Some(Language::Java));
        assert_eq!(Language::parse("Python"), Some(Language::Python));
        assert_eq!(Language::parse("py"), Some(Language::Python));
        assert_eq!(Language::parse("go"), None);
    }

    #[test]
    fn test_from_path_uses_extension() {
        assert_eq!(
            Language::from_path(Path::new("src/Main.java")),
            Some(Language::Java)
        );
        assert_eq!(
            Language::from_path(Path::new("kdf.py")),
            Some(Language::Python)
        );
        assert_eq!(Language::from_path(Path::new("README")), None);
    }

    #[test]
    fn test_from_str_reports_unsupported() {
        let err = "cobol".parse::<Language>().unwrap_err();
        assert_eq!(err.to_string(), "unsupported language: cobol");
    }

    #[test]
    fn test_parse_source_produces_tree() {
        let tree = Language::Java
            .parse_source("class A {}", Path::new("A.java"))
            .unwrap();
        assert_eq!(tree.root_node().kind(), "program");

        let tree = Language::Python
            .parse_source("x = 1\n", Path::new("a.py"))
            .unwrap();
        assert_eq!(tree.root_node().kind(), "module");
    }
}
