use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogueError {
    #[error("failed to read rules file '{path}': {message}")]
    RulesFileReadError { path: PathBuf, message: String },

    #[error("failed to parse rules file '{path}': {message}")]
    RulesParseError { path: PathBuf, message: String },

    #[error("unsupported rules format: {format} (expected json or yaml)")]
    UnsupportedFormat { format: String },

    #[error("rule '{rule}' depends on unknown group '{group}'")]
    UnknownGroup { rule: String, group: String },

    #[error(
        "rule '{rule}' declares a dependency on argument {position} but has {arity} parameters"
    )]
    InvalidDependencyPosition {
        rule: String,
        position: usize,
        arity: usize,
    },

    #[error("rule '{rule}' needs at least one {what}")]
    IncompleteRule { rule: String, what: String },

    #[error("dependency cycle through group '{group}'")]
    DependencyCycle { group: String },

    #[error("duplicate rule name '{rule}'")]
    DuplicateRule { rule: String },

    #[error("{found} rules cannot be added to the {expected} catalogue")]
    LanguageMismatch { expected: String, found: String },
}

impl CatalogueError {
    pub fn rules_file_read_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::RulesFileReadError {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn rules_parse_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::RulesParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    pub fn unknown_group(rule: impl Into<String>, group: impl Into<String>) -> Self {
        Self::UnknownGroup {
            rule: rule.into(),
            group: group.into(),
        }
    }

    pub fn invalid_dependency_position(
        rule: impl Into<String>,
        position: usize,
        arity: usize,
    ) -> Self {
        Self::InvalidDependencyPosition {
            rule: rule.into(),
            position,
            arity,
        }
    }

    pub fn incomplete_rule(rule: impl Into<String>, what: impl Into<String>) -> Self {
        Self::IncompleteRule {
            rule: rule.into(),
            what: what.into(),
        }
    }

    pub fn dependency_cycle(group: impl Into<String>) -> Self {
        Self::DependencyCycle {
            group: group.into(),
        }
    }

    pub fn duplicate_rule(rule: impl Into<String>) -> Self {
        Self::DuplicateRule { rule: rule.into() }
    }

    pub fn language_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::LanguageMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }
}
