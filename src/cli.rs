use anyhow::{Context as AnyhowContext, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

use crate::syntax::Language;

#[derive(Parser, Debug)]
#[command(name = "crypto-inventory")]
#[command(
    about = "Detect cryptographic API usage and report it as a crypto inventory",
    long_about = None
)]
pub struct Args {
    /// Path to file or directory to scan
    #[arg(long, value_name = "PATH")]
    pub path: PathBuf,

    /// Additional rule catalogue (YAML or JSON). Can be specified multiple times.
    #[arg(long, value_name = "FILE")]
    pub rules: Vec<PathBuf>,

    /// Additional type hierarchy file for the language named by --language
    #[arg(long, value_name = "FILE", requires = "language")]
    pub types: Option<PathBuf>,

    /// Only scan files of this language (java, python)
    #[arg(short, long)]
    pub language: Option<Language>,

    /// Skip the built-in JCA, Bouncy Castle and pyca catalogues
    #[arg(long)]
    pub no_builtin: bool,

    /// Output file path (prints to stdout if not specified)
    #[arg(short = 'O', long, value_name = "FILE")]
    pub output_file: Option<PathBuf>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    pub fn validate(&self) -> Result<()> {
        validate_path(&self.path)?;
        for rules_path in &self.rules {
            if !rules_path.is_file() {
                anyhow::bail!("Rules file does not exist: {}", rules_path.display());
            }
        }
        if let Some(ref types_path) = self.types {
            if !types_path.is_file() {
                anyhow::bail!("Types file does not exist: {}", types_path.display());
            }
        }
        if self.no_builtin && self.rules.is_empty() {
            anyhow::bail!("--no-builtin requires at least one --rules file");
        }
        Ok(())
    }

    /// Languages to scan: the one named by `--language`, otherwise all.
    pub fn languages(&self) -> Vec<Language> {
        match self.language {
            Some(language) => vec![language],
            None => Language::ALL.to_vec(),
        }
    }
}

/// Checks that the scan root exists and is a readable file or directory.
pub fn validate_path(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("Path does not exist: {}", path.display());
    }
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Cannot read metadata for {}", path.display()))?;
    if !metadata.is_file() && !metadata.is_dir() {
        anyhow::bail!("Path is neither a file nor a directory: {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn args(path: PathBuf) -> Args {
        Args {
            path,
            rules: vec![],
            types: None,
            language: None,
            no_builtin: false,
            output_file: None,
            verbose: 0,
            quiet: false,
        }
    }

    #[test]
    fn test_validate_path_accepts_files_and_directories() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("Main.java");
        fs::write(&source, "class Main {}").unwrap();

        assert!(validate_path(&source).is_ok());
        assert!(validate_path(temp_dir.path()).is_ok());
        assert!(validate_path(&temp_dir.path().join("Missing.java")).is_err());
    }

    #[test]
    fn test_args_validate_invalid_path() {
        assert!(args(PathBuf::from("/nonexistent/path")).validate().is_err());
    }

    #[test]
    fn test_args_validate_missing_rules_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut args = args(temp_dir.path().to_path_buf());
        args.rules.push(temp_dir.path().join("missing.yaml"));

        let err = args.validate().unwrap_err();
        assert!(err.to_string().starts_with("Rules file does not exist"));
    }

    #[test]
    fn test_no_builtin_requires_rules() {
        let temp_dir = TempDir::new().unwrap();
        let mut args = args(temp_dir.path().to_path_buf());
        args.no_builtin = true;
        assert!(args.validate().is_err());

        let rules = temp_dir.path().join("rules.yaml");
        fs::write(&rules, "language: java\ngroups: []\n").unwrap();
        args.rules.push(rules);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_parse_language_and_repeated_rules() {
        let args = Args::try_parse_from([
            "crypto-inventory",
            "--path",
            "src",
            "--language",
            "python",
            "--rules",
            "a.yaml",
            "--rules",
            "b.json",
            "-vv",
        ])
        .unwrap();

        assert_eq!(args.language, Some(Language::Python));
        assert_eq!(args.rules, vec![PathBuf::from("a.yaml"), PathBuf::from("b.json")]);
        assert_eq!(args.verbose, 2);
        assert_eq!(args.languages(), vec![Language::Python]);
    }

    #[test]
    fn test_parse_rejects_unknown_language() {
        let result =
            Args::try_parse_from(["crypto-inventory", "--path", ".", "--language", "cobol"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_types_requires_language() {
        let result = Args::try_parse_from(["crypto-inventory", "--path", ".", "--types", "t.yaml"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_languages_default_to_all() {
        assert_eq!(args(PathBuf::from(".")).languages(), Language::ALL.to_vec());
    }
}
