//! Import tracking for resolving simple names to qualified names.
//!
//! Frontends fill an [`ImportMap`] once per source unit. Exact imports map a
//! local name (possibly an alias) to its qualified path, wildcard imports
//! contribute candidate packages.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportMap {
    imports: BTreeMap<String, String>,
    wildcards: Vec<String>,
}

impl ImportMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, local_name: impl Into<String>, full_path: impl Into<String>) {
        self.imports.insert(local_name.into(), full_path.into());
    }

    pub fn insert_wildcard(&mut self, package: impl Into<String>) {
        let package = package.into();
        if !self.wildcards.contains(&package) {
            self.wildcards.push(package);
        }
    }

    pub fn get(&self, local_name: &str) -> Option<&str> {
        self.imports.get(local_name).map(String::as_str)
    }

    pub fn wildcards(&self) -> &[String] {
        &self.wildcards
    }

    /// Expands a dotted reference whose first segment is an imported name,
    /// e.g. `hashes.SHA256` with `hashes` imported from
    /// `cryptography.hazmat.primitives`.
    pub fn expand(&self, dotted: &str) -> Option<String> {
        let (head, rest) = match dotted.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (dotted, None),
        };
        let base = self.get(head)?;
        Some(match rest {
            Some(rest) => format!("{base}.{rest}"),
            None => base.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.imports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.imports.is_empty() && self.wildcards.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.imports.iter()
    }
}
