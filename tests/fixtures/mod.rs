#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use crypto_inventory_core::config::EngineConfig;
use crypto_inventory_core::model::{Node, NodeKind};
use crypto_inventory_core::scanner::Scanner;

pub fn get_test_fixture_path(language: &str, fixture_name: Option<&str>) -> PathBuf {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(language);
    match fixture_name {
        Some(fixture_name) => dir.join(fixture_name),
        None => dir,
    }
}

pub fn standard_scanner() -> Scanner {
    Scanner::new(Arc::new(EngineConfig::standard().unwrap()))
}

/// Reorganized trees for one fixture file.
pub fn scan_fixture(language: &str, fixture_name: &str) -> Vec<Node> {
    let path = get_test_fixture_path(language, Some(fixture_name));
    standard_scanner().scan_file(&path).unwrap().nodes
}

/// First node of `kind` named `name`, searching every tree depth first.
pub fn find<'n>(nodes: &'n [Node], kind: NodeKind, name: &str) -> Option<&'n Node> {
    nodes.iter().find_map(|node| find_in(node, kind, name))
}

fn find_in<'n>(node: &'n Node, kind: NodeKind, name: &str) -> Option<&'n Node> {
    if node.kind == kind && node.name == name {
        return Some(node);
    }
    node.children.values().find_map(|child| find_in(child, kind, name))
}

pub fn child_name(node: &Node, kind: NodeKind) -> Option<&str> {
    node.child(kind).map(|child| child.name.as_str())
}
