//! Structural rewrites applied to translated trees.
//!
//! Rules run in a fixed order, each as one bottom-up pass over the whole
//! tree. Running the pipeline again on its own output changes nothing.

pub mod rules;

use tracing::trace;

use crate::model::Node;

#[derive(Debug, Clone, Copy)]
pub struct ReorganizerRule {
    pub name: &'static str,
    pub pattern: fn(&Node) -> bool,
    pub rewrite: fn(&mut Node),
}

impl ReorganizerRule {
    pub const fn new(
        name: &'static str,
        pattern: fn(&Node) -> bool,
        rewrite: fn(&mut Node),
    ) -> Self {
        Self {
            name,
            pattern,
            rewrite,
        }
    }

    /// One bottom-up pass. Returns how many nodes were rewritten.
    pub fn apply(&self, node: &mut Node) -> usize {
        let mut rewritten = 0;
        for child in node.children.values_mut() {
            rewritten += self.apply(child);
        }
        if (self.pattern)(node) {
            (self.rewrite)(node);
            rewritten += 1;
        }
        rewritten
    }
}

pub struct Reorganizer {
    rules: Vec<ReorganizerRule>,
}

impl Reorganizer {
    pub fn new(rules: Vec<ReorganizerRule>) -> Self {
        Self { rules }
    }

    pub fn standard() -> Self {
        Self::new(rules::standard_rules())
    }

    pub fn rules(&self) -> &[ReorganizerRule] {
        &self.rules
    }

    pub fn reorganize(&self, nodes: &mut [Node]) {
        for node in nodes {
            self.reorganize_node(node);
        }
    }

    pub fn reorganize_node(&self, node: &mut Node) {
        for rule in &self.rules {
            let rewritten = rule.apply(node);
            if rewritten > 0 {
                trace!(rule = rule.name, node = %node, rewritten, "reorganized");
            }
        }
    }
}

impl Default for Reorganizer {
    fn default() -> Self {
        Self::standard()
    }
}
