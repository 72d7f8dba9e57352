//! Match records produced by the executive.

use std::collections::BTreeMap;

use super::value::{DetectionValue, ValueTag};
use crate::rules::{Bundle, DetectionContext, DetectionRule, Position, RuleId};
use crate::syntax::{Language, Location};

/// Why a store exists: a rule matched a call, or a parameter directive of
/// the parent's rule extracted a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOrigin {
    Call,
    Parameter,
}

/// One matched call site (or one extracted parameter value) and everything
/// that matched beneath it.
///
/// Call-level values live in `values`. Each value a parameter directive
/// extracts becomes its own child store at that parameter's position, with
/// the parent's rule and context. Dependent-rule matches are children at
/// their target position.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionStore {
    pub rule: RuleId,
    pub rule_name: String,
    pub context: DetectionContext,
    pub bundle: Option<Bundle>,
    pub origin: StoreOrigin,
    pub location: Location,
    pub values: Vec<DetectionValue>,
    pub children: BTreeMap<Position, Vec<DetectionStore>>,
}

impl DetectionStore {
    pub fn new(rule: &DetectionRule, location: Location) -> Self {
        Self {
            rule: rule.id,
            rule_name: rule.name.clone(),
            context: rule.context.clone(),
            bundle: rule.bundle,
            origin: StoreOrigin::Call,
            location,
            values: Vec::new(),
            children: BTreeMap::new(),
        }
    }

    /// Store holding a single value extracted by a parameter directive.
    pub fn parameter(rule: &DetectionRule, value: DetectionValue) -> Self {
        let mut store = Self::new(rule, value.location.clone());
        store.origin = StoreOrigin::Parameter;
        store.values.push(value);
        store
    }

    pub fn add_value(&mut self, value: DetectionValue) {
        self.values.push(value);
    }

    pub fn add_child(&mut self, position: Position, child: DetectionStore) {
        self.children.entry(position).or_default().push(child);
    }

    pub fn children_at(&self, position: Position) -> &[DetectionStore] {
        self.children
            .get(&position)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All child stores in position order.
    pub fn child_stores(&self) -> impl Iterator<Item = (Position, &DetectionStore)> {
        self.children
            .iter()
            .flat_map(|(position, stores)| stores.iter().map(move |s| (*position, s)))
    }

    pub fn values_of(&self, tag: ValueTag) -> impl Iterator<Item = &DetectionValue> {
        self.values.iter().filter(move |v| v.tag() == tag)
    }

    /// Depth-first search over this store and its descendants.
    pub fn find<P>(&self, predicate: P) -> Option<&DetectionStore>
    where
        P: Fn(&DetectionStore) -> bool + Copy,
    {
        if predicate(self) {
            return Some(self);
        }
        self.child_stores().find_map(|(_, child)| child.find(predicate))
    }

    /// First store, this one included, holding a value of kind `tag`.
    pub fn find_value_store(&self, tag: ValueTag) -> Option<&DetectionStore> {
        self.find(|s| s.values.iter().any(|v| v.tag() == tag))
    }

    pub fn store_count(&self) -> usize {
        1 + self
            .child_stores()
            .map(|(_, child)| child.store_count())
            .sum::<usize>()
    }
}

/// A completed top-level match.
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub store: DetectionStore,
    pub location: Location,
    pub file_path: String,
    pub language: Language,
}

/// Receives findings as the executive produces them.
pub trait FindingObserver {
    fn on_finding(&mut self, finding: &Finding);
}

/// Observer that keeps every finding.
#[derive(Debug, Default)]
pub struct FindingCollector {
    findings: Vec<Finding>,
}

impl FindingCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn into_findings(self) -> Vec<Finding> {
        self.findings
    }
}

impl FindingObserver for FindingCollector {
    fn on_finding(&mut self, finding: &Finding) {
        self.findings.push(finding.clone());
    }
}
