//! Declarative detection rules.
//!
//! Rules are written as [`spec::RuleSpec`]s (in YAML catalogues or with the
//! [`builder::DetectionRuleBuilder`]) and compiled by
//! [`catalogue::RuleCatalogue`] into a [`RuleSet`]: an arena of immutable
//! [`DetectionRule`]s where dependencies are [`RuleId`] references.

pub mod builder;
pub mod catalogue;
pub mod context;
pub mod factory;
pub mod spec;

pub use builder::DetectionRuleBuilder;
pub use catalogue::{parse_catalogue, RuleCatalogue};
pub use context::{Bundle, ContextTag, DetectionContext};
pub use factory::{SizeUnit, ValueFactory};
pub use spec::{CatalogueFile, GroupSpec, ParameterSpec, RuleSpec};

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::EngineError;
use crate::syntax::{InvocationKind, Language};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RuleId(pub u32);

impl RuleId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a dependent rule is evaluated, relative to the call that matched.
/// Ordered so that argument positions come first, in index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Position {
    Argument(usize),
    /// The expression that produced the call's receiver.
    Receiver,
    /// Later invocations on the object the call produced.
    Usage,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Argument(i) => write!(f, "argument({i})"),
            Self::Receiver => f.write_str("receiver"),
            Self::Usage => f.write_str("usage"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub type_name: String,
    pub keyword: Option<String>,
    pub factory: Option<ValueFactory>,
    pub exact: bool,
    pub required: bool,
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectionRule {
    pub id: RuleId,
    pub name: String,
    pub group: String,
    pub object_types: Vec<String>,
    pub invocation: InvocationKind,
    pub names: Vec<String>,
    pub factory: Option<ValueFactory>,
    pub parameters: Vec<Parameter>,
    pub context: DetectionContext,
    pub bundle: Option<Bundle>,
    pub exact_object: bool,
    /// Dependent rules per position, each list in catalogue order.
    pub dependents: BTreeMap<Position, Vec<RuleId>>,
}

impl DetectionRule {
    pub fn dependents_at(&self, position: Position) -> &[RuleId] {
        self.dependents
            .get(&position)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn accepts_name(&self, name: &str) -> bool {
        match self.invocation {
            InvocationKind::Constructor => true,
            InvocationKind::Method | InvocationKind::EnumReference => {
                self.names.iter().any(|n| n == name)
            }
        }
    }
}

/// Compiled, immutable rules for one language.
#[derive(Debug, Clone)]
pub struct RuleSet {
    language: Language,
    rules: Vec<DetectionRule>,
    groups: BTreeMap<String, Vec<RuleId>>,
    top_level: Vec<RuleId>,
}

impl RuleSet {
    pub fn empty(language: Language) -> Self {
        Self {
            language,
            rules: Vec::new(),
            groups: BTreeMap::new(),
            top_level: Vec::new(),
        }
    }

    pub(crate) fn from_parts(
        language: Language,
        rules: Vec<DetectionRule>,
        groups: BTreeMap<String, Vec<RuleId>>,
        top_level: Vec<RuleId>,
    ) -> Self {
        Self {
            language,
            rules,
            groups,
            top_level,
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn get(&self, id: RuleId) -> Option<&DetectionRule> {
        self.rules.get(id.index())
    }

    /// Like [`RuleSet::get`], for callers that treat a dangling id as an
    /// internal fault.
    pub fn rule(&self, id: RuleId) -> Result<&DetectionRule, EngineError> {
        self.get(id).ok_or_else(|| EngineError::unknown_rule(id.index()))
    }

    pub fn top_level(&self) -> &[RuleId] {
        &self.top_level
    }

    pub fn group(&self, name: &str) -> Option<&[RuleId]> {
        self.groups.get(name).map(Vec::as_slice)
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn find(&self, name: &str) -> Option<&DetectionRule> {
        self.rules.iter().find(|r| r.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DetectionRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
