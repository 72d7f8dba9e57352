//! Static type references and the type hierarchy used for subtype checks.

use serde::Deserialize;
use std::collections::{BTreeMap, HashSet, VecDeque};

/// Type wildcard accepted by rules for any argument or receiver type.
pub const ANY_TYPE: &str = "*";

/// The static type of an expression as far as the frontend can tell.
///
/// Simple names that could not be pinned to one import keep every plausible
/// qualified candidate; matching succeeds if any candidate matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRef {
    candidates: Vec<String>,
}

impl TypeRef {
    pub fn resolved(name: impl Into<String>) -> Self {
        Self {
            candidates: vec![name.into()],
        }
    }

    pub fn with_candidates(candidates: Vec<String>) -> Option<Self> {
        if candidates.is_empty() {
            None
        } else {
            Some(Self { candidates })
        }
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn name(&self) -> &str {
        &self.candidates[0]
    }

    /// Last dotted segment of the primary candidate, without array suffixes.
    pub fn simple_name(&self) -> &str {
        let name = self.name().trim_end_matches("[]");
        name.rsplit('.').next().unwrap_or(name)
    }

    pub fn is(&self, expected: &str) -> bool {
        self.candidates.iter().any(|c| c == expected)
    }

    pub fn array_of(&self) -> Self {
        Self {
            candidates: self.candidates.iter().map(|c| format!("{c}[]")).collect(),
        }
    }
}

/// Supertype edges, method return types and integer constants for library
/// types that are not part of the scanned sources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeHierarchy {
    #[serde(default)]
    supertypes: BTreeMap<String, Vec<String>>,
    /// Keyed by `Owner.method`.
    #[serde(default)]
    returns: BTreeMap<String, String>,
    /// Keyed by `Owner.CONSTANT`.
    #[serde(default)]
    constants: BTreeMap<String, i64>,
}

impl TypeHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    pub fn add_supertype(&mut self, sub: impl Into<String>, sup: impl Into<String>) {
        let entry = self.supertypes.entry(sub.into()).or_default();
        let sup = sup.into();
        if !entry.contains(&sup) {
            entry.push(sup);
        }
    }

    pub fn add_return(&mut self, owner: &str, method: &str, ty: impl Into<String>) {
        self.returns.insert(format!("{owner}.{method}"), ty.into());
    }

    pub fn add_constant(&mut self, owner: &str, name: &str, value: i64) {
        self.constants.insert(format!("{owner}.{name}"), value);
    }

    pub fn merge(&mut self, other: TypeHierarchy) {
        for (sub, sups) in other.supertypes {
            for sup in sups {
                self.add_supertype(sub.clone(), sup);
            }
        }
        self.returns.extend(other.returns);
        self.constants.extend(other.constants);
    }

    pub fn is_empty(&self) -> bool {
        self.supertypes.is_empty() && self.returns.is_empty() && self.constants.is_empty()
    }

    fn direct_supertypes(&self, ty: &str) -> &[String] {
        self.supertypes.get(ty).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Read-only view over several hierarchies, e.g. the configured library
/// hierarchy plus the classes declared in the unit being scanned.
#[derive(Debug, Clone, Copy)]
pub struct HierarchyView<'h> {
    layers: [&'h TypeHierarchy; 2],
}

impl<'h> HierarchyView<'h> {
    pub fn new(library: &'h TypeHierarchy, local: &'h TypeHierarchy) -> Self {
        Self {
            layers: [library, local],
        }
    }

    /// Breadth-first walk over `ty` and all of its transitive supertypes.
    fn ancestry(&self, ty: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([ty.to_string()]);
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current.clone()) {
                continue;
            }
            for layer in self.layers {
                queue.extend(layer.direct_supertypes(&current).iter().cloned());
            }
            order.push(current);
        }
        order
    }

    pub fn is_subtype_of(&self, sub: &str, sup: &str) -> bool {
        sub == sup || self.ancestry(sub).iter().any(|t| t == sup)
    }

    /// Checks a static type against a rule's expected type. Exact matching
    /// disables the subtype relaxation; unknown types never match.
    pub fn matches(&self, ty: Option<&TypeRef>, expected: &str, exact: bool) -> bool {
        if expected == ANY_TYPE {
            return true;
        }
        let Some(ty) = ty else {
            return false;
        };
        if exact {
            return ty.is(expected);
        }
        ty.candidates()
            .iter()
            .any(|candidate| self.is_subtype_of(candidate, expected))
    }

    pub fn return_type(&self, owner: &str, method: &str) -> Option<String> {
        self.ancestry(owner).iter().find_map(|ty| {
            let key = format!("{ty}.{method}");
            self.layers
                .iter()
                .rev()
                .find_map(|layer| layer.returns.get(&key).cloned())
        })
    }

    pub fn constant(&self, owner: &str, name: &str) -> Option<i64> {
        self.ancestry(owner).iter().find_map(|ty| {
            let key = format!("{ty}.{name}");
            self.layers
                .iter()
                .rev()
                .find_map(|layer| layer.constants.get(&key).copied())
        })
    }
}
