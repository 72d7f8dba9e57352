use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::path::Path;
use tracing::{debug, trace};

use super::spec::{CatalogueFile, RuleSpec};
use super::{Bundle, DetectionRule, Parameter, Position, RuleId, RuleSet};
use crate::error::CatalogueError;
use crate::syntax::{InvocationKind, Language};

/// Reads a catalogue file, choosing the format by extension.
pub fn load_catalogue_file<P: AsRef<Path>>(path: P) -> Result<CatalogueFile, CatalogueError> {
    let path = path.as_ref();
    trace!(path = %path.display(), "loading rule catalogue");

    let content = fs::read_to_string(path)
        .map_err(|e| CatalogueError::rules_file_read_error(path, e.to_string()))?;
    parse_catalogue(path, &content)
}

/// Parses catalogue text. `origin` names the source in errors and selects
/// JSON or YAML by its extension.
pub fn parse_catalogue(origin: &Path, content: &str) -> Result<CatalogueFile, CatalogueError> {
    let extension = origin.extension().and_then(|e| e.to_str()).unwrap_or("");

    match extension {
        "json" => serde_json::from_str(content)
            .map_err(|e| CatalogueError::rules_parse_error(origin, e.to_string())),
        "yaml" | "yml" => serde_yaml::from_str(content)
            .map_err(|e| CatalogueError::rules_parse_error(origin, e.to_string())),
        _ => Err(CatalogueError::unsupported_format(extension)),
    }
}

#[derive(Debug, Clone)]
struct CatalogueGroup {
    name: String,
    top_level: bool,
    rules: Vec<(RuleSpec, Option<Bundle>)>,
}

/// Rule groups for one language, collected from any number of files and
/// compiled into a [`RuleSet`] once all are present.
///
/// Groups with the same name are merged, so a user file can add rules to a
/// built-in group.
#[derive(Debug, Clone)]
pub struct RuleCatalogue {
    language: Language,
    groups: Vec<CatalogueGroup>,
}

impl RuleCatalogue {
    pub fn new(language: Language) -> Self {
        Self {
            language,
            groups: Vec::new(),
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn add_file(&mut self, file: CatalogueFile) -> Result<(), CatalogueError> {
        if file.language != self.language {
            return Err(CatalogueError::language_mismatch(
                self.language.name(),
                file.language.name(),
            ));
        }
        for group in file.groups {
            let bundle = group.bundle.or(file.bundle);
            let rules = group
                .rules
                .into_iter()
                .map(|rule| {
                    let rule_bundle = rule.bundle.or(bundle);
                    (rule, rule_bundle)
                })
                .collect();
            self.add_group_with_bundles(group.name, group.top_level, rules);
        }
        Ok(())
    }

    /// Adds rules (for example from [`super::DetectionRuleBuilder`]) to a
    /// group. Rules keep their own bundle.
    pub fn add_group(&mut self, name: impl Into<String>, top_level: bool, rules: Vec<RuleSpec>) {
        let rules = rules
            .into_iter()
            .map(|rule| {
                let bundle = rule.bundle;
                (rule, bundle)
            })
            .collect();
        self.add_group_with_bundles(name.into(), top_level, rules);
    }

    fn add_group_with_bundles(
        &mut self,
        name: String,
        top_level: bool,
        rules: Vec<(RuleSpec, Option<Bundle>)>,
    ) {
        match self.groups.iter_mut().find(|g| g.name == name) {
            Some(existing) => {
                existing.top_level |= top_level;
                existing.rules.extend(rules);
            }
            None => self.groups.push(CatalogueGroup {
                name,
                top_level,
                rules,
            }),
        }
    }

    pub fn rule_count(&self) -> usize {
        self.groups.iter().map(|g| g.rules.len()).sum()
    }

    pub fn compile(&self) -> Result<RuleSet, CatalogueError> {
        let mut group_ids: BTreeMap<String, Vec<RuleId>> = BTreeMap::new();
        let mut next = 0u32;
        for group in &self.groups {
            let ids = group_ids.entry(group.name.clone()).or_default();
            for _ in &group.rules {
                ids.push(RuleId(next));
                next += 1;
            }
        }

        let mut names = HashSet::new();
        let mut rules = Vec::with_capacity(next as usize);
        let mut top_level = Vec::new();
        let mut edges: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();

        for group in &self.groups {
            for (index, (spec, bundle)) in group.rules.iter().enumerate() {
                let id = RuleId(rules.len() as u32);
                let name = spec
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("{}[{index}]", group.name));
                if !names.insert(name.clone()) {
                    return Err(CatalogueError::duplicate_rule(name));
                }
                Self::validate(&name, spec)?;

                let mut dependents: BTreeMap<Position, Vec<RuleId>> = BTreeMap::new();
                let mut links: Vec<(Position, &[String])> = spec
                    .parameters
                    .iter()
                    .enumerate()
                    .map(|(i, parameter)| (Position::Argument(i), parameter.depends_on.as_slice()))
                    .collect();
                links.extend(
                    spec.arguments
                        .iter()
                        .map(|(i, referenced)| (Position::Argument(*i), referenced.as_slice())),
                );
                links.push((Position::Receiver, spec.receiver.as_slice()));
                links.push((Position::Usage, spec.usages.as_slice()));

                for (position, referenced) in links {
                    for target in referenced {
                        let ids = group_ids
                            .get(target)
                            .ok_or_else(|| CatalogueError::unknown_group(&name, target))?;
                        dependents.entry(position).or_default().extend(ids);
                        edges
                            .entry(group.name.as_str())
                            .or_default()
                            .insert(target.as_str());
                    }
                }

                if group.top_level {
                    top_level.push(id);
                }
                rules.push(DetectionRule {
                    id,
                    name,
                    group: group.name.clone(),
                    object_types: spec.object_types.clone(),
                    invocation: spec.invocation,
                    names: spec.names.clone(),
                    factory: spec.detect_as.clone(),
                    parameters: spec
                        .parameters
                        .iter()
                        .map(|p| Parameter {
                            type_name: p.type_name.clone(),
                            keyword: p.keyword.clone(),
                            factory: p.detect_as.clone(),
                            exact: p.exact,
                            required: p.required,
                            optional: p.optional,
                        })
                        .collect(),
                    context: spec.context.clone(),
                    bundle: *bundle,
                    exact_object: spec.exact_object,
                    dependents,
                });
            }
        }

        Self::check_acyclic(&edges)?;

        debug!(
            language = %self.language,
            rules = rules.len(),
            groups = group_ids.len(),
            top_level = top_level.len(),
            "compiled rule catalogue"
        );
        Ok(RuleSet::from_parts(self.language, rules, group_ids, top_level))
    }

    fn validate(name: &str, spec: &RuleSpec) -> Result<(), CatalogueError> {
        if spec.object_types.is_empty() {
            return Err(CatalogueError::incomplete_rule(name, "object type"));
        }
        if spec.invocation != InvocationKind::Constructor && spec.names.is_empty() {
            return Err(CatalogueError::incomplete_rule(name, "name"));
        }
        let arity = spec.parameters.len();
        if let Some((position, _)) = spec.arguments.iter().find(|(i, _)| **i >= arity) {
            return Err(CatalogueError::invalid_dependency_position(
                name, *position, arity,
            ));
        }
        Ok(())
    }

    /// Depth-first search over the group graph; a back edge is a cycle.
    fn check_acyclic(edges: &BTreeMap<&str, BTreeSet<&str>>) -> Result<(), CatalogueError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Active,
            Done,
        }

        fn visit<'e>(
            group: &'e str,
            edges: &BTreeMap<&'e str, BTreeSet<&'e str>>,
            marks: &mut BTreeMap<&'e str, Mark>,
        ) -> Result<(), CatalogueError> {
            match marks.get(group) {
                Some(Mark::Done) => return Ok(()),
                Some(Mark::Active) => return Err(CatalogueError::dependency_cycle(group)),
                None => {}
            }
            marks.insert(group, Mark::Active);
            if let Some(targets) = edges.get(group) {
                for target in targets {
                    visit(target, edges, marks)?;
                }
            }
            marks.insert(group, Mark::Done);
            Ok(())
        }

        let mut marks = BTreeMap::new();
        for group in edges.keys() {
            visit(group, edges, &mut marks)?;
        }
        Ok(())
    }
}
