pub mod context;
pub(crate) mod factory;
pub(crate) mod resolve;
pub mod store;
pub mod value;

pub use context::MatchContext;
pub use store::{DetectionStore, Finding, FindingCollector, FindingObserver, StoreOrigin};
pub use value::{DetectionValue, ValueData, ValueTag};

use std::sync::Arc;
use tracing::{debug, trace, warn};
use tree_sitter::Node;

use crate::error::EngineError;
use crate::rules::{DetectionRule, Position, RuleId, RuleSet};
use crate::syntax::{descendants, support_for, Argument, Invocation, SourceUnit};
use resolve::Resolver;

const DEFAULT_MAX_DEPTH: usize = 50;

/// Evaluates a compiled [`RuleSet`] against parsed source units.
///
/// Every top-level rule is tried at every call-shaped node. A rule that fails
/// internally is logged and treated as not matching; nothing a single rule
/// does can abort a scan.
pub struct DetectionExecutive {
    rules: Arc<RuleSet>,
    max_depth: usize,
}

impl DetectionExecutive {
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self {
            rules,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn builder(rules: Arc<RuleSet>) -> DetectionExecutiveBuilder {
        DetectionExecutiveBuilder::new(rules)
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Reports every top-level match in `unit` to `observer`, in source
    /// order. Returns the number of findings.
    pub fn scan(&self, unit: &SourceUnit<'_>, observer: &mut dyn FindingObserver) -> usize {
        if unit.language() != self.rules.language() {
            debug!(
                file = unit.file_path(),
                "skipping {} unit for {} rules",
                unit.language(),
                self.rules.language()
            );
            return 0;
        }
        let support = support_for(unit.language());
        let resolver = Resolver::new(support, unit, self.max_depth);
        let mut count = 0;

        for node in descendants(unit.root()) {
            let invocation = match support.invocation(node, unit) {
                Ok(Some(invocation)) => invocation,
                Ok(None) => continue,
                Err(err) => {
                    warn!(
                        file = unit.file_path(),
                        line = node.start_position().row + 1,
                        "skipping call site: {err}"
                    );
                    continue;
                }
            };
            for &id in self.rules.top_level() {
                let root = MatchContext::root();
                if let Some(store) = self.evaluate(&resolver, id, &invocation, root) {
                    let location = unit.location(&invocation.node);
                    debug!(rule = %store.rule_name, %location, "finding");
                    observer.on_finding(&Finding {
                        store,
                        location,
                        file_path: unit.file_path().to_string(),
                        language: unit.language(),
                    });
                    count += 1;
                }
            }
        }
        count
    }

    /// Collects the findings of one unit.
    pub fn findings(&self, unit: &SourceUnit<'_>) -> Vec<Finding> {
        let mut collector = FindingCollector::new();
        self.scan(unit, &mut collector);
        collector.into_findings()
    }

    /// Rule boundary: internal errors become non-matches.
    fn evaluate<'a>(
        &self,
        resolver: &Resolver<'_, 'a>,
        id: RuleId,
        invocation: &Invocation<'a>,
        ctx: MatchContext,
    ) -> Option<DetectionStore> {
        match self.match_rule(resolver, id, invocation, ctx) {
            Ok(store) => store,
            Err(err) => {
                let unit = resolver.unit();
                let rule = self
                    .rules
                    .get(id)
                    .map(|r| r.name.as_str())
                    .unwrap_or("<unknown>");
                warn!(
                    file = unit.file_path(),
                    line = invocation.node.start_position().row + 1,
                    rule,
                    "rule evaluation failed: {err}"
                );
                None
            }
        }
    }

    fn match_rule<'a>(
        &self,
        resolver: &Resolver<'_, 'a>,
        id: RuleId,
        invocation: &Invocation<'a>,
        ctx: MatchContext,
    ) -> Result<Option<DetectionStore>, EngineError> {
        resolver.check_depth(ctx.depth())?;
        let rule = self.rules.rule(id)?;
        let unit = resolver.unit();
        let support = resolver.support();
        let types = unit.types();

        if invocation.kind != rule.invocation || !rule.accepts_name(&invocation.name) {
            return Ok(None);
        }
        let exact_object = ctx.is_hook() || rule.exact_object;
        let invoked = support.invoked_type(invocation, unit);
        if !rule
            .object_types
            .iter()
            .any(|expected| types.matches(invoked.as_ref(), expected, exact_object))
        {
            return Ok(None);
        }
        let Some(bound) = bind_arguments(rule, &invocation.arguments) else {
            return Ok(None);
        };
        for (parameter, argument) in rule.parameters.iter().zip(&bound) {
            let Some(argument) = argument else { continue };
            let ty = support.expression_type(argument.node, unit);
            let exact = parameter.exact || ctx.is_hook();
            if !types.matches(ty.as_ref(), &parameter.type_name, exact) {
                return Ok(None);
            }
        }

        let line = invocation.node.start_position().row + 1;
        trace!(rule = %rule.name, line, "shape matched");
        let mut store = DetectionStore::new(rule, unit.location(&invocation.node));
        if let Some(factory) = &rule.factory {
            for value in factory::extract_call(factory, invocation, resolver) {
                store.add_value(value);
            }
        }

        for (index, (parameter, argument)) in rule.parameters.iter().zip(&bound).enumerate() {
            let Some(factory) = &parameter.factory else { continue };
            let Some(argument) = argument else {
                if parameter.required {
                    return Ok(None);
                }
                continue;
            };
            let values = factory::extract_argument(factory, argument.node, resolver, ctx.depth())
                .unwrap_or_else(|err| {
                    warn!(
                        file = unit.file_path(),
                        line = argument.node.start_position().row + 1,
                        rule = %rule.name,
                        parameter = index,
                        "value extraction failed: {err}"
                    );
                    Vec::new()
                });
            if values.is_empty() && parameter.required {
                trace!(rule = %rule.name, parameter = index, "required value missing");
                return Ok(None);
            }
            for value in values {
                let child = DetectionStore::parameter(rule, value);
                store.add_child(Position::Argument(index), child);
            }
        }

        for (&position, dependents) in &rule.dependents {
            let targets = self.dependent_targets(resolver, position, invocation, &bound, ctx)?;
            let child_ctx = match position {
                Position::Usage => ctx.deeper().as_hook(),
                _ => ctx.deeper(),
            };
            for target in targets {
                let target_invocation = match support.invocation(target, unit) {
                    Ok(Some(target_invocation)) => target_invocation,
                    Ok(None) => continue,
                    Err(err) => {
                        warn!(
                            file = unit.file_path(),
                            line = target.start_position().row + 1,
                            rule = %rule.name,
                            "skipping dependent target: {err}"
                        );
                        continue;
                    }
                };
                for &dependent in dependents {
                    if let Some(child) =
                        self.evaluate(resolver, dependent, &target_invocation, child_ctx)
                    {
                        store.add_child(position, child);
                    }
                }
            }
        }

        Ok(Some(store))
    }

    fn dependent_targets<'a>(
        &self,
        resolver: &Resolver<'_, 'a>,
        position: Position,
        invocation: &Invocation<'a>,
        bound: &[Option<&Argument<'a>>],
        ctx: MatchContext,
    ) -> Result<Vec<Node<'a>>, EngineError> {
        match position {
            Position::Argument(index) => match bound.get(index).copied().flatten() {
                Some(argument) => resolver.definitions(argument.node, ctx.depth()),
                None => Ok(Vec::new()),
            },
            Position::Receiver => match invocation.receiver {
                Some(receiver) => resolver.definitions(receiver, ctx.depth()),
                None => Ok(Vec::new()),
            },
            Position::Usage => resolver.usages(invocation.node, ctx.depth()),
        }
    }
}

/// Binds call arguments to rule parameters: positional arguments in order,
/// keyword arguments by name. `None` when the call cannot satisfy the rule.
fn bind_arguments<'r, 'a>(
    rule: &DetectionRule,
    arguments: &'r [Argument<'a>],
) -> Option<Vec<Option<&'r Argument<'a>>>> {
    let mut bound: Vec<Option<&Argument<'a>>> = vec![None; rule.parameters.len()];
    let mut next = 0;
    for argument in arguments {
        let index = match &argument.keyword {
            None => {
                next += 1;
                next - 1
            }
            Some(keyword) => rule
                .parameters
                .iter()
                .position(|p| p.keyword.as_deref() == Some(keyword.as_str()))?,
        };
        let slot = bound.get_mut(index)?;
        if slot.is_some() {
            return None;
        }
        *slot = Some(argument);
    }
    let complete = rule
        .parameters
        .iter()
        .zip(&bound)
        .all(|(parameter, argument)| argument.is_some() || parameter.optional);
    complete.then_some(bound)
}

pub struct DetectionExecutiveBuilder {
    rules: Arc<RuleSet>,
    max_depth: usize,
}

impl DetectionExecutiveBuilder {
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self {
            rules,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn build(self) -> DetectionExecutive {
        DetectionExecutive {
            rules: self.rules,
            max_depth: self.max_depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::value::ValueData;
    use crate::rules::{
        ContextTag, DetectionContext, DetectionRuleBuilder, RuleCatalogue, SizeUnit, ValueFactory,
    };
    use crate::syntax::test_support::{parse, unit};
    use crate::syntax::{Language, TypeHierarchy};
    use pretty_assertions::assert_eq;

    fn gcm_rules() -> Arc<RuleSet> {
        let mut catalogue = RuleCatalogue::new(Language::Java);
        catalogue.add_group(
            "jca.gcm",
            true,
            vec![DetectionRuleBuilder::new()
                .named("gcm")
                .for_object_types(["javax.crypto.spec.GCMParameterSpec"])
                .for_constructor()
                .should_be_detected_as(ValueFactory::fixed(ValueTag::Mode, "GCM"))
                .with_parameter("int")
                .should_be_detected_as(ValueFactory::TagSize { unit: SizeUnit::Bit })
                .with_parameter("byte[]")
                .should_be_detected_as(ValueFactory::IvSize { unit: SizeUnit::Bit })
                .build_for_context(DetectionContext::new(ContextTag::AlgorithmParameter))],
        );
        Arc::new(catalogue.compile().unwrap())
    }

    const GCM_SOURCE: &str = r#"
import javax.crypto.spec.GCMParameterSpec;

class A {
    void f(boolean strong) {
        byte[] iv = new byte[12];
        if (strong) { iv = new byte[16]; }
        GCMParameterSpec spec = new GCMParameterSpec(128, iv);
    }
}
"#;

    #[test]
    fn test_gcm_store_shape() {
        let tree = parse(Language::Java, GCM_SOURCE);
        let library = TypeHierarchy::new();
        let unit = unit(Language::Java, &tree, GCM_SOURCE, &library);
        let executive = DetectionExecutive::new(gcm_rules());

        let findings = executive.findings(&unit);
        assert_eq!(findings.len(), 1);
        let store = &findings[0].store;
        assert_eq!(store.values[0].data, ValueData::Mode("GCM".into()));
        assert_eq!(
            store.children_at(Position::Argument(0))[0].values[0].data,
            ValueData::TagSize(128)
        );
        let ivs: Vec<ValueData> = store
            .children_at(Position::Argument(1))
            .iter()
            .map(|s| s.values[0].data.clone())
            .collect();
        assert_eq!(
            ivs,
            vec![
                ValueData::InitializationVectorSize(96),
                ValueData::InitializationVectorSize(128)
            ]
        );
        assert_eq!(findings[0].location.line, 8);
    }

    #[test]
    fn test_required_parameter_without_value_rejects_match() {
        let mut catalogue = RuleCatalogue::new(Language::Java);
        catalogue.add_group(
            "jca.gcm",
            true,
            vec![DetectionRuleBuilder::new()
                .for_object_types(["javax.crypto.spec.GCMParameterSpec"])
                .for_constructor()
                .with_parameter("int")
                .should_be_detected_as(ValueFactory::TagSize { unit: SizeUnit::Bit })
                .required()
                .with_parameter("byte[]")
                .build_for_context(DetectionContext::new(ContextTag::AlgorithmParameter))],
        );
        let executive = DetectionExecutive::new(Arc::new(catalogue.compile().unwrap()));
        let source = r#"
import javax.crypto.spec.GCMParameterSpec;
class A {
    void f(int bits, byte[] iv) {
        new GCMParameterSpec(bits, iv);
    }
}
"#;
        let tree = parse(Language::Java, source);
        let library = TypeHierarchy::new();
        let unit = unit(Language::Java, &tree, source, &library);

        assert!(executive.findings(&unit).is_empty());
    }

    #[test]
    fn test_arity_mismatch_is_not_a_match() {
        let source = r#"
import javax.crypto.spec.GCMParameterSpec;
class A {
    void f(byte[] iv) {
        new GCMParameterSpec(128, iv, 0, 12);
    }
}
"#;
        let tree = parse(Language::Java, source);
        let library = TypeHierarchy::new();
        let unit = unit(Language::Java, &tree, source, &library);

        assert!(DetectionExecutive::new(gcm_rules()).findings(&unit).is_empty());
    }

    #[test]
    fn test_other_language_units_are_skipped() {
        let source = "x = 1\n";
        let tree = parse(Language::Python, source);
        let library = TypeHierarchy::new();
        let unit = unit(Language::Python, &tree, source, &library);

        let mut collector = FindingCollector::new();
        assert_eq!(DetectionExecutive::new(gcm_rules()).scan(&unit, &mut collector), 0);
    }

    #[test]
    fn test_builder_sets_depth() {
        let executive = DetectionExecutive::builder(gcm_rules())
            .with_max_depth(3)
            .build();
        assert_eq!(executive.max_depth(), 3);
        assert_eq!(DetectionExecutive::new(gcm_rules()).max_depth(), 50);
    }

    fn hook_rules() -> Arc<RuleSet> {
        let mut catalogue = RuleCatalogue::new(Language::Java);
        catalogue.add_group(
            "bc.engine",
            true,
            vec![DetectionRuleBuilder::new()
                .named("engine")
                .for_object_types(["org.bouncycastle.crypto.BlockCipher"])
                .for_constructor()
                .should_be_detected_as(ValueFactory::TypeName {
                    value_kind: ValueTag::Algorithm,
                })
                .with_usage_rules(["bc.init"])
                .build_for_context(DetectionContext::new(ContextTag::Cipher))],
        );
        catalogue.add_group(
            "bc.init",
            false,
            vec![DetectionRuleBuilder::new()
                .named("init")
                .for_object_types(["org.bouncycastle.crypto.BlockCipher"])
                .for_methods(["init"])
                .with_parameter("boolean")
                .should_be_detected_as(ValueFactory::OperationMode)
                .with_parameter("*")
                .build_for_context(DetectionContext::new(ContextTag::Cipher))],
        );
        Arc::new(catalogue.compile().unwrap())
    }

    const HOOK_SOURCE: &str = r#"
import org.bouncycastle.crypto.BlockCipher;
import org.bouncycastle.crypto.engines.AESEngine;

class A {
    void f(Object params) {
        AESEngine exact = new AESEngine();
        exact.init(true, params);
        BlockCipher widened = new AESEngine();
        widened.init(false, params);
    }
}
"#;

    #[test]
    fn test_usage_rules_require_exact_types() {
        let tree = parse(Language::Java, HOOK_SOURCE);
        let mut library = TypeHierarchy::new();
        library.add_supertype(
            "org.bouncycastle.crypto.engines.AESEngine",
            "org.bouncycastle.crypto.BlockCipher",
        );
        let unit = unit(Language::Java, &tree, HOOK_SOURCE, &library);
        let findings = DetectionExecutive::new(hook_rules()).findings(&unit);

        assert_eq!(findings.len(), 2);
        let first = &findings[0].store;
        assert_eq!(first.values[0].data, ValueData::Algorithm("AESEngine".into()));
        assert!(first.children_at(Position::Usage).is_empty());

        let second = &findings[1].store;
        let usage = &second.children_at(Position::Usage)[0];
        assert_eq!(
            usage.children_at(Position::Argument(0))[0].values[0].data,
            ValueData::OperationMode(0)
        );
    }

    #[test]
    fn test_failed_extraction_omits_only_that_value() {
        let tree = parse(Language::Java, GCM_SOURCE);
        let library = TypeHierarchy::new();
        let unit = unit(Language::Java, &tree, GCM_SOURCE, &library);
        let executive = DetectionExecutive::builder(gcm_rules())
            .with_max_depth(0)
            .build();

        let findings = executive.findings(&unit);
        assert_eq!(findings.len(), 1);
        let store = &findings[0].store;
        assert_eq!(
            store.children_at(Position::Argument(0))[0].values[0].data,
            ValueData::TagSize(128)
        );
        assert!(store.children_at(Position::Argument(1)).is_empty());
    }

    #[test]
    fn test_failing_rule_does_not_hide_sibling_rules() {
        let spec = || {
            DetectionRuleBuilder::new()
                .for_object_types(["javax.crypto.spec.GCMParameterSpec"])
                .for_constructor()
                .should_be_detected_as(ValueFactory::fixed(ValueTag::Mode, "GCM"))
                .with_parameter("int")
        };
        let mut catalogue = RuleCatalogue::new(Language::Java);
        catalogue.add_group(
            "jca.gcm",
            true,
            vec![
                spec()
                    .named("gcm.linked")
                    .with_parameter("byte[]")
                    .depending_on(["jca.arrays"])
                    .build_for_context(DetectionContext::new(ContextTag::AlgorithmParameter)),
                spec()
                    .named("gcm.plain")
                    .with_parameter("byte[]")
                    .build_for_context(DetectionContext::new(ContextTag::AlgorithmParameter)),
            ],
        );
        catalogue.add_group(
            "jca.arrays",
            false,
            vec![DetectionRuleBuilder::new()
                .named("array")
                .for_object_types(["byte[]"])
                .for_constructor()
                .build_for_context(DetectionContext::new(ContextTag::AlgorithmParameter))],
        );
        let executive = DetectionExecutive::builder(Arc::new(catalogue.compile().unwrap()))
            .with_max_depth(0)
            .build();

        let tree = parse(Language::Java, GCM_SOURCE);
        let library = TypeHierarchy::new();
        let unit = unit(Language::Java, &tree, GCM_SOURCE, &library);
        let names: Vec<String> = executive
            .findings(&unit)
            .into_iter()
            .map(|f| f.store.rule_name)
            .collect();

        assert_eq!(names, vec!["gcm.plain".to_string()]);
    }
}
