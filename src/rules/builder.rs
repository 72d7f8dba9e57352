use super::context::{Bundle, DetectionContext};
use super::factory::ValueFactory;
use super::spec::{ParameterSpec, RuleSpec};
use crate::syntax::InvocationKind;

/// Fluent construction of [`RuleSpec`]s in code.
///
/// `should_be_detected_as`, `exact`, `required`, `optional` and
/// `depending_on` apply to the most recently added parameter, or to the call
/// itself before any parameter was added.
///
/// ```
/// use crypto_inventory_core::engine::value::ValueTag;
/// use crypto_inventory_core::rules::{
///     ContextTag, DetectionContext, DetectionRuleBuilder, SizeUnit, ValueFactory,
/// };
///
/// let rule = DetectionRuleBuilder::new()
///     .for_object_types(["javax.crypto.spec.GCMParameterSpec"])
///     .for_constructor()
///     .should_be_detected_as(ValueFactory::fixed(ValueTag::Mode, "GCM"))
///     .with_parameter("int")
///     .should_be_detected_as(ValueFactory::TagSize { unit: SizeUnit::Bit })
///     .with_parameter("byte[]")
///     .should_be_detected_as(ValueFactory::IvSize { unit: SizeUnit::Byte })
///     .build_for_context(DetectionContext::new(ContextTag::AlgorithmParameter));
/// assert_eq!(rule.parameters.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct DetectionRuleBuilder {
    spec: RuleSpec,
}

impl DetectionRuleBuilder {
    pub fn new() -> Self {
        Self {
            spec: RuleSpec {
                name: None,
                object_types: Vec::new(),
                invocation: InvocationKind::Constructor,
                names: Vec::new(),
                detect_as: None,
                parameters: Vec::new(),
                context: DetectionContext::new(super::ContextTag::Cipher),
                receiver: Vec::new(),
                usages: Vec::new(),
                arguments: Default::default(),
                exact_object: false,
                bundle: None,
            },
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.spec.name = Some(name.into());
        self
    }

    pub fn for_object_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec.object_types.extend(types.into_iter().map(Into::into));
        self
    }

    pub fn for_constructor(mut self) -> Self {
        self.spec.invocation = InvocationKind::Constructor;
        self
    }

    pub fn for_methods<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec.invocation = InvocationKind::Method;
        self.spec.names.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn for_constants<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec.invocation = InvocationKind::EnumReference;
        self.spec.names.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_parameter(mut self, type_name: impl Into<String>) -> Self {
        self.spec.parameters.push(ParameterSpec::new(type_name));
        self
    }

    pub fn with_keyword_parameter(
        mut self,
        type_name: impl Into<String>,
        keyword: impl Into<String>,
    ) -> Self {
        let mut parameter = ParameterSpec::new(type_name);
        parameter.keyword = Some(keyword.into());
        self.spec.parameters.push(parameter);
        self
    }

    pub fn should_be_detected_as(mut self, factory: ValueFactory) -> Self {
        match self.spec.parameters.last_mut() {
            Some(parameter) => parameter.detect_as = Some(factory),
            None => self.spec.detect_as = Some(factory),
        }
        self
    }

    /// Exact type matching for the last parameter, or for the receiver
    /// before any parameter was added.
    pub fn exact(mut self) -> Self {
        match self.spec.parameters.last_mut() {
            Some(parameter) => parameter.exact = true,
            None => self.spec.exact_object = true,
        }
        self
    }

    pub fn required(mut self) -> Self {
        if let Some(parameter) = self.spec.parameters.last_mut() {
            parameter.required = true;
        }
        self
    }

    pub fn optional(mut self) -> Self {
        if let Some(parameter) = self.spec.parameters.last_mut() {
            parameter.optional = true;
        }
        self
    }

    /// Dependent groups for the last parameter.
    pub fn depending_on<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Some(parameter) = self.spec.parameters.last_mut() {
            parameter.depends_on.extend(groups.into_iter().map(Into::into));
        }
        self
    }

    pub fn with_receiver_rules<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec.receiver.extend(groups.into_iter().map(Into::into));
        self
    }

    pub fn with_usage_rules<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec.usages.extend(groups.into_iter().map(Into::into));
        self
    }

    pub fn in_bundle(mut self, bundle: Bundle) -> Self {
        self.spec.bundle = Some(bundle);
        self
    }

    pub fn build_for_context(mut self, context: DetectionContext) -> RuleSpec {
        self.spec.context = context;
        self.spec
    }
}

impl Default for DetectionRuleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::value::ValueTag;
    use crate::rules::{ContextTag, SizeUnit};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_directives_attach_to_last_parameter() {
        let rule = DetectionRuleBuilder::new()
            .for_object_types(["javax.crypto.spec.DESedeKeySpec"])
            .for_constructor()
            .with_parameter("byte[]")
            .should_be_detected_as(ValueFactory::KeySize {
                unit: SizeUnit::Bit,
            })
            .required()
            .with_parameter("int")
            .in_bundle(Bundle::Jca)
            .build_for_context(DetectionContext::qualified(ContextTag::SecretKey, "DESede"));

        assert_eq!(rule.detect_as, None);
        assert_eq!(rule.parameters.len(), 2);
        assert!(rule.parameters[0].required);
        assert_eq!(rule.parameters[1].detect_as, None);
        assert_eq!(rule.bundle, Some(Bundle::Jca));
        assert_eq!(rule.context.qualifier(), Some("DESede"));
    }

    #[test]
    fn test_call_level_directive_and_exact_receiver() {
        let rule = DetectionRuleBuilder::new()
            .named("jca.cipher.init")
            .for_object_types(["javax.crypto.Cipher"])
            .for_methods(["init"])
            .exact()
            .should_be_detected_as(ValueFactory::fixed(ValueTag::ValueAction, "init"))
            .with_parameter("int")
            .should_be_detected_as(ValueFactory::OperationMode)
            .with_parameter("java.security.Key")
            .depending_on(["jca.secret_key"])
            .build_for_context(DetectionContext::new(ContextTag::Cipher));

        assert_eq!(rule.invocation, InvocationKind::Method);
        assert_eq!(rule.names, vec!["init"]);
        assert!(rule.exact_object);
        assert_eq!(
            rule.detect_as,
            Some(ValueFactory::fixed(ValueTag::ValueAction, "init"))
        );
        assert_eq!(rule.parameters[1].depends_on, vec!["jca.secret_key"]);
    }

    #[test]
    fn test_keyword_parameters() {
        let rule = DetectionRuleBuilder::new()
            .for_object_types(["cryptography.hazmat.primitives.kdf.hkdf.HKDFExpand"])
            .for_constructor()
            .with_keyword_parameter("*", "length")
            .with_keyword_parameter("*", "backend")
            .optional()
            .with_usage_rules(["pyca.kdf_derive"])
            .build_for_context(DetectionContext::new(ContextTag::KeyDerivation));

        assert_eq!(rule.parameters[0].keyword.as_deref(), Some("length"));
        assert!(rule.parameters[1].optional);
        assert_eq!(rule.usages, vec!["pyca.kdf_derive"]);
    }
}
