//! On-disk shape of rule catalogues (YAML or JSON).
//!
//! ```yaml
//! language: java
//! bundle: Jca
//! groups:
//!   - name: jca.gcm_parameter_spec
//!     top_level: true
//!     rules:
//!       - object_types: [javax.crypto.spec.GCMParameterSpec]
//!         invocation: constructor
//!         detect_as: { kind: fixed, value_kind: Mode, value: GCM }
//!         parameters:
//!           - { type: int, detect_as: { kind: tag_size } }
//!           - { type: "byte[]", detect_as: { kind: iv_size, unit: byte } }
//!         context: AlgorithmParameter
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::context::{Bundle, DetectionContext};
use super::factory::ValueFactory;
use crate::syntax::{InvocationKind, Language};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogueFile {
    pub language: Language,
    /// Default bundle for every group in the file.
    #[serde(default)]
    pub bundle: Option<Bundle>,
    pub groups: Vec<GroupSpec>,
}

/// A named set of rules. Dependencies refer to groups, not single rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupSpec {
    pub name: String,
    /// Top-level groups are tried against every call site; the others only
    /// run as dependencies.
    #[serde(default)]
    pub top_level: bool,
    #[serde(default)]
    pub bundle: Option<Bundle>,
    pub rules: Vec<RuleSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    #[serde(default)]
    pub name: Option<String>,
    pub object_types: Vec<String>,
    pub invocation: InvocationKind,
    /// Method or constant names; unused for constructors.
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub detect_as: Option<ValueFactory>,
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
    pub context: DetectionContext,
    /// Groups evaluated against the expression that produced the receiver.
    #[serde(default)]
    pub receiver: Vec<String>,
    /// Groups evaluated against later calls on the object this call creates.
    #[serde(default)]
    pub usages: Vec<String>,
    /// Dependencies by argument index, in addition to those declared on the
    /// parameters themselves.
    #[serde(default)]
    pub arguments: BTreeMap<usize, Vec<String>>,
    #[serde(default)]
    pub exact_object: bool,
    #[serde(default)]
    pub bundle: Option<Bundle>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterSpec {
    #[serde(rename = "type")]
    pub type_name: String,
    /// Keyword under which the argument may be passed.
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub detect_as: Option<ValueFactory>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub exact: bool,
    /// The rule fails when the directive extracts nothing.
    #[serde(default)]
    pub required: bool,
    /// The argument may be left out of the call.
    #[serde(default)]
    pub optional: bool,
}

impl ParameterSpec {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            keyword: None,
            detect_as: None,
            depends_on: Vec::new(),
            exact: false,
            required: false,
            optional: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::value::ValueTag;
    use crate::rules::context::ContextTag;
    use crate::rules::factory::SizeUnit;
    use pretty_assertions::assert_eq;

    const GCM_YAML: &str = r#"
language: java
bundle: Jca
groups:
  - name: jca.gcm_parameter_spec
    top_level: true
    rules:
      - object_types: [javax.crypto.spec.GCMParameterSpec]
        invocation: constructor
        detect_as: { kind: fixed, value_kind: Mode, value: GCM }
        parameters:
          - { type: int, detect_as: { kind: tag_size } }
          - { type: "byte[]", detect_as: { kind: iv_size, unit: byte } }
        context: AlgorithmParameter
"#;

    #[test]
    fn test_parse_catalogue_file() {
        let file: CatalogueFile = serde_yaml::from_str(GCM_YAML).unwrap();

        assert_eq!(file.language, Language::Java);
        assert_eq!(file.bundle, Some(Bundle::Jca));
        assert_eq!(file.groups.len(), 1);
        let group = &file.groups[0];
        assert!(group.top_level);
        let rule = &group.rules[0];
        assert_eq!(rule.invocation, InvocationKind::Constructor);
        assert_eq!(rule.context.tag, ContextTag::AlgorithmParameter);
        assert_eq!(
            rule.detect_as,
            Some(ValueFactory::fixed(ValueTag::Mode, "GCM"))
        );
        assert_eq!(rule.parameters[1].type_name, "byte[]");
        assert_eq!(
            rule.parameters[1].detect_as,
            Some(ValueFactory::IvSize {
                unit: SizeUnit::Byte
            })
        );
        assert!(!rule.exact_object);
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let yaml = r#"
language: java
groups:
  - name: g
    rules:
      - object_types: [A]
        invocation: method
        context: Cipher
        colour: blue
"#;
        let result: Result<CatalogueFile, _> = serde_yaml::from_str(yaml);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_json_catalogue() {
        let json = r#"{
            "language": "python",
            "groups": [{
                "name": "pyca.hashes",
                "rules": [{
                    "object_types": ["cryptography.hazmat.primitives.hashes.SHA256"],
                    "invocation": "constructor",
                    "detect_as": {"kind": "type_name", "value_kind": "Algorithm"},
                    "context": "Digest"
                }]
            }]
        }"#;
        let file: CatalogueFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.language, Language::Python);
        assert!(!file.groups[0].top_level);
    }
}
