//! Mappers shared by every library bundle.

use super::algorithms::{known_node_of, lookup};
use super::{jca, unknown, MapperInput};
use crate::engine::value::{KeyAction, SignatureAction, ValueData};
use crate::model::{Node, NodeKind};
use crate::rules::Bundle;

fn length(kind: NodeKind, input: &MapperInput<'_>) -> Option<Node> {
    let bits = input.value.as_int()?;
    (bits > 0).then(|| Node::new(kind, bits.to_string()))
}

pub fn key_length(input: &MapperInput<'_>) -> Option<Node> {
    length(NodeKind::KeyLength, input)
}

pub fn tag_length(input: &MapperInput<'_>) -> Option<Node> {
    length(NodeKind::TagLength, input)
}

pub fn iv_length(input: &MapperInput<'_>) -> Option<Node> {
    length(NodeKind::IvLength, input)
}

pub fn salt_length(input: &MapperInput<'_>) -> Option<Node> {
    length(NodeKind::SaltLength, input)
}

pub fn iterations(input: &MapperInput<'_>) -> Option<Node> {
    length(NodeKind::NumberOfIterations, input)
}

pub fn curve(input: &MapperInput<'_>) -> Option<Node> {
    let name = input.text();
    let name = name.trim();
    (!name.is_empty()).then(|| Node::new(NodeKind::EllipticCurve, name))
}

pub fn mode(input: &MapperInput<'_>) -> Option<Node> {
    jca::mode_node(&input.text())
}

pub fn padding(input: &MapperInput<'_>) -> Option<Node> {
    jca::padding_node(&input.text())
}

/// Digest names as JCA strings, Bouncy Castle class names or pyca classes.
pub fn digest(input: &MapperInput<'_>) -> Option<Node> {
    digest_node(&input.text()).or_else(|| unknown(input))
}

pub fn digest_node(name: &str) -> Option<Node> {
    let name = name.trim();
    let name = name.strip_suffix("Digest").unwrap_or(name);
    let name = match name {
        "SHA3" | "Keccak" => "SHA3-256",
        "SHA512t" => "SHA512/256",
        other => other,
    };
    known_node_of(name, NodeKind::MessageDigest)
}

/// Cipher mode constants. Bouncy Castle engines take a boolean `forEncryption`,
/// JCA uses the `Cipher.*_MODE` integers.
pub fn operation_mode(input: &MapperInput<'_>) -> Option<Node> {
    let ValueData::OperationMode(mode) = input.value.data else {
        return None;
    };
    let kind = match (input.bundle, mode) {
        (Some(Bundle::Bc), 1) => NodeKind::Encrypt,
        (Some(Bundle::Bc), 0) => NodeKind::Decrypt,
        (Some(Bundle::Bc), _) => return None,
        (_, 1) => NodeKind::Encrypt,
        (_, 2) => NodeKind::Decrypt,
        (_, 3) => NodeKind::Wrap,
        (_, 4) => NodeKind::Unwrap,
        _ => return None,
    };
    Some(Node::marker(kind))
}

pub fn key_action(input: &MapperInput<'_>) -> Option<Node> {
    let ValueData::KeyAction(action) = input.value.data else {
        return None;
    };
    let kind = match action {
        KeyAction::Generate => NodeKind::KeyGeneration,
        KeyAction::Derive => NodeKind::KeyDerivation,
        KeyAction::Wrap => NodeKind::Wrap,
        KeyAction::Unwrap => NodeKind::Unwrap,
    };
    Some(Node::marker(kind))
}

pub fn signature_action(input: &MapperInput<'_>) -> Option<Node> {
    let ValueData::SignatureAction(action) = input.value.data else {
        return None;
    };
    let kind = match action {
        SignatureAction::Sign => NodeKind::Sign,
        SignatureAction::Verify => NodeKind::Verify,
    };
    Some(Node::marker(kind))
}

/// Free-form action names; anything unrecognised produces no node.
pub fn value_action(input: &MapperInput<'_>) -> Option<Node> {
    let kind = match input.text().trim().to_lowercase().as_str() {
        "encrypt" | "seal" => NodeKind::Encrypt,
        "decrypt" | "open" => NodeKind::Decrypt,
        "sign" => NodeKind::Sign,
        "verify" => NodeKind::Verify,
        "digest" | "hash" => NodeKind::Digest,
        "tag" => NodeKind::Tag,
        "derive" => NodeKind::KeyDerivation,
        "generate" | "generatekey" => NodeKind::KeyGeneration,
        "wrap" => NodeKind::Wrap,
        "unwrap" => NodeKind::Unwrap,
        "encapsulate" => NodeKind::Encapsulate,
        "decapsulate" => NodeKind::Decapsulate,
        _ => return None,
    };
    Some(Node::marker(kind))
}

/// Known node for `name`, re-kinded when the algorithm is used in a role its
/// table entry lists as a capability (RSA used for signatures).
pub fn node_as(name: &str, kind: NodeKind) -> Option<Node> {
    let known = lookup(name)?;
    if known.kind != kind && !known.capabilities.contains(&kind) {
        return None;
    }
    let mut node = known.node();
    if node.kind != kind {
        node.capabilities.insert(node.kind);
        node.capabilities.remove(&kind);
        node.kind = kind;
    }
    Some(node)
}

/// Splits a trailing key size written as `AES_256` or `AES256`.
pub fn split_key_length(name: &str) -> (&str, Option<u32>) {
    if let Some((base, bits)) = name.rsplit_once('_') {
        if let Ok(bits) = bits.parse::<u32>() {
            return (base, Some(bits));
        }
    }
    (name, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::value::DetectionValue;
    use crate::rules::{ContextTag, DetectionContext};
    use crate::syntax::Location;
    use pretty_assertions::assert_eq;

    fn map(
        f: fn(&MapperInput<'_>) -> Option<Node>,
        data: ValueData,
        bundle: Option<Bundle>,
    ) -> Option<Node> {
        let value = DetectionValue::new(data, Location::new("A.java", 1, 1));
        let context = DetectionContext::new(ContextTag::Cipher);
        f(&MapperInput::new(&value, &context, bundle))
    }

    #[test]
    fn test_sizes_become_lengths() {
        let key = map(key_length, ValueData::KeySize(256), None).unwrap();
        let tag = map(tag_length, ValueData::MacSize(128), None).unwrap();

        assert_eq!((key.kind, key.name.as_str()), (NodeKind::KeyLength, "256"));
        assert_eq!((tag.kind, tag.name.as_str()), (NodeKind::TagLength, "128"));
        assert!(map(iv_length, ValueData::InitializationVectorSize(0), None).is_none());
    }

    #[test]
    fn test_operation_mode_per_bundle() {
        let bc_true = map(operation_mode, ValueData::OperationMode(1), Some(Bundle::Bc)).unwrap();
        let bc_false = map(operation_mode, ValueData::OperationMode(0), Some(Bundle::Bc)).unwrap();
        let jca_decrypt =
            map(operation_mode, ValueData::OperationMode(2), Some(Bundle::Jca)).unwrap();
        let jca_unwrap = map(operation_mode, ValueData::OperationMode(4), None).unwrap();

        assert_eq!(bc_true.kind, NodeKind::Encrypt);
        assert_eq!(bc_false.kind, NodeKind::Decrypt);
        assert_eq!(jca_decrypt.kind, NodeKind::Decrypt);
        assert_eq!(jca_unwrap.name, "UNWRAP");
        assert!(map(operation_mode, ValueData::OperationMode(0), Some(Bundle::Jca)).is_none());
        assert!(map(operation_mode, ValueData::OperationMode(2), Some(Bundle::Bc)).is_none());
    }

    #[test]
    fn test_actions() {
        let generate = map(key_action, ValueData::KeyAction(KeyAction::Generate), None).unwrap();
        let verify = map(
            signature_action,
            ValueData::SignatureAction(SignatureAction::Verify),
            None,
        )
        .unwrap();

        assert_eq!(generate.kind, NodeKind::KeyGeneration);
        assert_eq!(verify.kind, NodeKind::Verify);
        assert_eq!(
            map(value_action, ValueData::ValueAction("Encrypt".into()), None)
                .unwrap()
                .kind,
            NodeKind::Encrypt
        );
        assert!(map(value_action, ValueData::ValueAction("frobnicate".into()), None).is_none());
    }

    #[test]
    fn test_digest_names_across_libraries() {
        assert_eq!(digest_node("SHA-256").unwrap().name, "SHA256");
        assert_eq!(digest_node("SHA256Digest").unwrap().name, "SHA256");
        assert_eq!(digest_node("SHA3_256").unwrap().name, "SHA3-256");
        assert_eq!(digest_node("SHA3Digest").unwrap().name, "SHA3-256");
        assert!(digest_node("AES").is_none());
    }

    #[test]
    fn test_node_as_uses_capabilities() {
        let rsa = node_as("RSA", NodeKind::Signature).unwrap();

        assert_eq!(rsa.kind, NodeKind::Signature);
        assert!(rsa.has_capability(NodeKind::PublicKeyEncryption));
        assert!(node_as("AES", NodeKind::Signature).is_none());
    }

    #[test]
    fn test_split_key_length() {
        assert_eq!(split_key_length("AES_256"), ("AES", Some(256)));
        assert_eq!(split_key_length("AES"), ("AES", None));
        assert_eq!(split_key_length("SHA3_X"), ("SHA3_X", None));
    }
}
