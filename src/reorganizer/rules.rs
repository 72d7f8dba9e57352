//! The standard rewrite rules, in the order they run.

use super::ReorganizerRule;
use crate::model::{Node, NodeKind};

const AEAD_MODES: &[&str] = &["GCM", "CCM", "EAX", "OCB", "SIV", "GCM-SIV"];

/// Properties a mode object carries that describe the cipher using it.
const MODE_PROPERTIES: &[NodeKind] = &[NodeKind::TagLength, NodeKind::IvLength];

pub fn standard_rules() -> Vec<ReorganizerRule> {
    vec![
        ReorganizerRule::new("hoist_properties", has_nested_properties, hoist_properties),
        ReorganizerRule::new("promote_aead_mode", is_aead_block_cipher, promote_aead_mode),
        ReorganizerRule::new("name_mode_wrapper", is_unnamed_mode_wrapper, name_mode_wrapper),
        ReorganizerRule::new("collapse_nested_keys", has_nested_key, collapse_nested_keys),
        ReorganizerRule::new(
            "propagate_key_length",
            has_one_sided_key_length,
            propagate_key_length,
        ),
        ReorganizerRule::new(
            "drop_key_primitive_duplicating_parent",
            has_duplicated_key_primitive,
            drop_key_primitive_duplicating_parent,
        ),
        ReorganizerRule::new("name_mac_construction", is_unnamed_mac, name_mac_construction),
        ReorganizerRule::new(
            "name_signature_with_digest",
            is_unnamed_signature,
            name_signature_with_digest,
        ),
        ReorganizerRule::new(
            "name_key_agreement_by_key_length",
            is_unsized_key_agreement,
            name_key_agreement_by_key_length,
        ),
        ReorganizerRule::new("name_kdf_with_digest", is_unnamed_kdf, name_kdf_with_digest),
        ReorganizerRule::new("drop_empty_wrappers", has_empty_wrapper, drop_empty_wrappers),
    ]
}

fn hoistable(child: &Node) -> Vec<NodeKind> {
    if child.kind == NodeKind::Mode {
        MODE_PROPERTIES
            .iter()
            .copied()
            .filter(|kind| child.has_child(*kind))
            .collect()
    } else if child.kind.is_functionality() {
        child
            .children
            .keys()
            .copied()
            .filter(NodeKind::is_property)
            .collect()
    } else {
        Vec::new()
    }
}

fn has_nested_properties(node: &Node) -> bool {
    node.children.values().any(|child| !hoistable(child).is_empty())
}

/// Moves cipher properties out of mode objects and functionality markers
/// into their parent. A value the parent already has is kept; the nested one
/// is dropped either way.
fn hoist_properties(node: &mut Node) {
    let holders: Vec<NodeKind> = node.children.keys().copied().collect();
    for holder in holders {
        let Some(child) = node.child_mut(holder) else {
            continue;
        };
        let moved: Vec<Node> = hoistable(child)
            .into_iter()
            .filter_map(|kind| child.remove_child(kind))
            .collect();
        for property in moved {
            node.put_child_if_absent(property);
        }
    }
}

fn is_aead_block_cipher(node: &Node) -> bool {
    node.kind == NodeKind::BlockCipher
        && node
            .child(NodeKind::Mode)
            .is_some_and(|mode| AEAD_MODES.contains(&mode.name.as_str()))
}

fn promote_aead_mode(node: &mut Node) {
    node.capabilities.insert(NodeKind::BlockCipher);
    node.kind = NodeKind::AuthenticatedEncryption;
}

fn is_unnamed_mode_wrapper(node: &Node) -> bool {
    if !matches!(node.kind, NodeKind::BlockCipher | NodeKind::AuthenticatedEncryption) {
        return false;
    }
    let Some(mode) = node.child(NodeKind::Mode) else {
        return false;
    };
    node.has_child(NodeKind::BlockCipher)
        || (node.name != mode.name && !node.name.ends_with(&format!("-{}", mode.name)))
}

/// Names a cipher after its mode (`AES-CCM`). A wrapped engine is merged
/// into the wrapper first.
fn name_mode_wrapper(node: &mut Node) {
    let Some(mode) = node.child(NodeKind::Mode).map(|m| m.name.clone()) else {
        return;
    };
    let base = match node.remove_child(NodeKind::BlockCipher) {
        Some(inner) => {
            node.capabilities.extend(inner.capabilities);
            for (_, child) in inner.children {
                node.put_child_if_absent(child);
            }
            inner.name
        }
        None => node.name.clone(),
    };
    if base == mode {
        node.name = mode;
    } else if !node.name.ends_with(&format!("-{mode}")) {
        node.name = format!("{base}-{mode}");
    }
}

fn has_nested_key(node: &Node) -> bool {
    node.kind.is_key() && node.has_child(node.kind)
}

fn collapse_nested_keys(node: &mut Node) {
    let Some(inner) = node.remove_child(node.kind) else {
        return;
    };
    for (_, child) in inner.children {
        node.put_child_if_absent(child);
    }
}

/// Child kinds that share a key length with `node`: keys under primitives
/// and primitives under keys.
fn key_partners(node: &Node) -> Vec<NodeKind> {
    node.children
        .values()
        .filter(|child| {
            (node.kind.is_primitive() && child.kind.is_key())
                || (node.kind.is_key() && child.kind.is_primitive())
        })
        .map(|child| child.kind)
        .collect()
}

fn has_one_sided_key_length(node: &Node) -> bool {
    let own = node.has_child(NodeKind::KeyLength);
    key_partners(node).into_iter().any(|kind| {
        node.child(kind)
            .is_some_and(|partner| partner.has_child(NodeKind::KeyLength) != own)
    })
}

/// Settles on one key length for `node` (its own, else the first partner's)
/// and pushes it down through every chain of key partners that lacks one.
fn propagate_key_length(node: &mut Node) {
    let length = node.child(NodeKind::KeyLength).cloned().or_else(|| {
        key_partners(node).into_iter().find_map(|kind| {
            node.child(kind)
                .and_then(|partner| partner.child(NodeKind::KeyLength))
                .cloned()
        })
    });
    if let Some(length) = length {
        push_key_length(node, length);
    }
}

fn push_key_length(node: &mut Node, length: Node) {
    node.put_child_if_absent(length);
    let Some(own) = node.child(NodeKind::KeyLength).cloned() else {
        return;
    };
    for kind in key_partners(node) {
        if let Some(partner) = node.child_mut(kind) {
            if !partner.has_child(NodeKind::KeyLength) {
                push_key_length(partner, own.clone());
            }
        }
    }
}

/// A primitive under a key that repeats the primitive holding the key,
/// possibly before the parent was named after its mode (`AES` under
/// `AES-GCM`).
fn duplicates(parent: &Node, primitive: &Node) -> bool {
    primitive.kind.is_primitive()
        && (primitive.name == parent.name
            || parent.name.starts_with(&format!("{}-", primitive.name)))
}

fn has_duplicated_key_primitive(node: &Node) -> bool {
    node.kind.is_primitive()
        && node.children.values().any(|key| {
            key.kind.is_key() && key.children.values().any(|child| duplicates(node, child))
        })
}

/// `AES { SecretKey { AES } }` keeps the key but not its copy of the cipher.
fn drop_key_primitive_duplicating_parent(node: &mut Node) {
    let parent = Node::new(node.kind, node.name.clone());
    for key in node.children.values_mut().filter(|c| c.kind.is_key()) {
        let duplicated: Vec<NodeKind> = key
            .children
            .values()
            .filter(|child| duplicates(&parent, child))
            .map(|child| child.kind)
            .collect();
        for kind in duplicated {
            key.remove_child(kind);
        }
    }
}

fn is_unnamed_mac(node: &Node) -> bool {
    node.kind == NodeKind::Mac
        && match node.name.as_str() {
            "HMAC" => node.has_child(NodeKind::MessageDigest),
            "CMAC" | "GMAC" => node.has_child(NodeKind::BlockCipher),
            _ => false,
        }
}

/// `HMAC-SHA256`, `AES-CMAC`.
fn name_mac_construction(node: &mut Node) {
    if let Some(digest) = node.child(NodeKind::MessageDigest) {
        if node.name == "HMAC" {
            node.name = format!("HMAC-{}", digest.name);
            return;
        }
    }
    if let Some(cipher) = node.child(NodeKind::BlockCipher) {
        node.name = format!("{}-{}", cipher.name, node.name);
    }
}

fn is_unnamed_signature(node: &Node) -> bool {
    node.kind == NodeKind::Signature
        && node.has_child(NodeKind::MessageDigest)
        && !node.name.contains("with")
}

fn name_signature_with_digest(node: &mut Node) {
    if let Some(digest) = node.child(NodeKind::MessageDigest) {
        node.name = format!("{}with{}", digest.name, node.name);
    }
}

fn is_unsized_key_agreement(node: &Node) -> bool {
    node.kind == NodeKind::KeyAgreement
        && node.has_child(NodeKind::KeyLength)
        && !node.name.contains('-')
}

/// `DH-512`.
fn name_key_agreement_by_key_length(node: &mut Node) {
    if let Some(length) = node.child(NodeKind::KeyLength) {
        node.name = format!("{}-{}", node.name, length.name);
    }
}

fn is_unnamed_kdf(node: &Node) -> bool {
    node.kind == NodeKind::KeyDerivationFunction
        && node.has_child(NodeKind::MessageDigest)
        && !node.name.contains('-')
}

/// `HKDF-SHA256`.
fn name_kdf_with_digest(node: &mut Node) {
    if let Some(digest) = node.child(NodeKind::MessageDigest) {
        node.name = format!("{}-{}", node.name, digest.name);
    }
}

fn is_empty_wrapper(parent: &Node, child: &Node) -> bool {
    (child.kind.is_primitive() || child.kind.is_key())
        && child.children.is_empty()
        && child.name == parent.name
}

fn has_empty_wrapper(node: &Node) -> bool {
    node.children.values().any(|child| is_empty_wrapper(node, child))
}

fn drop_empty_wrappers(node: &mut Node) {
    let empty: Vec<NodeKind> = node
        .children
        .values()
        .filter(|child| is_empty_wrapper(node, child))
        .map(|child| child.kind)
        .collect();
    for kind in empty {
        node.remove_child(kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn apply(pattern: fn(&Node) -> bool, rewrite: fn(&mut Node), node: &mut Node) {
        assert!(pattern(node));
        rewrite(node);
        assert!(!pattern(node));
    }

    #[test]
    fn test_hoist_mode_and_marker_properties() {
        let mut node = Node::new(NodeKind::BlockCipher, "AES")
            .with_child(
                Node::new(NodeKind::Mode, "GCM")
                    .with_child(Node::new(NodeKind::TagLength, "128"))
                    .with_child(Node::new(NodeKind::BlockSize, "8")),
            )
            .with_child(
                Node::marker(NodeKind::Encrypt).with_child(Node::new(NodeKind::IvLength, "96")),
            );

        apply(has_nested_properties, hoist_properties, &mut node);
        assert_eq!(node.child(NodeKind::TagLength).unwrap().name, "128");
        assert_eq!(node.child(NodeKind::IvLength).unwrap().name, "96");
        let mode = node.child(NodeKind::Mode).unwrap();
        assert!(!mode.has_child(NodeKind::TagLength));
        assert!(mode.has_child(NodeKind::BlockSize));
    }

    #[test]
    fn test_hoist_keeps_existing_parent_value() {
        let mut node = Node::new(NodeKind::BlockCipher, "AES")
            .with_child(Node::new(NodeKind::TagLength, "96"))
            .with_child(
                Node::new(NodeKind::Mode, "GCM").with_child(Node::new(NodeKind::TagLength, "128")),
            );

        apply(has_nested_properties, hoist_properties, &mut node);
        assert_eq!(node.child(NodeKind::TagLength).unwrap().name, "96");
        assert!(node.child(NodeKind::Mode).unwrap().children.is_empty());
    }

    #[test]
    fn test_promote_and_name_wrapper_with_engine() {
        let mut node = Node::new(NodeKind::BlockCipher, "CCM")
            .with_child(Node::new(NodeKind::Mode, "CCM"))
            .with_child(
                Node::new(NodeKind::BlockCipher, "AES")
                    .with_child(Node::new(NodeKind::BlockSize, "128")),
            );

        apply(is_aead_block_cipher, promote_aead_mode, &mut node);
        apply(is_unnamed_mode_wrapper, name_mode_wrapper, &mut node);

        assert_eq!(node.kind, NodeKind::AuthenticatedEncryption);
        assert_eq!(node.name, "AES-CCM");
        assert!(node.has_capability(NodeKind::BlockCipher));
        assert!(!node.has_child(NodeKind::BlockCipher));
        assert_eq!(node.child(NodeKind::BlockSize).unwrap().name, "128");
    }

    #[test]
    fn test_wrapper_without_engine_keeps_mode_name() {
        let node =
            Node::new(NodeKind::BlockCipher, "CBC").with_child(Node::new(NodeKind::Mode, "CBC"));
        assert!(!is_unnamed_mode_wrapper(&node));

        let mut aes =
            Node::new(NodeKind::BlockCipher, "AES").with_child(Node::new(NodeKind::Mode, "CBC"));
        apply(is_unnamed_mode_wrapper, name_mode_wrapper, &mut aes);
        assert_eq!(aes.name, "AES-CBC");
    }

    #[test]
    fn test_collapse_nested_keys() {
        let mut key = Node::new(NodeKind::SecretKey, "AES").with_child(
            Node::new(NodeKind::SecretKey, "AES").with_child(Node::new(NodeKind::KeyLength, "256")),
        );

        apply(has_nested_key, collapse_nested_keys, &mut key);
        assert_eq!(key.child(NodeKind::KeyLength).unwrap().name, "256");
        assert!(!key.has_child(NodeKind::SecretKey));
    }

    #[test]
    fn test_propagate_key_length_both_ways() {
        let mut key = Node::new(NodeKind::SecretKey, "DESede")
            .with_child(Node::new(NodeKind::KeyLength, "192"))
            .with_child(Node::new(NodeKind::BlockCipher, "DESede"));
        apply(has_one_sided_key_length, propagate_key_length, &mut key);
        let cipher = key.child(NodeKind::BlockCipher).unwrap();
        assert_eq!(cipher.child(NodeKind::KeyLength).unwrap().name, "192");

        let mut cipher = Node::new(NodeKind::BlockCipher, "AES").with_child(
            Node::new(NodeKind::SecretKey, "AES").with_child(Node::new(NodeKind::KeyLength, "128")),
        );
        apply(has_one_sided_key_length, propagate_key_length, &mut cipher);
        assert_eq!(cipher.child(NodeKind::KeyLength).unwrap().name, "128");
    }

    #[test]
    fn test_drop_key_primitive_duplicating_parent() {
        let mut cipher = Node::new(NodeKind::BlockCipher, "AES").with_child(
            Node::new(NodeKind::SecretKey, "AES")
                .with_child(Node::new(NodeKind::BlockCipher, "AES")),
        );

        apply(
            has_duplicated_key_primitive,
            drop_key_primitive_duplicating_parent,
            &mut cipher,
        );
        assert!(cipher.child(NodeKind::SecretKey).unwrap().children.is_empty());
    }

    #[test]
    fn test_name_constructions() {
        let mut hmac = Node::new(NodeKind::Mac, "HMAC")
            .with_child(Node::new(NodeKind::MessageDigest, "SHA256"));
        let mut cmac =
            Node::new(NodeKind::Mac, "CMAC").with_child(Node::new(NodeKind::BlockCipher, "AES"));
        let mut signature = Node::new(NodeKind::Signature, "DSA")
            .with_child(Node::new(NodeKind::MessageDigest, "SHA256"));
        let mut dh = Node::new(NodeKind::KeyAgreement, "DH")
            .with_child(Node::new(NodeKind::KeyLength, "512"));
        let mut hkdf = Node::new(NodeKind::KeyDerivationFunction, "HKDF")
            .with_child(Node::new(NodeKind::MessageDigest, "SHA256"));

        apply(is_unnamed_mac, name_mac_construction, &mut hmac);
        apply(is_unnamed_mac, name_mac_construction, &mut cmac);
        apply(is_unnamed_signature, name_signature_with_digest, &mut signature);
        apply(is_unsized_key_agreement, name_key_agreement_by_key_length, &mut dh);
        apply(is_unnamed_kdf, name_kdf_with_digest, &mut hkdf);

        assert_eq!(hmac.name, "HMAC-SHA256");
        assert_eq!(cmac.name, "AES-CMAC");
        assert_eq!(signature.name, "SHA256withDSA");
        assert_eq!(dh.name, "DH-512");
        assert_eq!(hkdf.name, "HKDF-SHA256");
    }

    #[test]
    fn test_drop_empty_wrappers() {
        let mut key = Node::new(NodeKind::SecretKey, "AES")
            .with_child(Node::new(NodeKind::BlockCipher, "AES"))
            .with_child(Node::new(NodeKind::KeyLength, "AES"));

        apply(has_empty_wrapper, drop_empty_wrappers, &mut key);
        assert!(!key.has_child(NodeKind::BlockCipher));
        assert!(key.has_child(NodeKind::KeyLength));
    }
}
