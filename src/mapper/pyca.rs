//! Class names from the `cryptography` Python package.

use super::algorithms::{known_node, known_node_of};
use super::common::digest_node;
use super::{unknown, MapperInput};
use crate::model::{Node, NodeKind};

/// AEAD classes and the cipher/mode pair each one implements.
const AEAD_CLASSES: &[(&str, &str, &str)] = &[
    ("AESGCM", "AES", "GCM"),
    ("AESCCM", "AES", "CCM"),
    ("AESSIV", "AES", "SIV"),
    ("AESOCB3", "AES", "OCB"),
    ("AESGCMSIV", "AES", "GCM-SIV"),
];

const KDF_CLASSES: &[(&str, &str)] = &[
    ("HKDF", "HKDF"),
    ("HKDFExpand", "HKDF"),
    ("PBKDF2HMAC", "PBKDF2"),
    ("Scrypt", "scrypt"),
];

/// KDFs without a table entry, named as they are usually written.
const NAMED_KDFS: &[(&str, &str)] = &[
    ("ConcatKDFHash", "ConcatKDF"),
    ("ConcatKDFHMAC", "ConcatKDF"),
    ("X963KDF", "X9.63-KDF"),
    ("KBKDFHMAC", "KBKDF"),
    ("KBKDFCMAC", "KBKDF"),
];

pub fn algorithm(input: &MapperInput<'_>) -> Option<Node> {
    let text = input.text();
    let name = text.trim();
    if name.is_empty() {
        return None;
    }
    kdf_node(name)
        .or_else(|| aead_node(name))
        .or_else(|| digest_node(name))
        .or_else(|| known_node(name))
        .or_else(|| unknown(input))
}

pub fn kdf_node(name: &str) -> Option<Node> {
    let node = if let Some((_, kdf)) = KDF_CLASSES.iter().find(|(class, _)| *class == name) {
        known_node_of(kdf, NodeKind::KeyDerivationFunction)?
    } else {
        let (_, kdf) = NAMED_KDFS.iter().find(|(class, _)| *class == name)?;
        Node::new(NodeKind::KeyDerivationFunction, *kdf)
    };
    Some(node.with_child(Node::marker(NodeKind::KeyDerivation)))
}

pub fn aead_node(name: &str) -> Option<Node> {
    let (_, cipher, mode) = AEAD_CLASSES.iter().find(|(class, _, _)| *class == name)?;
    let cipher = known_node(cipher)?;
    Some(cipher.with_child(Node::new(NodeKind::Mode, *mode)))
}
