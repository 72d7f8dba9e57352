//! Python scanner scenarios against the built-in pyca catalogue.
//!
//! Fixtures: tests/fixtures/python/

mod fixtures;

use crypto_inventory_core::model::NodeKind;
use crypto_inventory_core::syntax::Language;
use fixtures::{child_name, find, scan_fixture, standard_scanner};
use pretty_assertions::assert_eq;

#[test]
fn test_hkdf_expand_named_with_digest() {
    let nodes = scan_fixture("python", "key_schedule.py");

    assert_eq!(nodes.len(), 1);
    let kdf = &nodes[0];
    assert_eq!(kdf.kind, NodeKind::KeyDerivationFunction);
    assert_eq!(kdf.name, "HKDF-SHA256");
    assert_eq!(child_name(kdf, NodeKind::KeyLength), Some("256"));
    assert!(kdf.has_child(NodeKind::KeyDerivation));

    let digest = kdf.child(NodeKind::MessageDigest).expect("digest should be attached");
    assert_eq!(digest.name, "SHA256");
    assert_eq!(child_name(digest, NodeKind::DigestSize), Some("256"));
}

#[test]
fn test_cipher_with_algorithm_and_mode() {
    let source = r#"
import os
from cryptography.hazmat.primitives.ciphers import Cipher, algorithms, modes

def encryptor():
    key = os.urandom(32)
    iv = os.urandom(16)
    return Cipher(algorithms.AES(key), modes.CBC(b"0123456789abcdef")).encryptor()
"#;
    let report = standard_scanner()
        .scan_source(source, "cipher.py", Language::Python)
        .unwrap();

    let cipher = find(&report.nodes, NodeKind::BlockCipher, "AES-CBC")
        .expect("AES-CBC should be reported");
    assert_eq!(child_name(cipher, NodeKind::Mode), Some("CBC"));
    assert_eq!(child_name(cipher, NodeKind::IvLength), Some("128"));
}

#[test]
fn test_unknown_keyword_does_not_match() {
    let source = r#"
from cryptography.hazmat.primitives import hashes
from cryptography.hazmat.primitives.kdf.hkdf import HKDFExpand

HKDFExpand(algorithm=hashes.SHA256(), length=32, unknown=b"x")
"#;
    let report = standard_scanner()
        .scan_source(source, "kdf.py", Language::Python)
        .unwrap();

    assert!(report.findings.is_empty());
}
