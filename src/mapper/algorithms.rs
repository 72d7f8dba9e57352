//! Well-known algorithms with their identifiers and fixed sizes.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::model::{Node, NodeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownAlgorithm {
    pub name: &'static str,
    pub kind: NodeKind,
    pub aliases: &'static [&'static str],
    pub oid: Option<&'static str>,
    pub block_size: Option<u32>,
    pub digest_size: Option<u32>,
    pub capabilities: &'static [NodeKind],
}

const fn algorithm(name: &'static str, kind: NodeKind) -> KnownAlgorithm {
    KnownAlgorithm {
        name,
        kind,
        aliases: &[],
        oid: None,
        block_size: None,
        digest_size: None,
        capabilities: &[],
    }
}

const fn block_cipher(name: &'static str, oid: Option<&'static str>, block: u32) -> KnownAlgorithm {
    KnownAlgorithm {
        oid,
        block_size: Some(block),
        ..algorithm(name, NodeKind::BlockCipher)
    }
}

const fn digest(
    name: &'static str,
    oid: Option<&'static str>,
    size: u32,
    block: u32,
) -> KnownAlgorithm {
    KnownAlgorithm {
        oid,
        block_size: Some(block),
        digest_size: Some(size),
        ..algorithm(name, NodeKind::MessageDigest)
    }
}

const fn with_oid(known: KnownAlgorithm, oid: &'static str) -> KnownAlgorithm {
    KnownAlgorithm {
        oid: Some(oid),
        ..known
    }
}

const fn with_aliases(known: KnownAlgorithm, aliases: &'static [&'static str]) -> KnownAlgorithm {
    KnownAlgorithm { aliases, ..known }
}

static ALGORITHMS: &[KnownAlgorithm] = &[
    // block ciphers
    block_cipher("AES", Some("2.16.840.1.101.3.4.1"), 128),
    block_cipher("DES", Some("1.3.14.3.2.7"), 64),
    with_aliases(
        block_cipher("DESede", Some("1.2.840.113549.3.7"), 64),
        &["TripleDES", "3DES", "DES3"],
    ),
    block_cipher("Blowfish", Some("1.3.6.1.4.1.3029.1.2"), 64),
    block_cipher("Twofish", None, 128),
    block_cipher("Camellia", Some("1.2.392.200011.61.1.1.1"), 128),
    block_cipher("ARIA", Some("1.2.410.200046.1.1"), 128),
    KnownAlgorithm {
        capabilities: &[NodeKind::Mac, NodeKind::AuthenticatedEncryption],
        ..block_cipher("SM4", Some("1.2.156.10197.1.104"), 128)
    },
    block_cipher("SEED", Some("1.2.410.200004.1"), 128),
    block_cipher("Serpent", None, 128),
    block_cipher("RC2", Some("1.2.840.113549.3.2"), 64),
    block_cipher("RC6", None, 128),
    with_aliases(block_cipher("CAST5", Some("1.2.840.113533.7.66.10"), 64), &["CAST-128"]),
    block_cipher("IDEA", Some("1.3.6.1.4.1.188.7.1.1.2"), 64),
    // stream ciphers
    with_aliases(algorithm("ChaCha20", NodeKind::StreamCipher), &["ChaCha7539"]),
    algorithm("ChaCha", NodeKind::StreamCipher),
    algorithm("Salsa20", NodeKind::StreamCipher),
    with_aliases(algorithm("RC4", NodeKind::StreamCipher), &["ARCFOUR", "ARC4"]),
    // authenticated encryption
    with_oid(
        algorithm("ChaCha20-Poly1305", NodeKind::AuthenticatedEncryption),
        "1.2.840.113549.1.9.16.3.18",
    ),
    // public key
    KnownAlgorithm {
        capabilities: &[NodeKind::Signature],
        ..with_oid(
            algorithm("RSA", NodeKind::PublicKeyEncryption),
            "1.2.840.113549.1.1.1",
        )
    },
    algorithm("ElGamal", NodeKind::PublicKeyEncryption),
    with_oid(algorithm("DSA", NodeKind::Signature), "1.2.840.10040.4.1"),
    with_oid(algorithm("ECDSA", NodeKind::Signature), "1.2.840.10045.4"),
    with_oid(algorithm("Ed25519", NodeKind::Signature), "1.3.101.112"),
    with_oid(algorithm("Ed448", NodeKind::Signature), "1.3.101.113"),
    with_aliases(
        with_oid(algorithm("RSASSA-PSS", NodeKind::Signature), "1.2.840.113549.1.1.10"),
        &["PSS"],
    ),
    // digests
    with_aliases(digest("SHA1", Some("1.3.14.3.2.26"), 160, 512), &["SHA"]),
    digest("SHA224", Some("2.16.840.1.101.3.4.2.4"), 224, 512),
    digest("SHA256", Some("2.16.840.1.101.3.4.2.1"), 256, 512),
    digest("SHA384", Some("2.16.840.1.101.3.4.2.2"), 384, 1024),
    digest("SHA512", Some("2.16.840.1.101.3.4.2.3"), 512, 1024),
    digest("SHA512/224", Some("2.16.840.1.101.3.4.2.5"), 224, 1024),
    digest("SHA512/256", Some("2.16.840.1.101.3.4.2.6"), 256, 1024),
    digest("SHA3-224", Some("2.16.840.1.101.3.4.2.7"), 224, 1152),
    digest("SHA3-256", Some("2.16.840.1.101.3.4.2.8"), 256, 1088),
    digest("SHA3-384", Some("2.16.840.1.101.3.4.2.9"), 384, 832),
    digest("SHA3-512", Some("2.16.840.1.101.3.4.2.10"), 512, 576),
    digest("MD5", Some("1.2.840.113549.2.5"), 128, 512),
    digest("MD4", Some("1.2.840.113549.2.4"), 128, 512),
    digest("MD2", Some("1.2.840.113549.2.2"), 128, 128),
    digest("RIPEMD160", Some("1.3.36.3.2.1"), 160, 512),
    digest("SM3", Some("1.2.156.10197.1.401"), 256, 512),
    with_aliases(digest("BLAKE2b", None, 512, 1024), &["BLAKE2b-512"]),
    with_aliases(digest("BLAKE2s", None, 256, 512), &["BLAKE2s-256"]),
    // macs
    algorithm("HMAC", NodeKind::Mac),
    algorithm("CMAC", NodeKind::Mac),
    algorithm("GMAC", NodeKind::Mac),
    algorithm("Poly1305", NodeKind::Mac),
    // key agreement
    with_aliases(
        with_oid(algorithm("DH", NodeKind::KeyAgreement), "1.2.840.113549.1.3.1"),
        &["DiffieHellman"],
    ),
    with_oid(algorithm("ECDH", NodeKind::KeyAgreement), "1.3.132.1.12"),
    with_oid(algorithm("X25519", NodeKind::KeyAgreement), "1.3.101.110"),
    with_oid(algorithm("X448", NodeKind::KeyAgreement), "1.3.101.111"),
    algorithm("XDH", NodeKind::KeyAgreement),
    // key derivation
    algorithm("HKDF", NodeKind::KeyDerivationFunction),
    with_oid(algorithm("PBKDF2", NodeKind::KeyDerivationFunction), "1.2.840.113549.1.5.12"),
    algorithm("scrypt", NodeKind::KeyDerivationFunction),
    algorithm("PBES1", NodeKind::PasswordBasedEncryption),
    with_oid(algorithm("PBES2", NodeKind::PasswordBasedEncryption), "1.2.840.113549.1.5.13"),
    algorithm("PKCS12PBE", NodeKind::PasswordBasedEncryption),
    // kem
    with_oid(
        algorithm("ML-KEM-512", NodeKind::KeyEncapsulationMechanism),
        "2.16.840.1.101.3.4.4.1",
    ),
    with_oid(
        algorithm("ML-KEM-768", NodeKind::KeyEncapsulationMechanism),
        "2.16.840.1.101.3.4.4.2",
    ),
    with_oid(
        algorithm("ML-KEM-1024", NodeKind::KeyEncapsulationMechanism),
        "2.16.840.1.101.3.4.4.3",
    ),
    // prng and protocols
    algorithm("SHA1PRNG", NodeKind::PseudorandomNumberGenerator),
    algorithm("NativePRNG", NodeKind::PseudorandomNumberGenerator),
    algorithm("DRBG", NodeKind::PseudorandomNumberGenerator),
    algorithm("TLS", NodeKind::Protocol),
];

/// Lookup key: case-insensitive, ignoring `-`, `_`, `/` and spaces.
pub fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '-' | '_' | '/' | ' '))
        .flat_map(char::to_uppercase)
        .collect()
}

fn index() -> &'static HashMap<String, &'static KnownAlgorithm> {
    static INDEX: OnceLock<HashMap<String, &'static KnownAlgorithm>> = OnceLock::new();
    INDEX.get_or_init(|| {
        let mut index = HashMap::new();
        for known in ALGORITHMS {
            index.insert(normalize(known.name), known);
            for alias in known.aliases {
                index.insert(normalize(alias), known);
            }
        }
        index
    })
}

pub fn lookup(name: &str) -> Option<&'static KnownAlgorithm> {
    index().get(&normalize(name)).copied()
}

impl KnownAlgorithm {
    /// Node for this algorithm with its fixed properties attached.
    pub fn node(&self) -> Node {
        let mut node = Node::new(self.kind, self.name);
        node.capabilities.extend(self.capabilities.iter().copied());
        if let Some(oid) = self.oid {
            node.put_child(Node::new(NodeKind::Oid, oid));
        }
        if let Some(block) = self.block_size {
            node.put_child(Node::new(NodeKind::BlockSize, block.to_string()));
        }
        if let Some(size) = self.digest_size {
            node.put_child(Node::new(NodeKind::DigestSize, size.to_string()));
        }
        if self.kind == NodeKind::MessageDigest {
            node.put_child(Node::marker(NodeKind::Digest));
        }
        node
    }
}

/// Node for a known algorithm name, if any.
pub fn known_node(name: &str) -> Option<Node> {
    lookup(name).map(KnownAlgorithm::node)
}

/// Node for a known algorithm of the given kind only.
pub fn known_node_of(name: &str, kind: NodeKind) -> Option<Node> {
    lookup(name)
        .filter(|known| known.kind == kind)
        .map(KnownAlgorithm::node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_lookup_ignores_separators_and_case() {
        assert_eq!(lookup("SHA-256").unwrap().name, "SHA256");
        assert_eq!(lookup("sha256").unwrap().name, "SHA256");
        assert_eq!(lookup("SHA3_256").unwrap().name, "SHA3-256");
        assert_eq!(lookup("TripleDES").unwrap().name, "DESede");
        assert_eq!(lookup("DiffieHellman").unwrap().name, "DH");
        assert!(lookup("Rot13").is_none());
    }

    #[test]
    fn test_digest_node_properties() {
        let sha256 = known_node("SHA-256").unwrap();

        assert_eq!(sha256.kind, NodeKind::MessageDigest);
        assert_eq!(sha256.children.len(), 4);
        assert_eq!(sha256.child(NodeKind::BlockSize).unwrap().name, "512");
        assert_eq!(sha256.child(NodeKind::DigestSize).unwrap().name, "256");
        assert_eq!(sha256.child(NodeKind::Digest).unwrap().name, "DIGEST");
        assert_eq!(
            sha256.child(NodeKind::Oid).unwrap().name,
            "2.16.840.1.101.3.4.2.1"
        );
    }

    #[test]
    fn test_capabilities_are_carried() {
        let sm4 = known_node("SM4").unwrap();
        assert!(sm4.has_capability(NodeKind::Mac));
        assert!(sm4.has_capability(NodeKind::AuthenticatedEncryption));
    }

    #[test]
    fn test_known_node_of_checks_kind() {
        assert!(known_node_of("AES", NodeKind::BlockCipher).is_some());
        assert!(known_node_of("AES", NodeKind::MessageDigest).is_none());
    }

    #[test]
    fn test_names_and_aliases_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for known in ALGORITHMS {
            assert!(seen.insert(normalize(known.name)), "{}", known.name);
            for alias in known.aliases {
                assert!(seen.insert(normalize(alias)), "{alias}");
            }
        }
    }
}
