//! Standard algorithm names as used by the Java Cryptography Architecture.

use super::algorithms::{known_node, known_node_of, normalize};
use super::common::{digest_node, node_as, split_key_length};
use super::{default_kind, unknown, MapperInput};
use crate::model::{Node, NodeKind};
use crate::rules::ContextTag;
use crate::utils::string::strip_prefix_ignore_case;

const MODES: &[&str] = &[
    "ECB", "CBC", "CFB", "OFB", "CTR", "GCM", "CCM", "EAX", "OCB", "SIV", "GCM-SIV", "CTS", "PCBC",
    "KW", "KWP", "XTS",
];

pub fn algorithm(input: &MapperInput<'_>) -> Option<Node> {
    let text = input.text();
    let name = text.trim();
    if name.is_empty() {
        return None;
    }
    let node = match input.context.tag {
        ContextTag::Cipher => cipher_node(name),
        ContextTag::Digest => digest_node(name),
        ContextTag::Mac => mac_node(name),
        ContextTag::Signature => signature_node(name),
        ContextTag::KeyAgreement => known_node_of(name, NodeKind::KeyAgreement),
        ContextTag::Kem => return kem(input),
        ContextTag::Prng => prng_node(name),
        ContextTag::Protocol => protocol_node(name),
        ContextTag::KeyDerivation => kdf_node(name),
        ContextTag::SecretKey
        | ContextTag::PublicKey
        | ContextTag::PrivateKey
        | ContextTag::Key => Some(key_node(default_kind(input.context), name)),
        ContextTag::AlgorithmParameter => known_node(name),
    };
    node.or_else(|| unknown(input))
}

/// `algorithm[/mode[/padding]]` transformations, with an optional key size
/// suffix on the algorithm (`AES_256`).
pub fn cipher_node(transformation: &str) -> Option<Node> {
    let mut parts = transformation.split('/').map(str::trim);
    let algorithm = parts.next().filter(|s| !s.is_empty())?;
    if algorithm.starts_with("PBEWith") {
        return pbe_node(algorithm);
    }

    let (base, bits) = split_key_length(algorithm);
    let mut node = known_node(base)
        .unwrap_or_else(|| Node::new(NodeKind::Algorithm, base).with_child(Node::unknown(base)));
    if let Some(bits) = bits {
        node.put_child(Node::new(NodeKind::KeyLength, bits.to_string()));
    }
    if let Some(mode) = parts.next().and_then(mode_node) {
        node.put_child(mode);
    }
    if let Some(padding) = parts.next().and_then(padding_node) {
        node.put_child(padding);
    }
    Some(node)
}

/// Mode names, with an optional feedback size (`CFB8`, `OFB32`). `NONE`
/// yields nothing.
pub fn mode_node(text: &str) -> Option<Node> {
    let upper = text.trim().to_uppercase();
    if upper.is_empty() || upper == "NONE" {
        return None;
    }
    let base = upper.trim_end_matches(|c: char| c.is_ascii_digit());
    if base.len() < upper.len() && MODES.contains(&base) {
        let bits = &upper[base.len()..];
        return Some(
            Node::new(NodeKind::Mode, base).with_child(Node::new(NodeKind::BlockSize, bits)),
        );
    }
    Some(Node::new(NodeKind::Mode, upper))
}

pub fn padding_node(text: &str) -> Option<Node> {
    let text = text.trim();
    if text.is_empty() || text.eq_ignore_ascii_case("NoPadding") {
        return None;
    }
    if let Some(rest) = text.strip_prefix("OAEPWith") {
        let mut node = Node::new(NodeKind::Padding, "OAEP");
        if let Some(digest) = rest.split("And").next().and_then(digest_node) {
            node.put_child(digest);
        }
        return Some(node);
    }
    let name = text.strip_suffix("Padding").unwrap_or(text);
    Some(Node::new(NodeKind::Padding, name))
}

/// `HmacSHA256`, `AESCMAC`, `AESGMAC` and plain MAC names.
pub fn mac_node(name: &str) -> Option<Node> {
    if let Some(digest) = strip_prefix_ignore_case(name, "Hmac") {
        let mut node = Node::new(NodeKind::Mac, "HMAC");
        if let Some(digest) = digest_node(digest) {
            node.put_child(digest);
        }
        return Some(node);
    }
    let upper = name.to_uppercase();
    for construction in ["CMAC", "GMAC"] {
        if upper.len() > construction.len() && upper.ends_with(construction) {
            let cipher = name[..name.len() - construction.len()].trim_end_matches('-');
            let mut node = Node::new(NodeKind::Mac, construction);
            if let Some(cipher) = known_node_of(cipher, NodeKind::BlockCipher) {
                node.put_child(cipher);
            }
            return Some(node);
        }
    }
    known_node_of(name, NodeKind::Mac)
}

/// `<digest>with<algorithm>` signature names.
pub fn signature_node(name: &str) -> Option<Node> {
    let Some(at) = name.to_ascii_lowercase().find("with") else {
        return node_as(name, NodeKind::Signature);
    };
    let digest = &name[..at];
    let rest = &name[at + 4..];
    let signer = rest
        .split(['/', ' '])
        .next()
        .map(|s| s.split("and").next().unwrap_or(s))
        .unwrap_or(rest);

    let mut node = if rest.contains("PSS") || rest.contains("MGF1") {
        node_as("RSASSA-PSS", NodeKind::Signature)
    } else {
        node_as(signer, NodeKind::Signature)
    }
    .unwrap_or_else(|| Node::new(NodeKind::Signature, signer).with_child(Node::unknown(signer)));
    if let Some(digest) = digest_node(digest) {
        node.put_child(digest);
    }
    Some(node)
}

/// ML-KEM parameter sets; a bare `ML-KEM` means the 768 set.
pub fn kem(input: &MapperInput<'_>) -> Option<Node> {
    let set = match normalize(&input.text()).as_str() {
        "MLKEM" | "MLKEM768" | "KYBER" | "KYBER768" => "768",
        "MLKEM512" | "KYBER512" => "512",
        "MLKEM1024" | "KYBER1024" => "1024",
        _ => return unknown(input),
    };
    known_node(&format!("ML-KEM-{set}"))
        .map(|node| node.with_child(Node::new(NodeKind::ParameterSetIdentifier, set)))
}

pub fn prng_node(name: &str) -> Option<Node> {
    if name.starts_with("NativePRNG") {
        return known_node("NativePRNG");
    }
    if name.starts_with("DRBG") {
        return known_node("DRBG");
    }
    let mut node = known_node_of(name, NodeKind::PseudorandomNumberGenerator)?;
    if let Some(digest) = name.strip_suffix("PRNG").and_then(digest_node) {
        node.put_child(digest);
    }
    Some(node)
}

pub fn protocol_node(name: &str) -> Option<Node> {
    let upper = name.to_uppercase();
    ["TLS", "DTLS", "SSL"]
        .iter()
        .any(|p| upper.starts_with(p))
        .then(|| Node::new(NodeKind::Protocol, name))
}

/// Key derivation names: `PBKDF2WithHmacSHA256`, `PBEWith...` schemes and
/// plain KDF names.
pub fn kdf_node(name: &str) -> Option<Node> {
    if let Some(rest) = name.strip_prefix("PBKDF2With") {
        let mut node = known_node("PBKDF2")?;
        if let Some(digest) = strip_prefix_ignore_case(rest, "Hmac").and_then(digest_node) {
            node.put_child(digest);
        }
        return Some(node.with_child(Node::marker(NodeKind::KeyDerivation)));
    }
    if name.starts_with("PBEWith") {
        return pbe_node(name);
    }
    if let Some(node) = known_node_of(name, NodeKind::KeyDerivationFunction) {
        return Some(node.with_child(Node::marker(NodeKind::KeyDerivation)));
    }
    known_node_of(name, NodeKind::PasswordBasedEncryption)
}

/// `PBEWith<digest>And<cipher>`. HMAC based names are PBES2, the rest PBES1.
pub fn pbe_node(name: &str) -> Option<Node> {
    let rest = name.strip_prefix("PBEWith")?;
    let (digest, cipher) = rest.split_once("And")?;
    let (scheme, digest) = match strip_prefix_ignore_case(digest, "Hmac") {
        Some(digest) => ("PBES2", digest),
        None => ("PBES1", digest),
    };
    let mut node = known_node(scheme)?;
    if let Some(digest) = digest_node(digest) {
        node.put_child(digest);
    }
    let (cipher, bits) = split_key_length(cipher);
    if let Some(mut cipher) = known_node(cipher) {
        if let Some(bits) = bits {
            cipher.put_child(Node::new(NodeKind::KeyLength, bits.to_string()));
        }
        node.put_child(cipher);
    }
    Some(node)
}

/// Key of `kind` named after its algorithm, with the algorithm as a child.
pub fn key_node(kind: NodeKind, name: &str) -> Node {
    let (base, bits) = split_key_length(name);
    let primitive = known_node(base)
        .or_else(|| mac_node(base))
        .or_else(|| kdf_node(base));
    let mut key = match primitive {
        Some(primitive) => Node::new(kind, primitive.name.clone()).with_child(primitive),
        None => Node::new(kind, base).with_child(Node::unknown(base)),
    };
    if let Some(bits) = bits {
        key.put_child(Node::new(NodeKind::KeyLength, bits.to_string()));
    }
    key
}
