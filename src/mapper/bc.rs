//! Bouncy Castle lightweight API class names.
//!
//! Values arrive as simple class names (`AESEngine`, `GCMBlockCipher`,
//! `HMac`) taken from the constructed or declared type.

use super::algorithms::{known_node, known_node_of};
use super::common::{digest_node, node_as};
use super::{unknown, MapperInput};
use crate::model::{Node, NodeKind};
use crate::rules::ContextTag;

/// Block cipher mode wrappers and the mode each one implements.
const MODE_WRAPPERS: &[(&str, &str)] = &[
    ("CBCBlockCipher", "CBC"),
    ("CBCModeCipher", "CBC"),
    ("CFBBlockCipher", "CFB"),
    ("CFBModeCipher", "CFB"),
    ("OFBBlockCipher", "OFB"),
    ("SICBlockCipher", "CTR"),
    ("CTRModeCipher", "CTR"),
    ("KCTRBlockCipher", "CTR"),
    ("GCMBlockCipher", "GCM"),
    ("GCMModeCipher", "GCM"),
    ("GCMSIVBlockCipher", "GCM-SIV"),
    ("CCMBlockCipher", "CCM"),
    ("CCMModeCipher", "CCM"),
    ("KCCMBlockCipher", "CCM"),
    ("EAXBlockCipher", "EAX"),
    ("OCBBlockCipher", "OCB"),
];

const PBE_GENERATORS: &[(&str, &str)] = &[
    ("PKCS5S1ParametersGenerator", "PBES1"),
    ("PKCS5S2ParametersGenerator", "PBES2"),
    ("PKCS12ParametersGenerator", "PKCS12PBE"),
];

pub fn algorithm(input: &MapperInput<'_>) -> Option<Node> {
    let text = input.text();
    let name = text.trim();
    if name.is_empty() {
        return None;
    }
    if input.context.tag == ContextTag::KeyDerivation {
        if let Some(node) = pbe_node(name).or_else(|| kdf_node(name)) {
            return Some(node);
        }
        return unknown(input);
    }
    engine_node(name)
        .or_else(|| mode_wrapper_node(name))
        .or_else(|| digest_node(name))
        .or_else(|| mac_node(name))
        .or_else(|| signer_node(name))
        .or_else(|| known_node(name))
        .or_else(|| unknown(input))
}

/// Cipher engines: `AESEngine`, `AESFastEngine`, `RSABlindedEngine`.
pub fn engine_node(name: &str) -> Option<Node> {
    ["FastEngine", "LightEngine", "BlindedEngine", "Engine"]
        .iter()
        .find_map(|suffix| name.strip_suffix(suffix))
        .filter(|base| !base.is_empty())
        .and_then(known_node)
}

/// Mode wrappers become a block cipher named after the mode; the wrapped
/// engine is attached later as a child.
pub fn mode_wrapper_node(name: &str) -> Option<Node> {
    let (_, mode) = MODE_WRAPPERS.iter().find(|(class, _)| *class == name)?;
    Some(Node::new(NodeKind::BlockCipher, *mode).with_child(Node::new(NodeKind::Mode, *mode)))
}

pub fn mac_node(name: &str) -> Option<Node> {
    let mac = match name {
        "HMac" => "HMAC",
        "CMac" | "CMacWithIV" => "CMAC",
        "GMac" => "GMAC",
        "Poly1305" => "Poly1305",
        _ => return None,
    };
    known_node_of(mac, NodeKind::Mac)
}

/// Signers: `ECDSASigner`, `RSADigestSigner`, `PSSSigner`.
pub fn signer_node(name: &str) -> Option<Node> {
    let base = name
        .strip_suffix("DigestSigner")
        .or_else(|| name.strip_suffix("Signer"))?;
    let base = match base {
        "PSS" => "RSASSA-PSS",
        "Generic" | "" => return None,
        other => other,
    };
    node_as(base, NodeKind::Signature)
}

/// Password based parameter generators. OpenSSL's generator uses MD5 unless
/// another digest is given.
pub fn pbe_node(name: &str) -> Option<Node> {
    if name == "OpenSSLPBEParametersGenerator" {
        let mut node = known_node("PBES1")?;
        if let Some(md5) = digest_node("MD5") {
            node.put_child(md5);
        }
        return Some(node);
    }
    let (_, scheme) = PBE_GENERATORS.iter().find(|(class, _)| *class == name)?;
    known_node(scheme)
}

/// Byte generators for KDFs: `HKDFBytesGenerator`, `KDF2BytesGenerator`.
pub fn kdf_node(name: &str) -> Option<Node> {
    let base = name
        .strip_suffix("BytesGenerator")
        .or_else(|| name.strip_suffix("Generator"))
        .unwrap_or(name);
    let base = match base {
        "SCrypt" => "scrypt",
        "PKCS5S2Parameters" => "PBKDF2",
        other => other,
    };
    known_node_of(base, NodeKind::KeyDerivationFunction)
        .map(|node| node.with_child(Node::marker(NodeKind::KeyDerivation)))
}
