//! Semantic crypto asset trees produced by translation.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::syntax::Location;

/// What a [`Node`] describes. Each node carries exactly one kind; additional
/// roles an algorithm can play are recorded as capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum NodeKind {
    // primitives
    Algorithm,
    BlockCipher,
    StreamCipher,
    AuthenticatedEncryption,
    PublicKeyEncryption,
    Signature,
    MessageDigest,
    Mac,
    KeyDerivationFunction,
    PasswordBasedEncryption,
    KeyAgreement,
    KeyEncapsulationMechanism,
    PseudorandomNumberGenerator,
    Protocol,
    // keys
    Key,
    SecretKey,
    PublicKey,
    PrivateKey,
    // properties
    Mode,
    Padding,
    KeyLength,
    TagLength,
    IvLength,
    BlockSize,
    DigestSize,
    SaltLength,
    NumberOfIterations,
    EllipticCurve,
    Oid,
    ParameterSetIdentifier,
    // functionality markers
    Encrypt,
    Decrypt,
    Sign,
    Verify,
    Digest,
    Tag,
    KeyGeneration,
    KeyDerivation,
    Wrap,
    Unwrap,
    Encapsulate,
    Decapsulate,
    Generate,
    Unknown,
}

impl NodeKind {
    pub const ALL: [NodeKind; 44] = [
        NodeKind::Algorithm,
        NodeKind::BlockCipher,
        NodeKind::StreamCipher,
        NodeKind::AuthenticatedEncryption,
        NodeKind::PublicKeyEncryption,
        NodeKind::Signature,
        NodeKind::MessageDigest,
        NodeKind::Mac,
        NodeKind::KeyDerivationFunction,
        NodeKind::PasswordBasedEncryption,
        NodeKind::KeyAgreement,
        NodeKind::KeyEncapsulationMechanism,
        NodeKind::PseudorandomNumberGenerator,
        NodeKind::Protocol,
        NodeKind::Key,
        NodeKind::SecretKey,
        NodeKind::PublicKey,
        NodeKind::PrivateKey,
        NodeKind::Mode,
        NodeKind::Padding,
        NodeKind::KeyLength,
        NodeKind::TagLength,
        NodeKind::IvLength,
        NodeKind::BlockSize,
        NodeKind::DigestSize,
        NodeKind::SaltLength,
        NodeKind::NumberOfIterations,
        NodeKind::EllipticCurve,
        NodeKind::Oid,
        NodeKind::ParameterSetIdentifier,
        NodeKind::Encrypt,
        NodeKind::Decrypt,
        NodeKind::Sign,
        NodeKind::Verify,
        NodeKind::Digest,
        NodeKind::Tag,
        NodeKind::KeyGeneration,
        NodeKind::KeyDerivation,
        NodeKind::Wrap,
        NodeKind::Unwrap,
        NodeKind::Encapsulate,
        NodeKind::Decapsulate,
        NodeKind::Generate,
        NodeKind::Unknown,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Algorithm => "Algorithm",
            Self::BlockCipher => "BlockCipher",
            Self::StreamCipher => "StreamCipher",
            Self::AuthenticatedEncryption => "AuthenticatedEncryption",
            Self::PublicKeyEncryption => "PublicKeyEncryption",
            Self::Signature => "Signature",
            Self::MessageDigest => "MessageDigest",
            Self::Mac => "Mac",
            Self::KeyDerivationFunction => "KeyDerivationFunction",
            Self::PasswordBasedEncryption => "PasswordBasedEncryption",
            Self::KeyAgreement => "KeyAgreement",
            Self::KeyEncapsulationMechanism => "KeyEncapsulationMechanism",
            Self::PseudorandomNumberGenerator => "PseudorandomNumberGenerator",
            Self::Protocol => "Protocol",
            Self::Key => "Key",
            Self::SecretKey => "SecretKey",
            Self::PublicKey => "PublicKey",
            Self::PrivateKey => "PrivateKey",
            Self::Mode => "Mode",
            Self::Padding => "Padding",
            Self::KeyLength => "KeyLength",
            Self::TagLength => "TagLength",
            Self::IvLength => "IvLength",
            Self::BlockSize => "BlockSize",
            Self::DigestSize => "DigestSize",
            Self::SaltLength => "SaltLength",
            Self::NumberOfIterations => "NumberOfIterations",
            Self::EllipticCurve => "EllipticCurve",
            Self::Oid => "Oid",
            Self::ParameterSetIdentifier => "ParameterSetIdentifier",
            Self::Encrypt => "Encrypt",
            Self::Decrypt => "Decrypt",
            Self::Sign => "Sign",
            Self::Verify => "Verify",
            Self::Digest => "Digest",
            Self::Tag => "Tag",
            Self::KeyGeneration => "KeyGeneration",
            Self::KeyDerivation => "KeyDerivation",
            Self::Wrap => "Wrap",
            Self::Unwrap => "Unwrap",
            Self::Encapsulate => "Encapsulate",
            Self::Decapsulate => "Decapsulate",
            Self::Generate => "Generate",
            Self::Unknown => "Unknown",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == s)
    }

    pub fn is_primitive(&self) -> bool {
        (*self as u8) <= (Self::Protocol as u8)
    }

    pub fn is_key(&self) -> bool {
        matches!(
            self,
            Self::Key | Self::SecretKey | Self::PublicKey | Self::PrivateKey
        )
    }

    pub fn is_property(&self) -> bool {
        (Self::Mode as u8..=Self::ParameterSetIdentifier as u8).contains(&(*self as u8))
    }

    pub fn is_functionality(&self) -> bool {
        (Self::Encrypt as u8..=Self::Generate as u8).contains(&(*self as u8))
    }

    /// Rendering of functionality markers, e.g. `ENCRYPT`.
    pub fn marker_name(&self) -> String {
        self.name().to_uppercase()
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One asset or property in a translated tree. Children are keyed by kind,
/// so a node holds at most one child of each kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    pub kind: NodeKind,
    pub name: String,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub capabilities: BTreeSet<NodeKind>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub children: BTreeMap<NodeKind, Node>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl Node {
    pub fn new(kind: NodeKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            capabilities: BTreeSet::new(),
            children: BTreeMap::new(),
            location: None,
        }
    }

    /// A functionality marker such as `ENCRYPT`.
    pub fn marker(kind: NodeKind) -> Self {
        Self::new(kind, kind.marker_name())
    }

    pub fn unknown(text: impl Into<String>) -> Self {
        Self::new(NodeKind::Unknown, text)
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.put_child(child);
        self
    }

    pub fn with_capability(mut self, kind: NodeKind) -> Self {
        self.capabilities.insert(kind);
        self
    }

    pub fn child(&self, kind: NodeKind) -> Option<&Node> {
        self.children.get(&kind)
    }

    pub fn child_mut(&mut self, kind: NodeKind) -> Option<&mut Node> {
        self.children.get_mut(&kind)
    }

    pub fn has_child(&self, kind: NodeKind) -> bool {
        self.children.contains_key(&kind)
    }

    /// Inserts `child`, returning the node it replaced.
    pub fn put_child(&mut self, child: Node) -> Option<Node> {
        self.children.insert(child.kind, child)
    }

    /// Inserts `child` only if no child of its kind exists.
    pub fn put_child_if_absent(&mut self, child: Node) -> bool {
        if self.has_child(child.kind) {
            return false;
        }
        self.put_child(child);
        true
    }

    pub fn remove_child(&mut self, kind: NodeKind) -> Option<Node> {
        self.children.remove(&kind)
    }

    pub fn has_capability(&self, kind: NodeKind) -> bool {
        self.kind == kind || self.capabilities.contains(&kind)
    }

    /// Sets `location` on this node and every descendant that has none.
    pub fn locate(&mut self, location: &Location) {
        if self.location.is_none() {
            self.location = Some(location.clone());
        }
        for child in self.children.values_mut() {
            child.locate(location);
        }
    }

    pub fn node_count(&self) -> usize {
        1 + self.children.values().map(Node::node_count).sum::<usize>()
    }

    /// Indented `(Kind) name` rendering of the whole tree.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        out.push_str(&"  ".repeat(depth));
        out.push_str(&format!("({}) {}\n", self.kind, self.name));
        for child in self.children.values() {
            child.render_into(out, depth + 1);
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_kind_categories() {
        assert!(NodeKind::BlockCipher.is_primitive());
        assert!(NodeKind::Protocol.is_primitive());
        assert!(!NodeKind::SecretKey.is_primitive());
        assert!(NodeKind::SecretKey.is_key());
        assert!(NodeKind::TagLength.is_property());
        assert!(!NodeKind::Encrypt.is_property());
        assert!(NodeKind::KeyDerivation.is_functionality());
        assert!(!NodeKind::Unknown.is_functionality());
    }

    #[test]
    fn test_kind_names_round_trip() {
        for kind in NodeKind::ALL {
            assert_eq!(NodeKind::parse(kind.name()), Some(kind));
        }
        assert_eq!(NodeKind::KeyDerivation.marker_name(), "KEYDERIVATION");
    }

    #[test]
    fn test_one_child_per_kind() {
        let mut node = Node::new(NodeKind::BlockCipher, "AES")
            .with_child(Node::new(NodeKind::KeyLength, "128"));
        let replaced = node.put_child(Node::new(NodeKind::KeyLength, "256"));

        assert_eq!(replaced.unwrap().name, "128");
        assert_eq!(node.child(NodeKind::KeyLength).unwrap().name, "256");
        assert!(!node.put_child_if_absent(Node::new(NodeKind::KeyLength, "512")));
        assert_eq!(node.children.len(), 1);
    }

    #[test]
    fn test_capabilities() {
        let sm4 = Node::new(NodeKind::BlockCipher, "SM4")
            .with_capability(NodeKind::Mac)
            .with_capability(NodeKind::AuthenticatedEncryption);

        assert!(sm4.has_capability(NodeKind::BlockCipher));
        assert!(sm4.has_capability(NodeKind::Mac));
        assert!(!sm4.has_capability(NodeKind::Signature));
    }

    #[test]
    fn test_locate_fills_missing_locations() {
        let inner = Location::new("A.java", 3, 5);
        let mut child = Node::new(NodeKind::Mode, "GCM");
        child.location = Some(inner.clone());
        let mut node = Node::new(NodeKind::BlockCipher, "AES")
            .with_child(child)
            .with_child(Node::marker(NodeKind::Encrypt));
        node.locate(&Location::new("A.java", 9, 1));

        assert_eq!(node.location.as_ref().unwrap().line, 9);
        assert_eq!(node.child(NodeKind::Mode).unwrap().location, Some(inner));
        assert_eq!(node.child(NodeKind::Encrypt).unwrap().location.as_ref().unwrap().line, 9);
    }

    #[test]
    fn test_render_and_json() {
        let node = Node::new(NodeKind::AuthenticatedEncryption, "AES-CCM")
            .with_child(Node::new(NodeKind::TagLength, "128"))
            .with_child(Node::marker(NodeKind::Encrypt));

        assert_eq!(
            node.render(),
            "(AuthenticatedEncryption) AES-CCM\n  (TagLength) 128\n  (Encrypt) ENCRYPT\n"
        );
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["kind"], "AuthenticatedEncryption");
        assert_eq!(json["children"]["TagLength"]["name"], "128");
        assert!(json.get("location").is_none());
    }
}
