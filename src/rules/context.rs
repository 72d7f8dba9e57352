use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The cryptographic role a matched call site fills. Selects the mapper used
/// during translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ContextTag {
    Cipher,
    SecretKey,
    PublicKey,
    PrivateKey,
    Key,
    KeyAgreement,
    Prng,
    Digest,
    Signature,
    Mac,
    AlgorithmParameter,
    Protocol,
    KeyDerivation,
    Kem,
}

impl ContextTag {
    pub const ALL: [ContextTag; 14] = [
        ContextTag::Cipher,
        ContextTag::SecretKey,
        ContextTag::PublicKey,
        ContextTag::PrivateKey,
        ContextTag::Key,
        ContextTag::KeyAgreement,
        ContextTag::Prng,
        ContextTag::Digest,
        ContextTag::Signature,
        ContextTag::Mac,
        ContextTag::AlgorithmParameter,
        ContextTag::Protocol,
        ContextTag::KeyDerivation,
        ContextTag::Kem,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Cipher => "Cipher",
            Self::SecretKey => "SecretKey",
            Self::PublicKey => "PublicKey",
            Self::PrivateKey => "PrivateKey",
            Self::Key => "Key",
            Self::KeyAgreement => "KeyAgreement",
            Self::Prng => "Prng",
            Self::Digest => "Digest",
            Self::Signature => "Signature",
            Self::Mac => "Mac",
            Self::AlgorithmParameter => "AlgorithmParameter",
            Self::Protocol => "Protocol",
            Self::KeyDerivation => "KeyDerivation",
            Self::Kem => "Kem",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tag| tag.name() == s)
    }

    /// Key contexts produce key nodes rather than primitives.
    pub fn is_key(&self) -> bool {
        matches!(
            self,
            Self::SecretKey | Self::PublicKey | Self::PrivateKey | Self::Key
        )
    }
}

impl fmt::Display for ContextTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A context tag with an optional qualifier, written `Tag` or
/// `Tag:Qualifier` (e.g. `SecretKey:DESede`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DetectionContext {
    pub tag: ContextTag,
    pub qualifier: Option<String>,
}

impl DetectionContext {
    pub fn new(tag: ContextTag) -> Self {
        Self {
            tag,
            qualifier: None,
        }
    }

    pub fn qualified(tag: ContextTag, qualifier: impl Into<String>) -> Self {
        Self {
            tag,
            qualifier: Some(qualifier.into()),
        }
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    /// Ranks contexts when two translated nodes compete for the same slot.
    /// Qualified contexts rank highest, then explicit parameter objects.
    pub fn specificity(&self) -> u8 {
        if self.qualifier.is_some() {
            2
        } else if self.tag == ContextTag::AlgorithmParameter {
            1
        } else {
            0
        }
    }
}

impl fmt::Display for DetectionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(q) => write!(f, "{}:{}", self.tag, q),
            None => write!(f, "{}", self.tag),
        }
    }
}

impl FromStr for DetectionContext {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (tag, qualifier) = match s.split_once(':') {
            Some((tag, qualifier)) => (tag.trim(), Some(qualifier.trim())),
            None => (s.trim(), None),
        };
        let tag = ContextTag::parse(tag).ok_or_else(|| format!("unknown detection context: {s}"))?;
        match qualifier {
            Some("") => Err(format!("empty qualifier in detection context: {s}")),
            Some(q) => Ok(Self::qualified(tag, q)),
            None => Ok(Self::new(tag)),
        }
    }
}

impl TryFrom<String> for DetectionContext {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DetectionContext> for String {
    fn from(value: DetectionContext) -> Self {
        value.to_string()
    }
}

/// Library family of a rule, handed to mappers that interpret the same
/// string differently per library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Bundle {
    Jca,
    Bc,
    Ssl,
    Pyca,
}

impl fmt::Display for Bundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Jca => "Jca",
            Self::Bc => "Bc",
            Self::Ssl => "Ssl",
            Self::Pyca => "Pyca",
        };
        f.write_str(name)
    }
}
