//! Typed values extracted from matched call sites.
//!
//! Sizes are normalized to bits when they are extracted, so `KeySize(256)`
//! always means a 256-bit key regardless of whether the source counted bytes.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::syntax::Location;

/// Discriminant of [`ValueData`], used as half of the mapper dispatch key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValueTag {
    Algorithm,
    Mode,
    Padding,
    Curve,
    OperationMode,
    KeySize,
    MacSize,
    TagSize,
    InitializationVectorSize,
    SaltSize,
    NumberOfIterations,
    ValueAction,
    KeyAction,
    SignatureAction,
    EnumReference,
}

impl ValueTag {
    pub fn is_size(&self) -> bool {
        matches!(
            self,
            Self::KeySize
                | Self::MacSize
                | Self::TagSize
                | Self::InitializationVectorSize
                | Self::SaltSize
        )
    }
}

impl fmt::Display for ValueTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyAction {
    Generate,
    Derive,
    Wrap,
    Unwrap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureAction {
    Sign,
    Verify,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueData {
    Algorithm(String),
    Mode(String),
    Padding(String),
    Curve(String),
    /// Raw operation-mode constant; booleans are stored as 1 (true) and 0.
    OperationMode(i64),
    KeySize(u32),
    MacSize(u32),
    TagSize(u32),
    InitializationVectorSize(u32),
    SaltSize(u32),
    NumberOfIterations(i64),
    ValueAction(String),
    KeyAction(KeyAction),
    SignatureAction(SignatureAction),
    EnumReference(String),
}

impl ValueData {
    pub fn tag(&self) -> ValueTag {
        match self {
            Self::Algorithm(_) => ValueTag::Algorithm,
            Self::Mode(_) => ValueTag::Mode,
            Self::Padding(_) => ValueTag::Padding,
            Self::Curve(_) => ValueTag::Curve,
            Self::OperationMode(_) => ValueTag::OperationMode,
            Self::KeySize(_) => ValueTag::KeySize,
            Self::MacSize(_) => ValueTag::MacSize,
            Self::TagSize(_) => ValueTag::TagSize,
            Self::InitializationVectorSize(_) => ValueTag::InitializationVectorSize,
            Self::SaltSize(_) => ValueTag::SaltSize,
            Self::NumberOfIterations(_) => ValueTag::NumberOfIterations,
            Self::ValueAction(_) => ValueTag::ValueAction,
            Self::KeyAction(_) => ValueTag::KeyAction,
            Self::SignatureAction(_) => ValueTag::SignatureAction,
            Self::EnumReference(_) => ValueTag::EnumReference,
        }
    }

    /// Builds a value of kind `tag` from text. Numeric kinds require the text
    /// to parse as an integer; size kinds take it as a bit count.
    pub fn from_text(tag: ValueTag, text: &str) -> Option<Self> {
        let text = text.trim();
        let bits = || text.parse::<u32>().ok();
        let int = || text.parse::<i64>().ok();
        Some(match tag {
            ValueTag::Algorithm => Self::Algorithm(text.to_string()),
            ValueTag::Mode => Self::Mode(text.to_string()),
            ValueTag::Padding => Self::Padding(text.to_string()),
            ValueTag::Curve => Self::Curve(text.to_string()),
            ValueTag::ValueAction => Self::ValueAction(text.to_string()),
            ValueTag::EnumReference => Self::EnumReference(text.to_string()),
            ValueTag::OperationMode => Self::OperationMode(int()?),
            ValueTag::NumberOfIterations => Self::NumberOfIterations(int()?),
            ValueTag::KeySize => Self::KeySize(bits()?),
            ValueTag::MacSize => Self::MacSize(bits()?),
            ValueTag::TagSize => Self::TagSize(bits()?),
            ValueTag::InitializationVectorSize => Self::InitializationVectorSize(bits()?),
            ValueTag::SaltSize => Self::SaltSize(bits()?),
            ValueTag::KeyAction => Self::KeyAction(match text.to_lowercase().as_str() {
                "generate" => KeyAction::Generate,
                "derive" => KeyAction::Derive,
                "wrap" => KeyAction::Wrap,
                "unwrap" => KeyAction::Unwrap,
                _ => return None,
            }),
            ValueTag::SignatureAction => Self::SignatureAction(match text.to_lowercase().as_str() {
                "sign" => SignatureAction::Sign,
                "verify" => SignatureAction::Verify,
                _ => return None,
            }),
        })
    }

    /// Builds a size value of kind `tag` from a bit count.
    pub fn size(tag: ValueTag, bits: u32) -> Option<Self> {
        Some(match tag {
            ValueTag::KeySize => Self::KeySize(bits),
            ValueTag::MacSize => Self::MacSize(bits),
            ValueTag::TagSize => Self::TagSize(bits),
            ValueTag::InitializationVectorSize => Self::InitializationVectorSize(bits),
            ValueTag::SaltSize => Self::SaltSize(bits),
            _ => return None,
        })
    }
}

/// A value found at a call site, together with where it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionValue {
    pub data: ValueData,
    pub location: Location,
}

impl DetectionValue {
    pub fn new(data: ValueData, location: Location) -> Self {
        Self { data, location }
    }

    pub fn tag(&self) -> ValueTag {
        self.data.tag()
    }

    pub fn as_string(&self) -> String {
        match &self.data {
            ValueData::Algorithm(s)
            | ValueData::Mode(s)
            | ValueData::Padding(s)
            | ValueData::Curve(s)
            | ValueData::ValueAction(s)
            | ValueData::EnumReference(s) => s.clone(),
            ValueData::OperationMode(n) | ValueData::NumberOfIterations(n) => n.to_string(),
            ValueData::KeySize(b)
            | ValueData::MacSize(b)
            | ValueData::TagSize(b)
            | ValueData::InitializationVectorSize(b)
            | ValueData::SaltSize(b) => b.to_string(),
            ValueData::KeyAction(action) => format!("{action:?}").to_uppercase(),
            ValueData::SignatureAction(action) => format!("{action:?}").to_uppercase(),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match &self.data {
            ValueData::OperationMode(n) | ValueData::NumberOfIterations(n) => Some(*n),
            ValueData::KeySize(b)
            | ValueData::MacSize(b)
            | ValueData::TagSize(b)
            | ValueData::InitializationVectorSize(b)
            | ValueData::SaltSize(b) => Some(i64::from(*b)),
            _ => None,
        }
    }
}

impl fmt::Display for DetectionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.tag(), self.as_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location() -> Location {
        Location::new("Test.java", 3, 5)
    }

    #[test]
    fn test_from_text_parses_numeric_kinds() {
        assert_eq!(
            ValueData::from_text(ValueTag::TagSize, "128"),
            Some(ValueData::TagSize(128))
        );
        assert_eq!(ValueData::from_text(ValueTag::KeySize, "large"), None);
        assert_eq!(
            ValueData::from_text(ValueTag::OperationMode, "-1"),
            Some(ValueData::OperationMode(-1))
        );
    }

    #[test]
    fn test_from_text_actions() {
        assert_eq!(
            ValueData::from_text(ValueTag::KeyAction, "Generate"),
            Some(ValueData::KeyAction(KeyAction::Generate))
        );
        assert_eq!(
            ValueData::from_text(ValueTag::SignatureAction, "verify"),
            Some(ValueData::SignatureAction(SignatureAction::Verify))
        );
        assert_eq!(ValueData::from_text(ValueTag::SignatureAction, "seal"), None);
    }

    #[test]
    fn test_as_string_renders_payload() {
        let mode = DetectionValue::new(ValueData::Mode("GCM".into()), location());
        let iv = DetectionValue::new(ValueData::InitializationVectorSize(96), location());
        let action = DetectionValue::new(ValueData::KeyAction(KeyAction::Derive), location());

        assert_eq!(mode.as_string(), "GCM");
        assert_eq!(iv.as_string(), "96");
        assert_eq!(action.as_string(), "DERIVE");
        assert_eq!(iv.to_string(), "InitializationVectorSize(96)");
    }

    #[test]
    fn test_size_constructor_rejects_non_size_tags() {
        assert_eq!(ValueData::size(ValueTag::MacSize, 64), Some(ValueData::MacSize(64)));
        assert_eq!(ValueData::size(ValueTag::Algorithm, 64), None);
        assert!(ValueTag::SaltSize.is_size());
        assert!(!ValueTag::NumberOfIterations.is_size());
    }

    #[test]
    fn test_as_int() {
        let size = DetectionValue::new(ValueData::KeySize(192), location());
        let name = DetectionValue::new(ValueData::Algorithm("AES".into()), location());
        assert_eq!(size.as_int(), Some(192));
        assert_eq!(name.as_int(), None);
    }
}
