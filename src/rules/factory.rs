//! Extraction directives attached to rules and parameters.

use serde::{Deserialize, Serialize};

use crate::engine::value::{KeyAction, SignatureAction, ValueTag};

/// Unit of an integer size argument. Array arguments always count bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeUnit {
    #[default]
    Bit,
    Byte,
}

impl SizeUnit {
    pub fn bits(&self) -> u32 {
        match self {
            Self::Bit => 1,
            Self::Byte => 8,
        }
    }
}

/// How a value is produced from a call site or from one of its arguments.
///
/// In YAML a factory is written as a map tagged by `kind`, e.g.
/// `{ kind: key_size, unit: byte }` or `{ kind: fixed, value_kind: Mode, value: GCM }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValueFactory {
    /// A constant value, independent of the source.
    Fixed { value_kind: ValueTag, value: String },
    /// String literal naming an algorithm or transformation.
    Algorithm,
    Mode,
    Padding,
    Curve,
    /// Raw literal text, interpreted later by the mapper.
    ValueAction,
    /// Integer or boolean selecting encryption, decryption, wrapping.
    OperationMode,
    KeySize {
        #[serde(default)]
        unit: SizeUnit,
    },
    MacSize {
        #[serde(default)]
        unit: SizeUnit,
    },
    TagSize {
        #[serde(default)]
        unit: SizeUnit,
    },
    IvSize {
        #[serde(default)]
        unit: SizeUnit,
    },
    SaltSize {
        #[serde(default)]
        unit: SizeUnit,
    },
    Iterations,
    /// Simple name of the invoked type, or of the argument's static type.
    TypeName { value_kind: ValueTag },
    /// Name of a referenced constant, e.g. `SHA256` in `MGF1ParameterSpec.SHA256`.
    EnumName { value_kind: ValueTag },
    KeyAction { action: KeyAction },
    SignatureAction { action: SignatureAction },
}

impl ValueFactory {
    pub fn fixed(value_kind: ValueTag, value: impl Into<String>) -> Self {
        Self::Fixed {
            value_kind,
            value: value.into(),
        }
    }

    /// Tag of the values this factory produces.
    pub fn produces(&self) -> ValueTag {
        match self {
            Self::Fixed { value_kind, .. }
            | Self::TypeName { value_kind }
            | Self::EnumName { value_kind } => *value_kind,
            Self::Algorithm => ValueTag::Algorithm,
            Self::Mode => ValueTag::Mode,
            Self::Padding => ValueTag::Padding,
            Self::Curve => ValueTag::Curve,
            Self::ValueAction => ValueTag::ValueAction,
            Self::OperationMode => ValueTag::OperationMode,
            Self::KeySize { .. } => ValueTag::KeySize,
            Self::MacSize { .. } => ValueTag::MacSize,
            Self::TagSize { .. } => ValueTag::TagSize,
            Self::IvSize { .. } => ValueTag::InitializationVectorSize,
            Self::SaltSize { .. } => ValueTag::SaltSize,
            Self::Iterations => ValueTag::NumberOfIterations,
            Self::KeyAction { .. } => ValueTag::KeyAction,
            Self::SignatureAction { .. } => ValueTag::SignatureAction,
        }
    }

    /// Whether the factory reads an argument expression rather than the
    /// call itself.
    pub fn reads_expression(&self) -> bool {
        !matches!(
            self,
            Self::Fixed { .. } | Self::KeyAction { .. } | Self::SignatureAction { .. }
        )
    }
}
