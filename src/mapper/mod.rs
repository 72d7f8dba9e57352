//! Mapping of raw detection values to semantic nodes.
//!
//! Each value found at a store is dispatched through a [`MapperTable`] keyed by
//! the store's context tag and the value's tag, falling back to an entry for
//! any context. Mappers are plain functions; the table itself is immutable
//! once built and shared between scan threads.

pub mod algorithms;
pub mod bc;
pub mod common;
pub mod jca;
pub mod pyca;

use std::collections::HashMap;

use crate::engine::value::{DetectionValue, ValueTag};
use crate::model::{Node, NodeKind};
use crate::rules::{Bundle, ContextTag, DetectionContext};

/// Everything a mapper may look at.
#[derive(Debug, Clone, Copy)]
pub struct MapperInput<'v> {
    pub value: &'v DetectionValue,
    pub context: &'v DetectionContext,
    pub bundle: Option<Bundle>,
}

impl<'v> MapperInput<'v> {
    pub fn new(
        value: &'v DetectionValue,
        context: &'v DetectionContext,
        bundle: Option<Bundle>,
    ) -> Self {
        Self {
            value,
            context,
            bundle,
        }
    }

    pub fn text(&self) -> String {
        self.value.as_string()
    }
}

pub type MapperFn = fn(&MapperInput<'_>) -> Option<Node>;

pub struct MapperTable {
    entries: HashMap<(Option<ContextTag>, ValueTag), MapperFn>,
}

impl MapperTable {
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Table with the mappers for every supported bundle.
    pub fn standard() -> Self {
        let mut table = Self::empty();
        table.register(None, ValueTag::Algorithm, algorithm);
        table.register(None, ValueTag::EnumReference, algorithm);
        table.register(Some(ContextTag::Digest), ValueTag::Algorithm, common::digest);
        table.register(Some(ContextTag::Kem), ValueTag::Algorithm, jca::kem);
        table.register(None, ValueTag::Mode, common::mode);
        table.register(None, ValueTag::Padding, common::padding);
        table.register(None, ValueTag::Curve, common::curve);
        table.register(None, ValueTag::OperationMode, common::operation_mode);
        table.register(None, ValueTag::KeySize, common::key_length);
        table.register(None, ValueTag::TagSize, common::tag_length);
        table.register(None, ValueTag::MacSize, common::tag_length);
        table.register(None, ValueTag::InitializationVectorSize, common::iv_length);
        table.register(None, ValueTag::SaltSize, common::salt_length);
        table.register(None, ValueTag::NumberOfIterations, common::iterations);
        table.register(None, ValueTag::ValueAction, common::value_action);
        table.register(None, ValueTag::KeyAction, common::key_action);
        table.register(None, ValueTag::SignatureAction, common::signature_action);
        table
    }

    /// Registers `mapper` for values of kind `tag` found in `context`, or in
    /// any context when `context` is `None`.
    pub fn register(&mut self, context: Option<ContextTag>, tag: ValueTag, mapper: MapperFn) {
        self.entries.insert((context, tag), mapper);
    }

    pub fn lookup(&self, context: ContextTag, tag: ValueTag) -> Option<MapperFn> {
        self.entries
            .get(&(Some(context), tag))
            .or_else(|| self.entries.get(&(None, tag)))
            .copied()
    }

    /// Maps one value. The produced tree is located at the value's source
    /// position.
    pub fn map(&self, input: &MapperInput<'_>) -> Option<Node> {
        let mapper = self.lookup(input.context.tag, input.value.tag())?;
        let mut node = mapper(input)?;
        node.locate(&input.value.location);
        Some(node)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MapperTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Algorithm names, dispatched on the bundle that produced them.
pub fn algorithm(input: &MapperInput<'_>) -> Option<Node> {
    match input.bundle {
        Some(Bundle::Bc) => bc::algorithm(input),
        Some(Bundle::Pyca) => pyca::algorithm(input),
        Some(Bundle::Jca) | Some(Bundle::Ssl) | None => jca::algorithm(input),
    }
}

/// Kind of the node produced for a value nothing more specific is known
/// about. A qualifier that names a kind wins over the context tag.
pub fn default_kind(context: &DetectionContext) -> NodeKind {
    if let Some(kind) = context.qualifier().and_then(NodeKind::parse) {
        return kind;
    }
    match context.tag {
        ContextTag::Cipher | ContextTag::AlgorithmParameter => NodeKind::Algorithm,
        ContextTag::SecretKey => NodeKind::SecretKey,
        ContextTag::PublicKey => NodeKind::PublicKey,
        ContextTag::PrivateKey => NodeKind::PrivateKey,
        ContextTag::Key => NodeKind::Key,
        ContextTag::KeyAgreement => NodeKind::KeyAgreement,
        ContextTag::Prng => NodeKind::PseudorandomNumberGenerator,
        ContextTag::Digest => NodeKind::MessageDigest,
        ContextTag::Signature => NodeKind::Signature,
        ContextTag::Mac => NodeKind::Mac,
        ContextTag::Protocol => NodeKind::Protocol,
        ContextTag::KeyDerivation => NodeKind::KeyDerivationFunction,
        ContextTag::Kem => NodeKind::KeyEncapsulationMechanism,
    }
}

/// Generic node for an unrecognised name, keeping the raw text in an
/// `Unknown` child.
pub fn unknown(input: &MapperInput<'_>) -> Option<Node> {
    let text = input.text();
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(Node::new(default_kind(input.context), text).with_child(Node::unknown(text)))
}
