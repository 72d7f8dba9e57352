//! Translation of detection stores into semantic node trees.
//!
//! Each store maps its own values first. The nodes of its child stores are
//! then attached beneath the store's anchors: its own nodes, or failing
//! those the primitives its parameters named, or failing those the first
//! primitive a dependent rule produced. A store with no anchor passes all of
//! its nodes up to its parent unchanged.

use std::collections::BTreeMap;

use tracing::trace;

use crate::engine::store::{DetectionStore, Finding, StoreOrigin};
use crate::mapper::{MapperInput, MapperTable};
use crate::model::{Node, NodeKind};

/// A node together with the rank of the context it was translated in.
#[derive(Debug, Clone)]
struct Ranked {
    node: Node,
    specificity: u8,
}

pub struct Translator {
    mappers: MapperTable,
}

impl Translator {
    pub fn new(mappers: MapperTable) -> Self {
        Self { mappers }
    }

    pub fn standard() -> Self {
        Self::new(MapperTable::standard())
    }

    pub fn mappers(&self) -> &MapperTable {
        &self.mappers
    }

    pub fn translate_finding(&self, finding: &Finding) -> Vec<Node> {
        self.translate(&finding.store)
    }

    /// Root nodes for a store tree, in position order.
    pub fn translate(&self, store: &DetectionStore) -> Vec<Node> {
        let nodes: Vec<Node> = self
            .translate_store(store)
            .into_iter()
            .map(|ranked| ranked.node)
            .collect();
        trace!(
            rule = %store.rule_name,
            stores = store.store_count(),
            nodes = nodes.len(),
            "translated store"
        );
        nodes
    }

    fn translate_store(&self, store: &DetectionStore) -> Vec<Ranked> {
        let specificity = store.context.specificity();
        let own: Vec<Ranked> = store
            .values
            .iter()
            .filter_map(|value| {
                self.mappers
                    .map(&MapperInput::new(value, &store.context, store.bundle))
            })
            .map(|node| Ranked { node, specificity })
            .collect();

        let mut parameters = Vec::new();
        let mut dependents = Vec::new();
        for (_, child) in store.child_stores() {
            let translated = self.translate_store(child);
            match child.origin {
                StoreOrigin::Parameter => parameters.extend(translated),
                StoreOrigin::Call => dependents.extend(translated),
            }
        }

        let (mut anchors, rest) = if !own.is_empty() {
            parameters.extend(dependents);
            (own, parameters)
        } else if parameters.iter().any(is_parameter_anchor) {
            let (anchors, mut rest): (Vec<_>, Vec<_>) =
                parameters.into_iter().partition(is_parameter_anchor);
            rest.extend(dependents);
            (anchors, rest)
        } else if let Some(at) = dependents.iter().position(is_dependent_anchor) {
            let anchor = dependents.remove(at);
            parameters.extend(dependents);
            (vec![anchor], parameters)
        } else {
            parameters.extend(dependents);
            return parameters;
        };

        for anchor in &mut anchors {
            let mut ranks: BTreeMap<NodeKind, u8> = anchor
                .node
                .children
                .keys()
                .map(|kind| (*kind, anchor.specificity))
                .collect();
            for item in &rest {
                attach(&mut anchor.node, &mut ranks, item);
            }
        }
        anchors
    }
}

impl Default for Translator {
    fn default() -> Self {
        Self::standard()
    }
}

fn is_parameter_anchor(ranked: &Ranked) -> bool {
    ranked.node.kind.is_primitive() || ranked.node.kind.is_key()
}

fn is_dependent_anchor(ranked: &Ranked) -> bool {
    ranked.node.kind.is_primitive()
}

/// Attaches `item` under `node` unless a child of the same kind from an
/// equally or more specific context is already there.
fn attach(node: &mut Node, ranks: &mut BTreeMap<NodeKind, u8>, item: &Ranked) {
    let kind = item.node.kind;
    if ranks.get(&kind).is_some_and(|rank| *rank >= item.specificity) {
        return;
    }
    node.put_child(item.node.clone());
    ranks.insert(kind, item.specificity);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::value::{DetectionValue, ValueData};
    use crate::rules::{Bundle, ContextTag, DetectionContext, Position, RuleId};
    use crate::syntax::Location;
    use pretty_assertions::assert_eq;

    fn store(
        context: DetectionContext,
        bundle: Bundle,
        origin: StoreOrigin,
        values: Vec<ValueData>,
    ) -> DetectionStore {
        DetectionStore {
            rule: RuleId(0),
            rule_name: "test".into(),
            context,
            bundle: Some(bundle),
            origin,
            location: Location::new("A.java", 3, 1),
            values: values
                .into_iter()
                .map(|data| DetectionValue::new(data, Location::new("A.java", 3, 1)))
                .collect(),
            children: BTreeMap::new(),
        }
    }

    fn call(context: ContextTag, values: Vec<ValueData>) -> DetectionStore {
        store(DetectionContext::new(context), Bundle::Jca, StoreOrigin::Call, values)
    }

    fn parameter(context: ContextTag, value: ValueData) -> DetectionStore {
        store(DetectionContext::new(context), Bundle::Jca, StoreOrigin::Parameter, vec![value])
    }

    /// `Cipher.getInstance(t)` followed by
    /// `init(ENCRYPT_MODE, key, new GCMParameterSpec(128, iv))`.
    fn gcm_cipher() -> DetectionStore {
        let mut spec = call(ContextTag::AlgorithmParameter, vec![ValueData::Mode("GCM".into())]);
        spec.add_child(
            Position::Argument(0),
            parameter(ContextTag::AlgorithmParameter, ValueData::TagSize(128)),
        );
        spec.add_child(
            Position::Argument(1),
            parameter(ContextTag::AlgorithmParameter, ValueData::InitializationVectorSize(96)),
        );

        let mut init = call(ContextTag::Cipher, Vec::new());
        init.add_child(
            Position::Argument(0),
            parameter(ContextTag::Cipher, ValueData::OperationMode(1)),
        );
        init.add_child(Position::Argument(2), spec);

        let mut cipher = call(ContextTag::Cipher, Vec::new());
        cipher.add_child(
            Position::Argument(0),
            parameter(ContextTag::Cipher, ValueData::Algorithm("AES/GCM/NoPadding".into())),
        );
        cipher.add_child(Position::Usage, init);
        cipher
    }

    #[test]
    fn test_parameter_primitive_anchors_dependents() {
        let nodes = Translator::standard().translate(&gcm_cipher());

        assert_eq!(nodes.len(), 1);
        let aes = &nodes[0];
        assert_eq!((aes.kind, aes.name.as_str()), (NodeKind::BlockCipher, "AES"));
        assert!(aes.has_child(NodeKind::Encrypt));
        let mode = aes.child(NodeKind::Mode).unwrap();
        assert_eq!(mode.child(NodeKind::TagLength).unwrap().name, "128");
        assert_eq!(mode.child(NodeKind::IvLength).unwrap().name, "96");
    }

    #[test]
    fn test_store_without_anchor_bubbles_up() {
        let mut params = call(ContextTag::AlgorithmParameter, Vec::new());
        params.add_child(
            Position::Argument(1),
            parameter(ContextTag::AlgorithmParameter, ValueData::MacSize(64)),
        );

        let nodes = Translator::standard().translate(&params);
        assert_eq!(nodes.len(), 1);
        assert_eq!((nodes[0].kind, nodes[0].name.as_str()), (NodeKind::TagLength, "64"));
    }

    #[test]
    fn test_more_specific_context_wins_collision() {
        let mut key = call(ContextTag::SecretKey, vec![ValueData::Algorithm("AES_128".into())]);
        let mut spec = call(ContextTag::AlgorithmParameter, Vec::new());
        spec.add_child(
            Position::Argument(0),
            parameter(ContextTag::AlgorithmParameter, ValueData::KeySize(256)),
        );
        let plain = parameter(ContextTag::SecretKey, ValueData::KeySize(192));
        key.add_child(Position::Argument(0), plain);
        key.add_child(Position::Argument(1), spec);

        let nodes = Translator::standard().translate(&key);
        assert_eq!(nodes[0].child(NodeKind::KeyLength).unwrap().name, "256");
    }

    #[test]
    fn test_equal_specificity_keeps_first() {
        let mut key = call(ContextTag::SecretKey, vec![ValueData::Algorithm("AES".into())]);
        key.add_child(
            Position::Argument(0),
            parameter(ContextTag::SecretKey, ValueData::KeySize(128)),
        );
        key.add_child(
            Position::Argument(1),
            parameter(ContextTag::SecretKey, ValueData::KeySize(256)),
        );

        let nodes = Translator::standard().translate(&key);
        assert_eq!(nodes[0].child(NodeKind::KeyLength).unwrap().name, "128");
    }

    #[test]
    fn test_each_reaching_definition_is_an_anchor() {
        let mut cipher = call(ContextTag::Cipher, Vec::new());
        for name in ["AES/CBC/PKCS5Padding", "DES/CBC/PKCS5Padding"] {
            cipher.add_child(
                Position::Argument(0),
                parameter(ContextTag::Cipher, ValueData::Algorithm(name.into())),
            );
        }
        let mut init = call(ContextTag::Cipher, Vec::new());
        init.add_child(
            Position::Argument(0),
            parameter(ContextTag::Cipher, ValueData::OperationMode(2)),
        );
        cipher.add_child(Position::Usage, init);

        let nodes = Translator::standard().translate(&cipher);
        let names: Vec<&str> = nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["AES", "DES"]);
        assert!(nodes.iter().all(|n| n.has_child(NodeKind::Decrypt)));
    }

    #[test]
    fn test_translation_is_deterministic() {
        let translator = Translator::standard();
        let store = gcm_cipher();
        assert_eq!(translator.translate(&store), translator.translate(&store));
    }
}
