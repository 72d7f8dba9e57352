//! Turning call sites and argument expressions into [`DetectionValue`]s.

use tree_sitter::Node;

use super::resolve::Resolver;
use super::value::{DetectionValue, ValueData};
use crate::error::EngineError;
use crate::rules::ValueFactory;
use crate::syntax::{Invocation, InvocationKind, Literal};

/// Values a call-level directive produces for `invocation`.
pub(crate) fn extract_call<'a>(
    factory: &ValueFactory,
    invocation: &Invocation<'a>,
    resolver: &Resolver<'_, 'a>,
) -> Vec<DetectionValue> {
    let unit = resolver.unit();
    let location = unit.location(&invocation.node);
    let data = match factory {
        ValueFactory::TypeName { value_kind } => {
            let invoked = resolver.support().invoked_type(invocation, unit);
            let name = match (&invoked, invocation.kind) {
                (Some(ty), _) => ty.simple_name().to_string(),
                (None, InvocationKind::Constructor) => invocation.name.clone(),
                (None, _) => return Vec::new(),
            };
            ValueData::from_text(*value_kind, &name)
        }
        ValueFactory::EnumName { value_kind } => {
            if invocation.kind != InvocationKind::EnumReference {
                return Vec::new();
            }
            ValueData::from_text(*value_kind, &invocation.name)
        }
        other => fixed_data(other),
    };
    data.map(|d| DetectionValue::new(d, location))
        .into_iter()
        .collect()
}

/// Values a parameter directive produces for one argument expression, one per
/// reaching definition that yields something.
pub(crate) fn extract_argument<'a>(
    factory: &ValueFactory,
    argument: Node<'a>,
    resolver: &Resolver<'_, 'a>,
    depth: usize,
) -> Result<Vec<DetectionValue>, EngineError> {
    let unit = resolver.unit();
    let support = resolver.support();

    if !factory.reads_expression() {
        let location = unit.location(&argument);
        return Ok(fixed_data(factory)
            .map(|d| DetectionValue::new(d, location))
            .into_iter()
            .collect());
    }

    let mut values = Vec::new();
    match factory {
        ValueFactory::Algorithm
        | ValueFactory::Mode
        | ValueFactory::Padding
        | ValueFactory::Curve
        | ValueFactory::ValueAction
        | ValueFactory::OperationMode
        | ValueFactory::Iterations => {
            for (literal, origin) in resolver.literals(argument, depth)? {
                if let Some(data) = literal_data(factory, &literal) {
                    values.push(DetectionValue::new(data, unit.location(&origin)));
                }
            }
        }
        ValueFactory::KeySize { unit: size_unit }
        | ValueFactory::MacSize { unit: size_unit }
        | ValueFactory::TagSize { unit: size_unit }
        | ValueFactory::IvSize { unit: size_unit }
        | ValueFactory::SaltSize { unit: size_unit } => {
            let tag = factory.produces();
            for (literal, origin) in resolver.literals(argument, depth)? {
                let Literal::Int(n) = literal else { continue };
                let bits = u32::try_from(n)
                    .ok()
                    .and_then(|n| n.checked_mul(size_unit.bits()));
                if let Some(data) = bits.and_then(|b| ValueData::size(tag, b)) {
                    values.push(DetectionValue::new(data, unit.location(&origin)));
                }
            }
            if values.is_empty() {
                for (length, origin) in resolver.lengths(argument, depth)? {
                    let bits = u32::try_from(length).ok().and_then(|n| n.checked_mul(8));
                    if let Some(data) = bits.and_then(|b| ValueData::size(tag, b)) {
                        values.push(DetectionValue::new(data, unit.location(&origin)));
                    }
                }
            }
        }
        ValueFactory::TypeName { value_kind } => {
            for definition in resolver.definitions(argument, depth)? {
                let Some(ty) = support.expression_type(definition, unit) else {
                    continue;
                };
                if let Some(data) = ValueData::from_text(*value_kind, ty.simple_name()) {
                    values.push(DetectionValue::new(data, unit.location(&definition)));
                }
            }
        }
        ValueFactory::EnumName { value_kind } => {
            for definition in resolver.definitions(argument, depth)? {
                let Some(invocation) = support.invocation(definition, unit)? else {
                    continue;
                };
                if invocation.kind != InvocationKind::EnumReference {
                    continue;
                }
                if let Some(data) = ValueData::from_text(*value_kind, &invocation.name) {
                    values.push(DetectionValue::new(data, unit.location(&definition)));
                }
            }
        }
        ValueFactory::Fixed { .. }
        | ValueFactory::KeyAction { .. }
        | ValueFactory::SignatureAction { .. } => {}
    }
    Ok(values)
}

fn fixed_data(factory: &ValueFactory) -> Option<ValueData> {
    match factory {
        ValueFactory::Fixed { value_kind, value } => ValueData::from_text(*value_kind, value),
        ValueFactory::KeyAction { action } => Some(ValueData::KeyAction(*action)),
        ValueFactory::SignatureAction { action } => Some(ValueData::SignatureAction(*action)),
        _ => None,
    }
}

fn literal_data(factory: &ValueFactory, literal: &Literal) -> Option<ValueData> {
    match (factory, literal) {
        (ValueFactory::Algorithm, Literal::Str(s)) => Some(ValueData::Algorithm(s.clone())),
        (ValueFactory::Mode, Literal::Str(s)) => Some(ValueData::Mode(s.clone())),
        (ValueFactory::Padding, Literal::Str(s)) => Some(ValueData::Padding(s.clone())),
        (ValueFactory::Curve, Literal::Str(s)) => Some(ValueData::Curve(s.clone())),
        (ValueFactory::ValueAction, Literal::Str(s)) => Some(ValueData::ValueAction(s.clone())),
        (ValueFactory::ValueAction, Literal::Int(n)) => Some(ValueData::ValueAction(n.to_string())),
        (ValueFactory::OperationMode, Literal::Int(n)) => Some(ValueData::OperationMode(*n)),
        (ValueFactory::OperationMode, Literal::Bool(b)) => {
            Some(ValueData::OperationMode(i64::from(*b)))
        }
        (ValueFactory::Iterations, Literal::Int(n)) => Some(ValueData::NumberOfIterations(*n)),
        _ => None,
    }
}
