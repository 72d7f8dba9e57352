//! Java frontend over `tree-sitter-java`.

use tree_sitter::Node;

use super::{
    descendants, Argument, BinaryOp, Declarations, Definition, Flow, ImportMap, Invocation,
    InvocationKind, Language, LanguageSupport, Length, Literal, MethodMatcher, SourceUnit,
    TypeHierarchy, TypeRef, ANY_TYPE,
};
use crate::error::EngineError;
use crate::utils::string::{is_constant_name, starts_uppercase, strip_generics, unquote_string};

const PRIMITIVES: &[&str] = &[
    "byte", "short", "int", "long", "float", "double", "boolean", "char", "void",
];

const TYPE_DECLARATIONS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
];

const FUNCTION_KINDS: &[&str] = &[
    "method_declaration",
    "constructor_declaration",
    "static_initializer",
];

/// Static factories whose return type is the declaring class unless the
/// hierarchy says otherwise.
const SELF_FACTORIES: &[&str] = &["getInstance", "newInstance"];

pub struct JavaSupport;

/// What a variable declaration says about a name.
struct Declared<'a> {
    type_node: Node<'a>,
    value: Option<Node<'a>>,
    extra_dims: usize,
}

impl JavaSupport {
    fn field_text<'a>(node: Node<'a>, field: &str, unit: &SourceUnit<'a>) -> Option<String> {
        node.child_by_field_name(field).map(|n| unit.text(&n))
    }

    fn require_field<'a>(node: Node<'a>, field: &str) -> Result<Node<'a>, EngineError> {
        node.child_by_field_name(field).ok_or_else(|| {
            EngineError::malformed_node(
                node.kind(),
                node.start_byte(),
                format!("missing `{field}`"),
            )
        })
    }

    fn arguments<'a>(node: Node<'a>) -> Result<Vec<Argument<'a>>, EngineError> {
        let list = Self::require_field(node, "arguments")?;
        let mut cursor = list.walk();
        let arguments = list
            .named_children(&mut cursor)
            .filter(|n| !n.kind().ends_with("comment"))
            .map(|node| Argument {
                node,
                keyword: None,
            })
            .collect();
        Ok(arguments)
    }

    /// Resolves a type as written in source to its qualified candidates.
    fn resolve_type_text(
        text: &str,
        imports: &ImportMap,
        package: Option<&str>,
    ) -> Option<TypeRef> {
        let mut base = strip_generics(text);
        let mut dims = 0;
        if let Some(stripped) = base.strip_suffix("...") {
            base = stripped.to_string();
            dims += 1;
        }
        while let Some(stripped) = base.strip_suffix("[]") {
            base = stripped.to_string();
            dims += 1;
        }
        if base.is_empty() || base == "var" {
            return None;
        }

        let candidates = if PRIMITIVES.contains(&base.as_str()) {
            vec![base]
        } else if base.contains('.') {
            match imports.expand(&base) {
                Some(expanded) => vec![expanded],
                None => vec![base],
            }
        } else if let Some(imported) = imports.get(&base) {
            vec![imported.to_string()]
        } else {
            let mut candidates = Vec::new();
            if let Some(package) = package {
                candidates.push(format!("{package}.{base}"));
            }
            candidates.extend(imports.wildcards().iter().map(|w| format!("{w}.{base}")));
            candidates.push(format!("java.lang.{base}"));
            candidates
        };

        let mut ty = TypeRef::with_candidates(candidates)?;
        for _ in 0..dims {
            ty = ty.array_of();
        }
        Some(ty)
    }

    fn resolve_type_node<'a>(node: Node<'a>, unit: &SourceUnit<'a>) -> Option<TypeRef> {
        Self::resolve_type_text(&unit.text(&node), unit.imports(), unit.package())
    }

    fn type_name_of<'a>(node: Node<'a>, source: &[u8]) -> Option<String> {
        node.child_by_field_name("name")
            .and_then(|n| n.utf8_text(source).ok())
            .map(str::to_string)
    }

    fn qualify(package: Option<&str>, name: &str) -> String {
        match package {
            Some(package) => format!("{package}.{name}"),
            None => name.to_string(),
        }
    }

    fn enclosing_type<'a>(node: Node<'a>) -> Option<Node<'a>> {
        let mut current = node.parent();
        while let Some(n) = current {
            if TYPE_DECLARATIONS.contains(&n.kind()) {
                return Some(n);
            }
            current = n.parent();
        }
        None
    }

    fn enclosing_type_name<'a>(node: Node<'a>, unit: &SourceUnit<'a>) -> Option<String> {
        let decl = Self::enclosing_type(node)?;
        let name = Self::field_text(decl, "name", unit)?;
        Some(Self::qualify(unit.package(), &name))
    }

    fn declarators<'a>(node: Node<'a>) -> Vec<Node<'a>> {
        let mut cursor = node.walk();
        let declarators = node
            .children_by_field_name("declarator", &mut cursor)
            .collect();
        declarators
    }

    fn declarator_dims<'a>(declarator: Node<'a>, unit: &SourceUnit<'a>) -> usize {
        declarator
            .child_by_field_name("dimensions")
            .map(|d| unit.text(&d).matches("[]").count())
            .unwrap_or(0)
    }

    /// Nearest declaration of `name` visible at `at`: locals and parameters
    /// of the enclosing function first, then fields of enclosing classes.
    fn declaration_of<'a>(
        &self,
        name: &str,
        at: Node<'a>,
        unit: &SourceUnit<'a>,
    ) -> Option<Declared<'a>> {
        if let Some(function) = self.enclosing_function(at) {
            let mut found = None;
            for node in descendants(function) {
                if node.start_byte() >= at.start_byte() {
                    break;
                }
                if let Some(declared) = Self::declares(node, name, unit) {
                    found = Some(declared);
                }
            }
            if found.is_some() {
                return found;
            }
        }

        let mut scope = self.outer_scope(at);
        while let Some(body) = scope {
            let mut cursor = body.walk();
            let fields: Vec<Node<'a>> = body
                .named_children(&mut cursor)
                .filter(|n| matches!(n.kind(), "field_declaration" | "constant_declaration"))
                .collect();
            for field in fields {
                if let Some(declared) = Self::declares(field, name, unit) {
                    return Some(declared);
                }
            }
            scope = self.outer_scope(body);
        }
        None
    }

    fn declares<'a>(node: Node<'a>, name: &str, unit: &SourceUnit<'a>) -> Option<Declared<'a>> {
        match node.kind() {
            "local_variable_declaration" | "field_declaration" | "constant_declaration" => {
                let type_node = node.child_by_field_name("type")?;
                Self::declarators(node).into_iter().find_map(|declarator| {
                    let declared = Self::field_text(declarator, "name", unit)?;
                    (declared == name).then(|| Declared {
                        type_node,
                        value: declarator.child_by_field_name("value"),
                        extra_dims: Self::declarator_dims(declarator, unit),
                    })
                })
            }
            "formal_parameter" | "catch_formal_parameter" | "enhanced_for_statement"
            | "resource" => {
                let declared = Self::field_text(node, "name", unit)?;
                if declared != name {
                    return None;
                }
                let type_node = node.child_by_field_name("type").or_else(|| {
                    let mut cursor = node.walk();
                    let found = node
                        .named_children(&mut cursor)
                        .find(|n| n.kind() == "catch_type");
                    found
                })?;
                Some(Declared {
                    type_node,
                    value: node.child_by_field_name("value"),
                    extra_dims: node
                        .child_by_field_name("dimensions")
                        .map(|d| unit.text(&d).matches("[]").count())
                        .unwrap_or(0),
                })
            }
            "spread_parameter" => {
                let mut cursor = node.walk();
                let children: Vec<Node<'a>> = node.named_children(&mut cursor).collect();
                let declarator = children.iter().find(|n| n.kind() == "variable_declarator")?;
                let declared = Self::field_text(*declarator, "name", unit)?;
                if declared != name {
                    return None;
                }
                Some(Declared {
                    type_node: *children.first()?,
                    value: None,
                    extra_dims: 1,
                })
            }
            _ => None,
        }
    }

    fn declared_type<'a>(&self, declared: &Declared<'a>, unit: &SourceUnit<'a>) -> Option<TypeRef> {
        let text = unit.text(&declared.type_node);
        let mut ty = if text == "var" {
            self.expression_type(declared.value?, unit)?
        } else {
            Self::resolve_type_node(declared.type_node, unit)?
        };
        for _ in 0..declared.extra_dims {
            ty = ty.array_of();
        }
        Some(ty)
    }

    /// Interprets `node` as a reference to a type (`Cipher`,
    /// `javax.crypto.Cipher`) rather than a value.
    fn static_type<'a>(&self, node: Node<'a>, unit: &SourceUnit<'a>) -> Option<TypeRef> {
        match node.kind() {
            "identifier" | "type_identifier" => {
                let name = unit.text(&node);
                if self.declaration_of(&name, node, unit).is_some() || !starts_uppercase(&name) {
                    return None;
                }
                Self::resolve_type_text(&name, unit.imports(), unit.package())
            }
            "field_access" | "scoped_identifier" | "scoped_type_identifier" => {
                let text = unit.text(&node);
                let first = text.split('.').next().unwrap_or_default();
                let last = text.rsplit('.').next().unwrap_or_default();
                if !starts_uppercase(last)
                    || !text
                        .split('.')
                        .all(|s| s.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$'))
                    || self.declaration_of(first, node, unit).is_some()
                {
                    return None;
                }
                Self::resolve_type_text(&text, unit.imports(), unit.package())
            }
            _ => None,
        }
    }

    fn local_method<'a>(&self, name: &str, unit: &SourceUnit<'a>) -> Option<Node<'a>> {
        descendants(unit.root()).into_iter().find(|n| {
            n.kind() == "method_declaration"
                && n.child_by_field_name("name")
                    .is_some_and(|id| unit.text(&id) == name)
        })
    }

    fn method_return_type<'a>(
        &self,
        node: Node<'a>,
        unit: &SourceUnit<'a>,
    ) -> Option<TypeRef> {
        let invocation = self.invocation(node, unit).ok()??;
        let owner = self.invoked_type(&invocation, unit);

        if let Some(owner) = &owner {
            let types = unit.types();
            let declared = owner
                .candidates()
                .iter()
                .find_map(|candidate| types.return_type(candidate, &invocation.name));
            if let Some(declared) = declared {
                return Some(TypeRef::resolved(declared));
            }
        }

        if SELF_FACTORIES.contains(&invocation.name.as_str()) {
            let is_static = invocation
                .receiver
                .is_some_and(|r| self.static_type(r, unit).is_some());
            if is_static {
                return owner;
            }
        }

        if invocation.receiver.is_none() {
            let method = self.local_method(&invocation.name, unit)?;
            return Self::resolve_type_node(method.child_by_field_name("type")?, unit);
        }
        None
    }

    fn integer_literal(text: &str) -> Option<i64> {
        let cleaned: String = text
            .trim_end_matches(['l', 'L'])
            .chars()
            .filter(|c| *c != '_')
            .collect();
        let lower = cleaned.to_lowercase();
        if let Some(hex) = lower.strip_prefix("0x") {
            i64::from_str_radix(hex, 16).ok()
        } else if let Some(bin) = lower.strip_prefix("0b") {
            i64::from_str_radix(bin, 2).ok()
        } else if lower.len() > 1 && lower.starts_with('0') {
            i64::from_str_radix(&lower[1..], 8).ok()
        } else {
            lower.parse().ok()
        }
    }

    fn collect_declarations(root: Node<'_>, source: &[u8]) -> Declarations {
        let text = |n: Node<'_>| n.utf8_text(source).unwrap_or_default().to_string();
        let mut declarations = Declarations::default();

        let mut cursor = root.walk();
        let top: Vec<Node<'_>> = root.named_children(&mut cursor).collect();
        for node in &top {
            match node.kind() {
                "package_declaration" => {
                    let mut c = node.walk();
                    let name = node
                        .named_children(&mut c)
                        .find(|n| matches!(n.kind(), "scoped_identifier" | "identifier"));
                    declarations.package = name.map(text);
                }
                "import_declaration" => {
                    let mut c = node.walk();
                    let children: Vec<Node<'_>> = node.children(&mut c).collect();
                    let is_static = children.iter().any(|n| n.kind() == "static");
                    let wildcard = children.iter().any(|n| n.kind() == "asterisk");
                    let Some(path) = children
                        .iter()
                        .find(|n| matches!(n.kind(), "scoped_identifier" | "identifier"))
                        .map(|n| text(*n))
                    else {
                        continue;
                    };
                    if wildcard {
                        if !is_static {
                            declarations.imports.insert_wildcard(path);
                        }
                    } else if let Some(last) = path.rsplit('.').next() {
                        declarations.imports.insert(last.to_string(), path.clone());
                    }
                }
                _ => {}
            }
        }

        let package = declarations.package.clone();
        let types: Vec<Node<'_>> = descendants(root)
            .into_iter()
            .filter(|n| TYPE_DECLARATIONS.contains(&n.kind()))
            .collect();
        for decl in &types {
            if let Some(name) = Self::type_name_of(*decl, source) {
                if declarations.imports.get(&name).is_none() {
                    let qualified = Self::qualify(package.as_deref(), &name);
                    declarations.imports.insert(name, qualified);
                }
            }
        }

        let mut local_types = TypeHierarchy::new();
        for decl in &types {
            let Some(name) = Self::type_name_of(*decl, source) else {
                continue;
            };
            let qualified = Self::qualify(package.as_deref(), &name);
            let mut supertypes = Vec::new();
            for field in ["superclass", "interfaces"] {
                if let Some(clause) = decl.child_by_field_name(field) {
                    supertypes.extend(Self::clause_types(clause));
                }
            }
            let mut c = decl.walk();
            for child in decl.named_children(&mut c) {
                if child.kind() == "extends_interfaces" {
                    supertypes.extend(Self::clause_types(child));
                }
            }
            for sup in supertypes {
                let resolved = Self::resolve_type_text(
                    &text(sup),
                    &declarations.imports,
                    package.as_deref(),
                );
                for candidate in resolved.iter().flat_map(|t| t.candidates()) {
                    local_types.add_supertype(qualified.clone(), candidate.clone());
                }
            }
        }
        declarations.local_types = local_types;
        declarations
    }

    /// Type nodes inside an `extends`/`implements` clause.
    fn clause_types(clause: Node<'_>) -> Vec<Node<'_>> {
        descendants(clause)
            .into_iter()
            .skip(1)
            .filter(|n| {
                matches!(
                    n.kind(),
                    "type_identifier" | "scoped_type_identifier" | "generic_type"
                ) && !n.parent().is_some_and(|p| {
                    matches!(
                        p.kind(),
                        "generic_type" | "scoped_type_identifier" | "type_arguments"
                    )
                })
            })
            .collect()
    }
}

impl LanguageSupport for JavaSupport {
    fn language(&self) -> Language {
        Language::Java
    }

    fn declarations(&self, root: Node<'_>, source: &[u8]) -> Declarations {
        Self::collect_declarations(root, source)
    }

    fn invocation<'a>(
        &self,
        node: Node<'a>,
        unit: &SourceUnit<'a>,
    ) -> Result<Option<Invocation<'a>>, EngineError> {
        match node.kind() {
            "object_creation_expression" => {
                let ty = Self::require_field(node, "type")?;
                let type_text = strip_generics(&unit.text(&ty));
                let name = type_text.rsplit('.').next().unwrap_or(&type_text).to_string();
                Ok(Some(Invocation {
                    node,
                    kind: InvocationKind::Constructor,
                    name,
                    receiver: None,
                    arguments: Self::arguments(node)?,
                }))
            }
            "method_invocation" => {
                let name = Self::require_field(node, "name")?;
                Ok(Some(Invocation {
                    node,
                    kind: InvocationKind::Method,
                    name: unit.text(&name),
                    receiver: node.child_by_field_name("object"),
                    arguments: Self::arguments(node)?,
                }))
            }
            "field_access" => {
                let field = Self::require_field(node, "field")?;
                let object = Self::require_field(node, "object")?;
                let name = unit.text(&field);
                let is_call_target = node.parent().is_some_and(|p| {
                    p.kind() == "method_invocation"
                        && p.child_by_field_name("object").map(|o| o.id()) == Some(node.id())
                });
                if !is_constant_name(&name) || is_call_target {
                    return Ok(None);
                }
                if self.static_type(object, unit).is_none() {
                    return Ok(None);
                }
                Ok(Some(Invocation {
                    node,
                    kind: InvocationKind::EnumReference,
                    name,
                    receiver: Some(object),
                    arguments: Vec::new(),
                }))
            }
            _ => Ok(None),
        }
    }

    fn invoked_type<'a>(
        &self,
        invocation: &Invocation<'a>,
        unit: &SourceUnit<'a>,
    ) -> Option<TypeRef> {
        match invocation.kind {
            InvocationKind::Constructor => {
                Self::resolve_type_node(invocation.node.child_by_field_name("type")?, unit)
            }
            InvocationKind::Method => match invocation.receiver {
                Some(receiver) => self
                    .static_type(receiver, unit)
                    .or_else(|| self.expression_type(receiver, unit)),
                None => Self::enclosing_type_name(invocation.node, unit).map(TypeRef::resolved),
            },
            InvocationKind::EnumReference => self.static_type(invocation.receiver?, unit),
        }
    }

    fn expression_type<'a>(&self, node: Node<'a>, unit: &SourceUnit<'a>) -> Option<TypeRef> {
        match node.kind() {
            "parenthesized_expression" => self.expression_type(node.named_child(0)?, unit),
            "this" => Self::enclosing_type_name(node, unit).map(TypeRef::resolved),
            "cast_expression" => Self::resolve_type_node(node.child_by_field_name("type")?, unit),
            "decimal_integer_literal"
            | "hex_integer_literal"
            | "octal_integer_literal"
            | "binary_integer_literal" => {
                let text = unit.text(&node);
                if text.ends_with(['l', 'L']) {
                    Some(TypeRef::resolved("long"))
                } else {
                    Some(TypeRef::resolved("int"))
                }
            }
            "decimal_floating_point_literal" | "hex_floating_point_literal" => {
                Some(TypeRef::resolved("double"))
            }
            "string_literal" | "text_block" => Some(TypeRef::resolved("java.lang.String")),
            "true" | "false" => Some(TypeRef::resolved("boolean")),
            "character_literal" => Some(TypeRef::resolved("char")),
            "object_creation_expression" => {
                Self::resolve_type_node(node.child_by_field_name("type")?, unit)
            }
            "array_creation_expression" => {
                let element = Self::resolve_type_node(node.child_by_field_name("type")?, unit)?;
                let mut cursor = node.walk();
                let dims: usize = node
                    .named_children(&mut cursor)
                    .map(|child| match child.kind() {
                        "dimensions_expr" => 1,
                        "dimensions" => unit.text(&child).matches('[').count(),
                        _ => 0,
                    })
                    .sum();
                let mut ty = element;
                for _ in 0..dims.max(1) {
                    ty = ty.array_of();
                }
                Some(ty)
            }
            "identifier" => {
                let name = unit.text(&node);
                let declared = self.declaration_of(&name, node, unit)?;
                self.declared_type(&declared, unit)
            }
            "field_access" => {
                let object = node.child_by_field_name("object")?;
                let field = unit.text(&node.child_by_field_name("field")?);
                if object.kind() == "this" {
                    let declared = self.declaration_of(&field, node, unit)?;
                    return self.declared_type(&declared, unit);
                }
                let owner = self.static_type(object, unit)?;
                let types = unit.types();
                owner
                    .candidates()
                    .iter()
                    .any(|c| types.constant(c, &field).is_some())
                    .then(|| TypeRef::resolved("int"))
            }
            "method_invocation" => self.method_return_type(node, unit),
            "ternary_expression" => {
                self.expression_type(node.child_by_field_name("consequence")?, unit)
            }
            "array_access" => {
                let array = self.expression_type(node.child_by_field_name("array")?, unit)?;
                let element = array.name().strip_suffix("[]")?.to_string();
                Some(TypeRef::resolved(element))
            }
            "binary_expression" => {
                let left = self.expression_type(node.child_by_field_name("left")?, unit)?;
                let right = self.expression_type(node.child_by_field_name("right")?, unit)?;
                if left.is("java.lang.String") || right.is("java.lang.String") {
                    Some(TypeRef::resolved("java.lang.String"))
                } else if left.is("long") || right.is("long") {
                    Some(TypeRef::resolved("long"))
                } else {
                    Some(left)
                }
            }
            _ => None,
        }
    }

    fn unwrap_expression<'a>(&self, node: Node<'a>) -> Node<'a> {
        let mut current = node;
        loop {
            let next = match current.kind() {
                "parenthesized_expression" => current.named_child(0),
                "cast_expression" => current.child_by_field_name("value"),
                _ => None,
            };
            match next {
                Some(next) => current = next,
                None => return current,
            }
        }
    }

    fn identifier_name<'a>(&self, node: Node<'a>, unit: &SourceUnit<'a>) -> Option<String> {
        match node.kind() {
            "identifier" => Some(unit.text(&node)),
            "field_access" => {
                let object = node.child_by_field_name("object")?;
                (object.kind() == "this")
                    .then(|| node.child_by_field_name("field"))
                    .flatten()
                    .map(|f| unit.text(&f))
            }
            _ => None,
        }
    }

    fn literal<'a>(&self, node: Node<'a>, unit: &SourceUnit<'a>) -> Option<Literal> {
        let node = self.unwrap_expression(node);
        match node.kind() {
            "decimal_integer_literal"
            | "hex_integer_literal"
            | "octal_integer_literal"
            | "binary_integer_literal" => {
                Self::integer_literal(&unit.text(&node)).map(Literal::Int)
            }
            "string_literal" => Some(Literal::Str(unquote_string(&unit.text(&node)))),
            "true" => Some(Literal::Bool(true)),
            "false" => Some(Literal::Bool(false)),
            "unary_expression" => {
                let operator = node.child_by_field_name("operator")?;
                let operand = node.child_by_field_name("operand")?;
                match (operator.kind(), self.literal(operand, unit)?) {
                    ("-", Literal::Int(v)) => Some(Literal::Int(-v)),
                    ("+", Literal::Int(v)) => Some(Literal::Int(v)),
                    ("!", Literal::Bool(b)) => Some(Literal::Bool(!b)),
                    _ => None,
                }
            }
            "field_access" => {
                let owner = self.static_type(node.child_by_field_name("object")?, unit)?;
                let field = unit.text(&node.child_by_field_name("field")?);
                let types = unit.types();
                owner
                    .candidates()
                    .iter()
                    .find_map(|c| types.constant(c, &field))
                    .map(Literal::Int)
            }
            "identifier" => {
                let name = unit.text(&node);
                if self.declaration_of(&name, node, unit).is_some() {
                    return None;
                }
                let imported = unit.imports().get(&name)?;
                let (owner, constant) = imported.rsplit_once('.')?;
                unit.types().constant(owner, constant).map(Literal::Int)
            }
            _ => None,
        }
    }

    fn length_of<'a>(&self, node: Node<'a>, unit: &SourceUnit<'a>) -> Option<Length<'a>> {
        let node = self.unwrap_expression(node);
        match node.kind() {
            "array_creation_expression" => {
                if let Some(initializer) = node.child_by_field_name("value") {
                    return self.length_of(initializer, unit);
                }
                let mut cursor = node.walk();
                let first = node
                    .named_children(&mut cursor)
                    .find(|n| n.kind() == "dimensions_expr")?;
                Some(Length::Dynamic(first.named_child(0)?))
            }
            "array_initializer" => {
                let mut cursor = node.walk();
                let count = node
                    .named_children(&mut cursor)
                    .filter(|n| !n.kind().ends_with("comment"))
                    .count();
                Some(Length::Known(count))
            }
            "string_literal" => Some(Length::Known(unquote_string(&unit.text(&node)).len())),
            "method_invocation" => {
                let name = unit.text(&node.child_by_field_name("name")?);
                let object = node.child_by_field_name("object")?;
                if name == "getBytes" && object.kind() == "string_literal" {
                    Some(Length::Known(unquote_string(&unit.text(&object)).len()))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    fn binary<'a>(
        &self,
        node: Node<'a>,
        _unit: &SourceUnit<'a>,
    ) -> Option<(Node<'a>, BinaryOp, Node<'a>)> {
        let node = self.unwrap_expression(node);
        if node.kind() != "binary_expression" {
            return None;
        }
        let op = BinaryOp::parse(node.child_by_field_name("operator")?.kind())?;
        Some((
            node.child_by_field_name("left")?,
            op,
            node.child_by_field_name("right")?,
        ))
    }

    fn flow<'a>(&self, node: Node<'a>, unit: &SourceUnit<'a>) -> Flow<'a> {
        let named = |n: Node<'a>| -> Vec<Node<'a>> {
            let mut cursor = n.walk();
            let children: Vec<Node<'a>> = n
                .named_children(&mut cursor)
                .filter(|c| c.kind() != "switch_label" && !c.kind().ends_with("comment"))
                .collect();
            children
        };

        match node.kind() {
            "block" | "constructor_body" | "class_body" | "enum_body" | "enum_body_declarations"
            | "interface_body" | "switch_block_statement_group" | "switch_rule" | "program" => {
                Flow::Sequence(named(node))
            }
            "local_variable_declaration" | "field_declaration" | "constant_declaration" => {
                let definitions = Self::declarators(node)
                    .into_iter()
                    .filter_map(|d| {
                        Some(Definition {
                            name: Self::field_text(d, "name", unit)?,
                            value: d.child_by_field_name("value"),
                        })
                    })
                    .collect();
                Flow::Define(definitions)
            }
            "expression_statement" => {
                let Some(expr) = node.named_child(0) else {
                    return Flow::Opaque;
                };
                if expr.kind() != "assignment_expression" {
                    return Flow::Opaque;
                }
                let is_plain = expr
                    .child_by_field_name("operator")
                    .is_some_and(|op| op.kind() == "=");
                let name = expr
                    .child_by_field_name("left")
                    .and_then(|left| self.identifier_name(left, unit));
                match (is_plain, name) {
                    (true, Some(name)) => Flow::Define(vec![Definition {
                        name,
                        value: expr.child_by_field_name("right"),
                    }]),
                    (false, Some(name)) => Flow::Define(vec![Definition { name, value: None }]),
                    _ => Flow::Opaque,
                }
            }
            "if_statement" => {
                let mut arms = Vec::new();
                arms.extend(node.child_by_field_name("consequence"));
                let alternative = node.child_by_field_name("alternative");
                arms.extend(alternative);
                Flow::Branch {
                    arms,
                    exhaustive: alternative.is_some(),
                }
            }
            "while_statement" | "for_statement" | "enhanced_for_statement" | "do_statement" => {
                Flow::Loop(node.child_by_field_name("body").into_iter().collect())
            }
            "try_statement" | "try_with_resources_statement" => {
                let mut cursor = node.walk();
                let children: Vec<Node<'a>> = node.named_children(&mut cursor).collect();
                let catches: Vec<Node<'a>> = children
                    .iter()
                    .filter(|c| c.kind() == "catch_clause")
                    .filter_map(|c| c.child_by_field_name("body"))
                    .collect();
                let body = node.child_by_field_name("body");
                if catches.is_empty() {
                    let mut sequence: Vec<Node<'a>> = body.into_iter().collect();
                    sequence.extend(
                        children
                            .iter()
                            .filter(|c| c.kind() == "finally_clause")
                            .filter_map(|c| c.named_child(0)),
                    );
                    Flow::Sequence(sequence)
                } else {
                    let mut arms: Vec<Node<'a>> = body.into_iter().collect();
                    arms.extend(catches);
                    Flow::Branch {
                        arms,
                        exhaustive: true,
                    }
                }
            }
            "switch_expression" | "switch_statement" => {
                let Some(body) = node.child_by_field_name("body") else {
                    return Flow::Opaque;
                };
                let arms = named(body);
                let exhaustive = descendants(body).iter().any(|n| {
                    n.kind() == "switch_label" && unit.text(n).trim_start().starts_with("default")
                });
                Flow::Branch { arms, exhaustive }
            }
            "labeled_statement" | "synchronized_statement" => {
                Flow::Sequence(named(node).into_iter().last().into_iter().collect())
            }
            _ => Flow::Opaque,
        }
    }

    fn enclosing_function<'a>(&self, node: Node<'a>) -> Option<Node<'a>> {
        let mut current = node.parent();
        while let Some(n) = current {
            if FUNCTION_KINDS.contains(&n.kind()) {
                return Some(n);
            }
            if TYPE_DECLARATIONS.contains(&n.kind()) {
                return None;
            }
            current = n.parent();
        }
        None
    }

    fn function_body<'a>(&self, function: Node<'a>) -> Option<Node<'a>> {
        match function.kind() {
            "static_initializer" => function.named_child(0),
            _ => function.child_by_field_name("body"),
        }
    }

    fn parameter_index<'a>(
        &self,
        function: Node<'a>,
        name: &str,
        unit: &SourceUnit<'a>,
    ) -> Option<usize> {
        let parameters = function.child_by_field_name("parameters")?;
        let mut cursor = parameters.walk();
        let position = parameters
            .named_children(&mut cursor)
            .filter(|p| matches!(p.kind(), "formal_parameter" | "spread_parameter"))
            .position(|p| Self::declares(p, name, unit).is_some());
        position
    }

    fn method_matcher<'a>(
        &self,
        function: Node<'a>,
        unit: &SourceUnit<'a>,
    ) -> Option<MethodMatcher> {
        if function.kind() == "static_initializer" {
            return None;
        }
        let name = Self::field_text(function, "name", unit)?;
        let parameters = function.child_by_field_name("parameters")?;
        let mut cursor = parameters.walk();
        let parameter_types = parameters
            .named_children(&mut cursor)
            .filter(|p| p.kind() == "formal_parameter")
            .map(|p| {
                p.child_by_field_name("type")
                    .and_then(|t| Self::resolve_type_node(t, unit))
                    .map(|t| t.name().to_string())
                    .unwrap_or_else(|| ANY_TYPE.to_string())
            })
            .collect();
        Some(MethodMatcher {
            owner: Self::enclosing_type_name(function, unit),
            name,
            parameter_types,
        })
    }

    fn outer_scope<'a>(&self, node: Node<'a>) -> Option<Node<'a>> {
        let mut current = node.parent();
        while let Some(n) = current {
            if matches!(n.kind(), "class_body" | "enum_body" | "interface_body") {
                return Some(n);
            }
            current = n.parent();
        }
        None
    }

    fn bound_variable<'a>(&self, node: Node<'a>, unit: &SourceUnit<'a>) -> Option<String> {
        let mut current = node;
        while let Some(parent) = current.parent() {
            match parent.kind() {
                "parenthesized_expression" | "cast_expression" => current = parent,
                "variable_declarator" => {
                    let value = parent.child_by_field_name("value")?;
                    return (value.id() == current.id())
                        .then(|| Self::field_text(parent, "name", unit))
                        .flatten();
                }
                "assignment_expression" => {
                    let right = parent.child_by_field_name("right")?;
                    if right.id() != current.id() {
                        return None;
                    }
                    return self.identifier_name(parent.child_by_field_name("left")?, unit);
                }
                _ => return None,
            }
        }
        None
    }
}
