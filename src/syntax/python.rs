//! Python frontend over `tree-sitter-python`.
//!
//! Python has no `new`: a call is treated as a constructor when the callee
//! resolves to a capitalized name, and as a method call otherwise. Calls on
//! imported modules (`hashlib.sha256(...)`) use the module path as the
//! receiver type.

use tree_sitter::Node;

use super::reaching::reaching_definitions;
use super::{
    descendants, Argument, BinaryOp, Declarations, Definition, Flow, Invocation, InvocationKind,
    Language, LanguageSupport, Length, Literal, MethodMatcher, SourceUnit, TypeHierarchy, TypeRef,
    ANY_TYPE,
};
use crate::error::EngineError;
use crate::utils::string::{is_constant_name, starts_uppercase, unquote_string};

/// Calls returning a byte string whose length is their first argument.
const RANDOM_BYTES: &[&str] = &[
    "os.urandom",
    "secrets.token_bytes",
    "Crypto.Random.get_random_bytes",
    "Cryptodome.Random.get_random_bytes",
];

pub struct PythonSupport;

/// How a callee expression resolved.
struct Callee<'a> {
    kind: InvocationKind,
    name: String,
    /// Qualified path of the callee when it is rooted in an import.
    qualified: Option<String>,
    receiver: Option<Node<'a>>,
}

impl PythonSupport {
    fn require_field<'a>(node: Node<'a>, field: &str) -> Result<Node<'a>, EngineError> {
        node.child_by_field_name(field).ok_or_else(|| {
            let message = format!("missing `{field}`");
            EngineError::malformed_node(node.kind(), node.start_byte(), message)
        })
    }

    /// Dotted path for `a.b.c` chains made of plain names only.
    fn dotted<'a>(node: Node<'a>, unit: &SourceUnit<'a>) -> Option<String> {
        match node.kind() {
            "identifier" => Some(unit.text(&node)),
            "attribute" => {
                let object = Self::dotted(node.child_by_field_name("object")?, unit)?;
                let attribute = unit.text(&node.child_by_field_name("attribute")?);
                Some(format!("{object}.{attribute}"))
            }
            _ => None,
        }
    }

    /// Expands a reference rooted in an import to its qualified path, unless
    /// the root name is shadowed by a local assignment.
    fn qualified_reference<'a>(&self, node: Node<'a>, unit: &SourceUnit<'a>) -> Option<String> {
        let dotted = Self::dotted(node, unit)?;
        let root = dotted.split('.').next()?;
        if self.is_local_variable(root, node, unit) {
            return None;
        }
        unit.imports().expand(&dotted)
    }

    fn is_local_variable<'a>(&self, name: &str, at: Node<'a>, unit: &SourceUnit<'a>) -> bool {
        if let Some(function) = self.enclosing_function(at) {
            if self.parameter_names(function, unit).iter().any(|p| p == name) {
                return true;
            }
            if let Some(body) = self.function_body(function) {
                if reaching_definitions(self, unit, body, name, at.start_byte()).declared {
                    return true;
                }
            }
        }
        false
    }

    fn callee<'a>(&self, function: Node<'a>, unit: &SourceUnit<'a>) -> Option<Callee<'a>> {
        let qualified = self.qualified_reference(function, unit);
        let (name, receiver) = match function.kind() {
            "identifier" => (unit.text(&function), None),
            "attribute" => (
                unit.text(&function.child_by_field_name("attribute")?),
                function.child_by_field_name("object"),
            ),
            _ => return None,
        };
        let is_class_name = starts_uppercase(&name) && !is_constant_name(&name);
        let kind = if is_class_name || self.is_local_class(&name, unit) {
            InvocationKind::Constructor
        } else {
            InvocationKind::Method
        };
        let kind = match (kind, &qualified) {
            (InvocationKind::Method, Some(path))
                if is_constant_name(&name) && path.contains('.') =>
            {
                InvocationKind::Constructor
            }
            (kind, _) => kind,
        };
        Some(Callee {
            kind,
            name,
            qualified,
            receiver,
        })
    }

    fn is_local_class<'a>(&self, name: &str, unit: &SourceUnit<'a>) -> bool {
        self.local_definition("class_definition", name, unit).is_some()
    }

    fn local_definition<'a>(
        &self,
        kind: &str,
        name: &str,
        unit: &SourceUnit<'a>,
    ) -> Option<Node<'a>> {
        descendants(unit.root()).into_iter().find(|n| {
            n.kind() == kind
                && n.child_by_field_name("name")
                    .is_some_and(|id| unit.text(&id) == name)
        })
    }

    fn parameter_names<'a>(&self, function: Node<'a>, unit: &SourceUnit<'a>) -> Vec<String> {
        let Some(parameters) = function.child_by_field_name("parameters") else {
            return Vec::new();
        };
        let mut cursor = parameters.walk();
        let mut names: Vec<String> = parameters
            .named_children(&mut cursor)
            .filter_map(|p| match p.kind() {
                "identifier" => Some(unit.text(&p)),
                "typed_parameter" => p.named_child(0).map(|n| unit.text(&n)),
                "default_parameter" | "typed_default_parameter" => {
                    p.child_by_field_name("name").map(|n| unit.text(&n))
                }
                _ => None,
            })
            .collect();
        let is_method = function
            .parent()
            .and_then(|p| p.parent())
            .is_some_and(|p| p.kind() == "class_definition");
        if is_method && names.first().is_some_and(|n| n == "self" || n == "cls") {
            names.remove(0);
        }
        names
    }

    fn parameter_annotation<'a>(
        &self,
        function: Node<'a>,
        name: &str,
        unit: &SourceUnit<'a>,
    ) -> Option<TypeRef> {
        let parameters = function.child_by_field_name("parameters")?;
        let mut cursor = parameters.walk();
        let annotated: Vec<Node<'a>> = parameters
            .named_children(&mut cursor)
            .filter(|p| matches!(p.kind(), "typed_parameter" | "typed_default_parameter"))
            .collect();
        annotated.into_iter().find_map(|p| {
            let declared = match p.kind() {
                "typed_parameter" => p.named_child(0).map(|n| unit.text(&n))?,
                _ => unit.text(&p.child_by_field_name("name")?),
            };
            if declared != name {
                return None;
            }
            self.annotation_type(p.child_by_field_name("type")?, unit)
        })
    }

    fn annotation_type<'a>(&self, node: Node<'a>, unit: &SourceUnit<'a>) -> Option<TypeRef> {
        let inner = if node.kind() == "type" { node.named_child(0)? } else { node };
        let dotted = Self::dotted(inner, unit)?;
        Some(TypeRef::resolved(
            unit.imports().expand(&dotted).unwrap_or(dotted),
        ))
    }

    fn integer_literal(text: &str) -> Option<i64> {
        let cleaned: String = text.chars().filter(|c| *c != '_').collect();
        let lower = cleaned.to_lowercase();
        if let Some(hex) = lower.strip_prefix("0x") {
            i64::from_str_radix(hex, 16).ok()
        } else if let Some(oct) = lower.strip_prefix("0o") {
            i64::from_str_radix(oct, 8).ok()
        } else if let Some(bin) = lower.strip_prefix("0b") {
            i64::from_str_radix(bin, 2).ok()
        } else {
            lower.parse().ok()
        }
    }

    fn is_bytes_literal<'a>(node: Node<'a>, unit: &SourceUnit<'a>) -> bool {
        node.kind() == "string"
            && unit
                .text(&node)
                .chars()
                .take_while(|c| c.is_alphabetic())
                .any(|c| c == 'b' || c == 'B')
    }

    fn has_interpolation(node: Node<'_>) -> bool {
        let mut cursor = node.walk();
        let found = node
            .named_children(&mut cursor)
            .any(|c| c.kind() == "interpolation");
        found
    }

    fn collect_declarations(root: Node<'_>, source: &[u8]) -> Declarations {
        let text = |n: Node<'_>| n.utf8_text(source).unwrap_or_default().to_string();
        let mut declarations = Declarations::default();

        for node in descendants(root) {
            match node.kind() {
                "import_statement" => {
                    let mut cursor = node.walk();
                    let names: Vec<Node<'_>> =
                        node.children_by_field_name("name", &mut cursor).collect();
                    for name in names {
                        match name.kind() {
                            "aliased_import" => {
                                if let (Some(path), Some(alias)) = (
                                    name.child_by_field_name("name"),
                                    name.child_by_field_name("alias"),
                                ) {
                                    declarations.imports.insert(text(alias), text(path));
                                }
                            }
                            _ => {
                                let path = text(name);
                                let root_name = path.split('.').next().unwrap_or(&path).to_string();
                                declarations.imports.insert(root_name.clone(), root_name);
                            }
                        }
                    }
                }
                "import_from_statement" => {
                    let Some(module) = node.child_by_field_name("module_name") else {
                        continue;
                    };
                    let module = text(module).trim_start_matches('.').to_string();
                    let mut cursor = node.walk();
                    let has_wildcard = node
                        .named_children(&mut cursor)
                        .any(|c| c.kind() == "wildcard_import");
                    if has_wildcard {
                        declarations.imports.insert_wildcard(module.clone());
                    }
                    let mut cursor = node.walk();
                    let names: Vec<Node<'_>> =
                        node.children_by_field_name("name", &mut cursor).collect();
                    for name in names {
                        let (imported, local) = match name.kind() {
                            "aliased_import" => {
                                let (Some(path), Some(alias)) = (
                                    name.child_by_field_name("name"),
                                    name.child_by_field_name("alias"),
                                ) else {
                                    continue;
                                };
                                (text(path), text(alias))
                            }
                            _ => (text(name), text(name)),
                        };
                        declarations
                            .imports
                            .insert(local, format!("{module}.{imported}"));
                    }
                }
                _ => {}
            }
        }

        let mut local_types = TypeHierarchy::new();
        for class in descendants(root)
            .into_iter()
            .filter(|n| n.kind() == "class_definition")
        {
            let Some(name) = class.child_by_field_name("name").map(text) else {
                continue;
            };
            let Some(bases) = class.child_by_field_name("superclasses") else {
                continue;
            };
            let mut cursor = bases.walk();
            let bases: Vec<String> = bases.named_children(&mut cursor).map(text).collect();
            for base in bases {
                let qualified = declarations.imports.expand(&base).unwrap_or(base);
                local_types.add_supertype(name.clone(), qualified);
            }
        }
        declarations.local_types = local_types;
        declarations
    }

    fn invocation_of_call<'a>(
        &self,
        node: Node<'a>,
        unit: &SourceUnit<'a>,
    ) -> Result<Option<Invocation<'a>>, EngineError> {
        let function = Self::require_field(node, "function")?;
        let Some(callee) = self.callee(function, unit) else {
            return Ok(None);
        };
        let list = Self::require_field(node, "arguments")?;
        let mut cursor = list.walk();
        let children: Vec<Node<'a>> = list
            .named_children(&mut cursor)
            .filter(|n| n.kind() != "comment")
            .collect();
        let mut arguments = Vec::with_capacity(children.len());
        for child in children {
            if child.kind() == "keyword_argument" {
                let name = Self::require_field(child, "name")?;
                let value = Self::require_field(child, "value")?;
                arguments.push(Argument {
                    node: value,
                    keyword: Some(unit.text(&name)),
                });
            } else {
                arguments.push(Argument {
                    node: child,
                    keyword: None,
                });
            }
        }
        Ok(Some(Invocation {
            node,
            kind: callee.kind,
            name: callee.name,
            receiver: callee.receiver,
            arguments,
        }))
    }
}

impl LanguageSupport for PythonSupport {
    fn language(&self) -> Language {
        Language::Python
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
            "call" => self.invocation_of_call(node, unit),
            "attribute" => {
                let attribute = Self::require_field(node, "attribute")?;
                let object = Self::require_field(node, "object")?;
                let name = unit.text(&attribute);
                let is_callee = node.parent().is_some_and(|p| {
                    p.kind() == "call"
                        && p.child_by_field_name("function").map(|f| f.id()) == Some(node.id())
                });
                if is_callee || !is_constant_name(&name) {
                    return Ok(None);
                }
                if self.qualified_reference(object, unit).is_none() {
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
                let function = invocation.node.child_by_field_name("function")?;
                match self.qualified_reference(function, unit) {
                    Some(path) => Some(TypeRef::resolved(path)),
                    None => Self::dotted(function, unit).map(TypeRef::resolved),
                }
            }
            InvocationKind::Method => match invocation.receiver {
                Some(receiver) => match self.qualified_reference(receiver, unit) {
                    Some(path) => Some(TypeRef::resolved(path)),
                    None => self.expression_type(receiver, unit),
                },
                None => {
                    let function = invocation.node.child_by_field_name("function")?;
                    let path = self.qualified_reference(function, unit)?;
                    let (owner, _) = path.rsplit_once('.')?;
                    Some(TypeRef::resolved(owner))
                }
            },
            InvocationKind::EnumReference => self
                .qualified_reference(invocation.receiver?, unit)
                .map(TypeRef::resolved),
        }
    }

    fn expression_type<'a>(&self, node: Node<'a>, unit: &SourceUnit<'a>) -> Option<TypeRef> {
        match node.kind() {
            "parenthesized_expression" => self.expression_type(node.named_child(0)?, unit),
            "integer" => Some(TypeRef::resolved("int")),
            "float" => Some(TypeRef::resolved("float")),
            "true" | "false" => Some(TypeRef::resolved("bool")),
            "string" if Self::is_bytes_literal(node, unit) => Some(TypeRef::resolved("bytes")),
            "string" | "concatenated_string" => Some(TypeRef::resolved("str")),
            "call" => {
                let invocation = self.invocation(node, unit).ok()??;
                if invocation.kind == InvocationKind::Constructor {
                    return self.invoked_type(&invocation, unit);
                }
                let owner = self.invoked_type(&invocation, unit)?;
                let types = unit.types();
                owner
                    .candidates()
                    .iter()
                    .find_map(|c| types.return_type(c, &invocation.name))
                    .map(TypeRef::resolved)
            }
            "identifier" => {
                let name = unit.text(&node);
                if !unit.enter(&node) {
                    return None;
                }
                let function = self.enclosing_function(node);
                let result = function
                    .and_then(|f| self.parameter_annotation(f, &name, unit))
                    .or_else(|| {
                        let scope = function
                            .and_then(|f| self.function_body(f))
                            .unwrap_or_else(|| unit.root());
                        let mut reaching =
                            reaching_definitions(self, unit, scope, &name, node.start_byte());
                        if !reaching.declared && function.is_some() {
                            reaching = reaching_definitions(
                                self,
                                unit,
                                unit.root(),
                                &name,
                                unit.root().end_byte(),
                            );
                        }
                        reaching
                            .values
                            .iter()
                            .find_map(|value| self.expression_type(*value, unit))
                    });
                unit.leave(&node);
                result
            }
            "binary_operator" => {
                let left = self.expression_type(node.child_by_field_name("left")?, unit)?;
                let right = self.expression_type(node.child_by_field_name("right")?, unit)?;
                if left.is("bytes") || right.is("bytes") {
                    Some(TypeRef::resolved("bytes"))
                } else if left.is("int") && right.is("int") {
                    Some(left)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    fn unwrap_expression<'a>(&self, node: Node<'a>) -> Node<'a> {
        let mut current = node;
        while current.kind() == "parenthesized_expression" {
            match current.named_child(0) {
                Some(inner) => current = inner,
                None => break,
            }
        }
        current
    }

    fn identifier_name<'a>(&self, node: Node<'a>, unit: &SourceUnit<'a>) -> Option<String> {
        (node.kind() == "identifier").then(|| unit.text(&node))
    }

    fn literal<'a>(&self, node: Node<'a>, unit: &SourceUnit<'a>) -> Option<Literal> {
        let node = self.unwrap_expression(node);
        match node.kind() {
            "integer" => Self::integer_literal(&unit.text(&node)).map(Literal::Int),
            "string" if !Self::has_interpolation(node) => {
                Some(Literal::Str(unquote_string(&unit.text(&node))))
            }
            "true" => Some(Literal::Bool(true)),
            "false" => Some(Literal::Bool(false)),
            "unary_operator" => {
                let operator = node.child_by_field_name("operator")?;
                let operand = node.child_by_field_name("argument")?;
                match (operator.kind(), self.literal(operand, unit)?) {
                    ("-", Literal::Int(v)) => Some(Literal::Int(-v)),
                    ("+", Literal::Int(v)) => Some(Literal::Int(v)),
                    _ => None,
                }
            }
            "attribute" => {
                let path = self.qualified_reference(node, unit)?;
                let (owner, name) = path.rsplit_once('.')?;
                unit.types().constant(owner, name).map(Literal::Int)
            }
            _ => None,
        }
    }

    fn length_of<'a>(&self, node: Node<'a>, unit: &SourceUnit<'a>) -> Option<Length<'a>> {
        let node = self.unwrap_expression(node);
        match node.kind() {
            "string" if Self::is_bytes_literal(node, unit) && !Self::has_interpolation(node) => {
                Some(Length::Known(unquote_string(&unit.text(&node)).len()))
            }
            "list" | "tuple" => {
                let mut cursor = node.walk();
                let count = node
                    .named_children(&mut cursor)
                    .filter(|n| n.kind() != "comment")
                    .count();
                Some(Length::Known(count))
            }
            "call" => {
                let function = node.child_by_field_name("function")?;
                let path = self
                    .qualified_reference(function, unit)
                    .or_else(|| Self::dotted(function, unit))?;
                let is_random = RANDOM_BYTES.contains(&path.as_str());
                let is_zeroed = path == "bytes" || path == "bytearray";
                if !is_random && !is_zeroed {
                    return None;
                }
                let arguments = node.child_by_field_name("arguments")?;
                let first = arguments.named_child(0)?;
                if is_zeroed && self.expression_type(first, unit).is_some_and(|t| !t.is("int")) {
                    return None;
                }
                Some(Length::Dynamic(first))
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
        if node.kind() != "binary_operator" {
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
                .filter(|c| c.kind() != "comment")
                .collect();
            children
        };

        match node.kind() {
            "module" | "block" => Flow::Sequence(named(node)),
            "expression_statement" => {
                let Some(expr) = node.named_child(0) else {
                    return Flow::Opaque;
                };
                match expr.kind() {
                    "assignment" => {
                        let Some(left) = expr.child_by_field_name("left") else {
                            return Flow::Opaque;
                        };
                        if left.kind() == "identifier" {
                            return Flow::Define(vec![Definition {
                                name: unit.text(&left),
                                value: expr.child_by_field_name("right"),
                            }]);
                        }
                        let targets: Vec<Definition<'a>> = descendants(left)
                            .into_iter()
                            .filter(|n| n.kind() == "identifier")
                            .map(|n| Definition {
                                name: unit.text(&n),
                                value: None,
                            })
                            .collect();
                        Flow::Define(targets)
                    }
                    "augmented_assignment" => match expr.child_by_field_name("left") {
                        Some(left) if left.kind() == "identifier" => {
                            Flow::Define(vec![Definition {
                                name: unit.text(&left),
                                value: None,
                            }])
                        }
                        _ => Flow::Opaque,
                    },
                    _ => Flow::Opaque,
                }
            }
            "if_statement" => {
                let mut arms: Vec<Node<'a>> =
                    node.child_by_field_name("consequence").into_iter().collect();
                let mut exhaustive = false;
                let mut cursor = node.walk();
                let alternatives: Vec<Node<'a>> =
                    node.children_by_field_name("alternative", &mut cursor).collect();
                for alternative in alternatives {
                    match alternative.kind() {
                        "elif_clause" => {
                            arms.extend(alternative.child_by_field_name("consequence"))
                        }
                        "else_clause" => {
                            exhaustive = true;
                            arms.extend(alternative.child_by_field_name("body"));
                        }
                        _ => {}
                    }
                }
                Flow::Branch { arms, exhaustive }
            }
            "for_statement" | "while_statement" => {
                Flow::Loop(node.child_by_field_name("body").into_iter().collect())
            }
            "with_statement" => {
                Flow::Sequence(node.child_by_field_name("body").into_iter().collect())
            }
            "try_statement" => {
                let children = named(node);
                let handlers: Vec<Node<'a>> = children
                    .iter()
                    .filter(|c| c.kind() == "except_clause")
                    .filter_map(|c| named(*c).into_iter().last())
                    .collect();
                let body = node.child_by_field_name("body");
                let finally: Vec<Node<'a>> = children
                    .iter()
                    .filter(|c| c.kind() == "finally_clause")
                    .filter_map(|c| named(*c).into_iter().last())
                    .collect();
                if handlers.is_empty() {
                    let mut sequence: Vec<Node<'a>> = body.into_iter().collect();
                    sequence.extend(finally);
                    Flow::Sequence(sequence)
                } else {
                    let mut arms: Vec<Node<'a>> = body.into_iter().collect();
                    arms.extend(handlers);
                    Flow::Branch {
                        arms,
                        exhaustive: true,
                    }
                }
            }
            _ => Flow::Opaque,
        }
    }

    fn enclosing_function<'a>(&self, node: Node<'a>) -> Option<Node<'a>> {
        let mut current = node.parent();
        while let Some(n) = current {
            if n.kind() == "function_definition" {
                return Some(n);
            }
            current = n.parent();
        }
        None
    }

    fn function_body<'a>(&self, function: Node<'a>) -> Option<Node<'a>> {
        function.child_by_field_name("body")
    }

    fn parameter_index<'a>(
        &self,
        function: Node<'a>,
        name: &str,
        unit: &SourceUnit<'a>,
    ) -> Option<usize> {
        self.parameter_names(function, unit)
            .iter()
            .position(|p| p == name)
    }

    fn method_matcher<'a>(
        &self,
        function: Node<'a>,
        unit: &SourceUnit<'a>,
    ) -> Option<MethodMatcher> {
        let name = unit.text(&function.child_by_field_name("name")?);
        let parameter_types = self
            .parameter_names(function, unit)
            .iter()
            .map(|_| ANY_TYPE.to_string())
            .collect();
        Some(MethodMatcher {
            owner: None,
            name,
            parameter_types,
        })
    }

    fn outer_scope<'a>(&self, node: Node<'a>) -> Option<Node<'a>> {
        self.enclosing_function(node)?;
        let mut current = node;
        while let Some(parent) = current.parent() {
            current = parent;
        }
        Some(current)
    }

    fn bound_variable<'a>(&self, node: Node<'a>, unit: &SourceUnit<'a>) -> Option<String> {
        let mut current = node;
        while let Some(parent) = current.parent() {
            match parent.kind() {
                "parenthesized_expression" => current = parent,
                "assignment" => {
                    let right = parent.child_by_field_name("right")?;
                    if right.id() != current.id() {
                        return None;
                    }
                    let left = parent.child_by_field_name("left")?;
                    return self.identifier_name(left, unit);
                }
                _ => return None,
            }
        }
        None
    }
}
