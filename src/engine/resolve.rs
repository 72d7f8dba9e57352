//! Resolution of argument expressions to the expressions that define them.
//!
//! Identifiers are followed through reaching definitions in the enclosing
//! function, through call sites when they name a parameter, and through
//! fields or module globals otherwise. Every reaching definition is kept.

use tree_sitter::Node;

use crate::error::EngineError;
use crate::syntax::{
    descendants, reaching_definitions, InvocationKind, LanguageSupport, Length, Literal,
    MethodMatcher, SourceUnit,
};

pub(crate) struct Resolver<'u, 'a> {
    support: &'static dyn LanguageSupport,
    unit: &'u SourceUnit<'a>,
    max_depth: usize,
}

impl<'u, 'a> Resolver<'u, 'a> {
    pub fn new(
        support: &'static dyn LanguageSupport,
        unit: &'u SourceUnit<'a>,
        max_depth: usize,
    ) -> Self {
        Self {
            support,
            unit,
            max_depth,
        }
    }

    pub fn support(&self) -> &'static dyn LanguageSupport {
        self.support
    }

    pub fn unit(&self) -> &'u SourceUnit<'a> {
        self.unit
    }

    pub fn check_depth(&self, depth: usize) -> Result<(), EngineError> {
        if depth > self.max_depth {
            return Err(EngineError::depth_exceeded(self.max_depth));
        }
        Ok(())
    }

    /// Defining expressions of `node`, in source order, without duplicates.
    /// Non-identifiers define themselves. Undeclared names are returned as is
    /// so frontends can still read imported constants from them.
    pub fn definitions(&self, node: Node<'a>, depth: usize) -> Result<Vec<Node<'a>>, EngineError> {
        self.check_depth(depth)?;
        let node = self.support.unwrap_expression(node);
        let Some(name) = self.support.identifier_name(node, self.unit) else {
            return Ok(vec![node]);
        };
        if !self.unit.enter(&node) {
            return Ok(Vec::new());
        }
        let result = self.identifier_definitions(node, &name, depth);
        self.unit.leave(&node);
        result
    }

    fn identifier_definitions(
        &self,
        node: Node<'a>,
        name: &str,
        depth: usize,
    ) -> Result<Vec<Node<'a>>, EngineError> {
        let function = self.support.enclosing_function(node);

        if let Some(function) = function {
            if let Some(body) = self.support.function_body(function) {
                let reaching =
                    reaching_definitions(self.support, self.unit, body, name, node.start_byte());
                if reaching.declared {
                    return self.expand(reaching.values, depth);
                }
            }
            if let Some(index) = self.support.parameter_index(function, name, self.unit) {
                return self.parameter_definitions(function, name, index, depth);
            }
        }

        let (scope, position) = match (function, self.support.outer_scope(node)) {
            (Some(_), Some(scope)) => (scope, scope.end_byte()),
            (Some(_), None) => return Ok(vec![node]),
            (None, scope) => (scope.unwrap_or_else(|| self.unit.root()), node.start_byte()),
        };
        let reaching = reaching_definitions(self.support, self.unit, scope, name, position);
        if !reaching.declared {
            return Ok(vec![node]);
        }
        self.expand(reaching.values, depth)
    }

    fn expand(&self, values: Vec<Node<'a>>, depth: usize) -> Result<Vec<Node<'a>>, EngineError> {
        let mut out: Vec<Node<'a>> = Vec::new();
        for value in values {
            for definition in self.definitions(value, depth + 1)? {
                if !out.iter().any(|n| n.id() == definition.id()) {
                    out.push(definition);
                }
            }
        }
        Ok(out)
    }

    /// Arguments passed for parameter `index` at every call site of
    /// `function` in the unit.
    fn parameter_definitions(
        &self,
        function: Node<'a>,
        name: &str,
        index: usize,
        depth: usize,
    ) -> Result<Vec<Node<'a>>, EngineError> {
        let Some(matcher) = self.support.method_matcher(function, self.unit) else {
            return Ok(Vec::new());
        };
        let mut arguments = Vec::new();
        for call in self.call_sites(&matcher) {
            let Some(invocation) = self.support.invocation(call, self.unit)? else {
                continue;
            };
            let keyword = invocation
                .arguments
                .iter()
                .find(|a| a.keyword.as_deref() == Some(name));
            let positional = invocation
                .arguments
                .iter()
                .filter(|a| a.keyword.is_none())
                .nth(index);
            if let Some(argument) = keyword.or(positional) {
                arguments.push(argument.node);
            }
        }
        self.expand(arguments, depth)
    }

    /// Calls in the unit that target the method `matcher` describes. Owner
    /// and parameter types are compared exactly.
    pub fn call_sites(&self, matcher: &MethodMatcher) -> Vec<Node<'a>> {
        let types = self.unit.types();
        descendants(self.unit.root())
            .into_iter()
            .filter(|node| {
                let Ok(Some(invocation)) = self.support.invocation(*node, self.unit) else {
                    return false;
                };
                if invocation.kind != InvocationKind::Method
                    || invocation.name != matcher.name
                    || invocation.arguments.len() > matcher.parameter_types.len()
                {
                    return false;
                }
                if let Some(owner) = &matcher.owner {
                    let invoked = self.support.invoked_type(&invocation, self.unit);
                    if !types.matches(invoked.as_ref(), owner, true) {
                        return false;
                    }
                }
                invocation
                    .arguments
                    .iter()
                    .zip(&matcher.parameter_types)
                    .all(|(argument, expected)| {
                        let ty = self.support.expression_type(argument.node, self.unit);
                        types.matches(ty.as_ref(), expected, true)
                    })
            })
            .collect()
    }

    /// Constant values `node` can take, each with the expression it came from.
    /// Binary expressions are folded over all operand combinations.
    pub fn literals(
        &self,
        node: Node<'a>,
        depth: usize,
    ) -> Result<Vec<(Literal, Node<'a>)>, EngineError> {
        let mut out = Vec::new();
        for definition in self.definitions(node, depth)? {
            if let Some(literal) = self.support.literal(definition, self.unit) {
                out.push((literal, definition));
                continue;
            }
            let Some((left, op, right)) = self.support.binary(definition, self.unit) else {
                continue;
            };
            let lefts = self.literals(left, depth + 1)?;
            let rights = self.literals(right, depth + 1)?;
            for (l, _) in &lefts {
                for (r, _) in &rights {
                    let folded = match (l, r) {
                        (Literal::Int(a), Literal::Int(b)) => op.evaluate(*a, *b).map(Literal::Int),
                        (Literal::Str(a), Literal::Str(b))
                            if op == crate::syntax::BinaryOp::Add =>
                        {
                            Some(Literal::Str(format!("{a}{b}")))
                        }
                        _ => None,
                    };
                    if let Some(folded) = folded {
                        out.push((folded, definition));
                    }
                }
            }
        }
        Ok(out)
    }

    /// Element counts of the arrays or byte strings `node` can hold.
    pub fn lengths(
        &self,
        node: Node<'a>,
        depth: usize,
    ) -> Result<Vec<(usize, Node<'a>)>, EngineError> {
        let mut out = Vec::new();
        for definition in self.definitions(node, depth)? {
            match self.support.length_of(definition, self.unit) {
                Some(Length::Known(n)) => out.push((n, definition)),
                Some(Length::Dynamic(count)) => {
                    for (literal, _) in self.literals(count, depth + 1)? {
                        if let Literal::Int(n) = literal {
                            if let Ok(n) = usize::try_from(n) {
                                out.push((n, definition));
                            }
                        }
                    }
                }
                None => {}
            }
        }
        Ok(out)
    }

    /// Later method calls on the object `node` produced: calls whose receiver
    /// is the variable `node` is stored into and resolves back to `node`.
    pub fn usages(&self, node: Node<'a>, depth: usize) -> Result<Vec<Node<'a>>, EngineError> {
        let Some(variable) = self.support.bound_variable(node, self.unit) else {
            return Ok(Vec::new());
        };
        let scope = self
            .support
            .enclosing_function(node)
            .and_then(|f| self.support.function_body(f))
            .unwrap_or_else(|| self.unit.root());

        let mut out = Vec::new();
        for candidate in descendants(scope) {
            if candidate.start_byte() < node.end_byte() {
                continue;
            }
            let Some(invocation) = self.support.invocation(candidate, self.unit)? else {
                continue;
            };
            if invocation.kind != InvocationKind::Method {
                continue;
            }
            let Some(receiver) = invocation.receiver else {
                continue;
            };
            if self.support.identifier_name(receiver, self.unit).as_deref() != Some(&variable) {
                continue;
            }
            if self
                .definitions(receiver, depth + 1)?
                .iter()
                .any(|d| d.id() == node.id())
            {
                out.push(candidate);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::test_support::{find_kind, parse, unit};
    use crate::syntax::{support_for, Language, TypeHierarchy};
    use pretty_assertions::assert_eq;

    fn resolver<'u, 'a>(unit: &'u SourceUnit<'a>) -> Resolver<'u, 'a> {
        Resolver::new(support_for(unit.language()), unit, 50)
    }

    fn argument<'a>(unit: &SourceUnit<'a>, method: &str, index: usize) -> Node<'a> {
        find_kind(unit.root(), "method_invocation")
            .into_iter()
            .chain(find_kind(unit.root(), "object_creation_expression"))
            .chain(find_kind(unit.root(), "call"))
            .find_map(|n| {
                let invocation = support_for(unit.language()).invocation(n, unit).ok()??;
                (invocation.name == method).then(|| invocation.arguments[index].node)
            })
            .unwrap()
    }

    #[test]
    fn test_every_reaching_definition_is_kept() {
        let source = r#"
class A {
    void f(boolean strong) {
        int size = 128;
        if (strong) { size = 256; }
        use(size);
    }
}
"#;
        let tree = parse(Language::Java, source);
        let library = TypeHierarchy::new();
        let unit = unit(Language::Java, &tree, source, &library);
        let resolver = resolver(&unit);

        let values: Vec<Literal> = resolver
            .literals(argument(&unit, "use", 0), 0)
            .unwrap()
            .into_iter()
            .map(|(l, _)| l)
            .collect();
        assert_eq!(values, vec![Literal::Int(128), Literal::Int(256)]);
    }

    #[test]
    fn test_field_and_folded_expression() {
        let source = r#"
class A {
    private static final int BYTES = 16;
    void f() {
        use(BYTES * 8);
    }
}
"#;
        let tree = parse(Language::Java, source);
        let library = TypeHierarchy::new();
        let unit = unit(Language::Java, &tree, source, &library);
        let resolver = resolver(&unit);

        let values = resolver.literals(argument(&unit, "use", 0), 0).unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].0, Literal::Int(128));
    }

    #[test]
    fn test_parameter_resolves_through_call_sites() {
        let source = r#"
class A {
    void run() {
        init(128);
        init(192);
    }
    void init(int bits) {
        use(bits);
    }
}
"#;
        let tree = parse(Language::Java, source);
        let library = TypeHierarchy::new();
        let unit = unit(Language::Java, &tree, source, &library);
        let resolver = resolver(&unit);

        let values: Vec<Literal> = resolver
            .literals(argument(&unit, "use", 0), 0)
            .unwrap()
            .into_iter()
            .map(|(l, _)| l)
            .collect();
        assert_eq!(values, vec![Literal::Int(128), Literal::Int(192)]);
    }

    #[test]
    fn test_array_lengths_through_variables() {
        let source = r#"
class A {
    void f() {
        int n = 12;
        byte[] iv = new byte[n];
        use(iv);
    }
}
"#;
        let tree = parse(Language::Java, source);
        let library = TypeHierarchy::new();
        let unit = unit(Language::Java, &tree, source, &library);
        let resolver = resolver(&unit);

        let lengths: Vec<usize> = resolver
            .lengths(argument(&unit, "use", 0), 0)
            .unwrap()
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(lengths, vec![12]);
    }

    #[test]
    fn test_self_assignment_terminates() {
        let source = r#"
x = x
use(x)
"#;
        let tree = parse(Language::Python, source);
        let library = TypeHierarchy::new();
        let unit = unit(Language::Python, &tree, source, &library);
        let resolver = resolver(&unit);

        assert!(resolver.literals(argument(&unit, "use", 0), 0).unwrap().is_empty());
    }

    #[test]
    fn test_depth_limit_is_reported() {
        let source = "class A { void f() { int a = 1; use(a); } }";
        let tree = parse(Language::Java, source);
        let library = TypeHierarchy::new();
        let unit = unit(Language::Java, &tree, source, &library);
        let resolver = Resolver::new(support_for(Language::Java), &unit, 0);

        assert_eq!(
            resolver.definitions(argument(&unit, "use", 0), 1).unwrap_err(),
            EngineError::depth_exceeded(0)
        );
    }

    #[test]
    fn test_usages_follow_the_bound_variable() {
        let source = r#"
class A {
    void f(byte[] data) {
        Cipher c = Cipher.getInstance("AES");
        c.init(1, key);
        Cipher other = Cipher.getInstance("DES");
        other.update(data);
        c.doFinal(data);
    }
}
"#;
        let tree = parse(Language::Java, source);
        let library = TypeHierarchy::new();
        let unit = unit(Language::Java, &tree, source, &library);
        let resolver = resolver(&unit);
        let get_instance = find_kind(unit.root(), "method_invocation")
            .into_iter()
            .find(|n| unit.text(n) == "Cipher.getInstance(\"AES\")")
            .unwrap();

        let names: Vec<String> = resolver
            .usages(get_instance, 0)
            .unwrap()
            .into_iter()
            .map(|n| unit.text(&n.child_by_field_name("name").unwrap()))
            .collect();
        assert_eq!(names, vec!["init", "doFinal"]);
    }
}
