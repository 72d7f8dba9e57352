//! Language frontends.
//!
//! The detection engine never looks at tree-sitter node kinds directly. It asks
//! a [`LanguageSupport`] to classify nodes as invocations, literals, variable
//! definitions and control flow, and to compute static types. Everything else
//! in the crate is language independent.

pub mod imports;
pub mod java;
pub mod language;
pub mod operators;
pub mod python;
pub mod reaching;
pub mod types;
pub mod unit;

pub use imports::ImportMap;
pub use language::Language;
pub use operators::BinaryOp;
pub use reaching::{reaching_definitions, Reaching};
pub use types::{HierarchyView, TypeHierarchy, TypeRef, ANY_TYPE};
pub use unit::{Declarations, Location, SourceUnit};

use serde::{Deserialize, Serialize};
use tree_sitter::Node;

use crate::error::EngineError;

/// The three call-site shapes a rule can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationKind {
    Constructor,
    Method,
    /// Reference to a named constant, e.g. `MGF1ParameterSpec.SHA256`.
    EnumReference,
}

#[derive(Debug, Clone)]
pub struct Argument<'a> {
    pub node: Node<'a>,
    /// Set for keyword arguments (`length=32`).
    pub keyword: Option<String>,
}

/// A call site as seen by the engine.
#[derive(Debug, Clone)]
pub struct Invocation<'a> {
    pub node: Node<'a>,
    pub kind: InvocationKind,
    /// Method name, constructed type's simple name, or constant name.
    pub name: String,
    /// Object expression for method calls and the owning type expression for
    /// constant references.
    pub receiver: Option<Node<'a>>,
    pub arguments: Vec<Argument<'a>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Int(i64),
    Str(String),
    Bool(bool),
}

/// Element count of an array or byte-string expression.
#[derive(Debug, Clone, Copy)]
pub enum Length<'a> {
    Known(usize),
    /// The length is given by an integer expression, e.g. `new byte[n]`.
    Dynamic(Node<'a>),
}

#[derive(Debug, Clone)]
pub struct Definition<'a> {
    pub name: String,
    /// `None` for declarations without an initializer.
    pub value: Option<Node<'a>>,
}

/// Control-flow shape of a statement, as far as reaching definitions care.
#[derive(Debug, Clone)]
pub enum Flow<'a> {
    Define(Vec<Definition<'a>>),
    Sequence(Vec<Node<'a>>),
    /// Alternatives of which at most one runs. When not exhaustive, control
    /// can also skip all arms.
    Branch { arms: Vec<Node<'a>>, exhaustive: bool },
    /// Body that may run zero or more times.
    Loop(Vec<Node<'a>>),
    Opaque,
}

/// Identifies a user-defined function so its call sites can be found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodMatcher {
    /// Declaring type for methods; `None` for free functions.
    pub owner: Option<String>,
    pub name: String,
    /// Declared parameter types; [`ANY_TYPE`] where the language has none.
    pub parameter_types: Vec<String>,
}

pub trait LanguageSupport: Send + Sync {
    fn language(&self) -> Language;

    /// Imports, package and local class hierarchy of a freshly parsed unit.
    fn declarations(&self, root: Node<'_>, source: &[u8]) -> Declarations;

    /// Classifies `node` as an invocation. Errors report nodes whose shape the
    /// grammar allows but the frontend cannot interpret.
    fn invocation<'a>(
        &self,
        node: Node<'a>,
        unit: &SourceUnit<'a>,
    ) -> Result<Option<Invocation<'a>>, EngineError>;

    /// Type of the object an invocation targets: the constructed type, the
    /// receiver's type, or the type owning a constant.
    fn invoked_type<'a>(&self, invocation: &Invocation<'a>, unit: &SourceUnit<'a>)
        -> Option<TypeRef>;

    fn expression_type<'a>(&self, node: Node<'a>, unit: &SourceUnit<'a>) -> Option<TypeRef>;

    /// Strips parentheses and casts.
    fn unwrap_expression<'a>(&self, node: Node<'a>) -> Node<'a>;

    /// Name of a plain variable reference, `None` for anything else.
    fn identifier_name<'a>(&self, node: Node<'a>, unit: &SourceUnit<'a>) -> Option<String>;

    fn literal<'a>(&self, node: Node<'a>, unit: &SourceUnit<'a>) -> Option<Literal>;

    fn length_of<'a>(&self, node: Node<'a>, unit: &SourceUnit<'a>) -> Option<Length<'a>>;

    fn binary<'a>(
        &self,
        node: Node<'a>,
        unit: &SourceUnit<'a>,
    ) -> Option<(Node<'a>, BinaryOp, Node<'a>)>;

    fn flow<'a>(&self, node: Node<'a>, unit: &SourceUnit<'a>) -> Flow<'a>;

    fn enclosing_function<'a>(&self, node: Node<'a>) -> Option<Node<'a>>;

    fn function_body<'a>(&self, function: Node<'a>) -> Option<Node<'a>>;

    fn parameter_index<'a>(
        &self,
        function: Node<'a>,
        name: &str,
        unit: &SourceUnit<'a>,
    ) -> Option<usize>;

    fn method_matcher<'a>(&self, function: Node<'a>, unit: &SourceUnit<'a>)
        -> Option<MethodMatcher>;

    /// Scope holding fields or module globals visible from `node`.
    fn outer_scope<'a>(&self, node: Node<'a>) -> Option<Node<'a>>;

    /// Variable the value of `node` is stored into, if it is the right-hand
    /// side of a declaration or assignment.
    fn bound_variable<'a>(&self, node: Node<'a>, unit: &SourceUnit<'a>) -> Option<String>;
}

static JAVA: java::JavaSupport = java::JavaSupport;
static PYTHON: python::PythonSupport = python::PythonSupport;

pub fn support_for(language: Language) -> &'static dyn LanguageSupport {
    match language {
        Language::Java => &JAVA,
        Language::Python => &PYTHON,
    }
}

/// Depth-first pre-order walk over all named descendants of `node`,
/// including `node` itself.
pub fn descendants<'a>(node: Node<'a>) -> Vec<Node<'a>> {
    let mut out = Vec::new();
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        out.push(current);
        let mut cursor = current.walk();
        let children: Vec<Node<'a>> = current.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    out
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::path::Path;
    use tree_sitter::Tree;

    pub fn parse(language: Language, source: &str) -> Tree {
        language
            .parse_source(source, Path::new("test"))
            .expect("source should parse")
    }

    pub fn unit<'a>(
        language: Language,
        tree: &'a Tree,
        source: &'a str,
        library: &'a TypeHierarchy,
    ) -> SourceUnit<'a> {
        let declarations = support_for(language).declarations(tree.root_node(), source.as_bytes());
        let file = match language {
            Language::Java => "Test.java",
            Language::Python => "test.py",
        };
        SourceUnit::new(
            tree,
            source.as_bytes(),
            file,
            language,
            library,
            declarations,
        )
    }

    pub fn find_kind<'a>(node: Node<'a>, kind: &str) -> Vec<Node<'a>> {
        descendants(node)
            .into_iter()
            .filter(|n| n.kind() == kind)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_descendants_are_in_source_order() {
        let source = "class A { void f() { int a = 1; int b = 2; } }";
        let tree = parse(Language::Java, source);
        let ids: Vec<String> = descendants(tree.root_node())
            .into_iter()
            .filter(|n| n.kind() == "identifier")
            .map(|n| n.utf8_text(source.as_bytes()).unwrap().to_string())
            .collect();

        assert_eq!(ids, vec!["A", "f", "a", "b"]);
    }

    #[test]
    fn test_support_for_reports_language() {
        assert_eq!(support_for(Language::Java).language(), Language::Java);
        assert_eq!(support_for(Language::Python).language(), Language::Python);
    }
}
