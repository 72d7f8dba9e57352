//! Reaching definitions over the statement shapes reported by
//! [`LanguageSupport::flow`].
//!
//! A later definition kills earlier ones, branches union their outcomes and a
//! loop body unions with the state entering the loop. All definitions that
//! may reach a use are reported, in source order.

use tree_sitter::Node;

use super::{Flow, LanguageSupport, SourceUnit};

#[derive(Debug, Clone, Default)]
pub struct Reaching<'a> {
    /// Value expressions of the definitions reaching the use.
    pub values: Vec<Node<'a>>,
    /// Whether the scope declares or assigns the name at all.
    pub declared: bool,
}

enum Outcome<'a> {
    /// The walk arrived at the statement holding the use.
    Reached(Vec<Node<'a>>),
    /// The node was passed completely.
    Through(Vec<Node<'a>>),
}

impl<'a> Outcome<'a> {
    fn into_state(self) -> Vec<Node<'a>> {
        match self {
            Self::Reached(state) | Self::Through(state) => state,
        }
    }
}

struct Walker<'s, 'a> {
    support: &'s dyn LanguageSupport,
    unit: &'s SourceUnit<'a>,
    name: &'s str,
    declared: bool,
}

/// Definitions of `name` inside `scope` that reach byte offset `position`.
/// A position at or past the end of `scope` yields the definitions live at
/// its exit.
pub fn reaching_definitions<'a>(
    support: &dyn LanguageSupport,
    unit: &SourceUnit<'a>,
    scope: Node<'a>,
    name: &str,
    position: usize,
) -> Reaching<'a> {
    let mut walker = Walker {
        support,
        unit,
        name,
        declared: false,
    };
    let values = walker.walk(scope, Vec::new(), Some(position)).into_state();
    Reaching {
        values,
        declared: walker.declared,
    }
}

fn contains(node: &Node, position: Option<usize>) -> bool {
    position.is_some_and(|p| node.start_byte() <= p && p < node.end_byte())
}

fn union<'a>(mut into: Vec<Node<'a>>, from: Vec<Node<'a>>) -> Vec<Node<'a>> {
    for node in from {
        if !into.iter().any(|n| n.id() == node.id()) {
            into.push(node);
        }
    }
    into.sort_by_key(|n| n.start_byte());
    into
}

impl<'s, 'a> Walker<'s, 'a> {
    fn walk(
        &mut self,
        node: Node<'a>,
        incoming: Vec<Node<'a>>,
        target: Option<usize>,
    ) -> Outcome<'a> {
        let here = contains(&node, target);
        match self.support.flow(node, self.unit) {
            Flow::Define(definitions) => {
                if here {
                    return Outcome::Reached(incoming);
                }
                let mut state = incoming;
                for definition in definitions {
                    if definition.name == self.name {
                        self.declared = true;
                        state = definition.value.into_iter().collect();
                    }
                }
                Outcome::Through(state)
            }
            Flow::Sequence(children) => self.walk_sequence(&children, incoming, target),
            Flow::Branch { arms, exhaustive } => {
                if here {
                    let arm = arms.iter().find(|arm| contains(arm, target));
                    return match arm {
                        Some(arm) => {
                            Outcome::Reached(self.walk(*arm, incoming, target).into_state())
                        }
                        None => Outcome::Reached(incoming),
                    };
                }
                let mut out = if exhaustive { Vec::new() } else { incoming.clone() };
                for arm in arms {
                    let state = self.walk(arm, incoming.clone(), None).into_state();
                    out = union(out, state);
                }
                Outcome::Through(out)
            }
            Flow::Loop(body) => {
                let first_pass = self.walk_sequence(&body, incoming.clone(), None).into_state();
                let looped = union(incoming, first_pass);
                if here {
                    return Outcome::Reached(self.walk_sequence(&body, looped, target).into_state());
                }
                Outcome::Through(looped)
            }
            Flow::Opaque => {
                if here {
                    Outcome::Reached(incoming)
                } else {
                    Outcome::Through(incoming)
                }
            }
        }
    }

    fn walk_sequence(
        &mut self,
        children: &[Node<'a>],
        incoming: Vec<Node<'a>>,
        target: Option<usize>,
    ) -> Outcome<'a> {
        let mut state = incoming;
        for child in children {
            if target.is_some_and(|p| child.start_byte() > p) {
                return Outcome::Reached(state);
            }
            match self.walk(*child, state, target) {
                Outcome::Reached(reached) => return Outcome::Reached(reached),
                Outcome::Through(next) => state = next,
            }
        }
        Outcome::Through(state)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{find_kind, parse, unit};
    use super::super::{support_for, Language, TypeHierarchy};
    use super::*;
    use pretty_assertions::assert_eq;

    /// Values reaching the last call argument named `name`, e.g. `use(size)`.
    fn reaching_texts(language: Language, source: &str, name: &str) -> (Vec<String>, bool) {
        let tree = parse(language, source);
        let library = TypeHierarchy::new();
        let unit = unit(language, &tree, source, &library);
        let support = support_for(language);
        let use_node = find_kind(tree.root_node(), "identifier")
            .into_iter()
            .filter(|n| unit.text(n) == name)
            .filter(|n| n.parent().is_some_and(|p| p.kind() == "argument_list"))
            .last()
            .unwrap();
        let scope = support
            .enclosing_function(use_node)
            .and_then(|f| support.function_body(f))
            .unwrap_or_else(|| unit.root());

        let reaching = reaching_definitions(support, &unit, scope, name, use_node.start_byte());
        let texts = reaching.values.iter().map(|n| unit.text(n)).collect();
        (texts, reaching.declared)
    }

    #[test]
    fn test_later_definition_kills_earlier() {
        let source = r#"
class A { void f() {
    int mode = 1;
    mode = 2;
    use(mode);
} }
"#;
        assert_eq!(
            reaching_texts(Language::Java, source, "mode"),
            (vec!["2".to_string()], true)
        );
    }

    #[test]
    fn test_branches_union() {
        let source = r#"
class A { void f(boolean decrypt) {
    int mode;
    if (decrypt) {
        mode = 2;
    } else {
        mode = 1;
    }
    use(mode);
} }
"#;
        assert_eq!(
            reaching_texts(Language::Java, source, "mode").0,
            vec!["2".to_string(), "1".to_string()]
        );
    }

    #[test]
    fn test_non_exhaustive_branch_keeps_incoming() {
        let source = r#"
class A { void f(boolean c) {
    String alg = "AES";
    if (c) alg = "DES";
    use(alg);
} }
"#;
        assert_eq!(
            reaching_texts(Language::Java, source, "alg").0,
            vec!["\"AES\"".to_string(), "\"DES\"".to_string()]
        );
    }

    #[test]
    fn test_loop_definitions_reach_uses_inside_loop() {
        let source = r#"
class A { void f() {
    int size = 128;
    while (true) {
        use(size);
        size = 256;
    }
} }
"#;
        assert_eq!(
            reaching_texts(Language::Java, source, "size").0,
            vec!["128".to_string(), "256".to_string()]
        );
    }

    #[test]
    fn test_use_inside_branch_sees_only_that_arm() {
        let source = r#"
class A { void f(boolean c) {
    int size = 128;
    if (c) {
        size = 192;
        use(size);
    } else {
        size = 256;
    }
} }
"#;
        assert_eq!(
            reaching_texts(Language::Java, source, "size").0,
            vec!["192".to_string()]
        );
    }

    #[test]
    fn test_use_inside_else_arm_sees_only_that_arm() {
        let source = r#"
class A { void f(boolean c) {
    int size = 128;
    if (c) {
        size = 256;
    } else {
        size = 192;
        use(size);
    }
} }
"#;
        assert_eq!(
            reaching_texts(Language::Java, source, "size").0,
            vec!["192".to_string()]
        );
    }

    #[test]
    fn test_definition_holding_the_use_sees_incoming_state() {
        let source = r#"
class A { void f() {
    int size = 128;
    size = use(size);
} }
"#;
        assert_eq!(
            reaching_texts(Language::Java, source, "size").0,
            vec!["128".to_string()]
        );
    }

    #[test]
    fn test_undeclared_name() {
        let source = "class A { void f(int size) { use(size); } }";
        assert_eq!(
            reaching_texts(Language::Java, source, "size"),
            (vec![], false)
        );
    }

    #[test]
    fn test_python_if_elif_else() {
        let source = r#"
def f(kind):
    if kind == 1:
        length = 16
    elif kind == 2:
        length = 24
    else:
        length = 32
    return use(length)
"#;
        assert_eq!(
            reaching_texts(Language::Python, source, "length").0,
            vec!["16".to_string(), "24".to_string(), "32".to_string()]
        );
    }
}
