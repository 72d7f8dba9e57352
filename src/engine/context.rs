/// Per-evaluation state threaded through rule matching.
///
/// Hook context is entered when rules are evaluated against usages of an
/// object or against call sites of the enclosing method. In hook context all
/// type comparisons are exact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchContext {
    hook: bool,
    depth: usize,
}

impl MatchContext {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_hook(&self) -> bool {
        self.hook
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Context for a dependent rule one level down.
    pub fn deeper(self) -> Self {
        Self {
            depth: self.depth + 1,
            ..self
        }
    }

    /// Once set, hook context is kept by all nested evaluations.
    pub fn as_hook(self) -> Self {
        Self { hook: true, ..self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_context() {
        let ctx = MatchContext::root();
        assert!(!ctx.is_hook());
        assert_eq!(ctx.depth(), 0);
    }

    #[test]
    fn test_hook_is_sticky() {
        let ctx = MatchContext::root().deeper().as_hook().deeper();
        assert!(ctx.is_hook());
        assert_eq!(ctx.depth(), 2);
    }
}
