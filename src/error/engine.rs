use thiserror::Error;

/// Internal faults raised while a single rule is evaluated.
///
/// These never leave the executive: they are logged at the rule boundary and
/// the rule is treated as not matching.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("maximum resolution depth {depth} exceeded")]
    DepthExceeded { depth: usize },

    #[error("malformed {kind} node at byte {start_byte}: {message}")]
    MalformedNode {
        kind: String,
        start_byte: usize,
        message: String,
    },

    #[error("unknown rule id {id}")]
    UnknownRule { id: usize },
}

impl EngineError {
    pub fn depth_exceeded(depth: usize) -> Self {
        Self::DepthExceeded { depth }
    }

    pub fn malformed_node(
        kind: impl Into<String>,
        start_byte: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::MalformedNode {
            kind: kind.into(),
            start_byte,
            message: message.into(),
        }
    }

    pub fn unknown_rule(id: usize) -> Self {
        Self::UnknownRule { id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_exceeded_display() {
        let err = EngineError::depth_exceeded(50);
        assert_eq!(err.to_string(), "maximum resolution depth 50 exceeded");
    }

    #[test]
    fn test_malformed_node_display() {
        let err = EngineError::malformed_node("method_invocation", 120, "missing name");
        assert_eq!(
            err.to_string(),
            "malformed method_invocation node at byte 120: missing name"
        );
    }
}
