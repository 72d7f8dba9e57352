//! Integer operators the frontends can fold when a size or mode argument is
//! written as an expression, e.g. `keyBytes * 8` or `1 << 7`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    ShiftLeft,
    ShiftRight,
    BitAnd,
    BitOr,
}

impl BinaryOp {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "+" => Some(Self::Add),
            "-" => Some(Self::Sub),
            "*" => Some(Self::Mul),
            "/" | "//" => Some(Self::Div),
            "%" => Some(Self::Mod),
            "<<" => Some(Self::ShiftLeft),
            ">>" => Some(Self::ShiftRight),
            "&" => Some(Self::BitAnd),
            "|" => Some(Self::BitOr),
            _ => None,
        }
    }

    pub fn evaluate(&self, left: i64, right: i64) -> Option<i64> {
        match self {
            Self::Add => left.checked_add(right),
            Self::Sub => left.checked_sub(right),
            Self::Mul => left.checked_mul(right),
            Self::Div => left.checked_div(right),
            Self::Mod => left.checked_rem(right),
            Self::ShiftLeft if (0..63).contains(&right) => left.checked_shl(right as u32),
            Self::ShiftRight if (0..63).contains(&right) => left.checked_shr(right as u32),
            Self::BitAnd => Some(left & right),
            Self::BitOr => Some(left | right),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_operators() {
        assert_eq!(BinaryOp::parse("*"), Some(BinaryOp::Mul));
        assert_eq!(BinaryOp::parse("//"), Some(BinaryOp::Div));
        assert_eq!(BinaryOp::parse("<<"), Some(BinaryOp::ShiftLeft));
        assert_eq!(BinaryOp::parse("=="), None);
        assert_eq!(BinaryOp::parse("&&"), None);
    }

    #[test]
    fn test_evaluate_size_arithmetic() {
        assert_eq!(BinaryOp::Mul.evaluate(16, 8), Some(128));
        assert_eq!(BinaryOp::Div.evaluate(256, 8), Some(32));
        assert_eq!(BinaryOp::Add.evaluate(96, 32), Some(128));
        assert_eq!(BinaryOp::ShiftLeft.evaluate(1, 7), Some(128));
    }

    #[test]
    fn test_evaluate_rejects_invalid_operands() {
        assert_eq!(BinaryOp::Div.evaluate(1, 0), None);
        assert_eq!(BinaryOp::Mod.evaluate(1, 0), None);
        assert_eq!(BinaryOp::ShiftLeft.evaluate(1, 64), None);
        assert_eq!(BinaryOp::Mul.evaluate(i64::MAX, 2), None);
    }
}
