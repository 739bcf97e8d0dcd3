use crate::error::ParseError;
use crate::ops::{BinaryFn, CombineRule, OperatorCatalog};
use crate::parse::VALUE_TYPE_DELIM;
use std::fmt;

/// Parsed element-wise operator together with its shape rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BinaryOperator {
    pub func: BinaryFn,
    pub rule: CombineRule,
}

impl BinaryOperator {
    pub const fn new(func: BinaryFn, rule: CombineRule) -> Self {
        Self { func, rule }
    }

    /// Parses `fn` or `fn:rule`; the rule defaults to broadcast.
    pub fn parse(field: &str) -> Result<Self, ParseError> {
        let (token, rule) = match field.rsplit_once(VALUE_TYPE_DELIM) {
            Some((token, rule_token)) if !token.is_empty() => {
                let rule =
                    CombineRule::parse(rule_token).ok_or_else(|| ParseError::UnknownOperator {
                        token: field.to_string(),
                        expected: "combine rule `broadcast` or `cellwise`",
                    })?;
                (token, rule)
            }
            _ => (field, CombineRule::Broadcast),
        };
        let meta = OperatorCatalog::binary(token).ok_or_else(|| ParseError::UnknownOperator {
            token: token.to_string(),
            expected: "binary operator (e.g. `+`, `*`, `<`, `>=`)",
        })?;
        Ok(Self::new(meta.func, rule))
    }

    #[inline]
    pub fn token(&self) -> &'static str {
        OperatorCatalog::binary_by_fn(self.func).token
    }

    #[inline]
    pub fn apply(&self, a: f64, b: f64) -> f64 {
        self.func.apply(a, b)
    }

    /// Shape of `lhs (op) rhs`, or `None` when the rule rejects the pair.
    pub fn output_shape(&self, lhs: (usize, usize), rhs: (usize, usize)) -> Option<(usize, usize)> {
        match self.rule {
            CombineRule::Cellwise => (lhs == rhs).then_some(lhs),
            CombineRule::Broadcast => Some((
                broadcast_dim(lhs.0, rhs.0)?,
                broadcast_dim(lhs.1, rhs.1)?,
            )),
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.rule {
            CombineRule::Broadcast => f.write_str(self.token()),
            CombineRule::Cellwise => write!(
                f,
                "{}{}{}",
                self.token(),
                VALUE_TYPE_DELIM,
                self.rule.as_str()
            ),
        }
    }
}

#[inline]
fn broadcast_dim(a: usize, b: usize) -> Option<usize> {
    if a == b {
        Some(a)
    } else if a == 1 {
        Some(b)
    } else if b == 1 {
        Some(a)
    } else {
        None
    }
}
