/// Opcode literal of the fused outer unary-aggregate instruction.
pub const UAGG_OUTER_CHAIN_OPCODE: &str = "uaggouterchain";

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryFn {
    Plus,
    Minus,
    Multiply,
    Divide,
    Power,
    Modulus,
    IntDiv,
    Min,
    Max,
    LessThan,
    LessThanEquals,
    GreaterThan,
    GreaterThanEquals,
    Equals,
    NotEquals,
    And,
    Or,
}

impl BinaryFn {
    pub const COUNT: usize = Self::Or as usize + 1;

    #[inline]
    pub const fn as_usize(self) -> usize {
        self as usize
    }

    #[inline]
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::LessThan
                | Self::LessThanEquals
                | Self::GreaterThan
                | Self::GreaterThanEquals
                | Self::Equals
                | Self::NotEquals
        )
    }

    /// Comparison with its arguments exchanged: `f(a, b) == f.swapped()(b, a)`.
    #[inline]
    pub const fn swapped(self) -> Self {
        match self {
            Self::LessThan => Self::GreaterThan,
            Self::LessThanEquals => Self::GreaterThanEquals,
            Self::GreaterThan => Self::LessThan,
            Self::GreaterThanEquals => Self::LessThanEquals,
            other => other,
        }
    }

    #[inline]
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            Self::Plus => a + b,
            Self::Minus => a - b,
            Self::Multiply => a * b,
            Self::Divide => a / b,
            Self::Power => a.powf(b),
            Self::Modulus => {
                // floored modulus: result takes the sign of the divisor
                if b == 0.0 {
                    f64::NAN
                } else {
                    a - (a / b).floor() * b
                }
            }
            Self::IntDiv => (a / b).floor(),
            Self::Min => {
                if a.is_nan() || b.is_nan() {
                    f64::NAN
                } else {
                    a.min(b)
                }
            }
            Self::Max => {
                if a.is_nan() || b.is_nan() {
                    f64::NAN
                } else {
                    a.max(b)
                }
            }
            Self::LessThan => bool_value(a < b),
            Self::LessThanEquals => bool_value(a <= b),
            Self::GreaterThan => bool_value(a > b),
            Self::GreaterThanEquals => bool_value(a >= b),
            Self::Equals => bool_value(a == b),
            Self::NotEquals => bool_value(a != b),
            Self::And => bool_value(a != 0.0 && b != 0.0),
            Self::Or => bool_value(a != 0.0 || b != 0.0),
        }
    }
}

#[inline]
fn bool_value(v: bool) -> f64 {
    if v {
        1.0
    } else {
        0.0
    }
}

/// Shape compatibility rule of a binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CombineRule {
    /// Dimensions of size 1 are repeated to match the other operand.
    Broadcast,
    /// Both operands must have identical shapes.
    Cellwise,
}

impl CombineRule {
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Broadcast => "broadcast",
            Self::Cellwise => "cellwise",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        [Self::Broadcast, Self::Cellwise]
            .into_iter()
            .find(|rule| rule.as_str().eq_ignore_ascii_case(token))
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggFn {
    Sum,
    SumSq,
    Mean,
    Max,
    Min,
    MaxIndex,
    MinIndex,
}

impl AggFn {
    /// Aggregate opcode derived from a unary-aggregate token.
    #[inline]
    pub const fn opcode(self) -> &'static str {
        match self {
            Self::Sum => "ak+",
            Self::SumSq => "asqk+",
            Self::Mean => "amean",
            Self::Max => "max",
            Self::Min => "min",
            Self::MaxIndex => "maxindex",
            Self::MinIndex => "minindex",
        }
    }
}

/// Reduction direction of a unary aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Collapse everything into a 1x1 result.
    All,
    /// Collapse rows: R x C becomes 1 x C.
    ToRow,
    /// Collapse columns: R x C becomes R x 1.
    ToColumn,
}

impl Direction {
    /// Logical output shape for an input of `rows x cols`.
    #[inline]
    pub const fn output_shape(self, rows: usize, cols: usize) -> (usize, usize) {
        match self {
            Self::All => (1, 1),
            Self::ToRow => (1, cols),
            Self::ToColumn => (rows, 1),
        }
    }

    /// Output cell an input cell folds into.
    #[inline]
    pub const fn target(self, row: usize, col: usize) -> (usize, usize) {
        match self {
            Self::All => (0, 0),
            Self::ToRow => (0, col),
            Self::ToColumn => (row, 0),
        }
    }
}

/// Where the auxiliary accumulation values live next to the real result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CorrectionLocation {
    None,
    LastRow,
    LastColumn,
    LastTwoRows,
    LastTwoColumns,
}

impl CorrectionLocation {
    /// Extra `(rows, cols)` appended to the logical result.
    #[inline]
    pub const fn extra_dims(self) -> (usize, usize) {
        match self {
            Self::None => (0, 0),
            Self::LastRow => (1, 0),
            Self::LastColumn => (0, 1),
            Self::LastTwoRows => (2, 0),
            Self::LastTwoColumns => (0, 2),
        }
    }

    #[inline]
    pub const fn slots(self) -> usize {
        let (rows, cols) = self.extra_dims();
        rows + cols
    }

    #[inline]
    pub const fn exists(self) -> bool {
        !matches!(self, Self::None)
    }

    /// Buffer position of correction slot `slot` for output cell `(row, col)`
    /// in a logical `out_rows x out_cols` result.
    #[inline]
    pub const fn slot_cell(
        self,
        row: usize,
        col: usize,
        out_rows: usize,
        out_cols: usize,
        slot: usize,
    ) -> (usize, usize) {
        match self {
            Self::LastRow | Self::LastTwoRows => (out_rows + slot, col),
            Self::LastColumn | Self::LastTwoColumns => (row, out_cols + slot),
            Self::None => (row, col),
        }
    }
}

/// Which input plays the base role in the fused kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// Operand 1 is base, operand 2 is outer.
    NotSwapped,
    /// Operand 2 is base, operand 1 is outer.
    Swapped,
}
