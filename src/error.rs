use crate::types::{DataType, ValueType};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty instruction string")]
    Empty,
    #[error("unknown opcode `{opcode}`")]
    UnknownOpcode { opcode: String },
    #[error("instruction `{opcode}` requires {expected} fields, got {actual}")]
    FieldCount {
        opcode: String,
        expected: usize,
        actual: usize,
    },
    #[error("unknown operator `{token}`, expected {expected}")]
    UnknownOperator {
        token: String,
        expected: &'static str,
    },
    #[error("unknown value type `{token}` in operand `{field}`")]
    UnknownValueType { field: String, token: String },
    #[error("invalid operand `{field}`: {reason}")]
    InvalidOperand { field: String, reason: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("variable `{name}` is not bound in the execution context")]
    NotFound { name: String },
    #[error("variable `{name}` holds a {actual:?}, expected {expected:?}")]
    TypeMismatch {
        name: String,
        expected: DataType,
        actual: DataType,
    },
    #[error("release of `{name}` without a matching acquire")]
    Imbalance { name: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExecError {
    #[error("`{opcode}`: {source}")]
    Context {
        opcode: &'static str,
        #[source]
        source: ContextError,
    },
    #[error("`{opcode}`: invalid output value type {value_type} for `{output}`")]
    UnsupportedOutputType {
        opcode: &'static str,
        output: String,
        value_type: ValueType,
    },
    #[error("`{opcode}`: operand shapes {lhs_rows}x{lhs_cols} and {rhs_rows}x{rhs_cols} are incompatible for `{rule}`")]
    ShapeMismatch {
        opcode: &'static str,
        rule: &'static str,
        lhs_rows: usize,
        lhs_cols: usize,
        rhs_rows: usize,
        rhs_cols: usize,
    },
}

impl ExecError {
    #[inline]
    pub(crate) fn context(opcode: &'static str, source: ContextError) -> Self {
        Self::Context { opcode, source }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MatrixError {
    #[error("{rows}x{cols} matrix cannot hold {len} values")]
    DimensionMismatch { rows: usize, cols: usize, len: usize },
    #[error("row {row} has {actual} columns, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("cell ({row}, {col}) is outside a {rows}x{cols} matrix")]
    OutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProgramError {
    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: ParseError,
    },
    #[error("instruction {index} (`{instruction}`): {source}")]
    Exec {
        index: usize,
        instruction: String,
        #[source]
        source: ExecError,
    },
}
