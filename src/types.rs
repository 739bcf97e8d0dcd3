use crate::matrix::MatrixValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Semantic value type attached to an operand inside an instruction string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Double,
    Int,
    Boolean,
    String,
}

impl ValueType {
    pub const ALL: [Self; 4] = [Self::Double, Self::Int, Self::Boolean, Self::String];

    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Double => "double",
            Self::Int => "int",
            Self::Boolean => "boolean",
            Self::String => "string",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|vt| vt.as_str().eq_ignore_ascii_case(token.trim()))
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of live value bound to a name in the execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Matrix,
    Scalar,
}

/// Named, typed operand reference as it appears in an instruction string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Operand {
    pub name: String,
    pub value_type: ValueType,
}

impl Operand {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.name,
            crate::parse::VALUE_TYPE_DELIM,
            self.value_type
        )
    }
}

/// Scalar result tagged with the name it is published under.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarValue {
    pub name: String,
    pub value: f64,
}

impl ScalarValue {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Matrix(Arc<MatrixValue>),
    Scalar(ScalarValue),
}

impl Value {
    #[inline]
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Matrix(_) => DataType::Matrix,
            Self::Scalar(_) => DataType::Scalar,
        }
    }

    pub fn as_matrix(&self) -> Option<&Arc<MatrixValue>> {
        match self {
            Self::Matrix(mb) => Some(mb),
            Self::Scalar(_) => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&ScalarValue> {
        match self {
            Self::Scalar(s) => Some(s),
            Self::Matrix(_) => None,
        }
    }
}

impl From<MatrixValue> for Value {
    fn from(mb: MatrixValue) -> Self {
        Self::Matrix(Arc::new(mb))
    }
}

impl From<ScalarValue> for Value {
    fn from(s: ScalarValue) -> Self {
        Self::Scalar(s)
    }
}
