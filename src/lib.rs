pub mod config;
pub mod context;
pub mod error;
pub mod instruction;
pub mod matrix;
pub mod ops;
pub mod parse;
pub mod runtime;
pub mod types;

pub use config::ExecConfig;
pub use context::{ExecutionContext, PinnedMatrix};
pub use error::{ContextError, ExecError, MatrixError, ParseError, ProgramError};
pub use instruction::UaggOuterChainInstruction;
pub use matrix::MatrixValue;
pub use runtime::{Executor, Instruction, Program};
pub use types::{DataType, Operand, ScalarValue, Value, ValueType};

#[cfg(test)]
mod tests;
