use crate::context::ExecutionContext;
use crate::error::{ExecError, ParseError, ProgramError};
use crate::instruction::UaggOuterChainInstruction;
use crate::ops::UAGG_OUTER_CHAIN_OPCODE;
use crate::parse::instruction_parts;
use std::fmt;

const COMMENT_PREFIX: char = '#';

pub trait Executor {
    fn execute(&self, ec: &ExecutionContext) -> Result<(), ExecError>;
}

/// Closed set of instruction families understood by this engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    UaggOuterChain(UaggOuterChainInstruction),
}

impl Instruction {
    /// Dispatches on the opcode field of `istr`.
    pub fn parse(istr: &str) -> Result<Self, ParseError> {
        let parts = instruction_parts(istr)?;
        let opcode = parts[0];
        if opcode.eq_ignore_ascii_case(UAGG_OUTER_CHAIN_OPCODE) {
            UaggOuterChainInstruction::parse(istr).map(Self::UaggOuterChain)
        } else {
            Err(ParseError::UnknownOpcode {
                opcode: opcode.to_string(),
            })
        }
    }

    #[inline]
    pub fn opcode(&self) -> &'static str {
        match self {
            Self::UaggOuterChain(instr) => instr.opcode(),
        }
    }

    pub fn process(&self, ec: &ExecutionContext) -> Result<(), ExecError> {
        match self {
            Self::UaggOuterChain(instr) => instr.process(ec),
        }
    }
}

impl Executor for Instruction {
    fn execute(&self, ec: &ExecutionContext) -> Result<(), ExecError> {
        self.process(ec)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UaggOuterChain(instr) => instr.fmt(f),
        }
    }
}

/// Straight-line instruction listing, one instruction per line. Blank lines
/// and lines starting with `#` are skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    instructions: Vec<Instruction>,
}

impl Program {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    pub fn parse(listing: &str) -> Result<Self, ProgramError> {
        let mut instructions = Vec::new();
        for (idx, raw) in listing.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with(COMMENT_PREFIX) {
                continue;
            }
            let instr = Instruction::parse(line).map_err(|source| ProgramError::Parse {
                line: idx + 1,
                source,
            })?;
            instructions.push(instr);
        }
        log::debug!("parsed program with {} instruction(s)", instructions.len());
        Ok(Self { instructions })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Runs every instruction in order, stopping at the first failure.
    pub fn run(&self, ec: &ExecutionContext) -> Result<(), ProgramError> {
        for (index, instr) in self.instructions.iter().enumerate() {
            instr.execute(ec).map_err(|source| {
                log::debug!("aborting program at instruction {index}: {source}");
                ProgramError::Exec {
                    index,
                    instruction: instr.to_string(),
                    source,
                }
            })?;
        }
        Ok(())
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for instr in &self.instructions {
            writeln!(f, "{instr}")?;
        }
        Ok(())
    }
}
