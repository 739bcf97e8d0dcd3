use crate::context::ExecutionContext;
use crate::error::{ExecError, ParseError};
use crate::ops::{
    choose_orientation, outer_aggregate, AggregateOperator, AggregateUnaryOperator,
    BinaryOperator, Direction, Orientation, UAGG_OUTER_CHAIN_OPCODE,
};
use crate::parse::{check_field_count, instruction_parts, join_fields, parse_operand};
use crate::types::{Operand, ScalarValue, ValueType};
use std::fmt;

const OPERAND_FIELDS: usize = 5;

/// Fused `uagg(outer(in1, in2, bop))` instruction.
///
/// Wire form: `uaggouterchain°<uagg>°<bop>°<in1>°<in2>°<out>`. Parsed once and
/// immutable afterwards; [`process`](Self::process) may be replayed.
#[derive(Debug, Clone)]
pub struct UaggOuterChainInstruction {
    uagg_op: AggregateUnaryOperator,
    bop: BinaryOperator,
    input1: Operand,
    input2: Operand,
    output: Operand,
    instr_str: String,
}

impl UaggOuterChainInstruction {
    pub fn new(
        uagg_op: AggregateUnaryOperator,
        bop: BinaryOperator,
        input1: Operand,
        input2: Operand,
        output: Operand,
    ) -> Self {
        let mut instr = Self {
            uagg_op,
            bop,
            input1,
            input2,
            output,
            instr_str: String::new(),
        };
        instr.instr_str = instr.to_string();
        instr
    }

    pub fn parse(istr: &str) -> Result<Self, ParseError> {
        let parts = instruction_parts(istr)?;
        let opcode = parts[0];
        if !opcode.eq_ignore_ascii_case(UAGG_OUTER_CHAIN_OPCODE) {
            return Err(ParseError::UnknownOpcode {
                opcode: opcode.to_string(),
            });
        }
        check_field_count(&parts, OPERAND_FIELDS)?;

        // the aggregate operator and its correction slots derive from the uagg token
        let uagg_op = AggregateUnaryOperator::parse(parts[1])?;
        let bop = BinaryOperator::parse(parts[2])?;
        let input1 = parse_operand(parts[3])?;
        let input2 = parse_operand(parts[4])?;
        let output = parse_operand(parts[5])?;
        log::debug!(
            "parsed {UAGG_OUTER_CHAIN_OPCODE}: uagg={} aggop={} correction={:?} bop={}",
            uagg_op,
            uagg_op.agg_op.opcode(),
            uagg_op.agg_op.correction,
            bop
        );
        Ok(Self {
            uagg_op,
            bop,
            input1,
            input2,
            output,
            instr_str: istr.to_string(),
        })
    }

    #[inline]
    pub fn opcode(&self) -> &'static str {
        UAGG_OUTER_CHAIN_OPCODE
    }

    #[inline]
    pub fn uagg_op(&self) -> &AggregateUnaryOperator {
        &self.uagg_op
    }

    #[inline]
    pub fn agg_op(&self) -> &AggregateOperator {
        &self.uagg_op.agg_op
    }

    #[inline]
    pub fn binary_op(&self) -> &BinaryOperator {
        &self.bop
    }

    #[inline]
    pub fn input1(&self) -> &Operand {
        &self.input1
    }

    #[inline]
    pub fn input2(&self) -> &Operand {
        &self.input2
    }

    #[inline]
    pub fn output(&self) -> &Operand {
        &self.output
    }

    /// Instruction string as originally parsed.
    #[inline]
    pub fn instruction_string(&self) -> &str {
        &self.instr_str
    }

    #[inline]
    pub fn orientation(&self) -> Orientation {
        choose_orientation(self.uagg_op.direction, &self.bop, &self.uagg_op.agg_op)
    }

    /// Runs the instruction: pin both inputs, compute, unpin, strip the
    /// correction slots, then publish a scalar or matrix under the output name.
    pub fn process(&self, ec: &ExecutionContext) -> Result<(), ExecError> {
        let opcode = self.opcode();
        let orientation = self.orientation();
        let (base_name, outer_name) = match orientation {
            Orientation::NotSwapped => (&self.input1.name, &self.input2.name),
            Orientation::Swapped => (&self.input2.name, &self.input1.name),
        };

        let base = ec
            .pin_matrix(base_name)
            .map_err(|e| ExecError::context(opcode, e))?;
        let outer = ec
            .pin_matrix(outer_name)
            .map_err(|e| ExecError::context(opcode, e))?;

        let computed = outer_aggregate(
            &base,
            &outer,
            orientation,
            &self.bop,
            &self.uagg_op,
            ec.config().fast_path,
        );

        // unpin before building the output so its memory can reuse the inputs' slots
        base.release().map_err(|e| ExecError::context(opcode, e))?;
        outer.release().map_err(|e| ExecError::context(opcode, e))?;

        let mut out = computed?;
        let agg_op = self.uagg_op.agg_op;
        if agg_op.correction_exists() {
            out.drop_last_rows_or_columns(agg_op.correction);
        }

        let output_name = &self.output.name;
        if self.uagg_op.direction == Direction::All {
            let value = match self.output.value_type {
                ValueType::Double => out.get(0, 0),
                other => {
                    return Err(ExecError::UnsupportedOutputType {
                        opcode,
                        output: output_name.clone(),
                        value_type: other,
                    })
                }
            };
            ec.publish_scalar(ScalarValue::new(output_name.clone(), value));
        } else {
            out.exam_sparsity(ec.config().sparsity_turn_point);
            ec.publish_matrix(output_name.clone(), out);
        }

        if ec.config().trace {
            log::debug!("processed `{self}` ({orientation:?})");
        }
        Ok(())
    }
}

// the retained source string is diagnostic only
impl PartialEq for UaggOuterChainInstruction {
    fn eq(&self, other: &Self) -> bool {
        self.uagg_op == other.uagg_op
            && self.bop == other.bop
            && self.input1 == other.input1
            && self.input2 == other.input2
            && self.output == other.output
    }
}

impl fmt::Display for UaggOuterChainInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&join_fields([
            UAGG_OUTER_CHAIN_OPCODE.to_string(),
            self.uagg_op.to_string(),
            self.bop.to_string(),
            self.input1.to_string(),
            self.input2.to_string(),
            self.output.to_string(),
        ]))
    }
}
