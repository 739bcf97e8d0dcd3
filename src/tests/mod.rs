use crate::config::ExecConfig;
use crate::context::ExecutionContext;
use crate::error::{ContextError, ExecError, ParseError};
use crate::instruction::UaggOuterChainInstruction;
use crate::matrix::MatrixValue;
use crate::ops::{CorrectionLocation, Direction, Orientation};
use crate::runtime::{Instruction, Program};
use crate::types::{Value, ValueType};


fn uagg_instr(uagg: &str, bop: &str, in1: &str, in2: &str, out: &str) -> String {
    format!("CP°uaggouterchain°{uagg}°{bop}°{in1}:double°{in2}:double°{out}")
}

fn ones_and_twos_ctx() -> ExecutionContext {
    let ctx = ExecutionContext::new();
    ctx.publish_matrix("A", MatrixValue::filled(2, 3, 1.0));
    ctx.publish_matrix(
        "B",
        MatrixValue::from_rows(&[vec![2.0, 2.0, 2.0]]).expect("row vector"),
    );
    ctx
}

fn outer_vectors_ctx(config: ExecConfig) -> ExecutionContext {
    let ctx = ExecutionContext::with_config(config);
    ctx.publish_matrix(
        "X",
        MatrixValue::from_dense(5, 1, vec![0.5, 3.0, -1.0, 2.0, 2.0]).expect("column"),
    );
    ctx.publish_matrix(
        "Y",
        MatrixValue::from_dense(1, 4, vec![2.0, 0.0, 4.0, -3.0]).expect("row"),
    );
    ctx
}

fn scalar_output(ctx: &ExecutionContext, name: &str) -> f64 {
    ctx.get_scalar(name).expect("scalar output").value
}

fn matrix_output(ctx: &ExecutionContext, name: &str) -> MatrixValue {
    match ctx.get(name).expect("output bound") {
        Value::Matrix(mb) => mb.as_ref().clone(),
        Value::Scalar(s) => panic!("expected matrix output, got scalar {s:?}"),
    }
}

fn approx_eq(lhs: f64, rhs: f64) -> bool {
    (lhs.is_nan() && rhs.is_nan()) || (lhs - rhs).abs() < 1e-9
}
