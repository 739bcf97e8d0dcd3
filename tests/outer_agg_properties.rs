//! Property-based tests for the fused outer-aggregate instruction:
//! - role-swap invariance of the kernel
//! - correction slots never reach published outputs
//! - parse / re-serialize round trip
//! - pin balance after every run
//! - sums and means over infinities, NaN and division by zero

use proptest::prelude::*;

use uagg_engine::ops::{
    outer_aggregate, AggregateUnaryOperator, BinaryOperator, Direction, OperatorCatalog,
    Orientation,
};
use uagg_engine::{ExecConfig, ExecutionContext, MatrixValue, UaggOuterChainInstruction, Value};

const SAFE_BINARY_TOKENS: &[&str] = &[
    "+", "-", "*", "min", "max", "<", "<=", ">", ">=", "==", "!=", "&&", "||",
];

const ARITH_BINARY_TOKENS: &[&str] = &["+", "-", "*", "/", "^", "%%", "%/%", "min", "max"];

fn arb_cell() -> impl Strategy<Value = f64> {
    // half steps produce plenty of ties for the comparison operators
    (-6_i32..=6).prop_map(|v| f64::from(v) / 2.0)
}

/// Half steps mixed with zeros and non-finite cells.
fn arb_wide_cell() -> impl Strategy<Value = f64> {
    prop_oneof![
        4 => arb_cell(),
        2 => Just(0.0),
        1 => Just(f64::INFINITY),
        1 => Just(f64::NEG_INFINITY),
        1 => Just(f64::NAN),
    ]
}

fn arb_wide_vector(len: std::ops::Range<usize>) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(arb_wide_cell(), len)
}

/// Sum by classification: NaN wins, opposite infinities give NaN, one signed
/// infinity saturates, otherwise the plain sum.
fn reference_sum(values: &[f64]) -> f64 {
    if values.iter().any(|v| v.is_nan()) {
        return f64::NAN;
    }
    let pos = values.iter().any(|v| *v == f64::INFINITY);
    let neg = values.iter().any(|v| *v == f64::NEG_INFINITY);
    match (pos, neg) {
        (true, true) => f64::NAN,
        (true, false) => f64::INFINITY,
        (false, true) => f64::NEG_INFINITY,
        (false, false) => values.iter().sum(),
    }
}

fn assert_close(got: f64, want: f64, values: &[f64]) -> Result<(), TestCaseError> {
    if want.is_nan() || want.is_infinite() {
        prop_assert!(
            got.to_bits() == want.to_bits() || (got.is_nan() && want.is_nan()),
            "got {} want {} over {:?}",
            got,
            want,
            values
        );
    } else {
        let scale: f64 = values.iter().map(|v| v.abs()).sum();
        prop_assert!(
            (got - want).abs() <= 1e-9 * (1.0 + scale),
            "got {} want {} over {:?}",
            got,
            want,
            values
        );
    }
    Ok(())
}

fn arb_matrix(rows: usize, cols: usize) -> impl Strategy<Value = MatrixValue> {
    prop::collection::vec(arb_cell(), rows * cols)
        .prop_map(move |values| MatrixValue::from_dense(rows, cols, values).expect("sized"))
}

/// Operand pairs that broadcast: a column against a row, or a matrix against
/// a row vector.
fn arb_operands() -> impl Strategy<Value = (MatrixValue, MatrixValue)> {
    (1_usize..7, 1_usize..7, any::<bool>()).prop_flat_map(|(m, n, outer)| {
        let lhs_cols = if outer { 1 } else { n };
        (arb_matrix(m, lhs_cols), arb_matrix(1, n))
    })
}

fn arb_binary_token() -> impl Strategy<Value = &'static str> {
    prop::sample::select(SAFE_BINARY_TOKENS)
}

fn arb_uagg_token() -> impl Strategy<Value = &'static str> {
    let tokens: Vec<&'static str> = OperatorCatalog::uagg_metas().iter().map(|m| m.token).collect();
    prop::sample::select(tokens)
}

fn bits(mb: &MatrixValue) -> Vec<u64> {
    mb.dense_values().iter().map(|v| v.to_bits()).collect()
}

proptest! {
    #[test]
    fn role_swap_does_not_change_result(
        (a, b) in arb_operands(),
        bop in arb_binary_token(),
        uagg in arb_uagg_token(),
        fast in any::<bool>(),
    ) {
        let bop = BinaryOperator::parse(bop).expect("catalog token");
        let uagg = AggregateUnaryOperator::parse(uagg).expect("catalog token");
        let plain = outer_aggregate(&a, &b, Orientation::NotSwapped, &bop, &uagg, fast)
            .expect("shapes broadcast");
        let swapped = outer_aggregate(&b, &a, Orientation::Swapped, &bop, &uagg, fast)
            .expect("shapes broadcast");
        prop_assert_eq!(plain.shape(), swapped.shape());
        prop_assert_eq!(bits(&plain), bits(&swapped));
    }

    #[test]
    fn published_output_has_logical_shape_and_pins_balance(
        (a, b) in arb_operands(),
        bop in arb_binary_token(),
        uagg in arb_uagg_token(),
    ) {
        let (m, n) = (a.rows(), b.cols());
        let ctx = ExecutionContext::with_config(ExecConfig::default());
        ctx.publish_matrix("A", a);
        ctx.publish_matrix("B", b);
        let istr = format!("uaggouterchain°{uagg}°{bop}°A:double°B:double°out:double");
        let instr = UaggOuterChainInstruction::parse(&istr).expect("valid instruction");
        instr.process(&ctx).expect("process should succeed");

        match (instr.uagg_op().direction, ctx.get("out").expect("published")) {
            (Direction::All, Value::Scalar(_)) => {}
            (direction, Value::Matrix(out)) => {
                prop_assert_ne!(direction, Direction::All);
                prop_assert_eq!(out.shape(), direction.output_shape(m, n));
            }
            (direction, other) => prop_assert!(false, "{:?} published {:?}", direction, other),
        }
        prop_assert_eq!(ctx.pin_count("A"), Some(0));
        prop_assert_eq!(ctx.pin_count("B"), Some(0));
    }

    #[test]
    fn reserialized_instruction_round_trips(
        uagg in arb_uagg_token(),
        bop in arb_binary_token(),
        cellwise in any::<bool>(),
        names in prop::collection::vec("[A-Za-z_][A-Za-z0-9_]{0,7}", 3),
        vt in prop::sample::select(vec!["double", "int", "boolean", "string"]),
        with_prefix in any::<bool>(),
    ) {
        let bop = if cellwise { format!("{bop}:cellwise") } else { bop.to_string() };
        let prefix = if with_prefix { "CP°" } else { "" };
        let istr = format!(
            "{prefix}uaggouterchain°{uagg}°{bop}°{}:double°{}:double°{}:{vt}",
            names[0], names[1], names[2]
        );
        let instr = UaggOuterChainInstruction::parse(&istr).expect("valid instruction");
        let reparsed = UaggOuterChainInstruction::parse(&instr.to_string()).expect("canonical form");
        prop_assert_eq!(&reparsed, &instr);
        prop_assert_eq!(reparsed.to_string(), instr.to_string());
    }

    #[test]
    fn sums_and_means_follow_non_finite_reference(
        a in arb_wide_vector(1..6),
        b in arb_wide_vector(1..6),
        bop in prop::sample::select(ARITH_BINARY_TOKENS),
    ) {
        let (m, n) = (a.len(), b.len());
        let func = BinaryOperator::parse(bop).expect("catalog token").func;
        let cells: Vec<f64> = a
            .iter()
            .flat_map(|x| b.iter().map(move |y| func.apply(*x, *y)))
            .collect();

        let ctx = ExecutionContext::new();
        ctx.publish_matrix("A", MatrixValue::from_dense(m, 1, a).expect("column"));
        ctx.publish_matrix("B", MatrixValue::from_dense(1, n, b).expect("row"));
        let run = |uagg: &str, out: &str| {
            let istr = format!("uaggouterchain°{uagg}°{bop}°A:double°B:double°{out}:double");
            UaggOuterChainInstruction::parse(&istr)
                .expect("valid instruction")
                .process(&ctx)
                .expect("process should succeed");
        };

        run("uak+", "s");
        let total = ctx.get_scalar("s").expect("scalar").value;
        assert_close(total, reference_sum(&cells), &cells)?;

        run("uamean", "mu");
        let mean = ctx.get_scalar("mu").expect("scalar").value;
        assert_close(mean, reference_sum(&cells) / cells.len() as f64, &cells)?;

        run("uark+", "r");
        let rows = ctx.get("r").and_then(|v| v.as_matrix().cloned()).expect("matrix");
        for (i, row) in cells.chunks(n).enumerate() {
            assert_close(rows.get(i, 0), reference_sum(row), row)?;
        }
        prop_assert_eq!(ctx.pin_count("A"), Some(0));
        prop_assert_eq!(ctx.pin_count("B"), Some(0));
    }
}
