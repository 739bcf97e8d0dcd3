//! Fused `uagg(outer(A, B, op))` kernel.
//!
//! The generic path materializes nothing: each logical cell of the broadcast
//! combination is folded straight into the aggregation buffer. Comparison
//! operators under a sum reduce to counting, which the fast path answers
//! with one sort of the outer vector and a binary search per base value.

use crate::error::ExecError;
use crate::matrix::MatrixValue;
use crate::ops::{
    AggFn, AggregateOperator, AggregateUnaryOperator, AggregationBuffer, AggCell, BinaryFn,
    BinaryOperator, CombineRule, Direction, Orientation, UAGG_OUTER_CHAIN_OPCODE,
};

/// Whether `(bop, agg)` has a specialized counting implementation.
#[inline]
pub fn is_supported_fast_path(bop: &BinaryOperator, agg_op: &AggregateOperator) -> bool {
    bop.func.is_comparison() && agg_op.func == AggFn::Sum
}

/// Picks which operand plays the base role. Column-wise and full reductions,
/// and every combination without a fast path, keep operand 1 as base.
#[inline]
pub fn choose_orientation(
    direction: Direction,
    bop: &BinaryOperator,
    agg_op: &AggregateOperator,
) -> Orientation {
    if matches!(direction, Direction::ToColumn | Direction::All)
        || !is_supported_fast_path(bop, agg_op)
    {
        Orientation::NotSwapped
    } else {
        Orientation::Swapped
    }
}

/// Computes the fused aggregate of `operand1 (bop) operand2`, given the
/// operands in their base/outer roles. The returned buffer still carries the
/// correction rows/columns of the aggregate operator.
pub fn outer_aggregate(
    base: &MatrixValue,
    outer: &MatrixValue,
    orientation: Orientation,
    bop: &BinaryOperator,
    uagg: &AggregateUnaryOperator,
    allow_fast_path: bool,
) -> Result<MatrixValue, ExecError> {
    let (lhs, rhs) = match orientation {
        Orientation::NotSwapped => (base, outer),
        Orientation::Swapped => (outer, base),
    };
    let (rows, cols) =
        bop.output_shape(lhs.shape(), rhs.shape())
            .ok_or(ExecError::ShapeMismatch {
                opcode: UAGG_OUTER_CHAIN_OPCODE,
                rule: bop.rule.as_str(),
                lhs_rows: lhs.rows(),
                lhs_cols: lhs.cols(),
                rhs_rows: rhs.rows(),
                rhs_cols: rhs.cols(),
            })?;

    let mut buffer = AggregationBuffer::new(uagg, rows, cols);
    if allow_fast_path && fast_path_applies(lhs, rhs, orientation, bop, uagg) {
        log::trace!(
            "{UAGG_OUTER_CHAIN_OPCODE}: sorted fast path {}x{} {} {:?}",
            rows,
            cols,
            bop,
            orientation
        );
        let base_values = base.dense_values();
        let mut sorted = outer.dense_values().into_owned();
        sorted.sort_by(f64::total_cmp);
        // counting op(outer, base) is counting op.swapped()(base, outer)
        let func = match orientation {
            Orientation::NotSwapped => bop.func,
            Orientation::Swapped => bop.func.swapped(),
        };
        let mut total = 0_u64;
        for (idx, &x) in base_values.iter().enumerate() {
            let count = count_matches(func, x, &sorted);
            match uagg.direction {
                Direction::All => total += count,
                Direction::ToColumn => buffer.store(idx, 0, counted_cell(count)),
                Direction::ToRow => buffer.store(0, idx, counted_cell(count)),
            }
        }
        if uagg.direction == Direction::All {
            buffer.store(0, 0, counted_cell(total));
        }
        return Ok(buffer.finish());
    }

    log::trace!(
        "{UAGG_OUTER_CHAIN_OPCODE}: generic path {}x{} {} {}",
        rows,
        cols,
        bop,
        uagg
    );
    let lhs_values = lhs.dense_values();
    let rhs_values = rhs.dense_values();
    for row in 0..rows {
        let lr = if lhs.rows() == 1 { 0 } else { row };
        let rr = if rhs.rows() == 1 { 0 } else { row };
        for col in 0..cols {
            let lc = if lhs.cols() == 1 { 0 } else { col };
            let rc = if rhs.cols() == 1 { 0 } else { col };
            let x = bop.apply(
                lhs_values[lr * lhs.cols() + lc],
                rhs_values[rr * rhs.cols() + rc],
            );
            buffer.fold(row, col, x);
        }
    }
    Ok(buffer.finish())
}

/// The counting path needs a true outer pair (operand 1 a column vector,
/// operand 2 a row vector), NaN-free inputs, and an orientation whose base
/// vector lines up with the output cells.
fn fast_path_applies(
    lhs: &MatrixValue,
    rhs: &MatrixValue,
    orientation: Orientation,
    bop: &BinaryOperator,
    uagg: &AggregateUnaryOperator,
) -> bool {
    if !is_supported_fast_path(bop, &uagg.agg_op) || bop.rule != CombineRule::Broadcast {
        return false;
    }
    if lhs.cols() != 1 || rhs.rows() != 1 {
        return false;
    }
    let aligned = match orientation {
        Orientation::NotSwapped => matches!(uagg.direction, Direction::All | Direction::ToColumn),
        Orientation::Swapped => uagg.direction == Direction::ToRow,
    };
    aligned && !has_nan(lhs) && !has_nan(rhs)
}

#[inline]
fn has_nan(mb: &MatrixValue) -> bool {
    mb.dense_values().iter().any(|v| v.is_nan())
}

#[inline]
fn counted_cell(count: u64) -> AggCell {
    AggCell {
        value: count as f64,
        aux: [0.0, 0.0],
    }
}

/// Number of `s` in `sorted` with `func(x, s) != 0`.
fn count_matches(func: BinaryFn, x: f64, sorted: &[f64]) -> u64 {
    let n = sorted.len();
    let below = || sorted.partition_point(|s| *s < x);
    let below_or_eq = || sorted.partition_point(|s| *s <= x);
    let count = match func {
        BinaryFn::LessThan => n - below_or_eq(),
        BinaryFn::LessThanEquals => n - below(),
        BinaryFn::GreaterThan => below(),
        BinaryFn::GreaterThanEquals => below_or_eq(),
        BinaryFn::Equals => below_or_eq() - below(),
        BinaryFn::NotEquals => n - (below_or_eq() - below()),
        _ => unreachable!("fast path only admits comparisons"),
    };
    count as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(values: &[f64]) -> MatrixValue {
        MatrixValue::from_dense(values.len(), 1, values.to_vec()).expect("column")
    }

    fn row(values: &[f64]) -> MatrixValue {
        MatrixValue::from_dense(1, values.len(), values.to_vec()).expect("row")
    }

    fn run(
        a: &MatrixValue,
        b: &MatrixValue,
        bop: &str,
        uagg: &str,
        orientation: Orientation,
        fast: bool,
    ) -> MatrixValue {
        let bop = BinaryOperator::parse(bop).expect("bop");
        let uagg = AggregateUnaryOperator::parse(uagg).expect("uagg");
        let (base, outer) = match orientation {
            Orientation::NotSwapped => (a, b),
            Orientation::Swapped => (b, a),
        };
        outer_aggregate(base, outer, orientation, &bop, &uagg, fast).expect("kernel")
    }

    #[test]
    fn orientation_swaps_only_for_column_aggregates_with_fast_path() {
        let lt = BinaryOperator::parse("<").expect("bop");
        let mul = BinaryOperator::parse("*").expect("bop");
        let sum = AggregateUnaryOperator::parse("uack+").expect("uagg").agg_op;
        let max = AggregateUnaryOperator::parse("uacmax").expect("uagg").agg_op;
        assert_eq!(
            choose_orientation(Direction::ToRow, &lt, &sum),
            Orientation::Swapped
        );
        assert_eq!(
            choose_orientation(Direction::ToColumn, &lt, &sum),
            Orientation::NotSwapped
        );
        assert_eq!(
            choose_orientation(Direction::All, &lt, &sum),
            Orientation::NotSwapped
        );
        assert_eq!(
            choose_orientation(Direction::ToRow, &mul, &sum),
            Orientation::NotSwapped
        );
        assert_eq!(
            choose_orientation(Direction::ToRow, &lt, &max),
            Orientation::NotSwapped
        );
    }

    #[test]
    fn count_matches_agrees_with_direct_comparison() {
        let sorted = [-1.0, 0.0, 0.0, 2.5, 3.0];
        let funcs = [
            BinaryFn::LessThan,
            BinaryFn::LessThanEquals,
            BinaryFn::GreaterThan,
            BinaryFn::GreaterThanEquals,
            BinaryFn::Equals,
            BinaryFn::NotEquals,
        ];
        for func in funcs {
            for x in [-2.0, -1.0, 0.0, 1.0, 3.0, 4.0] {
                let direct = sorted.iter().filter(|s| func.apply(x, **s) != 0.0).count() as u64;
                assert_eq!(count_matches(func, x, &sorted), direct, "{func:?} x={x}");
            }
        }
    }

    #[test]
    fn fast_and_generic_paths_agree_for_row_sums() {
        let a = column(&[3.0, 1.0, 2.0, 2.0]);
        let b = row(&[2.0, 0.5, 3.0]);
        let fast = run(&a, &b, "<", "uark+", Orientation::NotSwapped, true);
        let slow = run(&a, &b, "<", "uark+", Orientation::NotSwapped, false);
        assert_eq!(fast, slow);
        assert_eq!(fast.shape(), (4, 2));
        assert_eq!(fast.get(0, 0), 0.0);
        assert_eq!(fast.get(1, 0), 2.0);
        assert_eq!(fast.get(2, 0), 1.0);
    }

    #[test]
    fn swapped_column_sums_match_unswapped_generic_path() {
        let a = column(&[3.0, 1.0, 2.0, 2.0]);
        let b = row(&[2.0, 0.5, 3.0]);
        for op in ["<", "<=", ">", ">=", "==", "!="] {
            let swapped = run(&a, &b, op, "uack+", Orientation::Swapped, true);
            let plain = run(&a, &b, op, "uack+", Orientation::NotSwapped, false);
            assert_eq!(swapped, plain, "op {op}");
        }
        let ge = run(&a, &b, ">=", "uack+", Orientation::Swapped, true);
        // a >= 2.0: {3,2,2}; a >= 0.5: all; a >= 3.0: {3}
        assert_eq!(ge.get(0, 0), 3.0);
        assert_eq!(ge.get(0, 1), 4.0);
        assert_eq!(ge.get(0, 2), 1.0);
    }

    #[test]
    fn nan_inputs_fall_back_to_generic_path() {
        let a = column(&[f64::NAN, 1.0]);
        let b = row(&[0.0, 2.0]);
        let out = run(&a, &b, "!=", "uak+", Orientation::NotSwapped, true);
        // NaN != x holds for both cells of the first row
        assert_eq!(out.get(0, 0), 4.0);
    }

    #[test]
    fn incompatible_shapes_are_rejected() {
        let a = MatrixValue::filled(2, 3, 1.0);
        let b = MatrixValue::filled(3, 2, 1.0);
        let bop = BinaryOperator::parse("*").expect("bop");
        let uagg = AggregateUnaryOperator::parse("uak+").expect("uagg");
        let err = outer_aggregate(&a, &b, Orientation::NotSwapped, &bop, &uagg, true)
            .expect_err("shape mismatch");
        assert!(matches!(
            err,
            ExecError::ShapeMismatch {
                lhs_rows: 2,
                lhs_cols: 3,
                rhs_rows: 3,
                rhs_cols: 2,
                ..
            }
        ));
    }
}
