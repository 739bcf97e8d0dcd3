use crate::error::ParseError;
use crate::matrix::MatrixValue;
use crate::ops::{AggFn, CorrectionLocation, Direction, OperatorCatalog};
use std::fmt;

/// Accumulation function plus the location of its auxiliary values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AggregateOperator {
    pub func: AggFn,
    pub correction: CorrectionLocation,
}

impl AggregateOperator {
    #[inline]
    pub const fn correction_exists(&self) -> bool {
        self.correction.exists()
    }

    #[inline]
    pub const fn opcode(&self) -> &'static str {
        self.func.opcode()
    }

    /// Empty accumulation cell.
    #[inline]
    pub fn init_cell(&self) -> AggCell {
        match self.func {
            AggFn::Sum | AggFn::SumSq | AggFn::Mean => AggCell::default(),
            AggFn::Max => AggCell::with_value(f64::NEG_INFINITY),
            AggFn::Min => AggCell::with_value(f64::INFINITY),
            AggFn::MaxIndex => AggCell {
                value: 0.0,
                aux: [f64::NEG_INFINITY, 0.0],
            },
            AggFn::MinIndex => AggCell {
                value: 0.0,
                aux: [f64::INFINITY, 0.0],
            },
        }
    }

    /// Folds `x` into `cell`. `position` is the 1-based column of `x`, used by
    /// the index aggregates only.
    #[inline]
    pub fn accumulate(&self, cell: &mut AggCell, x: f64, position: usize) {
        match self.func {
            AggFn::Sum => kahan_add(&mut cell.value, &mut cell.aux[0], x),
            AggFn::SumSq => kahan_add(&mut cell.value, &mut cell.aux[0], x * x),
            AggFn::Mean => {
                cell.aux[0] += 1.0;
                if x.is_infinite() || cell.value.is_infinite() {
                    // an infinite mean only changes on a non-finite term
                    if !x.is_finite() {
                        cell.value += x;
                    }
                    cell.aux[1] = 0.0;
                    return;
                }
                let delta = (x - cell.value) / cell.aux[0];
                kahan_add(&mut cell.value, &mut cell.aux[1], delta);
            }
            AggFn::Max => {
                if x.is_nan() || x > cell.value {
                    cell.value = x;
                }
            }
            AggFn::Min => {
                if x.is_nan() || x < cell.value {
                    cell.value = x;
                }
            }
            AggFn::MaxIndex => track_index(cell, x, position, |x, best| x > best),
            AggFn::MinIndex => track_index(cell, x, position, |x, best| x < best),
        }
    }

    #[inline]
    fn finalize(&self, cell: &mut AggCell) {
        if self.func == AggFn::Mean && cell.aux[0] == 0.0 {
            cell.value = f64::NAN;
        }
    }
}

/// Two-sum compensated addition: `corr` carries the rounding error of the
/// previous step into the next one.
#[inline]
pub fn kahan_add(sum: &mut f64, corr: &mut f64, x: f64) {
    let corrected = x + *corr;
    let next = *sum + corrected;
    if corrected.is_infinite() || next.is_infinite() {
        // no compensation across infinities: inf - inf would poison `corr`
        *sum += x;
        *corr = 0.0;
        return;
    }
    *corr = corrected - (next - *sum);
    *sum = next;
}

/// Index slot 0 marks a row with no cell seen yet, so the first column always
/// claims the index. After that the first occurrence wins and a NaN never
/// displaces a number.
#[inline]
fn track_index(cell: &mut AggCell, x: f64, position: usize, better: impl Fn(f64, f64) -> bool) {
    let best = cell.aux[0];
    let unseen = cell.value == 0.0;
    if unseen || (!x.is_nan() && (best.is_nan() || better(x, best))) {
        cell.aux[0] = x;
        cell.value = position as f64;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AggCell {
    pub value: f64,
    pub aux: [f64; 2],
}

impl AggCell {
    #[inline]
    const fn with_value(value: f64) -> Self {
        Self {
            value,
            aux: [0.0, 0.0],
        }
    }
}

/// Reduction direction wrapping an aggregate operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AggregateUnaryOperator {
    pub token: &'static str,
    pub direction: Direction,
    pub agg_op: AggregateOperator,
}

impl AggregateUnaryOperator {
    /// Parses a unary-aggregate token and derives its aggregate operator.
    pub fn parse(token: &str) -> Result<Self, ParseError> {
        let meta = OperatorCatalog::uagg(token).ok_or_else(|| ParseError::UnknownOperator {
            token: token.to_string(),
            expected: "unary aggregate (e.g. `uak+`, `uark+`, `uacmax`)",
        })?;
        Ok(Self {
            token: meta.token,
            direction: meta.direction,
            agg_op: AggregateOperator {
                func: meta.agg,
                correction: meta.correction,
            },
        })
    }
}

impl fmt::Display for AggregateUnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token)
    }
}

pub fn derive_aggregate_opcode(uagg_token: &str) -> Option<&'static str> {
    OperatorCatalog::uagg(uagg_token).map(|meta| meta.agg.opcode())
}

pub fn derive_correction_location(uagg_token: &str) -> Option<CorrectionLocation> {
    OperatorCatalog::uagg(uagg_token).map(|meta| meta.correction)
}

/// Dense result buffer with the correction rows/columns appended after the
/// logical output, as laid out by the operator's `CorrectionLocation`.
#[derive(Debug)]
pub struct AggregationBuffer {
    op: AggregateOperator,
    direction: Direction,
    out_rows: usize,
    out_cols: usize,
    buffer: MatrixValue,
}

impl AggregationBuffer {
    pub fn new(uagg: &AggregateUnaryOperator, in_rows: usize, in_cols: usize) -> Self {
        let op = uagg.agg_op;
        let (out_rows, out_cols) = uagg.direction.output_shape(in_rows, in_cols);
        let (extra_rows, extra_cols) = op.correction.extra_dims();
        let mut out = Self {
            op,
            direction: uagg.direction,
            out_rows,
            out_cols,
            buffer: MatrixValue::zeros(out_rows + extra_rows, out_cols + extra_cols),
        };
        let init = op.init_cell();
        for row in 0..out_rows {
            for col in 0..out_cols {
                out.store(row, col, init);
            }
        }
        out
    }

    #[inline]
    pub fn logical_shape(&self) -> (usize, usize) {
        (self.out_rows, self.out_cols)
    }

    #[inline]
    fn buf_cols(&self) -> usize {
        self.out_cols + self.op.correction.extra_dims().1
    }

    #[inline]
    pub fn load(&self, row: usize, col: usize) -> AggCell {
        let mut cell = AggCell::with_value(self.buffer.get(row, col));
        for slot in 0..self.op.correction.slots() {
            let (r, c) = self
                .op
                .correction
                .slot_cell(row, col, self.out_rows, self.out_cols, slot);
            cell.aux[slot] = self.buffer.get(r, c);
        }
        cell
    }

    #[inline]
    pub fn store(&mut self, row: usize, col: usize, cell: AggCell) {
        let buf_cols = self.buf_cols();
        let (out_rows, out_cols) = (self.out_rows, self.out_cols);
        let correction = self.op.correction;
        let values = self.buffer.dense_values_mut();
        values[row * buf_cols + col] = cell.value;
        for slot in 0..correction.slots() {
            let (r, c) = correction.slot_cell(row, col, out_rows, out_cols, slot);
            values[r * buf_cols + c] = cell.aux[slot];
        }
    }

    /// Folds input cell `(row, col)` holding `x` into its output cell.
    #[inline]
    pub fn fold(&mut self, row: usize, col: usize, x: f64) {
        let (r, c) = self.direction.target(row, col);
        let mut cell = self.load(r, c);
        self.op.accumulate(&mut cell, x, col + 1);
        self.store(r, c, cell);
    }

    /// Returns the buffer, correction rows/columns still attached.
    pub fn finish(mut self) -> MatrixValue {
        for row in 0..self.out_rows {
            for col in 0..self.out_cols {
                let mut cell = self.load(row, col);
                self.op.finalize(&mut cell);
                self.store(row, col, cell);
            }
        }
        self.buffer.recompute_nnz();
        self.buffer
    }
}
