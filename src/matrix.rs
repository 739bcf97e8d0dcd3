//! Two-dimensional `f64` buffers in dense (row-major) or sparse (CSR) layout.

use crate::error::MatrixError;
use crate::ops::CorrectionLocation;
use std::borrow::Cow;

const DENSE_CELL_BYTES: usize = 8;
// value + column index per nonzero
const SPARSE_NNZ_BYTES: usize = 16;
const SPARSE_ROW_PTR_BYTES: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct CsrStorage {
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
}

impl CsrStorage {
    fn empty(rows: usize) -> Self {
        Self {
            row_ptr: vec![0; rows + 1],
            col_idx: Vec::new(),
            values: Vec::new(),
        }
    }

    #[inline]
    fn row(&self, row: usize) -> (&[usize], &[f64]) {
        let (start, end) = (self.row_ptr[row], self.row_ptr[row + 1]);
        (&self.col_idx[start..end], &self.values[start..end])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Storage {
    Dense(Vec<f64>),
    Sparse(CsrStorage),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatrixValue {
    rows: usize,
    cols: usize,
    nnz: usize,
    storage: Storage,
}

impl MatrixValue {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            nnz: 0,
            storage: Storage::Dense(vec![0.0; rows * cols]),
        }
    }

    pub fn filled(rows: usize, cols: usize, value: f64) -> Self {
        let nnz = if value != 0.0 { rows * cols } else { 0 };
        Self {
            rows,
            cols,
            nnz,
            storage: Storage::Dense(vec![value; rows * cols]),
        }
    }

    /// Builds a dense matrix from row-major `values`.
    pub fn from_dense(rows: usize, cols: usize, values: Vec<f64>) -> Result<Self, MatrixError> {
        if values.len() != rows * cols {
            return Err(MatrixError::DimensionMismatch {
                rows,
                cols,
                len: values.len(),
            });
        }
        let nnz = count_nonzeros(&values);
        Ok(Self {
            rows,
            cols,
            nnz,
            storage: Storage::Dense(values),
        })
    }

    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self, MatrixError> {
        let cols = rows.first().map_or(0, |r| r.as_ref().len());
        let mut values = Vec::with_capacity(rows.len() * cols);
        for (idx, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != cols {
                return Err(MatrixError::RaggedRow {
                    row: idx,
                    expected: cols,
                    actual: row.len(),
                });
            }
            values.extend_from_slice(row);
        }
        Self::from_dense(rows.len(), cols, values)
    }

    /// Builds a sparse matrix from `(row, col, value)` triplets. Zero values are
    /// dropped and a later triplet for the same cell overwrites an earlier one.
    pub fn from_triplets(
        rows: usize,
        cols: usize,
        triplets: impl IntoIterator<Item = (usize, usize, f64)>,
    ) -> Result<Self, MatrixError> {
        let mut cells: Vec<(usize, usize, f64)> = Vec::new();
        for (row, col, value) in triplets {
            if row >= rows || col >= cols {
                return Err(MatrixError::OutOfBounds {
                    row,
                    col,
                    rows,
                    cols,
                });
            }
            cells.push((row, col, value));
        }
        // stable sort keeps insertion order among duplicates
        cells.sort_by_key(|&(row, col, _)| (row, col));
        cells.dedup_by(|later, earlier| {
            if later.0 == earlier.0 && later.1 == earlier.1 {
                earlier.2 = later.2;
                true
            } else {
                false
            }
        });

        let mut csr = CsrStorage::empty(rows);
        for &(row, col, value) in &cells {
            if value == 0.0 {
                continue;
            }
            csr.col_idx.push(col);
            csr.values.push(value);
            csr.row_ptr[row + 1] += 1;
        }
        for row in 0..rows {
            csr.row_ptr[row + 1] += csr.row_ptr[row];
        }
        Ok(Self {
            rows,
            cols,
            nnz: csr.values.len(),
            storage: Storage::Sparse(csr),
        })
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[inline]
    pub fn nnz(&self) -> usize {
        self.nnz
    }

    #[inline]
    pub fn is_sparse(&self) -> bool {
        matches!(self.storage, Storage::Sparse(_))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    #[inline]
    pub fn is_vector(&self) -> bool {
        self.rows == 1 || self.cols == 1
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn sparsity(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.nnz as f64 / self.rows as f64 / self.cols as f64
    }

    /// Reads one cell; out-of-range reads return 0.0.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        if row >= self.rows || col >= self.cols {
            return 0.0;
        }
        match &self.storage {
            Storage::Dense(values) => values[row * self.cols + col],
            Storage::Sparse(csr) => {
                let (cols, values) = csr.row(row);
                match cols.binary_search(&col) {
                    Ok(pos) => values[pos],
                    Err(_) => 0.0,
                }
            }
        }
    }

    /// Row-major view of every cell, materialized only for sparse storage.
    pub fn dense_values(&self) -> Cow<'_, [f64]> {
        match &self.storage {
            Storage::Dense(values) => Cow::Borrowed(values.as_slice()),
            Storage::Sparse(csr) => {
                let mut out = vec![0.0; self.rows * self.cols];
                for row in 0..self.rows {
                    let (cols, values) = csr.row(row);
                    for (&col, &value) in cols.iter().zip(values) {
                        out[row * self.cols + col] = value;
                    }
                }
                Cow::Owned(out)
            }
        }
    }

    pub fn to_dense(&self) -> Self {
        match &self.storage {
            Storage::Dense(_) => self.clone(),
            Storage::Sparse(_) => Self {
                rows: self.rows,
                cols: self.cols,
                nnz: self.nnz,
                storage: Storage::Dense(self.dense_values().into_owned()),
            },
        }
    }

    pub fn to_sparse(&self) -> Self {
        match &self.storage {
            Storage::Sparse(_) => self.clone(),
            Storage::Dense(values) => Self {
                rows: self.rows,
                cols: self.cols,
                nnz: self.nnz,
                storage: Storage::Sparse(dense_to_csr(self.rows, self.cols, values)),
            },
        }
    }

    /// Mutable dense cells; sparse storage is densified first.
    pub(crate) fn dense_values_mut(&mut self) -> &mut [f64] {
        if let Storage::Sparse(_) = self.storage {
            self.storage = Storage::Dense(self.dense_values().into_owned());
        }
        match &mut self.storage {
            Storage::Dense(values) => values.as_mut_slice(),
            Storage::Sparse(_) => unreachable!("storage densified above"),
        }
    }

    pub(crate) fn recompute_nnz(&mut self) {
        self.nnz = match &self.storage {
            Storage::Dense(values) => count_nonzeros(values),
            Storage::Sparse(csr) => csr.values.iter().filter(|v| **v != 0.0).count(),
        };
    }

    /// Decides the storage layout from the actual nonzero count and re-encodes
    /// when the current layout is the wrong one.
    pub fn exam_sparsity(&mut self, sparsity_turn_point: f64) {
        self.recompute_nnz();
        let want_sparse =
            eval_sparse_format(self.rows, self.cols, self.nnz, sparsity_turn_point);
        log::trace!(
            "exam_sparsity {}x{} nnz={} sparse={} -> {}",
            self.rows,
            self.cols,
            self.nnz,
            self.is_sparse(),
            want_sparse
        );
        if want_sparse && !self.is_sparse() {
            *self = self.to_sparse();
        } else if !want_sparse && self.is_sparse() {
            *self = self.to_dense();
        }
    }

    /// Removes the trailing rows or columns that held correction values.
    pub fn drop_last_rows_or_columns(&mut self, location: CorrectionLocation) {
        let (drop_rows, drop_cols) = location.extra_dims();
        if drop_rows == 0 && drop_cols == 0 {
            return;
        }
        let new_rows = self.rows.saturating_sub(drop_rows);
        let new_cols = self.cols.saturating_sub(drop_cols);
        let storage = match &self.storage {
            Storage::Dense(values) => {
                let mut kept = Vec::with_capacity(new_rows * new_cols);
                for row in 0..new_rows {
                    let start = row * self.cols;
                    kept.extend_from_slice(&values[start..start + new_cols]);
                }
                Storage::Dense(kept)
            }
            Storage::Sparse(csr) => {
                let mut kept = CsrStorage::empty(new_rows);
                for row in 0..new_rows {
                    let (cols, values) = csr.row(row);
                    for (&col, &value) in cols.iter().zip(values) {
                        if col < new_cols {
                            kept.col_idx.push(col);
                            kept.values.push(value);
                        }
                    }
                    kept.row_ptr[row + 1] = kept.values.len();
                }
                Storage::Sparse(kept)
            }
        };
        self.rows = new_rows;
        self.cols = new_cols;
        self.storage = storage;
        self.recompute_nnz();
    }
}

/// Whether a `rows x cols` matrix with `nnz` nonzeros is cheaper held as CSR.
/// Vectors with a single column always stay dense.
pub fn eval_sparse_format(rows: usize, cols: usize, nnz: usize, sparsity_turn_point: f64) -> bool {
    if cols <= 1 || rows == 0 {
        return false;
    }
    let cells = rows * cols;
    let sparsity = nnz as f64 / cells as f64;
    let size_dense = cells * DENSE_CELL_BYTES;
    let size_sparse = nnz * SPARSE_NNZ_BYTES + (rows + 1) * SPARSE_ROW_PTR_BYTES;
    sparsity < sparsity_turn_point && size_sparse < size_dense
}

#[inline]
fn count_nonzeros(values: &[f64]) -> usize {
    values.iter().filter(|v| **v != 0.0).count()
}

fn dense_to_csr(rows: usize, cols: usize, values: &[f64]) -> CsrStorage {
    let mut csr = CsrStorage::empty(rows);
    for row in 0..rows {
        for col in 0..cols {
            let value = values[row * cols + col];
            if value != 0.0 {
                csr.col_idx.push(col);
                csr.values.push(value);
            }
        }
        csr.row_ptr[row + 1] = csr.values.len();
    }
    csr
}
