//! Shape-checked dense matrices backed by [`nalgebra::DMatrix`].
//!
//! The estimator switches between one- and two-state configurations and has its
//! model matrices replaced on every step, so shapes are data rather than types here.
//! Every operation that combines two matrices checks conformance and reports a
//! [`EstimatorError::ShapeMismatch`] instead of broadcasting.

use crate::error::EstimatorError;
use crate::numeric::Scalar;
use alloc::vec::Vec;
use core::fmt::{Debug, Formatter};
use nalgebra::DMatrix;
use num_traits::Float;

/// A dense matrix whose shape is checked on every operation.
pub struct Matrix<T>(DMatrix<T>);

impl<T> Matrix<T>
where
    T: Scalar,
{
    /// Creates a `rows`×`cols` matrix of zeros.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self(DMatrix::zeros(rows, cols))
    }

    /// Creates the `n`×`n` identity matrix.
    pub fn identity(n: usize) -> Self {
        Self(DMatrix::identity(n, n))
    }

    /// Creates an `n`×`n` diagonal matrix with `value` on the diagonal.
    pub fn scalar(n: usize, value: T) -> Self {
        Self(DMatrix::from_diagonal_element(n, n, value))
    }

    /// Creates a column vector.
    pub fn column(values: &[T]) -> Self {
        Self(DMatrix::from_column_slice(values.len(), 1, values))
    }

    /// Creates a matrix from a list of rows; all rows must have the same length.
    pub fn from_rows(rows: &[&[T]]) -> Result<Self, EstimatorError> {
        let cols = rows.first().map_or(0, |row| row.len());
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            if row.len() != cols {
                return Err(EstimatorError::shape(
                    "matrix row",
                    (1, cols),
                    (1, row.len()),
                ));
            }
            data.extend_from_slice(row);
        }
        Ok(Self(DMatrix::from_row_slice(rows.len(), cols, &data)))
    }

    #[inline(always)]
    pub fn rows(&self) -> usize {
        self.0.nrows()
    }

    #[inline(always)]
    pub fn cols(&self) -> usize {
        self.0.ncols()
    }

    /// Returns `(rows, columns)`.
    #[inline(always)]
    pub fn shape(&self) -> (usize, usize) {
        self.0.shape()
    }

    #[inline(always)]
    pub fn is_square(&self) -> bool {
        self.0.is_square()
    }

    /// Gets the element at `(row, col)`.
    ///
    /// ## Panics
    /// Panics if the index is out of bounds.
    #[inline(always)]
    pub fn get(&self, row: usize, col: usize) -> T {
        self.0[(row, col)]
    }

    /// Gets the element at `(row, col)`, or `None` if the index is out of bounds.
    #[inline(always)]
    pub fn try_get(&self, row: usize, col: usize) -> Option<T> {
        self.0.get((row, col)).copied()
    }

    /// Sets the element at `(row, col)`.
    ///
    /// ## Panics
    /// Panics if the index is out of bounds.
    #[inline(always)]
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        self.0[(row, col)] = value;
    }

    /// Sets the element at `(row, col)` and its mirror at `(col, row)`.
    pub fn set_symmetric(&mut self, row: usize, col: usize, value: T) {
        self.set(row, col, value);
        self.set(col, row, value);
    }

    /// Column-major view of the elements.
    pub fn as_slice(&self) -> &[T] {
        self.0.as_slice()
    }

    /// The underlying `nalgebra` matrix.
    pub fn as_dmatrix(&self) -> &DMatrix<T> {
        &self.0
    }

    /// Checks that the matrix has the given shape.
    pub fn expect_shape(&self, what: &'static str, shape: (usize, usize)) -> Result<(), EstimatorError> {
        if self.shape() == shape {
            Ok(())
        } else {
            Err(EstimatorError::shape(what, shape, self.shape()))
        }
    }

    /// Determines whether the matrix is square and symmetric within `tolerance`.
    pub fn is_symmetric(&self, tolerance: T) -> bool {
        if !self.is_square() {
            return false;
        }
        let n = self.rows();
        (0..n).all(|row| {
            ((row + 1)..n).all(|col| Float::abs(self.get(row, col) - self.get(col, row)) <= tolerance)
        })
    }

    pub fn transpose(&self) -> Self {
        Self(self.0.transpose())
    }

    /// Computes `self × rhs`.
    pub fn mul(&self, rhs: &Self) -> Result<Self, EstimatorError> {
        if self.cols() != rhs.rows() {
            return Err(EstimatorError::shape(
                "right-hand side of product",
                (self.cols(), rhs.cols()),
                rhs.shape(),
            ));
        }
        Ok(Self(&self.0 * &rhs.0))
    }

    /// Computes `self + rhs`.
    pub fn add(&self, rhs: &Self) -> Result<Self, EstimatorError> {
        self.expect_same_shape(rhs, "right-hand side of sum")?;
        Ok(Self(&self.0 + &rhs.0))
    }

    /// Computes `self - rhs`.
    pub fn sub(&self, rhs: &Self) -> Result<Self, EstimatorError> {
        self.expect_same_shape(rhs, "right-hand side of difference")?;
        Ok(Self(&self.0 - &rhs.0))
    }

    fn expect_same_shape(&self, rhs: &Self, what: &'static str) -> Result<(), EstimatorError> {
        if self.shape() != rhs.shape() {
            return Err(EstimatorError::shape(what, self.shape(), rhs.shape()));
        }
        Ok(())
    }

    /// Inverts a square matrix through its partially pivoted LU decomposition.
    ///
    /// A pivot of `U` smaller than `threshold` times the largest absolute entry of
    /// the matrix is treated as zero and the matrix is reported as singular. No
    /// pseudo-inverse is substituted.
    ///
    /// ## Arguments
    /// * `what` - The role of the matrix, used in the error.
    /// * `threshold` - The relative pivot threshold, e.g. `1e-12`.
    pub fn try_inverse(&self, what: &'static str, threshold: T) -> Result<Self, EstimatorError> {
        if !self.is_square() {
            return Err(EstimatorError::shape(what, (self.rows(), self.rows()), self.shape()));
        }

        let scale = self
            .0
            .iter()
            .fold(T::zero(), |acc, &v| if Float::abs(v) > acc { Float::abs(v) } else { acc });
        if scale == T::zero() || !Float::is_finite(scale) {
            return Err(EstimatorError::SingularMatrix { what });
        }
        let limit = threshold * scale;

        let lu = self.0.clone().lu();
        let u = lu.u();
        if (0..self.rows()).any(|i| Float::abs(u[(i, i)]) <= limit) {
            return Err(EstimatorError::SingularMatrix { what });
        }

        lu.try_inverse()
            .map(Self)
            .ok_or(EstimatorError::SingularMatrix { what })
    }
}

impl<T> From<DMatrix<T>> for Matrix<T> {
    fn from(value: DMatrix<T>) -> Self {
        Self(value)
    }
}

impl<T> Clone for Matrix<T>
where
    T: Clone,
{
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> PartialEq for Matrix<T>
where
    T: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.0.shape() == other.0.shape() && self.0.as_slice() == other.0.as_slice()
    }
}

impl<T> Debug for Matrix<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        let (rows, cols) = self.0.shape();
        let data = self.0.as_slice();
        let mut list = f.debug_list();
        for row in 0..rows {
            let entries: Vec<&T> = (0..cols).map(|col| &data[col * rows + row]).collect();
            list.entry(&entries);
        }
        list.finish()
    }
}
