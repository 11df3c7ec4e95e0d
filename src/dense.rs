use num_traits::Zero;
use std::ops::{Add, AddAssign, Mul};

use crate::error::{PowerFlowError, Result};

/// Dense matrix with element values stored in row-major order (C-style).
///
/// Dimensions are fixed at construction. Building from nested rows checks
/// that every row has the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct Mat<T> {
    rows: usize,
    cols: usize,
    values: Vec<T>,
}

impl<T> Mat<T>
where
    T: Copy + Zero,
{
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            values: vec![T::zero(); rows * cols],
        }
    }

    /// Builds a matrix from row-major `values`, which must hold
    /// `rows * cols` elements.
    pub fn from_values(rows: usize, cols: usize, values: Vec<T>) -> Result<Self> {
        if values.len() != rows * cols {
            return Err(PowerFlowError::shape("matrix values", rows * cols, values.len()));
        }
        Ok(Self { rows, cols, values })
    }

    /// Builds a matrix from nested rows. Ragged input is rejected.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self> {
        let nrows = rows.len();
        let ncols = rows.first().map_or(0, Vec::len);

        let mut values = Vec::with_capacity(nrows * ncols);
        for row in rows {
            if row.len() != ncols {
                return Err(PowerFlowError::shape("matrix row", ncols, row.len()));
            }
            values.extend(row);
        }
        Ok(Self {
            rows: nrows,
            cols: ncols,
            values,
        })
    }

    pub fn from_fn<F>(rows: usize, cols: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> T,
    {
        let mut values = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                values.push(f(i, j));
            }
        }
        Self { rows, cols, values }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }
    pub fn cols(&self) -> usize {
        self.cols
    }
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }
    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    #[inline]
    fn ix(&self, row: usize, col: usize) -> usize {
        debug_assert!(row < self.rows && col < self.cols);
        row * self.cols + col
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> T {
        self.values[self.ix(row, col)]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, v: T) {
        let i = self.ix(row, col);
        self.values[i] = v
    }

    #[inline]
    pub fn add(&mut self, row: usize, col: usize, v: T)
    where
        T: AddAssign,
    {
        let i = self.ix(row, col);
        self.values[i] += v
    }

    pub fn row(&self, row: usize) -> &[T] {
        assert!(row < self.rows);
        &self.values[row * self.cols..(row + 1) * self.cols]
    }

    pub fn map<U, F>(&self, f: F) -> Mat<U>
    where
        F: Fn(T) -> U,
    {
        Mat {
            rows: self.rows,
            cols: self.cols,
            values: self.values.iter().map(|&v| f(v)).collect(),
        }
    }

    pub fn mat_vec(&self, b: &[T]) -> Vec<T>
    where
        T: Mul<Output = T> + Add<Output = T>,
    {
        assert_eq!(b.len(), self.cols);
        (0..self.rows).map(|i| dot(self.row(i), b)).collect()
    }
}

/// Computes the dot-product of `a` and `b`.
pub fn dot<T>(a: &[T], b: &[T]) -> T
where
    T: Mul<Output = T> + Add<Output = T> + Zero + Copy,
{
    a.iter()
        .zip(b)
        .map(|(&ai, &bi)| ai * bi)
        .fold(T::zero(), |x, y| x + y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PowerFlowError;

    #[test]
    fn ragged_rows_are_rejected() {
        let err = Mat::from_rows(vec![vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert_eq!(
            err,
            PowerFlowError::Shape {
                name: "matrix row",
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn mat_vec_row_major() -> anyhow::Result<()> {
        let a = Mat::from_rows(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]])?;
        assert_eq!(a.shape(), (2, 3));
        assert!(!a.is_square());
        assert_eq!(a.mat_vec(&[1.0, 0.0, -1.0]), vec![-2.0, -2.0]);
        assert_eq!(a.get(1, 0), 4.0);
        Ok(())
    }

    #[test]
    fn from_values_checks_length() {
        assert!(Mat::from_values(2, 2, vec![0.0; 3]).is_err());
        assert!(Mat::from_values(2, 2, vec![0.0; 4]).is_ok());
    }
}
