use std::fmt;
use std::ops::{Add, Mul, Sub};

use rand::distributions::{Distribution, Uniform};
use rand::Rng;

use crate::dtype::{DType, Element};
use crate::error::{Error, Result};
use crate::shape::Shape;

// Matrix — The fundamental data structure
//
// A Matrix is a dense 2-D array of one element type T. Every value that
// flows through an operation, a layer or a network is a Matrix: a batch of
// samples is one row per sample, a parameter is a (fan_in, fan_out) block.
//
// MEMORY MODEL:
//
//   Elements live in a single row-major Vec<T>. Element (r, c) sits at
//   index r * cols + c. The shape is fixed at construction and the storage
//   length always equals rows * cols; every constructor checks it and every
//   operation computes its output shape before allocating.
//
//   Cloning is a deep copy. Unlike a tensor handle there is no shared
//   storage, so two matrices never alias.
//
// MUTATION:
//
//   Algebra (matmul, add, sub, transpose, zip_map) always returns a fresh
//   matrix. Only map/fill/set/randomize mutate in place, and they need
//   &mut self, so a matrix that is being read elsewhere cannot change.

/// A dense, row-major 2-D matrix.
#[derive(Clone, PartialEq)]
pub struct Matrix<T: Element> {
    shape: Shape,
    data: Vec<T>,
}

impl<T: Element> Matrix<T> {
    // Construction

    /// Create a zero-filled matrix of shape (rows, cols).
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::zeros((rows, cols))
    }

    /// Create a zero-filled matrix of the given shape.
    pub fn zeros(shape: impl Into<Shape>) -> Self {
        Self::full(shape, T::zero())
    }

    /// Create a matrix filled with a constant.
    pub fn full(shape: impl Into<Shape>, value: T) -> Self {
        let shape = shape.into();
        Matrix {
            data: vec![value; shape.elem_count()],
            shape,
        }
    }

    /// The n×n identity matrix.
    pub fn identity(n: usize) -> Self {
        let mut m = Self::new(n, n);
        for i in 0..n {
            m.data[i * n + i] = T::one();
        }
        m
    }

    /// Create a matrix from a flat row-major vec.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Result<Self> {
        let shape = Shape::new(rows, cols);
        if shape.checked_elem_count() != Some(data.len()) {
            return Err(Error::ElementCountMismatch {
                shape,
                expected: shape.elem_count(),
                got: data.len(),
            });
        }
        Ok(Matrix { shape, data })
    }

    /// Create a matrix from nested rows. Rows must all have the same length.
    pub fn from_rows(rows: &[Vec<T>]) -> Result<Self> {
        let cols = rows.first().map_or(0, |r| r.len());
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(Error::RaggedRows {
                    row: i,
                    expected: cols,
                    got: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Self::from_vec(rows.len(), cols, data)
    }

    /// Create a matrix from a fixed-size array. Rectangular by construction.
    pub fn from_array<const R: usize, const C: usize>(values: [[T; C]; R]) -> Self {
        Matrix {
            shape: Shape::new(R, C),
            data: values.iter().flatten().copied().collect(),
        }
    }

    // Shape accessors

    /// The (rows, cols) shape.
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.shape.rows()
    }

    /// Number of columns.
    pub fn columns(&self) -> usize {
        self.shape.cols()
    }

    /// Total number of elements.
    pub fn elem_count(&self) -> usize {
        self.data.len()
    }

    /// The element type.
    pub fn dtype(&self) -> DType {
        T::DTYPE
    }

    /// Row-major view of the elements.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Copy out as nested rows.
    pub fn to_vec2(&self) -> Vec<Vec<T>> {
        self.data
            .chunks(self.columns().max(1))
            .take(self.rows())
            .map(|r| r.to_vec())
            .collect()
    }

    /// Copy out as f64 values, row-major.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        self.data.iter().map(|v| v.to_f64()).collect()
    }

    // Element access

    fn offset(&self, row: usize, col: usize) -> Result<usize> {
        if row >= self.rows() || col >= self.columns() {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                shape: self.shape,
            });
        }
        Ok(row * self.columns() + col)
    }

    /// Bounds-checked element read.
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        let i = self.offset(row, col)?;
        Ok(self.data[i])
    }

    /// Bounds-checked element write.
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        let i = self.offset(row, col)?;
        self.data[i] = value;
        Ok(())
    }

    /// Borrow one row.
    pub fn row(&self, row: usize) -> Result<&[T]> {
        if row >= self.rows() {
            return Err(Error::IndexOutOfBounds {
                row,
                col: 0,
                shape: self.shape,
            });
        }
        let cols = self.columns();
        Ok(&self.data[row * cols..(row + 1) * cols])
    }

    // Algebra

    fn expect_same_shape(&self, other: &Matrix<T>, op: &'static str) -> Result<()> {
        if self.shape != other.shape {
            return Err(Error::ShapeMismatch {
                op,
                expected: self.shape,
                got: other.shape,
            });
        }
        Ok(())
    }

    /// Matrix product `self @ rhs`.
    ///
    /// Requires `self.columns() == rhs.rows()`; the result is
    /// (self.rows(), rhs.columns()). Accumulation runs i, j, k in that order.
    pub fn matmul(&self, rhs: &Matrix<T>) -> Result<Matrix<T>> {
        let shape = self
            .shape
            .matmul(&rhs.shape)
            .ok_or(Error::MatmulShapeMismatch {
                m: self.rows(),
                k1: self.columns(),
                k2: rhs.rows(),
                n: rhs.columns(),
            })?;
        let (m, k, n) = (self.rows(), self.columns(), rhs.columns());
        let mut data = Vec::with_capacity(shape.elem_count());
        for i in 0..m {
            for j in 0..n {
                let mut acc = T::zero();
                for kk in 0..k {
                    acc = acc + self.data[i * k + kk] * rhs.data[kk * n + j];
                }
                data.push(acc);
            }
        }
        Ok(Matrix { shape, data })
    }

    /// Element-wise addition. Shapes must match.
    pub fn add(&self, other: &Matrix<T>) -> Result<Matrix<T>> {
        self.zip_map_op(other, "add", |a, b| a + b)
    }

    /// Element-wise subtraction. Shapes must match.
    pub fn sub(&self, other: &Matrix<T>) -> Result<Matrix<T>> {
        self.zip_map_op(other, "sub", |a, b| a - b)
    }

    /// Element-wise (Hadamard) product. Shapes must match.
    pub fn hadamard(&self, other: &Matrix<T>) -> Result<Matrix<T>> {
        self.zip_map_op(other, "hadamard", |a, b| a * b)
    }

    /// Multiply every element by a scalar.
    pub fn scale(&self, k: T) -> Matrix<T> {
        let mut out = self.clone();
        out.map(|v| v * k);
        out
    }

    /// The transpose, of shape (cols, rows).
    pub fn transpose(&self) -> Matrix<T> {
        let (rows, cols) = (self.rows(), self.columns());
        let mut data = Vec::with_capacity(self.data.len());
        for j in 0..cols {
            for i in 0..rows {
                data.push(self.data[i * cols + j]);
            }
        }
        Matrix {
            shape: self.shape.transposed(),
            data,
        }
    }

    /// Apply `f` to every element in place, row-major order.
    pub fn map<F: FnMut(T) -> T>(&mut self, mut f: F) {
        for v in self.data.iter_mut() {
            *v = f(*v);
        }
    }

    /// Combine two equally shaped matrices element-wise into a new matrix.
    pub fn zip_map<F: FnMut(T, T) -> T>(&self, other: &Matrix<T>, f: F) -> Result<Matrix<T>> {
        self.zip_map_op(other, "zip_map", f)
    }

    fn zip_map_op<F: FnMut(T, T) -> T>(
        &self,
        other: &Matrix<T>,
        op: &'static str,
        mut f: F,
    ) -> Result<Matrix<T>> {
        self.expect_same_shape(other, op)?;
        let data = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(&a, &b)| f(a, b))
            .collect();
        Ok(Matrix {
            shape: self.shape,
            data,
        })
    }

    // Broadcasting helpers

    /// Replicate a single-row matrix `n` times, giving shape (n, cols).
    pub fn broadcast_rows(&self, n: usize) -> Result<Matrix<T>> {
        if self.rows() != 1 {
            return Err(Error::ShapeMismatch {
                op: "broadcast_rows",
                expected: Shape::new(1, self.columns()),
                got: self.shape,
            });
        }
        let mut data = Vec::with_capacity(n * self.columns());
        for _ in 0..n {
            data.extend_from_slice(&self.data);
        }
        Ok(Matrix {
            shape: Shape::new(n, self.columns()),
            data,
        })
    }

    /// Sum over the row dimension, giving a (1, cols) matrix of column sums.
    pub fn sum_rows(&self) -> Matrix<T> {
        let cols = self.columns();
        let mut data = vec![T::zero(); cols];
        for row in self.data.chunks(cols.max(1)) {
            for (acc, &v) in data.iter_mut().zip(row) {
                *acc = *acc + v;
            }
        }
        Matrix {
            shape: Shape::new(1, cols),
            data,
        }
    }

    // Fill and reductions

    /// Set every element to `value`.
    pub fn fill(&mut self, value: T) {
        self.data.iter_mut().for_each(|v| *v = value);
    }

    /// Whether every element equals zero.
    pub fn is_zero(&self) -> bool {
        self.data.iter().all(|&v| v == T::zero())
    }

    /// Fill every element independently and uniformly from [low, high).
    ///
    /// The random source is supplied by the caller, so seeding a
    /// `StdRng` gives reproducible parameters. Samples are drawn in f64 and
    /// clamped to the values of `T` that lie inside the interval, so
    /// narrowing never rounds a sample onto `high`.
    pub fn randomize<R: Rng + ?Sized>(&mut self, low: f64, high: f64, rng: &mut R) -> Result<()> {
        let (bottom, top) = sample_bounds::<T>(low, high)?;
        let dist = Uniform::new(low, high);
        self.map(|_| {
            let v = T::from_f64(dist.sample(rng));
            if v < bottom {
                bottom
            } else if v > top {
                top
            } else {
                v
            }
        });
        Ok(())
    }

    /// Sum of all elements, accumulated in f64.
    pub fn sum(&self) -> f64 {
        self.data.iter().map(|v| v.to_f64()).sum()
    }

    /// Mean of all elements (0.0 for an empty matrix).
    pub fn mean(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.sum() / self.data.len() as f64
    }

    /// Largest absolute element-wise difference, in f64.
    pub fn max_abs_diff(&self, other: &Matrix<T>) -> Result<f64> {
        self.expect_same_shape(other, "max_abs_diff")?;
        Ok(self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| (a.to_f64() - b.to_f64()).abs())
            .fold(0.0, f64::max))
    }

    /// Deep copy. Equivalent to `clone`; storage is never shared.
    pub fn copy(&self) -> Matrix<T> {
        self.clone()
    }

    /// Convert every element to another element type.
    ///
    /// Fails when `num_traits` reports a value as unrepresentable in `U`.
    pub fn cast<U>(&self) -> Result<Matrix<U>>
    where
        T: num_traits::NumCast,
        U: Element + num_traits::NumCast,
    {
        let data = self
            .data
            .iter()
            .map(|&v| {
                num_traits::cast::<T, U>(v).ok_or(Error::Cast {
                    value: Element::to_f64(v),
                    from: T::DTYPE,
                    to: U::DTYPE,
                })
            })
            .collect::<Result<Vec<U>>>()?;
        Ok(Matrix {
            shape: self.shape,
            data,
        })
    }
}

/// The smallest and largest values of `T` inside [low, high).
fn sample_bounds<T: Element>(low: f64, high: f64) -> Result<(T, T)> {
    if !(low.is_finite() && high.is_finite() && low < high && (high - low).is_finite()) {
        return Err(Error::config(format!(
            "randomize needs finite bounds with low < high and a finite width, got [{low}, {high})"
        )));
    }
    let mut bottom = T::from_f64(low);
    if bottom.to_f64() < low {
        bottom = -(-bottom).next_down();
    }
    let mut top = T::from_f64(high);
    if top.to_f64() >= high {
        top = top.next_down();
    }
    if bottom > top {
        return Err(Error::config(format!(
            "no {} value lies in [{low}, {high})",
            T::DTYPE
        )));
    }
    Ok((bottom, top))
}

impl<T: Element> fmt::Debug for Matrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Matrix(shape={}, dtype={}, data={:?})",
            self.shape,
            T::DTYPE,
            self.data
        )
    }
}

// Operator overloads
//
// `&a + &b`, `&a - &b` and `&a * &b` (matrix product) return Result because
// every one of them is shape-checked.

impl<'a, T: Element> Add<&'a Matrix<T>> for &'a Matrix<T> {
    type Output = Result<Matrix<T>>;

    fn add(self, rhs: &'a Matrix<T>) -> Self::Output {
        Matrix::add(self, rhs)
    }
}

impl<'a, T: Element> Sub<&'a Matrix<T>> for &'a Matrix<T> {
    type Output = Result<Matrix<T>>;

    fn sub(self, rhs: &'a Matrix<T>) -> Self::Output {
        Matrix::sub(self, rhs)
    }
}

impl<'a, T: Element> Mul<&'a Matrix<T>> for &'a Matrix<T> {
    type Output = Result<Matrix<T>>;

    fn mul(self, rhs: &'a Matrix<T>) -> Self::Output {
        self.matmul(rhs)
    }
}
