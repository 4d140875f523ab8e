// Param — A learnable matrix and its accumulated gradient
//
// Every parameterized operation owns exactly one Param. During training the
// backward pass adds each sample's parameter gradient into `grad`; the apply
// step then descends:
//
//   value ← value − learning_rate × grad
//   grad  ← 0
//
// `grad` always has the shape of `value` and is all-zero right after
// construction, apply and reset. Gradients accumulate across samples until
// the caller decides to apply, which is how the network's apply cadence
// batches several samples into one update.

use rand::Rng;
use wren_core::{Element, Error, Matrix, Result, Shape};

/// A learnable parameter with its running gradient sum.
#[derive(Debug, Clone)]
pub struct Param<T: Element> {
    value: Matrix<T>,
    grad: Matrix<T>,
    pending: usize,
}

impl<T: Element> Param<T> {
    /// Wrap an initial value. The gradient starts at zero.
    pub fn new(value: Matrix<T>) -> Self {
        let grad = Matrix::zeros(value.shape());
        Param {
            value,
            grad,
            pending: 0,
        }
    }

    /// A zero-valued parameter of the given shape.
    pub fn zeros(shape: impl Into<Shape>) -> Self {
        Self::new(Matrix::zeros(shape))
    }

    /// The current value.
    pub fn value(&self) -> &Matrix<T> {
        &self.value
    }

    /// The gradient accumulated since the last apply or reset.
    pub fn grad(&self) -> &Matrix<T> {
        &self.grad
    }

    /// Shape shared by value and gradient.
    pub fn shape(&self) -> Shape {
        self.value.shape()
    }

    /// Number of accumulations since the last apply or reset.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Replace the value. The shape must not change.
    pub fn set_value(&mut self, value: Matrix<T>) -> Result<()> {
        if value.shape() != self.value.shape() {
            return Err(Error::ShapeMismatch {
                op: "set_value",
                expected: self.value.shape(),
                got: value.shape(),
            });
        }
        self.value = value;
        Ok(())
    }

    /// Add a gradient into the running sum.
    pub fn accumulate(&mut self, grad: &Matrix<T>) -> Result<()> {
        if grad.shape() != self.grad.shape() {
            return Err(Error::ShapeMismatch {
                op: "accumulate_gradient",
                expected: self.grad.shape(),
                got: grad.shape(),
            });
        }
        self.grad = self.grad.add(grad)?;
        self.pending += 1;
        Ok(())
    }

    /// One gradient-descent step, then zero the gradient.
    ///
    /// Returns whether anything was applied; with nothing accumulated this
    /// is a no-op.
    pub fn apply(&mut self, learning_rate: f64) -> Result<bool> {
        if self.pending == 0 {
            return Ok(false);
        }
        let lr = T::from_f64(learning_rate);
        self.value = self.value.zip_map(&self.grad, |p, g| p - lr * g)?;
        self.reset();
        Ok(true)
    }

    /// Discard the accumulated gradient.
    pub fn reset(&mut self) {
        self.grad.fill(T::zero());
        self.pending = 0;
    }

    /// Re-draw the value uniformly from [low, high).
    pub fn randomize<R: Rng + ?Sized>(&mut self, low: f64, high: f64, rng: &mut R) -> Result<()> {
        self.value.randomize(low, high, rng)
    }
}
