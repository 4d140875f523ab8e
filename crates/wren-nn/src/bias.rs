// Bias — The row-wise bias addition operation
//
// y = x + b, where b is a single row broadcast over every row of x.
//
// PARAMETER SHAPE:
//
//   b: [1, width]
//
// GRADIENTS:
//
//   dX = dY                       (addition passes the gradient through)
//   db = column sums of dY        → [1, width]
//
// Summing over rows makes a batched forward/backward give the same bias
// gradient as running each row through separately and accumulating.

use wren_core::{Element, Error, Matrix, Result, Shape};

use crate::operation::{Differentiable, Trace};
use crate::param::Param;

/// A learnable bias, added to every row of the input.
#[derive(Debug, Clone)]
pub struct Bias<T: Element> {
    param: Param<T>,
}

impl<T: Element> Bias<T> {
    pub(crate) const NAME: &'static str = "bias";

    /// Zero bias of the given width.
    pub fn new(width: usize) -> Self {
        Bias {
            param: Param::zeros((1, width)),
        }
    }

    /// Use an existing single-row matrix as the bias.
    pub fn from_matrix(bias: Matrix<T>) -> Result<Self> {
        if bias.rows() != 1 {
            return Err(Error::ShapeMismatch {
                op: Self::NAME,
                expected: Shape::new(1, bias.columns()),
                got: bias.shape(),
            });
        }
        Ok(Bias {
            param: Param::new(bias),
        })
    }

    /// Number of columns the bias covers.
    pub fn width(&self) -> usize {
        self.param.shape().cols()
    }

    fn check_width(&self, input: Shape) -> Result<()> {
        if input.cols() != self.width() {
            return Err(Error::ShapeMismatch {
                op: Self::NAME,
                expected: Shape::new(input.rows(), self.width()),
                got: input,
            });
        }
        Ok(())
    }
}

impl<T: Element> Differentiable<T> for Bias<T> {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn forward(&self, input: &Matrix<T>) -> Result<(Matrix<T>, Trace<T>)> {
        self.check_width(input.shape())?;
        let b = self.param.value().broadcast_rows(input.rows())?;
        let output = input.add(&b)?;
        Ok((output.clone(), Trace::new(Self::NAME, input.clone(), output)))
    }

    fn backward(&mut self, trace: &Trace<T>, d_output: &Matrix<T>) -> Result<Matrix<T>> {
        trace.expect_owner(Self::NAME)?;
        trace.expect_output_shape(d_output)?;
        self.param.accumulate(&d_output.sum_rows())?;
        Ok(d_output.clone())
    }

    fn param(&self) -> Option<&Param<T>> {
        Some(&self.param)
    }

    fn param_mut(&mut self) -> Option<&mut Param<T>> {
        Some(&mut self.param)
    }

    fn output_width_for(&self, input_width: usize) -> Result<Option<usize>> {
        self.check_width(Shape::new(1, input_width))?;
        Ok(Some(self.width()))
    }
}
