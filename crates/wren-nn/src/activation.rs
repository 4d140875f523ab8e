// Activation operations — Element-wise nonlinearities
//
// Stateless operations that apply a scalar function to every element.
// They hold no parameter, so the default parameter hooks of Differentiable
// (no parameter, apply/reset are no-ops) are exactly right.
//
// Example:
//   let layer = Layer::new(3, vec![
//       Operation::weights(w),
//       Operation::bias(b)?,
//       Operation::sigmoid(),
//   ])?;

use wren_core::{Element, Matrix, Result};

use crate::operation::{Differentiable, Trace};

/// The logistic function 1 / (1 + e^(-x)), evaluated in f64.
///
/// Split on the sign of x so that e^(-x) never overflows for large
/// negative inputs.
pub fn sigmoid<T: Element>(x: T) -> T {
    let x = x.to_f64();
    let y = if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    };
    T::from_f64(y)
}

/// Sigmoid activation: 1 / (1 + e^(-x))
///
/// The derivative is expressed through the output, σ'(x) = y(1 − y), so
/// backward reads the output recorded in the trace and never re-evaluates
/// the exponential.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sigmoid;

impl Sigmoid {
    pub(crate) const NAME: &'static str = "sigmoid";
}

impl<T: Element> Differentiable<T> for Sigmoid {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn forward(&self, input: &Matrix<T>) -> Result<(Matrix<T>, Trace<T>)> {
        let mut output = input.clone();
        output.map(sigmoid);
        Ok((output.clone(), Trace::new(Self::NAME, input.clone(), output)))
    }

    fn backward(&mut self, trace: &Trace<T>, d_output: &Matrix<T>) -> Result<Matrix<T>> {
        trace.expect_owner(Self::NAME)?;
        trace.expect_output_shape(d_output)?;
        trace
            .output()
            .zip_map(d_output, |y, d| y * (T::one() - y) * d)
    }
}
