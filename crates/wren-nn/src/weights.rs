// Weights — The weighted transform operation
//
// The linear part of a fully connected layer: y = x @ W
//
// Weights(input_width, output_width) maps an input of shape
// [batch, input_width] to [batch, output_width] with a single matrix product.
// Bias addition is a separate operation (see bias.rs) so that layers can
// compose the two freely.
//
// PARAMETER SHAPE:
//
//   W: [input_width, output_width]  — stored un-transposed, x @ W needs no copy
//
// GRADIENTS:
//
//   For upstream gradient dY of shape [batch, output_width]:
//     dX = dY @ Wᵀ     → [batch, input_width]
//     dW = Xᵀ @ dY     → [input_width, output_width], summed over the batch
//                        by the product itself

use rand::RngCore;
use wren_core::{Element, Error, Matrix, Result};

use crate::init;
use crate::operation::{Differentiable, Trace};
use crate::param::Param;

/// A learnable weighted transform: y = x @ W.
#[derive(Debug, Clone)]
pub struct Weights<T: Element> {
    param: Param<T>,
}

impl<T: Element> Weights<T> {
    pub(crate) const NAME: &'static str = "weights";

    /// Zero-initialised weights of shape [input_width, output_width].
    pub fn new(input_width: usize, output_width: usize) -> Self {
        Weights {
            param: Param::zeros((input_width, output_width)),
        }
    }

    /// Weights with Xavier-uniform initialisation.
    pub fn xavier<R: RngCore + ?Sized>(
        input_width: usize,
        output_width: usize,
        rng: &mut R,
    ) -> Result<Self> {
        Ok(Self::from_matrix(init::xavier_uniform(
            input_width,
            output_width,
            rng,
        )?))
    }

    /// Use an existing matrix as the weights. Useful for fixed or loaded values.
    pub fn from_matrix(weights: Matrix<T>) -> Self {
        Weights {
            param: Param::new(weights),
        }
    }

    /// The input feature dimension.
    pub fn input_width(&self) -> usize {
        self.param.shape().rows()
    }

    /// The output feature dimension.
    pub fn output_width(&self) -> usize {
        self.param.shape().cols()
    }
}

impl<T: Element> Differentiable<T> for Weights<T> {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    /// Forward pass: y = x @ W
    ///
    /// Input shape:  [batch, input_width]
    /// Output shape: [batch, output_width]
    fn forward(&self, input: &Matrix<T>) -> Result<(Matrix<T>, Trace<T>)> {
        let output = input.matmul(self.param.value())?;
        Ok((output.clone(), Trace::new(Self::NAME, input.clone(), output)))
    }

    fn backward(&mut self, trace: &Trace<T>, d_output: &Matrix<T>) -> Result<Matrix<T>> {
        trace.expect_owner(Self::NAME)?;
        trace.expect_output_shape(d_output)?;
        let d_param = trace.input().transpose().matmul(d_output)?;
        self.param.accumulate(&d_param)?;
        d_output.matmul(&self.param.value().transpose())
    }

    fn param(&self) -> Option<&Param<T>> {
        Some(&self.param)
    }

    fn param_mut(&mut self) -> Option<&mut Param<T>> {
        Some(&mut self.param)
    }

    fn output_width_for(&self, input_width: usize) -> Result<Option<usize>> {
        if input_width != self.input_width() {
            return Err(Error::MatmulShapeMismatch {
                m: 1,
                k1: input_width,
                k2: self.input_width(),
                n: self.output_width(),
            });
        }
        Ok(Some(self.output_width()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_row_sums_through_ones() {
        let w = Weights::from_matrix(Matrix::full((4, 3), 1.0));
        let x = Matrix::from_array([[1.0, 2.0, 3.0, 4.0]]);
        let (y, _) = w.forward(&x).unwrap();
        assert_eq!(y.data(), &[10.0, 10.0, 10.0]);
    }

    #[test]
    fn test_backward_gradients() {
        // x = [1, 2], W = [[1, 2], [3, 4]], dY = [1, 1]
        let mut w = Weights::from_matrix(Matrix::from_array([[1.0, 2.0], [3.0, 4.0]]));
        let x = Matrix::from_array([[1.0, 2.0]]);
        let (_, trace) = w.forward(&x).unwrap();
        let dy = Matrix::from_array([[1.0, 1.0]]);
        let dx = w.backward(&trace, &dy).unwrap();

        // dX = dY @ Wᵀ = [1+2, 3+4]
        assert_eq!(dx.data(), &[3.0, 7.0]);
        // dW = xᵀ @ dY = [[1, 1], [2, 2]]
        assert_eq!(w.accumulated_gradient().unwrap().data(), &[1.0, 1.0, 2.0, 2.0]);
    }

    #[test]
    fn test_backward_accumulates() {
        let mut w = Weights::from_matrix(Matrix::from_array([[1.0], [1.0]]));
        let x = Matrix::from_array([[1.0, 2.0]]);
        let dy = Matrix::from_array([[1.0]]);
        for _ in 0..3 {
            let (_, trace) = w.forward(&x).unwrap();
            w.backward(&trace, &dy).unwrap();
        }
        assert_eq!(w.accumulated_gradient().unwrap().data(), &[3.0, 6.0]);
        assert_eq!(w.param().unwrap().pending(), 3);
    }

    #[test]
    fn test_wrong_gradient_shape() {
        let mut w = Weights::<f64>::new(2, 3);
        let (_, trace) = w.forward(&Matrix::new(1, 2)).unwrap();
        let err = w.backward(&trace, &Matrix::new(1, 4)).unwrap_err();
        assert!(err.is_shape_error());
        assert!(w.accumulated_gradient().unwrap().is_zero());
    }

    #[test]
    fn test_xavier_bounds() {
        let mut rng = StdRng::seed_from_u64(11);
        let w = Weights::<f32>::xavier(3, 5, &mut rng).unwrap();
        let bound = init::xavier_bound(3, 5) as f32;
        assert_eq!((w.input_width(), w.output_width()), (3, 5));
        assert!(w.parameter().unwrap().data().iter().all(|v| v.abs() <= bound));
        assert_eq!(w.output_width_for(3).unwrap(), Some(5));
        assert!(w.output_width_for(4).is_err());
    }
}
