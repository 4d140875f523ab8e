// Loss Functions
//
// A loss measures how far a prediction is from its target. The network asks
// a loss for two things per sample:
//
//   calculate_loss(prediction, target)           → scalar, for reporting
//   calculate_loss_gradient(prediction, target)  → dLoss/dPrediction, same
//                                                  shape as prediction; this
//                                                  starts the backward pass
//
// MSE (Mean Squared Error): mean((pred - target)²)
//   gradient: 2 × (pred - target), element-wise and NOT divided by the
//   element count. The reported loss is a mean while the gradient is the
//   per-element derivative; learning rates are tuned against this scale.

use wren_core::{Element, Error, Matrix, Result};

/// A loss function usable by [`Network`](crate::Network).
pub trait Loss<T: Element>: Send + Sync {
    /// Scalar loss of `prediction` against `target`.
    fn calculate_loss(&self, prediction: &Matrix<T>, target: &Matrix<T>) -> Result<f64>;

    /// Gradient of the loss with respect to `prediction`.
    fn calculate_loss_gradient(
        &self,
        prediction: &Matrix<T>,
        target: &Matrix<T>,
    ) -> Result<Matrix<T>>;
}

fn check_shapes<T: Element>(prediction: &Matrix<T>, target: &Matrix<T>) -> Result<()> {
    if prediction.shape() != target.shape() {
        return Err(Error::ShapeMismatch {
            op: "loss",
            expected: prediction.shape(),
            got: target.shape(),
        });
    }
    Ok(())
}

/// Mean Squared Error: mean((prediction - target)²)
///
/// Both prediction and target must have the same shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeanSquaredError;

impl<T: Element> Loss<T> for MeanSquaredError {
    fn calculate_loss(&self, prediction: &Matrix<T>, target: &Matrix<T>) -> Result<f64> {
        mse_loss(prediction, target)
    }

    fn calculate_loss_gradient(
        &self,
        prediction: &Matrix<T>,
        target: &Matrix<T>,
    ) -> Result<Matrix<T>> {
        check_shapes(prediction, target)?;
        let two = T::from_f64(2.0);
        prediction.zip_map(target, |p, t| two * (p - t))
    }
}

/// MSE as a free function, accumulated in f64.
pub fn mse_loss<T: Element>(prediction: &Matrix<T>, target: &Matrix<T>) -> Result<f64> {
    check_shapes(prediction, target)?;
    if prediction.elem_count() == 0 {
        return Ok(0.0);
    }
    let sum: f64 = prediction
        .data()
        .iter()
        .zip(target.data())
        .map(|(&p, &t)| {
            let d = p.to_f64() - t.to_f64();
            d * d
        })
        .sum();
    Ok(sum / prediction.elem_count() as f64)
}
