// Operation — The forward/backward contract every computation step follows
//
// An operation turns an input matrix into an output matrix (forward) and,
// given the gradient of the loss with respect to that output, produces the
// gradient with respect to its input (backward). Parameterized operations
// also add their parameter gradient into an accumulator on the way.
//
// TRACES INSTEAD OF CACHED FIELDS:
//
// forward() takes &self and returns the output together with a Trace: the
// input and output the backward pass needs. backward() takes that Trace
// back. The operation itself holds no per-call state, so a trace can only
// come from a forward that actually happened, and two forwards on the same
// operation cannot clobber each other's cache.
//
// A CLOSED SET OF VARIANTS:
//
// The Differentiable trait is the single capability interface. The
// Operation enum wraps the concrete kinds a layer can hold:
//
//   WeightedTransform — y = x @ W           (parameterized)
//   BiasAdd           — y = x + b, row-wise (parameterized)
//   Sigmoid           — y = σ(x)            (stateless)
//   Custom            — closures supplied by the caller
//
// Stateless operations inherit the default parameter hooks, which report
// no parameter and treat apply/reset as no-ops.

use rand::RngCore;
use wren_core::{Element, Error, Matrix, Result};

use crate::activation::Sigmoid;
use crate::bias::Bias;
use crate::function::FunctionOp;
use crate::param::Param;
use crate::weights::Weights;

/// What one forward call saw: the context its backward call needs.
#[derive(Debug, Clone)]
pub struct Trace<T: Element> {
    op: &'static str,
    input: Matrix<T>,
    output: Matrix<T>,
}

impl<T: Element> Trace<T> {
    /// Record a forward call of the operation named `op`.
    pub fn new(op: &'static str, input: Matrix<T>, output: Matrix<T>) -> Self {
        Trace { op, input, output }
    }

    /// Name of the operation that produced this trace.
    pub fn op(&self) -> &'static str {
        self.op
    }

    /// The input the forward pass received.
    pub fn input(&self) -> &Matrix<T> {
        &self.input
    }

    /// The output the forward pass produced.
    pub fn output(&self) -> &Matrix<T> {
        &self.output
    }

    /// Fail unless this trace was produced by an operation named `op`.
    pub fn expect_owner(&self, op: &'static str) -> Result<()> {
        if self.op != op {
            return Err(Error::OperationNotReady {
                op,
                reason: format!("trace was produced by {}", self.op),
            });
        }
        Ok(())
    }

    /// Fail unless `d_output` has the shape of the recorded output.
    pub fn expect_output_shape(&self, d_output: &Matrix<T>) -> Result<()> {
        if d_output.shape() != self.output.shape() {
            return Err(Error::ShapeMismatch {
                op: self.op,
                expected: self.output.shape(),
                got: d_output.shape(),
            });
        }
        Ok(())
    }
}

/// The interface every differentiable operation implements.
///
/// Required:
/// - `name()`: a short, stable identifier (also stamped on traces)
/// - `forward()`: compute the output and the trace for backward
/// - `backward()`: turn the output gradient into the input gradient,
///   accumulating any parameter gradient
///
/// Parameterized operations override `param()`/`param_mut()`; everything
/// else about parameters is derived from those two.
pub trait Differentiable<T: Element> {
    /// Short identifier of this operation kind.
    fn name(&self) -> &'static str;

    /// Compute the output for `input`, plus the trace backward needs.
    fn forward(&self, input: &Matrix<T>) -> Result<(Matrix<T>, Trace<T>)>;

    /// Given dLoss/dOutput for the forward recorded in `trace`, return
    /// dLoss/dInput. Parameterized operations add dLoss/dParameter into
    /// their accumulated gradient; they never replace it.
    fn backward(&mut self, trace: &Trace<T>, d_output: &Matrix<T>) -> Result<Matrix<T>>;

    /// The learnable parameter, if any.
    fn param(&self) -> Option<&Param<T>> {
        None
    }

    /// Mutable access to the learnable parameter, if any.
    fn param_mut(&mut self) -> Option<&mut Param<T>> {
        None
    }

    /// Width of the output for a given input width.
    ///
    /// `Ok(None)` means the width cannot be known without running forward.
    /// An error means no input of that width can be accepted.
    fn output_width_for(&self, input_width: usize) -> Result<Option<usize>> {
        Ok(Some(input_width))
    }

    /// Whether this operation owns a learnable parameter.
    fn is_parameterized(&self) -> bool {
        self.param().is_some()
    }

    /// The current parameter value.
    fn parameter(&self) -> Option<&Matrix<T>> {
        self.param().map(Param::value)
    }

    /// The gradient accumulated since the last apply.
    fn accumulated_gradient(&self) -> Option<&Matrix<T>> {
        self.param().map(Param::grad)
    }

    /// parameter ← parameter − learning_rate × accumulated gradient, then
    /// zero the gradient. Returns whether an update happened.
    fn apply_gradient(&mut self, learning_rate: f64) -> Result<bool> {
        match self.param_mut() {
            Some(p) => p.apply(learning_rate),
            None => Ok(false),
        }
    }

    /// Discard the accumulated gradient.
    fn reset_gradient(&mut self) {
        if let Some(p) = self.param_mut() {
            p.reset();
        }
    }

    /// Re-draw the parameter uniformly from [low, high). No-op when stateless.
    fn randomize_parameter(&mut self, low: f64, high: f64, rng: &mut dyn RngCore) -> Result<()> {
        match self.param_mut() {
            Some(p) => p.randomize(low, high, rng),
            None => Ok(()),
        }
    }

    /// Number of scalar parameters.
    fn num_parameters(&self) -> usize {
        self.param().map_or(0, |p| p.value().elem_count())
    }
}

/// One step of a layer's pipeline.
#[derive(Debug)]
pub enum Operation<T: Element> {
    /// y = x @ W
    WeightedTransform(Weights<T>),
    /// y = x + b, b broadcast over rows
    BiasAdd(Bias<T>),
    /// y = 1 / (1 + e^-x)
    Sigmoid(Sigmoid),
    /// Caller-supplied closures
    Custom(FunctionOp<T>),
}

impl<T: Element> Operation<T> {
    /// Weights from an explicit matrix of shape [input_width, output_width].
    pub fn weights(weights: Matrix<T>) -> Self {
        Operation::WeightedTransform(Weights::from_matrix(weights))
    }

    /// Bias from an explicit single-row matrix.
    pub fn bias(bias: Matrix<T>) -> Result<Self> {
        Ok(Operation::BiasAdd(Bias::from_matrix(bias)?))
    }

    /// The sigmoid activation.
    pub fn sigmoid() -> Self {
        Operation::Sigmoid(Sigmoid)
    }

    /// A closure-backed operation.
    pub fn custom(op: FunctionOp<T>) -> Self {
        Operation::Custom(op)
    }
}

impl<T: Element> From<Weights<T>> for Operation<T> {
    fn from(w: Weights<T>) -> Self {
        Operation::WeightedTransform(w)
    }
}

impl<T: Element> From<Bias<T>> for Operation<T> {
    fn from(b: Bias<T>) -> Self {
        Operation::BiasAdd(b)
    }
}

impl<T: Element> From<Sigmoid> for Operation<T> {
    fn from(s: Sigmoid) -> Self {
        Operation::Sigmoid(s)
    }
}

impl<T: Element> From<FunctionOp<T>> for Operation<T> {
    fn from(f: FunctionOp<T>) -> Self {
        Operation::Custom(f)
    }
}

macro_rules! dispatch {
    ($self:expr, $op:ident => $body:expr) => {
        match $self {
            Operation::WeightedTransform($op) => $body,
            Operation::BiasAdd($op) => $body,
            Operation::Sigmoid($op) => $body,
            Operation::Custom($op) => $body,
        }
    };
}

impl<T: Element> Differentiable<T> for Operation<T> {
    fn name(&self) -> &'static str {
        dispatch!(self, op => Differentiable::<T>::name(op))
    }

    fn forward(&self, input: &Matrix<T>) -> Result<(Matrix<T>, Trace<T>)> {
        dispatch!(self, op => Differentiable::<T>::forward(op, input))
    }

    fn backward(&mut self, trace: &Trace<T>, d_output: &Matrix<T>) -> Result<Matrix<T>> {
        dispatch!(self, op => Differentiable::<T>::backward(op, trace, d_output))
    }

    fn param(&self) -> Option<&Param<T>> {
        dispatch!(self, op => Differentiable::<T>::param(op))
    }

    fn param_mut(&mut self) -> Option<&mut Param<T>> {
        dispatch!(self, op => Differentiable::<T>::param_mut(op))
    }

    fn output_width_for(&self, input_width: usize) -> Result<Option<usize>> {
        dispatch!(self, op => Differentiable::<T>::output_width_for(op, input_width))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wren_core::ErrorKind;

    #[test]
    fn test_scenario_weights_then_bias() {
        let w = Operation::weights(Matrix::full((4, 3), 1.0));
        let b = Operation::bias(Matrix::from_array([[1.0, 1.0, 1.0]])).unwrap();
        let x = Matrix::from_array([[1.0, 2.0, 3.0, 4.0]]);

        let (h, _) = w.forward(&x).unwrap();
        assert_eq!(h.data(), &[10.0, 10.0, 10.0]);
        let (y, _) = b.forward(&h).unwrap();
        assert_eq!(y.data(), &[11.0, 11.0, 11.0]);
    }

    #[test]
    fn test_trace_from_other_op_is_rejected() {
        let mut w = Operation::weights(Matrix::<f64>::identity(2));
        let s = Operation::<f64>::sigmoid();
        let (_, trace) = s.forward(&Matrix::new(1, 2)).unwrap();

        let err = w.backward(&trace, &Matrix::new(1, 2)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OperationNotReady);
        assert!(w.accumulated_gradient().unwrap().is_zero());
    }

    #[test]
    fn test_parameter_hooks() {
        let mut w = Operation::weights(Matrix::from_array([[2.0]]));
        let mut s = Operation::<f64>::sigmoid();
        assert!(w.is_parameterized());
        assert!(!s.is_parameterized());
        assert_eq!(w.num_parameters(), 1);
        assert_eq!(s.num_parameters(), 0);
        assert!(s.parameter().is_none());
        assert!(!s.apply_gradient(0.1).unwrap());
        s.reset_gradient();

        let (_, trace) = w.forward(&Matrix::from_array([[3.0]])).unwrap();
        w.backward(&trace, &Matrix::from_array([[1.0]])).unwrap();
        assert_eq!(w.accumulated_gradient().unwrap().data(), &[3.0]);
        assert!(w.apply_gradient(0.5).unwrap());
        // 2 - 0.5 * 3
        assert_eq!(w.parameter().unwrap().data(), &[0.5]);
        assert!(w.accumulated_gradient().unwrap().is_zero());
    }

    #[test]
    fn test_names_and_widths() {
        let w: Operation<f32> = Weights::new(3, 2).into();
        let b: Operation<f32> = Bias::new(2).into();
        let s: Operation<f32> = Sigmoid.into();
        assert_eq!(w.name(), "weights");
        assert_eq!(b.name(), "bias");
        assert_eq!(s.name(), "sigmoid");
        assert_eq!(w.output_width_for(3).unwrap(), Some(2));
        assert_eq!(b.output_width_for(2).unwrap(), Some(2));
        assert!(b.output_width_for(3).is_err());
        assert_eq!(s.output_width_for(7).unwrap(), Some(7));
    }
}
