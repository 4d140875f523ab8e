// Layer — An ordered pipeline of operations with one declared input width
//
// A layer threads its input through each operation in turn; the output of
// one operation becomes the input of the next. Backward walks the same list
// in exactly reverse order.
//
// Example:
//   let mut layer = Layer::new(4, vec![
//       Operation::weights(w),       // [1, 4] -> [1, 3]
//       Operation::bias(b)?,         // [1, 3] -> [1, 3]
//       Operation::sigmoid(),
//   ])?;
//   let y = layer.forward(&x)?;
//   let dx = layer.backward(&dy, true, 0.01)?;
//
// ERRORS:
//
//   input.columns != input_width        → ShapeMismatch (the caller's input is wrong)
//   an operation rejects its predecessor → LayerComposition (the layer is mis-wired)
//   backward before forward             → OperationNotReady
//   gradient shape != last output shape → ShapeMismatch
//
// Backward is not atomic: if an operation fails halfway through, updates
// already applied by operations later in the list stay applied.

use rand::RngCore;
use tracing::debug;
use wren_core::{Element, Error, Matrix, Result, Shape};

use crate::activation::Sigmoid;
use crate::bias::Bias;
use crate::operation::{Differentiable, Operation, Trace};
use crate::weights::Weights;

/// A sequence of operations sharing one input width.
#[derive(Debug)]
pub struct Layer<T: Element> {
    input_width: usize,
    operations: Vec<Operation<T>>,
    traces: Option<Vec<Trace<T>>>,
    last_output_shape: Option<Shape>,
}

impl<T: Element> Layer<T> {
    /// Build a layer from its input width and operations, in forward order.
    pub fn new(input_width: usize, operations: Vec<Operation<T>>) -> Result<Self> {
        if input_width == 0 {
            return Err(Error::config("layer input width must be positive"));
        }
        if operations.is_empty() {
            return Err(Error::config("layer needs at least one operation"));
        }
        Ok(Layer {
            input_width,
            operations,
            traces: None,
            last_output_shape: None,
        })
    }

    /// A fully connected sigmoid layer: Weights (Xavier) → Bias (zero) → Sigmoid.
    pub fn dense<R: RngCore + ?Sized>(
        input_width: usize,
        output_width: usize,
        rng: &mut R,
    ) -> Result<Self> {
        Self::new(
            input_width,
            vec![
                Operation::WeightedTransform(Weights::xavier(input_width, output_width, rng)?),
                Operation::BiasAdd(Bias::new(output_width)),
                Operation::Sigmoid(Sigmoid),
            ],
        )
    }

    /// The declared input width.
    pub fn input_width(&self) -> usize {
        self.input_width
    }

    /// The output width, when every operation can report it without data.
    pub fn output_width(&self) -> Option<usize> {
        self.operations.iter().try_fold(self.input_width, |width, op| {
            op.output_width_for(width).ok().flatten()
        })
    }

    /// The operations, in forward order.
    pub fn operations(&self) -> &[Operation<T>] {
        &self.operations
    }

    /// Mutable access to the operations, in forward order.
    pub fn operations_mut(&mut self) -> &mut [Operation<T>] {
        &mut self.operations
    }

    /// Total number of scalar parameters.
    pub fn num_parameters(&self) -> usize {
        self.operations.iter().map(|op| op.num_parameters()).sum()
    }

    /// Shape of the output of the most recent `forward`.
    pub fn last_output_shape(&self) -> Option<Shape> {
        self.last_output_shape
    }

    /// Re-draw every parameter uniformly from [low, high).
    pub fn randomize(&mut self, low: f64, high: f64, rng: &mut dyn RngCore) -> Result<()> {
        for op in &mut self.operations {
            op.randomize_parameter(low, high, rng)?;
        }
        Ok(())
    }

    fn check_input(&self, input: &Matrix<T>) -> Result<()> {
        if input.columns() != self.input_width {
            return Err(Error::ShapeMismatch {
                op: "layer_forward",
                expected: Shape::new(input.rows(), self.input_width),
                got: input.shape(),
            });
        }
        Ok(())
    }

    /// Run the input through every operation, recording what backward needs.
    pub fn forward(&mut self, input: &Matrix<T>) -> Result<Matrix<T>> {
        self.check_input(input)?;
        self.traces = None;
        let mut traces = Vec::with_capacity(self.operations.len());
        let mut out = input.clone();
        for (position, op) in self.operations.iter().enumerate() {
            let (next, trace) = op
                .forward(&out)
                .map_err(|e| composition_error(position, op.name(), e))?;
            traces.push(trace);
            out = next;
        }
        self.last_output_shape = Some(out.shape());
        self.traces = Some(traces);
        Ok(out)
    }

    /// Forward pass without recording anything for backward.
    pub fn infer(&self, input: &Matrix<T>) -> Result<Matrix<T>> {
        self.check_input(input)?;
        let mut out = input.clone();
        for (position, op) in self.operations.iter().enumerate() {
            out = op
                .forward(&out)
                .map_err(|e| composition_error(position, op.name(), e))?
                .0;
        }
        Ok(out)
    }

    /// Propagate `grad` back through the operations, in reverse order.
    ///
    /// When `train` is set, each parameterized operation applies its
    /// accumulated gradient right after its own backward. Returns the
    /// gradient with respect to the layer input. Consumes the traces of the
    /// last forward; a second backward needs a new forward.
    pub fn backward(
        &mut self,
        grad: &Matrix<T>,
        train: bool,
        learning_rate: f64,
    ) -> Result<Matrix<T>> {
        let expected = match (self.last_output_shape, self.traces.is_some()) {
            (Some(shape), true) => shape,
            _ => {
                return Err(Error::OperationNotReady {
                    op: "layer",
                    reason: "backward called without a preceding forward".into(),
                })
            }
        };
        if grad.shape() != expected {
            return Err(Error::ShapeMismatch {
                op: "layer_backward",
                expected,
                got: grad.shape(),
            });
        }
        let traces = self.traces.take().unwrap_or_default();

        let mut d = grad.clone();
        for (op, trace) in self.operations.iter_mut().zip(traces.iter()).rev() {
            d = op.backward(trace, &d)?;
            if train && op.apply_gradient(learning_rate)? {
                debug!(op = op.name(), learning_rate, "applied gradient");
            }
        }
        Ok(d)
    }
}

fn composition_error(position: usize, op: &'static str, e: Error) -> Error {
    if e.is_shape_error() {
        Error::LayerComposition {
            position,
            op,
            source: Box::new(e),
        }
    } else {
        e
    }
}
