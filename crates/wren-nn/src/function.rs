// FunctionOp — An operation assembled from closures
//
// Lets callers define a custom operation without writing a new type: the
// forward function and the gradient functions are passed in as closures.
// Two flavours mirror the two kinds of operation:
//
//   stateless(name, output, input_grad)
//       output(x)             -> y
//       input_grad(x, y, dY)  -> dX
//
//   parameterized(name, param, output, input_grad, param_grad)
//       output(x, P)          -> y
//       input_grad(dY, P)     -> dX
//       param_grad(x, dY)     -> dP, added into the accumulated gradient
//
// Closure results are shape-checked before anything is accumulated: dX must
// have the input's shape and dP the parameter's.

use std::fmt;

use wren_core::{Element, Error, Matrix, Result};

use crate::operation::{Differentiable, Trace};
use crate::param::Param;

type UnaryFn<T> = Box<dyn Fn(&Matrix<T>) -> Result<Matrix<T>> + Send + Sync>;
type BinaryFn<T> = Box<dyn Fn(&Matrix<T>, &Matrix<T>) -> Result<Matrix<T>> + Send + Sync>;
type TernaryFn<T> =
    Box<dyn Fn(&Matrix<T>, &Matrix<T>, &Matrix<T>) -> Result<Matrix<T>> + Send + Sync>;

enum Kind<T: Element> {
    Stateless {
        output: UnaryFn<T>,
        input_grad: TernaryFn<T>,
    },
    Parameterized {
        param: Param<T>,
        output: BinaryFn<T>,
        input_grad: BinaryFn<T>,
        param_grad: BinaryFn<T>,
    },
}

/// A closure-backed operation.
pub struct FunctionOp<T: Element> {
    name: &'static str,
    kind: Kind<T>,
}

impl<T: Element> FunctionOp<T> {
    /// A stateless operation: `output(x)` forward, `input_grad(x, y, dY)` backward.
    pub fn stateless<F, G>(name: &'static str, output: F, input_grad: G) -> Self
    where
        F: Fn(&Matrix<T>) -> Result<Matrix<T>> + Send + Sync + 'static,
        G: Fn(&Matrix<T>, &Matrix<T>, &Matrix<T>) -> Result<Matrix<T>> + Send + Sync + 'static,
    {
        FunctionOp {
            name,
            kind: Kind::Stateless {
                output: Box::new(output),
                input_grad: Box::new(input_grad),
            },
        }
    }

    /// A parameterized operation owning `param`.
    ///
    /// `output(x, P)` computes the forward pass, `input_grad(dY, P)` the
    /// input gradient and `param_grad(x, dY)` the parameter gradient.
    pub fn parameterized<F, G, H>(
        name: &'static str,
        param: Matrix<T>,
        output: F,
        input_grad: G,
        param_grad: H,
    ) -> Self
    where
        F: Fn(&Matrix<T>, &Matrix<T>) -> Result<Matrix<T>> + Send + Sync + 'static,
        G: Fn(&Matrix<T>, &Matrix<T>) -> Result<Matrix<T>> + Send + Sync + 'static,
        H: Fn(&Matrix<T>, &Matrix<T>) -> Result<Matrix<T>> + Send + Sync + 'static,
    {
        FunctionOp {
            name,
            kind: Kind::Parameterized {
                param: Param::new(param),
                output: Box::new(output),
                input_grad: Box::new(input_grad),
                param_grad: Box::new(param_grad),
            },
        }
    }

    fn check_input_grad(&self, trace: &Trace<T>, d_input: &Matrix<T>) -> Result<()> {
        if d_input.shape() != trace.input().shape() {
            return Err(Error::ShapeMismatch {
                op: self.name,
                expected: trace.input().shape(),
                got: d_input.shape(),
            });
        }
        Ok(())
    }
}

impl<T: Element> Differentiable<T> for FunctionOp<T> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn forward(&self, input: &Matrix<T>) -> Result<(Matrix<T>, Trace<T>)> {
        let output = match &self.kind {
            Kind::Stateless { output, .. } => output(input)?,
            Kind::Parameterized { param, output, .. } => output(input, param.value())?,
        };
        Ok((output.clone(), Trace::new(self.name, input.clone(), output)))
    }

    fn backward(&mut self, trace: &Trace<T>, d_output: &Matrix<T>) -> Result<Matrix<T>> {
        trace.expect_owner(self.name)?;
        trace.expect_output_shape(d_output)?;
        let (d_input, d_param) = match &self.kind {
            Kind::Stateless { input_grad, .. } => {
                (input_grad(trace.input(), trace.output(), d_output)?, None)
            }
            Kind::Parameterized {
                param,
                input_grad,
                param_grad,
                ..
            } => (
                input_grad(d_output, param.value())?,
                Some(param_grad(trace.input(), d_output)?),
            ),
        };
        self.check_input_grad(trace, &d_input)?;
        if let (Some(d_param), Some(param)) = (d_param, self.param_mut()) {
            param.accumulate(&d_param)?;
        }
        Ok(d_input)
    }

    fn param(&self) -> Option<&Param<T>> {
        match &self.kind {
            Kind::Stateless { .. } => None,
            Kind::Parameterized { param, .. } => Some(param),
        }
    }

    fn param_mut(&mut self) -> Option<&mut Param<T>> {
        match &mut self.kind {
            Kind::Stateless { .. } => None,
            Kind::Parameterized { param, .. } => Some(param),
        }
    }

    fn output_width_for(&self, _input_width: usize) -> Result<Option<usize>> {
        Ok(None)
    }
}

impl<T: Element> fmt::Debug for FunctionOp<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("FunctionOp");
        s.field("name", &self.name);
        match &self.kind {
            Kind::Stateless { .. } => s.field("param", &None::<()>),
            Kind::Parameterized { param, .. } => s.field("param", &Some(param.shape().to_string())),
        };
        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doubler() -> FunctionOp<f64> {
        FunctionOp::stateless(
            "double",
            |x| Ok(x.scale(2.0)),
            |_, _, d| Ok(d.scale(2.0)),
        )
    }

    fn scaler(k: f64) -> FunctionOp<f64> {
        // y = x * k for a 1x1 parameter k
        FunctionOp::parameterized(
            "scale",
            Matrix::from_array([[k]]),
            |x, p| Ok(x.scale(p.get(0, 0)?)),
            |d, p| Ok(d.scale(p.get(0, 0)?)),
            |x, d| Ok(Matrix::from_array([[x.hadamard(d)?.sum()]])),
        )
    }

    #[test]
    fn test_stateless_forward_backward() {
        let mut op = doubler();
        let x = Matrix::from_array([[1.0, -2.0]]);
        let (y, trace) = op.forward(&x).unwrap();
        assert_eq!(y.data(), &[2.0, -4.0]);
        let dx = op.backward(&trace, &Matrix::from_array([[1.0, 1.0]])).unwrap();
        assert_eq!(dx.data(), &[2.0, 2.0]);
        assert!(!op.is_parameterized());
    }

    #[test]
    fn test_parameterized_accumulates() {
        let mut op = scaler(3.0);
        let x = Matrix::from_array([[1.0, 2.0]]);
        let (y, trace) = op.forward(&x).unwrap();
        assert_eq!(y.data(), &[3.0, 6.0]);

        let dx = op.backward(&trace, &Matrix::from_array([[1.0, 1.0]])).unwrap();
        assert_eq!(dx.data(), &[3.0, 3.0]);
        assert_eq!(op.accumulated_gradient().unwrap().data(), &[3.0]);

        assert!(op.apply_gradient(0.5).unwrap());
        assert_eq!(op.parameter().unwrap().data(), &[1.5]);
    }

    #[test]
    fn test_wrong_input_gradient_shape_is_rejected() {
        let mut op = FunctionOp::<f64>::stateless(
            "broken",
            |x| Ok(x.clone()),
            |_, _, _| Ok(Matrix::new(2, 2)),
        );
        let (_, trace) = op.forward(&Matrix::new(1, 3)).unwrap();
        let err = op.backward(&trace, &Matrix::new(1, 3)).unwrap_err();
        assert!(err.is_shape_error());
    }

    #[test]
    fn test_wrong_param_gradient_shape_leaves_gradient_untouched() {
        let mut op = FunctionOp::parameterized(
            "broken",
            Matrix::from_array([[1.0]]),
            |x, _| Ok(x.clone()),
            |d, _| Ok(d.clone()),
            |_, _| Ok(Matrix::new(3, 3)),
        );
        let (_, trace) = op.forward(&Matrix::new(1, 2)).unwrap();
        assert!(op.backward(&trace, &Matrix::new(1, 2)).is_err());
        assert!(op.accumulated_gradient().unwrap().is_zero());
        assert_eq!(op.param().unwrap().pending(), 0);
    }

    #[test]
    fn test_debug_shows_name() {
        let s = format!("{:?}", scaler(1.0));
        assert!(s.contains("scale"));
        assert!(s.contains("[1, 1]"));
    }
}
