// Integration tests for wren-nn operations and layers
//
// These tests verify that the operations, the layer pipeline and the loss
// work together correctly, including gradient checks against finite
// differences.

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use wren::nn::sigmoid;
use wren::prelude::*;

fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() < tol
}

fn assert_vec_approx(got: &[f64], expected: &[f64], tol: f64) {
    assert_eq!(
        got.len(),
        expected.len(),
        "length mismatch: {} vs {}",
        got.len(),
        expected.len()
    );
    for (i, (g, e)) in got.iter().zip(expected.iter()).enumerate() {
        assert!(
            approx_eq(*g, *e, tol),
            "index {}: got {} expected {} (tol {})",
            i,
            g,
            e,
            tol
        );
    }
}

/// Sum of squared differences. Its gradient is exactly the MSE gradient 2(p - t).
fn sse(p: &Matrix<f64>, t: &Matrix<f64>) -> f64 {
    p.zip_map(t, |a, b| (a - b) * (a - b)).unwrap().sum()
}

// Weights and Bias

#[test]
fn test_row_sums_then_bias() -> wren::Result<()> {
    let mut layer = Layer::new(
        4,
        vec![
            Operation::weights(Matrix::full((4, 3), 1.0)),
            Operation::bias(Matrix::from_array([[1.0, 1.0, 1.0]]))?,
        ],
    )?;
    let x = Matrix::from_array([[1.0, 2.0, 3.0, 4.0]]);

    let (h, _) = layer.operations()[0].forward(&x)?;
    assert_eq!(h.to_vec2(), vec![vec![10.0, 10.0, 10.0]]);

    let y = layer.forward(&x)?;
    assert_eq!(y.to_vec2(), vec![vec![11.0, 11.0, 11.0]]);
    Ok(())
}

#[test]
fn test_weights_gradient_matches_finite_difference() -> wren::Result<()> {
    let w = Matrix::from_array([[0.2, -0.4], [0.7, 0.1], [-0.3, 0.5]]);
    let x = Matrix::from_array([[0.5, -1.0, 2.0]]);
    let t = Matrix::from_array([[0.3, -0.2]]);

    let mut op = Weights::from_matrix(w.clone());
    let (y, trace) = op.forward(&x)?;
    let d = MeanSquaredError.calculate_loss_gradient(&y, &t)?;
    op.backward(&trace, &d)?;
    let analytic = op.accumulated_gradient().unwrap().clone();

    let eps = 1e-5;
    for r in 0..w.rows() {
        for c in 0..w.columns() {
            let mut plus = w.clone();
            plus.set(r, c, w.get(r, c)? + eps)?;
            let mut minus = w.clone();
            minus.set(r, c, w.get(r, c)? - eps)?;
            let lp = sse(&Weights::from_matrix(plus).forward(&x)?.0, &t);
            let lm = sse(&Weights::from_matrix(minus).forward(&x)?.0, &t);
            let numeric = (lp - lm) / (2.0 * eps);
            assert!(
                approx_eq(analytic.get(r, c)?, numeric, 1e-6),
                "dW[{r},{c}]: analytic {} numeric {numeric}",
                analytic.get(r, c)?
            );
        }
    }
    Ok(())
}

#[test]
fn test_input_gradient_matches_finite_difference() -> wren::Result<()> {
    let mut rng = StdRng::seed_from_u64(17);
    let mut layer = Layer::<f64>::dense(3, 2, &mut rng)?;
    let x = Matrix::from_array([[0.4, -0.6, 0.9]]);
    let t = Matrix::from_array([[1.0, 0.0]]);

    let y = layer.forward(&x)?;
    let d = MeanSquaredError.calculate_loss_gradient(&y, &t)?;
    let dx = layer.backward(&d, false, 0.1)?;

    let eps = 1e-6;
    let mut numeric = Vec::new();
    for c in 0..x.columns() {
        let mut plus = x.clone();
        plus.set(0, c, x.get(0, c)? + eps)?;
        let mut minus = x.clone();
        minus.set(0, c, x.get(0, c)? - eps)?;
        let lp = sse(&layer.infer(&plus)?, &t);
        let lm = sse(&layer.infer(&minus)?, &t);
        numeric.push((lp - lm) / (2.0 * eps));
    }
    assert_vec_approx(dx.data(), &numeric, 1e-6);
    Ok(())
}

#[test]
fn test_gradient_is_zero_after_apply() -> wren::Result<()> {
    let mut rng = StdRng::seed_from_u64(3);
    let mut layer = Layer::<f64>::dense(4, 3, &mut rng)?;
    let x = Matrix::from_array([[0.1, 0.2, 0.3, 0.4]]);
    let y = layer.forward(&x)?;
    layer.backward(&y, false, 0.1)?;
    assert!(layer
        .operations()
        .iter()
        .filter_map(|op| op.accumulated_gradient())
        .any(|g| !g.is_zero()));

    for op in layer.operations_mut() {
        op.apply_gradient(0.1)?;
    }
    for op in layer.operations() {
        if let Some(g) = op.accumulated_gradient() {
            assert!(g.is_zero(), "{} kept a gradient", op.name());
        }
    }
    Ok(())
}

// Sigmoid

proptest! {
    #[test]
    fn prop_sigmoid_backward_is_analytic_derivative(x in -10.0f64..10.0) {
        let mut op = Operation::<f64>::sigmoid();
        let input = Matrix::from_array([[x]]);
        let (_, trace) = op.forward(&input).unwrap();
        let d = op.backward(&trace, &Matrix::from_array([[1.0]])).unwrap();
        let s = sigmoid(x);
        prop_assert!(approx_eq(d.data()[0], s * (1.0 - s), 1e-12));
        prop_assert!(s > 0.0 && s < 1.0);
    }
}

#[test]
fn test_sigmoid_in_f32() -> wren::Result<()> {
    let op = Operation::<f32>::sigmoid();
    let (y, _) = op.forward(&Matrix::from_array([[0.0f32, 1000.0, -1000.0]]))?;
    assert_eq!(y.data(), &[0.5, 1.0, 0.0]);
    Ok(())
}

// Layer errors

#[test]
fn test_layer_backward_with_wrong_shape() -> wren::Result<()> {
    let mut layer = Layer::new(
        4,
        vec![Operation::weights(Matrix::<f64>::full((4, 3), 1.0))],
    )?;
    let y = layer.forward(&Matrix::new(1, 4))?;
    assert_eq!(y.shape(), Shape::new(1, 3));

    let err = layer.backward(&Matrix::new(1, 4), true, 0.01).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Shape);
    assert_eq!(
        layer.operations()[0].parameter().unwrap(),
        &Matrix::full((4, 3), 1.0)
    );
    Ok(())
}

#[test]
fn test_wrong_input_and_wrong_wiring_are_distinguished() -> wren::Result<()> {
    let mut layer = Layer::new(
        3,
        vec![
            Operation::weights(Matrix::<f64>::new(3, 2)),
            Operation::bias(Matrix::new(1, 5))?,
        ],
    )?;
    let err = layer.forward(&Matrix::new(1, 4)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Shape);
    let err = layer.forward(&Matrix::new(1, 3)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LayerComposition);
    Ok(())
}

#[test]
fn test_backward_before_forward() -> wren::Result<()> {
    let mut layer = Layer::new(2, vec![Operation::<f64>::sigmoid()])?;
    let err = layer.backward(&Matrix::new(1, 2), false, 0.1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OperationNotReady);
    Ok(())
}

// Custom operations

#[test]
fn test_function_op_in_a_layer() -> wren::Result<()> {
    // y = x ⊙ k for a learnable row k
    let scale = FunctionOp::parameterized(
        "row_scale",
        Matrix::from_array([[1.0, 2.0]]),
        |x: &Matrix<f64>, k: &Matrix<f64>| x.hadamard(k),
        |d: &Matrix<f64>, k: &Matrix<f64>| d.hadamard(k),
        |x: &Matrix<f64>, d: &Matrix<f64>| x.hadamard(d),
    );
    let mut layer = Layer::new(2, vec![Operation::custom(scale), Operation::sigmoid()])?;
    assert_eq!(layer.output_width(), None);

    let y = layer.forward(&Matrix::from_array([[0.0, 0.0]]))?;
    assert_vec_approx(y.data(), &[0.5, 0.5], 1e-12);

    let x = Matrix::from_array([[1.0, -1.0]]);
    let y = layer.forward(&x)?;
    let dx = layer.backward(&Matrix::from_array([[1.0, 1.0]]), true, 1.0)?;
    let s = [sigmoid(1.0), sigmoid(-2.0)];
    let ds = [s[0] * (1.0 - s[0]), s[1] * (1.0 - s[1])];
    assert_vec_approx(y.data(), &s, 1e-12);
    assert_vec_approx(dx.data(), &[ds[0] * 1.0, ds[1] * 2.0], 1e-12);
    // k ← k − 1.0 · (x ⊙ dσ)
    let k = layer.operations()[0].parameter().unwrap();
    assert_vec_approx(k.data(), &[1.0 - ds[0], 2.0 + ds[1]], 1e-12);
    Ok(())
}

#[test]
fn test_randomize_parameters() -> wren::Result<()> {
    let mut layer = Layer::new(
        2,
        vec![
            Operation::weights(Matrix::<f64>::new(2, 2)),
            Operation::bias(Matrix::new(1, 2))?,
            Operation::sigmoid(),
        ],
    )?;
    layer.randomize(-0.5, 0.5, &mut StdRng::seed_from_u64(8))?;
    for op in layer.operations().iter().filter(|op| op.is_parameterized()) {
        let p = op.parameter().unwrap();
        assert!(!p.is_zero());
        assert!(p.data().iter().all(|v| (-0.5..0.5).contains(v)));
    }
    assert_eq!(layer.num_parameters(), 6);
    Ok(())
}
