// nn::init — Parameter initialization utilities
//
// Standalone functions for creating initialized parameter matrices. Layers
// call these from their constructors; they are public so that custom
// operations can use the same schemes.
//
// AVAILABLE INITIALIZERS:
//
//   uniform(shape, low, high, rng)               — U(low, high)
//   constant(shape, val)                         — all elements = val
//   xavier_uniform(fan_in, fan_out, rng)         — Glorot uniform, [fan_in, fan_out]
//
// Randomness always comes from a caller-supplied generator, so a seeded
// generator reproduces the same parameters.

use rand::RngCore;
use wren_core::{Element, Matrix, Result, Shape};

/// Initialize a matrix from a uniform distribution U(low, high).
///
/// Fails with a configuration error unless both bounds are finite and
/// `low < high`.
pub fn uniform<T: Element, R: RngCore + ?Sized>(
    shape: impl Into<Shape>,
    low: f64,
    high: f64,
    rng: &mut R,
) -> Result<Matrix<T>> {
    let mut m = Matrix::zeros(shape);
    m.randomize(low, high, rng)?;
    Ok(m)
}

/// Initialize a matrix with a constant value.
pub fn constant<T: Element>(shape: impl Into<Shape>, val: f64) -> Matrix<T> {
    Matrix::full(shape, T::from_f64(val))
}

/// The Xavier (Glorot) uniform bound: sqrt(6 / (fan_in + fan_out)).
pub fn xavier_bound(fan_in: usize, fan_out: usize) -> f64 {
    (6.0 / (fan_in + fan_out).max(1) as f64).sqrt()
}

/// Xavier (Glorot) uniform initialization of a [fan_in, fan_out] matrix.
///
/// Draws from U(-a, a) where a = sqrt(6 / (fan_in + fan_out)). Keeps the
/// activation variance roughly constant through sigmoid layers.
pub fn xavier_uniform<T: Element, R: RngCore + ?Sized>(
    fan_in: usize,
    fan_out: usize,
    rng: &mut R,
) -> Result<Matrix<T>> {
    let a = xavier_bound(fan_in, fan_out);
    uniform((fan_in, fan_out), -a, a, rng)
}
