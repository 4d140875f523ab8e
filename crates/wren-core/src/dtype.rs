use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

// DType — Supported element types
//
// Every matrix is generic over one element type. The engine only needs
// ordinary field arithmetic plus a way in and out of f64, so we support the
// floating-point types that make sense for gradient descent:
//
//   F16  — 16-bit IEEE half float
//   BF16 — 16-bit brain float
//   F32  — 32-bit float, the default workhorse
//   F64  — 64-bit float, for high-precision work and gradient checks
//
// Integer types are deliberately absent: sigmoid and fractional learning
// rates have no meaningful integer semantics.

/// Enum of all supported element data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    F16,
    BF16,
    F32,
    F64,
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DType::F16 => "f16",
            DType::BF16 => "bf16",
            DType::F32 => "f32",
            DType::F64 => "f64",
        };
        write!(f, "{}", s)
    }
}

// Element — Trait that connects Rust types to DType
//
// This is the minimal arithmetic capability set the whole engine is
// parametrised over: + - * / and negation come from the std::ops bounds,
// to_f64/from_f64 are the bridge used for transcendental functions (exp in
// sigmoid), for learning rates and for widened accumulation in sums.
//
//   fn sigmoid<T: Element>(x: T) -> T {
//       T::from_f64(1.0 / (1.0 + (-x.to_f64()).exp()))
//   }

/// Trait implemented by Rust types that can be stored in a matrix.
pub trait Element:
    Copy
    + Send
    + Sync
    + 'static
    + fmt::Debug
    + fmt::Display
    + PartialEq
    + PartialOrd
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
{
    /// The corresponding DType enum variant.
    const DTYPE: DType;

    /// Convert this value to f64.
    fn to_f64(self) -> f64;

    /// Create a value of this type from f64 (rounding to nearest).
    fn from_f64(v: f64) -> Self;

    /// The largest value of this type strictly below `self`.
    /// NaN and negative infinity come back unchanged.
    fn next_down(self) -> Self;

    /// The additive identity.
    fn zero() -> Self {
        Self::from_f64(0.0)
    }

    /// The multiplicative identity.
    fn one() -> Self {
        Self::from_f64(1.0)
    }
}

// Stepping down one ulp works on the raw bits: moving toward zero for
// positive values, away from zero for negative ones. Both zeros step to the
// smallest negative subnormal.
macro_rules! next_down_bits {
    ($v:expr, $t:ty, $neg_tiny:expr) => {{
        let v: $t = $v;
        let zero = <$t>::from_bits(0);
        if v.is_nan() || v == <$t>::NEG_INFINITY {
            v
        } else if v == zero {
            <$t>::from_bits($neg_tiny)
        } else if v > zero {
            <$t>::from_bits(v.to_bits() - 1)
        } else {
            <$t>::from_bits(v.to_bits() + 1)
        }
    }};
}

impl Element for f32 {
    const DTYPE: DType = DType::F32;
    fn to_f64(self) -> f64 {
        self as f64
    }
    fn from_f64(v: f64) -> Self {
        v as f32
    }
    fn next_down(self) -> Self {
        next_down_bits!(self, f32, 0x8000_0001)
    }
}

impl Element for f64 {
    const DTYPE: DType = DType::F64;
    fn to_f64(self) -> f64 {
        self
    }
    fn from_f64(v: f64) -> Self {
        v
    }
    fn next_down(self) -> Self {
        next_down_bits!(self, f64, 0x8000_0000_0000_0001)
    }
}

impl Element for half::f16 {
    const DTYPE: DType = DType::F16;
    fn to_f64(self) -> f64 {
        self.to_f64()
    }
    fn from_f64(v: f64) -> Self {
        half::f16::from_f64(v)
    }
    fn next_down(self) -> Self {
        next_down_bits!(self, half::f16, 0x8001)
    }
}

impl Element for half::bf16 {
    const DTYPE: DType = DType::BF16;
    fn to_f64(self) -> f64 {
        self.to_f64()
    }
    fn from_f64(v: f64) -> Self {
        half::bf16::from_f64(v)
    }
    fn next_down(self) -> Self {
        next_down_bits!(self, half::bf16, 0x8001)
    }
}
