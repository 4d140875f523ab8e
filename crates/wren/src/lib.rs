//! # Wren
//!
//! A small, strongly typed neural network engine built from scratch in Rust.
//!
//! This is the top-level facade crate that re-exports everything you need.
//!
//! ## Usage
//!
//! ```rust
//! use wren::prelude::*;
//!
//! # fn main() -> wren::Result<()> {
//! let layer = Layer::new(
//!     4,
//!     vec![
//!         Operation::weights(Matrix::full((4, 3), 1.0)),
//!         Operation::bias(Matrix::full((1, 3), 1.0))?,
//!     ],
//! )?;
//! let net = Network::new(vec![layer], MeanSquaredError)?;
//! let y = net.infer(&Matrix::from_array([[1.0, 2.0, 3.0, 4.0]]))?;
//! assert_eq!(y.data(), &[11.0, 11.0, 11.0]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! | Crate | Purpose |
//! |-------|----------|
//! | `wren-core` | Matrix, Shape, Element/DType, Error |
//! | `wren-nn` | Operations (Weights, Bias, Sigmoid, FunctionOp), Layer, Loss, Network |

/// Re-export core types.
pub use wren_core::{DType, Element, Error, ErrorKind, Matrix, Result, Shape};

/// Re-export operations, layers and the training loop.
pub mod nn {
    pub use wren_nn::*;
}

/// Prelude: import this for the most common types.
pub mod prelude {
    pub use crate::nn::{
        Bias, Differentiable, EpochLog, FunctionOp, Layer, Loss, MeanSquaredError, Network,
        Operation, Sigmoid, TrainConfig, TrainReport, Weights,
    };
    pub use crate::{DType, Element, Error, ErrorKind, Matrix, Shape};
}
