//! # wren-nn
//!
//! Operations, layers, losses and the training loop for Wren.
//!
//! Building blocks, from the bottom up:
//!
//! 1. **Param** — a learnable matrix with its accumulated gradient
//! 2. **Differentiable** — the forward/backward contract; forward returns a
//!    [`Trace`] that backward consumes
//! 3. **Operation** — the closed set of operation kinds: [`Weights`],
//!    [`Bias`], [`Sigmoid`] and closure-backed [`FunctionOp`]
//! 4. **Layer** — operations applied in order, backward in reverse
//! 5. **Loss** — [`MeanSquaredError`]
//! 6. **Network** — layers plus a loss; `train`, `test` and `infer`
//!
//! Everything is generic over the element type (`f32`, `f64`, `f16`, `bf16`).

pub mod activation;
pub mod bias;
pub mod config;
pub mod function;
pub mod init;
pub mod layer;
pub mod loss;
pub mod network;
pub mod operation;
pub mod param;
pub mod weights;

pub use activation::{sigmoid, Sigmoid};
pub use bias::Bias;
pub use config::TrainConfig;
pub use function::FunctionOp;
pub use layer::Layer;
pub use loss::{mse_loss, Loss, MeanSquaredError};
pub use network::{EpochLog, Network, TrainReport};
pub use operation::{Differentiable, Operation, Trace};
pub use param::Param;
pub use weights::Weights;
