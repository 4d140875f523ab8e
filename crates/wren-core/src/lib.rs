//! # wren-core
//!
//! Core matrix primitives, element types and errors for Wren.
//!
//! This crate provides:
//! - [`Matrix`] — dense, row-major 2-D matrix with shape-checked algebra
//! - [`Shape`] — the (rows, columns) pair that gates every operation
//! - [`Element`] / [`DType`] — the numeric element types (f16, bf16, f32, f64)
//! - [`Error`] / [`ErrorKind`] — the single error type used across the workspace
// - DType/Element: supported numeric types and the arithmetic they must offer
// - Shape: 2-D shape representation
// - Matrix: the value passed between operations, layers and networks
// - Error: shape, index, config, batch and protocol failures

pub mod dtype;
pub mod error;
pub mod matrix;
pub mod shape;

pub use dtype::{DType, Element};
pub use error::{Error, ErrorKind, Result};
pub use matrix::Matrix;
pub use shape::Shape;
