use crate::dtype::DType;
use crate::shape::Shape;

/// All errors that can occur within Wren.
///
/// This enum captures every failure mode of the engine: algebra on
/// incompatible shapes, out-of-range indexing, invalid hyperparameters,
/// mismatched datasets and misuse of the forward/backward protocol.
/// Using a single error type across the workspace simplifies propagation;
/// [`Error::kind`] recovers the coarse category when a caller needs to tell
/// malformed input apart from wiring mistakes.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Shape mismatch between two matrices (e.g., adding [2, 3] + [4, 5]).
    #[error("{op}: shape mismatch, expected {expected}, got {got}")]
    ShapeMismatch {
        op: &'static str,
        expected: Shape,
        got: Shape,
    },

    /// Matrix product dimension mismatch.
    #[error("matmul shape mismatch: [{m}x{k1}] @ [{k2}x{n}], inner dims must match")]
    MatmulShapeMismatch {
        m: usize,
        k1: usize,
        k2: usize,
        n: usize,
    },

    /// Element count mismatch when creating from a flat vec.
    #[error("element count mismatch: shape {shape} requires {expected} elements, got {got}")]
    ElementCountMismatch {
        shape: Shape,
        expected: usize,
        got: usize,
    },

    /// Nested rows of unequal length.
    #[error("ragged rows: row {row} has {got} columns, expected {expected}")]
    RaggedRows {
        row: usize,
        expected: usize,
        got: usize,
    },

    /// Element access outside the matrix.
    #[error("index ({row}, {col}) out of bounds for matrix of shape {shape}")]
    IndexOutOfBounds { row: usize, col: usize, shape: Shape },

    /// Input and target collections differ in length.
    #[error("batch size mismatch: {inputs} inputs but {targets} targets")]
    BatchSizeMismatch { inputs: usize, targets: usize },

    /// Invalid hyperparameter or construction argument.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// An operation inside a layer rejected the output of its predecessor.
    #[error("layer composition error at operation {position} ({op}): {source}")]
    LayerComposition {
        position: usize,
        op: &'static str,
        #[source]
        source: Box<Error>,
    },

    /// backward() called without a matching forward().
    #[error("operation {op} not ready for backward: {reason}")]
    OperationNotReady { op: &'static str, reason: String },

    /// A value could not be represented in the target element type.
    #[error("cannot cast {value} from {from} to {to}")]
    Cast { value: f64, from: DType, to: DType },
}

/// Coarse error category, mirroring the engine's error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Incompatible algebra: shapes, element counts, ragged input.
    Shape,
    /// Out-of-range element access.
    Index,
    /// Input/target count mismatch.
    BatchSizeMismatch,
    /// Invalid hyperparameters or construction arguments.
    Config,
    /// Operations inside a layer are wired incompatibly.
    LayerComposition,
    /// backward without forward.
    OperationNotReady,
    /// Anything else.
    Other,
}

impl Error {
    /// Create a configuration error.
    pub fn config(s: impl Into<String>) -> Self {
        Error::Config(s.into())
    }

    /// The category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ShapeMismatch { .. }
            | Error::MatmulShapeMismatch { .. }
            | Error::ElementCountMismatch { .. }
            | Error::RaggedRows { .. } => ErrorKind::Shape,
            Error::IndexOutOfBounds { .. } => ErrorKind::Index,
            Error::BatchSizeMismatch { .. } => ErrorKind::BatchSizeMismatch,
            Error::Config(_) => ErrorKind::Config,
            Error::LayerComposition { .. } => ErrorKind::LayerComposition,
            Error::OperationNotReady { .. } => ErrorKind::OperationNotReady,
            Error::Cast { .. } => ErrorKind::Other,
        }
    }

    /// Whether this is a shape error.
    pub fn is_shape_error(&self) -> bool {
        self.kind() == ErrorKind::Shape
    }
}

/// Convenience Result type used throughout Wren.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        let e = Error::ShapeMismatch {
            op: "add",
            expected: Shape::new(2, 3),
            got: Shape::new(4, 5),
        };
        assert_eq!(e.kind(), ErrorKind::Shape);
        assert!(e.is_shape_error());
        assert_eq!(e.to_string(), "add: shape mismatch, expected [2, 3], got [4, 5]");

        let e = Error::BatchSizeMismatch {
            inputs: 5,
            targets: 4,
        };
        assert_eq!(e.kind(), ErrorKind::BatchSizeMismatch);
        assert!(!e.is_shape_error());
    }

    #[test]
    fn test_layer_composition_keeps_source() {
        let inner = Error::MatmulShapeMismatch {
            m: 1,
            k1: 3,
            k2: 4,
            n: 2,
        };
        let e = Error::LayerComposition {
            position: 1,
            op: "weights",
            source: Box::new(inner),
        };
        assert_eq!(e.kind(), ErrorKind::LayerComposition);
        let source = std::error::Error::source(&e).map(|s| s.to_string());
        assert_eq!(
            source.as_deref(),
            Some("matmul shape mismatch: [1x3] @ [4x2], inner dims must match")
        );
    }
}
