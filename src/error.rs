//! Library-wide error type.
use crate::dims::Dims;
use std::error::Error;
use std::fmt;
use std::fmt::{Display, Formatter};

/// Axis of a block grid.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BlockAxis {
    Row,
    Column,
}

impl Display for BlockAxis {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Row => write!(f, "row"),
            Self::Column => write!(f, "column"),
        }
    }
}

#[derive(Debug)]
#[non_exhaustive]
pub enum BlockError {
    /// The operands of a binary operation have incompatible dimensions.
    IncompatibleShapes {
        operation: &'static str,
        lhs: Dims,
        rhs: Dims,
    },
    /// A non-zero scalar cannot be promoted to a scaled identity of a non-square shape.
    NonSquareIdentity { rows: usize, cols: usize },
    /// A block grid was constructed from rows of different lengths.
    RaggedBlockGrid { row: usize, expected: usize, actual: usize },
    /// The blocks in a block row or column do not agree on a single size.
    ///
    /// An empty list of sizes means that no block in the row/column determines its size.
    InconsistentBlockSizes {
        axis: BlockAxis,
        index: usize,
        sizes: Vec<usize>,
    },
    /// An expression of the given kind cannot be handled by the requested operation.
    UnsupportedOperation { kind: String },
    /// A backend kernel failed.
    Backend(Box<dyn Error + Send + Sync>),
    IndexOutOfBounds { index: usize, len: usize },
    ComponentCountMismatch { expected: usize, actual: usize },
    /// A supplied component does not belong to the expected space.
    SpaceMismatch { index: usize },
    ComponentLengthMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },
}

impl BlockError {
    pub(crate) fn unsupported(kind: impl Into<String>) -> Self {
        Self::UnsupportedOperation { kind: kind.into() }
    }

    pub(crate) fn backend(err: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        Self::Backend(err.into())
    }

    /// Whether the error describes incompatible or inconsistent dimensions.
    pub fn is_shape_error(&self) -> bool {
        matches!(
            self,
            Self::IncompatibleShapes { .. }
                | Self::NonSquareIdentity { .. }
                | Self::RaggedBlockGrid { .. }
                | Self::InconsistentBlockSizes { .. }
        )
    }
}

impl Display for BlockError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::IncompatibleShapes { operation, lhs, rhs } => {
                write!(f, "Incompatible shapes for {}: {} and {}", operation, lhs, rhs)
            }
            Self::NonSquareIdentity { rows, cols } => {
                write!(f, "Cannot promote scalar to identity of non-square shape {}x{}", rows, cols)
            }
            Self::RaggedBlockGrid { row, expected, actual } => {
                write!(f, "Block row {} has {} blocks, expected {}", row, actual, expected)
            }
            Self::InconsistentBlockSizes { axis, index, sizes } if sizes.is_empty() => {
                write!(f, "No block in block {} {} determines its size", axis, index)
            }
            Self::InconsistentBlockSizes { axis, index, sizes } => {
                write!(f, "Inconsistent sizes {:?} in block {} {}", sizes, axis, index)
            }
            Self::UnsupportedOperation { kind } => {
                write!(f, "Unsupported operation for expression of kind {}", kind)
            }
            Self::Backend(err) => write!(f, "Backend error: {}", err),
            Self::IndexOutOfBounds { index, len } => {
                write!(f, "Index {} out of bounds for length {}", index, len)
            }
            Self::ComponentCountMismatch { expected, actual } => {
                write!(f, "Expected {} components, got {}", expected, actual)
            }
            Self::SpaceMismatch { index } => {
                write!(f, "Component {} does not belong to the corresponding space", index)
            }
            Self::ComponentLengthMismatch { index, expected, actual } => {
                write!(
                    f,
                    "Component {} has length {}, but its space has dimension {}",
                    index, actual, expected
                )
            }
        }
    }
}

impl Error for BlockError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Backend(err) => Some(&**err),
            _ => None,
        }
    }
}
