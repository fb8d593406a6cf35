//! Conversion of expressions and block grids into concrete values.
use crate::assembly::{assemble_csr, assemble_row_streamed, block_vector_to_flat, resolve_blocks};
use crate::block::BlockMatrix;
use crate::collapse::collapse;
use crate::error::BlockError;
use crate::expr::{Expr, MatrixHandle, Value, VectorHandle};
use crate::Real;
use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Strategy for turning a block matrix into a single matrix.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssemblyStrategy {
    /// Concatenate the CSR representations of the blocks. This is the fast path.
    Csr,
    /// Assemble the matrix row by row from the rows of the blocks.
    RowStreamed,
    /// Opt out of monolithic assembly and keep the collapsed blocks.
    Blocks,
}

impl Default for AssemblyStrategy {
    fn default() -> Self {
        Self::Csr
    }
}

/// The result of [`convert`].
#[derive(Debug, Clone)]
pub enum Converted<T: Real> {
    Value(Value<T>),
    /// A block matrix whose blocks are all concrete matrices or zero scalars.
    Blocks(BlockMatrix<T>),
}

impl<T: Real> Converted<T> {
    pub fn into_value(self) -> Option<Value<T>> {
        match self {
            Self::Value(value) => Some(value),
            Self::Blocks(_) => None,
        }
    }

    pub fn into_matrix(self) -> Option<MatrixHandle<T>> {
        match self {
            Self::Value(Value::Matrix(a)) => Some(a),
            _ => None,
        }
    }

    pub fn into_vector(self) -> Option<VectorHandle<T>> {
        match self {
            Self::Value(Value::Vector(v)) => Some(v),
            _ => None,
        }
    }

    pub fn into_blocks(self) -> Option<BlockMatrix<T>> {
        match self {
            Self::Blocks(blocks) => Some(blocks),
            Self::Value(_) => None,
        }
    }
}

/// Assembles a block matrix into a single matrix with the given strategy.
///
/// Every block is collapsed first. Zero scalar blocks are treated as zero blocks of the
/// inferred shape, and non-zero scalar blocks as scaled identities.
pub fn assemble_monolithic<T: Real>(
    bmat: &BlockMatrix<T>,
    strategy: AssemblyStrategy,
) -> Result<Converted<T>, BlockError> {
    let resolved = resolve_blocks(bmat)?;
    let sizes = resolved.sizes();
    debug!(
        "Assembling {}x{} block matrix ({}x{} blocks) with strategy {:?}",
        sizes.total_rows(),
        sizes.total_cols(),
        resolved.num_block_rows(),
        resolved.num_block_cols(),
        strategy
    );

    let matrix = match strategy {
        AssemblyStrategy::Csr => assemble_csr(&resolved)?,
        AssemblyStrategy::RowStreamed => assemble_row_streamed(&resolved)?,
        AssemblyStrategy::Blocks => return Ok(Converted::Blocks(resolved.into_block_matrix()?)),
    };
    debug!("Assembled matrix has {} non-zeros", matrix.nnz());
    Ok(Converted::Value(Value::Matrix(Arc::new(matrix))))
}

/// Converts an expression into a concrete value.
///
/// Block vectors are concatenated into a single vector and block matrices are assembled
/// according to `strategy`. Any other expression is collapsed.
pub fn convert<T: Real>(expr: &Expr<T>, strategy: AssemblyStrategy) -> Result<Converted<T>, BlockError> {
    match expr {
        Expr::BlockVector(bvec) => {
            let flat = block_vector_to_flat(bvec)?;
            debug!("Concatenated block vector of {} components into length {}", bvec.len(), flat.len());
            Ok(Converted::Value(Value::Vector(Arc::new(flat))))
        }
        Expr::BlockMatrix(bmat) => assemble_monolithic(bmat, strategy),
        expr => collapse(expr).map(Converted::Value),
    }
}
