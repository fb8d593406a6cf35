//! Dimension inference for expressions and block grids.
//!
//! Dimensions are computed without evaluating any kernels. Scalars have no dimensions of
//! their own: in products they leave the other operand unchanged, and in sums they act as a
//! scaled identity of compatible shape.
use crate::block::{BlockMatrix, BlockVector};
use crate::error::{BlockAxis, BlockError};
use crate::expr::{Expr, Value};
use crate::Real;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::fmt::{Display, Formatter};

/// The dimensions of a vector or a matrix.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dims {
    Vector(usize),
    Matrix(usize, usize),
}

impl Dims {
    pub fn rows(&self) -> usize {
        match *self {
            Self::Vector(n) => n,
            Self::Matrix(rows, _) => rows,
        }
    }

    /// The number of columns, or `None` for vectors.
    pub fn cols(&self) -> Option<usize> {
        match *self {
            Self::Vector(_) => None,
            Self::Matrix(_, cols) => Some(cols),
        }
    }

    pub fn is_square(&self) -> bool {
        matches!(*self, Self::Matrix(rows, cols) if rows == cols)
    }
}

impl Display for Dims {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vector(n) => write!(f, "[{}]", n),
            Self::Matrix(rows, cols) => write!(f, "{}x{}", rows, cols),
        }
    }
}

/// Row and column sizes of a block matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSizes {
    pub row_sizes: Vec<usize>,
    pub col_sizes: Vec<usize>,
}

impl BlockSizes {
    pub fn total_rows(&self) -> usize {
        self.row_sizes.iter().sum()
    }

    pub fn total_cols(&self) -> usize {
        self.col_sizes.iter().sum()
    }

    pub fn row_offsets(&self) -> Vec<usize> {
        cumulative_offsets(&self.row_sizes)
    }

    pub fn col_offsets(&self) -> Vec<usize> {
        cumulative_offsets(&self.col_sizes)
    }
}

/// Returns `[0, s0, s0 + s1, ...]`, with one more entry than `sizes`.
pub fn cumulative_offsets(sizes: &[usize]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(sizes.len() + 1);
    offsets.push(0);
    let mut total = 0;
    for size in sizes {
        total += size;
        offsets.push(total);
    }
    offsets
}

pub fn value_dims<T: Real>(value: &Value<T>) -> Option<Dims> {
    match value {
        Value::Scalar(_) => None,
        Value::Matrix(a) => Some(Dims::Matrix(a.nrows(), a.ncols())),
        Value::Vector(v) => Some(Dims::Vector(v.len())),
    }
}

/// Computes the dimensions of an expression.
///
/// Returns `Ok(None)` for expressions that are scalar-valued.
pub fn get_dims<T: Real>(expr: &Expr<T>) -> Result<Option<Dims>, BlockError> {
    match expr {
        Expr::Scalar(_) => Ok(None),
        Expr::Matrix(a) => Ok(Some(Dims::Matrix(a.nrows(), a.ncols()))),
        Expr::Vector(v) => Ok(Some(Dims::Vector(v.len()))),
        Expr::Multiply(chain) => multiply_chain_dims(chain),
        Expr::Add(a, b) => sum_dims("add", get_dims(a)?, get_dims(b)?),
        Expr::Subtract(a, b) => sum_dims("subtract", get_dims(a)?, get_dims(b)?),
        Expr::Transpose(a) => transpose_dims(get_dims(a)?),
        Expr::Operator(op) => match op.matrix_representation() {
            Some(repr @ Value::Matrix(_)) => Ok(value_dims(&repr)),
            _ => Err(BlockError::unsupported(expr.kind_name())),
        },
        Expr::BlockMatrix(_) | Expr::BlockVector(_) => Err(BlockError::unsupported(expr.kind_name())),
    }
}

fn multiply_chain_dims<T: Real>(chain: &[Expr<T>]) -> Result<Option<Dims>, BlockError> {
    let (last, rest) = chain
        .split_last()
        .ok_or_else(|| BlockError::unsupported("empty multiply"))?;
    let mut dims = get_dims(last)?;
    for operand in rest.iter().rev() {
        dims = product_dims(get_dims(operand)?, dims)?;
    }
    Ok(dims)
}

/// Dimensions of the product `lhs * rhs`.
pub fn product_dims(lhs: Option<Dims>, rhs: Option<Dims>) -> Result<Option<Dims>, BlockError> {
    match (lhs, rhs) {
        (None, dims) | (dims, None) => Ok(dims),
        (Some(Dims::Matrix(m, k)), Some(Dims::Matrix(k2, n))) if k == k2 => Ok(Some(Dims::Matrix(m, n))),
        (Some(Dims::Matrix(m, k)), Some(Dims::Vector(n))) if k == n => Ok(Some(Dims::Vector(m))),
        (Some(lhs), Some(rhs)) => Err(BlockError::IncompatibleShapes {
            operation: "multiply",
            lhs,
            rhs,
        }),
    }
}

/// Dimensions of `lhs + rhs` or `lhs - rhs`.
pub fn sum_dims(operation: &'static str, lhs: Option<Dims>, rhs: Option<Dims>) -> Result<Option<Dims>, BlockError> {
    match (lhs, rhs) {
        (None, dims) | (dims, None) => Ok(dims),
        (Some(lhs), Some(rhs)) if lhs == rhs => Ok(Some(lhs)),
        (Some(lhs), Some(rhs)) => Err(BlockError::IncompatibleShapes { operation, lhs, rhs }),
    }
}

fn transpose_dims(dims: Option<Dims>) -> Result<Option<Dims>, BlockError> {
    match dims {
        None => Ok(None),
        Some(Dims::Matrix(rows, cols)) => Ok(Some(Dims::Matrix(cols, rows))),
        Some(Dims::Vector(_)) => Err(BlockError::unsupported("transpose of vector")),
    }
}

/// Determines the single size shared by all size-bearing blocks of a block row or column.
fn unique_size(
    axis: BlockAxis,
    index: usize,
    sizes: impl Iterator<Item = Option<usize>>,
) -> Result<usize, BlockError> {
    let sizes: Vec<usize> = sizes.flatten().collect::<BTreeSet<_>>().into_iter().collect();
    if let [size] = sizes[..] {
        Ok(size)
    } else {
        Err(BlockError::InconsistentBlockSizes { axis, index, sizes })
    }
}

/// Computes the row and column sizes of a block matrix.
///
/// Every block row (column) must contain at least one block with known dimensions, and all
/// such blocks must agree on the number of rows (columns). Scalar blocks do not constrain
/// the sizes.
pub fn bmat_sizes<T: Real>(bmat: &BlockMatrix<T>) -> Result<BlockSizes, BlockError> {
    let dims = bmat
        .blocks()
        .iter()
        .map(get_dims)
        .collect::<Result<Vec<_>, _>>()?;
    let ncols = bmat.num_block_cols();

    let row_sizes = (0..bmat.num_block_rows())
        .map(|i| {
            let row = &dims[i * ncols..(i + 1) * ncols];
            unique_size(BlockAxis::Row, i, row.iter().map(|d| d.map(|d| d.rows())))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let col_sizes = (0..ncols)
        .map(|j| {
            let col = dims.iter().skip(j).step_by(ncols);
            unique_size(BlockAxis::Column, j, col.map(|d| d.and_then(|d| d.cols())))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(BlockSizes { row_sizes, col_sizes })
}

/// Computes the lengths of the components of a block vector.
pub fn bvec_sizes<T: Real>(bvec: &BlockVector<T>) -> Result<Vec<usize>, BlockError> {
    bvec.iter()
        .enumerate()
        .map(|(i, block)| match get_dims(block)? {
            Some(Dims::Vector(n)) => Ok(n),
            Some(Dims::Matrix(..)) => Err(BlockError::unsupported(format!("matrix in block vector component {}", i))),
            None => Err(BlockError::InconsistentBlockSizes {
                axis: BlockAxis::Row,
                index: i,
                sizes: Vec::new(),
            }),
        })
        .collect()
}
