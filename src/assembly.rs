//! Monolithic assembly of block grids.
//!
//! Before assembly, every block of a grid is collapsed and its scalar blocks are resolved
//! into explicit zero blocks or scaled identities (see [`resolve_blocks`]). The resolved grid
//! can then be assembled into a single CSR matrix in one of two ways:
//!
//! - [`assemble_csr`] converts each block to CSR and concatenates the blocks through a
//!   coordinate-format intermediate ([`csr_bmat`]).
//! - [`assemble_row_streamed`] walks the rows of all blocks in a block row in lock-step and
//!   inserts each assembled global row into a [`CsrRowBuilder`].
use crate::backend;
use crate::block::{BlockMatrix, BlockVector};
use crate::collapse::collapse_checked;
use crate::dims::{bmat_sizes, bvec_sizes, BlockSizes};
use crate::error::{BlockAxis, BlockError};
use crate::expr::{Expr, MatrixHandle, Value};
use crate::Real;
use itertools::izip;
use nalgebra::DVector;
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use std::borrow::Cow;

/// A block whose scalar form has been made explicit.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedBlock<T: Real> {
    Matrix(MatrixHandle<T>),
    /// An all-zero block.
    Zero,
    /// A square block equal to the scalar times the identity.
    ScaledIdentity(T),
}

impl<T: Real> ResolvedBlock<T> {
    /// Appends the entries of the given row of the block, with columns shifted by `col_offset`.
    fn push_row_entries(&self, local_row: usize, col_offset: usize, indices: &mut Vec<usize>, values: &mut Vec<T>) {
        match self {
            Self::Matrix(a) => {
                let row = a.row(local_row);
                indices.extend(row.col_indices().iter().map(|j| j + col_offset));
                values.extend_from_slice(row.values());
            }
            Self::Zero => {}
            Self::ScaledIdentity(s) => {
                indices.push(local_row + col_offset);
                values.push(*s);
            }
        }
    }

    /// The block in CSR form, or `None` for a zero block.
    fn to_csr(&self, n: usize) -> Option<Cow<'_, CsrMatrix<T>>> {
        match self {
            Self::Matrix(a) => Some(Cow::Borrowed(a.as_ref())),
            Self::Zero => None,
            Self::ScaledIdentity(s) => Some(Cow::Owned(backend::scaled_identity(n, *s))),
        }
    }
}

/// A block grid in which every block is a concrete matrix, a zero block or a scaled identity.
#[derive(Debug, Clone)]
pub struct ResolvedBlockMatrix<T: Real> {
    sizes: BlockSizes,
    blocks: Vec<ResolvedBlock<T>>,
}

impl<T: Real> ResolvedBlockMatrix<T> {
    pub fn sizes(&self) -> &BlockSizes {
        &self.sizes
    }

    pub fn num_block_rows(&self) -> usize {
        self.sizes.row_sizes.len()
    }

    pub fn num_block_cols(&self) -> usize {
        self.sizes.col_sizes.len()
    }

    pub fn get(&self, i: usize, j: usize) -> Option<&ResolvedBlock<T>> {
        if i < self.num_block_rows() && j < self.num_block_cols() {
            self.blocks.get(i * self.num_block_cols() + j)
        } else {
            None
        }
    }

    pub fn block_row(&self, i: usize) -> &[ResolvedBlock<T>] {
        let ncols = self.num_block_cols();
        &self.blocks[i * ncols..(i + 1) * ncols]
    }

    /// Converts the resolved grid back to a block matrix of concrete blocks.
    ///
    /// Zero blocks become the scalar zero and scaled identities are materialized as matrices.
    pub fn into_block_matrix(self) -> Result<BlockMatrix<T>, BlockError> {
        let ncols = self.num_block_cols();
        let nrows = self.num_block_rows();
        let row_sizes = self.sizes.row_sizes;
        let blocks = self
            .blocks
            .into_iter()
            .enumerate()
            .map(|(idx, block)| match block {
                ResolvedBlock::Matrix(a) => Expr::Matrix(a),
                ResolvedBlock::Zero => Expr::zero(),
                ResolvedBlock::ScaledIdentity(s) => Expr::matrix(backend::scaled_identity(row_sizes[idx / ncols], s)),
            })
            .collect();
        BlockMatrix::from_row_major_blocks(nrows, ncols, blocks)
    }
}

/// Collapses every block of the grid and resolves its scalar blocks.
///
/// A zero scalar becomes a zero block of the inferred shape. A non-zero scalar becomes a
/// scaled identity, which requires the inferred shape of the block to be square.
pub fn resolve_blocks<T: Real>(bmat: &BlockMatrix<T>) -> Result<ResolvedBlockMatrix<T>, BlockError> {
    let sizes = bmat_sizes(bmat)?;
    let blocks = bmat
        .iter()
        .map(|(i, j, block)| {
            let (rows, cols) = (sizes.row_sizes[i], sizes.col_sizes[j]);
            match collapse_checked(block)? {
                Value::Matrix(a) => Ok(ResolvedBlock::Matrix(a)),
                Value::Scalar(s) if s == T::zero() => Ok(ResolvedBlock::Zero),
                Value::Scalar(s) if rows == cols => Ok(ResolvedBlock::ScaledIdentity(s)),
                Value::Scalar(_) => Err(BlockError::NonSquareIdentity { rows, cols }),
                Value::Vector(_) => Err(BlockError::unsupported(format!(
                    "vector in block ({}, {}) of block matrix",
                    i, j
                ))),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ResolvedBlockMatrix { sizes, blocks })
}

/// Concatenates a row-major grid of CSR blocks into a single CSR matrix.
///
/// `None` denotes a zero block. Every present block must have the dimensions given by the
/// row and column sizes of its position in the grid.
pub fn csr_bmat<T: Real>(
    blocks: &[Option<&CsrMatrix<T>>],
    row_sizes: &[usize],
    col_sizes: &[usize],
) -> Result<CsrMatrix<T>, BlockError> {
    let (nr, nc) = (row_sizes.len(), col_sizes.len());
    if blocks.len() != nr * nc {
        return Err(BlockError::RaggedBlockGrid {
            row: 0,
            expected: nr * nc,
            actual: blocks.len(),
        });
    }

    let sizes = BlockSizes {
        row_sizes: row_sizes.to_vec(),
        col_sizes: col_sizes.to_vec(),
    };
    let row_offsets = sizes.row_offsets();
    let col_offsets = sizes.col_offsets();
    let nnz: usize = blocks.iter().flatten().map(|block| block.nnz()).sum();

    let mut rows = Vec::with_capacity(nnz);
    let mut cols = Vec::with_capacity(nnz);
    let mut values = Vec::with_capacity(nnz);
    for (idx, block) in blocks.iter().enumerate() {
        let (i, j) = (idx / nc, idx % nc);
        if let Some(block) = block {
            if block.nrows() != row_sizes[i] {
                return Err(BlockError::InconsistentBlockSizes {
                    axis: BlockAxis::Row,
                    index: i,
                    sizes: vec![row_sizes[i], block.nrows()],
                });
            }
            if block.ncols() != col_sizes[j] {
                return Err(BlockError::InconsistentBlockSizes {
                    axis: BlockAxis::Column,
                    index: j,
                    sizes: vec![col_sizes[j], block.ncols()],
                });
            }
            for (r, c, v) in block.triplet_iter() {
                rows.push(r + row_offsets[i]);
                cols.push(c + col_offsets[j]);
                values.push(*v);
            }
        }
    }

    let coo = CooMatrix::try_from_triplets(sizes.total_rows(), sizes.total_cols(), rows, cols, values)
        .map_err(|err| BlockError::backend(err.to_string()))?;
    Ok(CsrMatrix::from(&coo))
}

/// Assembles a resolved grid by concatenating the CSR representations of its blocks.
pub fn assemble_csr<T: Real>(resolved: &ResolvedBlockMatrix<T>) -> Result<CsrMatrix<T>, BlockError> {
    let ncols = resolved.num_block_cols();
    let row_sizes = &resolved.sizes.row_sizes;
    let csr_blocks: Vec<_> = resolved
        .blocks
        .iter()
        .enumerate()
        .map(|(idx, block)| block.to_csr(row_sizes[idx / ncols]))
        .collect();
    let block_refs: Vec<_> = csr_blocks.iter().map(|block| block.as_deref()).collect();
    csr_bmat(&block_refs, row_sizes, &resolved.sizes.col_sizes)
}

/// Assembles a resolved grid row by row.
///
/// For each global row, the corresponding rows of all blocks in the block row are visited in
/// lock-step and their entries are concatenated with the column offsets of their blocks.
/// All blocks are assumed to share the same local row ordering.
pub fn assemble_row_streamed<T: Real>(resolved: &ResolvedBlockMatrix<T>) -> Result<CsrMatrix<T>, BlockError> {
    let sizes = &resolved.sizes;
    let col_offsets = sizes.col_offsets();
    let mut builder = CsrRowBuilder::new(sizes.total_rows(), sizes.total_cols());

    let mut indices = Vec::new();
    let mut values = Vec::new();
    let mut global_row = 0;
    for (i, &row_size) in sizes.row_sizes.iter().enumerate() {
        let block_row = resolved.block_row(i);
        for local_row in 0..row_size {
            indices.clear();
            values.clear();
            for (block, &col_offset) in izip!(block_row, &col_offsets) {
                block.push_row_entries(local_row, col_offset, &mut indices, &mut values);
            }
            builder.insert_row(global_row, &indices, &values)?;
            global_row += 1;
        }
    }

    builder.build()
}

/// Incremental construction of a CSR matrix, one row at a time.
///
/// Rows must be inserted in ascending order. Rows that are skipped are empty.
#[derive(Debug, Clone)]
pub struct CsrRowBuilder<T> {
    nrows: usize,
    ncols: usize,
    row_offsets: Vec<usize>,
    col_indices: Vec<usize>,
    values: Vec<T>,
}

impl<T: Real> CsrRowBuilder<T> {
    pub fn new(nrows: usize, ncols: usize) -> Self {
        Self {
            nrows,
            ncols,
            row_offsets: vec![0],
            col_indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// The index of the next row that may be inserted.
    pub fn next_row(&self) -> usize {
        self.row_offsets.len() - 1
    }

    fn close_rows_until(&mut self, row: usize) {
        while self.next_row() < row {
            self.row_offsets.push(self.col_indices.len());
        }
    }

    /// Inserts the entries of a row. Column indices must be sorted and unique.
    pub fn insert_row(&mut self, row: usize, indices: &[usize], values: &[T]) -> Result<(), BlockError> {
        if row >= self.nrows {
            return Err(BlockError::IndexOutOfBounds {
                index: row,
                len: self.nrows,
            });
        }
        if row < self.next_row() {
            return Err(BlockError::backend(format!(
                "row {} inserted after row {}",
                row,
                self.next_row() - 1
            )));
        }
        if indices.len() != values.len() {
            return Err(BlockError::backend(format!(
                "row {} has {} column indices but {} values",
                row,
                indices.len(),
                values.len()
            )));
        }

        self.close_rows_until(row);
        self.col_indices.extend_from_slice(indices);
        self.values.extend_from_slice(values);
        self.row_offsets.push(self.col_indices.len());
        Ok(())
    }

    /// Finishes construction, validating the assembled compressed-row data.
    pub fn build(mut self) -> Result<CsrMatrix<T>, BlockError> {
        self.close_rows_until(self.nrows);
        backend::from_csr_data(self.nrows, self.ncols, self.row_offsets, self.col_indices, self.values)
    }
}

/// Concatenates the components of a block vector into a single vector.
pub fn block_vector_to_flat<T: Real>(bvec: &BlockVector<T>) -> Result<DVector<T>, BlockError> {
    let sizes = bvec_sizes(bvec)?;
    let mut flat = DVector::zeros(sizes.iter().sum());
    let mut offset = 0;
    for (block, n) in izip!(bvec.iter(), sizes) {
        match collapse_checked(block)? {
            Value::Vector(v) => flat.rows_mut(offset, n).copy_from(&*v),
            other => return Err(BlockError::unsupported(format!("{} in block vector", other.kind_name()))),
        }
        offset += n;
    }
    Ok(flat)
}
