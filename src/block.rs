//! Grids of blocks.
use crate::error::BlockError;
use crate::expr::Expr;
use crate::Real;

/// A two-dimensional grid of blocks, stored in row-major order.
#[derive(Debug, Clone)]
pub struct BlockMatrix<T: Real> {
    num_block_rows: usize,
    num_block_cols: usize,
    blocks: Vec<Expr<T>>,
}

impl<T: Real> BlockMatrix<T> {
    /// Constructs a block matrix from its block rows.
    ///
    /// Returns an error if the rows do not all have the same number of blocks.
    pub fn from_rows<R>(rows: impl IntoIterator<Item = R>) -> Result<Self, BlockError>
    where
        R: IntoIterator,
        R::Item: Into<Expr<T>>,
    {
        let mut blocks = Vec::new();
        let mut num_block_rows = 0;
        let mut num_block_cols = None;
        for (i, row) in rows.into_iter().enumerate() {
            let row_begin = blocks.len();
            blocks.extend(row.into_iter().map(Into::into));
            let row_len = blocks.len() - row_begin;
            match num_block_cols {
                None => num_block_cols = Some(row_len),
                Some(expected) if expected != row_len => {
                    return Err(BlockError::RaggedBlockGrid {
                        row: i,
                        expected,
                        actual: row_len,
                    });
                }
                Some(_) => {}
            }
            num_block_rows += 1;
        }

        Ok(Self {
            num_block_rows,
            num_block_cols: num_block_cols.unwrap_or(0),
            blocks,
        })
    }

    /// Constructs a block matrix from row-major blocks.
    ///
    /// Returns an error if the number of blocks is not `num_block_rows * num_block_cols`.
    pub fn from_row_major_blocks(
        num_block_rows: usize,
        num_block_cols: usize,
        blocks: Vec<Expr<T>>,
    ) -> Result<Self, BlockError> {
        let expected = num_block_rows * num_block_cols;
        if blocks.len() != expected {
            return Err(BlockError::RaggedBlockGrid {
                row: blocks.len().checked_div(num_block_cols).unwrap_or(0),
                expected,
                actual: blocks.len(),
            });
        }
        Ok(Self {
            num_block_rows,
            num_block_cols,
            blocks,
        })
    }

    pub fn num_block_rows(&self) -> usize {
        self.num_block_rows
    }

    pub fn num_block_cols(&self) -> usize {
        self.num_block_cols
    }

    pub fn get(&self, i: usize, j: usize) -> Option<&Expr<T>> {
        if i < self.num_block_rows && j < self.num_block_cols {
            self.blocks.get(i * self.num_block_cols + j)
        } else {
            None
        }
    }

    pub fn block_row(&self, i: usize) -> &[Expr<T>] {
        let begin = i * self.num_block_cols;
        &self.blocks[begin..begin + self.num_block_cols]
    }

    pub fn block_rows<'a>(&'a self) -> impl 'a + Iterator<Item = &'a [Expr<T>]> {
        (0..self.num_block_rows).map(move |i| self.block_row(i))
    }

    pub fn block_col<'a>(&'a self, j: usize) -> impl 'a + Iterator<Item = &'a Expr<T>> {
        self.blocks.iter().skip(j).step_by(self.num_block_cols.max(1))
    }

    /// Iterates over `(i, j, block)` in row-major order.
    pub fn iter<'a>(&'a self) -> impl 'a + Iterator<Item = (usize, usize, &'a Expr<T>)> {
        let ncols = self.num_block_cols;
        self.blocks
            .iter()
            .enumerate()
            .map(move |(idx, block)| (idx / ncols, idx % ncols, block))
    }

    pub fn blocks(&self) -> &[Expr<T>] {
        &self.blocks
    }

    pub fn into_blocks(self) -> Vec<Expr<T>> {
        self.blocks
    }
}

/// A sequence of blocks representing a vector.
#[derive(Debug, Clone)]
pub struct BlockVector<T: Real> {
    blocks: Vec<Expr<T>>,
}

impl<T: Real> BlockVector<T> {
    pub fn new<B: Into<Expr<T>>>(blocks: impl IntoIterator<Item = B>) -> Self {
        Self {
            blocks: blocks.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&Expr<T>> {
        self.blocks.get(i)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Expr<T>> {
        self.blocks.iter()
    }

    pub fn blocks(&self) -> &[Expr<T>] {
        &self.blocks
    }
}
