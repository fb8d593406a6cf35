//! Operators that are not stored as matrices, but know their matrix representation.
use crate::backend;
use crate::error::BlockError;
use crate::expr::{LinearOperator, MatrixHandle, Value};
use crate::Real;
use std::sync::Arc;

/// The inverse of the row-sum lumped diagonal of a matrix.
///
/// Given a matrix $A$, this is the diagonal matrix $D^{-1}$ with $D_{ii} = \sum_j A_{ij}$.
/// This is commonly used as a cheap approximation of the inverse of a mass matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct LumpedInverseDiagonal<T: Real> {
    diagonal: MatrixHandle<T>,
}

impl<T: Real> LumpedInverseDiagonal<T> {
    /// Returns an error if any row of the matrix sums to zero.
    pub fn from_matrix(matrix: &nalgebra_sparse::CsrMatrix<T>) -> Result<Self, BlockError> {
        let mut diagonal = backend::scaled_identity(matrix.nrows(), T::one());
        for (i, (row, d)) in matrix.row_iter().zip(diagonal.values_mut()).enumerate() {
            let row_sum = row.values().iter().fold(T::zero(), |acc, &v| acc + v);
            if row_sum == T::zero() {
                return Err(BlockError::unsupported(format!(
                    "lumped inverse of matrix with zero row sum in row {}",
                    i
                )));
            }
            *d = T::one() / row_sum;
        }
        Ok(Self {
            diagonal: Arc::new(diagonal),
        })
    }

    pub fn diagonal(&self) -> &MatrixHandle<T> {
        &self.diagonal
    }
}

impl<T: Real> LinearOperator<T> for LumpedInverseDiagonal<T> {
    fn name(&self) -> String {
        "LumpedInverseDiagonal".to_string()
    }

    fn matrix_representation(&self) -> Option<Value<T>> {
        Some(Value::Matrix(Arc::clone(&self.diagonal)))
    }
}
