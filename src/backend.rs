//! Numerical kernels used by the collapser and the assemblers.
//!
//! All kernels leave their inputs untouched and return freshly allocated results.
use crate::dims::Dims;
use crate::error::BlockError;
use crate::Real;
use nalgebra::DVector;
use nalgebra_sparse::ops::serial::{spadd_csr_prealloc, spadd_pattern};
use nalgebra_sparse::ops::Op;
use nalgebra_sparse::{CsrMatrix, SparseFormatError};

fn matrix_dims<T>(a: &CsrMatrix<T>) -> Dims {
    Dims::Matrix(a.nrows(), a.ncols())
}

fn format_error(err: SparseFormatError) -> BlockError {
    // SparseFormatError wraps a non-Send source, so we only keep its message
    BlockError::backend(err.to_string())
}

pub fn transpose<T: Real>(a: &CsrMatrix<T>) -> CsrMatrix<T> {
    a.transpose()
}

/// Computes `C = A + alpha * B` into a newly allocated matrix.
pub fn axpy<T: Real>(a: &CsrMatrix<T>, alpha: T, b: &CsrMatrix<T>) -> Result<CsrMatrix<T>, BlockError> {
    if a.nrows() != b.nrows() || a.ncols() != b.ncols() {
        return Err(BlockError::IncompatibleShapes {
            operation: "add",
            lhs: matrix_dims(a),
            rhs: matrix_dims(b),
        });
    }

    let pattern = spadd_pattern(a.pattern(), b.pattern());
    let nnz = pattern.nnz();
    let mut c = CsrMatrix::try_from_pattern_and_values(pattern, vec![T::zero(); nnz]).map_err(format_error)?;
    spadd_csr_prealloc(T::zero(), &mut c, T::one(), Op::NoOp(a)).map_err(BlockError::backend)?;
    spadd_csr_prealloc(T::one(), &mut c, alpha, Op::NoOp(b)).map_err(BlockError::backend)?;
    Ok(c)
}

/// Computes the sparse product `A * B`.
pub fn matmul<T: Real>(a: &CsrMatrix<T>, b: &CsrMatrix<T>) -> Result<CsrMatrix<T>, BlockError> {
    if a.ncols() != b.nrows() {
        return Err(BlockError::IncompatibleShapes {
            operation: "multiply",
            lhs: matrix_dims(a),
            rhs: matrix_dims(b),
        });
    }
    Ok(a * b)
}

/// Computes `y = A x`.
pub fn matvec<T: Real>(a: &CsrMatrix<T>, x: &DVector<T>) -> Result<DVector<T>, BlockError> {
    if a.ncols() != x.len() {
        return Err(BlockError::IncompatibleShapes {
            operation: "multiply",
            lhs: matrix_dims(a),
            rhs: Dims::Vector(x.len()),
        });
    }

    let mut y = DVector::zeros(a.nrows());
    for (y_i, row) in y.iter_mut().zip(a.row_iter()) {
        *y_i = row
            .col_indices()
            .iter()
            .zip(row.values())
            .fold(T::zero(), |acc, (&j, &a_ij)| acc + a_ij * x[j]);
    }
    Ok(y)
}

/// Returns a copy of `A` scaled by `s`.
pub fn scale<T: Real>(a: &CsrMatrix<T>, s: T) -> CsrMatrix<T> {
    let mut c = a.clone();
    for v in c.values_mut() {
        *v *= s;
    }
    c
}

/// Returns the `n x n` matrix `s * I`.
pub fn scaled_identity<T: Real>(n: usize, s: T) -> CsrMatrix<T> {
    let mut id = CsrMatrix::identity(n);
    for v in id.values_mut() {
        *v = s;
    }
    id
}

/// Computes `z = x + alpha * y` into a newly allocated vector.
pub fn vector_axpy<T: Real>(x: &DVector<T>, alpha: T, y: &DVector<T>) -> Result<DVector<T>, BlockError> {
    if x.len() != y.len() {
        return Err(BlockError::IncompatibleShapes {
            operation: "add",
            lhs: Dims::Vector(x.len()),
            rhs: Dims::Vector(y.len()),
        });
    }
    let mut z = x.clone();
    z.axpy(alpha, y, T::one());
    Ok(z)
}

pub fn vector_scale<T: Real>(x: &DVector<T>, s: T) -> DVector<T> {
    let mut z = x.clone();
    z *= s;
    z
}

/// Constructs a matrix from compressed-row arrays, validating their structure.
pub fn from_csr_data<T: Real>(
    nrows: usize,
    ncols: usize,
    row_offsets: Vec<usize>,
    col_indices: Vec<usize>,
    values: Vec<T>,
) -> Result<CsrMatrix<T>, BlockError> {
    CsrMatrix::try_from_csr_data(nrows, ncols, row_offsets, col_indices, values).map_err(format_error)
}
