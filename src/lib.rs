//! Collapsing of block-structured sparse linear algebra expressions.
//!
//! Expressions are built from sparse matrices, dense vectors and scalars combined with
//! products, sums, differences and transposes, possibly arranged in a two-dimensional grid
//! of blocks. The routines in this crate infer the dimensions of such expressions without
//! evaluating them ([`dims`]), collapse them into a single concrete value ([`collapse`]) and
//! assemble a grid of concrete blocks into one monolithic CSR matrix ([`assembly`]).
//!
//! The numerical backend is `nalgebra-sparse`: matrices are shared [`CsrMatrix`] handles and
//! vectors are shared [`DVector`] handles.
//!
//! [`CsrMatrix`]: nalgebra_sparse::CsrMatrix
//! [`DVector`]: nalgebra::DVector
use nalgebra::RealField;

pub mod assembly;
pub mod backend;
pub mod block;
pub mod collapse;
pub mod convert;
pub mod dims;
pub mod error;
pub mod expr;
pub mod function;
pub mod operators;

#[cfg(feature = "proptest")]
pub mod proptest;

pub extern crate nalgebra;
pub extern crate nalgebra_sparse;

pub use block::{BlockMatrix, BlockVector};
pub use collapse::collapse;
pub use convert::{convert, AssemblyStrategy, Converted};
pub use dims::{bmat_sizes, bvec_sizes, get_dims, BlockSizes, Dims};
pub use error::BlockError;
pub use expr::{Expr, LinearOperator, MatrixHandle, Value, VectorHandle};

/// Real scalar types supported by the collapsing and assembly routines.
///
/// Used as a trait alias for the traits needed by the generic routines in this crate.
pub trait Real: RealField + Copy {}

impl<T: RealField + Copy> Real for T {}
