//! Collapsing of expressions into concrete values.
//!
//! Collapsing reduces an expression recursively: operands are collapsed first, after which
//! exactly one backend kernel is applied to the resulting concrete values. Input handles are
//! never mutated.
use crate::backend;
use crate::dims::{get_dims, value_dims};
use crate::error::BlockError;
use crate::expr::{Expr, Value};
use crate::Real;
use log::trace;
use nalgebra_sparse::CsrMatrix;
use std::sync::Arc;

/// Collapses an expression into a single scalar, matrix or vector.
///
/// The dimensions of the expression are checked in their entirety before any kernel is
/// invoked, so that shape errors are reported without performing any work.
pub fn collapse<T: Real>(expr: &Expr<T>) -> Result<Value<T>, BlockError> {
    get_dims(expr)?;
    collapse_checked(expr)
}

/// Collapses an expression whose dimensions have already been validated with [`get_dims`].
pub(crate) fn collapse_checked<T: Real>(expr: &Expr<T>) -> Result<Value<T>, BlockError> {
    match expr {
        Expr::Scalar(s) => Ok(Value::Scalar(*s)),
        Expr::Matrix(a) => Ok(Value::Matrix(Arc::clone(a))),
        Expr::Vector(v) => Ok(Value::Vector(Arc::clone(v))),
        Expr::Multiply(chain) => collapse_multiply(chain),
        Expr::Add(a, b) => collapse_sum(collapse_checked(a)?, T::one(), collapse_checked(b)?),
        Expr::Subtract(a, b) => collapse_sum(collapse_checked(a)?, -T::one(), collapse_checked(b)?),
        Expr::Transpose(a) => collapse_transpose(collapse_checked(a)?),
        Expr::Operator(op) => match op.matrix_representation() {
            Some(repr @ Value::Matrix(_)) => Ok(repr),
            _ => Err(BlockError::unsupported(expr.kind_name())),
        },
        Expr::BlockMatrix(_) | Expr::BlockVector(_) => Err(BlockError::unsupported(expr.kind_name())),
    }
}

fn collapse_transpose<T: Real>(a: Value<T>) -> Result<Value<T>, BlockError> {
    match a {
        Value::Scalar(s) => Ok(Value::Scalar(s)),
        Value::Matrix(a) => {
            trace!("transpose {}x{}", a.nrows(), a.ncols());
            Ok(Value::Matrix(Arc::new(backend::transpose(&a))))
        }
        Value::Vector(_) => Err(BlockError::unsupported("transpose of vector")),
    }
}

/// Collapses `a + alpha * b` with `alpha` either `1` or `-1`.
///
/// A scalar operand is interpreted as a scaled identity. A zero scalar is the additive
/// identity and is compatible with any operand.
fn collapse_sum<T: Real>(a: Value<T>, alpha: T, b: Value<T>) -> Result<Value<T>, BlockError> {
    let operation = if alpha == T::one() { "add" } else { "subtract" };
    match (a, b) {
        (Value::Scalar(a), Value::Scalar(b)) => Ok(Value::Scalar(a + alpha * b)),
        (Value::Matrix(a), Value::Matrix(b)) => {
            trace!("axpy {}x{} (alpha = {:?})", a.nrows(), a.ncols(), alpha);
            Ok(Value::Matrix(Arc::new(backend::axpy(&a, alpha, &b)?)))
        }
        (Value::Vector(a), Value::Vector(b)) => Ok(Value::Vector(Arc::new(backend::vector_axpy(&a, alpha, &b)?))),
        (a, Value::Scalar(s)) if s == T::zero() => Ok(a),
        (Value::Scalar(s), b) if s == T::zero() => {
            if alpha == T::one() {
                Ok(b)
            } else {
                collapse_pair(Value::Scalar(alpha), b)
            }
        }
        (Value::Matrix(a), Value::Scalar(s)) => {
            let id = promote_scalar(s, &a)?;
            Ok(Value::Matrix(Arc::new(backend::axpy(&a, alpha, &id)?)))
        }
        (Value::Scalar(s), Value::Matrix(b)) => {
            let id = promote_scalar(s, &b)?;
            Ok(Value::Matrix(Arc::new(backend::axpy(&id, alpha, &b)?)))
        }
        (a, b) => Err(incompatible(operation, &a, &b)),
    }
}

fn incompatible<T: Real>(operation: &'static str, a: &Value<T>, b: &Value<T>) -> BlockError {
    match (value_dims(a), value_dims(b)) {
        (Some(lhs), Some(rhs)) => BlockError::IncompatibleShapes { operation, lhs, rhs },
        _ => BlockError::unsupported(format!("{} of {} and {}", operation, a.kind_name(), b.kind_name())),
    }
}

/// Promotes a non-zero scalar to the scaled identity matching the shape of `like`.
fn promote_scalar<T: Real>(s: T, like: &CsrMatrix<T>) -> Result<CsrMatrix<T>, BlockError> {
    if like.nrows() != like.ncols() {
        return Err(BlockError::NonSquareIdentity {
            rows: like.nrows(),
            cols: like.ncols(),
        });
    }
    Ok(backend::scaled_identity(like.nrows(), s))
}

/// Collapses a multiplication chain.
///
/// The chain is folded from the right, i.e. `A * B * C` is collapsed as `A * (B * C)`.
fn collapse_multiply<T: Real>(chain: &[Expr<T>]) -> Result<Value<T>, BlockError> {
    match chain {
        [] => Err(BlockError::unsupported("empty multiply")),
        [single] => collapse_checked(single),
        [first, rest @ ..] => {
            let lhs = collapse_checked(first)?;
            let rhs = collapse_multiply(rest)?;
            collapse_pair(lhs, rhs)
        }
    }
}

/// Collapses the product of two concrete values.
fn collapse_pair<T: Real>(lhs: Value<T>, rhs: Value<T>) -> Result<Value<T>, BlockError> {
    match (lhs, rhs) {
        (Value::Scalar(a), Value::Scalar(b)) => Ok(Value::Scalar(a * b)),
        (Value::Matrix(a), Value::Matrix(b)) => {
            trace!("matmul {}x{} * {}x{}", a.nrows(), a.ncols(), b.nrows(), b.ncols());
            Ok(Value::Matrix(Arc::new(backend::matmul(&a, &b)?)))
        }
        (Value::Matrix(a), Value::Scalar(s)) | (Value::Scalar(s), Value::Matrix(a)) => {
            trace!("scale {}x{} by {:?}", a.nrows(), a.ncols(), s);
            Ok(Value::Matrix(Arc::new(backend::scale(&a, s))))
        }
        (Value::Vector(v), Value::Scalar(s)) | (Value::Scalar(s), Value::Vector(v)) => {
            Ok(Value::Vector(Arc::new(backend::vector_scale(&v, s))))
        }
        (Value::Matrix(a), Value::Vector(x)) => {
            trace!("matvec {}x{} * [{}]", a.nrows(), a.ncols(), x.len());
            Ok(Value::Vector(Arc::new(backend::matvec(&a, &x)?)))
        }
        (lhs @ Value::Vector(_), rhs) => Err(incompatible("multiply", &lhs, &rhs)),
    }
}
