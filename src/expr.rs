//! Symbolic expressions over sparse matrices, vectors and scalars.
use crate::block::{BlockMatrix, BlockVector};
use crate::Real;
use nalgebra::DVector;
use nalgebra_sparse::CsrMatrix;
use std::fmt::Debug;
use std::ops::{Add, Mul, Neg, Sub};
use std::sync::Arc;

/// A shared handle to a sparse matrix.
///
/// Handles are never mutated by this crate: every kernel produces a new matrix.
pub type MatrixHandle<T> = Arc<CsrMatrix<T>>;

/// A shared handle to a dense vector.
pub type VectorHandle<T> = Arc<DVector<T>>;

/// A concrete value, the result of collapsing an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<T: Real> {
    Scalar(T),
    Matrix(MatrixHandle<T>),
    Vector(VectorHandle<T>),
}

impl<T: Real> Value<T> {
    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::Scalar(_))
    }

    pub fn is_matrix(&self) -> bool {
        matches!(self, Self::Matrix(_))
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, Self::Vector(_))
    }

    pub fn as_scalar(&self) -> Option<T> {
        match self {
            Self::Scalar(s) => Some(*s),
            _ => None,
        }
    }

    pub fn as_matrix(&self) -> Option<&MatrixHandle<T>> {
        match self {
            Self::Matrix(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<&VectorHandle<T>> {
        match self {
            Self::Vector(v) => Some(v),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "scalar",
            Self::Matrix(_) => "matrix",
            Self::Vector(_) => "vector",
        }
    }
}

impl<T: Real> From<Value<T>> for Expr<T> {
    fn from(value: Value<T>) -> Self {
        match value {
            Value::Scalar(s) => Expr::Scalar(s),
            Value::Matrix(a) => Expr::Matrix(a),
            Value::Vector(v) => Expr::Vector(v),
        }
    }
}

/// An operator that is not itself a matrix, but may know its matrix representation.
///
/// Operators without a matrix representation cannot be collapsed.
pub trait LinearOperator<T: Real>: Debug + Send + Sync {
    /// A name used to identify the operator in diagnostics.
    fn name(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }

    fn matrix_representation(&self) -> Option<Value<T>>;
}

/// A pending linear algebra operation.
#[derive(Debug, Clone)]
pub enum Expr<T: Real> {
    Scalar(T),
    Matrix(MatrixHandle<T>),
    Vector(VectorHandle<T>),
    /// The product of a chain of operands, `chain[0] * chain[1] * ...`.
    Multiply(Vec<Expr<T>>),
    Add(Box<Expr<T>>, Box<Expr<T>>),
    Subtract(Box<Expr<T>>, Box<Expr<T>>),
    Transpose(Box<Expr<T>>),
    Operator(Arc<dyn LinearOperator<T>>),
    BlockMatrix(BlockMatrix<T>),
    BlockVector(BlockVector<T>),
}

impl<T: Real> Expr<T> {
    pub fn matrix(matrix: CsrMatrix<T>) -> Self {
        Self::Matrix(Arc::new(matrix))
    }

    pub fn vector(vector: DVector<T>) -> Self {
        Self::Vector(Arc::new(vector))
    }

    pub fn operator(operator: impl LinearOperator<T> + 'static) -> Self {
        Self::Operator(Arc::new(operator))
    }

    pub fn zero() -> Self {
        Self::Scalar(T::zero())
    }

    /// Constructs a product of the given chain of operands.
    pub fn multiply(chain: impl IntoIterator<Item = Expr<T>>) -> Self {
        Self::Multiply(chain.into_iter().collect())
    }

    pub fn transpose(self) -> Self {
        Self::Transpose(Box::new(self))
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::Scalar(_))
    }

    pub fn is_matrix(&self) -> bool {
        matches!(self, Self::Matrix(_))
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, Self::Vector(_))
    }

    pub fn is_block(&self) -> bool {
        matches!(self, Self::BlockMatrix(_) | Self::BlockVector(_))
    }

    /// Returns the concrete value if the expression is already a scalar, matrix or vector.
    pub fn as_value(&self) -> Option<Value<T>> {
        match self {
            Self::Scalar(s) => Some(Value::Scalar(*s)),
            Self::Matrix(a) => Some(Value::Matrix(Arc::clone(a))),
            Self::Vector(v) => Some(Value::Vector(Arc::clone(v))),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> String {
        match self {
            Self::Scalar(_) => "scalar".to_string(),
            Self::Matrix(_) => "matrix".to_string(),
            Self::Vector(_) => "vector".to_string(),
            Self::Multiply(_) => "multiply".to_string(),
            Self::Add(_, _) => "add".to_string(),
            Self::Subtract(_, _) => "subtract".to_string(),
            Self::Transpose(_) => "transpose".to_string(),
            Self::Operator(op) => format!("operator {}", op.name()),
            Self::BlockMatrix(_) => "block matrix".to_string(),
            Self::BlockVector(_) => "block vector".to_string(),
        }
    }
}

impl<T: Real> From<CsrMatrix<T>> for Expr<T> {
    fn from(matrix: CsrMatrix<T>) -> Self {
        Self::matrix(matrix)
    }
}

impl<T: Real> From<MatrixHandle<T>> for Expr<T> {
    fn from(matrix: MatrixHandle<T>) -> Self {
        Self::Matrix(matrix)
    }
}

impl<T: Real> From<DVector<T>> for Expr<T> {
    fn from(vector: DVector<T>) -> Self {
        Self::vector(vector)
    }
}

impl<T: Real> From<VectorHandle<T>> for Expr<T> {
    fn from(vector: VectorHandle<T>) -> Self {
        Self::Vector(vector)
    }
}

impl<T: Real> From<BlockMatrix<T>> for Expr<T> {
    fn from(blocks: BlockMatrix<T>) -> Self {
        Self::BlockMatrix(blocks)
    }
}

impl<T: Real> From<BlockVector<T>> for Expr<T> {
    fn from(blocks: BlockVector<T>) -> Self {
        Self::BlockVector(blocks)
    }
}

impl<T: Real> Mul for Expr<T> {
    type Output = Self;

    /// Multiplying onto an existing product extends its chain instead of nesting it.
    fn mul(self, rhs: Self) -> Self {
        match self {
            Self::Multiply(mut chain) => {
                chain.push(rhs);
                Self::Multiply(chain)
            }
            lhs => Self::Multiply(vec![lhs, rhs]),
        }
    }
}

impl<T: Real> Add for Expr<T> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::Add(Box::new(self), Box::new(rhs))
    }
}

impl<T: Real> Sub for Expr<T> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::Subtract(Box::new(self), Box::new(rhs))
    }
}

impl<T: Real> Neg for Expr<T> {
    type Output = Self;

    fn neg(self) -> Self {
        Self::Multiply(vec![Self::Scalar(-T::one()), self])
    }
}

macro_rules! impl_scalar_mul {
    ($($scalar:ty),*) => {
        $(
            impl Mul<Expr<$scalar>> for $scalar {
                type Output = Expr<$scalar>;

                fn mul(self, rhs: Expr<$scalar>) -> Expr<$scalar> {
                    Expr::Scalar(self) * rhs
                }
            }
        )*
    };
}

impl_scalar_mul!(f32, f64);
