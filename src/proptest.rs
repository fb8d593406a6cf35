//! Strategies for property-based testing of block expressions.
use crate::expr::Expr;
use ::proptest::collection::vec;
use ::proptest::prelude::*;
use nalgebra_sparse::{CooMatrix, CsrMatrix};

/// Sparse matrices with the given shape and at most `max_nnz` (possibly duplicate) entries.
pub fn csr_matrix(nrows: usize, ncols: usize, max_nnz: usize) -> impl Strategy<Value = CsrMatrix<f64>> {
    // Keep values small and integral so that products and sums are exact in floating point
    let entries = if nrows == 0 || ncols == 0 {
        Just(Vec::new()).boxed()
    } else {
        vec((0..nrows, 0..ncols, -5..=5i32), 0..=max_nnz).boxed()
    };
    entries.prop_map(move |entries| {
        let mut coo = CooMatrix::new(nrows, ncols);
        for (i, j, v) in entries {
            coo.push(i, j, f64::from(v));
        }
        CsrMatrix::from(&coo)
    })
}

/// Matrix expressions with the given shape.
pub fn matrix_expr(nrows: usize, ncols: usize) -> impl Strategy<Value = Expr<f64>> {
    csr_matrix(nrows, ncols, nrows * ncols).prop_map(Expr::matrix)
}

/// Shapes `(m, k, n)` for chains of compatible products.
pub fn product_shapes() -> impl Strategy<Value = (usize, usize, usize)> {
    (1usize..6, 1usize..6, 1usize..6)
}

/// Pairs of matrices with compatible inner dimensions, `(m x k, k x n)`.
pub fn compatible_matrix_pair() -> impl Strategy<Value = (CsrMatrix<f64>, CsrMatrix<f64>)> {
    product_shapes().prop_flat_map(|(m, k, n)| (csr_matrix(m, k, m * k), csr_matrix(k, n, k * n)))
}

/// Triples of matrices `(A, B, C)` for which `A * B * C` is well-defined.
pub fn compatible_matrix_triple() -> impl Strategy<Value = (CsrMatrix<f64>, CsrMatrix<f64>, CsrMatrix<f64>)> {
    (product_shapes(), 1usize..6).prop_flat_map(|((m, k, l), n)| {
        (
            csr_matrix(m, k, m * k),
            csr_matrix(k, l, k * l),
            csr_matrix(l, n, l * n),
        )
    })
}

/// Square matrices of dimension `1..max_dim`.
pub fn square_matrix(max_dim: usize) -> impl Strategy<Value = CsrMatrix<f64>> {
    (1..max_dim).prop_flat_map(|n| csr_matrix(n, n, n * n))
}

/// Expressions over a fixed `n x n` matrix, exercising every kind of operation.
pub fn square_expr(n: usize, depth: u32) -> impl Strategy<Value = Expr<f64>> {
    let leaf = prop_oneof![
        3 => matrix_expr(n, n),
        1 => (-3..=3i32).prop_map(|s| Expr::Scalar(f64::from(s))),
    ];
    leaf.prop_recursive(depth, 16, 3, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a + b),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a - b),
            vec(inner.clone(), 2..=3).prop_map(Expr::multiply),
            inner.prop_map(Expr::transpose),
        ]
    })
}
