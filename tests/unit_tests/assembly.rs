use crate::csr;
use fenris_block::assembly::{
    assemble_csr, assemble_row_streamed, block_vector_to_flat, csr_bmat, resolve_blocks, CsrRowBuilder, ResolvedBlock,
};
use fenris_block::{BlockError, BlockMatrix, BlockVector, Expr, LinearOperator, Value};
use matrixcompare::assert_matrix_eq;
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::CsrMatrix;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use util::{dense, dense_bmat};

#[test]
fn csr_bmat_concatenates_blocks() {
    let a = csr(2, 2, &[1.0, 2.0, 0.0, 3.0]);
    let b = csr(2, 1, &[4.0, 0.0]);
    let c = csr(1, 2, &[0.0, 5.0]);

    let blocks = [Some(&a), Some(&b), Some(&c), None];
    let result = csr_bmat(&blocks, &[2, 1], &[2, 1]).unwrap();

    #[rustfmt::skip]
    let expected = DMatrix::from_row_slice(3, 3, &[
        1.0, 2.0, 4.0,
        0.0, 3.0, 0.0,
        0.0, 5.0, 0.0,
    ]);
    assert_matrix_eq!(dense(&result), expected, comp = abs, tol = 1e-14);
    assert_eq!(result.nnz(), 5);
}

#[test]
fn csr_bmat_rejects_mismatched_blocks() {
    let a = csr(2, 2, &[1.0, 2.0, 0.0, 3.0]);
    let blocks = [Some(&a), None];
    assert!(matches!(
        csr_bmat(&blocks, &[3], &[2, 1]),
        Err(BlockError::InconsistentBlockSizes { index: 0, .. })
    ));
    assert!(matches!(
        csr_bmat(&blocks, &[2], &[2]),
        Err(BlockError::RaggedBlockGrid { .. })
    ));
}

#[test]
fn row_builder_assembles_rows_in_order() {
    let mut builder = CsrRowBuilder::new(4, 3);
    builder.insert_row(0, &[0, 2], &[1.0, 2.0]).unwrap();
    // Row 1 is skipped and left empty
    builder.insert_row(2, &[1], &[3.0]).unwrap();
    assert_eq!(builder.next_row(), 3);
    let matrix = builder.build().unwrap();

    #[rustfmt::skip]
    let expected = DMatrix::from_row_slice(4, 3, &[
        1.0, 0.0, 2.0,
        0.0, 0.0, 0.0,
        0.0, 3.0, 0.0,
        0.0, 0.0, 0.0,
    ]);
    assert_matrix_eq!(dense(&matrix), expected, comp = abs, tol = 1e-14);
    assert_eq!(matrix.row_offsets(), &[0, 2, 2, 3, 3]);
}

#[test]
fn row_builder_rejects_invalid_rows() {
    let mut builder = CsrRowBuilder::<f64>::new(2, 2);
    builder.insert_row(1, &[0], &[1.0]).unwrap();
    assert!(builder.insert_row(0, &[0], &[1.0]).is_err());
    assert!(matches!(
        builder.insert_row(2, &[0], &[1.0]),
        Err(BlockError::IndexOutOfBounds { index: 2, len: 2 })
    ));

    let mut builder = CsrRowBuilder::<f64>::new(2, 2);
    assert!(builder.insert_row(0, &[0, 1], &[1.0]).is_err());

    // Unsorted column indices are caught when building
    let mut builder = CsrRowBuilder::<f64>::new(1, 2);
    builder.insert_row(0, &[1, 0], &[1.0, 2.0]).unwrap();
    assert!(matches!(builder.build(), Err(BlockError::Backend(_))));
}

#[test]
fn resolve_blocks_makes_scalars_explicit() {
    let b = csr(2, 3, &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
    let bmat = BlockMatrix::<f64>::from_rows(vec![
        vec![Expr::zero(), Expr::matrix(b.clone())],
        vec![Expr::matrix(b).transpose(), Expr::Scalar(2.0) * Expr::Scalar(1.5)],
    ])
    .unwrap();

    let resolved = resolve_blocks(&bmat).unwrap();
    assert_eq!(resolved.num_block_rows(), 2);
    assert_eq!(resolved.num_block_cols(), 2);
    assert_eq!(resolved.sizes().row_sizes, vec![2, 3]);
    assert_eq!(resolved.sizes().col_sizes, vec![2, 3]);
    assert_eq!(resolved.get(0, 0), Some(&ResolvedBlock::Zero));
    assert!(matches!(resolved.get(0, 1), Some(ResolvedBlock::Matrix(_))));
    assert!(matches!(resolved.get(1, 0), Some(ResolvedBlock::Matrix(_))));
    assert_eq!(resolved.get(1, 1), Some(&ResolvedBlock::ScaledIdentity(3.0)));
    assert!(resolved.get(2, 0).is_none());
    assert_eq!(resolved.block_row(1).len(), 2);

    let blocks = resolved.into_block_matrix().unwrap();
    assert!(blocks.get(0, 0).unwrap().is_scalar());
    let identity = blocks.get(1, 1).unwrap().as_value().unwrap();
    assert_matrix_eq!(
        dense(identity.as_matrix().unwrap()),
        3.0 * DMatrix::<f64>::identity(3, 3),
        comp = abs,
        tol = 1e-14
    );
}

#[test]
fn resolve_blocks_rejects_non_square_scalar_blocks() {
    let a = csr(2, 2, &[1.0, 2.0, 0.0, 3.0]);
    let d = csr(3, 3, &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
    let bmat = BlockMatrix::<f64>::from_rows(vec![
        vec![Expr::matrix(a), Expr::Scalar(1.0)],
        vec![Expr::zero(), Expr::matrix(d)],
    ])
    .unwrap();
    assert!(matches!(
        resolve_blocks(&bmat),
        Err(BlockError::NonSquareIdentity { rows: 2, cols: 3 })
    ));
}

#[test]
fn resolve_blocks_rejects_vector_blocks() {
    let bmat = BlockMatrix::<f64>::from_rows(vec![vec![
        Expr::matrix(csr(2, 2, &[1.0, 0.0, 0.0, 1.0])) * Expr::vector(DVector::zeros(2)),
    ]])
    .unwrap();
    assert!(resolve_blocks(&bmat).is_err());
}

#[test]
fn both_assembly_paths_agree_with_dense_concatenation() {
    let a = csr(2, 2, &[1.0, 2.0, 0.0, 3.0]);
    let b = csr(2, 3, &[1.0, 0.0, -2.0, 0.0, 1.0, 0.0]);
    let c = csr(3, 2, &[0.0, 1.0, 4.0, 0.0, 0.0, -1.0]);
    let bmat = BlockMatrix::<f64>::from_rows(vec![
        vec![Expr::matrix(a.clone()), Expr::matrix(b.clone())],
        vec![Expr::matrix(c.clone()), Expr::Scalar(-1.0)],
    ])
    .unwrap();

    let expected = dense_bmat(&[
        vec![dense(&a), dense(&b)],
        vec![dense(&c), -DMatrix::identity(3, 3)],
    ]);

    let resolved = resolve_blocks(&bmat).unwrap();
    let via_csr = assemble_csr(&resolved).unwrap();
    let via_rows = assemble_row_streamed(&resolved).unwrap();
    assert_matrix_eq!(dense(&via_csr), expected, comp = abs, tol = 1e-14);
    assert_matrix_eq!(dense(&via_rows), expected, comp = abs, tol = 1e-14);
    assert_eq!(via_csr.pattern(), via_rows.pattern());
}

#[test]
fn assembly_of_all_zero_block_row() {
    let a = csr(2, 2, &[1.0, 2.0, 0.0, 3.0]);
    let b = csr(1, 2, &[0.0, 0.0]);
    let bmat = BlockMatrix::<f64>::from_rows(vec![vec![Expr::matrix(a.clone())], vec![Expr::matrix(b)]]).unwrap();

    let resolved = resolve_blocks(&bmat).unwrap();
    let expected = dense_bmat(&[vec![dense(&a)], vec![DMatrix::zeros(1, 2)]]);
    for matrix in [assemble_csr(&resolved).unwrap(), assemble_row_streamed(&resolved).unwrap()] {
        assert_eq!(matrix.nrows(), 3);
        assert_matrix_eq!(dense(&matrix), expected, comp = abs, tol = 1e-14);
    }
}

#[test]
fn block_vector_to_flat_concatenates_components() {
    let a = csr(2, 2, &[1.0, 2.0, 0.0, 3.0]);
    let bvec = BlockVector::<f64>::new(vec![
        Expr::vector(DVector::from_vec(vec![1.0, 2.0, 3.0])),
        Expr::matrix(a) * Expr::vector(DVector::from_vec(vec![1.0, 1.0])),
    ]);
    let flat = block_vector_to_flat(&bvec).unwrap();
    assert_eq!(flat, DVector::from_vec(vec![1.0, 2.0, 3.0, 3.0, 3.0]));

    let empty = block_vector_to_flat(&BlockVector::<f64>::new(Vec::<Expr<f64>>::new())).unwrap();
    assert!(empty.is_empty());
}

/// An operator which counts how often its matrix representation is requested.
#[derive(Debug)]
struct CountingOperator {
    matrix: Arc<CsrMatrix<f64>>,
    requests: Arc<AtomicUsize>,
}

impl LinearOperator<f64> for CountingOperator {
    fn matrix_representation(&self) -> Option<Value<f64>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Some(Value::Matrix(Arc::clone(&self.matrix)))
    }
}

#[test]
fn resolve_blocks_infers_dimensions_once_per_block() {
    let requests = Arc::new(AtomicUsize::new(0));
    let operator = CountingOperator {
        matrix: Arc::new(csr(2, 2, &[1.0, 2.0, 0.0, 3.0])),
        requests: Arc::clone(&requests),
    };
    let bmat = BlockMatrix::<f64>::from_rows(vec![vec![Expr::operator(operator)]]).unwrap();

    let resolved = resolve_blocks(&bmat).unwrap();
    assert!(matches!(resolved.get(0, 0), Some(ResolvedBlock::Matrix(_))));
    // Once for the block sizes and once for the collapsed block
    assert_eq!(requests.load(Ordering::SeqCst), 2);
}
