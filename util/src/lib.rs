use nalgebra::DMatrix;
use nalgebra_sparse::{CooMatrix, CsrMatrix};

/// Poor man's approx assertion for matrices, measured in the max norm
#[macro_export]
macro_rules! assert_approx_matrix_eq {
    ($x:expr, $y:expr, abstol = $tol:expr) => {{
        let x = &$x;
        let y = &$y;
        assert_eq!(x.shape(), y.shape(), "Matrices must have the same shape");
        let max_absdiff = (x - y).amax();

        if max_absdiff > $tol {
            println!("abstol: {:e}", $tol);
            println!("left: {}", x);
            println!("right: {}", y);
            println!("max abs diff: {:e}", max_absdiff);
        }
        assert!(max_absdiff <= $tol);
    }};
}

pub fn dense(matrix: &CsrMatrix<f64>) -> DMatrix<f64> {
    DMatrix::from(matrix)
}

/// A deterministic sparse matrix with a pattern and values depending on `seed`.
pub fn sample_matrix(nrows: usize, ncols: usize, seed: usize) -> CsrMatrix<f64> {
    let mut coo = CooMatrix::new(nrows, ncols);
    for i in 0..nrows {
        for j in 0..ncols {
            if (7 * i + 3 * j + seed) % 4 != 0 {
                let v = ((i + 1) * (j + 2) + seed) as f64 / 3.0;
                coo.push(i, j, if (i + j + seed) % 2 == 0 { v } else { -v });
            }
        }
    }
    CsrMatrix::from(&coo)
}

/// Dense concatenation of a grid of dense blocks.
///
/// Panics if the blocks do not have consistent sizes.
pub fn dense_bmat(blocks: &[Vec<DMatrix<f64>>]) -> DMatrix<f64> {
    let row_sizes: Vec<_> = blocks.iter().map(|row| row[0].nrows()).collect();
    let col_sizes: Vec<_> = blocks[0].iter().map(DMatrix::ncols).collect();
    let mut output = DMatrix::zeros(row_sizes.iter().sum(), col_sizes.iter().sum());

    let row_offsets = prefix_sum(row_sizes.iter().copied(), 0);
    for (row, row_offset) in blocks.iter().zip(row_offsets) {
        let col_offsets = prefix_sum(col_sizes.iter().copied(), 0);
        for (block, col_offset) in row.iter().zip(col_offsets) {
            output
                .view_mut((row_offset, col_offset), block.shape())
                .copy_from(block);
        }
    }
    output
}

pub fn prefix_sum(counts: impl IntoIterator<Item = usize>, x0: usize) -> impl Iterator<Item = usize> {
    counts.into_iter().scan(x0, |sum, x| {
        let current = *sum;
        *sum += x;
        Some(current)
    })
}
