//! Small dense linear-algebra routines shared by the decomposition crates.

use ndarray::{Array1, Array2, ArrayView2};

use crate::{Float, TransformError};

const MAX_SWEEPS: usize = 100;

/// Eigen-decomposition of a real symmetric matrix using cyclic Jacobi
/// rotations.
///
/// Returns `(eigenvalues, eigenvectors)` with eigenvalues sorted in
/// descending order and eigenvector `i` stored in column `i`. Each
/// eigenvector is scaled to unit length and its largest-magnitude component is
/// made positive so the output is deterministic.
pub fn symmetric_eigen<F: Float>(
    matrix: ArrayView2<F>,
) -> Result<(Array1<F>, Array2<F>), TransformError> {
    let n = matrix.nrows();
    if n != matrix.ncols() {
        return Err(TransformError::Numerical(format!(
            "eigen-decomposition needs a square matrix, got {}x{}",
            n,
            matrix.ncols()
        )));
    }
    if matrix.iter().any(|x| !x.is_finite()) {
        return Err(TransformError::Numerical(
            "matrix contains NaN or infinite values".into(),
        ));
    }

    let mut a = matrix.to_owned();
    let mut v = Array2::<F>::eye(n);

    let norm = a.iter().map(|&x| x * x).sum::<F>().sqrt();
    let scale = F::from_usize(n.max(1)).unwrap_or_else(F::one);
    let tol = F::epsilon() * norm * scale;

    // Exhausting the sweeps only happens once rounding stalls the off-diagonal
    // mass, so the diagonal is kept as is.
    for _ in 0..MAX_SWEEPS {
        if off_diagonal_norm(&a) <= tol {
            break;
        }
        for p in 0..n {
            for q in (p + 1)..n {
                if a[[p, q]] == F::zero() {
                    continue;
                }
                rotate(&mut a, &mut v, p, q);
            }
        }
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| {
        a[[j, j]]
            .partial_cmp(&a[[i, i]])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut values = Array1::zeros(n);
    let mut vectors = Array2::zeros((n, n));
    for (dst, &src) in order.iter().enumerate() {
        values[dst] = a[[src, src]];
        let mut column = v.column(src).to_owned();
        let pivot = column
            .iter()
            .copied()
            .fold(F::zero(), |best, x| if x.abs() > best.abs() { x } else { best });
        if pivot < F::zero() {
            column.mapv_inplace(|x| -x);
        }
        vectors.column_mut(dst).assign(&column);
    }

    Ok((values, vectors))
}

fn off_diagonal_norm<F: Float>(a: &Array2<F>) -> F {
    let mut sum = F::zero();
    for ((i, j), &x) in a.indexed_iter() {
        if i != j {
            sum += x * x;
        }
    }
    sum.sqrt()
}

/// Applies the rotation that zeroes `a[p, q]`: `A <- JᵀAJ`, `V <- VJ`.
fn rotate<F: Float>(a: &mut Array2<F>, v: &mut Array2<F>, p: usize, q: usize) {
    let n = a.nrows();
    let two = F::one() + F::one();
    let apq = a[[p, q]];
    let theta = (a[[q, q]] - a[[p, p]]) / (two * apq);
    let sign = if theta >= F::zero() { F::one() } else { -F::one() };
    let t = sign / (theta.abs() + (theta * theta + F::one()).sqrt());
    let c = F::one() / (t * t + F::one()).sqrt();
    let s = t * c;

    for k in 0..n {
        let akp = a[[k, p]];
        let akq = a[[k, q]];
        a[[k, p]] = c * akp - s * akq;
        a[[k, q]] = s * akp + c * akq;
    }
    for k in 0..n {
        let apk = a[[p, k]];
        let aqk = a[[q, k]];
        a[[p, k]] = c * apk - s * aqk;
        a[[q, k]] = s * apk + c * aqk;
    }
    for k in 0..n {
        let vkp = v[[k, p]];
        let vkq = v[[k, q]];
        v[[k, p]] = c * vkp - s * vkq;
        v[[k, q]] = s * vkp + c * vkq;
    }
}

/// Inverse square root of a symmetric positive semi-definite matrix.
///
/// Eigenvalues below `floor` are clamped to `floor` before inversion so that
/// near-singular scatter matrices stay usable.
pub fn inverse_sqrt<F: Float>(matrix: ArrayView2<F>, floor: F) -> Result<Array2<F>, TransformError> {
    let (values, vectors) = symmetric_eigen(matrix)?;
    let scaled = values.mapv(|x| F::one() / x.max(floor).sqrt());
    let mut left = vectors.clone();
    for (mut column, &s) in left.columns_mut().into_iter().zip(scaled.iter()) {
        column.mapv_inplace(|x| x * s);
    }
    Ok(left.dot(&vectors.t()))
}
