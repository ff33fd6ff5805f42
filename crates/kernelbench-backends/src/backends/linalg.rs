//! Dense square matrix multiplication on the CPU with faer
//!
//! Operands are `order × order` with `order = floor(sqrt(size))`, filled with
//! uniform values in `[-1, 1)`. Each call to [`FaerMatmul::multiply`]
//! overwrites `C` with `A · B`.

use std::time::Instant;

use faer::linalg::matmul::matmul;
use faer::{Accum, Mat, Par};
use kernelbench_tracing::perf_span;
use kernelbench_tracing::performance::record_allocation;
use rand::distributions::{Distribution, Uniform};

use crate::error::{BenchError, Result};
use crate::sweep::square_order;

/// faer GEMM with a fixed degree of parallelism.
pub struct FaerMatmul {
    a: Mat<f32>,
    b: Mat<f32>,
    c: Mat<f32>,
    threads: usize,
}

impl FaerMatmul {
    /// Random operands for a problem of `size` elements.
    ///
    /// `threads == 0` runs sequentially; any other value uses that many
    /// rayon workers.
    pub fn random(size: usize, threads: usize) -> Result<Self> {
        let order = square_order(size);
        let _span = perf_span!("faer_matmul_setup", order = order, threads = threads);
        let start = Instant::now();

        let a = random_matrix(order)?;
        let b = random_matrix(order)?;
        let c = Mat::zeros(order, order);

        record_allocation(
            3 * order * order * std::mem::size_of::<f32>(),
            "host",
            start.elapsed().as_micros() as u64,
        );
        Ok(Self { a, b, c, threads })
    }

    /// Build from explicit operands, which must be square and of equal order.
    pub fn from_parts(a: Mat<f32>, b: Mat<f32>, threads: usize) -> Result<Self> {
        let order = a.nrows();
        if a.ncols() != order || b.nrows() != order || b.ncols() != order {
            return Err(BenchError::LengthMismatch {
                a: a.nrows() * a.ncols(),
                b: b.nrows() * b.ncols(),
                c: order * order,
            });
        }
        Ok(Self {
            a,
            b,
            c: Mat::zeros(order, order),
            threads,
        })
    }

    /// `C = A · B`
    pub fn multiply(&mut self) {
        matmul(
            self.c.as_mut(),
            Accum::Replace,
            self.a.as_ref(),
            self.b.as_ref(),
            1.0f32,
            parallelism(self.threads),
        );
    }

    pub fn order(&self) -> usize {
        self.c.nrows()
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn a(&self) -> &Mat<f32> {
        &self.a
    }

    pub fn b(&self) -> &Mat<f32> {
        &self.b
    }

    pub fn c(&self) -> &Mat<f32> {
        &self.c
    }
}

/// Map a thread count to faer's parallelism setting. Zero means sequential.
pub fn parallelism(threads: usize) -> Par {
    match threads {
        0 => Par::Seq,
        n => Par::rayon(n),
    }
}

fn random_matrix(order: usize) -> Result<Mat<f32>> {
    let len = order * order;
    let mut values = Vec::new();
    values
        .try_reserve_exact(len)
        .map_err(|_| BenchError::Allocation {
            what: "matrix operand",
            requested: len * std::mem::size_of::<f32>(),
        })?;

    let range = Uniform::new(-1.0f32, 1.0f32);
    let mut rng = rand::thread_rng();
    values.extend((0..len).map(|_| range.sample(&mut rng)));

    Ok(Mat::from_fn(order, order, |i, j| values[j * order + i]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive(a: &Mat<f32>, b: &Mat<f32>) -> Vec<f64> {
        let n = a.nrows();
        let mut out = vec![0.0f64; n * n];
        for i in 0..n {
            for j in 0..n {
                out[j * n + i] = (0..n).map(|k| a[(i, k)] as f64 * b[(k, j)] as f64).sum();
            }
        }
        out
    }

    fn assert_matches_naive(gemm: &FaerMatmul) {
        let n = gemm.order();
        let expected = naive(gemm.a(), gemm.b());
        for j in 0..n {
            for i in 0..n {
                let got = gemm.c()[(i, j)] as f64;
                let want = expected[j * n + i];
                assert!((got - want).abs() <= 1e-3 * (1.0 + want.abs()), "({i}, {j}): {got} vs {want}");
            }
        }
    }

    #[test]
    fn order_is_floor_sqrt() {
        assert_eq!(FaerMatmul::random(16, 0).unwrap().order(), 4);
        assert_eq!(FaerMatmul::random(20, 0).unwrap().order(), 4);
        assert_eq!(FaerMatmul::random(256, 0).unwrap().order(), 16);
    }

    #[test]
    fn sequential_matches_naive() {
        let mut gemm = FaerMatmul::random(1 << 12, 0).unwrap();
        gemm.multiply();
        assert_matches_naive(&gemm);
    }

    #[test]
    fn parallel_matches_naive() {
        let mut gemm = FaerMatmul::random(1 << 12, 8).unwrap();
        gemm.multiply();
        assert_matches_naive(&gemm);
    }

    #[test]
    fn repeated_multiply_replaces_output() {
        let a = Mat::from_fn(2, 2, |i, j| (i * 2 + j) as f32);
        let b = Mat::from_fn(2, 2, |i, j| if i == j { 1.0 } else { 0.0 });
        let mut gemm = FaerMatmul::from_parts(a.clone(), b, 0).unwrap();
        gemm.multiply();
        gemm.multiply();
        for j in 0..2 {
            for i in 0..2 {
                assert_eq!(gemm.c()[(i, j)], a[(i, j)]);
            }
        }
    }

    #[test]
    fn operands_are_in_symmetric_unit_range() {
        let gemm = FaerMatmul::random(1 << 10, 0).unwrap();
        let n = gemm.order();
        for j in 0..n {
            for i in 0..n {
                assert!((-1.0..1.0).contains(&gemm.a()[(i, j)]));
            }
        }
    }

    #[test]
    fn rejects_non_square_operands() {
        let a = Mat::<f32>::zeros(2, 3);
        let b = Mat::<f32>::zeros(3, 3);
        assert!(FaerMatmul::from_parts(a, b, 0).is_err());
    }
}
