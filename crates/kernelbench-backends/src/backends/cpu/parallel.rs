use rayon::prelude::*;

use super::vectorized::vectorized_add;
use crate::backend::AdditionKernel;
use crate::workload::Element;

/// Elements handed to each rayon task by [`ParallelVectorizedAdd`]
pub const PARALLEL_CHUNK: usize = 4096;

/// Fork-join addition over individual elements on the global rayon pool.
#[derive(Clone, Copy, Debug, Default)]
pub struct ParallelAdd;

impl<T: Element> AdditionKernel<T> for ParallelAdd {
    fn name(&self) -> &'static str {
        "parallel"
    }

    fn add(&self, a: &[T], b: &[T], c: &mut [T]) {
        c.par_iter_mut()
            .zip(a.par_iter())
            .zip(b.par_iter())
            .for_each(|((o, &x), &y)| *o = x.add(y));
    }
}

/// Fork-join addition where each task runs the lane-blocked loop over a chunk.
#[derive(Clone, Copy, Debug, Default)]
pub struct ParallelVectorizedAdd;

impl<T: Element> AdditionKernel<T> for ParallelVectorizedAdd {
    fn name(&self) -> &'static str {
        "parallel_vectorized"
    }

    fn add(&self, a: &[T], b: &[T], c: &mut [T]) {
        c.par_chunks_mut(PARALLEL_CHUNK)
            .zip(a.par_chunks(PARALLEL_CHUNK))
            .zip(b.par_chunks(PARALLEL_CHUNK))
            .for_each(|((out, lhs), rhs)| vectorized_add(lhs, rhs, out));
    }
}
