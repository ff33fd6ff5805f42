use crate::backend::AdditionKernel;
use crate::workload::Element;

/// Elements per block of the lane-blocked loop
pub const LANES: usize = 16;

/// Single-threaded loop written so LLVM lowers each block to SIMD.
#[derive(Clone, Copy, Debug, Default)]
pub struct VectorizedAdd;

impl<T: Element> AdditionKernel<T> for VectorizedAdd {
    fn name(&self) -> &'static str {
        "vectorized"
    }

    fn add(&self, a: &[T], b: &[T], c: &mut [T]) {
        vectorized_add(a, b, c);
    }
}

/// `c[i] = a[i] + b[i]` in blocks of [`LANES`] with a scalar tail.
#[inline]
pub fn vectorized_add<T: Element>(a: &[T], b: &[T], c: &mut [T]) {
    debug_assert!(a.len() == c.len() && b.len() == c.len());
    let len = c.len().min(a.len()).min(b.len());
    let (a, b, c) = (&a[..len], &b[..len], &mut c[..len]);

    let mut out_blocks = c.chunks_exact_mut(LANES);
    let mut lhs_blocks = a.chunks_exact(LANES);
    let mut rhs_blocks = b.chunks_exact(LANES);

    for ((out, lhs), rhs) in out_blocks.by_ref().zip(lhs_blocks.by_ref()).zip(rhs_blocks.by_ref()) {
        for ((o, &x), &y) in out.iter_mut().zip(lhs).zip(rhs) {
            *o = x.add(y);
        }
    }

    let tail = out_blocks.into_remainder();
    for ((o, &x), &y) in tail.iter_mut().zip(lhs_blocks.remainder()).zip(rhs_blocks.remainder()) {
        *o = x.add(y);
    }
}
