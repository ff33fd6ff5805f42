use std::hint::black_box;

use crate::backend::AdditionKernel;
use crate::workload::Element;

/// Single-threaded loop that LLVM is prevented from vectorising.
///
/// Serves as the floor the other backends are compared against.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScalarAdd;

impl<T: Element> AdditionKernel<T> for ScalarAdd {
    fn name(&self) -> &'static str {
        "scalar"
    }

    fn add(&self, a: &[T], b: &[T], c: &mut [T]) {
        scalar_add(a, b, c);
    }
}

/// `c[i] = a[i] + b[i]`, one element per iteration.
#[inline(never)]
pub fn scalar_add<T: Element>(a: &[T], b: &[T], c: &mut [T]) {
    debug_assert!(a.len() == c.len() && b.len() == c.len());
    let len = c.len().min(a.len()).min(b.len());
    for i in 0..len {
        // Opaque index: the loop body cannot be widened into lanes.
        let i = black_box(i);
        c[i] = a[i].add(b[i]);
    }
}
