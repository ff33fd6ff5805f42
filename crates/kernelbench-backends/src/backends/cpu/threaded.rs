use std::mem;
use std::num::NonZeroUsize;
use std::ops::Range;
use std::sync::OnceLock;
use std::thread;

use crate::backend::AdditionKernel;
use crate::workload::Element;

/// Hardware threads reported by the OS, queried once per process.
pub fn hardware_threads() -> usize {
    static THREADS: OnceLock<usize> = OnceLock::new();
    *THREADS.get_or_init(|| thread::available_parallelism().map_or(1, NonZeroUsize::get))
}

/// Addition split across OS threads that are spawned and joined on every call.
///
/// Thread `t` owns `[t * (len / N), (t + 1) * (len / N))`. The last
/// `len % N` outputs belong to no thread and keep whatever value they had.
#[derive(Clone, Copy, Debug)]
pub struct ThreadedAdd {
    threads: usize,
}

impl ThreadedAdd {
    /// One thread per hardware thread.
    pub fn new() -> Self {
        Self::with_threads(hardware_threads())
    }

    /// Fixed thread count; zero is treated as one.
    pub fn with_threads(threads: usize) -> Self {
        Self {
            threads: threads.max(1),
        }
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Index range written by each thread for a buffer of `len` elements.
    pub fn partitions(&self, len: usize) -> Vec<Range<usize>> {
        let chunk = len / self.threads;
        (0..self.threads).map(|t| t * chunk..(t + 1) * chunk).collect()
    }
}

impl Default for ThreadedAdd {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> AdditionKernel<T> for ThreadedAdd {
    fn name(&self) -> &'static str {
        "threaded"
    }

    fn add(&self, a: &[T], b: &[T], c: &mut [T]) {
        debug_assert!(a.len() == c.len() && b.len() == c.len());
        let len = c.len().min(a.len()).min(b.len());
        let partitions = self.partitions(len);
        let covered = partitions.last().map_or(0, |range| range.end);
        let mut rest = &mut c[..covered];

        thread::scope(|scope| {
            for range in partitions {
                let (out, tail) = mem::take(&mut rest).split_at_mut(range.len());
                rest = tail;
                let (lhs, rhs) = (&a[range.clone()], &b[range]);
                scope.spawn(move || {
                    for ((o, &x), &y) in out.iter_mut().zip(lhs).zip(rhs) {
                        *o = x.add(y);
                    }
                });
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partitions_drop_remainder() {
        let kernel = ThreadedAdd::with_threads(4);
        assert_eq!(kernel.partitions(100), vec![0..25, 25..50, 50..75, 75..100]);
        assert_eq!(kernel.partitions(101), vec![0..25, 25..50, 50..75, 75..100]);
    }

    #[test]
    fn remainder_is_left_untouched() {
        let kernel = ThreadedAdd::with_threads(4);
        let a = vec![1i32; 101];
        let b = vec![2i32; 101];
        let mut c = vec![-7i32; 101];
        kernel.add(&a, &b, &mut c);
        assert!(c[..100].iter().all(|&v| v == 3));
        assert_eq!(c[100], -7);
    }

    #[test]
    fn fewer_elements_than_threads_writes_nothing() {
        let kernel = ThreadedAdd::with_threads(8);
        let mut c = vec![0u8; 5];
        kernel.add(&[1; 5], &[1; 5], &mut c);
        assert_eq!(c, vec![0; 5]);
    }

    #[test]
    fn hardware_threads_is_stable() {
        assert!(hardware_threads() >= 1);
        assert_eq!(hardware_threads(), ThreadedAdd::new().threads());
    }

    #[test]
    fn zero_threads_clamps_to_one() {
        assert_eq!(ThreadedAdd::with_threads(0).threads(), 1);
    }
}
