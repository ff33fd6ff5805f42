//! Benchmark operands and the element types they are generated for
//!
//! A [`Workload`] owns the three equal-length buffers every addition backend
//! operates on. Inputs are filled once with uniform random values and never
//! written again; the output starts zeroed and is overwritten by each
//! measured iteration.

use std::fmt;
use std::mem::size_of;
use std::time::Instant;

use kernelbench_tracing::perf_span;
use kernelbench_tracing::performance::record_allocation;
use rand::Rng;

use crate::error::{BenchError, Result};

/// Scalar type a benchmark can be instantiated for.
pub trait Element: Copy + Default + Send + Sync + PartialEq + fmt::Debug + 'static {
    /// Short type name used in benchmark identifiers (`f32`, `i64`, ...)
    const NAME: &'static str;

    /// Spelling of the type in CUDA C source
    const C_TYPE: &'static str;

    /// CUDA C type the kernel adds in. Signed integers use their unsigned
    /// counterpart so overflow wraps instead of being undefined.
    const C_SUM_TYPE: &'static str;

    /// Draw one uniformly distributed value.
    ///
    /// Integers cover their full representable range, floats cover `[0, 1)`.
    fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self;

    /// Elementwise addition as performed by the kernels. Wraps for integers.
    fn add(self, rhs: Self) -> Self;
}

macro_rules! impl_integer_element {
    ($($ty:ty => $c_type:literal as $c_sum:literal),* $(,)?) => {
        $(
            impl Element for $ty {
                const NAME: &'static str = stringify!($ty);
                const C_TYPE: &'static str = $c_type;
                const C_SUM_TYPE: &'static str = $c_sum;

                #[inline]
                fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
                    rng.gen()
                }

                #[inline(always)]
                fn add(self, rhs: Self) -> Self {
                    self.wrapping_add(rhs)
                }
            }
        )*
    };
}

macro_rules! impl_float_element {
    ($($ty:ty => $c_type:literal),* $(,)?) => {
        $(
            impl Element for $ty {
                const NAME: &'static str = stringify!($ty);
                const C_TYPE: &'static str = $c_type;
                const C_SUM_TYPE: &'static str = $c_type;

                #[inline]
                fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
                    rng.gen()
                }

                #[inline(always)]
                fn add(self, rhs: Self) -> Self {
                    self + rhs
                }
            }
        )*
    };
}

impl_integer_element! {
    i8 => "signed char" as "unsigned char",
    i16 => "short" as "unsigned short",
    i32 => "int" as "unsigned int",
    i64 => "long long" as "unsigned long long",
    u8 => "unsigned char" as "unsigned char",
    u16 => "unsigned short" as "unsigned short",
    u32 => "unsigned int" as "unsigned int",
    u64 => "unsigned long long" as "unsigned long long",
}

impl_float_element! {
    f32 => "float",
    f64 => "double",
}

/// Overwrite every element of `buf` with an independent uniform draw.
///
/// Uses the thread-local generator, which is seeded from OS entropy, so two
/// calls never produce the same sequence.
pub fn randomise<T: Element>(buf: &mut [T]) {
    let mut rng = rand::thread_rng();
    for value in buf.iter_mut() {
        *value = T::sample(&mut rng);
    }
}

/// Allocate a zero-initialised host buffer, reporting failure instead of aborting.
pub(crate) fn host_buffer<T: Element>(len: usize) -> Result<Vec<T>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| BenchError::Allocation {
            what: "host buffer",
            requested: len.saturating_mul(size_of::<T>()),
        })?;
    buffer.resize(len, T::default());
    Ok(buffer)
}

/// Operands for one addition configuration: `c[i] = a[i] + b[i]`.
#[derive(Clone, PartialEq)]
pub struct Workload<T> {
    a: Vec<T>,
    b: Vec<T>,
    c: Vec<T>,
}

impl<T: Element> Workload<T> {
    /// Allocate buffers of `len` elements with random inputs and a zeroed output.
    pub fn random(len: usize) -> Result<Self> {
        let _span = perf_span!("workload_random", len = len, element = T::NAME);
        let start = Instant::now();

        let mut a = host_buffer(len)?;
        let mut b = host_buffer(len)?;
        let c = host_buffer(len)?;
        randomise(&mut a);
        randomise(&mut b);

        record_allocation(
            3 * len * size_of::<T>(),
            "host",
            start.elapsed().as_micros() as u64,
        );
        Ok(Self { a, b, c })
    }

    /// Build a workload from explicit buffers.
    pub fn from_parts(a: Vec<T>, b: Vec<T>, c: Vec<T>) -> Result<Self> {
        if a.len() != b.len() || a.len() != c.len() {
            return Err(BenchError::LengthMismatch {
                a: a.len(),
                b: b.len(),
                c: c.len(),
            });
        }
        Ok(Self { a, b, c })
    }

    pub fn len(&self) -> usize {
        self.c.len()
    }

    pub fn is_empty(&self) -> bool {
        self.c.is_empty()
    }

    pub fn a(&self) -> &[T] {
        &self.a
    }

    pub fn b(&self) -> &[T] {
        &self.b
    }

    pub fn c(&self) -> &[T] {
        &self.c
    }

    /// Borrow the inputs shared and the output exclusively.
    pub fn split(&mut self) -> (&[T], &[T], &mut [T]) {
        (&self.a, &self.b, &mut self.c)
    }

    /// Buffer at binding slot `index` (0 = `a`, 1 = `b`, 2 = `c`).
    pub fn buffer(&self, index: usize) -> Option<&[T]> {
        match index {
            0 => Some(&self.a),
            1 => Some(&self.b),
            2 => Some(&self.c),
            _ => None,
        }
    }

    /// Mutable buffer at binding slot `index`.
    pub fn buffer_mut(&mut self, index: usize) -> Option<&mut [T]> {
        match index {
            0 => Some(&mut self.a),
            1 => Some(&mut self.b),
            2 => Some(&mut self.c),
            _ => None,
        }
    }
}

impl<T: Element> fmt::Debug for Workload<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workload")
            .field("element", &T::NAME)
            .field("len", &self.len())
            .finish()
    }
}
