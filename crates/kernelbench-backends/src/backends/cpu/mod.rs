//! Host addition backends
//!
//! All of these compute the same result on the range they cover. They differ
//! only in how the loop is executed:
//!
//! | Backend | Execution |
//! |---|---|
//! | [`ScalarAdd`] | one element per step, vectorisation blocked |
//! | [`VectorizedAdd`] | fixed-width lanes LLVM lowers to SIMD |
//! | [`ParallelAdd`] | rayon over individual elements |
//! | [`ParallelVectorizedAdd`] | rayon over lane-blocked chunks |
//! | [`ThreadedAdd`] | OS threads spawned per call |

mod parallel;
mod scalar;
mod threaded;
mod vectorized;

pub use parallel::{ParallelAdd, ParallelVectorizedAdd, PARALLEL_CHUNK};
pub use scalar::{scalar_add, ScalarAdd};
pub use threaded::{hardware_threads, ThreadedAdd};
pub use vectorized::{vectorized_add, VectorizedAdd, LANES};
