//! Backend implementations
//!
//! - `cpu` - addition loops: scalar, lane-blocked, rayon and spawned threads
//! - `linalg` - dense matrix multiplication with faer
//! - `pipeline` - compile, bind, stage and dispatch over a [`ComputeDevice`](crate::ComputeDevice)
//! - `cuda` - CUDA device, vector-add pipeline and cuBLAS GEMM (feature `cuda`)

pub mod cpu;
pub mod linalg;
pub mod pipeline;

#[cfg(feature = "cuda")]
pub mod cuda;

pub use cpu::{ParallelAdd, ParallelVectorizedAdd, ScalarAdd, ThreadedAdd, VectorizedAdd};
pub use linalg::FaerMatmul;
pub use pipeline::KernelPipeline;

#[cfg(feature = "cuda")]
pub use cuda::{CublasMatmul, CudaAdd, CudaCompute};
