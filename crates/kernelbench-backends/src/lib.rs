//! Execution backends for the kernelbench workloads
//!
//! This crate provides everything a measured configuration needs apart from
//! the measurement loop itself:
//! - **Workloads**: randomly filled operand buffers for every [`Element`] type
//! - **Sweeps**: geometric problem size progressions
//! - **CPU addition**: scalar, lane-blocked, rayon and thread-per-call loops
//! - **CPU matmul**: faer GEMM with a configured degree of parallelism
//! - **GPU**: a generic compile/bind/stage/dispatch pipeline, with CUDA and
//!   cuBLAS implementations behind the `cuda` feature
//!
//! # Usage
//!
//! ```rust
//! use kernelbench_backends::{AdditionKernel, VectorizedAdd, Workload};
//!
//! # fn main() -> kernelbench_backends::Result<()> {
//! let mut workload = Workload::<f32>::random(1024)?;
//! let (a, b, c) = workload.split();
//! VectorizedAdd.add(a, b, c);
//! assert_eq!(workload.c()[7], workload.a()[7] + workload.b()[7]);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod backends;
pub mod error;
pub mod kernel;
pub mod sweep;
pub mod workload;

pub use backend::{AdditionKernel, ComputeDevice};
pub use backends::{
    FaerMatmul, KernelPipeline, ParallelAdd, ParallelVectorizedAdd, ScalarAdd, ThreadedAdd, VectorizedAdd,
};
pub use error::{BenchError, Result};
pub use kernel::{
    workgroup_count, CachingCompiler, CompiledProgram, ExternalCompiler, KernelCompiler, KernelSource, LOCAL_SIZE,
};
pub use sweep::SweepConfig;
pub use workload::{Element, Workload};

#[cfg(feature = "cuda")]
pub use backends::{CublasMatmul, CudaAdd, CudaCompute};
