//! Criterion integration for the kernelbench backends
//!
//! The bench targets build a [`Criterion`](criterion::Criterion), register
//! the suites below against it, and exit non-zero if any configuration
//! failed:
//!
//! ```rust,no_run
//! use criterion::Criterion;
//! use kernelbench_backends::SweepConfig;
//! use kernelbench_harness::{addition_suite, FailureLog};
//!
//! let mut criterion = Criterion::default().configure_from_args();
//! let mut failures = FailureLog::new();
//! addition_suite::<f32>(&mut criterion, &SweepConfig::ADDITION, &mut failures);
//! criterion.final_summary();
//! let _ = failures.finish();
//! ```

pub mod failures;
pub mod registry;
pub mod session;

use criterion::Criterion;
use kernelbench_backends::{
    Element, ParallelAdd, ParallelVectorizedAdd, ScalarAdd, SweepConfig, ThreadedAdd, VectorizedAdd,
};
use kernelbench_tracing::{init_global_tracing, TracingConfig};

pub use failures::{Failure, FailureLog};
pub use registry::register;
pub use session::{Addition, AdditionSession, Benchmark, FaerBenchmark, MatmulSession, Session};

#[cfg(feature = "cuda")]
pub use session::{CublasBenchmark, CudaAddition};

/// Environment prefix for the addition sweep bounds
pub const ADDITION_SWEEP_ENV: &str = "KERNELBENCH_ADD";

/// Environment prefix for the matmul sweep bounds
pub const MATMUL_SWEEP_ENV: &str = "KERNELBENCH_MATMUL";

/// Thread count of the fixed-pool faer configuration
pub const FAER_POOL_THREADS: usize = 8;

/// Install the tracing subscriber described by the environment.
///
/// A subscriber that is already installed is left in place.
pub fn init_tracing() {
    if let Err(err) = init_global_tracing(&TracingConfig::from_env()) {
        eprintln!("kernelbench: {err}");
    }
}

/// Register every host addition backend for element type `T`.
pub fn addition_suite<T: Element>(c: &mut Criterion, sweep: &SweepConfig, failures: &mut FailureLog) {
    let group = format!("addition/{}", T::NAME);
    register(c, &group, &Addition::<T, _>::new(ScalarAdd), sweep, failures);
    register(c, &group, &Addition::<T, _>::new(VectorizedAdd), sweep, failures);
    register(c, &group, &Addition::<T, _>::new(ParallelAdd), sweep, failures);
    register(c, &group, &Addition::<T, _>::new(ParallelVectorizedAdd), sweep, failures);
    register(c, &group, &Addition::<T, _>::new(ThreadedAdd::new()), sweep, failures);
}

/// Register the CUDA vector-add backend for element type `T`.
#[cfg(feature = "cuda")]
pub fn cuda_addition_suite<T: kernelbench_backends::backends::cuda::CudaElement>(
    c: &mut Criterion,
    sweep: &SweepConfig,
    failures: &mut FailureLog,
) {
    let group = format!("addition/{}", T::NAME);
    register(c, &group, &CudaAddition::<T>::default(), sweep, failures);
}

/// Register the matrix multiplication backends.
pub fn matmul_suite(c: &mut Criterion, sweep: &SweepConfig, failures: &mut FailureLog) {
    let group = "matmul/f32";
    register(c, group, &FaerBenchmark { threads: 0 }, sweep, failures);
    register(c, group, &FaerBenchmark { threads: FAER_POOL_THREADS }, sweep, failures);
    #[cfg(feature = "cuda")]
    register(c, group, &CublasBenchmark, sweep, failures);
}
