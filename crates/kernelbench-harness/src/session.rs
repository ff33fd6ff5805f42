//! Per-configuration benchmark state
//!
//! A [`Benchmark`] describes one backend: which sizes it runs, how to build
//! a [`Session`] for a size, and how much work one iteration represents. A
//! session owns everything set up for that size; `run` is exactly the region
//! criterion measures, and dropping the session releases its resources.

use std::marker::PhantomData;

use criterion::Throughput;
use kernelbench_backends::sweep::square_order;
use kernelbench_backends::{AdditionKernel, Element, FaerMatmul, Result, SweepConfig, Workload};

/// State prepared for one backend at one problem size.
pub trait Session {
    /// One measured iteration.
    fn run(&mut self) -> Result<()>;
}

/// A backend as registered with the measurement driver.
pub trait Benchmark {
    type Session: Session;

    /// Function name within the criterion group
    fn label(&self) -> String;

    /// Sizes this backend runs for the given sweep.
    fn sizes(&self, sweep: &SweepConfig) -> Vec<usize> {
        sweep.sizes().collect()
    }

    /// Work performed by one iteration at `size`.
    fn throughput(&self, size: usize) -> Throughput;

    /// All setup for `size`, outside the measured region.
    fn prepare(&self, size: usize) -> Result<Self::Session>;
}

/// Elements added per iteration.
pub fn addition_throughput(size: usize) -> Throughput {
    Throughput::Elements(size as u64)
}

/// Floating point operations per square matmul of `size` elements.
///
/// Reported through `Throughput::Elements`, so criterion's `elem/s` column
/// reads as FLOP/s for matmul groups.
pub fn matmul_throughput(size: usize) -> Throughput {
    let order = square_order(size) as u64;
    Throughput::Elements(2 * order * order * order)
}

/// A workload paired with a host addition kernel.
pub struct AdditionSession<T, K> {
    workload: Workload<T>,
    kernel: K,
}

impl<T: Element, K: AdditionKernel<T>> AdditionSession<T, K> {
    pub fn new(workload: Workload<T>, kernel: K) -> Self {
        Self { workload, kernel }
    }

    pub fn workload(&self) -> &Workload<T> {
        &self.workload
    }
}

impl<T: Element, K: AdditionKernel<T>> Session for AdditionSession<T, K> {
    fn run(&mut self) -> Result<()> {
        let (a, b, c) = self.workload.split();
        self.kernel.add(a, b, c);
        Ok(())
    }
}

/// Any host addition kernel over random operands of element type `T`.
pub struct Addition<T, K> {
    kernel: K,
    _element: PhantomData<fn() -> T>,
}

impl<T: Element, K: AdditionKernel<T> + Clone> Addition<T, K> {
    pub fn new(kernel: K) -> Self {
        Self {
            kernel,
            _element: PhantomData,
        }
    }
}

impl<T: Element, K: AdditionKernel<T> + Clone> Benchmark for Addition<T, K> {
    type Session = AdditionSession<T, K>;

    fn label(&self) -> String {
        self.kernel.name().to_string()
    }

    fn throughput(&self, size: usize) -> Throughput {
        addition_throughput(size)
    }

    fn prepare(&self, size: usize) -> Result<Self::Session> {
        Ok(AdditionSession::new(Workload::random(size)?, self.kernel.clone()))
    }
}

/// faer GEMM as a measured session.
pub struct MatmulSession {
    gemm: FaerMatmul,
}

impl MatmulSession {
    pub fn gemm(&self) -> &FaerMatmul {
        &self.gemm
    }
}

impl Session for MatmulSession {
    fn run(&mut self) -> Result<()> {
        self.gemm.multiply();
        Ok(())
    }
}

/// faer GEMM with a fixed thread count; zero runs sequentially.
#[derive(Clone, Copy, Debug)]
pub struct FaerBenchmark {
    pub threads: usize,
}

impl Benchmark for FaerBenchmark {
    type Session = MatmulSession;

    fn label(&self) -> String {
        match self.threads {
            0 => "faer_single".to_string(),
            n => format!("faer_{n}_threads"),
        }
    }

    fn throughput(&self, size: usize) -> Throughput {
        matmul_throughput(size)
    }

    fn prepare(&self, size: usize) -> Result<MatmulSession> {
        Ok(MatmulSession {
            gemm: FaerMatmul::random(size, self.threads)?,
        })
    }
}

#[cfg(feature = "cuda")]
pub use self::cuda::{CublasBenchmark, CudaAddition};

#[cfg(feature = "cuda")]
mod cuda {
    use std::marker::PhantomData;

    use criterion::Throughput;
    use kernelbench_backends::backends::cuda::CudaElement;
    use kernelbench_backends::{CublasMatmul, CudaAdd, Result, SweepConfig, LOCAL_SIZE};
    use tracing::info;

    use super::{addition_throughput, matmul_throughput, Benchmark, Session};

    impl<T: CudaElement> Session for CudaAdd<T> {
        fn run(&mut self) -> Result<()> {
            CudaAdd::<T>::run(self)
        }
    }

    impl Session for CublasMatmul {
        fn run(&mut self) -> Result<()> {
            self.multiply()
        }
    }

    /// Vector addition on the CUDA device, restricted to whole workgroups.
    pub struct CudaAddition<T> {
        _element: PhantomData<fn() -> T>,
    }

    impl<T> Default for CudaAddition<T> {
        fn default() -> Self {
            Self { _element: PhantomData }
        }
    }

    impl<T: CudaElement> Benchmark for CudaAddition<T> {
        type Session = CudaAdd<T>;

        fn label(&self) -> String {
            "cuda".to_string()
        }

        fn sizes(&self, sweep: &SweepConfig) -> Vec<usize> {
            sweep
                .sizes()
                .filter(|&size| {
                    let aligned = size % LOCAL_SIZE as usize == 0;
                    if !aligned {
                        info!(size, local_size = LOCAL_SIZE, "skipping size that is not a whole number of workgroups");
                    }
                    aligned
                })
                .collect()
        }

        fn throughput(&self, size: usize) -> Throughput {
            addition_throughput(size)
        }

        fn prepare(&self, size: usize) -> Result<CudaAdd<T>> {
            CudaAdd::<T>::prepare(size)
        }
    }

    /// cuBLAS `sgemm`.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct CublasBenchmark;

    impl Benchmark for CublasBenchmark {
        type Session = CublasMatmul;

        fn label(&self) -> String {
            "cublas".to_string()
        }

        fn throughput(&self, size: usize) -> Throughput {
            matmul_throughput(size)
        }

        fn prepare(&self, size: usize) -> Result<CublasMatmul> {
            CublasMatmul::prepare(size)
        }
    }
}
