//! CUDA backends (feature `cuda`)
//!
//! ```text
//! CudaAdd<T>      KernelPipeline over CudaCompute, kernel built by nvcc
//! CudaCompute     device 0, buffers are CudaSlice<T>, programs are PTX modules
//! CublasMatmul    device-resident matrices, one sgemm per iteration
//! ```

mod blas;
mod device;

pub use blas::CublasMatmul;
pub use device::{CudaCompute, CudaElement};

use crate::backends::pipeline::KernelPipeline;
use crate::error::{BenchError, Result};
use crate::kernel::{ExternalCompiler, KernelCompiler, KernelSource, LOCAL_SIZE, VECTOR_ADD_BINDINGS};
use crate::workload::Workload;

/// Vector addition dispatched on the first CUDA device.
pub type CudaAdd<T> = KernelPipeline<T, CudaCompute>;

impl<T: CudaElement> KernelPipeline<T, CudaCompute> {
    /// Compile the vector-add kernel with `nvcc` and stage a random workload.
    pub fn prepare(size: usize) -> Result<Self> {
        Self::prepare_with(size, &ExternalCompiler::nvcc())
    }

    /// Same as [`prepare`](Self::prepare) with a caller-supplied compiler.
    pub fn prepare_with<C: KernelCompiler + ?Sized>(size: usize, compiler: &C) -> Result<Self> {
        if size % LOCAL_SIZE as usize != 0 {
            return Err(BenchError::MisalignedDispatch {
                size,
                local_size: LOCAL_SIZE,
            });
        }
        let workload = Workload::random(size)?;
        KernelPipeline::build(
            || CudaCompute::new(0),
            compiler,
            &KernelSource::vector_add::<T>(),
            &VECTOR_ADD_BINDINGS,
            workload,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::CompiledProgram;

    struct Rejecting;

    impl KernelCompiler for Rejecting {
        fn compile(&self, _source: &KernelSource) -> Result<CompiledProgram> {
            Err(BenchError::Compilation {
                tool: "reject".to_string(),
                status: Some(1),
                stderr: "syntax error".to_string(),
            })
        }
    }

    #[test]
    fn misaligned_size_is_rejected_before_setup() {
        let err = CudaAdd::<f32>::prepare_with(1000, &Rejecting).err().unwrap();
        assert!(matches!(err, BenchError::MisalignedDispatch { size: 1000, local_size: 1024 }));
    }

    #[test]
    fn compilation_failure_aborts_configuration() {
        let err = CudaAdd::<f32>::prepare_with(4096, &Rejecting).err().unwrap();
        assert!(matches!(err, BenchError::Compilation { .. }));
    }

    #[test]
    #[ignore = "requires a CUDA device and nvcc"]
    fn gpu_addition_matches_host() {
        let mut add = CudaAdd::<f32>::prepare(4096).unwrap();
        assert_eq!(add.workgroups(), 4);
        add.run().unwrap();
        let workload = add.workload();
        for i in 0..workload.len() {
            assert_eq!(workload.c()[i], workload.a()[i] + workload.b()[i]);
        }
    }

    #[test]
    #[ignore = "requires a CUDA device and nvcc"]
    fn gpu_integer_addition_wraps() {
        let mut add = CudaAdd::<i32>::prepare(1 << 12).unwrap();
        add.run().unwrap();
        let workload = add.workload();
        for i in 0..workload.len() {
            assert_eq!(workload.c()[i], workload.a()[i].wrapping_add(workload.b()[i]));
        }
    }
}
