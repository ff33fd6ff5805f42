use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use cudarc::cublas::sys::cublasOperation_t;
use cudarc::cublas::{CudaBlas, Gemm, GemmConfig};
use cudarc::curand::CudaRng;
use cudarc::driver::{CudaDevice, CudaSlice};
use kernelbench_tracing::perf_span;
use tracing::debug;

use crate::error::{BenchError, Result};
use crate::sweep::square_order;

/// Square `sgemm` on device-resident matrices.
///
/// Each [`multiply`](Self::multiply) computes `C = A·B + C` (`alpha = 1`,
/// `beta = 1`), so `C` accumulates across iterations. Matrices are
/// column-major with every leading dimension equal to the order.
pub struct CublasMatmul {
    device: Arc<CudaDevice>,
    blas: CudaBlas,
    a: CudaSlice<f32>,
    b: CudaSlice<f32>,
    c: CudaSlice<f32>,
    order: usize,
}

impl CublasMatmul {
    /// Allocate and randomly fill matrices for a problem of `size` elements.
    pub fn prepare(size: usize) -> Result<Self> {
        let order = square_order(size);
        let len = order * order;
        let _span = perf_span!("cublas_setup", order = order);

        if i32::try_from(order).is_err() {
            return Err(BenchError::device(format!("matrix order {order} exceeds cuBLAS index range")));
        }

        let device = CudaDevice::new(0).map_err(|e| BenchError::device(format!("CUDA device initialisation failed: {e}")))?;

        let alloc = |what: &'static str| {
            device.alloc_zeros::<f32>(len).map_err(|_| BenchError::Allocation {
                what,
                requested: len * std::mem::size_of::<f32>(),
            })
        };
        let mut a = alloc("device matrix A")?;
        let mut b = alloc("device matrix B")?;
        let c = alloc("device matrix C")?;

        let rng = CudaRng::new(clock_seed(), Arc::clone(&device))
            .map_err(|e| BenchError::device(format!("cuRAND generator creation failed: {e:?}")))?;
        rng.fill_with_uniform(&mut a)
            .map_err(|e| BenchError::device(format!("cuRAND fill failed: {e:?}")))?;
        rng.fill_with_uniform(&mut b)
            .map_err(|e| BenchError::device(format!("cuRAND fill failed: {e:?}")))?;

        let blas = CudaBlas::new(Arc::clone(&device))
            .map_err(|e| BenchError::device(format!("cuBLAS handle creation failed: {e:?}")))?;

        debug!(order, "cuBLAS matrices ready");
        Ok(Self {
            device,
            blas,
            a,
            b,
            c,
            order,
        })
    }

    /// `C = A·B + C`, blocking until the device is idle.
    pub fn multiply(&mut self) -> Result<()> {
        let n = self.order as i32;
        let config = GemmConfig {
            transa: cublasOperation_t::CUBLAS_OP_N,
            transb: cublasOperation_t::CUBLAS_OP_N,
            m: n,
            n,
            k: n,
            alpha: 1.0f32,
            lda: n,
            ldb: n,
            beta: 1.0f32,
            ldc: n,
        };
        // SAFETY: all three matrices hold order² elements and the leading
        // dimensions equal the order.
        unsafe { self.blas.gemm(config, &self.a, &self.b, &mut self.c) }
            .map_err(|e| BenchError::device(format!("cublasSgemm failed: {e:?}")))?;
        self.device
            .synchronize()
            .map_err(|e| BenchError::device(format!("CUDA synchronize failed: {e}")))
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Copy `A`, `B` and `C` back to the host (column-major).
    pub fn download(&self) -> Result<[Vec<f32>; 3]> {
        let copy = |slice: &CudaSlice<f32>| {
            self.device
                .dtoh_sync_copy(slice)
                .map_err(|e| BenchError::device(format!("CUDA device-to-host copy failed: {e}")))
        };
        Ok([copy(&self.a)?, copy(&self.b)?, copy(&self.c)?])
    }
}

impl Drop for CublasMatmul {
    fn drop(&mut self) {
        debug!(order = self.order, "releasing cuBLAS matrices");
    }
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_nanos() as u64)
}
