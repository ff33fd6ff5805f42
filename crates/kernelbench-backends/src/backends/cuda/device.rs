use std::sync::Arc;

use cudarc::driver::{CudaDevice, CudaFunction, CudaSlice, DeviceRepr, LaunchAsync, LaunchConfig, ValidAsZeroBits};
use cudarc::nvrtc::Ptx;
use tracing::debug;

use crate::backend::ComputeDevice;
use crate::error::{BenchError, Result};
use crate::kernel::CompiledProgram;
use crate::workload::Element;

const MODULE: &str = "kernelbench";

/// Element types that can live in CUDA device memory.
pub trait CudaElement: Element + DeviceRepr + ValidAsZeroBits + Unpin {}

impl<T: Element + DeviceRepr + ValidAsZeroBits + Unpin> CudaElement for T {}

/// A CUDA device context.
pub struct CudaCompute {
    device: Arc<CudaDevice>,
}

impl CudaCompute {
    /// Open the device with the given ordinal.
    pub fn new(ordinal: usize) -> Result<Self> {
        let device = CudaDevice::new(ordinal)
            .map_err(|e| BenchError::device(format!("CUDA device {ordinal} initialisation failed: {e}")))?;
        debug!(ordinal, name = ?device.name().ok(), "opened CUDA device");
        Ok(Self { device })
    }

    pub fn device(&self) -> &Arc<CudaDevice> {
        &self.device
    }
}

impl<T: CudaElement> ComputeDevice<T> for CudaCompute {
    type Buffer = CudaSlice<T>;
    type Program = CudaFunction;

    fn name(&self) -> &'static str {
        "cuda"
    }

    fn allocate_buffer(&self, len: usize) -> Result<CudaSlice<T>> {
        self.device.alloc_zeros::<T>(len).map_err(|e| {
            debug!(error = %e, len, "CUDA allocation failed");
            BenchError::Allocation {
                what: "device buffer",
                requested: len.saturating_mul(std::mem::size_of::<T>()),
            }
        })
    }

    fn copy_to_buffer(&self, src: &[T], dst: &mut CudaSlice<T>) -> Result<()> {
        self.device
            .htod_sync_copy_into(src, dst)
            .map_err(|e| BenchError::device(format!("CUDA host-to-device copy failed: {e}")))
    }

    fn copy_from_buffer(&self, src: &CudaSlice<T>, dst: &mut [T]) -> Result<()> {
        self.device
            .dtoh_sync_copy_into(src, dst)
            .map_err(|e| BenchError::device(format!("CUDA device-to-host copy failed: {e}")))
    }

    fn load_program(&self, program: &CompiledProgram) -> Result<CudaFunction> {
        self.device
            .load_ptx(Ptx::from_src(program.ptx.clone()), MODULE, &[program.entry])
            .map_err(|e| BenchError::device(format!("loading PTX module failed: {e}")))?;
        self.device
            .get_func(MODULE, program.entry)
            .ok_or_else(|| BenchError::device(format!("entry point `{}` missing from PTX module", program.entry)))
    }

    fn dispatch(
        &self,
        program: &CudaFunction,
        buffers: &mut [CudaSlice<T>],
        workgroups: u32,
        local_size: u32,
    ) -> Result<()> {
        let bound = buffers.len();
        let [a, b, c] = buffers else {
            return Err(BenchError::device(format!("vector add takes 3 buffers, {bound} bound")));
        };
        let config = LaunchConfig {
            grid_dim: (workgroups, 1, 1),
            block_dim: (local_size, 1, 1),
            shared_mem_bytes: 0,
        };
        // SAFETY: parameter types and order match the generated kernel signature,
        // and the pipeline only dispatches sizes that are whole workgroups.
        unsafe { program.clone().launch(config, (&*a, &*b, c)) }
            .map_err(|e| BenchError::device(format!("kernel launch failed: {e}")))
    }
}
