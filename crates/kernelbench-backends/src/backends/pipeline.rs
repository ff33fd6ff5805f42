//! Compile → bind → stage → dispatch over any [`ComputeDevice`]
//!
//! A [`KernelPipeline`] is built once per configuration and then run once per
//! measured iteration:
//!
//! ```text
//! build():  check size % local_size == 0
//!           compile source            (error → the device is never opened)
//!           open device, load program
//!           allocate one device buffer per binding, copy host → device
//! run():    copy read bindings host → device
//!           dispatch workgroup_count(len) × local_size invocations
//!           copy write bindings device → host
//! drop:     device buffers and program released
//! ```

use std::time::Instant;

use kernelbench_tracing::perf_span;
use kernelbench_tracing::performance::record_transfer;
use tracing::debug;

use crate::backend::ComputeDevice;
use crate::error::{BenchError, Result};
use crate::kernel::{workgroup_count, Access, BindingTable, KernelCompiler, KernelSource};
use crate::workload::{Element, Workload};

/// A compiled kernel with its buffers bound and staged on a device.
pub struct KernelPipeline<T: Element, D: ComputeDevice<T>> {
    device: D,
    program: D::Program,
    bindings: &'static BindingTable,
    buffers: Vec<D::Buffer>,
    workload: Workload<T>,
    workgroups: u32,
    local_size: u32,
}

impl<T: Element, D: ComputeDevice<T>> KernelPipeline<T, D> {
    /// Compile `source`, then open a device and stage `workload` on it.
    ///
    /// `open_device` is only called once compilation has succeeded. Fails
    /// with [`BenchError::MisalignedDispatch`] when the workload length is
    /// not a multiple of the kernel's local size, since the kernel writes
    /// every invocation it is launched with.
    pub fn build<C, F>(
        open_device: F,
        compiler: &C,
        source: &KernelSource,
        bindings: &'static BindingTable,
        workload: Workload<T>,
    ) -> Result<Self>
    where
        C: KernelCompiler + ?Sized,
        F: FnOnce() -> Result<D>,
    {
        let len = workload.len();
        let local_size = source.local_size;
        if local_size == 0 || len % local_size as usize != 0 {
            return Err(BenchError::MisalignedDispatch { size: len, local_size });
        }

        let compiled = compiler.compile(source)?;
        let device = open_device()?;
        let program = device.load_program(&compiled)?;

        let mut buffers = Vec::with_capacity(bindings.len());
        {
            let _span = perf_span!("stage_bindings", device = device.name(), len = len);
            for binding in bindings {
                let host = workload
                    .buffer(binding.index)
                    .ok_or_else(|| BenchError::device(format!("no workload buffer for binding {}", binding.name)))?;
                let mut buffer = device.allocate_buffer(len)?;
                device.copy_to_buffer(host, &mut buffer)?;
                buffers.push(buffer);
            }
        }

        let workgroups = workgroup_count(len, local_size);
        debug!(
            device = device.name(),
            entry = source.entry,
            element = T::NAME,
            len,
            workgroups,
            local_size,
            "kernel pipeline ready"
        );

        Ok(Self {
            device,
            program,
            bindings,
            buffers,
            workload,
            workgroups,
            local_size,
        })
    }

    /// One measured iteration: upload inputs, dispatch, download outputs.
    pub fn run(&mut self) -> Result<()> {
        for (binding, buffer) in self.bindings.iter().zip(self.buffers.iter_mut()) {
            if binding.access == Access::Read {
                if let Some(host) = self.workload.buffer(binding.index) {
                    self.device.copy_to_buffer(host, buffer)?;
                }
            }
        }

        self.device
            .dispatch(&self.program, &mut self.buffers, self.workgroups, self.local_size)?;

        for (binding, buffer) in self.bindings.iter().zip(self.buffers.iter()) {
            if binding.access == Access::Write {
                if let Some(host) = self.workload.buffer_mut(binding.index) {
                    self.device.copy_from_buffer(buffer, host)?;
                }
            }
        }
        Ok(())
    }

    /// Copy the written bindings back to the host and log the transfer rate.
    ///
    /// Not part of the measured region; input buffers are left untouched.
    pub fn download_outputs(&mut self) -> Result<()> {
        let start = Instant::now();
        let mut bytes = 0;
        for (binding, buffer) in self.bindings.iter().zip(self.buffers.iter()) {
            if binding.access != Access::Write {
                continue;
            }
            if let Some(host) = self.workload.buffer_mut(binding.index) {
                self.device.copy_from_buffer(buffer, host)?;
                bytes += std::mem::size_of_val(host);
            }
        }
        record_transfer(bytes, "D2H", start.elapsed().as_micros() as u64);
        Ok(())
    }

    pub fn workload(&self) -> &Workload<T> {
        &self.workload
    }

    pub fn workgroups(&self) -> u32 {
        self.workgroups
    }

    pub fn local_size(&self) -> u32 {
        self.local_size
    }

    pub fn device(&self) -> &D {
        &self.device
    }
}

impl<T: Element, D: ComputeDevice<T>> Drop for KernelPipeline<T, D> {
    fn drop(&mut self) {
        debug!(
            device = self.device.name(),
            buffers = self.buffers.len(),
            "releasing kernel pipeline"
        );
    }
}
