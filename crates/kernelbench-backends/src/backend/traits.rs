//! Traits implemented by the execution backends
//!
//! There are two seams:
//!
//! ```text
//! AdditionKernel<T>            ComputeDevice<T>
//! (host slices in, host        (device buffers, explicit staging,
//!  slice out, synchronous)      dispatch of a compiled program)
//!        │                              │
//!  ┌─────┼──────┬────────┐        ┌─────┴─────┐
//!  ▼     ▼      ▼        ▼        ▼           ▼
//! Scalar Vector Rayon Threads   CUDA     test doubles
//! ```
//!
//! CPU backends implement [`AdditionKernel`] directly. GPU dispatch goes
//! through a [`ComputeDevice`] driven by
//! [`KernelPipeline`](crate::backends::pipeline::KernelPipeline), which owns
//! the compile, bind, stage and dispatch steps.

use crate::error::Result;
use crate::kernel::CompiledProgram;
use crate::workload::Element;

/// Elementwise vector addition on host memory.
///
/// Implementations compute `c[i] = a[i] + b[i]` and return only after every
/// write they perform has completed. All three slices have the same length.
/// [`ThreadedAdd`](crate::backends::cpu::ThreadedAdd) leaves the trailing
/// `len % threads` outputs untouched; every other implementation covers the
/// whole range.
pub trait AdditionKernel<T: Element>: Send + Sync {
    /// Identifier used in benchmark names
    fn name(&self) -> &'static str;

    /// Compute `c = a + b`.
    fn add(&self, a: &[T], b: &[T], c: &mut [T]);
}

/// A device that can hold buffers of `T` and run compiled kernels on them.
///
/// # Execution Model
///
/// [`dispatch`](Self::dispatch) launches `workgroups` groups of `local_size`
/// invocations each. Invocation `i` reads and writes element `i` of the bound
/// buffers; nothing masks invocations past the buffer length, so callers
/// must size the dispatch to cover the buffers exactly.
pub trait ComputeDevice<T: Element> {
    /// Device allocation holding `T` elements
    type Buffer;

    /// Loaded, launchable form of a [`CompiledProgram`]
    type Program;

    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Allocate a zeroed buffer of `len` elements.
    fn allocate_buffer(&self, len: usize) -> Result<Self::Buffer>;

    /// Copy `src` into `dst` (host to device). Lengths must match.
    fn copy_to_buffer(&self, src: &[T], dst: &mut Self::Buffer) -> Result<()>;

    /// Copy `src` into `dst` (device to host), waiting for outstanding work.
    fn copy_from_buffer(&self, src: &Self::Buffer, dst: &mut [T]) -> Result<()>;

    /// Load a compiled program so it can be dispatched.
    fn load_program(&self, program: &CompiledProgram) -> Result<Self::Program>;

    /// Launch `program` with `buffers` bound as positional parameters.
    fn dispatch(
        &self,
        program: &Self::Program,
        buffers: &mut [Self::Buffer],
        workgroups: u32,
        local_size: u32,
    ) -> Result<()>;
}
